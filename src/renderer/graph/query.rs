//! Read-only graph queries used by the engine and by the builder itself.
//!
//! Upward/downward searches include the starting node. Self-edges are never
//! reported as inputs or outputs.

use rustc_hash::FxHashSet;

use super::graph::{NodeId, RenderGraph};
use super::subscene::SubsceneKind;
use crate::errors::{GraphError, Result};

/// First subscene, in graph order, rendering to the default framebuffer.
#[must_use]
pub fn find_on_screen(graph: &RenderGraph) -> Option<NodeId> {
    graph
        .node_ids()
        .iter()
        .copied()
        .find(|&id| graph.subscene_camera(id).is_some_and(|cam| cam.is_on_screen()))
}

/// First subscene of the given kind, in graph order.
#[must_use]
pub fn find_subs(graph: &RenderGraph, kind: SubsceneKind) -> Option<NodeId> {
    graph.nodes().find(|(_, subs)| subs.kind == kind).map(|(id, _)| id)
}

/// Producers feeding `id`, one entry per edge.
pub fn get_inputs(graph: &RenderGraph, id: NodeId) -> Result<Vec<NodeId>> {
    if !graph.contains(id) {
        return Err(GraphError::SubsceneNotInGraph);
    }
    Ok(graph
        .input_edges(id)
        .map(|(_, e)| e.from)
        .filter(|&from| from != id)
        .collect())
}

/// Consumers of `id`, one entry per edge.
pub fn get_outputs(graph: &RenderGraph, id: NodeId) -> Result<Vec<NodeId>> {
    if !graph.contains(id) {
        return Err(GraphError::SubsceneNotInGraph);
    }
    Ok(graph
        .output_edges(id)
        .map(|(_, e)| e.to)
        .filter(|&to| to != id)
        .collect())
}

/// Direct input of `id` with the given kind.
pub fn find_input(graph: &RenderGraph, id: NodeId, kind: SubsceneKind) -> Result<Option<NodeId>> {
    Ok(get_inputs(graph, id)?
        .into_iter()
        .find(|&input| graph.kind(input) == Some(kind)))
}

/// Whether `id` or anything upstream of it has the given kind.
#[must_use]
pub fn has_upper_subs(graph: &RenderGraph, id: NodeId, kind: SubsceneKind) -> bool {
    find_upper_subs(graph, id, kind).is_some()
}

/// Whether `id` or anything downstream of it has the given kind.
#[must_use]
pub fn has_lower_subs(graph: &RenderGraph, id: NodeId, kind: SubsceneKind) -> bool {
    let mut visited = FxHashSet::default();
    let mut stack = vec![id];
    while let Some(at) = stack.pop() {
        if !visited.insert(at) {
            continue;
        }
        if graph.kind(at) == Some(kind) {
            return true;
        }
        stack.extend(graph.output_edges(at).map(|(_, e)| e.to));
    }
    false
}

/// Every subscene for which [`has_lower_subs`] holds, in one upstream sweep
/// from the subscenes of the given kind.
#[must_use]
pub fn lower_subs_set(graph: &RenderGraph, kind: SubsceneKind) -> FxHashSet<NodeId> {
    let mut reached = FxHashSet::default();
    let mut stack: Vec<NodeId> = graph
        .node_ids()
        .iter()
        .copied()
        .filter(|&id| graph.kind(id) == Some(kind))
        .collect();
    while let Some(at) = stack.pop() {
        if reached.insert(at) {
            stack.extend(graph.input_edges(at).map(|(_, e)| e.from));
        }
    }
    reached
}

/// Nearest subscene of the given kind at or above `id`, depth first.
#[must_use]
pub fn find_upper_subs(graph: &RenderGraph, id: NodeId, kind: SubsceneKind) -> Option<NodeId> {
    fn visit(
        graph: &RenderGraph,
        id: NodeId,
        kind: SubsceneKind,
        visited: &mut FxHashSet<NodeId>,
    ) -> Option<NodeId> {
        if !visited.insert(id) {
            return None;
        }
        if graph.kind(id) == Some(kind) {
            return Some(id);
        }
        graph
            .input_edges(id)
            .find_map(|(_, e)| visit(graph, e.from, kind, visited))
    }

    visit(graph, id, kind, &mut FxHashSet::default())
}
