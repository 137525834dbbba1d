//! Rendering queue.

use super::graph::{NodeId, RenderGraph};
use crate::errors::Result;

/// Ordered list of passes to render each frame: the topological order of the
/// graph restricted to enqueued subscenes.
pub fn build_queue(graph: &RenderGraph) -> Result<Vec<NodeId>> {
    let queue: Vec<NodeId> = graph
        .topsort()?
        .into_iter()
        .filter(|&id| graph.node(id).is_some_and(|subs| subs.enqueue))
        .collect();

    log::debug!("Rendering queue: {} of {} subscenes", queue.len(), graph.node_count());
    Ok(queue)
}
