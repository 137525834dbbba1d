//! Rendering Graph
//!
//! Attributed directed graph: nodes carry a [`Subscene`], edges carry a
//! [`Slink`]. The graph also owns the cameras its subscenes render with, so a
//! build that fails never leaves half-configured cameras behind.
//!
//! Nodes live in a `slotmap` arena addressed by [`NodeId`]; iteration follows
//! insertion order. Edges are kept in insertion order as well, which makes
//! every traversal (and therefore texture allocation) deterministic.
//!
//! A well-formed graph has exactly one node without outputs, the sink, which
//! every other node reaches, and no cycles.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::ControlFlow;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use super::slink::Slink;
use super::subscene::{Subscene, SubsceneKind};
use crate::errors::{GraphError, Result};
use crate::scene::{Camera, CameraId};

new_key_type! {
    /// Handle to a subscene inside a [`RenderGraph`].
    pub struct NodeId;
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub slink: Slink,
}

/// Location of a slink within the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlinkRef {
    /// Slink of the edge at this index.
    Edge(usize),
    /// `slinks_internal[i]` of the node.
    Internal(NodeId, usize),
}

#[derive(Debug, Default)]
pub struct RenderGraph {
    nodes: SlotMap<NodeId, Subscene>,
    order: Vec<NodeId>,
    edges: Vec<Edge>,
    cameras: Vec<Camera>,
}

impl RenderGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Cameras ──────────────────────────────────────────────────────────────

    pub fn add_camera(&mut self, camera: Camera) -> CameraId {
        let id = CameraId(self.cameras.len() as u32);
        self.cameras.push(camera);
        id
    }

    #[must_use]
    pub fn camera(&self, id: CameraId) -> Option<&Camera> {
        self.cameras.get(id.index())
    }

    pub fn camera_mut(&mut self, id: CameraId) -> Option<&mut Camera> {
        self.cameras.get_mut(id.index())
    }

    #[must_use]
    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    /// Camera of the subscene at `id`.
    #[must_use]
    pub fn subscene_camera(&self, id: NodeId) -> Option<&Camera> {
        self.nodes
            .get(id)
            .and_then(|subs| subs.camera)
            .and_then(|cam| self.camera(cam))
    }

    // ─── Nodes ────────────────────────────────────────────────────────────────

    pub fn append_node(&mut self, subscene: Subscene) -> NodeId {
        let id = self.nodes.insert(subscene);
        self.order.push(id);
        id
    }

    /// Removes the node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Subscene> {
        let subscene = self.nodes.remove(id)?;
        self.order.retain(|&n| n != id);
        self.edges.retain(|e| e.from != id && e.to != id);
        Some(subscene)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Subscene> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Subscene> {
        self.nodes.get_mut(id)
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<SubsceneKind> {
        self.nodes.get(id).map(|subs| subs.kind)
    }

    /// Node ids in insertion order.
    #[must_use]
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Subscenes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Subscene)> + '_ {
        self.order.iter().map(|&id| (id, &self.nodes[id]))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Position of the node in insertion order.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == id)
    }

    // ─── Edges ────────────────────────────────────────────────────────────────

    pub fn append_edge(&mut self, from: NodeId, to: NodeId, slink: Slink) {
        self.edges.push(Edge { from, to, slink });
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Incoming edges of `id` as `(edge index, edge)`, in edge order.
    pub fn input_edges(&self, id: NodeId) -> impl Iterator<Item = (usize, &Edge)> + '_ {
        self.edges.iter().enumerate().filter(move |(_, e)| e.to == id)
    }

    /// Outgoing edges of `id` as `(edge index, edge)`, in edge order.
    pub fn output_edges(&self, id: NodeId) -> impl Iterator<Item = (usize, &Edge)> + '_ {
        self.edges.iter().enumerate().filter(move |(_, e)| e.from == id)
    }

    /// Swaps the slink carried by edge `index`, returning the previous one.
    pub fn replace_edge_slink(&mut self, index: usize, slink: Slink) -> Option<Slink> {
        self.edges
            .get_mut(index)
            .map(|e| std::mem::replace(&mut e.slink, slink))
    }

    #[must_use]
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.input_edges(id).count()
    }

    #[must_use]
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.output_edges(id).count()
    }

    pub fn input_indices(&self, id: NodeId) -> Vec<usize> {
        self.input_edges(id).map(|(i, _)| i).collect()
    }

    pub fn output_indices(&self, id: NodeId) -> Vec<usize> {
        self.output_edges(id).map(|(i, _)| i).collect()
    }

    // ─── Slinks ───────────────────────────────────────────────────────────────

    #[must_use]
    pub fn slink(&self, at: SlinkRef) -> Option<&Slink> {
        match at {
            SlinkRef::Edge(i) => self.edges.get(i).map(|e| &e.slink),
            SlinkRef::Internal(node, i) => self.nodes.get(node)?.slinks_internal.get(i),
        }
    }

    pub fn slink_mut(&mut self, at: SlinkRef) -> Option<&mut Slink> {
        match at {
            SlinkRef::Edge(i) => self.edges.get_mut(i).map(|e| &mut e.slink),
            SlinkRef::Internal(node, i) => self.nodes.get_mut(node)?.slinks_internal.get_mut(i),
        }
    }

    /// Visits inter-pass slinks in edge order (with producer and consumer),
    /// then internal slinks in node order (with their owner only).
    ///
    /// The callback stops the walk by returning [`ControlFlow::Break`].
    pub fn for_each_slink<F>(&self, mut f: F)
    where
        F: FnMut(&Slink, &Subscene, Option<&Subscene>) -> ControlFlow<()>,
    {
        for edge in &self.edges {
            let (Some(from), Some(to)) = (self.nodes.get(edge.from), self.nodes.get(edge.to)) else {
                continue;
            };
            if f(&edge.slink, from, Some(to)).is_break() {
                return;
            }
        }
        for (_, subs) in self.nodes() {
            for slink in &subs.slinks_internal {
                if f(slink, subs, None).is_break() {
                    return;
                }
            }
        }
    }

    /// Every slink location paired with its producing node, in the same order
    /// as [`for_each_slink`](Self::for_each_slink).
    #[must_use]
    pub fn slink_refs(&self) -> Vec<(SlinkRef, NodeId)> {
        let mut refs: Vec<_> = self
            .edges
            .iter()
            .enumerate()
            .map(|(i, e)| (SlinkRef::Edge(i), e.from))
            .collect();
        for (id, subs) in self.nodes() {
            refs.extend((0..subs.slinks_internal.len()).map(|i| (SlinkRef::Internal(id, i), id)));
        }
        refs
    }

    // ─── Structure ────────────────────────────────────────────────────────────

    /// Nodes without outgoing edges, in insertion order.
    #[must_use]
    pub fn sink_nodes(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.out_degree(id) == 0)
            .collect()
    }

    /// The unique sink node.
    pub fn sink_node(&self) -> Result<NodeId> {
        match self.sink_nodes().as_slice() {
            [] => Err(GraphError::NoSink),
            [sink] => Ok(*sink),
            many => Err(GraphError::MultipleSinks(many.len())),
        }
    }

    /// Topological order of all nodes.
    ///
    /// Kahn's algorithm; among ready nodes the earliest inserted goes first,
    /// so equal graphs always sort identically.
    pub fn topsort(&self) -> Result<Vec<NodeId>> {
        let position: FxHashMap<NodeId, usize> =
            self.order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut in_degree = vec![0usize; self.order.len()];
        for e in &self.edges {
            if e.from != e.to {
                in_degree[position[&e.to]] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut sorted = Vec::with_capacity(self.order.len());
        while let Some(Reverse(i)) = ready.pop() {
            let id = self.order[i];
            sorted.push(id);
            for e in self.edges.iter().filter(|e| e.from == id && e.to != id) {
                let j = position[&e.to];
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }

        if sorted.len() == self.order.len() {
            Ok(sorted)
        } else {
            Err(GraphError::Cycle)
        }
    }
}
