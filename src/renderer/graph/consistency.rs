//! Graph Consistency
//!
//! Normalizes a freshly assembled graph before textures are allocated:
//!
//! 1. Slinks shared between several edges (or internal lists) are split into
//!    independent copies, since each placement later receives its own texture
//!    assignment.
//! 2. Every glow output gets an inactive bypass edge from the glow source,
//!    with a distinct pool descriptor, so toggling glow never lets the
//!    replaced texture collide with the source chain.
//! 3. Motion blur accumulators feeding antialiasing are sampled linearly.
//! 4. Links that end up on the same attachment chain are unified: linear
//!    filtering wins, a sampleable texture wins over a renderbuffer. In compat
//!    mode depth links become renderbuffers, which must never be sampled.
//!
//! [`apply_resolution_factor`] then scales links rendered at supersampled
//! resolution upstream of the Lanczos downsampler.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::graph::{NodeId, RenderGraph, SlinkRef};
use super::query::lower_subs_set;
use super::slink::{KeyTag, SlinkSource};
use super::subscene::{LanczosPass, SubsceneKind};
use crate::errors::{GraphError, Result};
use crate::resources::FilterMode;

type SlinkGroup = SmallVec<[SlinkRef; 8]>;

pub fn enforce_graph_consistency(graph: &mut RenderGraph, compat: bool) -> Result<()> {
    make_slinks_unique(graph)?;

    let ids = graph.node_ids().to_vec();
    for &id in &ids {
        match graph.kind(id) {
            Some(SubsceneKind::Glow) => add_glow_bypass(graph, id)?,
            Some(SubsceneKind::Antialiasing) => linear_motion_blur_accumulators(graph, id),
            _ => {}
        }
    }

    for &id in &ids {
        let mut groups: Vec<(SlinkSource, SlinkGroup)> = Vec::new();
        combine_same_slinks(graph, id, &mut groups);

        for (_, group) in groups {
            unify_group(graph, &group, compat)?;
        }
    }

    Ok(())
}

fn make_slinks_unique(graph: &mut RenderGraph) -> Result<()> {
    let mut seen = FxHashSet::default();
    let mut split = 0usize;

    for (at, _) in graph.slink_refs() {
        let Some(slink) = graph.slink(at) else {
            continue;
        };
        if seen.insert(slink.id()) {
            continue;
        }
        let copy = slink.duplicate()?;
        if let Some(slot) = graph.slink_mut(at) {
            *slot = copy;
            split += 1;
        }
    }

    log::trace!("Split {split} shared slinks");
    Ok(())
}

fn add_glow_bypass(graph: &mut RenderGraph, glow: NodeId) -> Result<()> {
    let Some(source) = graph
        .input_edges(glow)
        .find(|(_, e)| e.slink.to.is_sampler("u_glow_src"))
        .map(|(_, e)| e.from)
    else {
        return Ok(());
    };

    let outputs: Vec<_> = graph
        .output_edges(glow)
        .map(|(_, e)| (e.to, e.slink.clone()))
        .collect();

    for (consumer, slink) in outputs {
        let mut bypass = slink.duplicate()?;
        bypass.active = false;
        bypass.key_tag = Some(KeyTag::GlowBypass);
        graph.append_edge(source, consumer, bypass);
    }
    Ok(())
}

fn linear_motion_blur_accumulators(graph: &mut RenderGraph, aa: NodeId) {
    let blurs: SmallVec<[NodeId; 2]> = graph
        .input_edges(aa)
        .map(|(_, e)| e.from)
        .filter(|&n| graph.kind(n) == Some(SubsceneKind::MotionBlur))
        .collect();

    for mb in blurs {
        if let Some(subs) = graph.node_mut(mb) {
            for slink in &mut subs.slinks_internal {
                slink.min_filter = FilterMode::Linear;
                slink.mag_filter = FilterMode::Linear;
            }
        }
    }
}

fn push_unique(groups: &mut Vec<(SlinkSource, SlinkGroup)>, source: SlinkSource, at: SlinkRef) {
    let idx = match groups.iter().position(|(s, _)| *s == source) {
        Some(idx) => idx,
        None => {
            groups.push((source, SlinkGroup::new()));
            groups.len() - 1
        }
    };
    let group = &mut groups[idx].1;
    if !group.contains(&at) {
        group.push(at);
    }
}

/// Collects, per source semantic, the active pass-through chain feeding `id`
/// (recursively upstream) together with the active outputs of every node on
/// it. Inactive links never influence the others.
fn combine_same_slinks(
    graph: &RenderGraph,
    id: NodeId,
    groups: &mut Vec<(SlinkSource, SlinkGroup)>,
) {
    for (i, edge) in graph.input_edges(id) {
        let slink = &edge.slink;
        if slink.active && slink.is_pass_through() {
            push_unique(groups, slink.from, SlinkRef::Edge(i));
            combine_same_slinks(graph, edge.from, groups);
        }
    }

    for (i, edge) in graph.output_edges(id) {
        if edge.slink.active {
            push_unique(groups, edge.slink.from, SlinkRef::Edge(i));
        }
    }

    // motion blur swaps its accumulator with the output every frame
    if let Some(subs) = graph.node(id)
        && subs.kind == SubsceneKind::MotionBlur
    {
        for (i, slink) in subs.slinks_internal.iter().enumerate() {
            push_unique(groups, slink.from, SlinkRef::Internal(id, i));
        }
    }
}

fn unify_group(graph: &mut RenderGraph, group: &[SlinkRef], compat: bool) -> Result<()> {
    if compat {
        for &at in group {
            let Some(slink) = graph.slink_mut(at) else {
                continue;
            };
            if slink.from != SlinkSource::Depth {
                continue;
            }
            if !slink.to.is_reserved() {
                return Err(GraphError::RenderbufferSampled {
                    from: slink.from.to_string(),
                    to: slink.to.to_string(),
                });
            }
            slink.use_renderbuffer = true;
        }
    }

    let (min_filter, mag_filter, use_renderbuffer) = {
        let members: Vec<_> = group.iter().filter_map(|&at| graph.slink(at)).collect();
        let Some(first) = members.first() else {
            return Ok(());
        };

        let min_filter = members
            .iter()
            .map(|s| s.min_filter)
            .find(|&f| f == FilterMode::Linear)
            .unwrap_or(first.min_filter);
        let mag_filter = members
            .iter()
            .map(|s| s.mag_filter)
            .find(|&f| f == FilterMode::Linear)
            .unwrap_or(first.mag_filter);
        let use_renderbuffer = members
            .iter()
            .map(|s| s.use_renderbuffer)
            .find(|&rb| !rb)
            .unwrap_or(first.use_renderbuffer);
        (min_filter, mag_filter, use_renderbuffer)
    };

    for &at in group {
        if let Some(slink) = graph.slink_mut(at) {
            slink.min_filter = min_filter;
            slink.mag_filter = mag_filter;
            slink.use_renderbuffer = use_renderbuffer;
        }
    }
    Ok(())
}

/// Scales viewport-tracking links rendered upstream of a Lanczos pass by
/// `factor`. Outputs of the final `LANCZOS_Y` stage keep screen resolution.
pub fn apply_resolution_factor(graph: &mut RenderGraph, factor: f32) {
    if factor <= 1.0 {
        return;
    }

    let above_lanczos = lower_subs_set(graph, SubsceneKind::Lanczos);
    let scaled: Vec<SlinkRef> = graph
        .slink_refs()
        .into_iter()
        .filter(|&(at, producer)| {
            let Some(slink) = graph.slink(at) else {
                return false;
            };
            slink.update_dim
                && above_lanczos.contains(&producer)
                && graph.node(producer).and_then(|s| s.lanczos_pass()) != Some(LanczosPass::Y)
        })
        .map(|(at, _)| at)
        .collect();

    log::debug!("Resolution factor {factor}: scaling {} slinks", scaled.len());

    for at in scaled {
        if let Some(slink) = graph.slink_mut(at) {
            slink.size_mult *= factor;
        }
    }
}
