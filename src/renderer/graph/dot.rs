//! Graphviz export for debugging.
//!
//! Nodes show the subscene kind and the ids of the textures bound to its
//! camera (`C<n>` color, `D<n>` depth). Edges show the link semantics, size,
//! filtering (`L`/`N` per min/mag, `RR` for renderbuffers) and the texture id,
//! so texture sharing is visible at a glance. Texture ids are numbered in
//! slink traversal order.

use std::ops::ControlFlow;

use rustc_hash::FxHashMap;

use super::graph::RenderGraph;
use super::slink::{Slink, SlinkSource, SlinkTarget};
use super::subscene::{Subscene, SubsceneKind};
use crate::resources::TextureHandle;

/// A3
const PAPER_SIZE: &str = "11.7,16.5";

type TextureIds = FxHashMap<TextureHandle, usize>;

#[must_use]
pub fn debug_convert_to_dot(graph: &RenderGraph) -> String {
    let tex_ids = texture_ids(graph);

    let mut dot = String::from("digraph scenegraph {\n");
    dot.push_str(&format!("    size=\"{PAPER_SIZE}\";\n"));
    dot.push_str("    ratio=\"fill\";\n");
    dot.push_str("    node [shape=box margin=\"0.25,0.055\"];\n");

    for (index, (_, subs)) in graph.nodes().enumerate() {
        dot.push_str("    ");
        dot.push_str(&format_node(graph, index, subs, &tex_ids));
    }

    for edge in graph.edges() {
        let (Some(from), Some(to)) = (graph.position(edge.from), graph.position(edge.to)) else {
            continue;
        };
        let style = if edge.slink.active { "solid" } else { "dotted" };
        dot.push_str(&format!(
            "    {from} -> {to} [label=\"{}\" style=\"{style}\"];\n",
            format_slink_label(&edge.slink, &tex_ids)
        ));
    }

    dot.push('}');
    dot
}

fn texture_ids(graph: &RenderGraph) -> TextureIds {
    let mut ids = TextureIds::default();
    graph.for_each_slink(|slink, _, _| {
        if let Some(tex) = slink.texture {
            let next = ids.len();
            ids.entry(tex).or_insert(next);
        }
        ControlFlow::Continue(())
    });
    ids
}

fn format_node(graph: &RenderGraph, index: usize, subs: &Subscene, tex_ids: &TextureIds) -> String {
    let mut label = subs.kind.name().replace('_', " ");
    if let Some(effect) = subs.post_effect().filter(|_| subs.kind == SubsceneKind::Postprocessing) {
        label.push_str(&format!(" ({})", effect.name().replace('_', " ")));
    } else if let Some(orientation) = subs.blur_orientation() {
        label.push_str(&format!(" ({})", orientation.name()));
    }

    if let Some(cam) = subs.camera.and_then(|id| graph.camera(id)) {
        label.push_str("\\n");
        if let Some(id) = cam.color_attachment.and_then(|t| tex_ids.get(&t)) {
            label.push_str(&format!("C{id} "));
        }
        if let Some(id) = cam.depth_attachment.and_then(|t| tex_ids.get(&t)) {
            label.push_str(&format!("D{id}"));
        }
    }

    if !subs.slinks_internal.is_empty() {
        label.push_str("\\n-----\\n");
    }
    for slink in &subs.slinks_internal {
        label.push_str(&format_slink_label(slink, tex_ids));
    }

    let style = if subs.kind == SubsceneKind::Sink {
        "dotted"
    } else if subs.enqueue {
        "solid"
    } else {
        "dashed"
    };

    format!("{index} [label=\"{label}\" color=\"black\" style=\"{style},bold\"];\n")
}

fn format_size_mult(mult: f32) -> String {
    if (mult - 1.0).abs() < f32::EPSILON {
        String::new()
    } else if mult.round() == mult {
        format!("{mult}")
    } else {
        format!("{mult:.2}")
    }
}

fn format_slink_label(slink: &Slink, tex_ids: &TextureIds) -> String {
    let mut label = format!("{}\\n", slink.from);
    if slink.to != SlinkTarget::None {
        label.push_str(&format!("{}\\n", slink.to));
    }

    label.push('(');
    if slink.update_dim {
        let size = format!("{}S", format_size_mult(slink.size_mult));
        label.push_str(&format!("{size}x{size}"));
    } else {
        label.push_str(&format!("{0}x{0}", slink.size));
    }

    if slink.from != SlinkSource::Screen {
        label.push(' ');
        if slink.use_renderbuffer {
            label.push_str("RR");
        } else {
            label.push(slink.min_filter.letter());
            label.push(slink.mag_filter.letter());
        }
        if let Some(id) = slink.texture.and_then(|t| tex_ids.get(&t)) {
            label.push_str(&format!(" {id}"));
        }
    }

    label.push_str(")\\n");
    label
}
