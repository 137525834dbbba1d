//! Rendering graph.
//!
//! A directed graph of subscenes (render passes) connected by slinks
//! (texture links). Building a pipeline runs these stages:
//!
//! - [`builder`]: assembles the topology for the scene features
//! - [`consistency`]: makes slinks unique and unifies shared outputs
//! - [`transient_pool`]: assigns pooled, reference-counted textures
//! - [`targets`]: binds textures to camera attachments and framebuffers
//! - [`queue`]: orders enqueued subscenes for rendering
//!
//! [`query`] and [`dot`] inspect a built graph.

pub mod builder;
pub mod consistency;
pub mod dot;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod query;
pub mod queue;
pub mod slink;
pub mod subscene;
pub mod targets;
pub mod transient_pool;

pub use builder::PipelineBuilder;
pub use consistency::{apply_resolution_factor, enforce_graph_consistency};
pub use dot::debug_convert_to_dot;
pub use graph::{Edge, NodeId, RenderGraph, SlinkRef};
pub use query::{
    find_input, find_on_screen, find_subs, find_upper_subs, get_inputs, get_outputs,
    has_lower_subs, has_upper_subs, lower_subs_set,
};
pub use queue::build_queue;
pub use slink::{KeyTag, Slink, SlinkId, SlinkKey, SlinkSource, SlinkTarget};
pub use subscene::{
    LanczosPass, MainParams, MainPass, Orientation, PostEffect, Subscene, SubsceneKind,
    SubsceneParams,
};
pub use targets::assign_render_targets;
pub use transient_pool::{TexturePool, allocate_textures};
