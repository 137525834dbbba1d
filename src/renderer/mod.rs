//! Rendering graph assembly.
//!
//! - [`settings`]: pipeline-wide configuration switches
//! - [`graph`]: subscenes, slinks, graph construction and scheduling

pub mod graph;
pub mod settings;

pub use graph::{PipelineBuilder, RenderGraph, build_queue};
pub use settings::{AntialiasingTechnique, PipelineSettings};
