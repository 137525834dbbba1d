#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{ErrorKind, GraphError, Result};
pub use renderer::graph::{
    NodeId, PipelineBuilder, RenderGraph, Slink, SlinkKey, SlinkSource, SlinkTarget, Subscene,
    SubsceneKind, build_queue, debug_convert_to_dot,
};
pub use renderer::settings::{AntialiasingTechnique, PipelineSettings};
pub use resources::{
    FilterMode, FramebufferHandle, HeadlessFactory, ResourceFactory, StorageType, TextureHandle,
    TextureKind,
};
pub use scene::{Camera, CameraId, CameraRender, Projection, RenderFeatures, SceneRender};
