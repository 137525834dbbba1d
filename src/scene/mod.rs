//! Scene-side inputs of the rendering graph: cameras and render descriptions.

pub mod camera;
pub mod render;

pub use camera::{Camera, CameraId, DepthOfField, Eye, Projection};
pub use render::{
    BloomParams, Caustics, CameraRender, ColorCorrection, GlowParams, GodRaysParams,
    MotionBlurParams, RenderFeatures, SceneRender, ShadowParams, ShoreMap, SkyParams, SsaoParams,
    WaterParams, WorldLightSet,
};
