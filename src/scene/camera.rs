use std::borrow::Cow;

use glam::Vec4;

use crate::resources::{FramebufferHandle, TextureHandle};

/// Index of a camera inside a [`RenderGraph`](crate::renderer::graph::RenderGraph)
/// camera arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraId(pub(crate) u32);

impl CameraId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    /// Off-center orthographic volume fitted to a shadow cascade.
    OrthoAsymmetric,
    /// Orthographic volume keeping the viewport aspect (grass map).
    OrthoAspect,
    Stereo(Eye),
    /// Full-screen quad passes; no view or projection.
    None,
}

/// Depth of field parameters carried by the `DOF` pass camera.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthOfField {
    pub distance: f32,
    pub object: bool,
    pub front: f32,
    pub rear: f32,
    pub power: f32,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub name: Cow<'static, str>,

    // === Projection ===
    pub projection: Projection,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Fixed viewport size; `None` follows the canvas.
    pub width: Option<u32>,
    pub height: Option<u32>,

    // === View ===
    /// Copies of the scene camera track its view every frame.
    pub follows_view: bool,
    pub reflection_plane: Option<Vec4>,
    pub dof: Option<DepthOfField>,

    // === Render target (written by the graph binder) ===
    pub color_attachment: Option<TextureHandle>,
    pub depth_attachment: Option<TextureHandle>,
    pub framebuffer: Option<FramebufferHandle>,
}

impl Camera {
    #[must_use]
    pub fn new(projection: Projection) -> Self {
        Self {
            name: Cow::Borrowed("Camera"),
            projection,
            fov: 45.0_f32.to_radians(),
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            width: None,
            height: None,
            follows_view: false,
            reflection_plane: None,
            dof: None,
            color_attachment: None,
            depth_attachment: None,
            framebuffer: None,
        }
    }

    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov: fov.to_radians(),
            aspect,
            near,
            far,
            follows_view: true,
            ..Self::new(Projection::Perspective)
        }
    }

    /// Camera rendering into a fixed square target.
    #[must_use]
    pub fn with_fixed_size(mut self, size: u32) -> Self {
        self.width = Some(size);
        self.height = Some(size);
        self
    }

    /// Copy for another pass: same projection and view, no render target.
    #[must_use]
    pub fn detached_copy(&self) -> Self {
        Self {
            color_attachment: None,
            depth_attachment: None,
            framebuffer: None,
            ..self.clone()
        }
    }

    pub fn make_stereo(&mut self, eye: Eye) {
        self.projection = Projection::Stereo(eye);
    }

    #[inline]
    #[must_use]
    pub fn has_attachment(&self) -> bool {
        self.color_attachment.is_some() || self.depth_attachment.is_some()
    }

    /// Renders directly to the default framebuffer.
    #[inline]
    #[must_use]
    pub fn is_on_screen(&self) -> bool {
        self.framebuffer.is_none()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective(45.0, 1.0, 0.1, 1000.0)
    }
}
