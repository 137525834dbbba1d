//! GPU Resource Interface
//!
//! The rendering graph never talks to a graphics API directly. Every texture,
//! renderbuffer and framebuffer it needs is requested through the
//! [`ResourceFactory`] trait and referred to afterwards by an opaque handle.
//!
//! - [`TextureHandle`]: texture, cubemap or renderbuffer created by the factory
//! - [`FramebufferHandle`]: render target combining color/depth attachments
//! - [`FilterMode`], [`StorageType`], [`TextureKind`]: creation parameters
//! - [`HeadlessFactory`]: recording implementation for tools and tests

pub mod headless;

pub use headless::{HeadlessFactory, HeadlessTexture};

/// Opaque handle to a texture-like resource created by a [`ResourceFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl TextureHandle {
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque handle to a framebuffer created by a [`ResourceFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle(u32);

impl FramebufferHandle {
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

impl FilterMode {
    /// Single-letter tag used by debug output (`L` / `N`).
    #[inline]
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Nearest => 'N',
            Self::Linear => 'L',
        }
    }
}

/// Storage layout of a created texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    /// 8-bit RGBA color storage.
    Rgba,
    /// Sampleable depth texture.
    Depth,
    /// Write-only depth renderbuffer.
    DepthRenderbuffer,
}

/// Logical purpose of a created texture (used for labels and bookkeeping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Color,
    DepthTexture,
    DepthRenderbuffer,
    Cubemap,
}

impl TextureKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Color => "COLOR",
            Self::DepthTexture => "DEPTH_TEX",
            Self::DepthRenderbuffer => "DEPTH_RBUF",
            Self::Cubemap => "CUBEMAP",
        }
    }
}

/// Creates and configures the GPU objects referenced by a rendering graph.
///
/// Sizes are expressed in units of the requesting slink: viewport-tracking
/// textures receive their size multiplier (e.g. `0.25` for a quarter
/// resolution buffer) and are rescaled by the engine on every resize, fixed
/// size textures (shadow maps, sky cubemap) receive their size in texels.
pub trait ResourceFactory {
    /// Creates an empty 2D texture or renderbuffer.
    fn create_texture(&mut self, kind: TextureKind, storage: StorageType) -> TextureHandle;

    /// Creates a cubemap texture with faces of `size` texels.
    fn create_cubemap_texture(&mut self, kind: TextureKind, size: f32) -> TextureHandle;

    /// Resizes a texture created by [`create_texture`](Self::create_texture).
    fn resize(&mut self, texture: TextureHandle, width: f32, height: f32);

    /// Sets minification and magnification filters of a texture.
    fn set_filters(&mut self, texture: TextureHandle, min: FilterMode, mag: FilterMode);

    /// Creates a framebuffer with the given attachments.
    fn create_render_target(
        &mut self,
        color: Option<TextureHandle>,
        depth: Option<TextureHandle>,
    ) -> FramebufferHandle;
}
