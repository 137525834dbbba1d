//! Headless Resource Factory
//!
//! A [`ResourceFactory`] that creates no GPU objects and only records what was
//! requested. Used by graph inspection tools (DOT export without a device)
//! and by tests that check allocation and binding decisions.

use super::{FilterMode, FramebufferHandle, ResourceFactory, StorageType, TextureHandle, TextureKind};

/// Record of one texture created by a [`HeadlessFactory`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessTexture {
    pub kind: TextureKind,
    pub storage: Option<StorageType>,
    pub width: f32,
    pub height: f32,
    pub filters: Option<(FilterMode, FilterMode)>,
}

/// Recording resource factory.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    textures: Vec<HeadlessTexture>,
    render_targets: Vec<(Option<TextureHandle>, Option<TextureHandle>)>,
}

impl HeadlessFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All textures created so far, indexed by [`TextureHandle::raw`].
    #[must_use]
    pub fn textures(&self) -> &[HeadlessTexture] {
        &self.textures
    }

    #[must_use]
    pub fn texture(&self, handle: TextureHandle) -> Option<&HeadlessTexture> {
        self.textures.get(handle.raw() as usize)
    }

    /// Number of created textures of the given kind.
    #[must_use]
    pub fn count(&self, kind: TextureKind) -> usize {
        self.textures.iter().filter(|t| t.kind == kind).count()
    }

    /// Attachments of every created framebuffer, in creation order.
    #[must_use]
    pub fn render_targets(&self) -> &[(Option<TextureHandle>, Option<TextureHandle>)] {
        &self.render_targets
    }

    fn push(&mut self, texture: HeadlessTexture) -> TextureHandle {
        let handle = TextureHandle::new(self.textures.len() as u32);
        self.textures.push(texture);
        handle
    }
}

impl ResourceFactory for HeadlessFactory {
    fn create_texture(&mut self, kind: TextureKind, storage: StorageType) -> TextureHandle {
        self.push(HeadlessTexture {
            kind,
            storage: Some(storage),
            width: 0.0,
            height: 0.0,
            filters: None,
        })
    }

    fn create_cubemap_texture(&mut self, kind: TextureKind, size: f32) -> TextureHandle {
        self.push(HeadlessTexture {
            kind,
            storage: None,
            width: size,
            height: size,
            filters: None,
        })
    }

    fn resize(&mut self, texture: TextureHandle, width: f32, height: f32) {
        if let Some(t) = self.textures.get_mut(texture.raw() as usize) {
            t.width = width;
            t.height = height;
        }
    }

    fn set_filters(&mut self, texture: TextureHandle, min: FilterMode, mag: FilterMode) {
        if let Some(t) = self.textures.get_mut(texture.raw() as usize) {
            t.filters = Some((min, mag));
        }
    }

    fn create_render_target(
        &mut self,
        color: Option<TextureHandle>,
        depth: Option<TextureHandle>,
    ) -> FramebufferHandle {
        let handle = FramebufferHandle::new(self.render_targets.len() as u32);
        self.render_targets.push((color, depth));
        handle
    }
}
