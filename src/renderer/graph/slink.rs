//! Subscene Links
//!
//! A [`Slink`] describes one resource flowing between two passes: what the
//! producer writes ([`SlinkSource`]), where the consumer reads it from
//! ([`SlinkTarget`]), and the texture parameters needed to back it.
//!
//! A link whose target is the same attachment as its source is a
//! *pass-through* link: the consumer keeps rendering into the producer's
//! attachment instead of sampling it (e.g. `MAIN_OPAQUE → MAIN_BLEND` with
//! `COLOR → COLOR`).
//!
//! The same link may be placed on several edges while a graph is assembled.
//! Copies share a [`SlinkId`], which is how the consistency pass recognises
//! and separates them before any texture is assigned.

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::errors::{GraphError, Result};
use crate::resources::{FilterMode, TextureHandle};

static NEXT_SLINK_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a link, shared by copies placed on several edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlinkId(u32);

impl SlinkId {
    fn next() -> Self {
        Self(NEXT_SLINK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What the producing pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlinkSource {
    Color,
    Depth,
    Cubemap,
    /// The default framebuffer; never backed by a texture.
    Screen,
}

impl SlinkSource {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Color => "COLOR",
            Self::Depth => "DEPTH",
            Self::Cubemap => "CUBEMAP",
            Self::Screen => "SCREEN",
        }
    }
}

impl fmt::Display for SlinkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the consuming pass binds the resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlinkTarget {
    /// Consumer renders into the color attachment.
    Color,
    /// Consumer renders into the depth attachment.
    Depth,
    Cubemap,
    Screen,
    /// Not consumed; only keeps the producer's output alive.
    None,
    /// Sampled through the named shader uniform.
    Sampler(Cow<'static, str>),
}

impl SlinkTarget {
    #[must_use]
    pub fn sampler(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Sampler(name.into())
    }

    /// Reserved targets are attachments, never shader inputs.
    #[inline]
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        !matches!(self, Self::Sampler(_))
    }

    #[inline]
    #[must_use]
    pub fn is_sampler(&self, name: &str) -> bool {
        matches!(self, Self::Sampler(s) if s == name)
    }

    /// The attachment matching `source`, if any.
    #[must_use]
    pub fn attachment_of(source: SlinkSource) -> Self {
        match source {
            SlinkSource::Color => Self::Color,
            SlinkSource::Depth => Self::Depth,
            SlinkSource::Cubemap => Self::Cubemap,
            SlinkSource::Screen => Self::Screen,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Color => "COLOR",
            Self::Depth => "DEPTH",
            Self::Cubemap => "CUBEMAP",
            Self::Screen => "SCREEN",
            Self::None => "NONE",
            Self::Sampler(name) => name,
        }
    }
}

impl fmt::Display for SlinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Forces a distinct pool descriptor for otherwise identical links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTag {
    /// Inactive copy of a glow output routed around the glow pass.
    GlowBypass,
}

/// Descriptor used to match pooled textures.
///
/// Two links with equal keys may share a texture. The destination binding
/// and the active flag do not take part in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlinkKey {
    pub from: SlinkSource,
    pub size: u32,
    size_mult_bits: u32,
    pub update_dim: bool,
    pub use_renderbuffer: bool,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub key_tag: Option<KeyTag>,
}

impl SlinkKey {
    #[inline]
    #[must_use]
    pub fn size_mult(&self) -> f32 {
        f32::from_bits(self.size_mult_bits)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slink {
    id: SlinkId,
    pub from: SlinkSource,
    pub to: SlinkTarget,
    /// Base size in texels (`1` for viewport-relative links).
    pub size: u32,
    pub size_mult: f32,
    /// Tracks the viewport size.
    pub update_dim: bool,
    pub active: bool,
    pub texture: Option<TextureHandle>,
    pub use_renderbuffer: bool,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub key_tag: Option<KeyTag>,
}

impl Slink {
    #[must_use]
    pub fn new(
        from: SlinkSource,
        to: SlinkTarget,
        size: u32,
        size_mult: f32,
        update_dim: bool,
    ) -> Self {
        Self {
            id: SlinkId::next(),
            from,
            to,
            size,
            size_mult,
            update_dim,
            active: true,
            texture: None,
            use_renderbuffer: false,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            key_tag: None,
        }
    }

    /// Viewport-sized link.
    #[must_use]
    pub fn viewport(from: SlinkSource, to: SlinkTarget) -> Self {
        Self::new(from, to, 1, 1.0, true)
    }

    /// Viewport-relative link scaled by `size_mult`.
    #[must_use]
    pub fn scaled(from: SlinkSource, to: SlinkTarget, size_mult: f32) -> Self {
        Self::new(from, to, 1, size_mult, true)
    }

    /// Link with a fixed size in texels.
    #[must_use]
    pub fn fixed(from: SlinkSource, to: SlinkTarget, size: u32) -> Self {
        Self::new(from, to, size, 1.0, false)
    }

    #[must_use]
    pub fn with_filters(mut self, min: FilterMode, mag: FilterMode) -> Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self
    }

    #[must_use]
    pub fn linear(self) -> Self {
        self.with_filters(FilterMode::Linear, FilterMode::Linear)
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> SlinkId {
        self.id
    }

    /// Consumer keeps rendering into the producer's attachment.
    #[inline]
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        self.to == SlinkTarget::attachment_of(self.from)
    }

    #[must_use]
    pub fn key(&self) -> SlinkKey {
        SlinkKey {
            from: self.from,
            size: self.size,
            size_mult_bits: self.size_mult.to_bits(),
            update_dim: self.update_dim,
            use_renderbuffer: self.use_renderbuffer,
            min_filter: self.min_filter,
            mag_filter: self.mag_filter,
            key_tag: self.key_tag,
        }
    }

    /// Texture size for this link: `size × size_mult`.
    #[inline]
    #[must_use]
    pub fn texture_size(&self) -> f32 {
        self.size as f32 * self.size_mult
    }

    /// Structural copy with a fresh identity.
    ///
    /// Fails once a texture has been assigned, since the copy would alias it.
    pub fn duplicate(&self) -> Result<Self> {
        if self.texture.is_some() {
            return Err(GraphError::CloneAttachedSlink);
        }
        Ok(Self {
            id: SlinkId::next(),
            ..self.clone()
        })
    }
}
