//! Pipeline Settings
//!
//! Global switches that shape the rendering graph independently of the scene
//! content. Scene-dependent toggles (shadows, bloom, ...) live in
//! [`SceneRender`](crate::scene::SceneRender); everything here is decided once
//! per application or per device.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_scenegraph::{PipelineSettings, AntialiasingTechnique};
//!
//! // Default: single view, FXAA style antialiasing, DOF allowed
//! let settings = PipelineSettings::default();
//!
//! // Stereo output rendered at 1.5x resolution with Lanczos downscaling
//! let settings = PipelineSettings {
//!     anaglyph: true,
//!     resolution_factor: 1.5,
//!     ..Default::default()
//! };
//! ```
//!
//! Settings deserialize with `#[serde(default)]`, so a partial JSON or TOML
//! document only needs to mention the fields it overrides.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AntialiasingTechnique
// ---------------------------------------------------------------------------

/// Screen-space antialiasing flavour used when the scene enables antialiasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntialiasingTechnique {
    /// Single FXAA-like `ANTIALIASING` pass.
    #[default]
    Fxaa,
    /// Two-pass Lanczos resampling chain (`LANCZOS_X` → `LANCZOS_Y`).
    Smaa,
}

// ---------------------------------------------------------------------------
// PipelineSettings
// ---------------------------------------------------------------------------

/// Pipeline-wide configuration consumed by the
/// [`PipelineBuilder`](crate::renderer::graph::PipelineBuilder).
///
/// | Field | Default | Effect |
/// |-------|---------|--------|
/// | `wireframe_debug` | `false` | Adds a `WIREFRAME` pass after main blend |
/// | `resolution_factor` | `1.0` | Supersampling factor; `> 1` forces Lanczos AA |
/// | `antialiasing` | `Fxaa` | Antialiasing chain when the scene enables AA |
/// | `anaglyph` | `false` | Stereo rendering with a combining `ANAGLYPH` pass |
/// | `dof` | `true` | Allows depth of field when the camera requests it |
/// | `reflect_multiplier` | `0.5` | Size multiplier of reflection render targets |
/// | `shadow_tex_size` | `1024` | Shadow cascade texture size in texels |
/// | `grass_tex_size` | `512` | Dynamic grass map size in texels |
/// | `sky_tex_size` | `384` | Procedural sky cubemap face size |
/// | `depth_only_workaround` | `false` | Adds dummy color targets to depth-only passes |
/// | `disable_texture_reuse` | `false` | Debug: every slink gets a fresh texture |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub wireframe_debug: bool,
    pub resolution_factor: f32,
    pub antialiasing: AntialiasingTechnique,
    pub anaglyph: bool,
    pub dof: bool,
    pub reflect_multiplier: f32,
    pub shadow_tex_size: u32,
    pub grass_tex_size: u32,
    pub sky_tex_size: u32,
    /// Some drivers refuse to render into framebuffers without a color
    /// attachment.
    pub depth_only_workaround: bool,
    pub disable_texture_reuse: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            wireframe_debug: false,
            resolution_factor: 1.0,
            antialiasing: AntialiasingTechnique::Fxaa,
            anaglyph: false,
            dof: true,
            reflect_multiplier: 0.5,
            shadow_tex_size: 1024,
            grass_tex_size: 512,
            sky_tex_size: 384,
            depth_only_workaround: false,
            disable_texture_reuse: false,
        }
    }
}

impl PipelineSettings {
    /// Returns `true` when the antialiasing block uses the two-pass Lanczos
    /// chain instead of a single pass.
    #[inline]
    #[must_use]
    pub fn uses_lanczos(&self) -> bool {
        self.antialiasing == AntialiasingTechnique::Smaa || self.supersampled()
    }

    /// Returns `true` when slinks upstream of Lanczos are scaled by
    /// [`resolution_factor`](Self::resolution_factor).
    #[inline]
    #[must_use]
    pub fn supersampled(&self) -> bool {
        self.resolution_factor > 1.0
    }
}
