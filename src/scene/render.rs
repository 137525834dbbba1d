//! Scene and camera render descriptions.
//!
//! [`SceneRender`] lists what the scene wants drawn (the enabled
//! [`RenderFeatures`] and their tunables), [`CameraRender`] describes the
//! viewer. Both are plain data read by the graph builder; nothing here is
//! mutated while a graph is built.

use bitflags::bitflags;
use glam::{Vec3, Vec4};

use super::camera::{Camera, DepthOfField};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RenderFeatures: u32 {
        const SHADOWS         = 1 << 0;
        const SSAO            = 1 << 1;
        const GOD_RAYS        = 1 << 2;
        const REFRACTIONS     = 1 << 3;
        const BLOOM           = 1 << 4;
        const MOTION_BLUR     = 1 << 5;
        const COMPOSITING     = 1 << 6;
        const ANTIALIASING    = 1 << 7;
        const SELECTABILITY   = 1 << 8;
        const PROCEDURAL_SKY  = 1 << 9;
        const DYNAMIC_GRASS   = 1 << 10;
    }
}

// === Parameter blocks ===

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldLightSet {
    pub horizon_color: Vec3,
    pub zenith_color: Vec3,
    pub environment_energy: f32,
}

impl Default for WorldLightSet {
    fn default() -> Self {
        Self {
            horizon_color: Vec3::ONE,
            zenith_color: Vec3::ONE,
            environment_energy: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaterParams {
    pub fog_color_density: Option<Vec4>,
    pub waves_height: f32,
    pub waves_length: f32,
    pub water_level: f32,
    /// `None` disables caustics.
    pub caustics: Option<Caustics>,
    pub shore: Option<ShoreMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Caustics {
    pub scale: f32,
    pub speed: f32,
    pub brightness: f32,
}

/// Precomputed distance-to-shore map.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShoreMap {
    /// `[max_x, min_x, max_y, min_y]`
    pub boundings: Vec4,
    pub tex_size: u32,
    pub max_shore_dist: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowParams {
    /// Number of cascaded shadow map sections.
    pub csm_num: u32,
    pub visibility_falloff: f32,
    pub blur_depth_size_mult: f32,
    pub blur_depth_edge_size: f32,
    pub blur_depth_diff_threshold: f32,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            csm_num: 1,
            visibility_falloff: 3.5,
            blur_depth_size_mult: 1.0,
            blur_depth_edge_size: 2.0,
            blur_depth_diff_threshold: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsaoParams {
    pub radius_increase: f32,
    /// Per-mille; divided by 1000 when stored on the pass.
    pub dithering_amount: f32,
    pub gauss_center: f32,
    pub gauss_width_square: f32,
    pub gauss_width_left_square: f32,
    pub influence: f32,
    pub dist_factor: f32,
    pub samples: u32,
}

impl Default for SsaoParams {
    fn default() -> Self {
        Self {
            radius_increase: 1.7,
            dithering_amount: 0.7,
            gauss_center: 0.2,
            gauss_width_square: 4.0,
            gauss_width_left_square: 0.01,
            influence: 0.7,
            dist_factor: 0.0,
            samples: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionBlurParams {
    pub decay_threshold: f32,
    pub factor: f32,
}

impl Default for MotionBlurParams {
    fn default() -> Self {
        Self {
            decay_threshold: 0.01,
            factor: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomParams {
    pub key: f32,
    pub edge_lum: f32,
    pub blur: f32,
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            key: 0.2,
            edge_lum: 1.0,
            blur: 4.0,
        }
    }
}

/// Color correction applied by the compositing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorCorrection {
    pub brightness: f32,
    pub contrast: f32,
    pub exposure: f32,
    pub saturation: f32,
}

impl Default for ColorCorrection {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            exposure: 1.0,
            saturation: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GodRaysParams {
    pub max_ray_length: f32,
    pub intensity: f32,
    pub steps_per_pass: f32,
}

impl Default for GodRaysParams {
    fn default() -> Self {
        Self {
            max_ray_length: 1.0,
            intensity: 0.7,
            steps_per_pass: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowParams {
    pub color: Vec3,
    pub factor: f32,
}

impl Default for GlowParams {
    fn default() -> Self {
        Self {
            color: Vec3::new(1.0, 1.0, 1.0),
            factor: 1.0,
        }
    }
}

/// Atmospheric scattering tunables of the procedural sky.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyParams {
    pub color: Vec3,
    pub rayleigh_brightness: f32,
    pub mie_brightness: f32,
    pub spot_brightness: f32,
    pub scatter_strength: f32,
    pub rayleigh_strength: f32,
    pub mie_strength: f32,
    pub rayleigh_collection_power: f32,
    pub mie_collection_power: f32,
    pub mie_distribution: f32,
}

impl Default for SkyParams {
    fn default() -> Self {
        Self {
            color: Vec3::new(0.087, 0.255, 0.6),
            rayleigh_brightness: 3.3,
            mie_brightness: 0.1,
            spot_brightness: 20.0,
            scatter_strength: 0.2,
            rayleigh_strength: 0.2,
            mie_strength: 0.006,
            rayleigh_collection_power: 0.35,
            mie_collection_power: 0.5,
            mie_distribution: 0.4,
        }
    }
}

// === SceneRender ===

/// Everything the graph builder needs to know about the scene.
#[derive(Debug, Clone, Default)]
pub struct SceneRender {
    pub features: RenderFeatures,
    pub lamps_number: u32,
    pub world_light_set: WorldLightSet,
    pub fog_color_density: Vec4,
    pub water_params: Option<WaterParams>,
    /// Reflection planes; only the first one is rendered.
    pub refl_planes: Vec<Vec4>,
    pub shadow_params: ShadowParams,
    pub ssao_params: SsaoParams,
    pub mb_params: MotionBlurParams,
    pub bloom_params: BloomParams,
    pub cc_params: ColorCorrection,
    pub god_rays_params: GodRaysParams,
    pub glow_params: GlowParams,
    pub sky_params: SkyParams,
}

impl SceneRender {
    #[must_use]
    pub fn with_features(features: RenderFeatures) -> Self {
        Self {
            features,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn has(&self, feature: RenderFeatures) -> bool {
        self.features.contains(feature)
    }
}

// === CameraRender ===

/// The viewer: scene camera template plus depth of field request.
#[derive(Debug, Clone, Default)]
pub struct CameraRender {
    pub camera: Camera,
    pub dof_distance: f32,
    pub dof_object: bool,
    pub dof_front: f32,
    pub dof_rear: f32,
    pub dof_power: f32,
}

impl CameraRender {
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Default::default()
        }
    }

    /// Depth of field is requested when focusing on a distance or an object.
    #[inline]
    #[must_use]
    pub fn wants_dof(&self) -> bool {
        self.dof_distance > 0.0 || self.dof_object
    }

    #[must_use]
    pub fn depth_of_field(&self) -> DepthOfField {
        DepthOfField {
            distance: self.dof_distance,
            object: self.dof_object,
            front: self.dof_front,
            rear: self.dof_rear,
            power: self.dof_power,
        }
    }
}
