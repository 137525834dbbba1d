//! Subscenes
//!
//! A [`Subscene`] is one render pass of the graph. Its [`SubsceneKind`]
//! decides what the engine draws; the flags decide how (clears, depth test,
//! blending) and whether it is scheduled at all.
//!
//! Every kind has a constructor carrying its default render state:
//!
//! | Kind | Clears | Depth test | Notes |
//! |------|--------|------------|-------|
//! | `SHADOW_CAST` | depth | yes | ortho-asymmetric camera |
//! | `MAIN_OPAQUE` | color (+depth when standalone) | yes | |
//! | `MAIN_BLEND` | none (both when standalone) | yes | blending |
//! | `COLOR_PICKING` | both | yes | not enqueued |
//! | `WIREFRAME` | none | yes | `do_render = false` |
//! | `SKY` | none | no | not enqueued, fixed size cubemap |
//! | full-screen passes | none | no | `Projection::None` camera |
//! | `SINK` | - | - | no camera, never enqueued |

use std::fmt;
use std::str::FromStr;

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use super::slink::Slink;
use crate::errors::GraphError;
use crate::resources::TextureHandle;
use crate::scene::{
    CameraId, ColorCorrection, GlowParams, MotionBlurParams, ShadowParams, SkyParams, SsaoParams,
    WaterParams, WorldLightSet,
};

// ─── Kinds ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsceneKind {
    ShadowCast,
    GrassMap,
    Depth,
    DepthPack,
    BlurDepth,
    Ssao,
    MainOpaque,
    MainBlend,
    MainReflect,
    ColorPicking,
    Refract,
    Wireframe,
    GodRays,
    GodRaysCombine,
    Luminance,
    AverageLuminance,
    LuminanceTrunced,
    BloomBlur,
    Bloom,
    MotionBlur,
    Postprocessing,
    Dof,
    GlowMask,
    Glow,
    Compositing,
    Antialiasing,
    /// Parsed by name only; no builder emits it.
    Smaa,
    Lanczos,
    Anaglyph,
    Screen,
    Sky,
    /// Parsed by name only; no builder emits it.
    Hud,
    Sink,
}

impl SubsceneKind {
    pub const ALL: [Self; 33] = [
        Self::ShadowCast,
        Self::GrassMap,
        Self::Depth,
        Self::DepthPack,
        Self::BlurDepth,
        Self::Ssao,
        Self::MainOpaque,
        Self::MainBlend,
        Self::MainReflect,
        Self::ColorPicking,
        Self::Refract,
        Self::Wireframe,
        Self::GodRays,
        Self::GodRaysCombine,
        Self::Luminance,
        Self::AverageLuminance,
        Self::LuminanceTrunced,
        Self::BloomBlur,
        Self::Bloom,
        Self::MotionBlur,
        Self::Postprocessing,
        Self::Dof,
        Self::GlowMask,
        Self::Glow,
        Self::Compositing,
        Self::Antialiasing,
        Self::Smaa,
        Self::Lanczos,
        Self::Anaglyph,
        Self::Screen,
        Self::Sky,
        Self::Hud,
        Self::Sink,
    ];

    /// Stable upper-snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ShadowCast => "SHADOW_CAST",
            Self::GrassMap => "GRASS_MAP",
            Self::Depth => "DEPTH",
            Self::DepthPack => "DEPTH_PACK",
            Self::BlurDepth => "BLUR_DEPTH",
            Self::Ssao => "SSAO",
            Self::MainOpaque => "MAIN_OPAQUE",
            Self::MainBlend => "MAIN_BLEND",
            Self::MainReflect => "MAIN_REFLECT",
            Self::ColorPicking => "COLOR_PICKING",
            Self::Refract => "REFRACT",
            Self::Wireframe => "WIREFRAME",
            Self::GodRays => "GOD_RAYS",
            Self::GodRaysCombine => "GOD_RAYS_COMBINE",
            Self::Luminance => "LUMINANCE",
            Self::AverageLuminance => "AVERAGE_LUMINANCE",
            Self::LuminanceTrunced => "LUMINANCE_TRUNCED",
            Self::BloomBlur => "BLOOM_BLUR",
            Self::Bloom => "BLOOM",
            Self::MotionBlur => "MOTION_BLUR",
            Self::Postprocessing => "POSTPROCESSING",
            Self::Dof => "DOF",
            Self::GlowMask => "GLOW_MASK",
            Self::Glow => "GLOW",
            Self::Compositing => "COMPOSITING",
            Self::Antialiasing => "ANTIALIASING",
            Self::Smaa => "SMAA",
            Self::Lanczos => "LANCZOS",
            Self::Anaglyph => "ANAGLYPH",
            Self::Screen => "SCREEN",
            Self::Sky => "SKY",
            Self::Hud => "HUD",
            Self::Sink => "SINK",
        }
    }
}

impl fmt::Display for SubsceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SubsceneKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| GraphError::UnknownSubsceneKind(s.to_owned()))
    }
}

/// Variant of the main scene pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainPass {
    Opaque,
    Blend,
    Reflect,
}

impl MainPass {
    #[must_use]
    pub const fn kind(self) -> SubsceneKind {
        match self {
            Self::Opaque => SubsceneKind::MainOpaque,
            Self::Blend => SubsceneKind::MainBlend,
            Self::Reflect => SubsceneKind::MainReflect,
        }
    }
}

impl FromStr for MainPass {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPAQUE" => Ok(Self::Opaque),
            "BLEND" => Ok(Self::Blend),
            "REFLECT" => Ok(Self::Reflect),
            _ => Err(GraphError::UnknownSubsceneKind(format!("MAIN_{s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    X,
    Y,
}

impl Orientation {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
        }
    }
}

/// Separable filter applied by `POSTPROCESSING` and `BLOOM_BLUR` passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostEffect {
    XBlur,
    YBlur,
    XExtend,
    YExtend,
}

impl PostEffect {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::XBlur => "X_BLUR",
            Self::YBlur => "Y_BLUR",
            Self::XExtend => "X_EXTEND",
            Self::YExtend => "Y_EXTEND",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanczosPass {
    X,
    Y,
}

// ─── Payloads ─────────────────────────────────────────────────────────────────

/// Per-light uniform arrays, sized for the scene's lamp count and filled by
/// the engine every frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightUniforms {
    pub num_lights: u32,
    pub directions: Vec<Vec3>,
    pub positions: Vec<Vec3>,
    pub color_intensities: Vec<Vec3>,
    pub factors1: Vec<Vec4>,
    pub factors2: Vec<Vec4>,
    pub sun_quaternion: Quat,
    pub sun_intensity: Vec3,
    pub sun_direction: Vec3,
}

impl LightUniforms {
    #[must_use]
    pub fn with_capacity(num_lights: u32) -> Self {
        let n = num_lights as usize;
        Self {
            num_lights: 0,
            directions: vec![Vec3::ZERO; n],
            positions: vec![Vec3::ZERO; n],
            color_intensities: vec![Vec3::ZERO; n],
            factors1: vec![Vec4::ZERO; n],
            factors2: vec![Vec4::ZERO; n],
            sun_quaternion: Quat::IDENTITY,
            sun_intensity: Vec3::ZERO,
            sun_direction: Vec3::ZERO,
        }
    }
}

/// Shore map placement in world XY.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShoreUniforms {
    pub center: Vec2,
    pub size: Vec2,
    pub tex_size: u32,
    pub max_shore_dist: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterUniforms {
    pub fog_color_density: Option<Vec4>,
    pub waves_height: f32,
    pub waves_length: f32,
    pub level: f32,
    pub caustics: Option<crate::scene::Caustics>,
    pub shore: Option<ShoreUniforms>,
}

impl From<&WaterParams> for WaterUniforms {
    fn from(wp: &WaterParams) -> Self {
        let shore = wp.shore.map(|s| {
            let b = s.boundings;
            ShoreUniforms {
                center: Vec2::new((b.x + b.y) / 2.0, (b.z + b.w) / 2.0),
                size: Vec2::new(b.x - b.y, b.z - b.w),
                tex_size: s.tex_size,
                max_shore_dist: s.max_shore_dist,
            }
        });
        Self {
            fog_color_density: wp.fog_color_density,
            waves_height: wp.waves_height,
            waves_length: wp.waves_length,
            level: wp.water_level,
            caustics: wp.caustics,
            shore,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MainParams {
    pub lights: LightUniforms,
    pub world: WorldLightSet,
    pub fog_color_density: Vec4,
    pub water: Option<WaterUniforms>,
    pub wind: Vec3,
    /// Eye position of the last transparency sort (blend pass only).
    pub zsort_eye_last: Option<Vec3>,
}

impl MainParams {
    #[must_use]
    pub fn new(
        num_lights: u32,
        world: WorldLightSet,
        fog_color_density: Vec4,
        water: Option<&WaterParams>,
    ) -> Self {
        Self {
            lights: LightUniforms::with_capacity(num_lights),
            world,
            fog_color_density,
            water: water.map(WaterUniforms::from),
            wind: Vec3::ZERO,
            zsort_eye_last: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurDepthParams {
    pub orientation: Orientation,
    pub size_mult: f32,
    pub edge_size: f32,
    pub diff_threshold: f32,
}

impl BlurDepthParams {
    #[must_use]
    pub fn new(orientation: Orientation, shadow: &ShadowParams) -> Self {
        Self {
            orientation,
            size_mult: shadow.blur_depth_size_mult,
            edge_size: shadow.blur_depth_edge_size,
            diff_threshold: shadow.blur_depth_diff_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GodRaysPass {
    /// First pass packs depth into color, the others blur radially.
    pub pack: bool,
    pub water: bool,
    pub radial_blur_step: f32,
    pub max_ray_length: f32,
    pub steps_per_pass: f32,
    pub lights: LightUniforms,
    pub world: WorldLightSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LuminanceTruncedParams {
    pub bloom_key: f32,
    pub edge_lum: f32,
    pub lights: LightUniforms,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkyPass {
    pub params: SkyParams,
    pub lights: LightUniforms,
    pub world: WorldLightSet,
    pub cube_view_matrices: [Mat4; 6],
    /// Fog cube colors consumed by the main passes.
    pub cube_fog: Mat4,
}

/// View matrices of the six cubemap faces (+X, -X, +Y, -Y, +Z, -Z).
#[must_use]
pub fn cubemap_view_matrices() -> [Mat4; 6] {
    let face = |dir: Vec3, up: Vec3| Mat4::look_at_rh(Vec3::ZERO, dir, up);
    [
        face(Vec3::X, Vec3::NEG_Y),
        face(Vec3::NEG_X, Vec3::NEG_Y),
        face(Vec3::Y, Vec3::Z),
        face(Vec3::NEG_Y, Vec3::NEG_Z),
        face(Vec3::Z, Vec3::NEG_Y),
        face(Vec3::NEG_Z, Vec3::NEG_Y),
    ]
}

/// Kind-specific data carried by a subscene.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubsceneParams {
    #[default]
    None,
    ShadowCast {
        csm_index: u32,
    },
    GrassMap {
        dim: Vec3,
    },
    Main(Box<MainParams>),
    Depth {
        shadow_visibility_falloff: f32,
    },
    BlurDepth(BlurDepthParams),
    Ssao {
        params: SsaoParams,
        fog_color_density: Vec4,
    },
    Postprocessing {
        effect: PostEffect,
        for_glow: bool,
    },
    BloomBlur {
        effect: PostEffect,
    },
    Lanczos(LanczosPass),
    Compositing(ColorCorrection),
    MotionBlur(MotionBlurParams),
    Glow {
        params: GlowParams,
        ext_texel_size_mult: f32,
        blur_texel_size_mult: f32,
    },
    GodRays(Box<GodRaysPass>),
    GodRaysCombine {
        intensity: f32,
    },
    LuminanceTrunced(Box<LuminanceTruncedParams>),
    Bloom {
        blur: f32,
    },
    Sky(Box<SkyPass>),
}

// ─── Subscene ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Subscene {
    pub kind: SubsceneKind,
    /// `None` only for the sink.
    pub camera: Option<CameraId>,
    pub enqueue: bool,
    pub do_render: bool,
    pub clear_color: bool,
    pub clear_depth: bool,
    pub depth_test: bool,
    pub blend: bool,
    /// Bind input textures right before rendering.
    pub assign_texture: bool,
    pub slinks_internal: Vec<Slink>,
    pub textures_internal: Vec<Option<TextureHandle>>,
    pub reflection_plane: Option<Vec4>,
    pub params: SubsceneParams,
}

impl Subscene {
    /// Subscene with the generic render state: enqueued, rendered, clears
    /// both buffers, depth-tested, opaque.
    #[must_use]
    pub fn new(kind: SubsceneKind, camera: Option<CameraId>) -> Self {
        Self {
            kind,
            camera,
            enqueue: true,
            do_render: true,
            clear_color: true,
            clear_depth: true,
            depth_test: true,
            blend: false,
            assign_texture: false,
            slinks_internal: Vec::new(),
            textures_internal: Vec::new(),
            reflection_plane: None,
            params: SubsceneParams::None,
        }
    }

    /// Full-screen pass: no clears, no depth test.
    fn fullscreen(kind: SubsceneKind, camera: CameraId) -> Self {
        Self {
            clear_color: false,
            clear_depth: false,
            depth_test: false,
            ..Self::new(kind, Some(camera))
        }
    }

    /// Pass drawing over its input without clearing, depth test kept.
    fn overlay(kind: SubsceneKind, camera: CameraId) -> Self {
        Self {
            clear_color: false,
            clear_depth: false,
            ..Self::new(kind, Some(camera))
        }
    }

    fn with_params(mut self, params: SubsceneParams) -> Self {
        self.params = params;
        self
    }

    pub fn push_internal(&mut self, slink: Slink) {
        self.slinks_internal.push(slink);
        self.textures_internal.push(None);
    }

    // ── Scene passes ──────────────────────────────────────────────────────

    #[must_use]
    pub fn shadow_cast(csm_index: u32, camera: CameraId) -> Self {
        Self {
            clear_color: false,
            ..Self::new(SubsceneKind::ShadowCast, Some(camera))
        }
        .with_params(SubsceneParams::ShadowCast { csm_index })
    }

    #[must_use]
    pub fn grass_map(camera: CameraId) -> Self {
        Self::new(SubsceneKind::GrassMap, Some(camera))
            .with_params(SubsceneParams::GrassMap { dim: Vec3::ZERO })
    }

    /// `attach_out`: the pass renders into attachments provided by a
    /// pass-through link instead of owning fresh buffers.
    #[must_use]
    pub fn main(pass: MainPass, camera: CameraId, attach_out: bool, mut params: MainParams) -> Self {
        let (clear_color, clear_depth, blend) = match (pass, attach_out) {
            (MainPass::Opaque, true) => (true, false, false),
            (MainPass::Opaque | MainPass::Reflect, _) => (true, true, false),
            (MainPass::Blend, true) => (false, false, true),
            (MainPass::Blend, false) => (true, true, true),
        };
        if pass == MainPass::Blend {
            params.zsort_eye_last = Some(Vec3::ZERO);
        }
        Self {
            clear_color,
            clear_depth,
            blend,
            ..Self::new(pass.kind(), Some(camera))
        }
        .with_params(SubsceneParams::Main(Box::new(params)))
    }

    #[must_use]
    pub fn color_picking(camera: CameraId) -> Self {
        Self {
            enqueue: false,
            ..Self::new(SubsceneKind::ColorPicking, Some(camera))
        }
    }

    #[must_use]
    pub fn wireframe(camera: CameraId) -> Self {
        Self {
            do_render: false,
            ..Self::overlay(SubsceneKind::Wireframe, camera)
        }
    }

    /// Depth prepass, also receiving shadows when cascades feed it.
    #[must_use]
    pub fn depth(camera: CameraId, shadow_visibility_falloff: f32) -> Self {
        Self::new(SubsceneKind::Depth, Some(camera)).with_params(SubsceneParams::Depth {
            shadow_visibility_falloff,
        })
    }

    #[must_use]
    pub fn blur_depth(camera: CameraId, params: BlurDepthParams) -> Self {
        Self::fullscreen(SubsceneKind::BlurDepth, camera)
            .with_params(SubsceneParams::BlurDepth(params))
    }

    /// Stores the depth attachment's red channel as RGBA.
    #[must_use]
    pub fn depth_pack(camera: CameraId) -> Self {
        Self::overlay(SubsceneKind::DepthPack, camera)
    }

    #[must_use]
    pub fn ssao(camera: CameraId, fog_color_density: Vec4, params: &SsaoParams) -> Self {
        let params = SsaoParams {
            dithering_amount: params.dithering_amount / 1000.0,
            ..*params
        };
        Self::fullscreen(SubsceneKind::Ssao, camera).with_params(SubsceneParams::Ssao {
            params,
            fog_color_density,
        })
    }

    #[must_use]
    pub fn refract(camera: CameraId) -> Self {
        Self::fullscreen(SubsceneKind::Refract, camera)
    }

    #[must_use]
    pub fn sky(camera: CameraId, num_lights: u32, params: &SkyParams) -> Self {
        Self {
            enqueue: false,
            ..Self::fullscreen(SubsceneKind::Sky, camera)
        }
        .with_params(SubsceneParams::Sky(Box::new(SkyPass {
            params: *params,
            lights: LightUniforms {
                num_lights,
                ..LightUniforms::with_capacity(num_lights)
            },
            world: WorldLightSet::default(),
            cube_view_matrices: cubemap_view_matrices(),
            cube_fog: Mat4::ZERO,
        })))
    }

    // ── Post-processing passes ────────────────────────────────────────────

    #[must_use]
    pub fn postprocessing(effect: PostEffect, camera: CameraId) -> Self {
        Self::fullscreen(SubsceneKind::Postprocessing, camera).with_params(
            SubsceneParams::Postprocessing {
                effect,
                for_glow: false,
            },
        )
    }

    /// Blur chain stage of the glow outline.
    #[must_use]
    pub fn glow_postprocessing(effect: PostEffect, camera: CameraId) -> Self {
        Self::fullscreen(SubsceneKind::Postprocessing, camera).with_params(
            SubsceneParams::Postprocessing {
                effect,
                for_glow: true,
            },
        )
    }

    #[must_use]
    pub fn bloom_blur(effect: PostEffect, camera: CameraId) -> Self {
        Self::fullscreen(SubsceneKind::BloomBlur, camera)
            .with_params(SubsceneParams::BloomBlur { effect })
    }

    #[must_use]
    pub fn god_rays(camera: CameraId, pass: GodRaysPass) -> Self {
        Self::fullscreen(SubsceneKind::GodRays, camera)
            .with_params(SubsceneParams::GodRays(Box::new(pass)))
    }

    #[must_use]
    pub fn god_rays_combine(intensity: f32, camera: CameraId) -> Self {
        Self::fullscreen(SubsceneKind::GodRaysCombine, camera)
            .with_params(SubsceneParams::GodRaysCombine { intensity })
    }

    #[must_use]
    pub fn luminance(camera: CameraId) -> Self {
        Self::overlay(SubsceneKind::Luminance, camera)
    }

    #[must_use]
    pub fn average_luminance(camera: CameraId) -> Self {
        Self::overlay(SubsceneKind::AverageLuminance, camera)
    }

    #[must_use]
    pub fn luminance_trunced(
        bloom_key: f32,
        edge_lum: f32,
        num_lights: u32,
        camera: CameraId,
    ) -> Self {
        Self::overlay(SubsceneKind::LuminanceTrunced, camera).with_params(
            SubsceneParams::LuminanceTrunced(Box::new(LuminanceTruncedParams {
                bloom_key,
                edge_lum,
                lights: LightUniforms::with_capacity(num_lights),
            })),
        )
    }

    /// Combines the blurred bright areas with the main image.
    #[must_use]
    pub fn bloom(blur: f32, camera: CameraId) -> Self {
        Self::overlay(SubsceneKind::Bloom, camera).with_params(SubsceneParams::Bloom { blur })
    }

    #[must_use]
    pub fn motion_blur(params: MotionBlurParams, camera: CameraId) -> Self {
        Self {
            assign_texture: true,
            ..Self::fullscreen(SubsceneKind::MotionBlur, camera)
        }
        .with_params(SubsceneParams::MotionBlur(params))
    }

    #[must_use]
    pub fn dof(camera: CameraId) -> Self {
        Self::fullscreen(SubsceneKind::Dof, camera)
    }

    #[must_use]
    pub fn glow_mask(camera: CameraId) -> Self {
        Self {
            depth_test: false,
            ..Self::new(SubsceneKind::GlowMask, Some(camera))
        }
    }

    #[must_use]
    pub fn glow(params: GlowParams, camera: CameraId) -> Self {
        Self {
            depth_test: false,
            ..Self::new(SubsceneKind::Glow, Some(camera))
        }
        .with_params(SubsceneParams::Glow {
            params,
            ext_texel_size_mult: 5.0,
            blur_texel_size_mult: 3.0,
        })
    }

    #[must_use]
    pub fn compositing(cc: ColorCorrection, camera: CameraId) -> Self {
        Self::fullscreen(SubsceneKind::Compositing, camera)
            .with_params(SubsceneParams::Compositing(cc))
    }

    #[must_use]
    pub fn antialiasing(camera: CameraId) -> Self {
        Self::fullscreen(SubsceneKind::Antialiasing, camera)
    }

    #[must_use]
    pub fn lanczos(pass: LanczosPass, camera: CameraId) -> Self {
        Self::fullscreen(SubsceneKind::Lanczos, camera).with_params(SubsceneParams::Lanczos(pass))
    }

    #[must_use]
    pub fn anaglyph(camera: CameraId) -> Self {
        Self::overlay(SubsceneKind::Anaglyph, camera)
    }

    /// Copies its input to the default framebuffer.
    #[must_use]
    pub fn screen(camera: CameraId) -> Self {
        Self::overlay(SubsceneKind::Screen, camera)
    }

    /// Terminal node closing the graph.
    #[must_use]
    pub fn sink() -> Self {
        Self {
            enqueue: false,
            ..Self::new(SubsceneKind::Sink, None)
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn lanczos_pass(&self) -> Option<LanczosPass> {
        match self.params {
            SubsceneParams::Lanczos(pass) => Some(pass),
            _ => None,
        }
    }

    #[must_use]
    pub fn post_effect(&self) -> Option<PostEffect> {
        match self.params {
            SubsceneParams::Postprocessing { effect, .. } | SubsceneParams::BloomBlur { effect } => {
                Some(effect)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn blur_orientation(&self) -> Option<Orientation> {
        match self.params {
            SubsceneParams::BlurDepth(p) => Some(p.orientation),
            _ => None,
        }
    }
}
