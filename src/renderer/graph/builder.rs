//! Pipeline Builder
//!
//! Assembles the rendering graph for a scene and camera, then runs the
//! post-construction stages that make it renderable:
//!
//! ```text
//! topology → consistency → resolution factor → textures → render targets
//! ```
//!
//! Two assemblers exist. [`PipelineBuilder::build_compat`] produces the
//! minimal forward chain usable without depth textures;
//! [`PipelineBuilder::build_full`] produces the complete pipeline, level by
//! level:
//!
//! | Level | Subscenes (per eye unless noted) |
//! |-------|----------------------------------|
//! | shadows | `SHADOW_CAST` per cascade (shared) |
//! | reflection | `MAIN_REFLECT` |
//! | grass | `GRASS_MAP` (shared) |
//! | depth | `DEPTH`, `SSAO`, `BLUR_DEPTH` ×2, `DEPTH_PACK` |
//! | main | `MAIN_OPAQUE`, `COLOR_PICKING`, `REFRACT`, `MAIN_BLEND`, `WIREFRAME` |
//! | post | god rays, bloom, motion blur, DOF, glow, compositing, antialiasing |
//! | output | `ANAGLYPH`, `SCREEN`, `SKY`, `SINK` |
//!
//! Each level consumes the subscenes the previous level left for it, one per
//! eye. A build either returns a complete graph or an error; the factory is
//! only called once the topology has been validated.

use smallvec::{SmallVec, smallvec};

use super::consistency::{apply_resolution_factor, enforce_graph_consistency};
use super::graph::{NodeId, RenderGraph};
use super::slink::{Slink, SlinkSource, SlinkTarget};
use super::subscene::{
    BlurDepthParams, GodRaysPass, LanczosPass, LightUniforms, MainParams, MainPass, Orientation,
    PostEffect, Subscene, SubsceneKind,
};
use super::targets::assign_render_targets;
use super::transient_pool::allocate_textures;
use crate::errors::{GraphError, Result};
use crate::renderer::settings::PipelineSettings;
use crate::resources::{FilterMode, ResourceFactory};
use crate::scene::{Camera, CameraId, CameraRender, Eye, Projection, RenderFeatures, SceneRender};

/// Subscenes of one level, one per eye.
type Level = SmallVec<[NodeId; 2]>;

// ─── Slink shorthands ─────────────────────────────────────────────────────────

fn sampler(source: SlinkSource, name: &'static str) -> Slink {
    Slink::viewport(source, SlinkTarget::sampler(name))
}

fn color_in(name: &'static str) -> Slink {
    sampler(SlinkSource::Color, name)
}

fn pass_through(source: SlinkSource) -> Slink {
    Slink::viewport(source, SlinkTarget::attachment_of(source))
}

fn to_screen() -> Slink {
    Slink::viewport(SlinkSource::Screen, SlinkTarget::None)
}

// ─── PipelineBuilder ──────────────────────────────────────────────────────────

/// Builds rendering graphs, creating their GPU resources through `factory`.
///
/// # Usage
///
/// ```rust,ignore
/// let mut factory = HeadlessFactory::new();
/// let settings = PipelineSettings::default();
/// let graph = PipelineBuilder::new(&settings, &mut factory)
///     .build_full(false, &scene_render, &camera_render)?;
/// let queue = build_queue(&graph)?;
/// ```
pub struct PipelineBuilder<'a> {
    settings: &'a PipelineSettings,
    factory: &'a mut dyn ResourceFactory,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(settings: &'a PipelineSettings, factory: &'a mut dyn ResourceFactory) -> Self {
        Self { settings, factory }
    }

    /// Minimal pipeline: `MAIN_OPAQUE → MAIN_BLEND → SINK`, plus optional
    /// wireframe, color picking and procedural sky passes.
    ///
    /// Opaque, blend and wireframe share the scene camera and render
    /// straight to the screen; depth links become renderbuffers.
    pub fn build_compat(
        &mut self,
        camera_render: &CameraRender,
        scene: &SceneRender,
    ) -> Result<RenderGraph> {
        log::debug!("Building compat rendering graph ({:?})", scene.features);

        let mut graph = RenderGraph::new();
        let cam = graph.add_camera(camera_render.camera.detached_copy());

        let main_params = |water| {
            MainParams::new(
                scene.lamps_number,
                scene.world_light_set,
                scene.fog_color_density,
                if water { scene.water_params.as_ref() } else { None },
            )
        };

        let opaque = graph.append_node(Subscene::main(MainPass::Opaque, cam, false, main_params(true)));
        let blend = graph.append_node(Subscene::main(MainPass::Blend, cam, true, main_params(false)));
        graph.append_edge(opaque, blend, to_screen());

        let sink = graph.append_node(Subscene::sink());

        if self.settings.wireframe_debug {
            let wireframe = graph.append_node(Subscene::wireframe(cam));
            graph.append_edge(blend, wireframe, to_screen());
            graph.append_edge(wireframe, sink, to_screen());
        } else {
            graph.append_edge(blend, sink, to_screen());
        }

        if scene.has(RenderFeatures::SELECTABILITY) {
            let picking_cam = copy_camera(&mut graph, cam);
            let picking = graph.append_node(Subscene::color_picking(picking_cam));
            graph.append_edge(picking, sink, Slink::viewport(SlinkSource::Color, SlinkTarget::None));
            graph.append_edge(picking, sink, Slink::viewport(SlinkSource::Depth, SlinkTarget::None));
        }

        if scene.has(RenderFeatures::PROCEDURAL_SKY) {
            let sky = append_sky(&mut graph, self.settings, scene);
            graph.append_edge(sky, sink, sky_link(self.settings));
        }

        self.finish(graph, true)
    }

    /// Complete pipeline for the enabled scene features.
    ///
    /// With `render_to_texture` the graph renders into a texture instead of
    /// the screen: stereo, reflections, refraction, color picking, glow and
    /// every post effect are skipped and a final `SCREEN` copy is added.
    pub fn build_full(
        &mut self,
        render_to_texture: bool,
        scene: &SceneRender,
        camera_render: &CameraRender,
    ) -> Result<RenderGraph> {
        log::debug!(
            "Building full rendering graph (rtt: {render_to_texture}, {:?})",
            scene.features
        );

        let mut pipeline = FullPipeline::new(self.settings, scene, camera_render, render_to_texture);
        pipeline.shadows()?;
        pipeline.main_cameras();
        pipeline.reflections();
        pipeline.grass_map();

        let mut level = pipeline.depth_and_opaque();
        pipeline.color_picking(&level);
        pipeline.refractions(&level);
        level = pipeline.blend(&level);
        if self.settings.wireframe_debug {
            level = pipeline.wireframe(&level);
        }
        if pipeline.post(RenderFeatures::GOD_RAYS) {
            level = pipeline.god_rays(&level);
        }
        if pipeline.post(RenderFeatures::BLOOM) {
            level = pipeline.bloom(&level);
        }
        if pipeline.post(RenderFeatures::MOTION_BLUR) {
            level = pipeline.motion_blur(&level);
        }
        if pipeline.dof_enabled() {
            level = pipeline.depth_of_field(&level);
        }
        if pipeline.post(RenderFeatures::SELECTABILITY) {
            level = pipeline.glow(&level);
        }
        if pipeline.post(RenderFeatures::COMPOSITING) {
            level = pipeline.compositing(&level);
        }
        if pipeline.post(RenderFeatures::ANTIALIASING) {
            level = pipeline.antialiasing(&level);
        }
        pipeline.close(&level);

        self.finish(pipeline.graph, false)
    }

    fn finish(&mut self, mut graph: RenderGraph, compat: bool) -> Result<RenderGraph> {
        graph.sink_node()?;
        graph.topsort()?;

        enforce_graph_consistency(&mut graph, compat)?;
        apply_resolution_factor(&mut graph, self.settings.resolution_factor);
        allocate_textures(&mut graph, self.factory, !self.settings.disable_texture_reuse)?;
        assign_render_targets(&mut graph, self.factory);

        log::debug!(
            "Rendering graph ready: {} subscenes, {} slinks, {} cameras",
            graph.node_count(),
            graph.edge_count(),
            graph.cameras().len()
        );
        Ok(graph)
    }
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

/// Copy of another camera of the graph for a new pass.
fn copy_camera(graph: &mut RenderGraph, source: CameraId) -> CameraId {
    let camera = graph
        .camera(source)
        .map_or_else(|| Camera::new(Projection::None), Camera::detached_copy);
    graph.add_camera(camera)
}

fn append_sky(graph: &mut RenderGraph, settings: &PipelineSettings, scene: &SceneRender) -> NodeId {
    let cam = graph.add_camera(Camera::new(Projection::None).with_fixed_size(settings.sky_tex_size));
    graph.append_node(Subscene::sky(cam, scene.lamps_number, &scene.sky_params))
}

fn sky_link(settings: &PipelineSettings) -> Slink {
    Slink::fixed(SlinkSource::Cubemap, SlinkTarget::sampler("u_sky"), settings.sky_tex_size)
}

// ─── Full pipeline assembly ───────────────────────────────────────────────────

struct FullPipeline<'s> {
    settings: &'s PipelineSettings,
    scene: &'s SceneRender,
    camera_render: &'s CameraRender,
    rtt: bool,
    graph: RenderGraph,

    main_cams: SmallVec<[CameraId; 2]>,
    /// Cascades with the link feeding receivers (shared by both eyes).
    shadows: Vec<(NodeId, Slink)>,
    reflections: SmallVec<[(NodeId, Slink); 2]>,
    grass: Option<(NodeId, Slink, Slink)>,
    depth_packs: Level,
    main_color_links: SmallVec<[Slink; 2]>,
    main_depth_links: SmallVec<[Slink; 2]>,
    opaque_color_link: Option<Slink>,
    refractions: SmallVec<[(NodeId, Slink); 2]>,
    blends: Level,
    color_picking: Option<NodeId>,
}

impl<'s> FullPipeline<'s> {
    fn new(
        settings: &'s PipelineSettings,
        scene: &'s SceneRender,
        camera_render: &'s CameraRender,
        rtt: bool,
    ) -> Self {
        Self {
            settings,
            scene,
            camera_render,
            rtt,
            graph: RenderGraph::new(),
            main_cams: SmallVec::new(),
            shadows: Vec::new(),
            reflections: SmallVec::new(),
            grass: None,
            depth_packs: Level::new(),
            main_color_links: SmallVec::new(),
            main_depth_links: SmallVec::new(),
            opaque_color_link: None,
            refractions: SmallVec::new(),
            blends: Level::new(),
            color_picking: None,
        }
    }

    /// Feature enabled and rendered to the screen.
    fn post(&self, feature: RenderFeatures) -> bool {
        self.scene.has(feature) && !self.rtt
    }

    fn stereo(&self) -> bool {
        self.settings.anaglyph && !self.rtt
    }

    fn dof_enabled(&self) -> bool {
        self.settings.dof && self.camera_render.wants_dof() && !self.rtt
    }

    fn reflection_plane(&self) -> Option<glam::Vec4> {
        if self.reflections.is_empty() {
            None
        } else {
            self.scene.refl_planes.first().copied()
        }
    }

    fn main_params(&self) -> MainParams {
        MainParams::new(
            self.scene.lamps_number,
            self.scene.world_light_set,
            self.scene.fog_color_density,
            self.scene.water_params.as_ref(),
        )
    }

    fn copy_main(&mut self, eye: usize) -> CameraId {
        copy_camera(&mut self.graph, self.main_cams[eye])
    }

    fn screen_camera(&mut self) -> CameraId {
        self.graph.add_camera(Camera::new(Projection::None))
    }

    fn add(&mut self, subscene: Subscene) -> NodeId {
        self.graph.append_node(subscene)
    }

    fn link(&mut self, from: NodeId, to: NodeId, slink: Slink) {
        self.graph.append_edge(from, to, slink);
    }

    fn link_grass(&mut self, to: NodeId) {
        if let Some((grass, depth, color)) = self.grass.clone() {
            self.link(grass, to, depth);
            self.link(grass, to, color);
        }
    }

    // ── Scene levels ──────────────────────────────────────────────────────

    fn shadows(&mut self) -> Result<()> {
        if !self.scene.has(RenderFeatures::SHADOWS) {
            return Ok(());
        }
        let csm_num = self.scene.shadow_params.csm_num;
        if csm_num == 0 {
            return Err(GraphError::ZeroCascades);
        }

        let size = self.settings.shadow_tex_size;
        for i in 0..csm_num {
            let cam = self
                .graph
                .add_camera(Camera::new(Projection::OrthoAsymmetric).with_fixed_size(size));
            let mut subs = Subscene::shadow_cast(i, cam);
            if self.settings.depth_only_workaround {
                subs.push_internal(Slink::fixed(SlinkSource::Color, SlinkTarget::Color, size));
            }
            let id = self.add(subs);
            let link = Slink::fixed(
                SlinkSource::Depth,
                SlinkTarget::sampler(format!("u_shadow_map{i}")),
                size,
            );
            self.shadows.push((id, link));
        }
        Ok(())
    }

    fn main_cameras(&mut self) {
        let left = self.graph.add_camera(self.camera_render.camera.detached_copy());
        self.main_cams.push(left);

        if self.stereo() {
            let right = copy_camera(&mut self.graph, left);
            for (cam, eye) in [(left, Eye::Left), (right, Eye::Right)] {
                if let Some(camera) = self.graph.camera_mut(cam) {
                    camera.make_stereo(eye);
                }
            }
            self.main_cams.push(right);
        }
    }

    fn reflections(&mut self) {
        let Some(&plane) = self.scene.refl_planes.first() else {
            return;
        };
        if self.rtt {
            return;
        }

        let mult = self.settings.reflect_multiplier;
        for eye in 0..self.main_cams.len() {
            let cam = self.copy_main(eye);
            if let Some(camera) = self.graph.camera_mut(cam) {
                camera.reflection_plane = Some(plane);
            }

            let mut subs = Subscene::main(MainPass::Reflect, cam, false, self.main_params());
            subs.reflection_plane = Some(plane);
            subs.push_internal(Slink::scaled(SlinkSource::Depth, SlinkTarget::Depth, mult));
            let id = self.add(subs);

            let link = Slink::scaled(SlinkSource::Color, SlinkTarget::sampler("u_reflectmap"), mult);
            self.reflections.push((id, link));
        }
    }

    fn grass_map(&mut self) {
        if !self.scene.has(RenderFeatures::DYNAMIC_GRASS) {
            return;
        }
        let size = self.settings.grass_tex_size;
        let cam = self
            .graph
            .add_camera(Camera::new(Projection::OrthoAspect).with_fixed_size(size));
        let id = self.add(Subscene::grass_map(cam));

        let depth =
            Slink::fixed(SlinkSource::Depth, SlinkTarget::sampler("u_grass_map_depth"), size).linear();
        let color =
            Slink::fixed(SlinkSource::Color, SlinkTarget::sampler("u_grass_map_color"), size).linear();
        self.grass = Some((id, depth, color));
    }

    /// Depth prepass with shadow receiving, then the opaque main pass.
    fn depth_and_opaque(&mut self) -> Level {
        let mut level = Level::new();
        let falloff = self.scene.shadow_params.visibility_falloff;

        for eye in 0..self.main_cams.len() {
            let cam = self.main_cams[eye];
            let cam_depth = copy_camera(&mut self.graph, cam);

            let (depth, shadow_mask) = if self.shadows.is_empty() {
                let mut subs = Subscene::depth(cam_depth, falloff);
                if self.settings.depth_only_workaround {
                    subs.push_internal(pass_through(SlinkSource::Color));
                }
                (self.add(subs), None)
            } else {
                let depth = self.add(Subscene::depth(cam_depth, falloff));
                let mask = self.shadow_receive(eye, depth);
                (depth, Some(mask))
            };

            let cam_pack = copy_camera(&mut self.graph, cam_depth);
            let pack = self.add(Subscene::depth_pack(cam_pack));
            self.link(depth, pack, sampler(SlinkSource::Depth, "u_depth"));
            self.depth_packs.push(pack);

            let depth_out = pass_through(SlinkSource::Depth);
            self.main_depth_links.push(depth_out.clone());

            self.link_grass(depth);

            let opaque = self.add(Subscene::main(MainPass::Opaque, cam, true, self.main_params()));
            level.push(opaque);
            self.link(depth, opaque, depth_out);

            if let Some((blur, mask)) = shadow_mask {
                self.link(blur, opaque, mask);
            }

            self.opaque_color_link = Some(color_in("u_color"));
            self.main_color_links.push(pass_through(SlinkSource::Color));

            self.link_grass(opaque);

            if let Some((reflect, link)) = self.reflections.get(eye).cloned() {
                self.link(reflect, opaque, link);
                if let Some(subs) = self.graph.node_mut(opaque) {
                    subs.reflection_plane = self.scene.refl_planes.first().copied();
                }
            }
        }
        level
    }

    /// Cascades → depth, optional SSAO, depth-aware X/Y blur. Returns the
    /// blur producing the shadow mask and its link to the opaque pass.
    fn shadow_receive(&mut self, eye: usize, depth: NodeId) -> (NodeId, Slink) {
        for (shadow, link) in self.shadows.clone() {
            self.link(shadow, depth, link);
        }

        let depth_color = color_in("u_color");
        let depth_depth = sampler(SlinkSource::Depth, "u_depth");

        let ssao = if self.scene.has(RenderFeatures::SSAO) {
            let cam = self.copy_main(eye);
            let subs = Subscene::ssao(cam, self.scene.fog_color_density, &self.scene.ssao_params);
            let ssao = self.add(subs);
            self.link(depth, ssao, depth_color.clone());
            self.link(depth, ssao, depth_depth.clone());
            Some(ssao)
        } else {
            None
        };

        let cam_x = self.copy_main(eye);
        let cam_y = self.copy_main(eye);
        let shadow_params = self.scene.shadow_params;

        let blur_x = self.add(Subscene::blur_depth(
            cam_x,
            BlurDepthParams::new(Orientation::X, &shadow_params),
        ));
        match ssao {
            Some(ssao) => self.link(ssao, blur_x, color_in("u_color")),
            None => self.link(depth, blur_x, depth_color),
        }
        self.link(depth, blur_x, depth_depth.clone());

        let blur_y = self.add(Subscene::blur_depth(
            cam_y,
            BlurDepthParams::new(Orientation::Y, &shadow_params),
        ));
        self.link(blur_x, blur_y, color_in("u_color"));
        self.link(depth, blur_y, depth_depth);

        (blur_y, color_in("u_shadow_mask"))
    }

    /// Color picking renders the left eye only and feeds the sink directly.
    fn color_picking(&mut self, opaque: &Level) {
        if !self.post(RenderFeatures::SELECTABILITY) {
            return;
        }
        let Some(cam) = self.graph.node(opaque[0]).and_then(|s| s.camera) else {
            return;
        };
        let cam = copy_camera(&mut self.graph, cam);
        self.color_picking = Some(self.add(Subscene::color_picking(cam)));
    }

    fn refractions(&mut self, opaque: &Level) {
        if !self.post(RenderFeatures::REFRACTIONS) {
            return;
        }
        let Some(color) = self.opaque_color_link.clone() else {
            return;
        };
        for &prev in opaque {
            let cam = self.screen_camera();
            let refract = self.add(Subscene::refract(cam));
            self.link(prev, refract, color.clone());
            self.refractions.push((refract, color_in("u_refractmap")));
        }
    }

    fn blend(&mut self, opaque: &Level) -> Level {
        let mut level = Level::new();
        for (eye, &prev) in opaque.iter().enumerate() {
            let cam = self.copy_main(eye);
            let blend = self.add(Subscene::main(MainPass::Blend, cam, true, self.main_params()));
            level.push(blend);

            self.link(prev, blend, self.main_color_links[eye].clone());
            self.link(prev, blend, self.main_depth_links[eye].clone());
            self.link_grass(blend);
            for (shadow, link) in self.shadows.clone() {
                self.link(shadow, blend, link);
            }

            let shore = color_in("u_shore_depth").with_filters(FilterMode::Nearest, FilterMode::Nearest);
            self.link(self.depth_packs[eye], blend, shore);

            if let Some((reflect, link)) = self.reflections.get(eye).cloned() {
                self.link(reflect, blend, link);
                if let Some(subs) = self.graph.node_mut(blend) {
                    subs.reflection_plane = self.scene.refl_planes.first().copied();
                }
            }
            if let Some((refract, link)) = self.refractions.get(eye).cloned() {
                self.link(refract, blend, link);
            }
        }
        self.blends = level.clone();
        level
    }

    fn wireframe(&mut self, prev_level: &Level) -> Level {
        let mut level = Level::new();
        for (eye, &prev) in prev_level.iter().enumerate() {
            let cam = self.copy_main(eye);
            let wireframe = self.add(Subscene::wireframe(cam));
            level.push(wireframe);
            self.link(prev, wireframe, self.main_color_links[eye].clone());
            self.link(prev, wireframe, self.main_depth_links[eye].clone());
            self.link_grass(wireframe);
        }
        level
    }

    // ── Post-processing levels ────────────────────────────────────────────

    /// Depth pack followed by two radial blurs at halving step sizes, then
    /// combined with the scene.
    fn god_rays(&mut self, prev_level: &Level) -> Level {
        let params = self.scene.god_rays_params;
        let water = self.scene.water_params.is_some();
        let plane = self.reflection_plane();
        let base_step = params.max_ray_length / params.steps_per_pass;

        let mut level = Level::new();
        for (eye, &prev) in prev_level.iter().enumerate() {
            let depth_in = sampler(SlinkSource::Depth, "u_input").linear();
            let color_in_quarter = Slink::scaled(SlinkSource::Color, SlinkTarget::sampler("u_input"), 0.25)
                .with_filters(FilterMode::Linear, FilterMode::Nearest);

            let mut passes: SmallVec<[NodeId; 3]> = SmallVec::new();
            for (pack, step) in [(true, 1.0), (false, 0.5), (false, 0.25)] {
                let cam = self.copy_main(eye);
                let pass = GodRaysPass {
                    pack,
                    water,
                    radial_blur_step: base_step * step,
                    max_ray_length: params.max_ray_length,
                    steps_per_pass: params.steps_per_pass,
                    lights: LightUniforms {
                        num_lights: self.scene.lamps_number,
                        ..LightUniforms::with_capacity(self.scene.lamps_number)
                    },
                    world: self.scene.world_light_set,
                };
                let mut subs = Subscene::god_rays(cam, pass);
                subs.reflection_plane = plane;
                let id = self.add(subs);

                match passes.last() {
                    None => self.link(prev, id, depth_in.clone()),
                    Some(&previous) => self.link(previous, id, color_in_quarter.clone()),
                }
                passes.push(id);
            }

            let cam = self.screen_camera();
            let combine = self.add(Subscene::god_rays_combine(params.intensity, cam));
            self.link(prev, combine, color_in("u_main"));
            self.link(passes[2], combine, color_in("u_god_rays"));
            level.push(combine);
        }
        level
    }

    /// Luminance → average → truncated bright areas → separable blur → add.
    fn bloom(&mut self, prev_level: &Level) -> Level {
        let params = self.scene.bloom_params;
        let quarter = |name: &'static str| {
            Slink::scaled(SlinkSource::Color, SlinkTarget::sampler(name), 0.25).linear()
        };

        let mut level = Level::new();
        for (eye, &prev) in prev_level.iter().enumerate() {
            let cam = self.screen_camera();
            let luminance = self.add(Subscene::luminance(cam));
            self.link(prev, luminance, color_in("u_input"));

            let cam = self.screen_camera();
            let average = self.add(Subscene::average_luminance(cam));
            self.link(luminance, average, quarter("u_input"));

            let cam = self.copy_main(eye);
            let trunced = self.add(Subscene::luminance_trunced(
                params.key,
                params.edge_lum,
                self.scene.lamps_number,
                cam,
            ));
            self.link(prev, trunced, color_in("u_main"));
            self.link(luminance, trunced, quarter("u_luminance"));
            self.link(
                average,
                trunced,
                Slink::new(SlinkSource::Color, SlinkTarget::sampler("u_average_lum"), 1, 1.0, false),
            );

            let blur_in = quarter("u_color");
            let cam = self.screen_camera();
            let blur_x = self.add(Subscene::bloom_blur(PostEffect::XBlur, cam));
            self.link(trunced, blur_x, blur_in.clone());

            let cam = self.screen_camera();
            let blur_y = self.add(Subscene::bloom_blur(PostEffect::YBlur, cam));
            self.link(blur_x, blur_y, blur_in);

            let cam = self.screen_camera();
            let combine = self.add(Subscene::bloom(params.blur, cam));
            self.link(
                blur_y,
                combine,
                Slink::scaled(SlinkSource::Color, SlinkTarget::sampler("u_bloom"), 0.25),
            );
            self.link(prev, combine, color_in("u_main"));
            level.push(combine);
        }
        level
    }

    fn motion_blur(&mut self, prev_level: &Level) -> Level {
        let mut level = Level::new();
        for &prev in prev_level {
            let cam = self.screen_camera();
            let mut subs = Subscene::motion_blur(self.scene.mb_params, cam);
            subs.push_internal(color_in("u_mb_tex_accum"));
            let mb = self.add(subs);
            self.link(prev, mb, color_in("u_mb_tex_curr"));
            level.push(mb);
        }
        level
    }

    fn depth_of_field(&mut self, prev_level: &Level) -> Level {
        let mut level = Level::new();
        for (eye, &prev) in prev_level.iter().enumerate() {
            let cam_dof = self.copy_main(eye);
            if let Some(camera) = self.graph.camera_mut(cam_dof) {
                camera.dof = Some(self.camera_render.depth_of_field());
            }

            let blur_in = color_in("u_color").linear();
            let cam = self.screen_camera();
            let blur_x = self.add(Subscene::postprocessing(PostEffect::XBlur, cam));
            self.link(prev, blur_x, blur_in.clone());

            let cam = self.screen_camera();
            let blur_y = self.add(Subscene::postprocessing(PostEffect::YBlur, cam));
            self.link(blur_x, blur_y, blur_in);

            let dof = self.add(Subscene::dof(cam_dof));
            self.link(prev, dof, color_in("u_sharp"));
            self.link(blur_y, dof, color_in("u_blurred"));
            self.link(self.blends[eye], dof, sampler(SlinkSource::Depth, "u_depth"));
            level.push(dof);
        }
        level
    }

    /// Outline of selected objects: mask, extend ×0.5, blur ×0.25, combine.
    fn glow(&mut self, prev_level: &Level) -> Level {
        let mut level = Level::new();
        for (eye, &prev) in prev_level.iter().enumerate() {
            let cam = self.copy_main(eye);
            let mask = self.add(Subscene::glow_mask(cam));

            let cam = self.screen_camera();
            let x_extend = self.add(Subscene::glow_postprocessing(PostEffect::XExtend, cam));
            self.link(mask, x_extend, color_in("u_color"));

            let extended =
                Slink::scaled(SlinkSource::Color, SlinkTarget::sampler("u_color"), 0.5).linear();
            let cam = self.screen_camera();
            let y_extend = self.add(Subscene::glow_postprocessing(PostEffect::YExtend, cam));
            self.link(x_extend, y_extend, extended.clone());

            let cam = self.screen_camera();
            let x_blur = self.add(Subscene::glow_postprocessing(PostEffect::XBlur, cam));
            self.link(y_extend, x_blur, extended);

            let cam = self.screen_camera();
            let y_blur = self.add(Subscene::glow_postprocessing(PostEffect::YBlur, cam));
            self.link(
                x_blur,
                y_blur,
                Slink::scaled(SlinkSource::Color, SlinkTarget::sampler("u_color"), 0.25).linear(),
            );

            let cam = self.screen_camera();
            let glow = self.add(Subscene::glow(self.scene.glow_params, cam));
            self.link(prev, glow, color_in("u_glow_src"));
            self.link(mask, glow, color_in("u_glow_mask"));
            self.link(
                y_blur,
                glow,
                Slink::scaled(SlinkSource::Color, SlinkTarget::sampler("u_glow_mask_blurred"), 0.25)
                    .linear(),
            );
            level.push(glow);
        }
        level
    }

    fn compositing(&mut self, prev_level: &Level) -> Level {
        let mut level = Level::new();
        for &prev in prev_level {
            let cam = self.screen_camera();
            let comp = self.add(Subscene::compositing(self.scene.cc_params, cam));
            self.link(prev, comp, color_in("u_color"));
            level.push(comp);
        }
        level
    }

    fn antialiasing(&mut self, prev_level: &Level) -> Level {
        let mut level = Level::new();
        for &prev in prev_level {
            let input = color_in("u_color").linear();
            if self.settings.uses_lanczos() {
                let cam = self.screen_camera();
                let lanczos_x = self.add(Subscene::lanczos(LanczosPass::X, cam));
                self.link(prev, lanczos_x, input);

                let cam = self.screen_camera();
                let lanczos_y = self.add(Subscene::lanczos(LanczosPass::Y, cam));
                self.link(lanczos_x, lanczos_y, color_in("u_color").linear());
                level.push(lanczos_y);
            } else {
                let cam = self.screen_camera();
                let aa = self.add(Subscene::antialiasing(cam));
                self.link(prev, aa, input);
                level.push(aa);
            }
        }
        level
    }

    // ── Output ────────────────────────────────────────────────────────────

    /// Stereo combine, screen copy, sky and the sink.
    fn close(&mut self, prev_level: &Level) {
        let feeder = if self.stereo() {
            let cam = self.screen_camera();
            let anaglyph = self.add(Subscene::anaglyph(cam));
            self.link(prev_level[0], anaglyph, color_in("u_sampler_left"));
            self.link(prev_level[1], anaglyph, color_in("u_sampler_right"));
            anaglyph
        } else {
            prev_level[0]
        };

        // a pass drawing into inherited attachments cannot render on screen
        let inherits = self
            .graph
            .input_edges(feeder)
            .any(|(_, e)| e.slink.is_pass_through());

        let mut terminals: Level = smallvec![feeder];
        if inherits || self.rtt {
            let cam = self.screen_camera();
            let screen = self.add(Subscene::screen(cam));
            self.link(feeder, screen, color_in("u_color"));
            terminals = smallvec![screen];
        }

        if let Some(picking) = self.color_picking {
            terminals.push(picking);
        }
        if self.post(RenderFeatures::PROCEDURAL_SKY) {
            terminals.push(append_sky(&mut self.graph, self.settings, self.scene));
        }

        let sink = self.add(Subscene::sink());
        for terminal in terminals {
            match self.graph.kind(terminal) {
                Some(SubsceneKind::ColorPicking) => {
                    self.link(terminal, sink, Slink::viewport(SlinkSource::Color, SlinkTarget::None));
                    self.link(terminal, sink, Slink::viewport(SlinkSource::Depth, SlinkTarget::None));
                }
                Some(SubsceneKind::Sky) => self.link(terminal, sink, sky_link(self.settings)),
                _ => self.link(terminal, sink, to_screen()),
            }
        }

        for dangling in self.graph.sink_nodes() {
            if self.depth_packs.contains(&dangling) {
                log::warn!("Removing depth pack subscene without consumers");
                self.graph.remove_node(dangling);
            }
        }
    }
}
