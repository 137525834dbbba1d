//! Rendering Graph Tests
//!
//! Tests for:
//! - Full and compat pipeline topology for feature combinations
//! - Stereo, render-to-texture and wireframe variants
//! - Queue ordering against graph edges
//! - Texture pool reuse, texture liveness and motion blur isolation
//! - Glow bypass links on built graphs
//! - Render target binding counts
//! - Resolution factor scaling around the Lanczos chain
//! - Compat resource legality
//! - Settings loading and DOT export

use std::collections::HashMap;

use myth_scenegraph::renderer::graph::{
    KeyTag, enforce_graph_consistency, find_on_screen, find_subs, get_inputs, has_lower_subs,
};
use myth_scenegraph::{
    Camera, CameraRender, ErrorKind, GraphError, HeadlessFactory, NodeId, PipelineBuilder,
    PipelineSettings, Projection, RenderFeatures, RenderGraph, SceneRender, Slink, SlinkSource,
    SlinkTarget, Subscene, SubsceneKind, TextureHandle, TextureKind, build_queue,
    debug_convert_to_dot,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build_full(
    settings: &PipelineSettings,
    features: RenderFeatures,
    rtt: bool,
) -> anyhow::Result<(RenderGraph, HeadlessFactory)> {
    init_logger();
    let mut factory = HeadlessFactory::new();
    let scene = SceneRender::with_features(features);
    let camera = CameraRender::default();
    let graph = PipelineBuilder::new(settings, &mut factory).build_full(rtt, &scene, &camera)?;
    Ok((graph, factory))
}

fn build_compat(
    settings: &PipelineSettings,
    features: RenderFeatures,
) -> anyhow::Result<(RenderGraph, HeadlessFactory)> {
    init_logger();
    let mut factory = HeadlessFactory::new();
    let scene = SceneRender::with_features(features);
    let camera = CameraRender::default();
    let graph = PipelineBuilder::new(settings, &mut factory).build_compat(&camera, &scene)?;
    Ok((graph, factory))
}

fn kinds(graph: &RenderGraph, ids: &[NodeId]) -> Vec<SubsceneKind> {
    ids.iter().filter_map(|&id| graph.kind(id)).collect()
}

fn count(graph: &RenderGraph, kind: SubsceneKind) -> usize {
    graph.nodes().filter(|(_, s)| s.kind == kind).count()
}

fn assert_closed(graph: &RenderGraph) {
    let sink = graph.sink_node().expect("graph must have a single sink");
    assert_eq!(graph.kind(sink), Some(SubsceneKind::Sink));
    for (id, subs) in graph.nodes() {
        assert!(
            has_lower_subs(graph, id, SubsceneKind::Sink),
            "{} does not reach the sink",
            subs.kind
        );
    }
    graph.topsort().expect("graph must be acyclic");
}

/// Walks the passes in execution order and fails when a pass renders into a
/// texture that an earlier write still needs. A texture stays live from its
/// write until its last reader; only a pass continuing it through a
/// pass-through input may write it again.
fn assert_no_live_texture_reassigned(graph: &RenderGraph) -> anyhow::Result<()> {
    let order = graph.topsort()?;
    let position: HashMap<NodeId, usize> =
        order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let mut live_until: HashMap<TextureHandle, usize> = HashMap::new();

    for (i, &id) in order.iter().enumerate() {
        let subs = graph.node(id).expect("sorted subscene");
        let is_live = |tex: &TextureHandle| live_until.get(tex).is_some_and(|&end| end >= i);

        for tex in subs.textures_internal.iter().flatten() {
            assert!(!is_live(tex), "{} scratch texture {tex:?} is still in use", subs.kind);
        }

        let continued: Vec<TextureHandle> = graph
            .input_edges(id)
            .filter(|(_, e)| e.slink.is_pass_through())
            .filter_map(|(_, e)| e.slink.texture)
            .collect();
        let written: Vec<(TextureHandle, usize)> = graph
            .output_edges(id)
            .filter_map(|(_, e)| {
                let tex = e.slink.texture?;
                let end = if e.slink.to == SlinkTarget::None { i } else { position[&e.to] };
                Some((tex, end))
            })
            .collect();

        for (tex, _) in &written {
            assert!(
                !is_live(tex) || continued.contains(tex),
                "{} renders into {tex:?} while an earlier pass still uses it",
                subs.kind
            );
        }
        for (tex, end) in written {
            let until = live_until.entry(tex).or_insert(end);
            *until = (*until).max(end);
        }
    }
    Ok(())
}

// ============================================================================
// Full Pipeline Topology
// ============================================================================

#[test]
fn minimal_full_pipeline() -> anyhow::Result<()> {
    let (graph, factory) = build_full(&PipelineSettings::default(), RenderFeatures::empty(), false)?;
    assert_closed(&graph);

    let queue = build_queue(&graph)?;
    assert_eq!(
        kinds(&graph, &queue),
        vec![
            SubsceneKind::Depth,
            SubsceneKind::DepthPack,
            SubsceneKind::MainOpaque,
            SubsceneKind::MainBlend,
            SubsceneKind::Screen,
        ]
    );

    assert_eq!(factory.count(TextureKind::DepthTexture), 1);
    assert_eq!(factory.count(TextureKind::Color), 2);
    assert_eq!(factory.render_targets().len(), 4);

    let screen = find_on_screen(&graph).expect("a pass must render on screen");
    assert_eq!(graph.kind(screen), Some(SubsceneKind::Screen));
    Ok(())
}

#[test]
fn feature_combinations_stay_closed() -> anyhow::Result<()> {
    let combos = [
        RenderFeatures::SHADOWS,
        RenderFeatures::SHADOWS | RenderFeatures::SSAO,
        RenderFeatures::GOD_RAYS | RenderFeatures::BLOOM,
        RenderFeatures::MOTION_BLUR | RenderFeatures::ANTIALIASING,
        RenderFeatures::SELECTABILITY | RenderFeatures::COMPOSITING,
        RenderFeatures::REFRACTIONS | RenderFeatures::DYNAMIC_GRASS,
        RenderFeatures::PROCEDURAL_SKY,
        RenderFeatures::all(),
    ];

    for features in combos {
        for anaglyph in [false, true] {
            for rtt in [false, true] {
                let settings = PipelineSettings {
                    anaglyph,
                    ..Default::default()
                };
                let (graph, _) = build_full(&settings, features, rtt)?;
                assert_closed(&graph);
                assert!(!build_queue(&graph)?.is_empty());
            }
        }
    }
    Ok(())
}

#[test]
fn zero_cascades_is_a_configuration_error() {
    init_logger();
    let mut factory = HeadlessFactory::new();
    let mut scene = SceneRender::with_features(RenderFeatures::SHADOWS);
    scene.shadow_params.csm_num = 0;
    let settings = PipelineSettings::default();

    let err = PipelineBuilder::new(&settings, &mut factory)
        .build_full(false, &scene, &CameraRender::default())
        .unwrap_err();

    assert!(matches!(err, GraphError::ZeroCascades));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(factory.textures().is_empty());
}

#[test]
fn shadow_cascades_feed_depth_and_blend() -> anyhow::Result<()> {
    init_logger();
    let mut factory = HeadlessFactory::new();
    let mut scene = SceneRender::with_features(RenderFeatures::SHADOWS | RenderFeatures::SSAO);
    scene.shadow_params.csm_num = 3;
    let settings = PipelineSettings::default();
    let graph = PipelineBuilder::new(&settings, &mut factory).build_full(
        false,
        &scene,
        &CameraRender::default(),
    )?;

    assert_eq!(count(&graph, SubsceneKind::ShadowCast), 3);
    assert_eq!(count(&graph, SubsceneKind::Ssao), 1);
    assert_eq!(count(&graph, SubsceneKind::BlurDepth), 2);

    let depth = find_subs(&graph, SubsceneKind::Depth).expect("depth pass");
    let blend = find_subs(&graph, SubsceneKind::MainBlend).expect("blend pass");
    let opaque = find_subs(&graph, SubsceneKind::MainOpaque).expect("opaque pass");

    let casts = |id| -> anyhow::Result<usize> {
        Ok(kinds(&graph, &get_inputs(&graph, id)?)
            .into_iter()
            .filter(|&k| k == SubsceneKind::ShadowCast)
            .count())
    };
    assert_eq!(casts(depth)?, 3);
    assert_eq!(casts(blend)?, 3);
    assert!(kinds(&graph, &get_inputs(&graph, opaque)?).contains(&SubsceneKind::BlurDepth));

    let shadow_maps = factory
        .textures()
        .iter()
        .filter(|t| t.kind == TextureKind::DepthTexture && (t.width - 1024.0).abs() < f32::EPSILON)
        .count();
    assert!(shadow_maps >= 1);
    Ok(())
}

#[test]
fn bloom_chain_is_queued_in_order() -> anyhow::Result<()> {
    let (graph, _) = build_full(&PipelineSettings::default(), RenderFeatures::BLOOM, false)?;
    let queue = kinds(&graph, &build_queue(&graph)?);

    let position = |kind| queue.iter().position(|&k| k == kind).expect("bloom stage queued");
    let stages = [
        SubsceneKind::MainBlend,
        SubsceneKind::Luminance,
        SubsceneKind::AverageLuminance,
        SubsceneKind::LuminanceTrunced,
        SubsceneKind::BloomBlur,
        SubsceneKind::Bloom,
    ];
    for pair in stages.windows(2) {
        assert!(position(pair[0]) < position(pair[1]), "{} before {}", pair[0], pair[1]);
    }
    assert_eq!(count(&graph, SubsceneKind::BloomBlur), 2);
    Ok(())
}

// ============================================================================
// Output Variants
// ============================================================================

#[test]
fn wireframe_adds_one_pass_per_eye() -> anyhow::Result<()> {
    let mono = PipelineSettings {
        wireframe_debug: true,
        ..Default::default()
    };
    let (graph, _) = build_full(&mono, RenderFeatures::empty(), false)?;
    assert_eq!(count(&graph, SubsceneKind::Wireframe), 1);

    let stereo = PipelineSettings {
        wireframe_debug: true,
        anaglyph: true,
        ..Default::default()
    };
    let (graph, _) = build_full(&stereo, RenderFeatures::empty(), false)?;
    assert_eq!(count(&graph, SubsceneKind::Wireframe), 2);
    Ok(())
}

#[test]
fn stereo_doubles_eye_passes_into_anaglyph() -> anyhow::Result<()> {
    let settings = PipelineSettings {
        anaglyph: true,
        ..Default::default()
    };
    let (graph, _) = build_full(&settings, RenderFeatures::SHADOWS, false)?;

    assert_eq!(count(&graph, SubsceneKind::MainOpaque), 2);
    assert_eq!(count(&graph, SubsceneKind::MainBlend), 2);
    assert_eq!(count(&graph, SubsceneKind::Depth), 2);
    // cascades are shared by both eyes
    assert_eq!(count(&graph, SubsceneKind::ShadowCast), 1);
    assert_eq!(count(&graph, SubsceneKind::Anaglyph), 1);
    assert_eq!(count(&graph, SubsceneKind::Screen), 0);

    let sink = graph.sink_node()?;
    let anaglyph = find_subs(&graph, SubsceneKind::Anaglyph).expect("anaglyph pass");
    assert_eq!(get_inputs(&graph, sink)?, vec![anaglyph]);
    assert_eq!(find_on_screen(&graph), Some(anaglyph));
    Ok(())
}

#[test]
fn render_to_texture_skips_screen_effects() -> anyhow::Result<()> {
    let settings = PipelineSettings {
        anaglyph: true,
        ..Default::default()
    };
    let features = RenderFeatures::SHADOWS
        | RenderFeatures::BLOOM
        | RenderFeatures::GOD_RAYS
        | RenderFeatures::SELECTABILITY
        | RenderFeatures::PROCEDURAL_SKY;
    let (graph, _) = build_full(&settings, features, true)?;

    assert_eq!(count(&graph, SubsceneKind::Screen), 1);
    assert_eq!(count(&graph, SubsceneKind::MainOpaque), 1);
    assert_eq!(count(&graph, SubsceneKind::ShadowCast), 1);
    for skipped in [
        SubsceneKind::Anaglyph,
        SubsceneKind::Bloom,
        SubsceneKind::GodRays,
        SubsceneKind::ColorPicking,
        SubsceneKind::Glow,
        SubsceneKind::Sky,
    ] {
        assert_eq!(count(&graph, skipped), 0, "{skipped} must be skipped");
    }
    Ok(())
}

#[test]
fn sky_and_color_picking_feed_the_sink() -> anyhow::Result<()> {
    let features = RenderFeatures::SELECTABILITY | RenderFeatures::PROCEDURAL_SKY;
    let (graph, factory) = build_full(&PipelineSettings::default(), features, false)?;

    let sink = graph.sink_node()?;
    let inputs = kinds(&graph, &get_inputs(&graph, sink)?);
    assert!(inputs.contains(&SubsceneKind::Sky));
    assert_eq!(inputs.iter().filter(|&&k| k == SubsceneKind::ColorPicking).count(), 2);
    assert_eq!(factory.count(TextureKind::Cubemap), 1);

    let queue = kinds(&graph, &build_queue(&graph)?);
    assert!(!queue.contains(&SubsceneKind::Sky));
    assert!(!queue.contains(&SubsceneKind::ColorPicking));
    Ok(())
}

#[test]
fn depth_of_field_requires_camera_request() -> anyhow::Result<()> {
    let settings = PipelineSettings::default();
    let (graph, _) = build_full(&settings, RenderFeatures::empty(), false)?;
    assert_eq!(count(&graph, SubsceneKind::Dof), 0);

    let mut factory = HeadlessFactory::new();
    let camera = CameraRender {
        dof_distance: 10.0,
        dof_power: 1.0,
        ..Default::default()
    };
    let scene = SceneRender::default();
    let graph = PipelineBuilder::new(&settings, &mut factory).build_full(false, &scene, &camera)?;
    assert_eq!(count(&graph, SubsceneKind::Dof), 1);
    assert_eq!(count(&graph, SubsceneKind::Postprocessing), 2);

    let dof = find_subs(&graph, SubsceneKind::Dof).expect("dof pass");
    let dof_camera = graph.subscene_camera(dof).expect("dof camera");
    assert_eq!(dof_camera.dof.map(|d| d.distance), Some(10.0));
    Ok(())
}

// ============================================================================
// Scheduling
// ============================================================================

#[test]
fn queue_respects_every_edge() -> anyhow::Result<()> {
    let settings = PipelineSettings {
        wireframe_debug: true,
        ..Default::default()
    };
    let (graph, _) = build_full(&settings, RenderFeatures::all(), false)?;
    let queue = build_queue(&graph)?;

    let position = |id| queue.iter().position(|&q| q == id);
    for edge in graph.edges() {
        if let (Some(from), Some(to)) = (position(edge.from), position(edge.to)) {
            assert!(from < to, "edge {:?} -> {:?} scheduled backwards", edge.from, edge.to);
        }
    }
    assert!(queue.iter().all(|&id| graph.node(id).is_some_and(|s| s.enqueue)));
    Ok(())
}

#[test]
fn builds_are_deterministic() -> anyhow::Result<()> {
    let settings = PipelineSettings::default();
    let (a, fa) = build_full(&settings, RenderFeatures::all(), false)?;
    let (b, fb) = build_full(&settings, RenderFeatures::all(), false)?;

    assert_eq!(kinds(&a, a.node_ids()), kinds(&b, b.node_ids()));
    assert_eq!(kinds(&a, &build_queue(&a)?), kinds(&b, &build_queue(&b)?));
    assert_eq!(a.edge_count(), b.edge_count());
    assert_eq!(fa.textures(), fb.textures());
    Ok(())
}

// ============================================================================
// Texture Allocation
// ============================================================================

#[test]
fn pooling_creates_fewer_textures() -> anyhow::Result<()> {
    let reuse = PipelineSettings::default();
    let no_reuse = PipelineSettings {
        disable_texture_reuse: true,
        ..Default::default()
    };
    let features = RenderFeatures::BLOOM | RenderFeatures::COMPOSITING | RenderFeatures::ANTIALIASING;

    let (_, pooled) = build_full(&reuse, features, false)?;
    let (_, fresh) = build_full(&no_reuse, features, false)?;
    assert!(
        pooled.textures().len() < fresh.textures().len(),
        "pooled {} vs fresh {}",
        pooled.textures().len(),
        fresh.textures().len()
    );
    Ok(())
}

#[test]
fn motion_blur_textures_are_private() -> anyhow::Result<()> {
    let features = RenderFeatures::BLOOM | RenderFeatures::MOTION_BLUR | RenderFeatures::ANTIALIASING;
    let (graph, _) = build_full(&PipelineSettings::default(), features, false)?;

    let mb = find_subs(&graph, SubsceneKind::MotionBlur).expect("motion blur pass");
    let subs = graph.node(mb).expect("motion blur subscene");
    let accum = subs.textures_internal[0].expect("accumulator texture");

    let mut private = vec![accum];
    private.extend(graph.output_edges(mb).filter_map(|(_, e)| e.slink.texture));
    assert_eq!(private.len(), 2);

    for edge in graph.edges().iter().filter(|e| e.from != mb) {
        if let Some(tex) = edge.slink.texture {
            assert!(!private.contains(&tex), "motion blur texture leaked to {:?}", edge.from);
        }
    }

    // antialiasing reads the accumulator with linear filtering
    assert_eq!(subs.slinks_internal[0].min_filter, myth_scenegraph::FilterMode::Linear);
    Ok(())
}

#[test]
fn screen_links_never_get_textures() -> anyhow::Result<()> {
    let (graph, _) = build_full(&PipelineSettings::default(), RenderFeatures::all(), false)?;
    for edge in graph.edges() {
        if edge.slink.from == myth_scenegraph::SlinkSource::Screen {
            assert!(edge.slink.texture.is_none());
        }
    }
    Ok(())
}

#[test]
fn stereo_refraction_keeps_eye_targets_apart() -> anyhow::Result<()> {
    let settings = PipelineSettings {
        anaglyph: true,
        ..Default::default()
    };
    let (graph, _) = build_full(&settings, RenderFeatures::REFRACTIONS, false)?;
    assert_eq!(count(&graph, SubsceneKind::Refract), 2);

    // each blend keeps rendering into its opaque pass's color target
    let blend_targets: Vec<TextureHandle> = graph
        .edges()
        .iter()
        .filter(|e| graph.kind(e.to) == Some(SubsceneKind::MainBlend))
        .filter(|e| e.slink.is_pass_through() && e.slink.from == SlinkSource::Color)
        .filter_map(|e| e.slink.texture)
        .collect();
    assert_eq!(blend_targets.len(), 2);
    assert_ne!(blend_targets[0], blend_targets[1]);

    for edge in graph.edges().iter().filter(|e| graph.kind(e.from) == Some(SubsceneKind::Refract)) {
        let tex = edge.slink.texture.expect("refraction map texture");
        assert!(!blend_targets.contains(&tex), "refraction map {tex:?} is a blend target");
    }

    assert_no_live_texture_reassigned(&graph)
}

#[test]
fn textures_are_not_reassigned_while_live() -> anyhow::Result<()> {
    let stereo = PipelineSettings {
        anaglyph: true,
        ..Default::default()
    };
    let supersampled = PipelineSettings {
        resolution_factor: 2.0,
        wireframe_debug: true,
        ..Default::default()
    };
    let combos = [
        RenderFeatures::empty(),
        RenderFeatures::REFRACTIONS,
        RenderFeatures::REFRACTIONS | RenderFeatures::SELECTABILITY,
        RenderFeatures::SHADOWS | RenderFeatures::SSAO | RenderFeatures::BLOOM,
        RenderFeatures::GOD_RAYS | RenderFeatures::MOTION_BLUR | RenderFeatures::ANTIALIASING,
        RenderFeatures::SELECTABILITY | RenderFeatures::COMPOSITING,
        RenderFeatures::all(),
    ];

    for settings in [PipelineSettings::default(), stereo, supersampled] {
        for features in combos {
            for rtt in [false, true] {
                let (graph, _) = build_full(&settings, features, rtt)?;
                assert_no_live_texture_reassigned(&graph)?;
            }
        }
        let (graph, _) = build_compat(&settings, RenderFeatures::all())?;
        assert_no_live_texture_reassigned(&graph)?;
    }
    Ok(())
}

// ============================================================================
// Glow
// ============================================================================

#[test]
fn glow_consumers_get_an_inactive_bypass() -> anyhow::Result<()> {
    let features = RenderFeatures::SELECTABILITY | RenderFeatures::COMPOSITING;
    let (graph, _) = build_full(&PipelineSettings::default(), features, false)?;
    let glow = find_subs(&graph, SubsceneKind::Glow).expect("glow pass");

    let source = graph
        .input_edges(glow)
        .find(|(_, e)| e.slink.to.is_sampler("u_glow_src"))
        .map(|(_, e)| e.from)
        .expect("glow source");
    let glow_outputs: Vec<_> = graph.output_edges(glow).map(|(_, e)| e).collect();
    assert!(!glow_outputs.is_empty());

    let bypasses: Vec<_> = graph
        .edges()
        .iter()
        .filter(|e| e.slink.key_tag == Some(KeyTag::GlowBypass))
        .collect();
    assert!(!bypasses.is_empty());

    for bypass in &bypasses {
        assert!(!bypass.slink.active);
        assert_eq!(bypass.from, source);
    }
    for out in &glow_outputs {
        assert!(
            bypasses.iter().any(|b| b.to == out.to && b.slink.to == out.slink.to),
            "glow output to {:?} has no bypass",
            out.to
        );
    }

    let comp = find_subs(&graph, SubsceneKind::Compositing).expect("compositing pass");
    assert!(glow_outputs.iter().any(|out| out.to == comp));
    Ok(())
}

// ============================================================================
// Resolution Factor
// ============================================================================

#[test]
fn supersampling_scales_links_before_lanczos() -> anyhow::Result<()> {
    let settings = PipelineSettings {
        resolution_factor: 2.0,
        ..Default::default()
    };
    let (graph, _) = build_full(&settings, RenderFeatures::ANTIALIASING, false)?;
    assert_eq!(count(&graph, SubsceneKind::Lanczos), 2);
    assert_eq!(count(&graph, SubsceneKind::Antialiasing), 0);

    let lanczos: Vec<NodeId> = graph
        .nodes()
        .filter(|(_, s)| s.kind == SubsceneKind::Lanczos)
        .map(|(id, _)| id)
        .collect();
    let (x, y) = (lanczos[0], lanczos[1]);

    for edge in graph.edges() {
        if edge.to == x {
            assert!((edge.slink.size_mult - 2.0).abs() < f32::EPSILON);
        }
        if edge.from == y {
            assert!((edge.slink.size_mult - 1.0).abs() < f32::EPSILON);
        }
    }
    Ok(())
}

// ============================================================================
// Compat Pipeline
// ============================================================================

#[test]
fn minimal_compat_pipeline() -> anyhow::Result<()> {
    let (graph, factory) = build_compat(&PipelineSettings::default(), RenderFeatures::empty())?;
    assert_closed(&graph);

    let queue = build_queue(&graph)?;
    assert_eq!(
        kinds(&graph, &queue),
        vec![SubsceneKind::MainOpaque, SubsceneKind::MainBlend]
    );
    assert!(factory.textures().is_empty());
    assert!(factory.render_targets().is_empty());

    let blend = graph.node(queue[1]).expect("blend");
    assert!(blend.blend);
    assert!(!blend.clear_color && !blend.clear_depth);
    Ok(())
}

#[test]
fn compat_color_picking_uses_renderbuffer() -> anyhow::Result<()> {
    let settings = PipelineSettings {
        wireframe_debug: true,
        ..Default::default()
    };
    let (graph, factory) = build_compat(&settings, RenderFeatures::SELECTABILITY)?;
    assert_closed(&graph);

    assert_eq!(
        kinds(&graph, &build_queue(&graph)?),
        vec![SubsceneKind::MainOpaque, SubsceneKind::MainBlend, SubsceneKind::Wireframe]
    );
    assert_eq!(factory.count(TextureKind::Color), 1);
    assert_eq!(factory.count(TextureKind::DepthRenderbuffer), 1);
    assert_eq!(factory.render_targets().len(), 1);
    Ok(())
}

#[test]
fn compat_builds_never_sample_depth() -> anyhow::Result<()> {
    let wireframe = PipelineSettings {
        wireframe_debug: true,
        ..Default::default()
    };
    for settings in [PipelineSettings::default(), wireframe] {
        for features in [
            RenderFeatures::empty(),
            RenderFeatures::SELECTABILITY,
            RenderFeatures::SELECTABILITY | RenderFeatures::PROCEDURAL_SKY,
            RenderFeatures::all(),
        ] {
            let (graph, factory) = build_compat(&settings, features)?;
            assert_closed(&graph);
            assert_eq!(factory.count(TextureKind::DepthTexture), 0);

            let mut depth_links = 0;
            graph.for_each_slink(|slink, _, _| {
                if slink.from == SlinkSource::Depth {
                    depth_links += 1;
                    assert!(slink.use_renderbuffer, "compat depth must be a renderbuffer");
                    assert!(slink.to.is_reserved(), "compat depth is sampled as {}", slink.to);
                }
                std::ops::ControlFlow::Continue(())
            });
            if features.contains(RenderFeatures::SELECTABILITY) {
                assert!(depth_links > 0);
                assert_eq!(factory.count(TextureKind::DepthRenderbuffer), 1);
            }
        }
    }
    Ok(())
}

#[test]
fn compat_rejects_sampled_depth_renderbuffer() {
    fn sampled_depth() -> RenderGraph {
        let mut graph = RenderGraph::new();
        let cam = graph.add_camera(Camera::new(Projection::None));
        let depth = graph.append_node(Subscene::new(SubsceneKind::Depth, Some(cam)));
        let opaque = graph.append_node(Subscene::new(SubsceneKind::MainOpaque, Some(cam)));
        let sink = graph.append_node(Subscene::sink());
        graph.append_edge(
            depth,
            opaque,
            Slink::viewport(SlinkSource::Depth, SlinkTarget::sampler("u_depth")),
        );
        graph.append_edge(opaque, sink, Slink::viewport(SlinkSource::Screen, SlinkTarget::None));
        graph
    }

    let err = enforce_graph_consistency(&mut sampled_depth(), true).unwrap_err();
    assert!(matches!(err, GraphError::RenderbufferSampled { .. }));
    assert_eq!(err.kind(), ErrorKind::ResourceLegality);

    // full mode samples depth textures
    assert!(enforce_graph_consistency(&mut sampled_depth(), false).is_ok());
}

// ============================================================================
// Settings & Debug Output
// ============================================================================

#[test]
fn partial_settings_from_json() -> anyhow::Result<()> {
    let settings: PipelineSettings =
        serde_json::from_str(r#"{ "anaglyph": true, "antialiasing": "smaa" }"#)?;
    assert!(settings.anaglyph);
    assert!(settings.dof);
    assert_eq!(settings.shadow_tex_size, 1024);
    assert!(settings.uses_lanczos());
    Ok(())
}

#[test]
fn dot_export_lists_nodes_and_edges() -> anyhow::Result<()> {
    let (graph, _) = build_full(&PipelineSettings::default(), RenderFeatures::BLOOM, false)?;
    let dot = debug_convert_to_dot(&graph);

    assert!(dot.starts_with("digraph scenegraph {"));
    assert!(dot.ends_with('}'));
    assert!(dot.contains("MAIN OPAQUE"));
    assert!(dot.contains("u_bloom"));
    assert_eq!(dot.matches(" -> ").count(), graph.edge_count());
    Ok(())
}
