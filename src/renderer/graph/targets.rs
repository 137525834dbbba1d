//! Render target binding.
//!
//! After allocation every texture is known; this pass turns them into camera
//! attachments and framebuffers. Pass-through links also attach to the
//! consumer's camera, so chained passes render into the same buffers.

use super::graph::RenderGraph;
use super::slink::SlinkSource;
use super::subscene::SubsceneKind;
use crate::resources::{ResourceFactory, TextureHandle};
use crate::scene::{Camera, CameraId};

fn set_attachment(camera: &mut Camera, source: SlinkSource, texture: TextureHandle) {
    match source {
        SlinkSource::Color | SlinkSource::Cubemap => camera.color_attachment = Some(texture),
        SlinkSource::Depth => camera.depth_attachment = Some(texture),
        SlinkSource::Screen => {}
    }
}

pub fn assign_render_targets(graph: &mut RenderGraph, factory: &mut dyn ResourceFactory) {
    let ids = graph.node_ids().to_vec();
    let mut framebuffers = 0usize;

    for id in ids {
        let Some(subs) = graph.node(id) else {
            continue;
        };
        if subs.kind == SubsceneKind::Sink {
            continue;
        }
        let Some(cam) = subs.camera else {
            continue;
        };

        let mut attachments: Vec<(CameraId, SlinkSource, TextureHandle)> = Vec::new();

        for (_, edge) in graph.output_edges(id) {
            let slink = &edge.slink;
            let Some(tex) = slink.texture.filter(|_| slink.active) else {
                continue;
            };
            attachments.push((cam, slink.from, tex));
            if slink.is_pass_through()
                && let Some(out_cam) = graph.node(edge.to).and_then(|s| s.camera)
            {
                attachments.push((out_cam, slink.from, tex));
            }
        }

        for (slink, tex) in subs.slinks_internal.iter().zip(&subs.textures_internal) {
            if slink.active
                && slink.is_pass_through()
                && let Some(tex) = *tex
            {
                attachments.push((cam, slink.from, tex));
            }
        }

        for (cam_id, source, tex) in attachments {
            if let Some(camera) = graph.camera_mut(cam_id) {
                set_attachment(camera, source, tex);
            }
        }

        if let Some(camera) = graph.camera_mut(cam)
            && camera.has_attachment()
            && camera.framebuffer.is_none()
        {
            camera.framebuffer =
                Some(factory.create_render_target(camera.color_attachment, camera.depth_attachment));
            framebuffers += 1;
        }
    }

    log::debug!("Created {framebuffers} render targets");
}
