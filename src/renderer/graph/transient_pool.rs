//! Transient Texture Pool
//!
//! Assigns a GPU texture to every slink of a graph while keeping the number
//! of created textures low. Passes are visited once, in topological order;
//! a texture returns to the pool as soon as its last reader has been
//! visited and is then handed to the next link with an equal descriptor.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    TexturePool                       │
//! │                                                      │
//! │  items:      [PoolItem { key, refcount, texture }]   │
//! │  by_key:     SlinkKey      → item indices            │
//! │  by_texture: TextureHandle → item index              │
//! │                                                      │
//! │  acquire(slink)  first free item with equal key,     │
//! │                  else a new texture (refcount 1)     │
//! │  retain(tex)     refcount + 1                        │
//! │  release(tex)    refcount - 1 (never below zero)     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Allocation Rules
//!
//! For each pass:
//!
//! 1. Internal slinks are acquired and released right away; they only live
//!    while the pass renders.
//! 2. Each output reuses the texture of the nearest link with the same
//!    source semantic: an output sibling, else a pass-through input.
//!    Outputs without such a texture acquire from the pool. Every output
//!    holding a texture holds one reference, so a texture stays reserved
//!    while any pass-through chain still renders into it.
//! 3. All inputs are released, sampled and pass-through alike.
//! 4. Outputs nobody consumes (bound to `NONE`) are released immediately.
//!
//! `MOTION_BLUR` keeps its accumulator across frames, so its internal and
//! output textures come from private throw-away pools and are never shared.
//! `SCREEN` links are the default framebuffer and never get a texture.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::graph::{NodeId, RenderGraph, SlinkRef};
use super::slink::{Slink, SlinkKey, SlinkSource, SlinkTarget};
use super::subscene::SubsceneKind;
use crate::errors::Result;
use crate::resources::{ResourceFactory, StorageType, TextureHandle, TextureKind};

// ─── Internal Types ───────────────────────────────────────────────────────────

#[derive(Debug)]
struct PoolItem {
    key: SlinkKey,
    refcount: u32,
    texture: TextureHandle,
}

// ─── Pool Implementation ──────────────────────────────────────────────────────

/// Reference-counted, descriptor-keyed texture pool.
///
/// Lives for one allocation pass. Handles that were not created by this pool
/// are ignored by [`retain`](Self::retain) and [`release`](Self::release).
#[derive(Debug)]
pub struct TexturePool {
    items: Vec<PoolItem>,
    by_key: FxHashMap<SlinkKey, SmallVec<[usize; 4]>>,
    by_texture: FxHashMap<TextureHandle, usize>,
    reuse: bool,
}

impl Default for TexturePool {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TexturePool {
    /// Creates an empty pool. With `reuse == false` every acquisition
    /// creates a new texture.
    #[must_use]
    pub fn new(reuse: bool) -> Self {
        Self {
            items: Vec::new(),
            by_key: FxHashMap::default(),
            by_texture: FxHashMap::default(),
            reuse,
        }
    }

    /// Returns a free texture matching the slink descriptor, creating one if
    /// needed. `SCREEN` slinks get no texture.
    pub fn acquire(
        &mut self,
        slink: &Slink,
        factory: &mut dyn ResourceFactory,
    ) -> Option<TextureHandle> {
        if slink.from == SlinkSource::Screen {
            return None;
        }

        let key = slink.key();

        if self.reuse {
            let free = self.by_key.get(&key).and_then(|bucket| {
                bucket
                    .iter()
                    .copied()
                    .find(|&i| self.items[i].refcount == 0)
            });
            if let Some(i) = free {
                let item = &mut self.items[i];
                item.refcount += 1;
                log::trace!("Reusing texture {:?} for {} -> {}", item.texture, slink.from, slink.to);
                return Some(item.texture);
            }
        }

        let texture = create_texture_for_slink(slink, factory)?;
        let index = self.items.len();
        self.items.push(PoolItem {
            key,
            refcount: 1,
            texture,
        });
        self.by_key.entry(key).or_default().push(index);
        self.by_texture.insert(texture, index);
        log::trace!("Created texture {texture:?} for {} -> {}", slink.from, slink.to);
        Some(texture)
    }

    pub fn retain(&mut self, texture: TextureHandle) {
        if let Some(&i) = self.by_texture.get(&texture) {
            self.items[i].refcount += 1;
        }
    }

    pub fn release(&mut self, texture: Option<TextureHandle>) {
        let Some(texture) = texture else {
            return;
        };
        if let Some(&i) = self.by_texture.get(&texture) {
            let item = &mut self.items[i];
            item.refcount = item.refcount.saturating_sub(1);
        }
    }

    #[must_use]
    pub fn refcount(&self, texture: TextureHandle) -> Option<u32> {
        self.by_texture.get(&texture).map(|&i| self.items[i].refcount)
    }

    /// Number of textures created by this pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Creates and configures the texture backing `slink`.
fn create_texture_for_slink(
    slink: &Slink,
    factory: &mut dyn ResourceFactory,
) -> Option<TextureHandle> {
    let size = slink.texture_size();

    match slink.from {
        SlinkSource::Color => {
            let tex = factory.create_texture(TextureKind::Color, StorageType::Rgba);
            factory.resize(tex, size, size);
            factory.set_filters(tex, slink.min_filter, slink.mag_filter);
            Some(tex)
        }
        SlinkSource::Depth if slink.use_renderbuffer => {
            let tex = factory
                .create_texture(TextureKind::DepthRenderbuffer, StorageType::DepthRenderbuffer);
            factory.resize(tex, size, size);
            Some(tex)
        }
        SlinkSource::Depth => {
            let tex = factory.create_texture(TextureKind::DepthTexture, StorageType::Depth);
            factory.resize(tex, size, size);
            factory.set_filters(tex, slink.min_filter, slink.mag_filter);
            Some(tex)
        }
        SlinkSource::Cubemap => Some(factory.create_cubemap_texture(TextureKind::Cubemap, size)),
        SlinkSource::Screen => None,
    }
}

// ─── Graph Allocation ─────────────────────────────────────────────────────────

/// Assigns textures to every slink of `graph`.
///
/// Must run after consistency enforcement: every slink is expected to be a
/// unique value without a texture.
pub fn allocate_textures(
    graph: &mut RenderGraph,
    factory: &mut dyn ResourceFactory,
    reuse: bool,
) -> Result<()> {
    let sorted = graph.topsort()?;
    let mut shared = TexturePool::new(reuse);
    let mut isolated_count = 0usize;

    for id in sorted {
        if graph.kind(id) == Some(SubsceneKind::MotionBlur) {
            let mut internal = TexturePool::new(reuse);
            assign_internal(graph, id, &mut internal, factory);
            // inputs are released into the private pool, which does not own
            // them: the shared texture feeding motion blur stays reserved
            let mut external = TexturePool::new(reuse);
            assign_external(graph, id, &mut external, factory);
            isolated_count += internal.len() + external.len();
        } else {
            assign_internal(graph, id, &mut shared, factory);
            assign_external(graph, id, &mut shared, factory);
        }
    }

    log::debug!(
        "Allocated {} shared and {} isolated textures for {} subscenes",
        shared.len(),
        isolated_count,
        graph.node_count()
    );
    Ok(())
}

fn assign_internal(
    graph: &mut RenderGraph,
    id: NodeId,
    pool: &mut TexturePool,
    factory: &mut dyn ResourceFactory,
) {
    let Some(subs) = graph.node_mut(id) else {
        return;
    };

    for i in 0..subs.slinks_internal.len() {
        let tex = pool.acquire(&subs.slinks_internal[i], factory);
        subs.slinks_internal[i].texture = tex;
        subs.textures_internal[i] = tex;
    }

    for &tex in &subs.textures_internal {
        pool.release(tex);
    }
}

fn assign_external(
    graph: &mut RenderGraph,
    id: NodeId,
    pool: &mut TexturePool,
    factory: &mut dyn ResourceFactory,
) {
    for i in graph.output_indices(id) {
        let slink = &graph.edges()[i].slink;
        let nearest = find_nearest_texture(graph, id, slink.from);

        let tex = match nearest {
            Some(tex) if slink.active && slink.texture.is_none() => {
                pool.retain(tex);
                Some(tex)
            }
            _ => pool.acquire(slink, factory),
        };

        if let Some(slink) = graph.slink_mut(SlinkRef::Edge(i)) {
            slink.texture = tex;
        }
    }

    for (_, edge) in graph.input_edges(id) {
        pool.release(edge.slink.texture);
    }

    for (_, edge) in graph.output_edges(id) {
        if edge.slink.texture.is_some() && edge.slink.to == SlinkTarget::None {
            pool.release(edge.slink.texture);
        }
    }
}

/// Texture already bound to the `source` attachment of `id`: an active output
/// sibling wins over an active pass-through input.
fn find_nearest_texture(
    graph: &RenderGraph,
    id: NodeId,
    source: SlinkSource,
) -> Option<TextureHandle> {
    let from_output = graph
        .output_edges(id)
        .map(|(_, e)| &e.slink)
        .find(|s| s.active && s.from == source && s.texture.is_some())
        .and_then(|s| s.texture);

    from_output.or_else(|| {
        graph
            .input_edges(id)
            .map(|(_, e)| &e.slink)
            .find(|s| s.active && s.is_pass_through() && s.from == source && s.texture.is_some())
            .and_then(|s| s.texture)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::graph::subscene::Subscene;
    use crate::resources::{FilterMode, HeadlessFactory};
    use crate::scene::Camera;

    fn color(name: &'static str) -> Slink {
        Slink::viewport(SlinkSource::Color, SlinkTarget::sampler(name))
    }

    fn pass(g: &mut RenderGraph, kind: SubsceneKind) -> NodeId {
        let cam = g.add_camera(Camera::default());
        g.append_node(Subscene::new(kind, Some(cam)))
    }

    #[test]
    fn released_texture_is_reused_for_equal_key() {
        let mut factory = HeadlessFactory::new();
        let mut pool = TexturePool::default();

        let a = pool.acquire(&color("u_a"), &mut factory).unwrap();
        pool.release(Some(a));
        let b = pool.acquire(&color("u_b"), &mut factory).unwrap();

        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.refcount(a), Some(1));
    }

    #[test]
    fn different_key_gets_new_texture() {
        let mut factory = HeadlessFactory::new();
        let mut pool = TexturePool::default();

        let a = pool.acquire(&color("u_a"), &mut factory).unwrap();
        pool.release(Some(a));
        let b = pool.acquire(&color("u_b").linear(), &mut factory).unwrap();

        assert_ne!(a, b);
        assert_eq!(
            factory.texture(b).unwrap().filters,
            Some((FilterMode::Linear, FilterMode::Linear))
        );
    }

    #[test]
    fn refcount_never_underflows() {
        let mut factory = HeadlessFactory::new();
        let mut pool = TexturePool::default();

        let a = pool.acquire(&color("u_a"), &mut factory).unwrap();
        pool.release(Some(a));
        pool.release(Some(a));
        assert_eq!(pool.refcount(a), Some(0));

        pool.retain(a);
        assert_eq!(pool.refcount(a), Some(1));
    }

    #[test]
    fn disabled_reuse_always_creates() {
        let mut factory = HeadlessFactory::new();
        let mut pool = TexturePool::new(false);

        let a = pool.acquire(&color("u_a"), &mut factory).unwrap();
        pool.release(Some(a));
        let b = pool.acquire(&color("u_a"), &mut factory).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn screen_links_get_no_texture() {
        let mut factory = HeadlessFactory::new();
        let mut pool = TexturePool::default();
        let screen = Slink::viewport(SlinkSource::Screen, SlinkTarget::None);
        assert_eq!(pool.acquire(&screen, &mut factory), None);
        assert!(pool.is_empty());
        assert!(factory.textures().is_empty());
    }

    #[test]
    fn pass_through_chain_keeps_texture_reserved() {
        let mut g = RenderGraph::new();
        let opaque = pass(&mut g, SubsceneKind::MainOpaque);
        let refract_left = pass(&mut g, SubsceneKind::Refract);
        let refract_right = pass(&mut g, SubsceneKind::Refract);
        let blend = pass(&mut g, SubsceneKind::MainBlend);
        let sink = g.append_node(Subscene::sink());

        g.append_edge(opaque, refract_left, color("u_color"));
        g.append_edge(opaque, blend, Slink::viewport(SlinkSource::Color, SlinkTarget::Color));
        g.append_edge(refract_left, blend, color("u_refractmap"));
        g.append_edge(refract_right, blend, color("u_refractmap"));
        g.append_edge(blend, sink, Slink::viewport(SlinkSource::Screen, SlinkTarget::None));

        let mut factory = HeadlessFactory::new();
        allocate_textures(&mut g, &mut factory, true).unwrap();

        let tex = |i: usize| g.edges()[i].slink.texture.unwrap();
        assert_eq!(tex(0), tex(1));
        assert_ne!(tex(3), tex(1), "blend still renders into the opaque target");
        assert_ne!(tex(3), tex(2));
    }

    #[test]
    fn motion_blur_input_stays_reserved() {
        let mut g = RenderGraph::new();
        let opaque = pass(&mut g, SubsceneKind::MainOpaque);
        let mb = pass(&mut g, SubsceneKind::MotionBlur);
        let post = pass(&mut g, SubsceneKind::Postprocessing);
        let aa = pass(&mut g, SubsceneKind::Antialiasing);
        let sink = g.append_node(Subscene::sink());

        g.append_edge(opaque, mb, color("u_color"));
        g.append_edge(mb, aa, color("u_color"));
        g.append_edge(post, aa, color("u_bloom"));
        g.append_edge(aa, sink, Slink::viewport(SlinkSource::Screen, SlinkTarget::None));

        let mut factory = HeadlessFactory::new();
        allocate_textures(&mut g, &mut factory, true).unwrap();

        let tex = |i: usize| g.edges()[i].slink.texture.unwrap();
        assert_ne!(tex(1), tex(0));
        assert_ne!(tex(2), tex(0), "input of motion blur went back to the shared pool");
        assert_ne!(tex(2), tex(1));
    }

    #[test]
    fn texture_kinds_follow_source() {
        let mut factory = HeadlessFactory::new();
        let mut pool = TexturePool::default();

        let mut rb = Slink::viewport(SlinkSource::Depth, SlinkTarget::Depth);
        rb.use_renderbuffer = true;
        pool.acquire(&rb, &mut factory);
        pool.acquire(&Slink::viewport(SlinkSource::Depth, SlinkTarget::sampler("u_depth")), &mut factory);
        let cube = pool
            .acquire(&Slink::fixed(SlinkSource::Cubemap, SlinkTarget::sampler("u_sky"), 384), &mut factory)
            .unwrap();

        assert_eq!(factory.count(TextureKind::DepthRenderbuffer), 1);
        assert_eq!(factory.count(TextureKind::DepthTexture), 1);
        assert_eq!(factory.texture(cube).unwrap().width, 384.0);
        assert!(factory.textures()[0].filters.is_none(), "renderbuffers have no filters");
    }
}
