//! Per-post render attributes for the current viewport.
//!
//! [`ViewportPostFeed::recompute`] is a pure function of a post snapshot and a
//! viewport. [`PostFeed`] wraps it for callers that receive viewport and post
//! changes as separate events.

use std::collections::{BTreeMap, BTreeSet};

use foundation::{GeoPoint, PostId, Viewport};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::density::DensityScorer;
use crate::metrics::{FeedMetrics, POST_SNAPSHOTS, VIEWPORT_CHANGES};
use crate::opacity::OverlapOpacity;
use crate::placement::{CollisionPlacer, Resolution};
use crate::post::{ConstantScore, Post, PostScorer};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeStats {
    pub posts: usize,
    pub visible: usize,
    /// Posts drawn with opacity below 1.
    pub faded: usize,
    /// Posts drawn away from their true location.
    pub moved: usize,
    pub fallbacks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEntry {
    pub id: PostId,
    pub visible: bool,
    pub opacity: f64,
    pub adjusted_location: GeoPoint,
    pub resolution: Resolution,
}

/// Derived render attributes, rebuilt from scratch on every recompute.
///
/// Serializes as plain JSON maps keyed by post id, so a state can be cached
/// or handed to a renderer and read back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Distinct ids, first occurrence in the snapshot wins.
    order: Vec<PostId>,
    visible: BTreeMap<PostId, bool>,
    opacity: BTreeMap<PostId, f64>,
    adjusted: BTreeMap<PostId, GeoPoint>,
    resolution: BTreeMap<PostId, Resolution>,
    stats: RecomputeStats,
}

impl RenderState {
    /// `false` for posts not in the last snapshot.
    pub fn is_visible(&self, id: &PostId) -> bool {
        self.visible.get(id).copied().unwrap_or(false)
    }

    /// `1.0` for posts not in the last snapshot.
    pub fn opacity(&self, id: &PostId) -> f64 {
        self.opacity.get(id).copied().unwrap_or(1.0)
    }

    /// The post's own location if it was not in the last snapshot.
    pub fn adjusted_location(&self, post: &Post) -> GeoPoint {
        self.adjusted_location_of(&post.id).unwrap_or(post.location)
    }

    pub fn adjusted_location_of(&self, id: &PostId) -> Option<GeoPoint> {
        self.adjusted.get(id).copied()
    }

    pub fn resolution(&self, id: &PostId) -> Option<Resolution> {
        self.resolution.get(id).copied()
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.visible.contains_key(id)
    }

    /// Distinct posts covered.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn stats(&self) -> RecomputeStats {
        self.stats
    }

    /// Visible post ids in snapshot order.
    pub fn visible_ids(&self) -> Vec<&PostId> {
        self.order.iter().filter(|id| self.is_visible(id)).collect()
    }

    /// One entry per distinct snapshot post, in snapshot order.
    pub fn entries(&self) -> Vec<RenderEntry> {
        self.order
            .iter()
            .filter_map(|id| {
                Some(RenderEntry {
                    id: id.clone(),
                    visible: self.is_visible(id),
                    opacity: self.opacity(id),
                    adjusted_location: self.adjusted_location_of(id)?,
                    resolution: self.resolution(id)?,
                })
            })
            .collect()
    }
}

/// Runs visibility, opacity and placement over a snapshot.
#[derive(Debug, Clone)]
pub struct ViewportPostFeed<S = ConstantScore> {
    density: DensityScorer<S>,
    opacity: OverlapOpacity,
    placer: CollisionPlacer,
}

impl ViewportPostFeed<ConstantScore> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_scorer(config, ConstantScore(config.default_post_score))
    }
}

impl Default for ViewportPostFeed<ConstantScore> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<S: PostScorer> ViewportPostFeed<S> {
    pub fn with_scorer(config: EngineConfig, scorer: S) -> Self {
        Self {
            density: DensityScorer::with_scorer(config.density, scorer),
            opacity: OverlapOpacity::new(config.opacity),
            placer: CollisionPlacer::new(config.placement),
        }
    }

    pub fn recompute(&self, posts: &[Post], viewport: &Viewport) -> RenderState {
        let threshold = self.density.threshold(posts, viewport);
        let visible: BTreeMap<PostId, bool> = posts
            .iter()
            .map(|p| (p.id.clone(), self.density.passes(p, threshold)))
            .collect();

        // Opacity and placement cover hidden posts too, so a visibility flip
        // never needs another pass.
        let opacity: BTreeMap<PostId, f64> = posts
            .iter()
            .map(|p| (p.id.clone(), self.opacity.opacity(p, posts)))
            .collect();

        let placement = self.placer.place(posts);
        let resolution: BTreeMap<PostId, Resolution> = placement
            .placed()
            .iter()
            .map(|p| (p.id.clone(), p.resolution))
            .collect();

        let stats = RecomputeStats {
            posts: posts.len(),
            visible: visible.values().filter(|v| **v).count(),
            faded: opacity.values().filter(|o| **o < 1.0).count(),
            moved: placement.moved_count(),
            fallbacks: placement.fallback_count(),
        };
        debug!(
            posts = stats.posts,
            visible = stats.visible,
            faded = stats.faded,
            moved = stats.moved,
            fallbacks = stats.fallbacks,
            threshold,
            span_lat = viewport.span_lat,
            "recomputed post render state"
        );

        let mut seen = BTreeSet::new();
        let order = posts
            .iter()
            .filter(|p| seen.insert(&p.id))
            .map(|p| p.id.clone())
            .collect();

        RenderState {
            order,
            visible,
            opacity,
            adjusted: placement.locations(),
            resolution,
            stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    ViewportChanged(Viewport),
    /// A complete replacement snapshot, never a delta.
    PostsReplaced(Vec<Post>),
}

/// Holds the latest inputs and recomputes whenever either changes.
#[derive(Debug, Clone)]
pub struct PostFeed<S = ConstantScore> {
    engine: ViewportPostFeed<S>,
    posts: Vec<Post>,
    viewport: Option<Viewport>,
    state: RenderState,
    metrics: FeedMetrics,
}

impl PostFeed<ConstantScore> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_engine(ViewportPostFeed::new(config))
    }
}

impl<S: PostScorer> PostFeed<S> {
    pub fn with_engine(engine: ViewportPostFeed<S>) -> Self {
        Self {
            engine,
            posts: Vec::new(),
            viewport: None,
            state: RenderState::default(),
            metrics: FeedMetrics::new(),
        }
    }

    /// Returns the fresh state, or `None` while no viewport is known.
    pub fn apply(&mut self, event: FeedEvent) -> Option<&RenderState> {
        match event {
            FeedEvent::ViewportChanged(viewport) => {
                self.metrics.inc(VIEWPORT_CHANGES, 1);
                self.viewport = Some(viewport);
            }
            FeedEvent::PostsReplaced(posts) => {
                self.metrics.inc(POST_SNAPSHOTS, 1);
                self.posts = posts;
            }
        }

        let viewport = self.viewport?;
        self.state = self.engine.recompute(&self.posts, &viewport);
        self.metrics.record_recompute(&self.state.stats());
        Some(&self.state)
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn metrics(&self) -> &FeedMetrics {
        &self.metrics
    }
}
