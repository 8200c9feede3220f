use std::collections::BTreeMap;
use std::f64::consts::TAU;

use foundation::{GeoPoint, PostId, distance_meters, offset};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::post::Post;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Ground distance covered by one rendered card.
    pub min_card_distance_m: f64,
    /// Search ring radius, as a multiple of `min_card_distance_m`.
    pub search_step_factor: f64,
    /// Last-resort northward offset, as a multiple of `min_card_distance_m`.
    pub fallback_factor: f64,
    pub search_directions: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_card_distance_m: 20.0,
            search_step_factor: 1.1,
            fallback_factor: 2.2,
            search_directions: 8,
        }
    }
}

impl PlacementConfig {
    pub fn search_radius_m(&self) -> f64 {
        self.min_card_distance_m * self.search_step_factor
    }

    pub fn fallback_distance_m(&self) -> f64 {
        self.min_card_distance_m * self.fallback_factor
    }

    /// Bearing of search direction `direction`; direction 0 is due north.
    pub fn bearing(&self, direction: u32) -> f64 {
        direction as f64 * TAU / self.search_directions as f64
    }
}

/// How a post ended up where it is drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// No earlier card was in the way.
    Original,
    /// Moved onto the search ring in the given direction.
    Offset { direction: u32 },
    /// Every direction was blocked; pushed north unconditionally. May still overlap.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPost {
    pub id: PostId,
    pub location: GeoPoint,
    pub resolution: Resolution,
}

/// Placement result in placement order (oldest post first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    placed: Vec<PlacedPost>,
}

impl Placement {
    pub fn placed(&self) -> &[PlacedPost] {
        &self.placed
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn fallback_count(&self) -> usize {
        self.count_where(|r| r == Resolution::Fallback)
    }

    pub fn moved_count(&self) -> usize {
        self.count_where(|r| r != Resolution::Original)
    }

    /// Adjusted location per post id. A duplicated id keeps its last placement.
    pub fn locations(&self) -> BTreeMap<PostId, GeoPoint> {
        self.placed
            .iter()
            .map(|p| (p.id.clone(), p.location))
            .collect()
    }

    fn count_where(&self, pred: impl Fn(Resolution) -> bool) -> usize {
        self.placed.iter().filter(|p| pred(p.resolution)).count()
    }

    fn blocks(&self, candidate: GeoPoint, min_distance_m: f64) -> bool {
        self.placed
            .iter()
            .any(|p| distance_meters(candidate, p.location) < min_distance_m)
    }

    fn with(mut self, post: PlacedPost) -> Self {
        self.placed.push(post);
        self
    }
}

/// Spreads overlapping cards apart. The oldest post at a spot keeps its true
/// location; later ones are pushed onto a ring around their own location.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CollisionPlacer {
    pub config: PlacementConfig,
}

impl CollisionPlacer {
    pub fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    /// Places every post. Posts are visited oldest first; equal timestamps keep
    /// snapshot order, so identical input always yields identical output.
    pub fn place(&self, posts: &[Post]) -> Placement {
        let mut order: Vec<&Post> = posts.iter().collect();
        order.sort_by_key(|p| p.created_at);

        order.into_iter().fold(Placement::default(), |placed, post| {
            let (location, resolution) = self.resolve(post, &placed);
            placed.with(PlacedPost {
                id: post.id.clone(),
                location,
                resolution,
            })
        })
    }

    fn resolve(&self, post: &Post, placed: &Placement) -> (GeoPoint, Resolution) {
        let min = self.config.min_card_distance_m;
        if !placed.blocks(post.location, min) {
            return (post.location, Resolution::Original);
        }
        trace!(post = %post.id, "card collision, searching ring");

        let radius = self.config.search_radius_m();
        for direction in 0..self.config.search_directions {
            let candidate = offset(post.location, radius, self.config.bearing(direction));
            if !placed.blocks(candidate, min) {
                return (candidate, Resolution::Offset { direction });
            }
        }

        warn!(
            post = %post.id,
            directions = self.config.search_directions,
            "all placement directions blocked, using north fallback"
        );
        (
            offset(post.location, self.config.fallback_distance_m(), 0.0),
            Resolution::Fallback,
        )
    }
}
