use foundation::distance_meters;
use serde::{Deserialize, Serialize};

use crate::post::Post;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpacityConfig {
    pub overlap_radius_m: f64,
    /// Neighbour counts up to this value stay fully opaque.
    pub fade_start: usize,
    /// Neighbour counts from this value on are fully transparent.
    pub fade_end: usize,
    /// Divisor of the linear fade between the two.
    pub fade_span: f64,
}

impl Default for OpacityConfig {
    fn default() -> Self {
        Self {
            overlap_radius_m: 50.0,
            fade_start: 4,
            fade_end: 10,
            fade_span: 6.0,
        }
    }
}

/// Fades posts out as the number of neighbours within `overlap_radius_m` grows.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct OverlapOpacity {
    pub config: OpacityConfig,
}

impl OverlapOpacity {
    pub fn new(config: OpacityConfig) -> Self {
        Self { config }
    }

    /// Other posts within the overlap radius (inclusive). The post itself is
    /// not counted.
    pub fn overlap_count(&self, post: &Post, posts: &[Post]) -> usize {
        let within = posts
            .iter()
            .filter(|other| distance_meters(post.location, other.location) <= self.config.overlap_radius_m)
            .count();
        within.saturating_sub(1)
    }

    pub fn opacity_for_count(&self, overlap_count: usize) -> f64 {
        let c = &self.config;
        if overlap_count <= c.fade_start {
            1.0
        } else if overlap_count < c.fade_end {
            let progress = (overlap_count - c.fade_start) as f64 / c.fade_span;
            (1.0 - progress).max(0.0)
        } else {
            0.0
        }
    }

    pub fn opacity(&self, post: &Post, posts: &[Post]) -> f64 {
        self.opacity_for_count(self.overlap_count(post, posts))
    }
}
