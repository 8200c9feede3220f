//! Zoom- and crowding-dependent visibility.
//!
//! The threshold rises as the map zooms out and as more posts fall inside the
//! viewport; a post is shown when its score reaches the threshold.

use foundation::Viewport;
use serde::{Deserialize, Serialize};

use crate::post::{ConstantScore, Post, PostScorer};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    pub min_zoom_span: f64,
    pub max_zoom_span: f64,
    pub max_density_count: usize,
    pub min_threshold: f64,
    pub max_threshold: f64,
    pub zoom_weight: f64,
    pub density_weight: f64,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            min_zoom_span: 0.001,
            max_zoom_span: 100.0,
            max_density_count: 100,
            min_threshold: 0.2,
            max_threshold: 0.7,
            zoom_weight: 0.2,
            density_weight: 0.8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DensityScorer<S = ConstantScore> {
    pub config: DensityConfig,
    scorer: S,
}

impl DensityScorer<ConstantScore> {
    pub fn new(config: DensityConfig) -> Self {
        Self::with_scorer(config, ConstantScore::default())
    }
}

impl<S: PostScorer> DensityScorer<S> {
    pub fn with_scorer(config: DensityConfig, scorer: S) -> Self {
        Self { config, scorer }
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Number of posts inside the viewport rectangle (edges included).
    pub fn viewport_density(posts: &[Post], viewport: &Viewport) -> usize {
        let bounds = viewport.bounds();
        posts.iter().filter(|p| bounds.contains(p.location)).count()
    }

    /// Log-normalized zoom level in `[0, 1]`; 0 at `min_zoom_span`, 1 at `max_zoom_span`.
    pub fn zoom_factor(&self, span_lat: f64) -> f64 {
        let c = &self.config;
        let clamped = span_lat.clamp(c.min_zoom_span, c.max_zoom_span);
        (clamped.ln() - c.min_zoom_span.ln()) / (c.max_zoom_span.ln() - c.min_zoom_span.ln())
    }

    pub fn density_factor(&self, density: usize) -> f64 {
        (density as f64 / self.config.max_density_count as f64).min(1.0)
    }

    pub fn threshold_for(&self, density: usize, span_lat: f64) -> f64 {
        let c = &self.config;
        let blend =
            self.zoom_factor(span_lat) * c.zoom_weight + self.density_factor(density) * c.density_weight;
        c.min_threshold + (c.max_threshold - c.min_threshold) * blend
    }

    /// Visibility threshold for the whole snapshot. Density does not depend on
    /// the post being judged, so callers scoring many posts compute this once.
    pub fn threshold(&self, posts: &[Post], viewport: &Viewport) -> f64 {
        let density = Self::viewport_density(posts, viewport);
        self.threshold_for(density, viewport.span_lat)
    }

    pub fn passes(&self, post: &Post, threshold: f64) -> bool {
        self.scorer.score(post) >= threshold
    }

    pub fn should_show(&self, post: &Post, posts: &[Post], viewport: &Viewport) -> bool {
        self.passes(post, self.threshold(posts, viewport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::{GeoPoint, Timestamp};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn viewport(span: f64) -> Viewport {
        Viewport::new(GeoPoint::new(0.0, 0.0), span, span)
    }

    fn posts_at_origin(n: usize) -> Vec<Post> {
        (0..n)
            .map(|i| Post::new(format!("p{i}").as_str(), GeoPoint::new(0.0, 0.0), Timestamp(i as i64)))
            .collect()
    }

    #[test]
    fn zoom_factor_hits_exact_endpoints() {
        let s = DensityScorer::new(DensityConfig::default());
        assert_eq!(s.zoom_factor(0.001), 0.0);
        assert_eq!(s.zoom_factor(100.0), 1.0);
        assert_eq!(s.zoom_factor(0.000_01), 0.0);
        assert_eq!(s.zoom_factor(1_000.0), 1.0);
    }

    #[test]
    fn zoom_factor_is_logarithmic() {
        let s = DensityScorer::new(DensityConfig::default());
        // 0.001 .. 100 spans five decades; 1.0 sits three decades in.
        assert_close(s.zoom_factor(1.0), 0.6, 1e-12);
        assert_close(s.zoom_factor(0.1), 0.4, 1e-12);
    }

    #[test]
    fn threshold_is_monotonic_in_span() {
        let s = DensityScorer::new(DensityConfig::default());
        for density in [0, 10, 50, 100, 500] {
            let mut prev = f64::NEG_INFINITY;
            let mut span = 0.000_1;
            while span < 1_000.0 {
                let t = s.threshold_for(density, span);
                assert!(t >= prev, "threshold fell at span {span}, density {density}");
                prev = t;
                span *= 1.37;
            }
        }
    }

    #[test]
    fn density_counts_only_posts_inside_viewport() {
        let mut posts = posts_at_origin(3);
        posts.push(Post::new("far", GeoPoint::new(10.0, 10.0), Timestamp(9)));
        posts.push(Post::new("edge", GeoPoint::new(0.5, -0.5), Timestamp(10)));
        assert_eq!(DensityScorer::<ConstantScore>::viewport_density(&posts, &viewport(1.0)), 4);
        assert_eq!(DensityScorer::<ConstantScore>::viewport_density(&[], &viewport(1.0)), 0);
    }

    #[test]
    fn density_factor_saturates() {
        let s = DensityScorer::new(DensityConfig::default());
        assert_eq!(s.density_factor(0), 0.0);
        assert_eq!(s.density_factor(50), 0.5);
        assert_eq!(s.density_factor(100), 1.0);
        assert_eq!(s.density_factor(1_000), 1.0);
    }

    #[test]
    fn fully_zoomed_in_and_empty_uses_min_threshold() {
        let s = DensityScorer::new(DensityConfig::default());
        let vp = viewport(0.001);
        assert_close(s.threshold(&[], &vp), 0.2, 1e-12);

        let post = Post::new("lonely", GeoPoint::new(50.0, 50.0), Timestamp(0));
        assert!(s.should_show(&post, std::slice::from_ref(&post), &vp));
    }

    #[test]
    fn fully_zoomed_out_and_saturated_hides_everything() {
        let s = DensityScorer::new(DensityConfig::default());
        let vp = viewport(100.0);
        let posts = posts_at_origin(100);
        let t = s.threshold(&posts, &vp);
        assert_close(t, 0.7, 1e-12);
        // Constant score of 0.6 never reaches the saturated threshold.
        assert!(posts.iter().all(|p| !s.should_show(p, &posts, &vp)));
    }

    #[test]
    fn custom_scorer_can_lift_posts_over_threshold() {
        let s = DensityScorer::with_scorer(DensityConfig::default(), |p: &Post| {
            if p.id.as_str() == "p0" { 0.9 } else { 0.1 }
        });
        let vp = viewport(100.0);
        let posts = posts_at_origin(100);
        assert!(s.should_show(&posts[0], &posts, &vp));
        assert!(!s.should_show(&posts[1], &posts, &vp));
    }
}
