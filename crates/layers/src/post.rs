use foundation::{GeoPoint, PostId, Timestamp, Ttl};
use serde::{Deserialize, Serialize};

/// Lifetime of a post on the map.
pub const POST_TTL_HOURS: i64 = 24;

/// The slice of a backend post the engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub location: GeoPoint,
    pub created_at: Timestamp,
}

impl Post {
    pub fn new(id: impl Into<PostId>, location: GeoPoint, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            location,
            created_at,
        }
    }

    /// A post is live from its creation until `ttl` has elapsed (exclusive).
    /// Posts stamped in the future count as live.
    pub fn is_live(&self, now: Timestamp, ttl: Ttl) -> bool {
        self.created_at.age_at(now) < ttl.millis()
    }
}

/// Drops expired posts, keeping arrival order.
pub fn retain_live(posts: &[Post], now: Timestamp, ttl: Ttl) -> Vec<Post> {
    posts
        .iter()
        .filter(|p| p.is_live(now, ttl))
        .cloned()
        .collect()
}

/// Per-post importance used by visibility scoring.
pub trait PostScorer {
    fn score(&self, post: &Post) -> f64;
}

/// Every post gets the same score.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConstantScore(pub f64);

impl Default for ConstantScore {
    fn default() -> Self {
        ConstantScore(0.6)
    }
}

impl PostScorer for ConstantScore {
    fn score(&self, _post: &Post) -> f64 {
        self.0
    }
}

impl<F> PostScorer for F
where
    F: Fn(&Post) -> f64,
{
    fn score(&self, post: &Post) -> f64 {
        self(post)
    }
}
