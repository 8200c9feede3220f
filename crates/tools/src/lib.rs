//! Input handling for the `postmap` command-line tool.

use std::fs;
use std::path::{Path, PathBuf};

use foundation::{GeoPoint, Timestamp, Ttl, Viewport};
use layers::{ConfigError, EngineConfig, Post, RecomputeStats, RenderEntry, ViewportPostFeed};
use serde::Serialize;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "POSTMAP_CONFIG";

#[derive(Debug)]
pub enum InputError {
    Read { path: PathBuf, reason: String },
    Parse { path: PathBuf, reason: String },
    InvalidPost { index: usize, reason: String },
    InvalidViewport(String),
    Config(ConfigError),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::Read { path, reason } => write!(f, "read {path:?}: {reason}"),
            InputError::Parse { path, reason } => write!(f, "parse {path:?}: {reason}"),
            InputError::InvalidPost { index, reason } => {
                write!(f, "invalid post at index {index}: {reason}")
            }
            InputError::InvalidViewport(reason) => write!(f, "invalid viewport: {reason}"),
            InputError::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InputError {}

impl From<ConfigError> for InputError {
    fn from(e: ConfigError) -> Self {
        InputError::Config(e)
    }
}

/// Parses a JSON array of posts. Only the shape is checked here; coordinates
/// are checked by [`validate_posts`].
pub fn parse_posts(payload: &str) -> Result<Vec<Post>, String> {
    let posts: Vec<Post> = serde_json::from_str(payload).map_err(|e| e.to_string())?;
    Ok(posts)
}

pub fn validate_posts(posts: &[Post]) -> Result<(), InputError> {
    for (index, post) in posts.iter().enumerate() {
        if !post.location.is_finite() || !post.location.is_in_range() {
            return Err(InputError::InvalidPost {
                index,
                reason: format!(
                    "{} has out-of-range location ({}, {})",
                    post.id, post.location.latitude, post.location.longitude
                ),
            });
        }
    }
    Ok(())
}

pub fn load_posts(path: &Path) -> Result<Vec<Post>, InputError> {
    let text = fs::read_to_string(path).map_err(|e| InputError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let posts = parse_posts(&text).map_err(|reason| InputError::Parse {
        path: path.to_path_buf(),
        reason,
    })?;
    validate_posts(&posts)?;
    Ok(posts)
}

/// `--config` wins over the environment; neither means defaults.
pub fn resolve_config_path(flag: Option<PathBuf>, env_value: Option<String>) -> Option<PathBuf> {
    flag.or_else(|| env_value.filter(|v| !v.trim().is_empty()).map(PathBuf::from))
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, InputError> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| InputError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(EngineConfig::from_json_str(&text)?)
}

pub fn viewport_from_args(
    lat: f64,
    lon: f64,
    span_lat: f64,
    span_lon: f64,
) -> Result<Viewport, InputError> {
    let center = GeoPoint::new(lat, lon);
    if !center.is_finite() || !center.is_in_range() {
        return Err(InputError::InvalidViewport(format!(
            "center ({lat}, {lon}) is out of range"
        )));
    }
    let viewport = Viewport::new(center, span_lat, span_lon);
    if !viewport.has_valid_span() {
        return Err(InputError::InvalidViewport(format!(
            "spans must be finite and positive, got {span_lat} x {span_lon}"
        )));
    }
    Ok(viewport)
}

/// Expiry filter applied before recompute when the caller supplies a clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Expiry {
    pub now: Timestamp,
    pub ttl: Ttl,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    pub viewport: Viewport,
    pub dropped_expired: usize,
    pub stats: RecomputeStats,
    pub posts: Vec<RenderEntry>,
}

pub fn render_report(
    posts: Vec<Post>,
    viewport: Viewport,
    config: EngineConfig,
    expiry: Option<Expiry>,
) -> RenderReport {
    let total = posts.len();
    let posts = match expiry {
        Some(e) => layers::retain_live(&posts, e.now, e.ttl),
        None => posts,
    };
    let state = ViewportPostFeed::new(config).recompute(&posts, &viewport);
    RenderReport {
        viewport,
        dropped_expired: total - posts.len(),
        stats: state.stats(),
        posts: state.entries(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layers::{POST_TTL_HOURS, Resolution};
    use pretty_assertions::assert_eq;

    const POSTS_JSON: &str = r#"[
        {"id": "a", "location": {"latitude": 0.0, "longitude": 0.0}, "created_at": 1000},
        {"id": "b", "location": {"latitude": 0.0, "longitude": 0.0}, "created_at": 2000},
        {"id": "c", "location": {"latitude": 0.002, "longitude": 0.0}, "created_at": 0}
    ]"#;

    #[test]
    fn parses_post_array() {
        let posts = parse_posts(POSTS_JSON).unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[1].id.as_str(), "b");
        assert_eq!(posts[1].created_at, Timestamp(2000));
        assert_eq!(posts[2].location, GeoPoint::new(0.002, 0.0));
    }

    #[test]
    fn rejects_malformed_posts() {
        assert!(parse_posts(r#"[{"id": "a"}]"#).is_err());
        assert!(parse_posts("{}").is_err());
    }

    #[test]
    fn rejects_out_of_range_locations() {
        let posts = parse_posts(
            r#"[{"id": "x", "location": {"latitude": 91.0, "longitude": 0.0}, "created_at": 0}]"#,
        )
        .unwrap();
        let err = validate_posts(&posts).unwrap_err();
        assert!(matches!(err, InputError::InvalidPost { index: 0, .. }));
    }

    #[test]
    fn parsing_leaves_coordinate_checks_to_validation() {
        let posts = parse_posts(
            r#"[{"id": "x", "location": {"latitude": 0.0, "longitude": 181.0}, "created_at": 0}]"#,
        )
        .unwrap();
        assert_eq!(posts.len(), 1);
        assert!(validate_posts(&posts).is_err());
    }

    #[test]
    fn config_flag_beats_environment() {
        assert_eq!(
            resolve_config_path(Some(PathBuf::from("flag.json")), Some("env.json".into())),
            Some(PathBuf::from("flag.json"))
        );
        assert_eq!(
            resolve_config_path(None, Some("env.json".into())),
            Some(PathBuf::from("env.json"))
        );
        assert_eq!(resolve_config_path(None, Some("  ".into())), None);
        assert_eq!(resolve_config_path(None, None), None);
    }

    #[test]
    fn missing_config_path_means_defaults() {
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn unreadable_config_is_a_read_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
    }

    #[test]
    fn viewport_args_are_validated() {
        assert!(viewport_from_args(10.0, 20.0, 0.1, 0.1).is_ok());
        assert!(viewport_from_args(10.0, 20.0, 0.0, 0.1).is_err());
        assert!(viewport_from_args(10.0, 20.0, 0.1, f64::NAN).is_err());
        assert!(viewport_from_args(95.0, 20.0, 0.1, 0.1).is_err());
    }

    #[test]
    fn report_lists_posts_in_snapshot_order() {
        let posts = parse_posts(POSTS_JSON).unwrap();
        let viewport = viewport_from_args(0.0, 0.0, 0.01, 0.01).unwrap();
        let report = render_report(posts, viewport, EngineConfig::default(), None);

        let ids: Vec<&str> = report.posts.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(report.posts[0].resolution, Resolution::Original);
        assert_eq!(report.posts[1].resolution, Resolution::Offset { direction: 0 });
        assert_eq!(report.stats.posts, 3);
        assert_eq!(report.dropped_expired, 0);
    }

    #[test]
    fn report_drops_expired_posts_first() {
        let posts = parse_posts(POSTS_JSON).unwrap();
        let viewport = viewport_from_args(0.0, 0.0, 0.01, 0.01).unwrap();
        let ttl = Ttl::hours(POST_TTL_HOURS);
        let expiry = Expiry {
            now: Timestamp(ttl.millis() + 1500),
            ttl,
        };
        let report = render_report(posts, viewport, EngineConfig::default(), Some(expiry));
        let ids: Vec<&str> = report.posts.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(report.dropped_expired, 2);
        assert_eq!(report.posts[0].resolution, Resolution::Original);
    }

    #[test]
    fn report_serializes_to_json() {
        let posts = parse_posts(POSTS_JSON).unwrap();
        let viewport = viewport_from_args(0.0, 0.0, 0.01, 0.01).unwrap();
        let report = render_report(posts, viewport, EngineConfig::default(), None);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["posts"][1]["resolution"]["kind"], "offset");
        assert_eq!(value["posts"][1]["resolution"]["direction"], 0);
        assert_eq!(value["posts"][0]["id"], "a");
    }
}
