use serde::{Deserialize, Serialize};

use crate::density::DensityConfig;
use crate::opacity::OpacityConfig;
use crate::placement::PlacementConfig;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// All engine tunables. Missing keys in a JSON document fall back to defaults.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub density: DensityConfig,
    pub opacity: OpacityConfig,
    pub placement: PlacementConfig,
    /// Score given to every post by the default scorer.
    pub default_post_score: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            density: DensityConfig::default(),
            opacity: OpacityConfig::default(),
            placement: PlacementConfig::default(),
            default_post_score: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Parse(String),
    NotFinite { field: &'static str },
    NotPositive { field: &'static str },
    ZoomRange { min: f64, max: f64 },
    ThresholdRange { min: f64, max: f64 },
    Weights { zoom: f64, density: f64 },
    FadeBand { start: usize, end: usize },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "invalid engine config: {msg}"),
            ConfigError::NotFinite { field } => write!(f, "{field} must be finite"),
            ConfigError::NotPositive { field } => write!(f, "{field} must be positive"),
            ConfigError::ZoomRange { min, max } => {
                write!(f, "min_zoom_span ({min}) must be below max_zoom_span ({max})")
            }
            ConfigError::ThresholdRange { min, max } => {
                write!(f, "min_threshold ({min}) must not exceed max_threshold ({max})")
            }
            ConfigError::Weights { zoom, density } => write!(
                f,
                "zoom_weight ({zoom}) and density_weight ({density}) must be non-negative and sum to 1"
            ),
            ConfigError::FadeBand { start, end } => {
                write!(f, "fade_start ({start}) must be below fade_end ({end})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(payload).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.density;
        finite("density.min_zoom_span", d.min_zoom_span)?;
        finite("density.max_zoom_span", d.max_zoom_span)?;
        finite("density.min_threshold", d.min_threshold)?;
        finite("density.max_threshold", d.max_threshold)?;
        finite("density.zoom_weight", d.zoom_weight)?;
        finite("density.density_weight", d.density_weight)?;
        positive("density.min_zoom_span", d.min_zoom_span)?;
        if d.min_zoom_span >= d.max_zoom_span {
            return Err(ConfigError::ZoomRange {
                min: d.min_zoom_span,
                max: d.max_zoom_span,
            });
        }
        if d.max_density_count == 0 {
            return Err(ConfigError::NotPositive {
                field: "density.max_density_count",
            });
        }
        if d.min_threshold > d.max_threshold {
            return Err(ConfigError::ThresholdRange {
                min: d.min_threshold,
                max: d.max_threshold,
            });
        }
        if d.zoom_weight < 0.0
            || d.density_weight < 0.0
            || (d.zoom_weight + d.density_weight - 1.0).abs() > WEIGHT_SUM_TOLERANCE
        {
            return Err(ConfigError::Weights {
                zoom: d.zoom_weight,
                density: d.density_weight,
            });
        }

        let o = &self.opacity;
        finite("opacity.overlap_radius_m", o.overlap_radius_m)?;
        finite("opacity.fade_span", o.fade_span)?;
        positive("opacity.overlap_radius_m", o.overlap_radius_m)?;
        positive("opacity.fade_span", o.fade_span)?;
        if o.fade_start >= o.fade_end {
            return Err(ConfigError::FadeBand {
                start: o.fade_start,
                end: o.fade_end,
            });
        }

        let p = &self.placement;
        finite("placement.min_card_distance_m", p.min_card_distance_m)?;
        finite("placement.search_step_factor", p.search_step_factor)?;
        finite("placement.fallback_factor", p.fallback_factor)?;
        positive("placement.min_card_distance_m", p.min_card_distance_m)?;
        positive("placement.search_step_factor", p.search_step_factor)?;
        positive("placement.fallback_factor", p.fallback_factor)?;
        if p.search_directions == 0 {
            return Err(ConfigError::NotPositive {
                field: "placement.search_directions",
            });
        }

        finite("default_post_score", self.default_post_score)
    }
}

fn finite(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_json_overrides_only_named_keys() {
        let cfg = EngineConfig::from_json_str(
            r#"{"placement":{"min_card_distance_m":35.0},"opacity":{"overlap_radius_m":80.0}}"#,
        )
        .unwrap();
        assert_eq!(cfg.placement.min_card_distance_m, 35.0);
        assert_eq!(cfg.placement.search_directions, 8);
        assert_eq!(cfg.opacity.overlap_radius_m, 80.0);
        assert_eq!(cfg.density, DensityConfig::default());
        assert_eq!(cfg.default_post_score, 0.6);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut cfg = EngineConfig::default();
        cfg.density.zoom_weight = 0.5;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Weights {
                zoom: 0.5,
                density: 0.8
            })
        );
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let mut cfg = EngineConfig::default();
        cfg.density.min_zoom_span = 200.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZoomRange { .. })));
    }

    #[test]
    fn rejects_non_positive_distances() {
        let mut cfg = EngineConfig::default();
        cfg.placement.min_card_distance_m = 0.0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NotPositive {
                field: "placement.min_card_distance_m"
            })
        );

        let mut cfg = EngineConfig::default();
        cfg.opacity.overlap_radius_m = f64::NAN;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NotFinite {
                field: "opacity.overlap_radius_m"
            })
        );
    }

    #[test]
    fn rejects_degenerate_fade_band_and_density_cap() {
        let mut cfg = EngineConfig::default();
        cfg.opacity.fade_end = cfg.opacity.fade_start;
        assert!(matches!(cfg.validate(), Err(ConfigError::FadeBand { .. })));

        let mut cfg = EngineConfig::default();
        cfg.density.max_density_count = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NotPositive { .. })));
    }

    #[test]
    fn error_messages_name_the_field() {
        let msg = ConfigError::NotPositive {
            field: "placement.search_directions",
        }
        .to_string();
        assert_eq!(msg, "placement.search_directions must be positive");
    }
}
