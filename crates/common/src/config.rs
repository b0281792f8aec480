//! Engine configuration.
//!
//! The engine is a single-session, in-memory tool: configuration is built by
//! the host (defaults or a JSON string it already holds) and never read from
//! disk or the environment.

use serde::{Deserialize, Serialize};

use crate::error::{PixbatchError, PixbatchResult};

/// Global engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Limits and defaults for freeform layer placement.
    pub placement: PlacementLimits,

    /// Live preview parameters.
    pub preview: PreviewConfig,

    /// Export naming and pacing.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Limits and defaults applied to placement transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementLimits {
    /// Smallest allowed layer scale. Always > 0.
    pub min_scale: f64,

    /// Largest allowed layer scale.
    pub max_scale: f64,

    /// Fraction of the canvas long edge covered by a freshly placed image's long edge.
    pub default_long_edge_ratio: f64,

    /// Top-left of a newly added extra layer (canvas pixels).
    pub extra_layer_origin: (f64, f64),

    /// Scale of a newly added extra layer.
    pub extra_layer_scale: f64,

    /// Degrees applied by one rotate click.
    pub rotation_step_deg: f64,

    /// Relative scale change per wheel notch.
    pub wheel_scale_step: f64,

    /// Scale change per canvas pixel of vertical drag on a scale handle.
    pub drag_scale_sensitivity: f64,
}

/// Live preview parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// On-screen scale of the preview relative to full-resolution canvas pixels.
    pub zoom: f64,
}

/// What an export does when a single item fails to load, draw, or encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the item as skipped and keep going.
    #[default]
    SkipAndContinue,
    /// Stop the batch at the first failing item.
    Abort,
}

/// Export naming and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Pause between individual deliveries, in milliseconds.
    pub item_delay_ms: u64,

    /// Output prefix for grid compositions.
    pub grid_prefix: String,

    /// Output prefix for framed batch items.
    pub framing_prefix: String,

    /// Output prefix for resized batch items.
    pub resize_prefix: String,

    /// Archive prefix for grid exports.
    pub grid_archive_prefix: String,

    /// Archive prefix for framing exports.
    pub framing_archive_prefix: String,

    /// Archive prefix for resize exports.
    pub resize_archive_prefix: String,

    /// Behavior when one item of a batch fails.
    pub failure_policy: FailurePolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pixbatch_render_engine=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for PlacementLimits {
    fn default() -> Self {
        Self {
            min_scale: 0.01,
            max_scale: 10.0,
            default_long_edge_ratio: 0.2,
            extra_layer_origin: (100.0, 100.0),
            extra_layer_scale: 0.15,
            rotation_step_deg: 15.0,
            wheel_scale_step: 0.1,
            drag_scale_sensitivity: 0.005,
        }
    }
}

impl PlacementLimits {
    /// Clamp a scale into `[min_scale, max_scale]`.
    ///
    /// Non-finite input collapses to `min_scale` so a layer never ends up
    /// with a zero, negative, or NaN size.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        if !scale.is_finite() {
            return self.min_scale;
        }
        scale.clamp(self.min_scale, self.max_scale)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { zoom: 0.4 }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            item_delay_ms: 400,
            grid_prefix: "grid".to_string(),
            framing_prefix: "framed".to_string(),
            resize_prefix: "resized".to_string(),
            grid_archive_prefix: "grid_pack".to_string(),
            framing_archive_prefix: "framing_pack".to_string(),
            resize_archive_prefix: "resize_bulk".to_string(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Parse a host-supplied JSON document. Missing sections keep their defaults.
    pub fn from_json(json: &str) -> PixbatchResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON so a host can keep it wherever it likes.
    pub fn to_json(&self) -> PixbatchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would produce degenerate geometry.
    pub fn validate(&self) -> PixbatchResult<()> {
        let p = &self.placement;
        if !(p.min_scale > 0.0) {
            return Err(PixbatchError::config("placement.min_scale must be > 0"));
        }
        if !(p.max_scale >= p.min_scale) {
            return Err(PixbatchError::config(
                "placement.max_scale must be >= placement.min_scale",
            ));
        }
        if !(p.default_long_edge_ratio > 0.0) {
            return Err(PixbatchError::config(
                "placement.default_long_edge_ratio must be > 0",
            ));
        }
        if !(self.preview.zoom > 0.0) {
            return Err(PixbatchError::config("preview.zoom must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.export.item_delay_ms, 400);
        assert!((config.preview.zoom - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "preview": { "zoom": 0.25 } }"#).unwrap();
        assert!((config.preview.zoom - 0.25).abs() < 1e-9);
        assert_eq!(config.placement, PlacementLimits::default());
        assert_eq!(config.export.failure_policy, FailurePolicy::SkipAndContinue);
    }

    #[test]
    fn test_rejects_non_positive_min_scale() {
        let err = EngineConfig::from_json(r#"{ "placement": { "min_scale": 0.0 } }"#).unwrap_err();
        assert!(err.to_string().contains("min_scale"));
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut config = EngineConfig::default();
        config.export.failure_policy = FailurePolicy::Abort;
        let json = config.to_json().unwrap();
        assert!(json.contains("\"abort\""));
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_clamp_scale_handles_nan() {
        let limits = PlacementLimits::default();
        assert_eq!(limits.clamp_scale(f64::NAN), limits.min_scale);
        assert_eq!(limits.clamp_scale(-3.0), limits.min_scale);
        assert_eq!(limits.clamp_scale(50.0), limits.max_scale);
    }
}
