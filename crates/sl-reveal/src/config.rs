//! Reveal configuration and timing profiles

use serde::{Deserialize, Serialize};

use crate::error::{RevealError, RevealResult};
use crate::stage::ReelMetrics;

/// Timing profile for the reveal animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RevealProfile {
    /// Normal gameplay timing
    #[default]
    Normal,
    /// Fast/Turbo mode
    Turbo,
    /// Studio mode (short phases for iterating on the shell)
    Studio,
    /// Custom timing (scaled or loaded from file)
    Custom,
}

impl RevealProfile {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Turbo => "Turbo",
            Self::Studio => "Studio",
            Self::Custom => "Custom",
        }
    }

    /// Parse a profile name as typed on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "turbo" => Some(Self::Turbo),
            "studio" => Some(Self::Studio),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Detailed reveal configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Profile type
    pub profile: RevealProfile,

    /// Filler entries before the winner (the winner index)
    pub filler_count: usize,

    /// Filler entries after the winner
    pub tail_count: usize,

    /// Approach phase duration (ms)
    pub approach_duration_ms: f64,

    /// Settle phase duration (ms)
    pub settle_duration_ms: f64,

    /// Easing curve for the approach transit
    pub approach_easing: String,

    /// Easing curve for the settle bounce
    pub settle_easing: String,

    /// Overshoot as a fraction of the item width
    pub overshoot_ratio: f64,

    /// Lower bound for the overshoot (px)
    pub overshoot_min_px: f64,

    /// Upper bound for the overshoot (px)
    pub overshoot_max_px: f64,

    /// How long the landed winner stays highlighted (ms)
    pub emphasis_duration_ms: f64,

    /// Payment confirmation poll interval (ms)
    pub payment_poll_interval_ms: f64,

    /// Item width used until the shell reports a layout (px)
    pub default_item_width: f64,

    /// Viewport width used until the shell reports a layout (px)
    pub default_viewport_width: f64,
}

impl RevealConfig {
    pub const APPROACH_EASING: &'static str = "cubic-bezier(0.10, 0.80, 0.10, 1.00)";
    pub const SETTLE_EASING: &'static str = "cubic-bezier(0.34, 1.56, 0.64, 1.00)";

    /// Normal gameplay timing
    pub fn normal() -> Self {
        Self {
            profile: RevealProfile::Normal,
            filler_count: 28,
            tail_count: 8,
            approach_duration_ms: 4200.0,
            settle_duration_ms: 450.0,
            approach_easing: Self::APPROACH_EASING.to_string(),
            settle_easing: Self::SETTLE_EASING.to_string(),
            overshoot_ratio: 0.35,
            overshoot_min_px: 12.0,
            overshoot_max_px: 60.0,
            emphasis_duration_ms: 1800.0,
            payment_poll_interval_ms: 2500.0,
            default_item_width: 120.0,
            default_viewport_width: 600.0,
        }
    }

    /// Turbo mode
    pub fn turbo() -> Self {
        Self {
            profile: RevealProfile::Turbo,
            filler_count: 20,
            tail_count: 6,
            approach_duration_ms: 2000.0,
            settle_duration_ms: 250.0,
            emphasis_duration_ms: 1000.0,
            ..Self::normal()
        }
    }

    /// Studio mode (short phases, same geometry)
    pub fn studio() -> Self {
        Self {
            profile: RevealProfile::Studio,
            approach_duration_ms: 800.0,
            settle_duration_ms: 200.0,
            emphasis_duration_ms: 500.0,
            payment_poll_interval_ms: 1000.0,
            ..Self::normal()
        }
    }

    /// Get config for profile
    pub fn from_profile(profile: RevealProfile) -> Self {
        match profile {
            RevealProfile::Normal => Self::normal(),
            RevealProfile::Turbo => Self::turbo(),
            RevealProfile::Studio => Self::studio(),
            RevealProfile::Custom => Self::normal(),
        }
    }

    /// Scale every duration by factor (< 1.0 = faster)
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            profile: RevealProfile::Custom,
            approach_duration_ms: self.approach_duration_ms * factor,
            settle_duration_ms: self.settle_duration_ms * factor,
            emphasis_duration_ms: self.emphasis_duration_ms * factor,
            ..self.clone()
        }
    }

    /// Overshoot magnitude for a given item width, clamped to the configured range
    pub fn overshoot(&self, item_width: f64) -> f64 {
        (item_width * self.overshoot_ratio)
            .max(self.overshoot_min_px)
            .min(self.overshoot_max_px)
    }

    /// Reject configurations that would break the displacement invariants
    pub fn validate(&self) -> RevealResult<()> {
        let durations = [
            ("approach_duration_ms", self.approach_duration_ms),
            ("settle_duration_ms", self.settle_duration_ms),
            ("emphasis_duration_ms", self.emphasis_duration_ms),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(RevealError::InvalidConfig(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, value
                )));
            }
        }

        if !self.payment_poll_interval_ms.is_finite() || self.payment_poll_interval_ms <= 0.0 {
            return Err(RevealError::InvalidConfig(
                "payment_poll_interval_ms must be positive".into(),
            ));
        }

        if !(self.overshoot_ratio.is_finite() && self.overshoot_ratio > 0.0) {
            return Err(RevealError::InvalidConfig("overshoot_ratio must be positive".into()));
        }

        if !(self.overshoot_min_px.is_finite() && self.overshoot_min_px > 0.0) {
            return Err(RevealError::InvalidConfig("overshoot_min_px must be positive".into()));
        }

        if !self.overshoot_max_px.is_finite() || self.overshoot_max_px < self.overshoot_min_px {
            return Err(RevealError::InvalidConfig(format!(
                "overshoot range [{}, {}] is empty",
                self.overshoot_min_px, self.overshoot_max_px
            )));
        }

        if !(self.default_item_width.is_finite() && self.default_item_width > 0.0)
            || !(self.default_viewport_width.is_finite() && self.default_viewport_width > 0.0)
        {
            return Err(RevealError::InvalidConfig("default metrics must be positive".into()));
        }

        Ok(())
    }

    /// Load from YAML
    pub fn from_yaml_str(yaml: &str) -> RevealResult<Self> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from JSON
    pub fn from_json_str(json: &str) -> RevealResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Export as pretty JSON
    pub fn to_json(&self) -> RevealResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Layout assumed before the shell measures the reel
    pub fn default_metrics(&self) -> ReelMetrics {
        ReelMetrics::new(self.default_item_width, self.default_viewport_width)
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self::normal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let normal = RevealConfig::normal();
        let turbo = RevealConfig::turbo();
        let studio = RevealConfig::studio();

        assert!(turbo.approach_duration_ms < normal.approach_duration_ms);
        assert!(studio.approach_duration_ms < turbo.approach_duration_ms);

        // Settle is always the short corrective phase
        for config in [&normal, &turbo, &studio] {
            assert!(config.settle_duration_ms < config.approach_duration_ms);
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_overshoot_clamped() {
        let config = RevealConfig::normal();
        assert!((config.overshoot(120.0) - 42.0).abs() < 1e-9);
        assert_eq!(config.overshoot(10.0), config.overshoot_min_px);
        assert_eq!(config.overshoot(1000.0), config.overshoot_max_px);
    }

    #[test]
    fn test_scaled() {
        let config = RevealConfig::normal().scaled(0.5);
        assert_eq!(config.profile, RevealProfile::Custom);
        assert_eq!(config.approach_duration_ms, 2100.0);
        assert_eq!(config.filler_count, 28);
    }

    #[test]
    fn test_validate_rejects_bad_overshoot() {
        let mut config = RevealConfig::normal();
        config.overshoot_min_px = 0.0;
        assert!(config.validate().is_err());

        let mut config = RevealConfig::normal();
        config.overshoot_max_px = 5.0;
        assert!(config.validate().is_err());

        let mut config = RevealConfig::normal();
        config.approach_duration_ms = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = serde_yml::to_string(&RevealConfig::turbo()).unwrap();
        let config = RevealConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config, RevealConfig::turbo());
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(RevealProfile::from_name("Turbo"), Some(RevealProfile::Turbo));
        assert_eq!(RevealProfile::from_name("warp"), None);
    }
}
