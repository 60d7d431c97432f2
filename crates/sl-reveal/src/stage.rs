//! Reveal stages, reel geometry and animation commands
//!
//! ```text
//!        SpinOutcome            Approach complete          Settle complete
//!  Idle ─────────────► Approach ─────────────────► Settle ─────────────────► Idle
//!                      (stops short)                (lands exact)           (flush)
//! ```

use serde::{Deserialize, Serialize};

/// Animation stage of the reel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealStage {
    /// No reveal in flight; reel shows the idle preview or the last result
    #[default]
    Idle,
    /// Long ease-out transit that stops short of the winner
    Approach,
    /// Short corrective bounce that lands exactly on the winner
    Settle,
}

impl RevealStage {
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Approach => "approach",
            Self::Settle => "settle",
        }
    }
}

impl std::fmt::Display for RevealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of one started spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpinId(pub u64);

impl std::fmt::Display for SpinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spin#{}", self.0)
    }
}

/// Reel layout as measured by the shell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReelMetrics {
    /// Width of one reel item (px)
    pub item_width: f64,
    /// Width of the visible window (px)
    pub viewport_width: f64,
}

impl ReelMetrics {
    pub const DEFAULT_ITEM_WIDTH: f64 = 120.0;
    pub const DEFAULT_VIEWPORT_WIDTH: f64 = 600.0;

    pub fn new(item_width: f64, viewport_width: f64) -> Self {
        Self {
            item_width,
            viewport_width,
        }
    }

    /// Replace unusable measurements with the defaults
    pub fn sanitized(self) -> Self {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        Self {
            item_width: if usable(self.item_width) {
                self.item_width
            } else {
                Self::DEFAULT_ITEM_WIDTH
            },
            viewport_width: if usable(self.viewport_width) {
                self.viewport_width
            } else {
                Self::DEFAULT_VIEWPORT_WIDTH
            },
        }
    }
}

impl Default for ReelMetrics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ITEM_WIDTH, Self::DEFAULT_VIEWPORT_WIDTH)
    }
}

/// Observable animation state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationState {
    pub stage: RevealStage,
    /// Displacement the reel is moving to (or resting at) in the current stage
    pub current_displacement: f64,
    /// Exact landing displacement of the winner
    pub target_displacement: f64,
    /// Duration of the current transition (ms)
    pub transition_duration_ms: f64,
}

/// Displacements for one spin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    /// Where Approach stops
    pub approach: f64,
    /// Where Settle lands
    pub target: f64,
}

impl Displacement {
    /// Center the winner at `winner_index` in the viewport.
    ///
    /// `target = max(0, K*W + W/2 - Vp/2)`, `approach = max(0, target - overshoot)`.
    pub fn compute(winner_index: usize, metrics: ReelMetrics, overshoot: f64) -> Self {
        let metrics = metrics.sanitized();
        let w = metrics.item_width;
        let target_center = winner_index as f64 * w + w / 2.0;
        let target = (target_center - metrics.viewport_width / 2.0).max(0.0);
        let approach = (target - overshoot.max(0.0)).max(0.0);
        Self { approach, target }
    }
}

/// One transit the shell must perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationCommand {
    pub spin: SpinId,
    pub stage: RevealStage,
    pub from: f64,
    pub to: f64,
    pub duration_ms: f64,
    pub easing: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_displacement_centers_winner() {
        let d = Displacement::compute(28, ReelMetrics::default(), 42.0);
        // 28 * 120 + 60 - 300
        assert_eq!(d.target, 3120.0);
        assert_eq!(d.approach, 3078.0);
        assert!(d.approach < d.target);
    }

    #[test]
    fn test_displacement_never_negative() {
        let d = Displacement::compute(0, ReelMetrics::new(120.0, 1000.0), 42.0);
        assert_eq!(d.target, 0.0);
        assert_eq!(d.approach, 0.0);

        let d = Displacement::compute(3, ReelMetrics::new(100.0, 600.0), 60.0);
        // 350 - 300 = 50, approach clamps at 0
        assert_eq!(d.target, 50.0);
        assert_eq!(d.approach, 0.0);
    }

    #[test]
    fn test_bad_metrics_use_defaults() {
        let m = ReelMetrics::new(f64::NAN, -5.0).sanitized();
        assert_eq!(m, ReelMetrics::default());
    }

    #[test]
    fn test_stage_flags() {
        assert!(!RevealStage::Idle.is_in_flight());
        assert!(RevealStage::Approach.is_in_flight());
        assert_eq!(RevealStage::Settle.to_string(), "settle");
        assert_eq!(SpinId(3).to_string(), "spin#3");
    }
}
