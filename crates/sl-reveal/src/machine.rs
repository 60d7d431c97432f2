//! RevealStateMachine - the Idle / Approach / Settle lifecycle
//!
//! Owns the pending queue and the emphasis timer so that nothing outlives the
//! stage it belongs to: every transition cancels the armed timer, landing
//! flushes the queue, and cancellation discards it.

use serde::{Deserialize, Serialize};

use crate::config::RevealConfig;
use crate::effect::ShellEffect;
use crate::pending::{PendingReveal, PendingUpdateQueue};
use crate::reel::{ReelEntry, ReelSequence};
use crate::stage::{AnimationCommand, AnimationState, Displacement, ReelMetrics, RevealStage, SpinId};
use crate::timer::{ScopedTimer, TimerKind, TimerToken};

/// A reveal that has just landed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landing {
    pub spin: SpinId,
    pub winner_index: usize,
    pub winner: ReelEntry,
    /// Everything deferred during the reveal, applied as one update
    pub flushed: Option<PendingReveal>,
}

/// Result of a phase completion signal
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Stale or mismatched signal
    Ignored,
    /// Approach finished, Settle started
    Settling { spin: SpinId },
    /// Settle finished, back to Idle
    Landed(Landing),
}

#[derive(Debug)]
pub struct RevealStateMachine {
    config: RevealConfig,
    state: AnimationState,
    spin: Option<SpinId>,
    next_spin: u64,
    sequence: Option<ReelSequence>,
    displacement: Option<Displacement>,
    pending: PendingUpdateQueue,
    timer: ScopedTimer,
}

impl RevealStateMachine {
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            state: AnimationState::default(),
            spin: None,
            next_spin: 1,
            sequence: None,
            displacement: None,
            pending: PendingUpdateQueue::new(),
            timer: ScopedTimer::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSITIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Idle → Approach. Callers land any in-flight reveal first.
    pub fn begin(
        &mut self,
        sequence: ReelSequence,
        metrics: ReelMetrics,
        effects: &mut Vec<ShellEffect>,
    ) -> SpinId {
        if self.is_in_flight() {
            log::warn!(
                "[Reveal] Starting a spin while {} is still in {}",
                self.spin.map(|s| s.to_string()).unwrap_or_default(),
                self.state.stage
            );
        }
        self.cancel_timer(effects);

        let spin = SpinId(self.next_spin);
        self.next_spin += 1;

        let metrics = metrics.sanitized();
        let overshoot = self.config.overshoot(metrics.item_width);
        let displacement = Displacement::compute(sequence.winner_index, metrics, overshoot);

        self.state = AnimationState {
            stage: RevealStage::Approach,
            current_displacement: displacement.approach,
            target_displacement: displacement.target,
            transition_duration_ms: self.config.approach_duration_ms,
        };

        effects.push(ShellEffect::Animate(AnimationCommand {
            spin,
            stage: RevealStage::Approach,
            from: 0.0,
            to: displacement.approach,
            duration_ms: self.config.approach_duration_ms,
            easing: self.config.approach_easing.clone(),
        }));

        log::debug!(
            "[Reveal] {} idle → approach (winner #{}, target {:.1}px)",
            spin,
            sequence.winner_index,
            displacement.target
        );

        self.spin = Some(spin);
        self.sequence = Some(sequence);
        self.displacement = Some(displacement);
        spin
    }

    /// Handle a completion signal from the shell
    pub fn phase_complete(
        &mut self,
        spin: SpinId,
        stage: RevealStage,
        effects: &mut Vec<ShellEffect>,
    ) -> Transition {
        if self.spin != Some(spin) || self.state.stage != stage {
            log::warn!(
                "[Reveal] Ignoring stale {} completion for {} (current: {:?} in {})",
                stage,
                spin,
                self.spin,
                self.state.stage
            );
            return Transition::Ignored;
        }

        match stage {
            RevealStage::Approach => {
                self.cancel_timer(effects);
                let from = self.state.current_displacement;
                let to = self.state.target_displacement;
                self.state.stage = RevealStage::Settle;
                self.state.current_displacement = to;
                self.state.transition_duration_ms = self.config.settle_duration_ms;

                effects.push(ShellEffect::Animate(AnimationCommand {
                    spin,
                    stage: RevealStage::Settle,
                    from,
                    to,
                    duration_ms: self.config.settle_duration_ms,
                    easing: self.config.settle_easing.clone(),
                }));

                log::debug!("[Reveal] {} approach → settle", spin);
                Transition::Settling { spin }
            }
            RevealStage::Settle => match self.land(effects) {
                Some(landing) => Transition::Landed(landing),
                None => Transition::Ignored,
            },
            RevealStage::Idle => Transition::Ignored,
        }
    }

    /// Land the in-flight reveal immediately, as if Settle had completed
    pub fn land_now(&mut self, effects: &mut Vec<ShellEffect>) -> Option<Landing> {
        if !self.is_in_flight() {
            return None;
        }
        log::debug!("[Reveal] Landing {:?} early", self.spin);
        self.land(effects)
    }

    fn land(&mut self, effects: &mut Vec<ShellEffect>) -> Option<Landing> {
        let spin = self.spin?;
        let sequence = self.sequence.as_ref()?;
        let winner_index = sequence.winner_index;
        let winner = *sequence.winner();

        self.cancel_timer(effects);
        self.state = AnimationState {
            stage: RevealStage::Idle,
            current_displacement: self.state.target_displacement,
            target_displacement: self.state.target_displacement,
            transition_duration_ms: 0.0,
        };

        let flushed = self.pending.flush();

        let (previous, request) = self
            .timer
            .arm(TimerKind::WinnerEmphasis, self.config.emphasis_duration_ms);
        if let Some(previous) = previous {
            effects.push(ShellEffect::CancelTimer(previous));
        }
        effects.push(ShellEffect::ArmTimer(request));

        log::debug!("[Reveal] {} settle → idle", spin);
        Some(Landing {
            spin,
            winner_index,
            winner,
            flushed,
        })
    }

    /// Abort an in-flight reveal: back to Idle, pending updates discarded.
    /// Returns true if a reveal was aborted.
    pub fn cancel(&mut self, effects: &mut Vec<ShellEffect>) -> bool {
        if self.pending.discard() {
            log::debug!("[Reveal] Discarded pending updates");
        }
        if !self.is_in_flight() {
            return false;
        }

        self.cancel_timer(effects);
        log::info!("[Reveal] {:?} cancelled in {}", self.spin, self.state.stage);
        self.state = AnimationState::default();
        self.sequence = None;
        self.displacement = None;
        true
    }

    /// Emphasis timer fired. False if the token is stale.
    pub fn emphasis_expired(&mut self, token: TimerToken) -> bool {
        self.timer.fire(token)
    }

    /// Release everything the machine holds
    pub fn shutdown(&mut self, effects: &mut Vec<ShellEffect>) {
        self.cancel_timer(effects);
        self.pending.discard();
        self.state = AnimationState::default();
        self.sequence = None;
        self.displacement = None;
    }

    fn cancel_timer(&mut self, effects: &mut Vec<ShellEffect>) {
        if let Some(token) = self.timer.cancel() {
            effects.push(ShellEffect::CancelTimer(token));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn stage(&self) -> RevealStage {
        self.state.stage
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.stage.is_in_flight()
    }

    pub fn spin(&self) -> Option<SpinId> {
        self.spin
    }

    pub fn sequence(&self) -> Option<&ReelSequence> {
        self.sequence.as_ref()
    }

    pub fn displacement(&self) -> Option<Displacement> {
        self.displacement
    }

    pub fn pending(&self) -> &PendingUpdateQueue {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut PendingUpdateQueue {
        &mut self.pending
    }

    pub fn armed_timer(&self) -> Option<TimerToken> {
        self.timer.armed()
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PayoutTables;
    use crate::reel::ReelSequenceBuilder;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sl_protocol::SpinOutcome;

    fn sequence(payout: u64) -> ReelSequence {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        ReelSequenceBuilder::default()
            .build_for(&SpinOutcome::new(100, payout), &PayoutTables::default(), &mut rng)
            .unwrap()
    }

    fn animations(effects: &[ShellEffect]) -> Vec<&AnimationCommand> {
        effects
            .iter()
            .filter_map(|e| match e {
                ShellEffect::Animate(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_full_lifecycle() {
        let mut machine = RevealStateMachine::new(RevealConfig::normal());
        let mut effects = Vec::new();

        let spin = machine.begin(sequence(100), ReelMetrics::default(), &mut effects);
        assert_eq!(machine.stage(), RevealStage::Approach);
        let approach = animations(&effects)[0].clone();
        assert_eq!(approach.stage, RevealStage::Approach);
        assert_eq!(approach.duration_ms, 4200.0);
        assert_eq!(approach.easing, RevealConfig::APPROACH_EASING);

        effects.clear();
        let t = machine.phase_complete(spin, RevealStage::Approach, &mut effects);
        assert_eq!(t, Transition::Settling { spin });
        let settle = animations(&effects)[0].clone();
        assert_eq!(settle.from, approach.to);
        assert!(settle.to > settle.from);
        assert_eq!(settle.to, machine.state().target_displacement);

        effects.clear();
        machine.pending_mut().defer_balance(500);
        let Transition::Landed(landing) = machine.phase_complete(spin, RevealStage::Settle, &mut effects) else {
            panic!("expected landing");
        };
        assert_eq!(landing.winner.value, 100);
        assert_eq!(landing.winner_index, 28);
        assert_eq!(landing.flushed.unwrap().wallet_balance, Some(500));
        assert_eq!(machine.stage(), RevealStage::Idle);
        assert!(matches!(effects.last(), Some(ShellEffect::ArmTimer(_))));
        assert!(machine.armed_timer().is_some());
    }

    #[test]
    fn test_stale_signals_ignored() {
        let mut machine = RevealStateMachine::new(RevealConfig::studio());
        let mut effects = Vec::new();
        let spin = machine.begin(sequence(20), ReelMetrics::default(), &mut effects);

        // Wrong stage
        assert_eq!(
            machine.phase_complete(spin, RevealStage::Settle, &mut effects),
            Transition::Ignored
        );
        // Wrong spin
        assert_eq!(
            machine.phase_complete(SpinId(99), RevealStage::Approach, &mut effects),
            Transition::Ignored
        );
        assert_eq!(machine.stage(), RevealStage::Approach);
    }

    #[test]
    fn test_cancel_discards_pending() {
        let mut machine = RevealStateMachine::new(RevealConfig::normal());
        let mut effects = Vec::new();
        let spin = machine.begin(sequence(50), ReelMetrics::default(), &mut effects);
        machine.pending_mut().defer_outcome(SpinOutcome::new(100, 50));

        assert!(machine.cancel(&mut effects));
        assert_eq!(machine.stage(), RevealStage::Idle);
        assert!(machine.pending().is_empty());
        assert_eq!(machine.pending().discard_count(), 1);

        // Completion from the aborted spin does nothing
        assert_eq!(
            machine.phase_complete(spin, RevealStage::Approach, &mut effects),
            Transition::Ignored
        );
        assert!(!machine.cancel(&mut effects));
    }

    #[test]
    fn test_transition_cancels_emphasis() {
        let mut machine = RevealStateMachine::new(RevealConfig::normal());
        let mut effects = Vec::new();
        let spin = machine.begin(sequence(50), ReelMetrics::default(), &mut effects);
        machine.phase_complete(spin, RevealStage::Approach, &mut effects);
        machine.phase_complete(spin, RevealStage::Settle, &mut effects);
        let token = machine.armed_timer().unwrap();

        effects.clear();
        machine.begin(sequence(20), ReelMetrics::default(), &mut effects);
        assert_eq!(effects[0], ShellEffect::CancelTimer(token));
        assert!(!machine.emphasis_expired(token));
    }

    #[test]
    fn test_land_now() {
        let mut machine = RevealStateMachine::new(RevealConfig::normal());
        let mut effects = Vec::new();
        assert!(machine.land_now(&mut effects).is_none());

        let spin = machine.begin(sequence(80), ReelMetrics::default(), &mut effects);
        let landing = machine.land_now(&mut effects).unwrap();
        assert_eq!(landing.spin, spin);
        assert_eq!(landing.winner.value, 80);
        assert_eq!(machine.state().current_displacement, machine.state().target_displacement);
    }
}
