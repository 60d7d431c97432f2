//! RevealController - the single event queue consumer
//!
//! Every input the core reacts to (authority messages, animation phase
//! completions, timer firings, connectivity and player actions) enters through
//! [`RevealController::handle`], one event at a time. The controller mutates
//! [`VisibleState`] and returns the effects the shell has to carry out.
//!
//! While a reveal is in flight, anything that would expose the result early is
//! held in the state machine's pending queue and applied in the same update as
//! the landing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sl_protocol::{InboundMessage, PaymentRequest, ServerInfo, SpinOutcome};

use crate::config::RevealConfig;
use crate::context::SessionContext;
use crate::effect::ShellEffect;
use crate::error::RevealResult;
use crate::machine::{Landing, RevealStateMachine, Transition};
use crate::payment::{PaymentSettlement, PaymentTracker};
use crate::pending::PayoutResult;
use crate::reel::{IdlePreview, ReelSequenceBuilder};
use crate::stage::{ReelMetrics, RevealStage, SpinId};
use crate::timer::TimerToken;
use crate::view::{PaymentPrompt, ReelView, VisibleState, WinnerEmphasis, payout_status_text, status};

/// Input to the core
#[derive(Debug, Clone, PartialEq)]
pub enum RevealEvent {
    /// Message from the authority
    Inbound(InboundMessage),
    /// The shell finished the transit of `stage` for `spin`
    PhaseComplete { spin: SpinId, stage: RevealStage },
    /// A timer armed through `ShellEffect::ArmTimer` fired
    TimerFired(TimerToken),
    ConnectionLost,
    ConnectionRestored,
    /// Player closed the payment prompt
    PaymentDismissed,
    /// Player picked a bet size
    BetSelected(u64),
    /// Reel was measured again
    LayoutChanged(ReelMetrics),
}

impl RevealEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inbound(msg) => msg.event_name(),
            Self::PhaseComplete { .. } => "phaseComplete",
            Self::TimerFired(_) => "timerFired",
            Self::ConnectionLost => "connectionLost",
            Self::ConnectionRestored => "connectionRestored",
            Self::PaymentDismissed => "paymentDismissed",
            Self::BetSelected(_) => "betSelected",
            Self::LayoutChanged(_) => "layoutChanged",
        }
    }
}

impl From<InboundMessage> for RevealEvent {
    fn from(msg: InboundMessage) -> Self {
        Self::Inbound(msg)
    }
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealStats {
    pub spins_started: u64,
    pub spins_landed: u64,
    pub spins_cancelled: u64,
    pub stale_signals: u64,
}

pub struct RevealController<R = StdRng> {
    config: RevealConfig,
    context: SessionContext,
    rng: R,
    builder: ReelSequenceBuilder,
    machine: RevealStateMachine,
    payments: PaymentTracker,
    metrics: ReelMetrics,
    visible: VisibleState,
    stats: RevealStats,
}

impl RevealController<StdRng> {
    /// Controller with a seeded standard generator
    pub fn seeded(config: RevealConfig, context: SessionContext, seed: u64) -> RevealResult<Self> {
        Self::new(config, context, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RevealController<R> {
    pub fn new(config: RevealConfig, context: SessionContext, rng: R) -> RevealResult<Self> {
        config.validate()?;

        let metrics = match context.metrics {
            Some(measured) => measured.sanitized(),
            None => config.default_metrics(),
        };

        let bet = context.current_bet();
        let reel = match bet {
            Some(bet) => ReelView::Preview(IdlePreview::for_bet(bet, &context.tables, metrics)),
            None => ReelView::Empty,
        };

        let visible = VisibleState {
            connected: context.connected,
            bet_options: context.tables.bet_options.clone(),
            selected_bet: bet,
            balance_sats: context.last_balance,
            reel,
            ..Default::default()
        };

        Ok(Self {
            builder: ReelSequenceBuilder::from_config(&config),
            machine: RevealStateMachine::new(config.clone()),
            payments: PaymentTracker::new(config.payment_poll_interval_ms),
            config,
            context,
            rng,
            metrics,
            visible,
            stats: RevealStats::default(),
        })
    }

    /// Process one event and return the effects to execute, in order
    pub fn handle(&mut self, event: RevealEvent) -> Vec<ShellEffect> {
        let mut effects = Vec::new();
        log::trace!("[Reveal] Event: {}", event.name());

        let changed = match event {
            RevealEvent::Inbound(msg) => self.on_message(msg, &mut effects),
            RevealEvent::PhaseComplete { spin, stage } => {
                self.on_phase_complete(spin, stage, &mut effects)
            }
            RevealEvent::TimerFired(token) => self.on_timer(token),
            RevealEvent::ConnectionLost => self.on_connection_lost(&mut effects),
            RevealEvent::ConnectionRestored => self.on_connection_restored(&mut effects),
            RevealEvent::PaymentDismissed => self.on_payment_dismissed(&mut effects),
            RevealEvent::BetSelected(bet) => self.on_bet_selected(bet),
            RevealEvent::LayoutChanged(metrics) => self.on_layout_changed(metrics),
        };

        if changed {
            self.commit(&mut effects);
        }
        effects
    }

    /// Stop everything the core has asked the shell to run
    pub fn shutdown(&mut self) -> Vec<ShellEffect> {
        let mut effects = Vec::new();
        self.machine.shutdown(&mut effects);
        self.payments.settle(PaymentSettlement::Aborted, &mut effects);
        effects
    }

    fn commit(&mut self, effects: &mut Vec<ShellEffect>) {
        self.visible.animation = *self.machine.state();
        self.visible.revision += 1;
        effects.push(ShellEffect::VisibleChanged {
            revision: self.visible.revision,
        });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // AUTHORITY MESSAGES
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_message(&mut self, msg: InboundMessage, effects: &mut Vec<ShellEffect>) -> bool {
        match msg {
            InboundMessage::ServerInfo(info) => self.on_server_info(&info),
            InboundMessage::SpinOutcome(outcome) => self.on_spin_outcome(outcome, effects),
            InboundMessage::PayoutSent(sent) => self.on_payout(PayoutResult::Sent(sent)),
            InboundMessage::PayoutFailed(failed) => self.on_payout(PayoutResult::Failed(failed)),
            InboundMessage::WalletBalance(balance) => self.on_wallet_balance(balance.balance_sats),
            InboundMessage::PaymentRequest(request) => self.on_payment_request(&request, effects),
            InboundMessage::PaymentVerified(_) => {
                self.payments.settle(PaymentSettlement::Verified, effects);
                self.visible.payment_prompt = None;
                self.visible.status = status::PAYMENT_VERIFIED.to_string();
                true
            }
            InboundMessage::PaymentFailed(_) => {
                self.abort(PaymentSettlement::Failed, status::PAYMENT_FAILED.to_string(), effects)
            }
            InboundMessage::PaymentExpired(_) => {
                self.abort(PaymentSettlement::Expired, status::INVOICE_EXPIRED.to_string(), effects)
            }
            InboundMessage::ErrorMessage(notice) => {
                let text = notice
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| status::GENERIC_ERROR.to_string());
                self.abort(PaymentSettlement::Aborted, text, effects)
            }
        }
    }

    fn on_server_info(&mut self, info: &ServerInfo) -> bool {
        self.context.tables.update(info);
        self.visible.bet_options = self.context.tables.bet_options.clone();
        self.visible.selected_bet = self.context.current_bet();
        log::debug!(
            "[Reveal] Server info: {} bet options, {} payout rows",
            info.bet_options.len(),
            info.payout_table.len()
        );
        self.refresh_preview();
        true
    }

    fn on_spin_outcome(&mut self, outcome: SpinOutcome, effects: &mut Vec<ShellEffect>) -> bool {
        if let Some(landing) = self.machine.land_now(effects) {
            log::info!("[Reveal] {} superseded by a new outcome", landing.spin);
            self.apply_landing(landing);
        }

        // An outcome implies the invoice was paid
        self.payments.settle(PaymentSettlement::Verified, effects);
        self.visible.payment_prompt = None;
        self.visible.emphasis = None;
        self.visible.last_outcome = None;
        self.visible.payout_status = None;

        let sequence = match self.builder.build_for(&outcome, &self.context.tables, &mut self.rng) {
            Ok(sequence) => sequence,
            Err(e) => {
                log::error!("[Reveal] Could not build reel for outcome: {}", e);
                self.apply_outcome(outcome);
                return true;
            }
        };

        log::info!(
            "[Reveal] Spin started: bet {} → payout {} ({} entries, {:?})",
            outcome.bet_amount,
            outcome.payout_amount,
            sequence.len(),
            sequence.sampling
        );

        self.visible.reel = ReelView::Sequence(sequence.clone());
        self.visible.status = status::SPINNING.to_string();
        self.machine.begin(sequence, self.metrics, effects);
        self.machine.pending_mut().defer_outcome(outcome);
        self.stats.spins_started += 1;
        true
    }

    fn on_payout(&mut self, result: PayoutResult) -> bool {
        if self.machine.is_in_flight() {
            log::debug!("[Reveal] Deferring payout result until landing");
            self.machine.pending_mut().defer_payout(result);
            return false;
        }
        self.apply_payout(result);
        true
    }

    fn on_wallet_balance(&mut self, balance: Option<u64>) -> bool {
        let Some(balance) = balance else {
            log::debug!("[Reveal] Ignoring unusable balance");
            return false;
        };

        if self.machine.is_in_flight() {
            let increase = self.visible.balance_sats.is_some_and(|shown| balance > shown);
            if increase {
                log::debug!("[Reveal] Deferring balance increase to {}", balance);
                self.machine.pending_mut().defer_balance(balance);
                return false;
            }
            // A decrease or unchanged value applies now and replaces any held increase
            self.machine.pending_mut().clear_balance();
        }

        self.apply_balance(balance)
    }

    fn on_payment_request(&mut self, request: &PaymentRequest, effects: &mut Vec<ShellEffect>) -> bool {
        let payment = self.payments.begin(request, effects);
        self.visible.payment_prompt = Some(PaymentPrompt {
            invoice_id: payment.invoice_id.clone(),
            amount_sats: payment.amount_sats,
            payment_url: payment.payment_url.clone(),
        });
        self.visible.status = status::pay_to_spin(request.amount_sats);

        if !self.machine.is_in_flight() {
            self.visible.last_outcome = None;
            self.visible.payout_status = None;
        }
        true
    }

    /// Terminal message: abort the reveal, stop the poll, show `text`
    fn abort(
        &mut self,
        reason: PaymentSettlement,
        text: String,
        effects: &mut Vec<ShellEffect>,
    ) -> bool {
        self.cancel_reveal(effects);
        self.payments.settle(reason, effects);
        self.visible.payment_prompt = None;
        self.visible.status = text;
        true
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SHELL EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_phase_complete(
        &mut self,
        spin: SpinId,
        stage: RevealStage,
        effects: &mut Vec<ShellEffect>,
    ) -> bool {
        match self.machine.phase_complete(spin, stage, effects) {
            Transition::Ignored => {
                self.stats.stale_signals += 1;
                false
            }
            Transition::Settling { .. } => true,
            Transition::Landed(landing) => {
                self.apply_landing(landing);
                true
            }
        }
    }

    fn on_timer(&mut self, token: TimerToken) -> bool {
        if !self.machine.emphasis_expired(token) {
            log::debug!("[Reveal] Ignoring stale timer {:?}", token);
            return false;
        }
        self.visible.emphasis.take().is_some()
    }

    fn on_connection_lost(&mut self, effects: &mut Vec<ShellEffect>) -> bool {
        log::warn!("[Reveal] Connection lost");
        self.context.connected = false;
        self.visible.connected = false;
        self.visible.status = status::DISCONNECTED.to_string();
        self.cancel_reveal(effects);
        true
    }

    fn on_connection_restored(&mut self, effects: &mut Vec<ShellEffect>) -> bool {
        log::info!("[Reveal] Connection restored");
        self.context.connected = true;
        self.visible.connected = true;
        self.visible.status.clear();
        effects.push(ShellEffect::RequestBalance);
        true
    }

    fn on_payment_dismissed(&mut self, effects: &mut Vec<ShellEffect>) -> bool {
        let dismissed = self.payments.settle(PaymentSettlement::Dismissed, effects).is_some();
        let had_prompt = self.visible.payment_prompt.take().is_some();
        dismissed || had_prompt
    }

    fn on_bet_selected(&mut self, bet: u64) -> bool {
        self.context.selected_bet = Some(bet);
        self.visible.selected_bet = self.context.current_bet();
        if !self.machine.is_in_flight() {
            self.visible.emphasis = None;
            self.show_preview();
        }
        true
    }

    fn on_layout_changed(&mut self, metrics: ReelMetrics) -> bool {
        let metrics = metrics.sanitized();
        self.context.metrics = Some(metrics);
        if metrics == self.metrics {
            return false;
        }
        self.metrics = metrics;
        self.refresh_preview()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // APPLYING UPDATES
    // ═══════════════════════════════════════════════════════════════════════════

    fn apply_landing(&mut self, landing: Landing) {
        let Landing {
            spin,
            winner_index,
            winner,
            flushed,
        } = landing;

        if let Some(pending) = flushed {
            if let Some(outcome) = pending.outcome {
                self.apply_outcome(outcome);
            }
            // The balance field already holds the newest deferred value,
            // including one carried by the payout
            if let Some(result) = pending.payout_result {
                self.show_payout(result);
            }
            if let Some(balance) = pending.wallet_balance {
                self.apply_balance(balance);
            }
        }

        self.visible.emphasis = Some(WinnerEmphasis {
            index: winner_index,
            value: winner.value,
            tier: winner.tier,
            intensity: winner.tier.emphasis_intensity(),
        });
        self.stats.spins_landed += 1;
        log::info!("[Reveal] {} landed on {} SATS ({})", spin, winner.value, winner.tier);
    }

    fn apply_outcome(&mut self, outcome: SpinOutcome) {
        self.visible.status = status::result(outcome.payout_amount);
        self.visible.last_outcome = Some(outcome);
    }

    fn apply_payout(&mut self, result: PayoutResult) {
        if let Some(balance) = result.balance_sats() {
            self.apply_balance(balance);
        }
        self.show_payout(result);
    }

    fn show_payout(&mut self, result: PayoutResult) {
        self.visible.status = payout_status_text(&result);
        self.visible.payout_status = Some(result);
    }

    fn apply_balance(&mut self, balance: u64) -> bool {
        self.context.last_balance = Some(balance);
        if self.visible.balance_sats == Some(balance) {
            return false;
        }
        self.visible.balance_sats = Some(balance);
        true
    }

    fn cancel_reveal(&mut self, effects: &mut Vec<ShellEffect>) {
        if self.machine.cancel(effects) {
            self.stats.spins_cancelled += 1;
            // Never leave an unrevealed winner on screen
            self.visible.emphasis = None;
            self.show_preview();
        }
    }

    fn show_preview(&mut self) {
        self.visible.reel = match self.context.current_bet() {
            Some(bet) => ReelView::Preview(IdlePreview::for_bet(
                bet,
                &self.context.tables,
                self.metrics,
            )),
            None => ReelView::Empty,
        };
    }

    /// Rebuild the idle preview if that is what the reel shows
    fn refresh_preview(&mut self) -> bool {
        if self.machine.is_in_flight() || matches!(self.visible.reel, ReelView::Sequence(_)) {
            return false;
        }
        self.show_preview();
        true
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn visible(&self) -> &VisibleState {
        &self.visible
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn machine(&self) -> &RevealStateMachine {
        &self.machine
    }

    pub fn payments(&self) -> &PaymentTracker {
        &self.payments
    }

    /// Reel layout in effect
    pub fn metrics(&self) -> ReelMetrics {
        self.metrics
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    pub fn stats(&self) -> RevealStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_protocol::{ErrorNotice, WalletBalance};

    fn controller() -> RevealController {
        let context = SessionContext::new().with_balance(1000).connected(true);
        RevealController::seeded(RevealConfig::normal(), context, 7).unwrap()
    }

    fn spin_of(effects: &[ShellEffect]) -> SpinId {
        effects
            .iter()
            .find_map(|e| match e {
                ShellEffect::Animate(cmd) => Some(cmd.spin),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_initial_state() {
        let c = controller();
        assert_eq!(c.visible().revision, 0);
        assert_eq!(c.visible().balance_sats, Some(1000));
        assert_eq!(c.visible().selected_bet, Some(20));
        assert!(matches!(c.visible().reel, ReelView::Preview(_)));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = RevealConfig::normal();
        config.overshoot_min_px = -1.0;
        assert!(RevealController::seeded(config, SessionContext::new(), 1).is_err());
    }

    #[test]
    fn test_outcome_hidden_until_landing() {
        let mut c = controller();
        let effects = c.handle(InboundMessage::SpinOutcome(SpinOutcome::new(100, 50)).into());
        let spin = spin_of(&effects);

        assert!(c.visible().last_outcome.is_none());
        assert_eq!(c.visible().status, status::SPINNING);

        c.handle(RevealEvent::PhaseComplete { spin, stage: RevealStage::Approach });
        assert!(c.visible().last_outcome.is_none());

        c.handle(RevealEvent::PhaseComplete { spin, stage: RevealStage::Settle });
        assert_eq!(c.visible().last_outcome.as_ref().unwrap().payout_amount, 50);
        assert_eq!(c.visible().status, "Result: 50 SATS");
        assert_eq!(c.visible().emphasis.unwrap().value, 50);
    }

    #[test]
    fn test_wallet_balance_when_idle() {
        let mut c = controller();
        let effects = c.handle(InboundMessage::WalletBalance(WalletBalance { balance_sats: Some(1500) }).into());
        assert_eq!(effects, vec![ShellEffect::VisibleChanged { revision: 1 }]);

        // Same value again is not an observable change
        let effects = c.handle(InboundMessage::WalletBalance(WalletBalance { balance_sats: Some(1500) }).into());
        assert!(effects.is_empty());

        let effects = c.handle(InboundMessage::WalletBalance(WalletBalance { balance_sats: None }).into());
        assert!(effects.is_empty());
        assert_eq!(c.visible().balance_sats, Some(1500));
    }

    #[test]
    fn test_error_message_text() {
        let mut c = controller();
        c.handle(InboundMessage::ErrorMessage(ErrorNotice { message: Some("Rate limited".into()) }).into());
        assert_eq!(c.visible().status, "Rate limited");

        c.handle(InboundMessage::ErrorMessage(ErrorNotice { message: None }).into());
        assert_eq!(c.visible().status, status::GENERIC_ERROR);
    }

    #[test]
    fn test_emphasis_expires() {
        let mut c = controller();
        let effects = c.handle(InboundMessage::SpinOutcome(SpinOutcome::new(20, 0)).into());
        let spin = spin_of(&effects);
        c.handle(RevealEvent::PhaseComplete { spin, stage: RevealStage::Approach });
        let effects = c.handle(RevealEvent::PhaseComplete { spin, stage: RevealStage::Settle });

        let token = effects
            .iter()
            .find_map(|e| match e {
                ShellEffect::ArmTimer(req) => Some(req.token),
                _ => None,
            })
            .unwrap();

        let effects = c.handle(RevealEvent::TimerFired(token));
        assert_eq!(effects.len(), 1);
        assert!(c.visible().emphasis.is_none());

        // Fired twice: stale
        assert!(c.handle(RevealEvent::TimerFired(token)).is_empty());
    }

    #[test]
    fn test_bet_selection_rebuilds_preview() {
        let mut c = controller();
        c.handle(RevealEvent::BetSelected(500));
        assert_eq!(c.visible().selected_bet, Some(500));
        let ReelView::Preview(preview) = &c.visible().reel else {
            panic!("expected preview");
        };
        assert!(preview.entries.iter().any(|e| e.value == 500));
    }

    #[test]
    fn test_layout_change() {
        let mut c = controller();
        assert!(c.handle(RevealEvent::LayoutChanged(ReelMetrics::default())).is_empty());
        let effects = c.handle(RevealEvent::LayoutChanged(ReelMetrics::new(80.0, 400.0)));
        assert_eq!(effects.len(), 1);
        assert_eq!(c.metrics().item_width, 80.0);
        assert_eq!(c.context().metrics, Some(ReelMetrics::new(80.0, 400.0)));
    }

    #[test]
    fn test_configured_default_metrics() {
        let mut config = RevealConfig::normal();
        config.default_item_width = 80.0;
        config.default_viewport_width = 480.0;

        let c = RevealController::seeded(config.clone(), SessionContext::new(), 3).unwrap();
        assert_eq!(c.metrics(), ReelMetrics::new(80.0, 480.0));
        let ReelView::Preview(preview) = &c.visible().reel else {
            panic!("expected preview");
        };
        assert_eq!(preview.loop_distance, preview.tile_len as f64 * 80.0);

        // A measured layout wins over the configured default
        let context = SessionContext::new().with_metrics(ReelMetrics::new(100.0, 500.0));
        let c = RevealController::seeded(config, context, 3).unwrap();
        assert_eq!(c.metrics(), ReelMetrics::new(100.0, 500.0));
    }
}
