//! Reveal driver - the single event queue
//!
//! ```text
//!  transport ─┐
//!  surface  ──┤                         ┌─► AnimationSurface
//!  timers   ──┼─► mpsc<DriverEvent> ─► RevealController::handle ─► effects ─┼─► TimerSet
//!  poll     ──┤                         ├─► PaymentPoll ─► requests
//!  handle   ──┘                         └─► watch<VisibleState>
//! ```
//!
//! Only the driver task touches the controller, so events are applied
//! strictly one at a time in arrival order.

use rand::Rng;
use sl_protocol::OutboundRequest;
use sl_reveal::{RevealController, RevealEvent, ShellEffect, VisibleState};
use tokio::sync::{mpsc, watch};

use crate::error::{ConnectorError, ConnectorResult};
use crate::poll::PaymentPoll;
use crate::surface::{AnimationSurface, PhaseDone};
use crate::tasks::{TimerSet, millis};

/// Default capacity of the event and request queues
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Item of the driver queue
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Reveal(RevealEvent),
    Shutdown,
}

impl From<RevealEvent> for DriverEvent {
    fn from(event: RevealEvent) -> Self {
        Self::Reveal(event)
    }
}

/// Cloneable access to a running driver
#[derive(Debug, Clone)]
pub struct DriverHandle {
    events: mpsc::Sender<DriverEvent>,
    requests: mpsc::Sender<OutboundRequest>,
    visible: watch::Receiver<VisibleState>,
}

impl DriverHandle {
    /// Queue an event for the controller
    pub async fn send(&self, event: impl Into<RevealEvent>) -> ConnectorResult<()> {
        self.events
            .send(DriverEvent::Reveal(event.into()))
            .await
            .map_err(|_| ConnectorError::SendFailed)
    }

    /// Send a request to the authority (e.g. `startSpin`)
    pub async fn request(&self, request: OutboundRequest) -> ConnectorResult<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| ConnectorError::SendFailed)
    }

    /// Ask the driver to stop after the events already queued
    pub async fn shutdown(&self) -> ConnectorResult<()> {
        self.events
            .send(DriverEvent::Shutdown)
            .await
            .map_err(|_| ConnectorError::DriverStopped)
    }

    /// Latest published visible state
    pub fn visible(&self) -> VisibleState {
        self.visible.borrow().clone()
    }

    /// Watch visible state updates
    pub fn subscribe(&self) -> watch::Receiver<VisibleState> {
        self.visible.clone()
    }

    pub fn events(&self) -> mpsc::Sender<DriverEvent> {
        self.events.clone()
    }
}

/// Owns the controller and executes its effects
pub struct RevealDriver<R, S> {
    controller: RevealController<R>,
    surface: S,
    events_tx: mpsc::Sender<DriverEvent>,
    events_rx: mpsc::Receiver<DriverEvent>,
    requests: mpsc::Sender<OutboundRequest>,
    visible_tx: watch::Sender<VisibleState>,
    timers: TimerSet,
    poll: Option<PaymentPoll>,
}

impl<R, S> RevealDriver<R, S>
where
    R: Rng + Send + 'static,
    S: AnimationSurface + 'static,
{
    /// Create a driver. The returned receiver yields every request meant for
    /// the authority; hand it to a transport (or print it).
    pub fn new(
        controller: RevealController<R>,
        surface: S,
    ) -> (Self, DriverHandle, mpsc::Receiver<OutboundRequest>) {
        Self::with_capacity(controller, surface, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(
        controller: RevealController<R>,
        surface: S,
        capacity: usize,
    ) -> (Self, DriverHandle, mpsc::Receiver<OutboundRequest>) {
        let capacity = capacity.max(1);
        let (events_tx, events_rx) = mpsc::channel(capacity);
        let (requests_tx, requests_rx) = mpsc::channel(capacity);
        let (visible_tx, visible_rx) = watch::channel(controller.visible().clone());

        let handle = DriverHandle {
            events: events_tx.clone(),
            requests: requests_tx.clone(),
            visible: visible_rx,
        };

        let driver = Self {
            controller,
            surface,
            events_tx,
            events_rx,
            requests: requests_tx,
            visible_tx,
            timers: TimerSet::new(),
            poll: None,
        };

        (driver, handle, requests_rx)
    }

    /// Process events until `Shutdown`. Returns the controller for inspection.
    pub async fn run(mut self) -> ConnectorResult<RevealController<R>> {
        log::info!("[Driver] Started");

        while let Some(event) = self.events_rx.recv().await {
            let event = match event {
                DriverEvent::Reveal(event) => event,
                DriverEvent::Shutdown => break,
            };

            if let RevealEvent::TimerFired(token) = &event {
                self.timers.forget(*token);
            }

            let effects = self.controller.handle(event);
            self.execute(effects).await;
        }

        let effects = self.controller.shutdown();
        self.execute(effects).await;
        self.timers.abort_all();
        self.surface.halt();
        self.poll = None;

        log::info!("[Driver] Stopped ({:?})", self.controller.stats());
        Ok(self.controller)
    }

    async fn execute(&mut self, effects: Vec<ShellEffect>) {
        for effect in effects {
            log::trace!("[Driver] Effect: {}", effect.name());
            match effect {
                ShellEffect::Animate(command) => {
                    let done = PhaseDone::new(command.spin, command.stage, self.events_tx.clone());
                    self.surface.animate(&command, done);
                }
                ShellEffect::ArmTimer(request) => {
                    self.timers.arm(request, self.events_tx.clone());
                }
                ShellEffect::CancelTimer(token) => {
                    self.timers.cancel(token);
                }
                ShellEffect::StartPaymentPoll {
                    invoice_id,
                    interval_ms,
                } => {
                    // Replacing drops (and stops) the previous poll
                    self.poll = Some(PaymentPoll::start(
                        invoice_id,
                        millis(interval_ms),
                        self.requests.clone(),
                    ));
                }
                ShellEffect::StopPaymentPoll => {
                    self.poll = None;
                }
                ShellEffect::RequestBalance => {
                    let request = OutboundRequest::GetBalance {
                        lightning_address: self.controller.context().lightning_address.clone(),
                    };
                    if self.requests.send(request).await.is_err() {
                        log::warn!("[Driver] Request channel closed, balance not requested");
                    }
                }
                ShellEffect::VisibleChanged { revision } => {
                    log::debug!("[Driver] {}", self.controller.visible().summary());
                    debug_assert_eq!(revision, self.controller.visible().revision);
                    self.visible_tx.send_replace(self.controller.visible().clone());
                }
            }
        }
    }

    pub fn controller(&self) -> &RevealController<R> {
        &self.controller
    }

    pub fn has_payment_poll(&self) -> bool {
        self.poll.is_some()
    }
}
