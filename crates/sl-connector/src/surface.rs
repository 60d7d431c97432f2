//! Animation surfaces
//!
//! A surface performs the reel transits the core asks for and reports each
//! completion back into the driver queue. The headless surface just waits for
//! the transit duration, which is enough for the console and for tests.

use sl_reveal::{AnimationCommand, RevealEvent, RevealStage, SpinId};
use tokio::sync::mpsc;

use crate::driver::DriverEvent;
use crate::tasks::{TaskGuard, millis};

/// Completion callback for one transit
#[derive(Debug, Clone)]
pub struct PhaseDone {
    spin: SpinId,
    stage: RevealStage,
    events: mpsc::Sender<DriverEvent>,
}

impl PhaseDone {
    pub(crate) fn new(spin: SpinId, stage: RevealStage, events: mpsc::Sender<DriverEvent>) -> Self {
        Self { spin, stage, events }
    }

    pub fn spin(&self) -> SpinId {
        self.spin
    }

    pub fn stage(&self) -> RevealStage {
        self.stage
    }

    /// Report the transit as finished
    pub async fn complete(self) {
        let event = RevealEvent::PhaseComplete {
            spin: self.spin,
            stage: self.stage,
        };
        if self.events.send(DriverEvent::Reveal(event)).await.is_err() {
            log::debug!("[Surface] Queue closed before {} {} completed", self.spin, self.stage);
        }
    }
}

/// Something that can run reel transits
pub trait AnimationSurface: Send {
    /// Start `command`. `done` must be completed when the transit ends.
    fn animate(&mut self, command: &AnimationCommand, done: PhaseDone);

    /// Stop whatever is running
    fn halt(&mut self) {}
}

/// Surface without rendering: completes each transit after its duration
#[derive(Debug)]
pub struct HeadlessSurface {
    /// Multiplier on transit durations (0 = complete immediately)
    time_scale: f64,
    running: Option<TaskGuard>,
    transits: u64,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::with_time_scale(1.0)
    }

    pub fn with_time_scale(time_scale: f64) -> Self {
        Self {
            time_scale: if time_scale.is_finite() { time_scale.max(0.0) } else { 1.0 },
            running: None,
            transits: 0,
        }
    }

    /// Transits started so far
    pub fn transits(&self) -> u64 {
        self.transits
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationSurface for HeadlessSurface {
    fn animate(&mut self, command: &AnimationCommand, done: PhaseDone) {
        let delay = millis(command.duration_ms * self.time_scale);
        log::debug!(
            "[Surface] {} {}: {:.1}px → {:.1}px over {:?} ({})",
            command.spin,
            command.stage,
            command.from,
            command.to,
            delay,
            command.easing
        );
        self.transits += 1;
        self.running = Some(TaskGuard::spawn(async move {
            tokio::time::sleep(delay).await;
            done.complete().await;
        }));
    }

    fn halt(&mut self) {
        self.running = None;
    }
}
