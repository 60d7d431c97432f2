//! # sl-reveal - Slides reveal orchestration core
//!
//! Reconciles an asynchronously delivered authoritative payout with a
//! two-phase reel animation, so the result becomes visible exactly once and
//! only after the reel has landed on it.
//!
//! ## Architecture
//!
//! ```text
//! RevealEvent ──► RevealController::handle ──► Vec<ShellEffect>
//!                      │
//!                      ├── ReelSequenceBuilder (RandomSampler + RarityClassifier)
//!                      ├── RevealStateMachine  (Idle → Approach → Settle → Idle)
//!                      │       ├── PendingUpdateQueue (flushed on landing)
//!                      │       └── ScopedTimer        (winner emphasis)
//!                      ├── PaymentTracker      (poll start / stop)
//!                      └── VisibleState        (one revision per observable update)
//! ```
//!
//! The core is synchronous and never blocks: the surrounding shell feeds it
//! events one at a time and executes the returned effects.

pub mod config;
pub mod context;
pub mod controller;
pub mod effect;
pub mod error;
pub mod machine;
pub mod payment;
pub mod pending;
pub mod rarity;
pub mod reel;
pub mod sampler;
pub mod stage;
pub mod timer;
pub mod view;

pub use config::*;
pub use context::*;
pub use controller::*;
pub use effect::*;
pub use error::*;
pub use machine::*;
pub use payment::*;
pub use pending::*;
pub use rarity::*;
pub use reel::*;
pub use sampler::*;
pub use stage::*;
pub use timer::*;
pub use view::*;

pub use sl_protocol::{InboundMessage, PayoutFailed, PayoutSent, SpinOutcome};
