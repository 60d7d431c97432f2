//! # sl-connector - Slides runtime shell
//!
//! Runs the reveal core inside tokio.
//!
//! ## Features
//!
//! - Single event queue feeding `RevealController` (one event at a time)
//! - Real timers and a headless animation surface that report back into the queue
//! - Payment confirmation poll that lives exactly as long as the payment
//! - WebSocket transport with automatic reconnection
//! - Visible state published on a `watch` channel

pub mod config;
pub mod driver;
pub mod error;
pub mod poll;
pub mod surface;
pub mod tasks;
pub mod transport;

pub use config::*;
pub use driver::*;
pub use error::*;
pub use poll::*;
pub use surface::*;
pub use tasks::*;
pub use transport::*;
