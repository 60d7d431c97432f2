//! # sl-protocol - Slides wire protocol
//!
//! Everything that crosses the boundary between the reveal core and the
//! remote authority:
//!
//! - **Inbound messages**: `serverInfo`, `spinOutcome`, `payoutSent`, ...
//! - **Outbound requests**: issued by the shell (`startSpin`, `checkPayment`, `getBalance`)
//! - **Frames**: `{ "type": ..., "data": ... }` JSON envelopes
//! - **Numeric sanitisation**: non-finite or negative amounts never reach the core
//!
//! ```text
//! text ──► ProtocolFrame::decode ──► InboundMessage ──► sl-reveal
//! ```

pub mod error;
pub mod frame;
pub mod message;
pub mod numeric;
pub mod request;

pub use error::*;
pub use frame::*;
pub use message::*;
pub use request::*;
