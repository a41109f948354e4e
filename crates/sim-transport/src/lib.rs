//! Session transport seam.
//!
//! The runtime only ever talks to [`Transport`]: broadcast to every
//! participant, targeted send to one, subscribe to the inbound stream.
//! Delivery is best-effort by contract; nothing upstream may assume
//! at-least-once delivery or cross-code ordering (sync snapshots are
//! monotonic-safe for exactly this reason).

pub mod error;
pub mod inmem;
pub mod traits;

pub use error::{Result, TransportError};
pub use inmem::{InMemReceiver, InMemTransport};
pub use traits::{EventReceiver, Transport};
