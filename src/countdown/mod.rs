//! Focus countdown.
//!
//! [`CountdownEngine`] holds the state machine and persists on every change;
//! [`CountdownTimer`] shares it with the daemon and drives the ticks.

mod engine;
mod error;
mod ticker;

pub use engine::{CountdownEngine, CountdownEvent, TICK_MILLIS};
pub use error::CountdownError;
pub use ticker::CountdownTimer;
