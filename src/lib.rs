//! Paper-trading momentum scout.
//!
//! The crate watches one instrument at a time, derives short-horizon features
//! from its tick stream, enters on momentum signals under a risk budget and
//! exits on stop, time cap or take profit. It rotates to a freshly scanned
//! candidate on a fixed schedule and logs every fill and per-instrument
//! summary. Fills are simulated; nothing is ever sent to a venue.

pub mod config;
pub mod error;
pub mod execution;
pub mod features;
pub mod market;
pub mod metrics;
pub mod risk;
pub mod rotation;
pub mod scout;
pub mod sink;
pub mod strategy;
pub mod types;

pub use crate::config::ScoutConfig;
pub use crate::metrics::Scoreboard;
pub use crate::scout::{Scout, TickOutcome};
