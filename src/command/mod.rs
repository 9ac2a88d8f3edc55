//! Push command execution on the device
//!
//! This module handles:
//! - Parsing raw push commands
//! - Dispatching to the ring, vibrate and say handlers
//! - Naming failures for the user

pub mod device;
mod executor;
pub mod handlers;
pub mod simulated;

#[cfg(test)]
pub(crate) mod fake;

pub use executor::CommandHandler;
