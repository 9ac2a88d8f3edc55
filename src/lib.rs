//! Push-triggered device actions on serial background executors
//!
//! Two executors share the same machinery: one runs remote commands
//! (`ring`, `vibrate`, `say <text>`), the other runs device registration
//! against the backend. Each accepts work without blocking, runs one action
//! at a time under a wake-lock and stops itself once idle.

pub mod command;
pub mod config;
pub mod executor;
pub mod prefs;
pub mod push;
pub mod registration;
