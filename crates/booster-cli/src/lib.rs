//! Booster CLI
//!
//! Configuration and session handling behind the `booster` binary.

pub mod config;
pub mod session;

pub use config::Config;
pub use session::BoostSession;
