//! # Tablebook SDK
//!
//! Booking orchestrator and the HTTP client for the booking authority.
//!
//! ```no_run
//! use tablebook_sdk::prelude::*;
//!
//! # async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = BookingOrchestrator::connect(&ClientConfig::from_env()?)?;
//! let outcome = orchestrator.load_tables().await;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```

pub mod authority;
pub mod client;
pub mod config;
pub mod orchestrator;
pub mod tracker;

pub use authority::BookingAuthority;
pub use client::{HttpAuthority, BOOKING_FAILED};
pub use config::{ClientConfig, ConfigError};
pub use orchestrator::BookingOrchestrator;
pub use tracker::{InFlight, OperationTracker};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::authority::BookingAuthority;
    pub use crate::client::HttpAuthority;
    pub use crate::config::{ClientConfig, ConfigError};
    pub use crate::orchestrator::BookingOrchestrator;
    pub use tablebook_core::prelude::*;
    pub use tablebook_state::{CacheReader, SliceFilter, SliceKind};
}
