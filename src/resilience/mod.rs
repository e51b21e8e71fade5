//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Catalog refresh failed:
//!     → backoff.rs (exponential delay with jitter, capped)
//!     → refresh loop retries no later than its regular interval
//! ```

pub mod backoff;
