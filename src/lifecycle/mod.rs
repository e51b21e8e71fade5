//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     stores → catalog refresher (+ watcher) → listeners, each recorded in the ledger
//!
//! Shutdown (signals.rs → startup.rs → listeners.rs):
//!     SIGTERM/SIGINT → ledger releases newest first
//!     → listeners stop accepting, drain concurrently within the grace period
//!     → refresher stops → stores flush
//! ```
//!
//! # Design Decisions
//! - Ordered startup: stores first, then fetchers, then listeners
//! - Ordered shutdown: strict reverse of startup, also when startup fails
//! - Shutdown has a bound: connections still open after the grace period are force-closed

pub mod listeners;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use listeners::{
    ForcedClose, ListenerDescriptor, ListenerInfo, ListenerSet, Routers, ShutdownReport,
    ShutdownTimeout,
};
pub use shutdown::Shutdown;
pub use startup::{run_service, Release, ReleaseError, ResourceLedger, StartupError};
