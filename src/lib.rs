//! Appraisal server library.

// Core subsystems
pub mod catalog;
pub mod classify;
pub mod config;
pub mod store;

// Serving
pub mod admin;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use catalog::{HotSwapController, ReferenceSnapshot};
pub use classify::{DispatchResult, Dispatcher};
pub use config::AppConfig;
pub use lifecycle::{run_service, Shutdown};
