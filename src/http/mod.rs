//! Public HTTP API.
//!
//! # Data Flow
//! ```text
//! plain / encrypted listener
//!     → server.rs (Axum router, middleware)
//!     → request.rs (request ID, raw or JSON body)
//!     → appraisal.rs (classify, store, respond)
//! ```

pub mod appraisal;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{build_public_router, AppState};
