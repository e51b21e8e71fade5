//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → listener.rs (bind socket, report bind errors)
//!     → tls.rs (encrypted listeners: SNI allow-list, on-demand certificates)
//!     → lifecycle::listeners (serve with axum-server, drain on shutdown)
//! ```
//!
//! # Design Decisions
//! - Sockets are bound eagerly so bind errors surface at startup
//! - TLS is optional and handled transparently by axum-server

pub mod listener;
pub mod tls;

pub use listener::{bind, ListenerError};
pub use tls::{server_config, OnDemandCertResolver, TlsError};
