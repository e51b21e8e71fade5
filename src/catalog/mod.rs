//! Reference catalog subsystem.
//!
//! # Data Flow
//! ```text
//! source.rs (file / HTTP supplier)
//!     → snapshot.rs (build immutable ReferenceSnapshot, off to the side)
//!     → swap.rs (atomic install, retire previous generation)
//!     → classify dispatcher reads current() once per request
//!
//! Triggers:
//!     interval tick / watcher.rs (file changed) / management API
//!     → RefreshTrigger → swap.rs refresh loop
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable once published
//! - Readers never lock; installs are a single pointer swap
//! - A failed build leaves the current generation in place
//! - Retired generations live exactly as long as their last reader

pub mod snapshot;
pub mod source;
pub mod swap;
pub mod types;
pub mod watcher;

pub use snapshot::ReferenceSnapshot;
pub use source::{source_from_config, CatalogSource, Fetched, FileCatalogSource, HttpCatalogSource};
pub use swap::{
    HotSwapController, InstallEvent, RefreshOutcome, RefreshPhase, RefreshSchedule, RefreshTrigger,
};
pub use types::{ItemMeta, SnapshotBuildError, TypeId};
pub use watcher::SourceWatcher;
