//! Hot-swap controller for the reference catalog.
//!
//! # Lifecycle of one refresh
//! ```text
//! Idle → Building → Installed → Retiring → Released
//!          │                       │
//!          └─ fetch/build failed   └─ old generation still pinned by a request
//!             (current unchanged)     (released when the last Arc drops)
//! ```
//!
//! Readers call [`HotSwapController::current`] once per request and keep the
//! returned `Arc` for the whole request. Installs are a single `ArcSwap::swap`,
//! so a reader sees either the old or the new generation and never a mix.
//! The retired generation is tracked through a `Weak` until its last reader
//! finishes.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};

use crate::catalog::snapshot::ReferenceSnapshot;
use crate::catalog::source::{CatalogSource, Fetched};
use crate::catalog::types::{BuildResult, SnapshotBuildError};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Phase of the most recent refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RefreshPhase {
    Idle = 0,
    Building = 1,
    Installed = 2,
    Retiring = 3,
    Released = 4,
}

impl RefreshPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => RefreshPhase::Building,
            2 => RefreshPhase::Installed,
            3 => RefreshPhase::Retiring,
            4 => RefreshPhase::Released,
            _ => RefreshPhase::Idle,
        }
    }
}

/// Passed to `on_installed` hooks after every successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallEvent {
    /// Generation that was current before the install; `None` on first install.
    pub previous: Option<u64>,
    /// Generation that is current now.
    pub current: u64,
    /// Item count of the new generation.
    pub items: usize,
}

/// Result of one successful refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new generation was built and installed.
    Installed(InstallEvent),
    /// The source reported no change; the current generation stays.
    Unchanged { generation: u64 },
}

impl RefreshOutcome {
    pub fn installed(self) -> Option<InstallEvent> {
        match self {
            RefreshOutcome::Installed(event) => Some(event),
            RefreshOutcome::Unchanged { .. } => None,
        }
    }
}

/// Shortest wait before retrying a failed cycle.
const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Used when `now + delay` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or(now + FAR_FUTURE)
}

/// What asked for an out-of-schedule refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The management API.
    Manual,
    /// The catalog file changed on disk.
    SourceChanged,
}

/// Timing for the background refresh loop.
#[derive(Debug, Clone, Copy)]
pub struct RefreshSchedule {
    pub interval: Duration,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
}

type InstallHook = Arc<dyn Fn(&InstallEvent) + Send + Sync>;

/// Owns the current catalog generation.
pub struct HotSwapController {
    current: ArcSwap<ReferenceSnapshot>,
    next_generation: AtomicU64,
    /// Retired generations that may still be pinned by readers.
    retiring: Mutex<Vec<(u64, Weak<ReferenceSnapshot>)>>,
    hooks: RwLock<Vec<InstallHook>>,
    phase: AtomicU8,
    /// Serializes writers. Readers never touch it.
    install_lock: Mutex<()>,
}

impl HotSwapController {
    /// Start with the empty generation-zero placeholder.
    pub fn new() -> Self {
        Self::with_initial(ReferenceSnapshot::empty())
    }

    /// Start with an already built snapshot.
    pub fn with_initial(initial: ReferenceSnapshot) -> Self {
        let next = initial.generation() + 1;
        Self {
            current: ArcSwap::from_pointee(initial),
            next_generation: AtomicU64::new(next),
            retiring: Mutex::new(Vec::new()),
            hooks: RwLock::new(Vec::new()),
            phase: AtomicU8::new(RefreshPhase::Idle as u8),
            install_lock: Mutex::new(()),
        }
    }

    /// The current generation. Hold the returned `Arc` for the whole request.
    pub fn current(&self) -> Arc<ReferenceSnapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    pub fn phase(&self) -> RefreshPhase {
        RefreshPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn set_phase(&self, phase: RefreshPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Reserve the generation number for a snapshot about to be built.
    pub fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a hook run after every successful install.
    pub fn on_installed<F>(&self, hook: F)
    where
        F: Fn(&InstallEvent) + Send + Sync + 'static,
    {
        self.hooks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(hook));
    }

    /// Atomically make `snapshot` current and retire the previous generation.
    ///
    /// A snapshot whose generation is not newer than the current one is
    /// rejected, so concurrent refreshes that finish out of order cannot move
    /// the catalog backwards.
    pub fn install(&self, snapshot: ReferenceSnapshot) -> BuildResult<InstallEvent> {
        let event = {
            let _writer = self.install_lock.lock().unwrap_or_else(|e| e.into_inner());

            let offered = snapshot.generation();
            let current = self.generation();
            if offered <= current {
                return Err(SnapshotBuildError::Stale { offered, current });
            }

            let items = snapshot.len();
            let old = self.current.swap(Arc::new(snapshot));
            self.set_phase(RefreshPhase::Installed);

            let previous = Some(old.generation()).filter(|g| *g != 0);
            self.retire(old);

            InstallEvent {
                previous,
                current: offered,
                items,
            }
        };

        tracing::info!(
            generation = event.current,
            previous = ?event.previous,
            items = event.items,
            "Catalog generation installed"
        );

        // Clone out so hooks run without holding the lock.
        let hooks: Vec<InstallHook> = self
            .hooks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for hook in hooks {
            hook(&event);
        }

        Ok(event)
    }

    fn retire(&self, old: Arc<ReferenceSnapshot>) {
        let generation = old.generation();
        let weak = Arc::downgrade(&old);
        self.set_phase(RefreshPhase::Retiring);
        self.retiring
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((generation, weak));
        // Our strong reference goes away here; in-flight readers keep theirs.
        drop(old);
        self.reap();
    }

    /// Forget retired generations that no reader holds any more.
    pub fn reap(&self) {
        let mut retiring = self.retiring.lock().unwrap_or_else(|e| e.into_inner());
        retiring.retain(|(generation, weak)| {
            let alive = weak.strong_count() > 0;
            if !alive {
                tracing::debug!(generation = *generation, "Retired catalog generation released");
            }
            alive
        });
        if retiring.is_empty() && self.phase() == RefreshPhase::Retiring {
            self.set_phase(RefreshPhase::Released);
        }
    }

    /// Retired generations still pinned by at least one reader.
    pub fn retiring(&self) -> Vec<u64> {
        self.reap();
        self.retiring
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(generation, _)| *generation)
            .collect()
    }

    /// Run one full cycle: fetch, build off to the side, install.
    ///
    /// On failure nothing is installed and the current generation stays.
    /// When the source reports no change and a catalog is already installed,
    /// nothing is built.
    pub async fn refresh(&self, source: &dyn CatalogSource) -> BuildResult<RefreshOutcome> {
        self.set_phase(RefreshPhase::Building);
        tracing::debug!(source = %source.describe(), "Building catalog snapshot");

        let result = match source.fetch().await {
            Ok(Fetched::Unchanged(_)) if self.generation() > 0 => Ok(RefreshOutcome::Unchanged {
                generation: self.generation(),
            }),
            Ok(fetched) => {
                let generation = self.next_generation();
                ReferenceSnapshot::build(generation, fetched.into_items())
                    .and_then(|snapshot| self.install(snapshot))
                    .map(RefreshOutcome::Installed)
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(RefreshOutcome::Installed(_)) => metrics::record_catalog_refresh("installed"),
            Ok(RefreshOutcome::Unchanged { generation }) => {
                self.set_phase(RefreshPhase::Idle);
                metrics::record_catalog_refresh("unchanged");
                tracing::debug!(generation = *generation, "Catalog unchanged, keeping current generation");
            }
            Err(e) => {
                self.set_phase(RefreshPhase::Idle);
                metrics::record_catalog_refresh("failed");
                tracing::warn!(
                    source = %source.describe(),
                    error = %e,
                    generation = self.generation(),
                    "Catalog refresh failed, keeping current generation"
                );
            }
        }
        result
    }

    /// Background refresh loop.
    ///
    /// Refreshes on the schedule, on external triggers, and immediately at
    /// start when nothing has been installed yet. Triggers queued while the
    /// loop was waiting are served by a single cycle. Failed cycles are
    /// retried with exponential backoff, never later than the regular
    /// interval and never sooner than `MIN_RETRY_DELAY`.
    pub async fn run(
        self: Arc<Self>,
        source: Arc<dyn CatalogSource>,
        schedule: RefreshSchedule,
        mut triggers: mpsc::UnboundedReceiver<RefreshTrigger>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(
            source = %source.describe(),
            interval_secs = schedule.interval.as_secs(),
            "Catalog refresher starting"
        );

        let mut failures: u32 = 0;
        let mut triggers_open = true;
        let mut deadline = if self.generation() == 0 {
            Instant::now()
        } else {
            deadline_after(schedule.interval)
        };

        loop {
            tokio::select! {
                _ = time::sleep_until(deadline) => {}
                trigger = triggers.recv(), if triggers_open => {
                    match trigger {
                        Some(trigger) => tracing::info!(?trigger, "Catalog refresh requested"),
                        None => {
                            triggers_open = false;
                            continue;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Catalog refresher received shutdown signal, exiting loop");
                    break;
                }
            }

            if triggers_open {
                let mut coalesced = 0usize;
                loop {
                    match triggers.try_recv() {
                        Ok(_) => coalesced += 1,
                        Err(mpsc::error::TryRecvError::Empty) => break,
                        Err(mpsc::error::TryRecvError::Disconnected) => {
                            triggers_open = false;
                            break;
                        }
                    }
                }
                if coalesced > 0 {
                    tracing::debug!(coalesced, "Pending refresh triggers folded into this cycle");
                }
            }

            // Abandon an in-progress cycle on shutdown; nothing partial is installed.
            let outcome = tokio::select! {
                outcome = self.refresh(source.as_ref()) => outcome,
                _ = shutdown.recv() => {
                    tracing::info!("Catalog refresh abandoned for shutdown");
                    break;
                }
            };

            let delay = match outcome {
                Ok(_) => {
                    failures = 0;
                    schedule.interval
                }
                Err(_) => {
                    failures = failures.saturating_add(1);
                    calculate_backoff(failures, schedule.retry_base_ms, schedule.retry_max_ms)
                        .min(schedule.interval)
                        .max(MIN_RETRY_DELAY)
                }
            };
            deadline = deadline_after(delay);
            self.reap();
        }
    }
}

impl Default for HotSwapController {
    fn default() -> Self {
        Self::new()
    }
}
