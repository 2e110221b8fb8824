//! Sequential execution of a shutdown plan
//!
//! Guests are handled strictly one at a time in plan order. Each guest moves
//! from pending to one terminal outcome:
//!
//! ```text
//! Pending ──status──▶ not running ─────────────▶ Skipped
//!    │                running ──dispatch──▶ Dispatched
//!    └──── any error ──────────────────────────▶ Failed
//! ```
//!
//! A failed guest never prevents the remaining guests from being processed.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Instrument};

use crate::backend::GuestBackend;
use crate::config::ShutdownConfig;
use crate::error::{PveoffError, PveoffResult};
use crate::observability::{guest_span, record_duration};
use crate::plan::ShutdownPlan;
use crate::types::{GuestDescriptor, GuestKind, RunState, ShutdownMethod, ShutdownRequest};

/// Terminal state of one guest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The power-off request returned successfully
    Dispatched { elapsed: Duration },
    /// The guest was not running when checked
    Skipped { state: RunState },
    /// The status query or the power-off request failed
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub vmid: u32,
    pub kind: GuestKind,
    pub method: ShutdownMethod,
    pub outcome: ShutdownOutcome,
}

/// Per-guest outcomes of a run, in plan order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    entries: Vec<ReportEntry>,
}

impl ShutdownReport {
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn dispatched_count(&self) -> usize {
        self.count(|o| matches!(o, ShutdownOutcome::Dispatched { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ShutdownOutcome::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ShutdownOutcome::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, ShutdownOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ShutdownOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}

/// Walks a [`ShutdownPlan`] against a backend
pub struct ShutdownExecutor {
    backend: Arc<dyn GuestBackend>,
    node: String,
    config: ShutdownConfig,
}

impl ShutdownExecutor {
    pub fn new(backend: Arc<dyn GuestBackend>, node: impl Into<String>, config: ShutdownConfig) -> Self {
        Self {
            backend,
            node: node.into(),
            config,
        }
    }

    /// Power off every guest in `plan`, one after another.
    ///
    /// Never fails as a whole; per-guest failures are recorded in the report.
    pub async fn run(&self, plan: &ShutdownPlan) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        for guest in plan {
            let span = guest_span(guest.kind, guest.vmid, guest.method);
            let outcome = match self.execute(guest).instrument(span).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Off error for {}: {}, skipped", guest, e);
                    ShutdownOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            report.entries.push(ReportEntry {
                vmid: guest.vmid,
                kind: guest.kind,
                method: guest.method,
                outcome,
            });
        }

        info!(
            dispatched = report.dispatched_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "Shutdown run complete"
        );
        if report.failed_count() > 0 {
            let failed: Vec<String> = report
                .failures()
                .map(|e| format!("{} {}", e.kind, e.vmid))
                .collect();
            warn!(
                "{} guest(s) could not be powered off: {}",
                failed.len(),
                failed.join(", ")
            );
        }

        report
    }

    async fn execute(&self, guest: &GuestDescriptor) -> PveoffResult<ShutdownOutcome> {
        let state = self
            .backend
            .guest_status(&self.node, guest.kind, guest.vmid)
            .await?;

        if !state.is_running() {
            info!("{} is not running ({}), skipped", guest, state);
            return Ok(ShutdownOutcome::Skipped { state });
        }

        let start = Instant::now();
        self.dispatch(guest).await?;
        record_duration(start);

        let elapsed = start.elapsed();
        info!(
            "{} {}: done, process time: {}s",
            guest.method,
            guest,
            elapsed.as_secs()
        );
        Ok(ShutdownOutcome::Dispatched { elapsed })
    }

    async fn dispatch(&self, guest: &GuestDescriptor) -> PveoffResult<()> {
        match guest.method {
            ShutdownMethod::Shutdown => {
                let request = ShutdownRequest {
                    timeout_secs: guest.timeout_secs,
                    force_stop: self.config.must_succeed,
                };
                info!(
                    timeout_secs = request.timeout_secs.get(),
                    force_stop = request.force_stop,
                    "Shutting down {}",
                    guest
                );
                self.backend
                    .shutdown(&self.node, guest.kind, guest.vmid, request)
                    .await
            }
            ShutdownMethod::Stop => {
                info!("Stopping {}", guest);
                self.backend.stop(&self.node, guest.kind, guest.vmid).await
            }
            ShutdownMethod::Suspend => {
                if guest.kind != GuestKind::Qemu {
                    return Err(PveoffError::UnsupportedOperation {
                        operation: "suspend".to_string(),
                        kind: guest.kind,
                    });
                }
                info!("Suspending {} to disk", guest);
                self.backend.suspend_to_disk(&self.node, guest.vmid).await
            }
        }
    }
}
