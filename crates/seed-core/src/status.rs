//! Ecosystem status: run the pulse over every reality and fold the verdicts.

use crate::config::PulseConfig;
use crate::error::Result;
use crate::pulse::{Activity, CheckLevel, HealthChecker, HealthStatus, HealthVerdict, Signals};
use crate::registry::{Reality, RealityRegistry};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// EcosystemStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct EcosystemStatus {
    pub overall_status: HealthStatus,
    /// One verdict per reality in discovery order; serialized as an object
    /// keyed by reality id.
    #[serde(serialize_with = "verdicts_by_id")]
    pub per_reality: Vec<HealthVerdict>,
    pub total_pending_work: usize,
    pub realities_with_drift: usize,
    pub generated_at: DateTime<Utc>,
}

fn verdicts_by_id<S: Serializer>(
    verdicts: &[HealthVerdict],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(verdicts.len()))?;
    for v in verdicts {
        map.serialize_entry(&v.reality_id, v)?;
    }
    map.end()
}

impl EcosystemStatus {
    pub fn from_verdicts(per_reality: Vec<HealthVerdict>) -> Self {
        let overall_status = HealthStatus::worst(per_reality.iter().map(|v| v.status));
        let total_pending_work = per_reality.iter().map(|v| v.pending_work_count).sum();
        let realities_with_drift = per_reality.iter().filter(|v| v.has_drift()).count();
        Self {
            overall_status,
            per_reality,
            total_pending_work,
            realities_with_drift,
            generated_at: Utc::now(),
        }
    }

    pub fn total_realities(&self) -> usize {
        self.per_reality.len()
    }

    pub fn healthy_count(&self) -> usize {
        self.count_status(HealthStatus::Green)
    }

    pub fn warning_count(&self) -> usize {
        self.count_status(HealthStatus::Yellow)
    }

    pub fn error_count(&self) -> usize {
        self.count_status(HealthStatus::Red)
    }

    fn count_status(&self, status: HealthStatus) -> usize {
        self.per_reality.iter().filter(|v| v.status == status).count()
    }

    pub fn get(&self, reality_id: &str) -> Option<&HealthVerdict> {
        self.per_reality.iter().find(|v| v.reality_id == reality_id)
    }

    pub fn verdicts(&self) -> &[HealthVerdict] {
        &self.per_reality
    }

    pub fn summary(&self) -> StatusSummary {
        let mut s = StatusSummary {
            overall_status: self.overall_status,
            total: self.per_reality.len(),
            total_pending_work: self.total_pending_work,
            realities_with_drift: self.realities_with_drift,
            ..StatusSummary::default()
        };
        for v in &self.per_reality {
            match v.status {
                HealthStatus::Green => s.green += 1,
                HealthStatus::Yellow => s.yellow += 1,
                HealthStatus::Red => s.red += 1,
            }
            match v.activity {
                Activity::Idle => s.idle += 1,
                Activity::Busy => s.busy += 1,
                Activity::Error => s.errored += 1,
            }
            if v.hash_verified {
                s.hash_verified += 1;
            }
        }
        s
    }
}

/// Counts by status and activity across the ecosystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub overall_status: HealthStatus,
    pub total: usize,
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    pub idle: usize,
    pub busy: usize,
    pub errored: usize,
    pub hash_verified: usize,
    pub total_pending_work: usize,
    pub realities_with_drift: usize,
}

impl Default for StatusSummary {
    fn default() -> Self {
        Self {
            overall_status: HealthStatus::Green,
            total: 0,
            green: 0,
            yellow: 0,
            red: 0,
            idle: 0,
            busy: 0,
            errored: 0,
            hash_verified: 0,
            total_pending_work: 0,
            realities_with_drift: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// StatusAggregator
// ---------------------------------------------------------------------------

/// Runs the health checker over a set of realities. Keeps the last verdict
/// per reality in memory so repeated aggregations can skip re-hashing.
#[derive(Debug, Default)]
pub struct StatusAggregator {
    checker: HealthChecker,
    cache: bool,
    timeout: Option<Duration>,
    last: HashMap<String, HealthVerdict>,
    /// Workers that outlived the timeout, keyed by reality id.
    in_flight: HashMap<String, mpsc::Receiver<HealthVerdict>>,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(pulse: &PulseConfig) -> Self {
        Self::new()
            .with_cache(pulse.cache)
            .with_timeout(pulse.timeout())
    }

    /// When enabled, a reality whose last verdict was green and idle is
    /// re-checked at fast level. The checker still re-verifies if the
    /// model file changed.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn last_verdict(&self, reality_id: &str) -> Option<&HealthVerdict> {
        self.last.get(reality_id)
    }

    /// Number of timed-out checks whose worker thread has not yet finished.
    pub fn pending_workers(&mut self) -> usize {
        self.in_flight.retain(|_, rx| matches!(rx.try_recv(), Err(mpsc::TryRecvError::Empty)));
        self.in_flight.len()
    }

    /// Check every reality in order and fold the results. `busy` lists the
    /// reality ids an external tracker reports as running tasks.
    pub fn aggregate(
        &mut self,
        realities: &[Reality],
        level: CheckLevel,
        busy: &[String],
    ) -> EcosystemStatus {
        let verdicts: Vec<HealthVerdict> = realities
            .iter()
            .map(|r| self.check_one(r, level, busy.iter().any(|id| id == &r.id)))
            .collect();

        let status = EcosystemStatus::from_verdicts(verdicts);
        info!(
            realities = status.total_realities(),
            overall = %status.overall_status,
            pending = status.total_pending_work,
            drift = status.realities_with_drift,
            "aggregated"
        );
        status
    }

    /// Check a single reality looked up by id or label.
    pub fn reality_status(
        &mut self,
        registry: &RealityRegistry,
        id_or_label: &str,
        level: CheckLevel,
        busy: &[String],
    ) -> Result<HealthVerdict> {
        let reality = registry.resolve(id_or_label)?;
        let running = busy.iter().any(|id| id == &reality.id);
        Ok(self.check_one(reality, level, running))
    }

    fn check_one(
        &mut self,
        reality: &Reality,
        level: CheckLevel,
        running_tasks: bool,
    ) -> HealthVerdict {
        let previous = self.last.get(&reality.id).cloned();
        let effective = match &previous {
            Some(prev) if self.cache && prev.is_settled() => CheckLevel::Fast,
            _ => level,
        };
        debug!(reality = %reality.id, level = %effective, "checking");

        let verdict = match self.timeout {
            None => self.checker.check(
                reality,
                effective,
                Signals {
                    running_tasks,
                    previous: previous.as_ref(),
                },
            ),
            Some(limit) => {
                self.check_with_timeout(reality, effective, running_tasks, previous, limit)
            }
        };

        self.last.insert(reality.id.clone(), verdict.clone());
        verdict
    }

    /// Run the check on a worker thread. A worker that outlives `limit` is
    /// remembered; until it finishes, later checks of the same reality
    /// report the timeout again instead of starting another worker.
    fn check_with_timeout(
        &mut self,
        reality: &Reality,
        level: CheckLevel,
        running_tasks: bool,
        previous: Option<HealthVerdict>,
        limit: Duration,
    ) -> HealthVerdict {
        if let Some(pending) = self.in_flight.get(&reality.id) {
            match pending.try_recv() {
                Err(mpsc::TryRecvError::Empty) => {
                    warn!(reality = %reality.id, "previous check still running");
                    return HealthVerdict::failed(
                        reality,
                        format!("check timed out after {limit:?}; previous check still running"),
                    );
                }
                // Finished late or died: its result is stale either way.
                Ok(_) | Err(mpsc::TryRecvError::Disconnected) => {
                    self.in_flight.remove(&reality.id);
                }
            }
        }

        let (tx, rx) = mpsc::channel();
        let checker = self.checker;
        let owned = reality.clone();
        std::thread::spawn(move || {
            let verdict = checker.check(
                &owned,
                level,
                Signals {
                    running_tasks,
                    previous: previous.as_ref(),
                },
            );
            // The receiver is gone if the check already timed out.
            let _ = tx.send(verdict);
        });

        match rx.recv_timeout(limit) {
            Ok(verdict) => verdict,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(reality = %reality.id, ?limit, "check timed out");
                self.in_flight.insert(reality.id.clone(), rx);
                HealthVerdict::failed(reality, format!("check timed out after {limit:?}"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!(reality = %reality.id, "check worker exited without a verdict");
                HealthVerdict::failed(reality, "check worker exited without a verdict")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
