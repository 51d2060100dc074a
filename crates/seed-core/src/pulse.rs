//! Pulse: one point-in-time health verdict for one reality.

use crate::error::SeedError;
use crate::model::{ModelStore, WorkStatus};
use crate::registry::Reality;
use crate::verify::{self, HashTally};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// CheckLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckLevel {
    /// Trust the previous verdict's hash counts while the model file is
    /// byte-identical; only work items are re-read.
    Fast,
    /// Hash every declared source file.
    #[default]
    Verify,
}

impl CheckLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckLevel::Fast => "fast",
            CheckLevel::Verify => "verify",
        }
    }
}

impl fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckLevel {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(CheckLevel::Fast),
            "verify" => Ok(CheckLevel::Verify),
            _ => Err(SeedError::InvalidCheckLevel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// HealthStatus / Activity
// ---------------------------------------------------------------------------

/// Ordered so that `max` picks the worst: green < yellow < red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Green => "green",
            HealthStatus::Yellow => "yellow",
            HealthStatus::Red => "red",
        }
    }

    /// Strict precedence fold; an empty set is green.
    pub fn worst<I: IntoIterator<Item = HealthStatus>>(statuses: I) -> HealthStatus {
        statuses.into_iter().max().unwrap_or(HealthStatus::Green)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Idle,
    Busy,
    Error,
}

impl Activity {
    pub fn as_str(self) -> &'static str {
        match self {
            Activity::Idle => "idle",
            Activity::Busy => "busy",
            Activity::Error => "error",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First match wins: error work, then pending work or an externally
/// reported running task, then idle.
pub fn derive_activity(pending: usize, errors: usize, running_tasks: bool) -> Activity {
    if errors > 0 {
        Activity::Error
    } else if pending > 0 || running_tasks {
        Activity::Busy
    } else {
        Activity::Idle
    }
}

/// First match wins: a missing artifact is red, drift alone is yellow,
/// outstanding work (errored or pending) is yellow, otherwise green.
pub fn derive_status(tally: &HashTally, pending: usize, errors: usize) -> HealthStatus {
    if tally.missing > 0 {
        HealthStatus::Red
    } else if tally.drifted > 0 || errors > 0 || pending > 0 {
        HealthStatus::Yellow
    } else {
        HealthStatus::Green
    }
}

// ---------------------------------------------------------------------------
// HealthVerdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthVerdict {
    pub reality_id: String,
    pub label: String,
    pub status: HealthStatus,
    pub activity: Activity,
    pub hash_verified: bool,
    pub verified_count: usize,
    pub drifted_count: usize,
    pub missing_count: usize,
    pub pending_work_count: usize,
    pub error_work_count: usize,
    pub checked_at: DateTime<Utc>,
    /// SHA-256 of the model file this verdict was computed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthVerdict {
    /// A verdict for a reality that could not be checked at all.
    pub fn failed(reality: &Reality, message: impl Into<String>) -> Self {
        Self {
            reality_id: reality.id.clone(),
            label: reality.label.clone(),
            status: HealthStatus::Red,
            activity: Activity::Error,
            hash_verified: false,
            verified_count: 0,
            drifted_count: 0,
            missing_count: 0,
            pending_work_count: 0,
            error_work_count: 0,
            checked_at: Utc::now(),
            model_hash: None,
            error: Some(message.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Green
    }

    pub fn has_issues(&self) -> bool {
        self.status != HealthStatus::Green
    }

    pub fn has_drift(&self) -> bool {
        self.drifted_count > 0 || self.missing_count > 0
    }

    pub fn has_work(&self) -> bool {
        self.pending_work_count > 0 || self.activity != Activity::Idle
    }

    /// Green and idle: nothing to report, safe to re-check cheaply.
    pub fn is_settled(&self) -> bool {
        self.status == HealthStatus::Green && self.activity == Activity::Idle
    }

    fn hash_tally(&self) -> HashTally {
        HashTally {
            verified: self.verified_count,
            drifted: self.drifted_count,
            missing: self.missing_count,
        }
    }

    /// Equal in every field except `checked_at`.
    pub fn same_outcome(&self, other: &HealthVerdict) -> bool {
        Self {
            checked_at: other.checked_at,
            ..self.clone()
        } == *other
    }
}

// ---------------------------------------------------------------------------
// HealthChecker
// ---------------------------------------------------------------------------

/// Optional inputs the checker does not produce itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Signals<'a> {
    /// An external process tracker reports tasks running for this reality.
    pub running_tasks: bool,
    /// The last verdict for this reality, consulted at `fast` level.
    pub previous: Option<&'a HealthVerdict>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthChecker;

impl HealthChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check one reality. Never fails: a reality that cannot be loaded gets
    /// a red verdict with `error` set.
    pub fn check(
        &self,
        reality: &Reality,
        level: CheckLevel,
        signals: Signals<'_>,
    ) -> HealthVerdict {
        let root = reality.root_path.as_deref();
        let (Some(root), Some(model_path)) = (root, reality.full_model_path()) else {
            let err = SeedError::NoRootPath(reality.id.clone());
            warn!(reality = %reality.id, "{err}");
            return HealthVerdict::failed(reality, err.to_string());
        };

        match ModelStore::load(&model_path) {
            Ok(store) => self.check_store(reality, &store, root, level, signals),
            Err(e) => {
                warn!(reality = %reality.id, error = %e, "model could not be loaded");
                HealthVerdict::failed(reality, e.to_string())
            }
        }
    }

    /// Check a reality whose model is already loaded; source files resolve
    /// against `root`.
    pub fn check_store(
        &self,
        reality: &Reality,
        store: &ModelStore,
        root: &Path,
        level: CheckLevel,
        signals: Signals<'_>,
    ) -> HealthVerdict {
        let model_hash = store.content_hash();

        let reusable = signals.previous.filter(|prev| {
            prev.reality_id == reality.id
                && prev.error.is_none()
                && prev.model_hash.as_deref() == Some(model_hash)
        });
        let tally = match (level, reusable) {
            (CheckLevel::Fast, Some(prev)) => prev.hash_tally(),
            (CheckLevel::Fast, None) => {
                debug!(reality = %reality.id, "no reusable verdict, verifying hashes");
                HashTally::from_checks(&verify::verify_model(store, root))
            }
            (CheckLevel::Verify, _) => HashTally::from_checks(&verify::verify_model(store, root)),
        };

        let mut pending = 0;
        let mut errors = 0;
        for item in store.work_items() {
            match item.status {
                WorkStatus::Pending => pending += 1,
                WorkStatus::Error => errors += 1,
                WorkStatus::Completed | WorkStatus::Other(_) => {}
            }
        }

        if tally.drifted > 0 {
            warn!(reality = %reality.id, drifted = tally.drifted, "drift detected");
        }
        if tally.missing > 0 {
            warn!(reality = %reality.id, missing = tally.missing, "declared sources missing");
        }

        let verdict = HealthVerdict {
            reality_id: reality.id.clone(),
            label: reality.label.clone(),
            status: derive_status(&tally, pending, errors),
            activity: derive_activity(pending, errors, signals.running_tasks),
            hash_verified: tally.is_clean(),
            verified_count: tally.verified,
            drifted_count: tally.drifted,
            missing_count: tally.missing,
            pending_work_count: pending,
            error_work_count: errors,
            checked_at: Utc::now(),
            model_hash: Some(model_hash.to_string()),
            error: None,
        };
        debug!(
            reality = %reality.id,
            level = %level,
            status = %verdict.status,
            activity = %verdict.activity,
            "pulse"
        );
        verdict
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn verify(reality: &Reality) -> HealthVerdict {
        HealthChecker::new().check(reality, CheckLevel::Verify, Signals::default())
    }

    #[test]
    fn empty_reality_is_green_idle() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(dir.path(), "empty", json!([]));
        let v = verify(&r);
        assert_eq!(v.status, HealthStatus::Green);
        assert_eq!(v.activity, Activity::Idle);
        assert!(v.hash_verified);
        assert!(v.error.is_none());
        assert!(v.is_settled());
    }

    #[test]
    fn matching_sources_are_verified() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "clean",
            json!([
                source_node("a", "src/a.txt", HELLO_SHA256),
                source_node("b", "src/b.txt", HELLO_SHA256)
            ]),
        );
        write_source_file(&r, "src/a.txt", "hello");
        write_source_file(&r, "src/b.txt", "hello");

        let v = verify(&r);
        assert!(v.hash_verified);
        assert_eq!(v.verified_count, 2);
        assert_eq!(v.drifted_count, 0);
        assert_eq!(v.missing_count, 0);
        assert_eq!(v.status, HealthStatus::Green);
    }

    #[test]
    fn scenario_a_pending_work_without_drift() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "a",
            json!([
                source_node("lib", "lib.txt", HELLO_SHA256),
                todo_node("t1", "pending")
            ]),
        );
        write_source_file(&r, "lib.txt", "hello");

        let v = verify(&r);
        assert_eq!(v.status, HealthStatus::Yellow);
        assert_eq!(v.activity, Activity::Busy);
        assert_eq!(v.pending_work_count, 1);
        assert_eq!(v.drifted_count, 0);
        assert_eq!(v.missing_count, 0);
        assert!(v.hash_verified);
    }

    #[test]
    fn scenario_b_missing_source_is_red() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "b",
            json!([source_node("lib", "nowhere.txt", HELLO_SHA256)]),
        );
        let v = verify(&r);
        assert_eq!(v.status, HealthStatus::Red);
        assert_eq!(v.missing_count, 1);
        assert!(!v.hash_verified);
        assert!(v.error.is_none());
    }

    #[test]
    fn deleting_a_file_adds_exactly_one_missing() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "del",
            json!([
                source_node("a", "a.txt", HELLO_SHA256),
                source_node("b", "b.txt", HELLO_SHA256)
            ]),
        );
        write_source_file(&r, "a.txt", "hello");
        write_source_file(&r, "b.txt", "drifted");
        let before = verify(&r);
        assert_eq!(before.status, HealthStatus::Yellow);

        std::fs::remove_file(r.root_path.as_ref().unwrap().join("a.txt")).unwrap();
        let after = verify(&r);
        assert_eq!(after.missing_count, before.missing_count + 1);
        // Missing outranks drift.
        assert_eq!(after.status, HealthStatus::Red);
        assert_eq!(after.drifted_count, 1);
    }

    #[test]
    fn unreadable_source_counts_as_missing() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "unreadable",
            json!([
                source_node("a", "a.txt", HELLO_SHA256),
                source_node("dir", "assets", HELLO_SHA256)
            ]),
        );
        write_source_file(&r, "a.txt", "hello");
        // A directory where a file is declared: present, but not readable as one.
        std::fs::create_dir_all(r.root_path.as_ref().unwrap().join("assets")).unwrap();

        let v = verify(&r);
        assert_eq!(v.verified_count, 1);
        assert_eq!(v.missing_count, 1);
        assert_eq!(v.drifted_count, 0);
        assert_eq!(v.status, HealthStatus::Red);
        assert!(!v.hash_verified);
        assert!(v.error.is_none());
    }

    #[test]
    fn changing_content_adds_exactly_one_drift() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "drift",
            json!([source_node("a", "a.txt", HELLO_SHA256)]),
        );
        write_source_file(&r, "a.txt", "hello");
        let before = verify(&r);

        write_source_file(&r, "a.txt", "hello, world");
        let after = verify(&r);
        assert_eq!(after.drifted_count, before.drifted_count + 1);
        assert_eq!(after.status, HealthStatus::Yellow);
        assert!(!after.hash_verified);
    }

    #[test]
    fn error_work_sets_error_activity_and_yellow() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "err",
            json!([
                todo_node("t1", "error"),
                todo_node("t2", "pending"),
                todo_node("t3", "completed")
            ]),
        );
        let v = verify(&r);
        assert_eq!(v.activity, Activity::Error);
        assert_eq!(v.status, HealthStatus::Yellow);
        assert_eq!(v.error_work_count, 1);
        assert_eq!(v.pending_work_count, 1);
    }

    #[test]
    fn running_tasks_force_busy() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(dir.path(), "run", json!([]));
        let signals = Signals {
            running_tasks: true,
            previous: None,
        };
        let v = HealthChecker::new().check(&r, CheckLevel::Verify, signals);
        assert_eq!(v.activity, Activity::Busy);
        assert_eq!(v.status, HealthStatus::Green);
    }

    #[test]
    fn unloadable_models_become_error_verdicts() {
        let dir = TempDir::new().unwrap();

        let missing = Reality::new("gone", "Gone", dir.path().join("gone"));
        let v = verify(&missing);
        assert_eq!(v.status, HealthStatus::Red);
        assert_eq!(v.activity, Activity::Error);
        assert!(v.error.as_deref().unwrap().contains("model not found"));

        let r = reality_with_nodes(dir.path(), "bad", json!([]));
        std::fs::write(r.full_model_path().unwrap(), "{ not json").unwrap();
        let v = verify(&r);
        assert_eq!(v.status, HealthStatus::Red);
        assert!(v.error.as_deref().unwrap().contains("invalid JSON"));
        assert_eq!(v.verified_count + v.drifted_count + v.missing_count, 0);
        assert_eq!(v.pending_work_count + v.error_work_count, 0);

        let mut rootless = Reality::new("nowhere", "Nowhere", "/");
        rootless.root_path = None;
        let v = verify(&rootless);
        assert_eq!(v.status, HealthStatus::Red);
        assert!(v.error.as_deref().unwrap().contains("no root path"));
    }

    #[test]
    fn repeated_checks_agree_except_timestamp() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "idem",
            json!([
                source_node("a", "a.txt", HELLO_SHA256),
                todo_node("t", "pending")
            ]),
        );
        write_source_file(&r, "a.txt", "hello");
        let first = verify(&r);
        let second = verify(&r);
        assert!(first.same_outcome(&second));
        assert!(second.checked_at >= first.checked_at);
    }

    #[test]
    fn fast_level_trusts_previous_hash_state() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "fast",
            json!([source_node("a", "a.txt", HELLO_SHA256)]),
        );
        write_source_file(&r, "a.txt", "hello");
        let previous = verify(&r);

        std::fs::remove_file(r.root_path.as_ref().unwrap().join("a.txt")).unwrap();
        let checker = HealthChecker::new();
        let fast = checker.check(
            &r,
            CheckLevel::Fast,
            Signals {
                running_tasks: false,
                previous: Some(&previous),
            },
        );
        assert_eq!(fast.verified_count, 1);
        assert_eq!(fast.missing_count, 0);
        assert_eq!(fast.status, HealthStatus::Green);

        let full = verify(&r);
        assert_eq!(full.missing_count, 1);
    }

    #[test]
    fn fast_level_reverifies_when_model_changes() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "fast2",
            json!([source_node("a", "a.txt", HELLO_SHA256)]),
        );
        write_source_file(&r, "a.txt", "hello");
        let previous = verify(&r);

        std::fs::remove_file(r.root_path.as_ref().unwrap().join("a.txt")).unwrap();
        let model = r.full_model_path().unwrap();
        let body = json!({"nodes": [
            source_node("a", "a.txt", HELLO_SHA256),
            todo_node("t", "completed")
        ]});
        std::fs::write(&model, serde_json::to_vec(&body).unwrap()).unwrap();

        let fast = HealthChecker::new().check(
            &r,
            CheckLevel::Fast,
            Signals {
                running_tasks: false,
                previous: Some(&previous),
            },
        );
        assert_eq!(fast.missing_count, 1);
        assert_ne!(fast.model_hash, previous.model_hash);
    }

    #[test]
    fn fast_level_without_previous_verifies() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(
            dir.path(),
            "fast3",
            json!([source_node("a", "a.txt", "deadbeef")]),
        );
        write_source_file(&r, "a.txt", "hello");
        let v = HealthChecker::new().check(&r, CheckLevel::Fast, Signals::default());
        assert_eq!(v.drifted_count, 1);
    }

    #[test]
    fn verdict_serializes_with_stable_names() {
        let dir = TempDir::new().unwrap();
        let r = reality_with_nodes(dir.path(), "json", json!([]));
        let value = serde_json::to_value(verify(&r)).unwrap();
        assert_eq!(value["reality_id"], "json");
        assert_eq!(value["status"], "green");
        assert_eq!(value["activity"], "idle");
        assert_eq!(value["hash_verified"], true);
        assert!(value.get("error").is_none());
        assert!(value["checked_at"].is_string());
    }

    #[test]
    fn check_level_parses() {
        assert_eq!("fast".parse::<CheckLevel>().unwrap(), CheckLevel::Fast);
        assert_eq!("verify".parse::<CheckLevel>().unwrap(), CheckLevel::Verify);
        assert!(matches!(
            "deep".parse::<CheckLevel>(),
            Err(SeedError::InvalidCheckLevel(_))
        ));
    }

    #[test]
    fn worst_status_precedence() {
        use HealthStatus::*;
        assert_eq!(HealthStatus::worst([]), Green);
        assert_eq!(HealthStatus::worst([Green, Green]), Green);
        assert_eq!(HealthStatus::worst([Green, Yellow, Green]), Yellow);
        assert_eq!(HealthStatus::worst([Yellow, Red, Green]), Red);
    }
}
