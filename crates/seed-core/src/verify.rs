//! Source hash verification: detects drift between what a model declares
//! about a file and what is actually on disk.

use crate::error::{Result, SeedError};
use crate::model::{ModelStore, SourceReference};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Component, Path};
use tracing::debug;

// ---------------------------------------------------------------------------
// HashAlgorithm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
}

impl HashAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Resolve the algorithm a source reference declares, defaulting to
    /// SHA-256 when it declares none.
    pub fn for_source(source: &SourceReference) -> Result<Self> {
        match &source.algorithm {
            Some(name) => name.parse(),
            None => Ok(HashAlgorithm::default()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            _ => Err(SeedError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Stream the file at `path` through `algorithm` and return lowercase hex.
pub fn file_digest(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut file = std::fs::File::open(path)?;
            let mut hasher = Sha256::new();
            std::io::copy(&mut file, &mut hasher)?;
            Ok(format!("{:x}", hasher.finalize()))
        }
    }
}

// ---------------------------------------------------------------------------
// HashCheck
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Ok,
    Mismatch,
    Missing,
    Error,
}

impl CheckOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckOutcome::Ok => "ok",
            CheckOutcome::Mismatch => "mismatch",
            CheckOutcome::Missing => "missing",
            CheckOutcome::Error => "error",
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCheck {
    pub node_id: String,
    pub file: String,
    pub expected_hash: String,
    pub actual_hash: Option<String>,
    pub outcome: CheckOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HashCheck {
    pub fn is_ok(&self) -> bool {
        self.outcome == CheckOutcome::Ok
    }
}

/// Verify one source reference against the file under `root`.
pub fn verify_source(root: &Path, node_id: &str, source: &SourceReference) -> HashCheck {
    let mut check = HashCheck {
        node_id: node_id.to_string(),
        file: source.file.clone(),
        expected_hash: source.declared_hash.clone(),
        actual_hash: None,
        outcome: CheckOutcome::Error,
        error: None,
    };

    let algorithm = match HashAlgorithm::for_source(source) {
        Ok(a) => a,
        Err(e) => {
            check.error = Some(e.to_string());
            return check;
        }
    };

    if escapes_root(&source.file) {
        check.error = Some(format!(
            "source path '{}' must be relative to the reality root",
            source.file
        ));
        return check;
    }

    let full = root.join(&source.file);
    match file_digest(&full, algorithm) {
        Ok(actual) => {
            check.outcome = if actual.eq_ignore_ascii_case(source.declared_hash.trim()) {
                CheckOutcome::Ok
            } else {
                CheckOutcome::Mismatch
            };
            check.actual_hash = Some(actual);
        }
        Err(SeedError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            check.outcome = CheckOutcome::Missing;
            check.error = Some(format!("file not found: {}", full.display()));
        }
        Err(e) => {
            check.error = Some(format!("{}: {e}", full.display()));
        }
    }
    debug!(node = node_id, file = %source.file, outcome = %check.outcome, "hash check");
    check
}

/// Absolute paths and `..` components would reach outside the reality.
fn escapes_root(file: &str) -> bool {
    Path::new(file)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

/// One check per source reference in `store`, in file order.
pub fn verify_model(store: &ModelStore, root: &Path) -> Vec<HashCheck> {
    store
        .source_references()
        .map(|(node, source)| verify_source(root, &node.id, source))
        .collect()
}

/// Accept drift: set every mismatched declared hash to the digest actually on
/// disk. Returns the checks that were rewritten. Missing or unreadable files
/// are left alone. The caller decides whether to `save` the store.
///
/// Nodes are addressed by position, so duplicate ids are each rewritten on
/// their own.
pub fn rehash_model(store: &mut ModelStore, root: &Path) -> Result<Vec<HashCheck>> {
    let drifted: Vec<(usize, HashCheck)> = store
        .nodes()
        .iter()
        .enumerate()
        .filter_map(|(i, node)| {
            node.source().map(|source| (i, verify_source(root, &node.id, source)))
        })
        .filter(|(_, c)| c.outcome == CheckOutcome::Mismatch)
        .collect();

    let mut rewritten = Vec::with_capacity(drifted.len());
    for (i, check) in drifted {
        if let Some(actual) = &check.actual_hash {
            store.set_source_hash_at(i, actual)?;
        }
        rewritten.push(check);
    }
    Ok(rewritten)
}

// ---------------------------------------------------------------------------
// HashTally
// ---------------------------------------------------------------------------

/// Check outcomes folded into the three counts a verdict reports.
///
/// An `error` outcome (unreadable file, unsupported algorithm) counts as
/// missing: the artifact could not be confirmed to exist as declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashTally {
    pub verified: usize,
    pub drifted: usize,
    pub missing: usize,
}

impl HashTally {
    pub fn from_checks(checks: &[HashCheck]) -> Self {
        let mut tally = HashTally::default();
        for c in checks {
            match c.outcome {
                CheckOutcome::Ok => tally.verified += 1,
                CheckOutcome::Mismatch => tally.drifted += 1,
                CheckOutcome::Missing | CheckOutcome::Error => tally.missing += 1,
            }
        }
        tally
    }

    pub fn is_clean(&self) -> bool {
        self.drifted == 0 && self.missing == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
