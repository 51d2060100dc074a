use crate::error::{Result, SeedError};
use crate::model::{ModelStore, REALITY_TYPE};
use crate::paths;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Reality
// ---------------------------------------------------------------------------

/// One monitored project. Rebuilt from the seed model on every load and
/// never mutated during a check cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reality {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub root_path: Option<PathBuf>,
    /// The reality's own model, relative to `root_path`.
    pub model_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_summary: Option<Value>,
}

impl Reality {
    pub fn new(id: impl Into<String>, label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            root_path: Some(root.into()),
            model_path: PathBuf::from(paths::DEFAULT_MODEL_PATH),
            status: None,
            model_summary: None,
        }
    }

    pub fn full_model_path(&self) -> Option<PathBuf> {
        self.root_path
            .as_deref()
            .map(|root| paths::resolve(root, &self.model_path))
    }

    pub fn has_model(&self) -> bool {
        self.full_model_path().is_some_and(|p| p.is_file())
    }
}

// ---------------------------------------------------------------------------
// RealityRegistry
// ---------------------------------------------------------------------------

/// Every reality declared by the top-level seed model, in discovery order.
#[derive(Debug, Clone)]
pub struct RealityRegistry {
    seed_model: PathBuf,
    realities: Vec<Reality>,
}

impl RealityRegistry {
    /// Load `root_model` and collect its `Reality` nodes. Relative reality
    /// roots resolve against `seed_root`.
    pub fn load(seed_root: &Path, root_model: &Path) -> Result<Self> {
        let store = ModelStore::load(root_model)?;
        Ok(Self::from_store(seed_root, &store))
    }

    pub fn from_store(seed_root: &Path, store: &ModelStore) -> Self {
        let mut seen = HashSet::new();
        let mut realities = Vec::new();

        for node in store.nodes_of_type(REALITY_TYPE) {
            let Some(record) = node.reality() else {
                continue;
            };
            if !seen.insert(node.id.clone()) {
                warn!(reality = %node.id, "duplicate reality id, keeping the first");
                continue;
            }
            let label = if record.label.is_empty() {
                node.id.clone()
            } else {
                record.label.clone()
            };
            realities.push(Reality {
                id: node.id.clone(),
                label,
                description: record.description.clone(),
                root_path: record
                    .root
                    .as_deref()
                    .map(|r| paths::resolve(seed_root, Path::new(r))),
                model_path: PathBuf::from(
                    record
                        .model_path
                        .as_deref()
                        .unwrap_or(paths::DEFAULT_MODEL_PATH),
                ),
                status: record.status.clone(),
                model_summary: record.summary.clone(),
            });
        }

        debug!(count = realities.len(), model = %store.path().display(), "loaded realities");
        Self {
            seed_model: store.path().to_path_buf(),
            realities,
        }
    }

    pub fn seed_model(&self) -> &Path {
        &self.seed_model
    }

    pub fn list(&self) -> &[Reality] {
        &self.realities
    }

    pub fn get(&self, id: &str) -> Option<&Reality> {
        self.realities.iter().find(|r| r.id == id)
    }

    pub fn find_by_label(&self, label: &str) -> Option<&Reality> {
        self.realities
            .iter()
            .find(|r| r.label.eq_ignore_ascii_case(label))
    }

    /// Look up by id first, then by label.
    pub fn resolve(&self, id_or_label: &str) -> Result<&Reality> {
        self.get(id_or_label)
            .or_else(|| self.find_by_label(id_or_label))
            .ok_or_else(|| SeedError::RealityNotFound(id_or_label.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
