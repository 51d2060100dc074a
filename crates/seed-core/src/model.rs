use crate::error::{Result, SeedError};
use crate::verify::sha256_hex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

/// A claim that `file` (relative to the reality root) has content hash
/// `declared_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    pub file: String,
    pub declared_hash: String,
    /// Algorithm that produced `declared_hash`; `None` means the default.
    pub algorithm: Option<String>,
    /// Informational only, never verified.
    pub line: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkStatus {
    Pending,
    Error,
    Completed,
    Other(String),
}

impl WorkStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => WorkStatus::Pending,
            "error" => WorkStatus::Error,
            "completed" => WorkStatus::Completed,
            other => WorkStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub status: WorkStatus,
    pub priority: Option<i64>,
}

/// A `Reality` node of the top-level seed model.
#[derive(Debug, Clone, PartialEq)]
pub struct RealityRecord {
    pub label: String,
    pub description: String,
    pub root: Option<String>,
    pub model_path: Option<String>,
    pub status: Option<String>,
    pub summary: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Source(SourceReference),
    Work(WorkItem),
    Reality(RealityRecord),
    Other,
}

pub const REALITY_TYPE: &str = "Reality";
pub const WORK_TYPES: &[&str] = &["Todo", "WorkItem"];

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub node_type: String,
    pub kind: NodeKind,
    /// The node's JSON object exactly as it appeared in the file.
    pub fields: Map<String, Value>,
    /// Position in the raw `nodes` array, including skipped entries.
    position: usize,
}

impl Node {
    fn decode(position: usize, obj: &Map<String, Value>) -> Option<Node> {
        let id = obj.get("id")?.as_str()?.to_string();
        let node_type = obj.get("type")?.as_str()?.to_string();

        let work = if WORK_TYPES.contains(&node_type.as_str()) {
            decode_work(obj)
        } else {
            None
        };

        let kind = if node_type == REALITY_TYPE {
            NodeKind::Reality(decode_reality(obj))
        } else if let Some(work) = work {
            NodeKind::Work(work)
        } else if let Some(source) = decode_source(obj) {
            NodeKind::Source(source)
        } else {
            NodeKind::Other
        };

        Some(Node {
            id,
            node_type,
            kind,
            fields: obj.clone(),
            position,
        })
    }

    pub fn label(&self) -> Option<&str> {
        self.fields.get("label").and_then(Value::as_str)
    }

    pub fn source(&self) -> Option<&SourceReference> {
        match &self.kind {
            NodeKind::Source(s) => Some(s),
            _ => None,
        }
    }

    pub fn work(&self) -> Option<&WorkItem> {
        match &self.kind {
            NodeKind::Work(w) => Some(w),
            _ => None,
        }
    }

    pub fn reality(&self) -> Option<&RealityRecord> {
        match &self.kind {
            NodeKind::Reality(r) => Some(r),
            _ => None,
        }
    }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn decode_source(obj: &Map<String, Value>) -> Option<SourceReference> {
    let source = obj.get("source")?.as_object()?;
    // Older models call the file key `path`.
    let file = str_field(source, "file").or_else(|| str_field(source, "path"))?;
    let declared_hash = str_field(source, "hash")?;
    Some(SourceReference {
        file,
        declared_hash,
        algorithm: str_field(source, "algorithm"),
        line: source.get("line").and_then(Value::as_u64),
    })
}

fn decode_work(obj: &Map<String, Value>) -> Option<WorkItem> {
    let status = obj.get("status")?.as_str()?;
    Some(WorkItem {
        status: WorkStatus::parse(status),
        priority: obj.get("priority").and_then(Value::as_i64),
    })
}

fn decode_reality(obj: &Map<String, Value>) -> RealityRecord {
    let source = obj.get("source").and_then(Value::as_object);
    RealityRecord {
        label: str_field(obj, "label").unwrap_or_default(),
        description: str_field(obj, "description").unwrap_or_default(),
        root: source.and_then(|s| str_field(s, "path")),
        model_path: source.and_then(|s| str_field(s, "model_path")),
        status: str_field(obj, "status"),
        summary: obj
            .get("model")
            .and_then(|m| m.get("_summary"))
            .cloned(),
    }
}

// ---------------------------------------------------------------------------
// ModelStore
// ---------------------------------------------------------------------------

/// One reality's JSON model, parsed into typed nodes.
///
/// Each `load` re-reads the file; nothing is cached between loads, so changes
/// to the model itself show up on the next pulse.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
    document: Value,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    content_hash: String,
}

impl ModelStore {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SeedError::ModelNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_slice(path, &bytes)
    }

    /// Parse `bytes` as the model stored at `path`.
    pub fn from_slice(path: &Path, bytes: &[u8]) -> Result<Self> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|source| SeedError::ModelParse {
                path: path.to_path_buf(),
                source,
            })?;

        let raw_nodes = document
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or_else(|| SeedError::MissingNodes(path.to_path_buf()))?;

        let mut nodes = Vec::with_capacity(raw_nodes.len());
        let mut index = HashMap::new();
        for (position, raw) in raw_nodes.iter().enumerate() {
            let decoded = raw.as_object().and_then(|obj| Node::decode(position, obj));
            let Some(node) = decoded else {
                debug!(model = %path.display(), position, "skipping node without id/type");
                continue;
            };
            index.entry(node.id.clone()).or_insert(nodes.len());
            nodes.push(node);
        }

        Ok(Self {
            path: path.to_path_buf(),
            document,
            nodes,
            index,
            content_hash: sha256_hex(bytes),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 of the file bytes as they were read.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_of_type(&self, type_name: &str) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == type_name)
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn source_references(&self) -> impl Iterator<Item = (&Node, &SourceReference)> {
        self.nodes.iter().filter_map(|n| n.source().map(|s| (n, s)))
    }

    pub fn work_items(&self) -> impl Iterator<Item = &WorkItem> {
        self.nodes.iter().filter_map(Node::work)
    }

    // -----------------------------------------------------------------------
    // Write-back
    // -----------------------------------------------------------------------

    /// Replace the declared hash of a source-bearing node. Returns `false`
    /// when the declared hash already equals `hash`. With duplicate ids this
    /// targets the first node; use `set_source_hash_at` to address another.
    pub fn set_source_hash(&mut self, node_id: &str, hash: &str) -> Result<bool> {
        let i = *self
            .index
            .get(node_id)
            .ok_or_else(|| SeedError::NodeNotFound(node_id.to_string()))?;
        self.set_source_hash_at(i, hash)
    }

    /// Like `set_source_hash`, addressing the node by its index in `nodes()`.
    pub fn set_source_hash_at(&mut self, i: usize, hash: &str) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(i)
            .ok_or_else(|| SeedError::NodeNotFound(format!("#{i}")))?;
        let position = node.position;
        let NodeKind::Source(source) = &mut node.kind else {
            return Err(SeedError::NodeNotFound(format!(
                "{} (no source reference)",
                node.id
            )));
        };
        if source.declared_hash == hash {
            return Ok(false);
        }
        source.declared_hash = hash.to_string();
        if let Some(Value::Object(src)) = node.fields.get_mut("source") {
            src.insert("hash".to_string(), Value::String(hash.to_string()));
        }

        let raw = self
            .document
            .get_mut("nodes")
            .and_then(|n| n.get_mut(position))
            .and_then(|n| n.get_mut("source"))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| SeedError::MissingNodes(self.path.clone()))?;
        raw.insert("hash".to_string(), Value::String(hash.to_string()));
        Ok(true)
    }

    /// Write the document back to its file, compare-and-swap style: if the
    /// file changed since it was loaded, nothing is written and
    /// `ModelConflict` is returned. Returns the new content hash.
    pub fn save(&mut self) -> Result<String> {
        let on_disk = match std::fs::read(&self.path) {
            Ok(b) => Some(sha256_hex(&b)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        if on_disk.as_deref() != Some(self.content_hash.as_str()) {
            return Err(SeedError::ModelConflict(self.path.clone()));
        }

        let mut data = serde_json::to_vec_pretty(&self.document)?;
        data.push(b'\n');
        crate::io::atomic_write(&self.path, &data)?;
        self.content_hash = sha256_hex(&data);
        Ok(self.content_hash.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
