//! Fixtures shared by the pulse and status tests.

use crate::registry::Reality;
use serde_json::{json, Value};
use std::path::Path;

pub const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

/// Create `<parent>/<id>/model/sketch.json` holding `nodes` and return a
/// reality rooted at `<parent>/<id>`.
pub fn reality_with_nodes(parent: &Path, id: &str, nodes: Value) -> Reality {
    let root = parent.join(id);
    let model = root.join("model/sketch.json");
    std::fs::create_dir_all(model.parent().unwrap()).unwrap();
    let body = json!({ "id": id, "nodes": nodes });
    std::fs::write(&model, serde_json::to_vec_pretty(&body).unwrap()).unwrap();
    Reality::new(id, id.to_uppercase(), root)
}

pub fn write_source_file(reality: &Reality, rel: &str, contents: &str) {
    let path = reality.root_path.as_ref().unwrap().join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

pub fn source_node(id: &str, file: &str, hash: &str) -> Value {
    json!({ "id": id, "type": "Module", "source": { "file": file, "hash": hash } })
}

pub fn todo_node(id: &str, status: &str) -> Value {
    json!({ "id": id, "type": "Todo", "status": status })
}

/// A reality whose model declares `pending` pending todos and nothing else.
pub fn reality_with_pending(parent: &Path, id: &str, pending: usize) -> Reality {
    let nodes: Vec<Value> = (0..pending)
        .map(|i| todo_node(&format!("todo-{i}"), "pending"))
        .collect();
    reality_with_nodes(parent, id, Value::Array(nodes))
}
