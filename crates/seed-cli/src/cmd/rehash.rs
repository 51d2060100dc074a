use crate::cmd::{load_config, load_registry};
use crate::output::print_json;
use anyhow::Context;
use seed_core::model::ModelStore;
use seed_core::verify;
use std::path::Path;

pub fn run(root: &Path, reality: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let registry = load_registry(root, &config)?;
    let reality = registry.resolve(reality)?;
    let reality_root = reality.root_path.as_deref();
    let (Some(reality_root), Some(model)) = (reality_root, reality.full_model_path()) else {
        anyhow::bail!("reality '{}' has no root path", reality.id);
    };

    let mut store = ModelStore::load(&model)
        .with_context(|| format!("failed to load model for '{}'", reality.id))?;
    let rewritten = verify::rehash_model(&mut store, reality_root)?;
    let model_hash = if rewritten.is_empty() {
        store.content_hash().to_string()
    } else {
        store
            .save()
            .with_context(|| format!("failed to write {}", model.display()))?
    };

    if json {
        let value = serde_json::json!({
            "reality_id": reality.id,
            "rehashed": rewritten,
            "model_hash": model_hash,
        });
        print_json(&value)?;
    } else if rewritten.is_empty() {
        println!("No drift in '{}'; model unchanged.", reality.label);
    } else {
        for c in &rewritten {
            println!(
                "  rehashed: {} ({})  {} -> {}",
                c.node_id,
                c.file,
                c.expected_hash,
                c.actual_hash.as_deref().unwrap_or("-")
            );
        }
        println!(
            "Accepted {} drifted source(s) in '{}'.",
            rewritten.len(),
            reality.label
        );
    }
    Ok(())
}
