use crate::cmd::{load_config, load_registry};
use crate::output::{outcome_symbol, print_json, print_table};
use seed_core::model::ModelStore;
use seed_core::registry::Reality;
use seed_core::verify::{self, HashCheck, HashTally};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct RealityHashes<'a> {
    reality_id: &'a str,
    label: &'a str,
    #[serde(flatten)]
    tally: HashTally,
    checks: Vec<HashCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RealityHashes<'_> {
    fn is_clean(&self) -> bool {
        self.error.is_none() && self.tally.is_clean()
    }
}

pub fn run(root: &Path, only: Option<&str>, verbose: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let registry = load_registry(root, &config)?;
    let selected: Vec<&Reality> = match only {
        Some(id) => vec![registry.resolve(id)?],
        None => registry.list().iter().collect(),
    };

    let results: Vec<RealityHashes> = selected.into_iter().map(check_reality).collect();

    if json {
        print_json(&results)?;
    } else {
        for r in &results {
            print_reality(r, verbose);
        }
    }

    let failing = results.iter().filter(|r| !r.is_clean()).count();
    if failing > 0 {
        anyhow::bail!("{failing} reality(ies) failed hash verification");
    }
    Ok(())
}

fn check_reality(reality: &Reality) -> RealityHashes<'_> {
    let mut out = RealityHashes {
        reality_id: &reality.id,
        label: &reality.label,
        tally: HashTally::default(),
        checks: Vec::new(),
        error: None,
    };
    let (Some(root), Some(model)) = (reality.root_path.as_deref(), reality.full_model_path()) else {
        out.error = Some(format!("reality '{}' has no root path", reality.id));
        return out;
    };
    match ModelStore::load(&model) {
        Ok(store) => {
            out.checks = verify::verify_model(&store, root);
            out.tally = HashTally::from_checks(&out.checks);
        }
        Err(e) => out.error = Some(e.to_string()),
    }
    out
}

fn print_reality(r: &RealityHashes, verbose: bool) {
    let symbol = if r.is_clean() { "✓" } else { "✗" };
    match &r.error {
        Some(err) => println!("{symbol} {} ({}): {err}", r.label, r.reality_id),
        None => println!(
            "{symbol} {} ({}): {} verified, {} drifted, {} missing",
            r.label, r.reality_id, r.tally.verified, r.tally.drifted, r.tally.missing
        ),
    }

    let shown: Vec<&HashCheck> = r
        .checks
        .iter()
        .filter(|c| verbose || !c.is_ok())
        .collect();
    if shown.is_empty() {
        return;
    }
    let rows = shown
        .iter()
        .map(|c| {
            vec![
                format!("{} {}", outcome_symbol(c.outcome), c.outcome),
                c.node_id.clone(),
                c.file.clone(),
                c.error.clone().unwrap_or_else(|| short_hash(c.actual_hash.as_deref())),
            ]
        })
        .collect();
    print_table(&["OUTCOME", "NODE", "FILE", "DETAIL"], rows);
    println!();
}

fn short_hash(hash: Option<&str>) -> String {
    match hash {
        Some(h) => h.chars().take(12).collect(),
        None => "-".to_string(),
    }
}
