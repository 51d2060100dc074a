use crate::cmd::{load_config, load_registry};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use seed_core::registry::Reality;
use std::path::Path;

#[derive(Subcommand)]
pub enum RealitySubcommand {
    /// List every reality declared in the seed model
    List,

    /// Show one reality
    Show {
        /// Reality id or label
        reality: String,
    },
}

pub fn run(root: &Path, subcmd: RealitySubcommand, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let registry = load_registry(root, &config)?;

    match subcmd {
        RealitySubcommand::List => {
            if json {
                return print_json(&registry.list());
            }
            if registry.list().is_empty() {
                println!("No realities in {}.", registry.seed_model().display());
                return Ok(());
            }
            let rows = registry
                .list()
                .iter()
                .map(|r| {
                    vec![
                        r.id.clone(),
                        r.label.clone(),
                        root_display(r),
                        if r.has_model() { "yes" } else { "no" }.to_string(),
                    ]
                })
                .collect();
            print_table(&["ID", "LABEL", "ROOT", "MODEL"], rows);
            Ok(())
        }
        RealitySubcommand::Show { reality } => {
            let r = registry.resolve(&reality)?;
            if json {
                return print_json(r);
            }
            println!("{} ({})", r.label, r.id);
            if !r.description.is_empty() {
                println!("  {}", r.description);
            }
            println!("  root:   {}", root_display(r));
            match r.full_model_path() {
                Some(p) => println!(
                    "  model:  {}{}",
                    p.display(),
                    if r.has_model() { "" } else { "  (missing)" }
                ),
                None => println!("  model:  -"),
            }
            if let Some(status) = &r.status {
                println!("  status: {status}");
            }
            if let Some(summary) = &r.model_summary {
                println!("  summary:");
                println!("{}", serde_json::to_string_pretty(summary)?);
            }
            Ok(())
        }
    }
}

fn root_display(r: &Reality) -> String {
    r.root_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}
