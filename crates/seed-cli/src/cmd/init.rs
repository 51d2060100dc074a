use anyhow::Context;
use seed_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing seed in: {}", root.display());

    let dir = paths::seed_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_path = paths::config_path(root);
    if config_path.exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    }

    let config = Config::load(root).context("failed to load config")?;
    let model = config.root_model_path(root);
    if !model.exists() {
        println!(
            "\nNo seed model at {}. Add Reality nodes there to start monitoring.",
            model.display()
        );
    }
    Ok(())
}
