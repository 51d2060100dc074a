pub mod check;
pub mod config;
pub mod init;
pub mod reality;
pub mod rehash;
pub mod status;
pub mod verify;
pub mod watch;

use anyhow::Context;
use seed_core::config::Config;
use seed_core::pulse::CheckLevel;
use seed_core::registry::RealityRegistry;
use std::path::Path;

/// Flags shared by every pulse-running command.
#[derive(Debug, Clone, Default)]
pub struct PulseArgs {
    pub level: Option<CheckLevel>,
    pub busy: Vec<String>,
}

impl PulseArgs {
    /// `--level` wins over `pulse.check_level`.
    pub fn level(&self, config: &Config) -> CheckLevel {
        self.level.unwrap_or(config.pulse.check_level)
    }

    /// `--busy` ids plus the config's `busy` list.
    pub fn busy(&self, config: &Config) -> Vec<String> {
        let mut ids = config.busy.clone();
        for id in &self.busy {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load_or_default(root).context("failed to load .seed/config.yaml")
}

pub fn load_registry(root: &Path, config: &Config) -> anyhow::Result<RealityRegistry> {
    let model = config.root_model_path(root);
    RealityRegistry::load(root, &model)
        .with_context(|| format!("failed to load seed model {}", model.display()))
}
