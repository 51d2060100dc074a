use crate::error::{Result, SeedError};
use crate::paths;
use crate::pulse::CheckLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// PulseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub check_level: CheckLevel,
    /// Reuse green+idle verdicts whose model file is unchanged (fast level).
    #[serde(default = "default_cache")]
    pub cache: bool,
    /// Per-reality limit for a single check. Unset means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

fn default_cache() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            check_level: CheckLevel::default(),
            cache: default_cache(),
            timeout_seconds: None,
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

impl PulseConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Top-level seed model listing every reality, relative to the seed root.
    #[serde(default = "default_root_model")]
    pub root_model: PathBuf,
    #[serde(default)]
    pub pulse: PulseConfig,
    /// Reality ids an external process tracker reports as running tasks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub busy: Vec<String>,
}

fn default_version() -> u32 {
    1
}

fn default_root_model() -> PathBuf {
    PathBuf::from(paths::DEFAULT_MODEL_PATH)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            root_model: default_root_model(),
            pulse: PulseConfig::default(),
            busy: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SeedError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like `load`, but an uninitialized root gets the defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(SeedError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn root_model_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.root_model)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let model = self.root_model_path(root);
        if self.root_model.is_absolute() && !model.starts_with(root) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("root_model {} lies outside the seed root", model.display()),
            });
        }
        if !model.exists() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("root model not found: {}", model.display()),
            });
        }

        if self.pulse.poll_interval_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "pulse.poll_interval_seconds is 0; watch will spin".to_string(),
            });
        }

        if self.pulse.timeout_seconds == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "pulse.timeout_seconds is 0; every check would time out".to_string(),
            });
        }

        if self.busy.iter().any(|id| id.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "busy contains an empty reality id".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
        assert!(!yaml.contains("busy"));
        assert!(!yaml.contains("timeout_seconds"));
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("version: 1\n").unwrap();
        assert_eq!(cfg.root_model, PathBuf::from("model/sketch.json"));
        assert_eq!(cfg.pulse.check_level, CheckLevel::Verify);
        assert!(cfg.pulse.cache);
        assert_eq!(cfg.pulse.poll_interval(), Duration::from_secs(5));
        assert!(cfg.pulse.timeout().is_none());
    }

    #[test]
    fn pulse_section_parses() {
        let yaml = r#"
version: 1
root_model: meta/seed.json
pulse:
  check_level: fast
  cache: false
  timeout_seconds: 30
busy:
  - reality-spawnie
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.pulse.check_level, CheckLevel::Fast);
        assert!(!cfg.pulse.cache);
        assert_eq!(cfg.pulse.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.busy, vec!["reality-spawnie".to_string()]);
        assert_eq!(
            cfg.root_model_path(Path::new("/seed")),
            PathBuf::from("/seed/meta/seed.json")
        );
    }

    #[test]
    fn load_requires_init() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(SeedError::NotInitialized)
        ));
        assert_eq!(Config::load_or_default(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.pulse.timeout_seconds = Some(10);
        cfg.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), cfg);
    }

    #[test]
    fn validate_reports_missing_root_model() {
        let dir = TempDir::new().unwrap();
        let warnings = Config::default().validate(dir.path());
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("root model not found")));
    }

    #[test]
    fn validate_clean_config_no_warnings() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("model/sketch.json");
        std::fs::create_dir_all(model.parent().unwrap()).unwrap();
        std::fs::write(&model, r#"{"nodes": []}"#).unwrap();
        assert!(Config::default().validate(dir.path()).is_empty());
    }

    #[test]
    fn validate_warns_on_root_model_outside_root() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let model = other.path().join("seed.json");
        std::fs::write(&model, r#"{"nodes": []}"#).unwrap();
        let cfg = Config {
            root_model: model,
            ..Config::default()
        };
        let warnings = cfg.validate(dir.path());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(warnings[0].message.contains("outside the seed root"));
    }

    #[test]
    fn validate_flags_zero_timeout_and_interval() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.pulse.timeout_seconds = Some(0);
        cfg.pulse.poll_interval_seconds = 0;
        cfg.busy.push("  ".to_string());
        let warnings = cfg.validate(dir.path());
        assert!(warnings.iter().any(|w| w.message.contains("timeout_seconds is 0")));
        assert!(warnings.iter().any(|w| w.message.contains("will spin")));
        assert!(warnings.iter().any(|w| w.message.contains("empty reality id")));
    }
}
