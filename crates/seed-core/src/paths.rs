use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SEED_DIR: &str = ".seed";
pub const CONFIG_FILE: &str = ".seed/config.yaml";

/// Where the top-level seed model lives relative to the seed root, and
/// where each reality keeps its own model relative to its root.
pub const DEFAULT_MODEL_PATH: &str = "model/sketch.json";

/// Where `watch --write` puts snapshots when no path is given.
pub const DEFAULT_SNAPSHOT_FILE: &str = "output/status.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn seed_dir(root: &Path) -> PathBuf {
    root.join(SEED_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn default_model_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_MODEL_PATH)
}

/// Join `path` onto `base` unless it is already absolute.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
