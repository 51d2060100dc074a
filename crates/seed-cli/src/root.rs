use seed_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the seed root directory.
///
/// Priority:
/// 1. `--root` flag / `SEED_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.seed/`
/// 3. Walk upward from `cwd` looking for `model/sketch.json`
/// 4. Walk upward from `cwd` looking for `.git/`
/// 5. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_from(&cwd)
}

fn resolve_from(start: &Path) -> PathBuf {
    find_upward(start, |d| d.join(paths::SEED_DIR).is_dir())
        .or_else(|| find_upward(start, |d| paths::default_model_path(d).is_file()))
        .or_else(|| find_upward(start, |d| d.join(".git").is_dir()))
        .unwrap_or_else(|| start.to_path_buf())
}

fn find_upward(start: &Path, is_root: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    start.ancestors().find(|d| is_root(d)).map(Path::to_path_buf)
}
