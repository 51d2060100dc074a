use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("not initialized: run 'seed init'")]
    NotInitialized,

    #[error("model not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("invalid JSON in model {}: {source}", path.display())]
    ModelParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model {} has no 'nodes' array", .0.display())]
    MissingNodes(PathBuf),

    #[error("model {} changed on disk since it was loaded", .0.display())]
    ModelConflict(PathBuf),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("reality not found: {0}")]
    RealityNotFound(String),

    #[error("reality '{0}' has no root path")]
    NoRootPath(String),

    #[error("unsupported hash algorithm '{0}' (supported: sha256)")]
    UnsupportedAlgorithm(String),

    #[error("invalid check level '{0}': expected 'fast' or 'verify'")]
    InvalidCheckLevel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SeedError>;
