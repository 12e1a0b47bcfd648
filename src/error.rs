use std::path::PathBuf;

use thiserror::Error;

/// Contract violations while laying out a board or a snake.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("board dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("snake head cell ({x}, {y}) is not empty")]
    HeadOccupied { x: i32, y: i32 },
    #[error("cannot grow snake past {placed} of {wanted} segments")]
    SpawnBlocked { placed: usize, wanted: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("hidden layer {index} has zero width")]
    ZeroWidthLayer { index: usize },
    #[error("policy expects {expected} parameters, got {actual}")]
    ParamCount { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("malformed name {0:?}: use ASCII letters, digits, '-' or '_'")]
    InvalidName(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}:{line}: not a number: {text:?}")]
    Number {
        path: PathBuf,
        line: usize,
        text: String,
    },
}

/// Failures that abort a whole training run.
#[derive(Debug, Error)]
pub enum EvolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("individual {index}: {source}")]
    Shape {
        index: usize,
        #[source]
        source: PolicyError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
