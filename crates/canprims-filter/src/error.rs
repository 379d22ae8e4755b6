use std::path::PathBuf;

/// Errors that can occur while loading filter lists.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The filter file could not be read.
    #[error("failed to load filters from {path}: {source}")]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FilterError>;
