use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "{0} is required\n\nHint:\n  • set it in cmpflow.yaml or ~/.config/cmpflow/config.yaml\n  • or export the matching CMPFLOW_* environment variable"
    )]
    MissingField(&'static str),

    #[error("wait.{field} must be greater than 0 (got {value})")]
    InvalidWait { field: &'static str, value: u64 },

    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
