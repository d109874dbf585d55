use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MateError {
    #[error("couldn't access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{entity} '{name}' not found")]
    NotFound { entity: &'static str, name: String },

    #[error("{entity} '{name}' already exists")]
    Conflict { entity: &'static str, name: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid operation key '{0}', expected '<METHOD> <path>'")]
    InvalidOperationKey(String),
}

impl MateError {
    pub fn validation(msg: impl Into<String>) -> MateError {
        MateError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, name: impl Into<String>) -> MateError {
        MateError::NotFound { entity, name: name.into() }
    }

    pub fn conflict(entity: &'static str, name: impl Into<String>) -> MateError {
        MateError::Conflict { entity, name: name.into() }
    }
}

pub type Result<T> = std::result::Result<T, MateError>;
