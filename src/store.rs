//! JSON files backing a workspace and the normalized operation lists it is generated from.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::{MateError, Result};
use crate::operation::NormalizedOperation;
use crate::workspace::Workspace;

/// Reads a workspace; a missing file is an empty workspace.
pub fn load_workspace(path: &Path) -> Result<Workspace> {
    if !path.exists() {
        debug!(path = %path.display(), "no workspace file yet, starting empty");
        return Ok(Workspace::default());
    }
    read_json(path)
}

pub fn save_workspace(path: &Path, workspace: &Workspace) -> Result<()> {
    let data = serde_json::to_string_pretty(workspace).map_err(|source| MateError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|it| !it.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| MateError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, data).map_err(|source| MateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), collections = workspace.collections.len(), "workspace saved");
    Ok(())
}

pub fn load_operations(path: &Path) -> Result<Vec<NormalizedOperation>> {
    let operations: Vec<NormalizedOperation> = read_json(path)?;
    debug!(path = %path.display(), operations = operations.len(), "operations loaded");
    Ok(operations)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).map_err(|source| MateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| MateError::Json {
        path: path.to_path_buf(),
        source,
    })
}
