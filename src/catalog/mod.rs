//! Catalog loading and validation.
//!
//! The catalog is a JSON array of `{"name": .., "appId": ..}` objects produced
//! by the acquisition scripts. It is read once at startup and never written.
//! Any problem with it is fatal: a watcher with a broken catalog would either
//! watch nothing or alias checkpoints between apps.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::Entity;

/// Errors that can occur while loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The catalog is not a JSON array of entities.
    #[error("malformed catalog {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The catalog contains no entities.
    #[error("catalog {0} is empty")]
    Empty(PathBuf),

    /// An entity has an empty or whitespace-only name.
    #[error("catalog entry {index} has a blank name")]
    BlankName { index: usize },

    /// Two entities share a name.
    #[error("catalog entry {index} duplicates the name {name:?}")]
    DuplicateName { index: usize, name: String },
}

/// Loads and validates the catalog at `path`.
///
/// Entities are returned in file order, which is also the scan order.
pub fn load_catalog(path: &Path) -> Result<Vec<Entity>, CatalogError> {
    let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entities: Vec<Entity> =
        serde_json::from_slice(&bytes).map_err(|source| CatalogError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    if entities.is_empty() {
        return Err(CatalogError::Empty(path.to_path_buf()));
    }
    validate_names(&entities)?;
    Ok(entities)
}

fn validate_names(entities: &[Entity]) -> Result<(), CatalogError> {
    let mut seen = HashSet::with_capacity(entities.len());
    for (index, entity) in entities.iter().enumerate() {
        if entity.name.as_str().trim().is_empty() {
            return Err(CatalogError::BlankName { index });
        }
        if !seen.insert(entity.name.as_str()) {
            return Err(CatalogError::DuplicateName {
                index,
                name: entity.name.to_string(),
            });
        }
    }
    Ok(())
}
