use crate::config::RagConfig;
use crate::stores::{LocalStore, QdrantStore};
use crate::traits::VectorIndex;
use crate::SearchError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Opens the configured collection. Ingestion and search both come through
/// here, so both always embed with `config.embedding`.
pub fn open_index(config: &RagConfig) -> Result<Box<dyn VectorIndex>, SearchError> {
    let embedder = config.embedding.build();
    match &config.qdrant_url {
        Some(url) => {
            debug!(url = %url, collection = %config.collection, "using qdrant store");
            Ok(Box::new(QdrantStore::new(
                url.clone(),
                config.collection.clone(),
                embedder,
            )))
        }
        None => {
            debug!(
                store_dir = %config.store_dir.display(),
                collection = %config.collection,
                "using local store"
            );
            Ok(Box::new(LocalStore::open(
                &config.store_dir,
                config.collection.clone(),
                embedder,
            )?))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    Deleted(PathBuf),
    NothingToDelete,
}

/// Removes the whole store directory, every collection included.
pub fn reset_store(store_dir: &Path) -> io::Result<ResetOutcome> {
    if !store_dir.exists() {
        return Ok(ResetOutcome::NothingToDelete);
    }
    fs::remove_dir_all(store_dir)?;
    info!(path = %store_dir.display(), "deleted store");
    Ok(ResetOutcome::Deleted(store_dir.to_path_buf()))
}
