use super::memory::{InMemoryIndex, IndexedChunk};
use crate::embeddings::Embedder;
use crate::traits::VectorIndex;
use crate::{DocumentChunk, RetrievedMatch, SearchError, SearchFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MANIFEST_FILE: &str = "manifest.json";
const RECORDS_FILE: &str = "records.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionManifest {
    collection: String,
    embedding_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A collection persisted as JSON lines under `<store_dir>/<collection>/`.
///
/// The whole collection is loaded on open. Nothing is written until the first
/// `add`, so searching a store that was never ingested leaves no trace on disk.
pub struct LocalStore<E> {
    root: PathBuf,
    collection: String,
    manifest: Option<CollectionManifest>,
    index: InMemoryIndex<E>,
}

impl<E: Embedder> LocalStore<E> {
    pub fn open(
        store_dir: impl AsRef<Path>,
        collection: impl Into<String>,
        embedder: E,
    ) -> Result<Self, SearchError> {
        let collection = collection.into();
        let root = store_dir.as_ref().join(&collection);

        let manifest = read_manifest(&root.join(MANIFEST_FILE))?;
        if let Some(manifest) = &manifest {
            let configured = embedder.embedding_id();
            if manifest.embedding_id != configured {
                return Err(SearchError::EmbeddingMismatch {
                    expected: manifest.embedding_id.clone(),
                    found: configured,
                });
            }
        }

        let records = read_records(&root.join(RECORDS_FILE))?;
        debug!(
            path = %root.display(),
            records = records.len(),
            "opened local collection"
        );

        Ok(Self {
            root,
            collection,
            manifest,
            index: InMemoryIndex::from_records(embedder, records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn write_manifest(&mut self) -> Result<(), SearchError> {
        let now = Utc::now();
        let manifest = match self.manifest.take() {
            Some(existing) => CollectionManifest {
                updated_at: now,
                ..existing
            },
            None => CollectionManifest {
                collection: self.collection.clone(),
                embedding_id: self.index.embedder().embedding_id(),
                created_at: now,
                updated_at: now,
            },
        };

        let file = File::create(self.root.join(MANIFEST_FILE))?;
        serde_json::to_writer_pretty(file, &manifest)?;
        self.manifest = Some(manifest);
        Ok(())
    }

    fn rewrite_records(&self) -> Result<(), SearchError> {
        let temp = self.root.join(format!("{RECORDS_FILE}.tmp"));
        {
            let mut writer = BufWriter::new(File::create(&temp)?);
            for record in self.index.records() {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        fs::rename(temp, self.root.join(RECORDS_FILE))?;
        Ok(())
    }

    fn append_records(&self, records: &[IndexedChunk]) -> Result<(), SearchError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(RECORDS_FILE))?;
        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl<E: Embedder> VectorIndex for LocalStore<E> {
    fn add(&mut self, chunks: &[DocumentChunk]) -> Result<(), SearchError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let records = self.index.embed_chunks(chunks)?;
        fs::create_dir_all(&self.root)?;

        let replaces_existing = records
            .iter()
            .any(|record| self.index.contains(&record.chunk.chunk_id));

        if replaces_existing {
            self.index.extend(records);
            self.rewrite_records()?;
        } else {
            self.append_records(&records)?;
            self.index.extend(records);
        }
        self.write_manifest()?;

        info!(
            collection = %self.collection,
            added = chunks.len(),
            total = self.index.len(),
            "persisted chunks"
        );
        Ok(())
    }

    fn search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedMatch>, SearchError> {
        self.index.search(query, k, filter)
    }
}

fn read_manifest(path: &Path) -> Result<Option<CollectionManifest>, SearchError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    Ok(Some(serde_json::from_reader(BufReader::new(file))?))
}

fn read_records(path: &Path) -> Result<Vec<IndexedChunk>, SearchError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use tempfile::tempdir;

    fn chunk(id: &str, page: u32, text: &str) -> DocumentChunk {
        DocumentChunk {
            chunk_id: id.to_string(),
            text: text.to_string(),
            source: "Handbook.pdf".to_string(),
            page,
        }
    }

    #[test]
    fn opening_missing_collection_is_empty_and_writes_nothing(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store_dir = dir.path().join("store");
        let store = LocalStore::open(&store_dir, "handbook", CharacterNgramEmbedder::default())?;

        assert!(store.is_empty());
        assert!(store.search("anything", 5, &SearchFilter::default())?.is_empty());
        assert!(!store_dir.exists());
        Ok(())
    }

    #[test]
    fn chunks_survive_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        {
            let mut store =
                LocalStore::open(dir.path(), "handbook", CharacterNgramEmbedder::default())?;
            store.add(&[chunk("a", 0, "Assessment weight is 40% coursework.")])?;
            store.add(&[chunk("b", 1, "Exams are held in May.")])?;
        }

        let store = LocalStore::open(dir.path(), "handbook", CharacterNgramEmbedder::default())?;
        assert_eq!(store.len(), 2);
        assert!(store.path().join(MANIFEST_FILE).exists());

        let matches = store.search("assessment weight", 1, &SearchFilter::default())?;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].page, Some(0));
        Ok(())
    }

    #[test]
    fn re_ingesting_replaces_instead_of_duplicating() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut store = LocalStore::open(dir.path(), "handbook", CharacterNgramEmbedder::default())?;
        store.add(&[chunk("a", 0, "first"), chunk("b", 0, "second")])?;
        store.add(&[chunk("a", 0, "first"), chunk("b", 0, "second")])?;
        store.add(&[chunk("c", 1, "third")])?;
        drop(store);

        let lines = fs::read_to_string(dir.path().join("handbook").join(RECORDS_FILE))?;
        assert_eq!(lines.lines().count(), 3);

        let store = LocalStore::open(dir.path(), "handbook", CharacterNgramEmbedder::default())?;
        assert_eq!(store.len(), 3);
        Ok(())
    }

    #[test]
    fn collections_are_separate() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut handbook =
            LocalStore::open(dir.path(), "handbook", CharacterNgramEmbedder::default())?;
        handbook.add(&[chunk("a", 0, "first")])?;

        let other = LocalStore::open(dir.path(), "other", CharacterNgramEmbedder::default())?;
        assert!(other.is_empty());
        Ok(())
    }

    #[test]
    fn different_embedding_is_refused() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut store = LocalStore::open(dir.path(), "handbook", CharacterNgramEmbedder::default())?;
        store.add(&[chunk("a", 0, "first")])?;

        let reopened = LocalStore::open(
            dir.path(),
            "handbook",
            CharacterNgramEmbedder { dimensions: 16 },
        );
        assert!(matches!(
            reopened,
            Err(SearchError::EmbeddingMismatch { .. })
        ));
        Ok(())
    }
}
