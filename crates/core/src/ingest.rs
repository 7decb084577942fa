use crate::chunking::{chunk_pages, ChunkingConfig};
use crate::config::RagConfig;
use crate::extractor::extract_pdf_pages;
use crate::store::open_index;
use crate::traits::VectorIndex;
use crate::{IngestError, IngestionOptions};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Extracts, chunks and adds one PDF to `index`, returning the chunk count.
///
/// Nothing is rolled back if `add` fails part way; whatever the index already
/// committed stays.
pub fn ingest_pdf<V>(
    path: &Path,
    index: &mut V,
    options: IngestionOptions,
) -> Result<usize, IngestError>
where
    V: VectorIndex + ?Sized,
{
    let config = ChunkingConfig::try_from(options)?;
    let pdf = extract_pdf_pages(path)?;
    debug!(path = %path.display(), checksum = %digest_file(path)?, "loaded pdf");

    let pages = pdf.pages().collect::<Vec<_>>();
    if pages.is_empty() {
        return Err(IngestError::NoExtractableText(path.to_path_buf()));
    }

    let chunks = chunk_pages(pages.iter().cloned(), config);
    info!(
        source = %pdf.source(),
        pages = pages.len(),
        total_pages = pdf.page_count(),
        chunk_count = chunks.len(),
        "chunked pdf"
    );

    index.add(&chunks)?;
    Ok(chunks.len())
}

/// Ingests into the collection named by `config`.
pub fn ingest(
    path: &Path,
    config: &RagConfig,
    options: IngestionOptions,
) -> Result<usize, IngestError> {
    if !path.exists() {
        return Err(IngestError::FileNotFound(path.to_path_buf()));
    }
    let mut index = open_index(config)?;
    ingest_pdf(path, &mut index, options)
}
