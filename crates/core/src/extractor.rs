use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Cleaned text of one page. `page` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub source: String,
    pub page: u32,
    pub text: String,
}

/// A loaded PDF whose pages are extracted on demand.
///
/// `pages()` can be called any number of times; each call walks the document
/// from the first page again.
pub struct PdfPages {
    document: Document,
    source: String,
    page_numbers: Vec<u32>,
}

impl PdfPages {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let source = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?
            .to_string();

        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;
        let page_numbers = document.get_pages().into_keys().collect();

        Ok(Self {
            document,
            source,
            page_numbers,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    /// Pages with selectable text, in document order. Image-only pages are skipped.
    pub fn pages(&self) -> impl Iterator<Item = PageText> + '_ {
        self.page_numbers
            .iter()
            .enumerate()
            .filter_map(move |(index, page_no)| {
                let raw = match self.document.extract_text(&[*page_no]) {
                    Ok(raw) => raw,
                    Err(error) => {
                        debug!(source = %self.source, page = index, %error, "page has no readable text");
                        return None;
                    }
                };

                let text = clean_page_text(&raw);
                if text.is_empty() {
                    debug!(source = %self.source, page = index, "skipping page without text");
                    return None;
                }

                Some(PageText {
                    source: self.source.clone(),
                    page: index as u32,
                    text,
                })
            })
    }
}

pub fn extract_pdf_pages(path: &Path) -> Result<PdfPages, IngestError> {
    PdfPages::open(path)
}

/// Joins words hyphenated across a line break and folds the remaining line
/// breaks into spaces.
pub fn clean_page_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace("-\n", "")
        .replace('\n', " ")
        .trim()
        .to_string()
}
