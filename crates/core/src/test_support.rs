//! Fixtures shared by unit tests: generated PDFs and stub collaborators.

use crate::embeddings::Embedder;
use crate::error::{LlmError, SearchError};
use crate::llm::{ChatMessage, LanguageModel, ModelReply};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::cell::{Cell, RefCell};
use std::path::Path;

/// Writes a PDF with one page per entry. Empty entries become pages without
/// any text operators, the same shape as a scanned image page.
pub fn write_pdf(path: &Path, pages: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path)?;
    Ok(())
}

/// Answers with the user message it was given, so tests can see exactly what
/// the model received.
#[derive(Default)]
pub struct EchoModel {
    pub calls: Cell<usize>,
    pub last_messages: RefCell<Vec<ChatMessage>>,
}

impl LanguageModel for EchoModel {
    fn complete(&self, messages: &[ChatMessage]) -> Result<ModelReply, LlmError> {
        self.calls.set(self.calls.get() + 1);
        *self.last_messages.borrow_mut() = messages.to_vec();
        let user = messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        Ok(ModelReply::text(user))
    }
}

/// Embedder that always fails, for checking that errors surface unchanged.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embedding_id(&self) -> String {
        "failing".to_string()
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>, SearchError> {
        Err(SearchError::Request("embedding service unreachable".to_string()))
    }
}
