use crate::answer::{compose_answer, NO_CONTEXT_HINT};
use crate::citations::format_citations;
use crate::config::RagConfig;
use crate::llm::{build_language_model, LanguageModel};
use crate::store::open_index;
use crate::traits::VectorIndex;
use crate::{QueryError, RetrievedMatch, SearchFilter};
use tracing::{debug, info};

/// Per-question retrieval settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub k: usize,
    pub filter: SearchFilter,
}

impl QueryOptions {
    pub fn new(k: usize, source: Option<String>) -> Self {
        Self {
            k,
            filter: SearchFilter { source },
        }
    }
}

/// An index and a model opened once and reused for every question.
pub struct QuerySession<I = Box<dyn VectorIndex>, L = Box<dyn LanguageModel>> {
    index: I,
    model: L,
    options: QueryOptions,
}

impl QuerySession {
    /// Opens the configured store and language model.
    pub fn open(config: &RagConfig, options: QueryOptions) -> Result<Self, QueryError> {
        let index = open_index(config)?;
        let model = build_language_model(&config.llm)?;
        info!(
            collection = %config.collection,
            k = options.k,
            provider = %config.llm.provider,
            model = %config.llm.model_name(),
            "query session ready"
        );
        Ok(Self::new(index, model, options))
    }
}

impl<I, L> QuerySession<I, L>
where
    I: VectorIndex,
    L: LanguageModel,
{
    pub fn new(index: I, model: L, options: QueryOptions) -> Self {
        Self {
            index,
            model,
            options,
        }
    }

    pub fn retrieve(&self, question: &str) -> Result<Vec<RetrievedMatch>, QueryError> {
        let matches = self
            .index
            .search(question, self.options.k, &self.options.filter)?;
        debug!(matches = matches.len(), "retrieved context");
        Ok(matches)
    }

    /// Search, format citations, and ask the model. Every call searches
    /// afresh; answers are never cached.
    pub fn ask(&self, question: &str) -> Result<String, QueryError> {
        let matches = self.retrieve(question)?;
        let context = format_citations(&matches);
        Ok(compose_answer(question, &context, &self.model)?)
    }
}

/// One-shot question. The store is searched first; the language model is only
/// built when there is context to send it, so an empty collection answers with
/// the hint even when the provider is misconfigured.
pub fn answer_question(
    question: &str,
    config: &RagConfig,
    options: QueryOptions,
) -> Result<String, QueryError> {
    let index = open_index(config)?;
    let matches = index.search(question, options.k, &options.filter)?;
    debug!(matches = matches.len(), "retrieved context");

    let context = format_citations(&matches);
    if context.is_empty() {
        return Ok(NO_CONTEXT_HINT.to_string());
    }

    let model = build_language_model(&config.llm)?;
    Ok(compose_answer(question, &context, &model)?)
}
