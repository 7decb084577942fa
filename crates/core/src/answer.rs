use crate::error::LlmError;
use crate::llm::{ChatMessage, LanguageModel};
use tracing::debug;

pub const SYSTEM_PROMPT: &str = "Answer using ONLY the context below. If the answer is not in the context say 'I don't know'. Always include citations like [file p.page]";

/// Returned instead of calling the model when retrieval found nothing.
pub const NO_CONTEXT_HINT: &str =
    "I couldn't find relevant context. Try increasing --k or check the --source filename.";

/// The system instructions and the user turn carrying question and context.
pub fn build_messages(question: &str, context: &str) -> [ChatMessage; 2] {
    [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Question: {question}\n\nContext: \n{context}")),
    ]
}

pub fn compose_answer<L>(question: &str, context: &str, model: &L) -> Result<String, LlmError>
where
    L: LanguageModel + ?Sized,
{
    if context.is_empty() {
        debug!("no context retrieved, skipping model call");
        return Ok(NO_CONTEXT_HINT.to_string());
    }

    let messages = build_messages(question, context);
    let reply = model.complete(&messages)?;
    Ok(reply.into_text())
}
