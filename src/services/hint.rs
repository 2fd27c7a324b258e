use std::time::Duration;

use crate::engine::VocabularyItem;
use crate::services::llm_provider::{CompletionOptions, LLMProvider};

pub const NO_CONTEXT_MESSAGE: &str = "No additional context is available at this time.";

const HINT_SYSTEM_PROMPT: &str = "You are an expert Norwegian language tutor. \
Keep answers short and never reveal the English translation directly.";

const HINT_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 150,
    temperature: 0.7,
};

/// Produces the extra context shown when a learner asks for a hint.
#[derive(Clone)]
pub struct HintGenerator {
    provider: Option<LLMProvider>,
    timeout: Duration,
}

impl HintGenerator {
    pub fn new(provider: LLMProvider, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
        }
    }

    /// Mnemonic-only generator, used when no LLM is configured and in tests.
    pub fn offline() -> Self {
        Self {
            provider: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.provider.as_ref().is_some_and(LLMProvider::is_available)
    }

    pub async fn generate(&self, item: &VocabularyItem) -> String {
        if let Some(text) = self.remote_hint(item).await {
            return text;
        }
        fallback_hint(item)
    }

    async fn remote_hint(&self, item: &VocabularyItem) -> Option<String> {
        let provider = self.provider.as_ref().filter(|p| p.is_available())?;
        let prompt = hint_prompt(item);
        let call = provider.complete_with_system(HINT_SYSTEM_PROMPT, &prompt, HINT_OPTIONS);

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => {
                tracing::warn!(item_id = %item.id, "hint generator returned empty text");
                None
            }
            Ok(Err(err)) => {
                tracing::warn!(item_id = %item.id, error = %err, "hint generation failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    item_id = %item.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "hint generation timed out"
                );
                None
            }
        }
    }
}

pub fn hint_prompt(item: &VocabularyItem) -> String {
    format!(
        "For the Norwegian verb '{}', give a brief explanation of how it is used, \
one short example sentence in Norwegian, and a memory aid. \
Do not state its English meaning outright.",
        item.norwegian
    )
}

pub fn fallback_hint(item: &VocabularyItem) -> String {
    match item.mnemonic() {
        Some(mnemonic) => format!("Mnemonic: {mnemonic}"),
        None => NO_CONTEXT_MESSAGE.to_string(),
    }
}
