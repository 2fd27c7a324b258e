use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::services::llm_provider::{CompletionOptions, LLMProvider};

const JUDGE_SYSTEM_PROMPT: &str =
    "You are an expert Norwegian language tutor. You answer with only 'yes' or 'no'.";

const JUDGE_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 5,
    temperature: 0.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeVerdict {
    Yes,
    No,
    Unavailable,
}

/// Decides whether a free-form answer means the same as one of the
/// acceptable alternatives.
#[async_trait]
pub trait SemanticJudge: Send + Sync {
    async fn judge(&self, submission: &str, alternatives: &[String]) -> JudgeVerdict;
}

/// Never reaches a remote service.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineJudge;

#[async_trait]
impl SemanticJudge for OfflineJudge {
    async fn judge(&self, _submission: &str, _alternatives: &[String]) -> JudgeVerdict {
        JudgeVerdict::Unavailable
    }
}

/// Chat-completion backed judge with a hard deadline and no retries.
#[derive(Clone)]
pub struct LlmJudge {
    provider: LLMProvider,
    timeout: Duration,
}

impl LlmJudge {
    pub fn new(provider: LLMProvider, timeout: Duration) -> Self {
        Self {
            provider: provider.with_max_retries(0),
            timeout,
        }
    }
}

#[async_trait]
impl SemanticJudge for LlmJudge {
    async fn judge(&self, submission: &str, alternatives: &[String]) -> JudgeVerdict {
        if !self.provider.is_available() {
            return JudgeVerdict::Unavailable;
        }

        let prompt = judge_prompt(submission, alternatives);
        let call = self
            .provider
            .complete_with_system(JUDGE_SYSTEM_PROMPT, &prompt, JUDGE_OPTIONS);

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(reply)) => {
                let verdict = parse_verdict(&reply);
                if verdict == JudgeVerdict::Unavailable {
                    warn!(reply = %reply, "semantic judge returned an indeterminate reply");
                }
                verdict
            }
            Ok(Err(err)) => {
                warn!(error = %err, "semantic judge unavailable");
                JudgeVerdict::Unavailable
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "semantic judge timed out");
                JudgeVerdict::Unavailable
            }
        }
    }
}

pub fn judge_prompt(submission: &str, alternatives: &[String]) -> String {
    format!(
        "The acceptable English meanings for a Norwegian verb are: {}.\n\
         The student's answer is: '{}'.\n\
         Does the student's answer mean the same as one of the acceptable meanings? \
         Consider synonyms and common variations. Respond with only 'yes' or 'no'.",
        alternatives.join(", "),
        submission.trim()
    )
}

pub fn parse_verdict(reply: &str) -> JudgeVerdict {
    let normalized = reply.trim().to_lowercase();
    let first_word = normalized
        .split(|c: char| !c.is_alphabetic())
        .find(|w| !w.is_empty())
        .unwrap_or("");

    match first_word {
        "yes" => JudgeVerdict::Yes,
        "no" => JudgeVerdict::No,
        _ => JudgeVerdict::Unavailable,
    }
}
