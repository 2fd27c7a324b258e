use serde::{Deserialize, Serialize};

use crate::engine::types::{ExerciseMode, ModePolicy};

/// Spend-once flag set when context was revealed for the pending question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintToken {
    armed: bool,
}

impl HintToken {
    pub fn armed() -> Self {
        Self { armed: true }
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Returns whether the token was armed and clears it.
    pub fn consume(&mut self) -> bool {
        std::mem::take(&mut self.armed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuestion {
    /// Unique per presentation, so a stale retry cannot grade a later
    /// presentation of the same item.
    pub question_id: String,
    pub item_id: String,
    pub mode: ExerciseMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionPhase {
    Idle,
    AwaitingAnswer,
    Graded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub policy: ModePolicy,
    pub pending: Option<PendingQuestion>,
    pub hint: HintToken,
    pub last_graded_question: Option<String>,
}

impl SessionState {
    pub fn new(policy: ModePolicy) -> Self {
        Self {
            policy,
            pending: None,
            hint: HintToken::default(),
            last_graded_question: None,
        }
    }

    pub fn phase(&self) -> QuestionPhase {
        match (&self.pending, &self.last_graded_question) {
            (Some(_), _) => QuestionPhase::AwaitingAnswer,
            (None, Some(_)) => QuestionPhase::Graded,
            (None, None) => QuestionPhase::Idle,
        }
    }

    /// Takes effect from the next presented question; the pending one keeps its mode.
    pub fn set_policy(&mut self, policy: ModePolicy) {
        self.policy = policy;
    }

    /// Sets the pending question with a fresh hint token. Callers present
    /// only once the previous question has been graded.
    pub fn present(&mut self, question: PendingQuestion) {
        self.pending = Some(question);
        self.hint = HintToken::default();
    }

    pub fn arm_hint(&mut self) -> bool {
        if self.pending.is_none() {
            return false;
        }
        self.hint.arm();
        true
    }

    pub(crate) fn finish_pending(&mut self) -> Option<PendingQuestion> {
        let pending = self.pending.take()?;
        self.last_graded_question = Some(pending.question_id.clone());
        Some(pending)
    }
}
