//! Adaptive review engine.
//!
//! - Mastery bookkeeping types and the mastery ratio
//! - Item selection (untested, then weak, then the whole catalog)
//! - Answer grading with swappable meaning-recall strategies
//! - Per-session question state and the one-shot hint token

pub mod grader;
pub mod judge;
pub mod selector;
pub mod session;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

pub use grader::{AnswerGrader, Feedback, MeaningStrategy, MeaningStrategyKind, SubmissionError};
pub use judge::{JudgeVerdict, LlmJudge, OfflineJudge, SemanticJudge};
pub use selector::{SelectError, Selection};
pub use session::{HintToken, PendingQuestion, QuestionPhase, SessionState};
pub use types::{
    mastery_ratio, ExerciseMode, MasteryBucket, MasteryRecord, ModePolicy, VocabularyItem,
};

#[derive(Clone)]
pub struct ReviewEngine {
    grader: AnswerGrader,
}

impl ReviewEngine {
    pub fn new(grader: AnswerGrader) -> Self {
        Self { grader }
    }

    pub fn with_strategy(kind: MeaningStrategyKind, judge: Arc<dyn SemanticJudge>) -> Self {
        Self::new(AnswerGrader::for_kind(kind, judge))
    }

    pub fn grader(&self) -> &AnswerGrader {
        &self.grader
    }

    /// Picks the next item and mode and records it as the session's pending
    /// question. Refused while another question still awaits its answer, so
    /// an armed hint cannot be discarded by asking again.
    pub fn present_next<'a>(
        &self,
        state: &mut SessionState,
        items: &'a [VocabularyItem],
        records: &HashMap<String, MasteryRecord>,
    ) -> Result<(Selection<'a>, PendingQuestion), SelectError> {
        if state.pending.is_some() {
            return Err(SelectError::QuestionPending);
        }
        let mut rng = rand::rng();
        let selection = selector::select_next(items, records, state.policy, &mut rng)?;
        let question = PendingQuestion {
            question_id: uuid::Uuid::new_v4().to_string(),
            item_id: selection.item.id.clone(),
            mode: selection.mode,
        };
        state.present(question.clone());
        Ok((selection, question))
    }

    pub async fn grade_submission(
        &self,
        state: SessionState,
        item: &VocabularyItem,
        answer: &str,
    ) -> Result<(Feedback, PendingQuestion, SessionState), SubmissionError> {
        self.grader.grade_submission(state, item, answer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<VocabularyItem> {
        vec![VocabularyItem {
            id: "spise".into(),
            norwegian: "å spise".into(),
            english_meanings: "to eat".into(),
            past: "spiste".into(),
            past_participle: "spist".into(),
            mnemonic: None,
        }]
    }

    #[tokio::test]
    async fn present_then_grade_round() {
        let engine =
            ReviewEngine::with_strategy(MeaningStrategyKind::Assisted, Arc::new(OfflineJudge));
        let items = catalog();
        let mut state = SessionState::new(ModePolicy::Fixed(ExerciseMode::MeaningRecall));

        let (selection, question) = engine
            .present_next(&mut state, &items, &HashMap::new())
            .unwrap();
        assert_eq!(selection.item.id, "spise");
        assert_eq!(selection.bucket, MasteryBucket::Untested);
        assert_eq!(state.pending.as_ref(), Some(&question));

        let (feedback, _, state) = engine.grade_submission(state, &items[0], "eat").await.unwrap();
        assert!(feedback.correct);
        assert_eq!(state.phase(), QuestionPhase::Graded);
    }

    #[test]
    fn policy_change_keeps_pending_mode() {
        let engine =
            ReviewEngine::with_strategy(MeaningStrategyKind::ExactSet, Arc::new(OfflineJudge));
        let items = catalog();
        let mut state = SessionState::new(ModePolicy::Fixed(ExerciseMode::TenseRecall));

        engine.present_next(&mut state, &items, &HashMap::new()).unwrap();
        state.set_policy(ModePolicy::Fixed(ExerciseMode::SpellingRecall));
        assert_eq!(state.pending.as_ref().map(|p| p.mode), Some(ExerciseMode::TenseRecall));

        state.finish_pending();
        let (selection, _) = engine.present_next(&mut state, &items, &HashMap::new()).unwrap();
        assert_eq!(selection.mode, ExerciseMode::SpellingRecall);
    }

    #[test]
    fn pending_question_blocks_next_and_keeps_hint() {
        let engine =
            ReviewEngine::with_strategy(MeaningStrategyKind::ExactSet, Arc::new(OfflineJudge));
        let items = catalog();
        let mut state = SessionState::new(ModePolicy::Random);

        let (_, question) = engine.present_next(&mut state, &items, &HashMap::new()).unwrap();
        assert!(state.arm_hint());

        let err = engine.present_next(&mut state, &items, &HashMap::new()).unwrap_err();
        assert_eq!(err, SelectError::QuestionPending);
        assert_eq!(state.pending.as_ref(), Some(&question));
        assert!(state.hint.is_armed());
    }
}
