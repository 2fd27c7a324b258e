use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::engine::judge::{JudgeVerdict, SemanticJudge};
use crate::engine::session::{HintToken, PendingQuestion, SessionState};
use crate::engine::types::{ExerciseMode, VocabularyItem};

pub const CORRECT_MESSAGE: &str = "Correct!";
pub const HINT_USED_MESSAGE: &str =
    "You got a hint for this exercise; this attempt will not count as correct.";
pub const MALFORMED_TENSE_MESSAGE: &str =
    "Please provide both past tense and past participle separated by a comma.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("no question is awaiting an answer")]
    NoPendingQuestion,
    #[error("question for item {expected} is pending, got an answer for {submitted}")]
    QuestionMismatch { expected: String, submitted: String },
    #[error("question was already graded")]
    QuestionAlreadyGraded,
}

/// Outcome of comparing one answer against one item, before hint gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub correct: bool,
    pub displayed_correct_answer: String,
    /// Tense answer without exactly two comma-separated parts.
    pub malformed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub correct: bool,
    pub displayed_correct_answer: String,
    pub hint_used: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeaningStrategyKind {
    ExactSet,
    #[default]
    Assisted,
}

impl MeaningStrategyKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" | "exact-set" => Some(Self::ExactSet),
            "assisted" | "normalized" => Some(Self::Assisted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactSet => "exact-set",
            Self::Assisted => "assisted",
        }
    }
}

#[async_trait]
pub trait MeaningStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn accepts(&self, submission: &str, alternatives: &[String]) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSetStrategy;

#[async_trait]
impl MeaningStrategy for ExactSetStrategy {
    fn name(&self) -> &'static str {
        MeaningStrategyKind::ExactSet.as_str()
    }

    async fn accepts(&self, submission: &str, alternatives: &[String]) -> bool {
        let answer = fold(submission);
        alternatives.iter().any(|alt| fold(alt) == answer)
    }
}

/// Takes the judge's verdict when it has one, otherwise compares offline
/// ignoring a leading "to " on both sides.
#[derive(Clone)]
pub struct NormalizedStrategy {
    judge: Arc<dyn SemanticJudge>,
}

impl NormalizedStrategy {
    pub fn new(judge: Arc<dyn SemanticJudge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl MeaningStrategy for NormalizedStrategy {
    fn name(&self) -> &'static str {
        MeaningStrategyKind::Assisted.as_str()
    }

    async fn accepts(&self, submission: &str, alternatives: &[String]) -> bool {
        if fold(submission).is_empty() {
            return false;
        }

        match self.judge.judge(submission, alternatives).await {
            JudgeVerdict::Yes => true,
            JudgeVerdict::No => false,
            JudgeVerdict::Unavailable => {
                debug!("judge unavailable, grading offline");
                normalized_match(submission, alternatives)
            }
        }
    }
}

#[derive(Clone)]
pub struct AnswerGrader {
    meaning: Arc<dyn MeaningStrategy>,
}

impl AnswerGrader {
    pub fn new(meaning: Arc<dyn MeaningStrategy>) -> Self {
        Self { meaning }
    }

    pub fn for_kind(kind: MeaningStrategyKind, judge: Arc<dyn SemanticJudge>) -> Self {
        match kind {
            MeaningStrategyKind::ExactSet => Self::new(Arc::new(ExactSetStrategy)),
            MeaningStrategyKind::Assisted => Self::new(Arc::new(NormalizedStrategy::new(judge))),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.meaning.name()
    }

    pub async fn grade(&self, answer: &str, mode: ExerciseMode, item: &VocabularyItem) -> Grade {
        let displayed_correct_answer = item.displayed_answer(mode);
        let (correct, malformed) = match mode {
            ExerciseMode::SpellingRecall => (fold(answer) == fold(&item.norwegian), false),
            ExerciseMode::TenseRecall => match grade_tenses(answer, item) {
                Some(correct) => (correct, false),
                None => (false, true),
            },
            ExerciseMode::MeaningRecall => {
                let alternatives = expand_alternatives(&item.english_meanings);
                (self.meaning.accepts(answer, &alternatives).await, false)
            }
        };

        Grade {
            correct,
            displayed_correct_answer,
            malformed,
        }
    }

    /// Grades unless the hint token is armed, in which case the verdict is
    /// incorrect. The token is spent either way.
    pub async fn grade_gated(
        &self,
        hint: &mut HintToken,
        answer: &str,
        mode: ExerciseMode,
        item: &VocabularyItem,
    ) -> Feedback {
        if hint.consume() {
            return Feedback {
                correct: false,
                displayed_correct_answer: item.displayed_answer(mode),
                hint_used: true,
                message: HINT_USED_MESSAGE.to_string(),
            };
        }

        let grade = self.grade(answer, mode, item).await;
        let message = feedback_message(&grade, item);
        Feedback {
            correct: grade.correct,
            displayed_correct_answer: grade.displayed_correct_answer,
            hint_used: false,
            message,
        }
    }

    /// Grades the session's pending question and moves it to the graded
    /// phase. The returned state must replace the caller's copy.
    pub async fn grade_submission(
        &self,
        mut state: SessionState,
        item: &VocabularyItem,
        answer: &str,
    ) -> Result<(Feedback, PendingQuestion, SessionState), SubmissionError> {
        let pending = match &state.pending {
            Some(pending) if pending.item_id == item.id => pending.clone(),
            Some(pending) => {
                return Err(SubmissionError::QuestionMismatch {
                    expected: pending.item_id.clone(),
                    submitted: item.id.clone(),
                })
            }
            None if state.last_graded_question.is_some() => {
                return Err(SubmissionError::QuestionAlreadyGraded)
            }
            None => return Err(SubmissionError::NoPendingQuestion),
        };

        let feedback = self
            .grade_gated(&mut state.hint, answer, pending.mode, item)
            .await;
        state.finish_pending();

        Ok((feedback, pending, state))
    }
}

fn feedback_message(grade: &Grade, item: &VocabularyItem) -> String {
    if grade.correct {
        return CORRECT_MESSAGE.to_string();
    }
    if grade.malformed {
        return MALFORMED_TENSE_MESSAGE.to_string();
    }
    match item.mnemonic() {
        Some(mnemonic) => format!(
            "Incorrect. The correct answer is: {} Mnemonic: {}",
            grade.displayed_correct_answer, mnemonic
        ),
        None => format!("Incorrect. The correct answer is: {}", grade.displayed_correct_answer),
    }
}

/// `None` when the answer does not have exactly two parts.
fn grade_tenses(answer: &str, item: &VocabularyItem) -> Option<bool> {
    let parts: Vec<String> = answer.split(',').map(fold).collect();
    let [past, participle] = parts.as_slice() else {
        return None;
    };
    Some(*past == fold(&item.past) && *participle == fold(&item.past_participle))
}

/// Flattens `"to make/to create, to do"` into every acceptable phrasing.
pub fn expand_alternatives(meanings: &str) -> Vec<String> {
    meanings
        .split(',')
        .flat_map(|slot| slot.split('/'))
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn strip_infinitive(value: &str) -> String {
    let folded = fold(value);
    match folded.strip_prefix("to ") {
        Some(rest) => rest.trim_start().to_string(),
        None => folded,
    }
}

pub fn normalized_match(submission: &str, alternatives: &[String]) -> bool {
    let answer = strip_infinitive(submission);
    !answer.is_empty() && alternatives.iter().any(|alt| strip_infinitive(alt) == answer)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::engine::judge::OfflineJudge;
    use crate::engine::types::ModePolicy;

    struct FixedJudge {
        verdict: JudgeVerdict,
        calls: AtomicUsize,
    }

    impl FixedJudge {
        fn new(verdict: JudgeVerdict) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SemanticJudge for FixedJudge {
        async fn judge(&self, _submission: &str, _alternatives: &[String]) -> JudgeVerdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict
        }
    }

    fn gjore() -> VocabularyItem {
        VocabularyItem {
            id: "gjore".into(),
            norwegian: "å gjøre".into(),
            english_meanings: "to make, to do".into(),
            past: "gjorde".into(),
            past_participle: "gjort".into(),
            mnemonic: Some("Gjøre sounds like 'do-er'".into()),
        }
    }

    fn exact() -> AnswerGrader {
        AnswerGrader::for_kind(MeaningStrategyKind::ExactSet, Arc::new(OfflineJudge))
    }

    fn offline_assisted() -> AnswerGrader {
        AnswerGrader::for_kind(MeaningStrategyKind::Assisted, Arc::new(OfflineJudge))
    }

    fn pending_for(item: &VocabularyItem, mode: ExerciseMode) -> SessionState {
        let mut state = SessionState::new(ModePolicy::Fixed(mode));
        state.present(PendingQuestion {
            question_id: "q1".into(),
            item_id: item.id.clone(),
            mode,
        });
        state
    }

    #[test]
    fn alternatives_are_flattened() {
        assert_eq!(
            expand_alternatives("to make/to create, to do ,"),
            vec!["to make", "to create", "to do"]
        );
    }

    #[tokio::test]
    async fn exact_set_rejects_missing_infinitive_marker() {
        let grade = exact().grade("do", ExerciseMode::MeaningRecall, &gjore()).await;
        assert!(!grade.correct);
        assert_eq!(grade.displayed_correct_answer, "to make, to do");
    }

    #[tokio::test]
    async fn exact_set_accepts_case_and_whitespace_variants() {
        let grade = exact().grade("  To Do ", ExerciseMode::MeaningRecall, &gjore()).await;
        assert!(grade.correct);
    }

    #[tokio::test]
    async fn normalized_accepts_missing_infinitive_marker() {
        let grade = offline_assisted().grade("do", ExerciseMode::MeaningRecall, &gjore()).await;
        assert!(grade.correct);
    }

    #[tokio::test]
    async fn normalized_strips_marker_from_submission_too() {
        let mut item = gjore();
        item.english_meanings = "insert".into();
        let grade = offline_assisted().grade("to insert", ExerciseMode::MeaningRecall, &item).await;
        assert!(grade.correct);
    }

    #[tokio::test]
    async fn judge_verdict_is_asked_first() {
        let judge = FixedJudge::new(JudgeVerdict::Yes);
        let grader = AnswerGrader::for_kind(MeaningStrategyKind::Assisted, judge.clone());

        assert!(grader.grade("perform", ExerciseMode::MeaningRecall, &gjore()).await.correct);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn judge_no_rejects() {
        let judge = FixedJudge::new(JudgeVerdict::No);
        let grader = AnswerGrader::for_kind(MeaningStrategyKind::Assisted, judge.clone());
        assert!(!grader.grade("eat", ExerciseMode::MeaningRecall, &gjore()).await.correct);
        assert!(!grader.grade("do", ExerciseMode::MeaningRecall, &gjore()).await.correct);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unavailable_judge_falls_back_to_offline() {
        let grader = AnswerGrader::for_kind(
            MeaningStrategyKind::Assisted,
            FixedJudge::new(JudgeVerdict::Unavailable),
        );
        assert!(!grader.grade("perform", ExerciseMode::MeaningRecall, &gjore()).await.correct);
        assert!(grader.grade("make", ExerciseMode::MeaningRecall, &gjore()).await.correct);
    }

    #[tokio::test]
    async fn blank_answer_never_reaches_judge() {
        let judge = FixedJudge::new(JudgeVerdict::Yes);
        let grader = AnswerGrader::for_kind(MeaningStrategyKind::Assisted, judge.clone());
        assert!(!grader.grade("   ", ExerciseMode::MeaningRecall, &gjore()).await.correct);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tense_recall_is_case_insensitive() {
        let grade = exact().grade("Gjorde, Gjort", ExerciseMode::TenseRecall, &gjore()).await;
        assert!(grade.correct);
        assert_eq!(grade.displayed_correct_answer, "gjorde, gjort");
    }

    #[tokio::test]
    async fn tense_recall_requires_order() {
        let grade = exact().grade("gjort, gjorde", ExerciseMode::TenseRecall, &gjore()).await;
        assert!(!grade.correct);
        assert!(!grade.malformed);
    }

    #[tokio::test]
    async fn malformed_tense_answer_is_incorrect() {
        for answer in ["gjorde", "gjorde, gjort, gjør", ""] {
            let grade = exact().grade(answer, ExerciseMode::TenseRecall, &gjore()).await;
            assert!(!grade.correct, "{answer:?}");
            assert!(grade.malformed, "{answer:?}");
        }
    }

    #[tokio::test]
    async fn spelling_recall_ignores_surrounding_whitespace() {
        let grade = exact().grade(" å gjøre ", ExerciseMode::SpellingRecall, &gjore()).await;
        assert!(grade.correct);
        assert_eq!(grade.displayed_correct_answer, "å gjøre");
    }

    #[tokio::test]
    async fn grading_is_repeatable_without_hint() {
        let grader = offline_assisted();
        let mut token = HintToken::default();
        let first = grader
            .grade_gated(&mut token, "do", ExerciseMode::MeaningRecall, &gjore())
            .await;
        let second = grader
            .grade_gated(&mut token, "do", ExerciseMode::MeaningRecall, &gjore())
            .await;
        assert_eq!(first, second);
        assert!(first.correct);
    }

    #[tokio::test]
    async fn hint_forces_incorrect_once() {
        let grader = offline_assisted();
        let mut token = HintToken::armed();

        let gated = grader
            .grade_gated(&mut token, "do", ExerciseMode::MeaningRecall, &gjore())
            .await;
        assert!(!gated.correct);
        assert!(gated.hint_used);
        assert_eq!(gated.message, HINT_USED_MESSAGE);

        let ungated = grader
            .grade_gated(&mut token, "do", ExerciseMode::MeaningRecall, &gjore())
            .await;
        assert!(ungated.correct);
        assert!(!ungated.hint_used);
    }

    #[tokio::test]
    async fn incorrect_feedback_includes_mnemonic() {
        let mut token = HintToken::default();
        let feedback = exact()
            .grade_gated(&mut token, "å lage", ExerciseMode::SpellingRecall, &gjore())
            .await;
        assert_eq!(
            feedback.message,
            "Incorrect. The correct answer is: å gjøre Mnemonic: Gjøre sounds like 'do-er'"
        );
    }

    #[tokio::test]
    async fn malformed_tense_feedback_asks_for_both_forms() {
        let mut token = HintToken::default();
        let feedback = exact()
            .grade_gated(&mut token, "gjorde", ExerciseMode::TenseRecall, &gjore())
            .await;
        assert_eq!(feedback.message, MALFORMED_TENSE_MESSAGE);
    }

    #[tokio::test]
    async fn submission_uses_pending_mode_and_finishes_question() {
        let item = gjore();
        let state = pending_for(&item, ExerciseMode::TenseRecall);

        let (feedback, pending, next) = exact()
            .grade_submission(state, &item, "gjorde, gjort")
            .await
            .unwrap();
        assert!(feedback.correct);
        assert_eq!(pending.mode, ExerciseMode::TenseRecall);
        assert!(next.pending.is_none());
        assert_eq!(next.last_graded_question.as_deref(), Some("q1"));
    }

    #[tokio::test]
    async fn question_cannot_be_graded_twice() {
        let item = gjore();
        let state = pending_for(&item, ExerciseMode::SpellingRecall);
        let (_, _, next) = exact().grade_submission(state, &item, "å gjøre").await.unwrap();

        let err = exact().grade_submission(next, &item, "å gjøre").await.unwrap_err();
        assert_eq!(err, SubmissionError::QuestionAlreadyGraded);
    }

    #[tokio::test]
    async fn submission_for_other_item_is_rejected() {
        let item = gjore();
        let state = pending_for(&item, ExerciseMode::SpellingRecall);
        let mut other = gjore();
        other.id = "lage".into();

        let err = exact().grade_submission(state, &other, "å lage").await.unwrap_err();
        assert!(matches!(err, SubmissionError::QuestionMismatch { .. }));
    }

    #[tokio::test]
    async fn submission_without_question_is_rejected() {
        let state = SessionState::new(ModePolicy::Random);
        let err = exact().grade_submission(state, &gjore(), "x").await.unwrap_err();
        assert_eq!(err, SubmissionError::NoPendingQuestion);
    }

    #[tokio::test]
    async fn hinted_submission_clears_token() {
        let item = gjore();
        let mut state = pending_for(&item, ExerciseMode::SpellingRecall);
        state.arm_hint();

        let (feedback, _, next) = exact()
            .grade_submission(state, &item, "å gjøre")
            .await
            .unwrap();
        assert!(!feedback.correct);
        assert!(feedback.hint_used);
        assert!(!next.hint.is_armed());
    }
}
