use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::db::operations::{catalog, mastery, sessions};
use crate::db::operations::sessions::StudySession;
use crate::engine::{
    ExerciseMode, Feedback, MasteryBucket, MasteryRecord, ModePolicy, ReviewEngine, SelectError,
    SubmissionError,
};
use crate::services::hint::HintGenerator;

/// Reloads allowed when the hint flag changes between grading and commit.
const MAX_GRADE_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum DrillError {
    #[error("session not found")]
    SessionNotFound,
    #[error("session belongs to another user")]
    SessionForbidden,
    #[error("verb not found: {0}")]
    ItemNotFound(String),
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("session kept changing while grading")]
    Contention,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedQuestion {
    pub question_id: String,
    pub item_id: String,
    pub mode: ExerciseMode,
    pub prompt: String,
    pub bucket: MasteryBucket,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub mastery: MasteryRecord,
}

pub async fn start_session(
    pool: &SqlitePool,
    user_id: &str,
    policy: ModePolicy,
) -> Result<StudySession, DrillError> {
    let session = sessions::create_session(pool, user_id, policy).await?;
    info!(user_id, session_id = %session.id, policy = policy.as_str(), "study session started");
    Ok(session)
}

pub async fn get_session(
    pool: &SqlitePool,
    session_id: &str,
    user_id: &str,
) -> Result<StudySession, DrillError> {
    let session = sessions::find_session(pool, session_id)
        .await?
        .ok_or(DrillError::SessionNotFound)?;
    if session.user_id != user_id {
        return Err(DrillError::SessionForbidden);
    }
    Ok(session)
}

/// Applies from the next presented question on.
pub async fn change_mode(
    pool: &SqlitePool,
    session_id: &str,
    user_id: &str,
    policy: ModePolicy,
) -> Result<StudySession, DrillError> {
    let mut session = get_session(pool, session_id, user_id).await?;
    if !sessions::update_policy(pool, session_id, policy).await? {
        return Err(DrillError::SessionNotFound);
    }
    session.state.set_policy(policy);
    debug!(session_id, policy = policy.as_str(), "session mode changed");
    Ok(session)
}

pub async fn end_session(
    pool: &SqlitePool,
    session_id: &str,
    user_id: &str,
) -> Result<(), DrillError> {
    get_session(pool, session_id, user_id).await?;
    sessions::delete_session(pool, session_id).await?;
    info!(user_id, session_id, "study session ended");
    Ok(())
}

pub async fn next_question(
    pool: &SqlitePool,
    engine: &ReviewEngine,
    session_id: &str,
    user_id: &str,
) -> Result<PresentedQuestion, DrillError> {
    let session = get_session(pool, session_id, user_id).await?;
    let items = catalog::list_items(pool).await?;
    let records = mastery::records_by_item(pool, user_id).await?;

    let mut state = session.state;
    let (selection, question) = engine
        .present_next(&mut state, &items, &records)
        .inspect_err(|err| match err {
            SelectError::EmptyCatalog => {
                error!(session_id, error = %err, "cannot select next verb")
            }
            SelectError::QuestionPending => debug!(session_id, "next refused, answer pending"),
        })?;

    if !sessions::save_presented(pool, session_id, &question).await? {
        // Another request presented a question since the session was loaded.
        return match sessions::find_session(pool, session_id).await? {
            Some(current) if current.state.pending.is_some() => {
                Err(SelectError::QuestionPending.into())
            }
            _ => Err(DrillError::SessionNotFound),
        };
    }

    info!(
        user_id,
        item_id = %question.item_id,
        mode = question.mode.as_str(),
        bucket = selection.bucket.as_str(),
        "question presented"
    );

    Ok(PresentedQuestion {
        prompt: selection.item.prompt(question.mode).to_string(),
        question_id: question.question_id,
        item_id: question.item_id,
        mode: question.mode,
        bucket: selection.bucket,
    })
}

/// Arms the hint token for the pending question and returns extra context
/// for it.
pub async fn reveal_hint(
    pool: &SqlitePool,
    hints: &HintGenerator,
    session_id: &str,
    user_id: &str,
) -> Result<String, DrillError> {
    let session = get_session(pool, session_id, user_id).await?;
    let pending = session
        .state
        .pending
        .ok_or(SubmissionError::NoPendingQuestion)?;

    let item = catalog::find_item(pool, &pending.item_id)
        .await?
        .ok_or_else(|| DrillError::ItemNotFound(pending.item_id.clone()))?;

    // Armed before generating so a slow hint still counts against the answer.
    if !sessions::arm_hint(pool, session_id, &pending.question_id).await? {
        return Err(SubmissionError::QuestionAlreadyGraded.into());
    }
    debug!(session_id, item_id = %item.id, "hint token armed");

    Ok(hints.generate(&item).await)
}

/// Grades the answer and counts it exactly once. `question_id`, when given,
/// pins the answer to one presented question so stale retries are refused.
pub async fn submit_answer(
    pool: &SqlitePool,
    engine: &ReviewEngine,
    session_id: &str,
    user_id: &str,
    item_id: &str,
    question_id: Option<&str>,
    answer: &str,
) -> Result<AnswerOutcome, DrillError> {
    let item = catalog::find_item(pool, item_id)
        .await?
        .ok_or_else(|| DrillError::ItemNotFound(item_id.to_string()))?;

    for attempt in 0..MAX_GRADE_ATTEMPTS {
        let session = get_session(pool, session_id, user_id).await?;
        if let Some(expected) = question_id {
            check_question_pin(&session, expected)?;
        }
        let hint_armed = session.state.hint.is_armed();

        let (feedback, pending, _) = engine
            .grade_submission(session.state, &item, answer)
            .await?;

        let mut tx = pool.begin().await?;
        let swapped =
            sessions::complete_question(&mut *tx, session_id, &pending.question_id, hint_armed)
                .await?;
        if !swapped {
            tx.rollback().await?;
            warn!(session_id, attempt, "pending question changed during grading, reloading");
            continue;
        }
        let record = mastery::record_attempt(&mut *tx, user_id, &item.id, feedback.correct).await?;
        tx.commit().await?;

        info!(
            user_id,
            item_id = %item.id,
            mode = pending.mode.as_str(),
            correct = feedback.correct,
            hint_used = feedback.hint_used,
            total_attempts = record.total_attempts,
            "answer graded"
        );

        return Ok(AnswerOutcome {
            feedback,
            mastery: record,
        });
    }

    Err(DrillError::Contention)
}

fn check_question_pin(session: &StudySession, expected: &str) -> Result<(), SubmissionError> {
    match &session.state.pending {
        Some(pending) if pending.question_id == expected => Ok(()),
        _ if session.state.last_graded_question.as_deref() == Some(expected) => {
            Err(SubmissionError::QuestionAlreadyGraded)
        }
        Some(_) => Err(SubmissionError::QuestionAlreadyGraded),
        None => Err(SubmissionError::NoPendingQuestion),
    }
}
