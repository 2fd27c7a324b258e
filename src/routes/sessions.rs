use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::operations::sessions::StudySession;
use crate::engine::{ExerciseMode, ModePolicy, QuestionPhase};
use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::drill;
use crate::state::AppState;

const MAX_ANSWER_LEN: usize = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModeRequest {
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    item_id: String,
    #[serde(default)]
    question_id: Option<String>,
    answer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionDto {
    id: String,
    mode: ModePolicy,
    phase: QuestionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_mode: Option<ExerciseMode>,
    hint_armed: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<StudySession> for SessionDto {
    fn from(session: StudySession) -> Self {
        let phase = session.state.phase();
        let pending = session.state.pending;
        Self {
            id: session.id,
            mode: session.state.policy,
            phase,
            pending_item_id: pending.as_ref().map(|p| p.item_id.clone()),
            pending_mode: pending.as_ref().map(|p| p.mode),
            hint_armed: session.state.hint.is_armed(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct HintDto {
    hint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndedDto {
    ended: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/:id", get(get_session).delete(end_session))
        .route("/:id/mode", put(change_mode))
        .route("/:id/next", post(next_question))
        .route("/:id/hint", post(reveal_hint))
        .route("/:id/answer", post(submit_answer))
}

fn parse_policy(raw: Option<&str>) -> Result<ModePolicy, AppError> {
    match raw {
        None => Ok(ModePolicy::default()),
        Some(raw) => ModePolicy::parse(raw).ok_or_else(|| {
            AppError::validation(format!(
                "mode must be one of random, meaning-recall, spelling-recall, \
                 tense-recall (got {raw:?})"
            ))
        }),
    }
}

async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<ModeRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(payload) = payload.unwrap_or_default();
    let policy = parse_policy(payload.mode.as_deref())?;

    let session = drill::start_session(state.db().pool(), &user.id, policy).await?;
    Ok((StatusCode::CREATED, ok(SessionDto::from(session))))
}

async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let session = drill::get_session(state.db().pool(), &id, &user.id).await?;
    Ok(ok(SessionDto::from(session)))
}

async fn change_mode(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<ModeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let Some(raw) = payload.mode.as_deref() else {
        return Err(AppError::validation("mode is required"));
    };
    let policy = parse_policy(Some(raw))?;

    let session = drill::change_mode(state.db().pool(), &id, &user.id, policy).await?;
    Ok(ok(SessionDto::from(session)))
}

async fn end_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    drill::end_session(state.db().pool(), &id, &user.id).await?;
    Ok(ok(EndedDto { ended: true }))
}

async fn next_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let question = drill::next_question(state.db().pool(), state.engine(), &id, &user.id).await?;
    Ok(ok(question))
}

async fn reveal_hint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let hint = drill::reveal_hint(state.db().pool(), state.hints(), &id, &user.id).await?;
    Ok(ok(HintDto { hint }))
}

async fn submit_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;

    if payload.item_id.trim().is_empty() {
        return Err(AppError::validation("itemId is required"));
    }
    if payload.answer.chars().count() > MAX_ANSWER_LEN {
        return Err(AppError::validation(format!(
            "answer must be at most {MAX_ANSWER_LEN} characters"
        )));
    }

    let outcome = drill::submit_answer(
        state.db().pool(),
        state.engine(),
        &id,
        &user.id,
        payload.item_id.trim(),
        payload.question_id.as_deref(),
        &payload.answer,
    )
    .await?;
    Ok(ok(outcome))
}
