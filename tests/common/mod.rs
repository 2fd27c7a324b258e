#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use verb_drill_backend::auth::sign_jwt_hs256;
use verb_drill_backend::db::config::DbConfig;
use verb_drill_backend::db::Database;
use verb_drill_backend::engine::{MeaningStrategyKind, OfflineJudge, ReviewEngine};
use verb_drill_backend::services::hint::HintGenerator;
use verb_drill_backend::state::AppState;
use verb_drill_backend::{create_app, prepare_database};

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    _dir: TempDir,
}

pub async fn create_test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("drill.db").display());
    let db = prepare_database(DbConfig::for_url(url), true)
        .await
        .expect("database");

    let engine = ReviewEngine::with_strategy(MeaningStrategyKind::Assisted, Arc::new(OfflineJudge));
    let state = AppState::new(
        db.clone(),
        engine,
        HintGenerator::offline(),
        Some(TEST_SECRET.to_string()),
    );

    TestApp {
        app: create_app(state),
        db,
        _dir: dir,
    }
}

pub fn token_for(subject: &str) -> String {
    sign_jwt_hs256(
        &serde_json::json!({
            "sub": subject,
            "exp": chrono::Utc::now().timestamp() + 3600,
        }),
        TEST_SECRET,
    )
    .expect("sign token")
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), body).await
    }

    /// Creates a session and returns its id.
    pub async fn start_session(&self, token: &str, mode: &str) -> String {
        let (status, body) = self
            .post("/api/sessions", token, Some(serde_json::json!({ "mode": mode })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn next(&self, token: &str, session_id: &str) -> Value {
        let (status, body) = self
            .post(&format!("/api/sessions/{session_id}/next"), token, None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"].clone()
    }

    pub async fn verb(&self, token: &str, item_id: &str) -> Value {
        let (status, body) = self.get(&format!("/api/verbs/{item_id}"), Some(token)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"].clone()
    }

    pub async fn answer(
        &self,
        token: &str,
        session_id: &str,
        item_id: &str,
        answer: &str,
    ) -> (StatusCode, Value) {
        self.post(
            &format!("/api/sessions/{session_id}/answer"),
            token,
            Some(serde_json::json!({ "itemId": item_id, "answer": answer })),
        )
        .await
    }
}

/// A correct answer for the given question, derived from the verb payload.
pub fn correct_answer(verb: &Value, mode: &str) -> String {
    match mode {
        "meaning-recall" => verb["englishMeanings"]
            .as_str()
            .unwrap()
            .split([',', '/'])
            .next()
            .unwrap()
            .trim()
            .to_string(),
        "spelling-recall" => verb["norwegian"].as_str().unwrap().to_string(),
        "tense-recall" => format!(
            "{}, {}",
            verb["past"].as_str().unwrap(),
            verb["pastParticiple"].as_str().unwrap()
        ),
        other => panic!("unexpected mode {other}"),
    }
}
