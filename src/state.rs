use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::db::Database;
use crate::engine::{LlmJudge, OfflineJudge, ReviewEngine, SemanticJudge};
use crate::services::hint::HintGenerator;
use crate::services::llm_provider::LLMProvider;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    db: Database,
    engine: Arc<ReviewEngine>,
    hints: HintGenerator,
    jwt_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        db: Database,
        engine: ReviewEngine,
        hints: HintGenerator,
        jwt_secret: Option<String>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            db,
            engine: Arc::new(engine),
            hints,
            jwt_secret: jwt_secret.map(Arc::from),
        }
    }

    /// Wires the engine and hint generator to the configured LLM, or to
    /// their offline fallbacks when none is configured.
    pub fn from_config(db: Database, config: &Config) -> Self {
        let provider = LLMProvider::from_env();
        let judge: Arc<dyn SemanticJudge> = if provider.is_available() {
            tracing::info!(model = %provider.config().model, "semantic judge enabled");
            Arc::new(LlmJudge::new(provider.clone(), config.judge_timeout))
        } else {
            tracing::info!("LLM not configured, meaning answers graded offline");
            Arc::new(OfflineJudge)
        };

        let engine = ReviewEngine::with_strategy(config.meaning_strategy, judge);
        tracing::info!(strategy = engine.grader().strategy_name(), "answer grader ready");

        let hint_timeout = provider.config().timeout;
        let hints = HintGenerator::new(provider, hint_timeout);
        Self::new(db, engine, hints, config.jwt_secret.clone())
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn engine(&self) -> &ReviewEngine {
        &self.engine
    }

    pub fn hints(&self) -> &HintGenerator {
        &self.hints
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref()
    }
}
