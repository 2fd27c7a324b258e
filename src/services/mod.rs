pub mod drill;
pub mod hint;
pub mod llm_provider;
pub mod progress;
