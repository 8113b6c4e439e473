//! Coach pipeline: onboarding extraction, intent classification, and
//! confirmation-gated actions for a student budgeting assistant.

pub mod actions;
pub mod chat;
pub mod config;
pub mod error;
pub mod extraction;
pub mod intent;
pub mod llm;
pub mod onboarding;
pub mod store;

pub use chat::{ChatPipeline, ResponseSource, TurnRequest, TurnResponse};
pub use config::{LlmSettings, PipelineConfig};
pub use error::{Error, Result};
