//! Shared LLM access layer for the FAQ RAG backend.
//!
//! - [`config`]: provider enum, per-model config, env-driven constructors
//! - [`services`]: thin HTTP clients (OpenAI-compatible chat for OpenAI/Azure, Ollama)
//! - [`service_profiles`]: one shared facade with chat profiles per provider + embeddings
//! - [`health_service`]: resilient provider probes
//! - [`telemetry`]: tracing layers and subscriber bootstrap for binaries

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, ConfigError};
pub use service_profiles::LlmServiceProfiles;
