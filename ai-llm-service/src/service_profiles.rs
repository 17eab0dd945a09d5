//! Shared LLM service with one chat profile per configured provider plus an
//! embedding profile.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//! - A chat call may name a provider; otherwise the default provider is used.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{LlmModelConfig, LlmProvider, LlmServiceProfiles};
//!
//! # async fn run() -> Result<(), ai_llm_service::AiLlmError> {
//! let chat = LlmModelConfig {
//!     provider: LlmProvider::Ollama,
//!     model: "qwen3:14b".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     api_key: None,
//!     max_tokens: Some(512),
//!     temperature: Some(0.2),
//!     top_p: None,
//!     timeout_secs: Some(30),
//! };
//! let embedding = LlmModelConfig { model: "nomic-embed-text".into(), ..chat.clone() };
//!
//! let svc = Arc::new(LlmServiceProfiles::new(vec![chat], LlmProvider::Ollama, embedding, Some(10))?);
//! let txt = svc.generate(None, "Hello world", None).await?;
//! let emb = svc.embed("Ferris").await?;
//! println!("{txt} / dim = {}", emb.len());
//! # Ok(()) }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    config::{
        default_config::{chat_configs_from_env, config_embedding, default_provider_from_env},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::{AiLlmError, ConfigError},
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Shared service that routes chat calls to per-provider profiles and owns the
/// embedding profile.
pub struct LlmServiceProfiles {
    chat: HashMap<LlmProvider, LlmModelConfig>,
    default_provider: LlmProvider,
    embedding: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service.
    ///
    /// - `chat`: chat profiles; a later entry for the same provider replaces an earlier one.
    /// - `default_provider`: used when a call does not name one; must be present in `chat`.
    /// - `embedding`: embedding profile.
    /// - `health_timeout_secs`: optional timeout for the health checker.
    pub fn new(
        chat: Vec<LlmModelConfig>,
        default_provider: LlmProvider,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        let chat: HashMap<LlmProvider, LlmModelConfig> =
            chat.into_iter().map(|c| (c.provider, c)).collect();

        if chat.is_empty() {
            return Err(ConfigError::NoChatProvider.into());
        }
        if !chat.contains_key(&default_provider) {
            return Err(ConfigError::ProviderNotConfigured(default_provider).into());
        }
        for cfg in chat.values().chain(std::iter::once(&embedding)) {
            if cfg.model.trim().is_empty() {
                return Err(ConfigError::EmptyModel.into());
            }
        }

        info!(
            default_provider = %default_provider,
            providers = chat.len(),
            embedding_provider = %embedding.provider,
            embedding_model = %embedding.model,
            "LLM profiles initialized"
        );

        Ok(Self {
            chat,
            default_provider,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Builds profiles from environment variables (see [`crate::config::default_config`]).
    pub fn from_env() -> Result<Self, AiLlmError> {
        Self::new(
            chat_configs_from_env()?,
            default_provider_from_env()?,
            config_embedding()?,
            Some(10),
        )
    }

    /// Provider used when a call does not name one.
    pub fn default_provider(&self) -> LlmProvider {
        self.default_provider
    }

    /// Whether a chat profile exists for `provider`.
    pub fn supports(&self, provider: LlmProvider) -> bool {
        self.chat.contains_key(&provider)
    }

    /// Generates text with the chat profile of `provider` (default when `None`).
    ///
    /// # Errors
    /// [`ConfigError::ProviderNotConfigured`] when the provider has no profile,
    /// otherwise whatever the provider client returns.
    pub async fn generate(
        &self,
        provider: Option<LlmProvider>,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        let provider = provider.unwrap_or(self.default_provider);
        let cfg = self
            .chat
            .get(&provider)
            .ok_or(ConfigError::ProviderNotConfigured(provider))?;
        debug!(provider = %provider, model = %cfg.model, "chat generation");

        match cfg.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(cfg).await?;
                cli.generate(prompt, system).await
            }
            LlmProvider::OpenAI | LlmProvider::AzureOpenAI => {
                let cli = self.get_or_init_openai(cfg).await?;
                cli.generate(prompt, system).await
            }
        }
    }

    /// Computes an embedding using the embedding profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match self.embedding.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(&self.embedding).await?;
                cli.embeddings(input).await
            }
            LlmProvider::OpenAI | LlmProvider::AzureOpenAI => {
                let cli = self.get_or_init_openai(&self.embedding).await?;
                cli.embeddings(input).await
            }
        }
    }

    /// Health snapshot for every distinct profile (chat profiles first, default first).
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list: Vec<LlmModelConfig> = Vec::with_capacity(self.chat.len() + 1);
        if let Some(def) = self.chat.get(&self.default_provider) {
            list.push(def.clone());
        }
        for (p, cfg) in &self.chat {
            if *p != self.default_provider {
                list.push(cfg.clone());
            }
        }
        if !list.contains(&self.embedding) {
            list.push(self.embedding.clone());
        }
        self.health.check_many(&list).await
    }

    /* --------------------- Internals --------------------- */

    async fn get_or_init_ollama(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }

    async fn get_or_init_openai(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}
