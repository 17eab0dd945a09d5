//! Health probes for LLM backends (Azure AI Foundry, OpenAI, Ollama).
//!
//! - Ollama: `GET {endpoint}/api/tags`
//! - OpenAI / Azure: `GET {models url}` with Bearer auth
//!
//! [`HealthService::check`] never fails; errors are folded into `ok=false`.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};
use crate::services::open_ai_service::api_url;

/// A serializable health snapshot for a single provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub provider: LlmProvider,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.base_url().to_string(),
            model: cfg.model.clone(),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Health checker reusing a single HTTP client.
pub struct HealthService {
    client: reqwest::Client,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds, default 10).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Checks a single config. Never fails.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let start = Instant::now();
        let result = self.probe(cfg).await;
        let latency = start.elapsed().as_millis();

        match result {
            Ok(message) => {
                info!(provider = %cfg.provider, model = %cfg.model, latency_ms = latency, "health probe ok");
                HealthStatus::new(cfg, true, latency, message)
            }
            Err(err) => {
                warn!(provider = %cfg.provider, model = %cfg.model, latency_ms = latency, error = %err, "health probe failed");
                HealthStatus::new(cfg, false, latency, err.to_string())
            }
        }
    }

    /// Checks several configs sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn probe(&self, cfg: &LlmModelConfig) -> Result<String, AiLlmError> {
        let base = cfg.base_url();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(HealthError::InvalidEndpoint(cfg.endpoint.clone()).into());
        }

        let (url, req) = match cfg.provider {
            LlmProvider::Ollama => {
                let url = format!("{base}/api/tags");
                (url.clone(), self.client.get(url))
            }
            LlmProvider::OpenAI | LlmProvider::AzureOpenAI => {
                let key = cfg
                    .api_key
                    .as_deref()
                    .ok_or_else(|| HealthError::Decode("missing API key".into()))?;
                let url = api_url(cfg, "models");
                (url.clone(), self.client.get(url).bearer_auth(key))
            }
        };

        debug!("GET {}", url);
        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet: make_snippet(&text),
            })
            .into());
        }

        let listed = match cfg.provider {
            LlmProvider::Ollama => resp
                .json::<OllamaTags>()
                .await
                .map(|t| t.models.into_iter().map(|m| m.name).collect::<Vec<_>>()),
            _ => resp
                .json::<ModelList>()
                .await
                .map(|m| m.data.into_iter().map(|m| m.id).collect::<Vec<_>>()),
        };

        Ok(match listed {
            Ok(names) if names.iter().any(|n| n == &cfg.model) => "reachable; model is available".into(),
            Ok(_) => "reachable; model not listed".into(),
            Err(e) => format!("reachable; model list not decodable: {e}"),
        })
    }
}

#[derive(Deserialize)]
struct OllamaTag {
    name: String,
}

#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaTag>,
}

#[derive(Deserialize)]
struct ModelItem {
    id: String,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelItem>,
}
