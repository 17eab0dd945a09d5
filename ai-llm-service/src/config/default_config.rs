//! Default LLM configs loaded strictly from environment variables.
//!
//! Chat profiles are optional per provider; at least one must be present and
//! the default provider (`LLM_PROVIDER`, `azure` when unset) must be among them.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_PROVIDER`      = default chat provider (`azure`, `openai`, `ollama`)
//! - `LLM_MAX_TOKENS`    = optional max tokens (u32)
//! - `LLM_TIMEOUT_SECS`  = per-request timeout for chat calls (default 30)
//!
//! Azure AI Foundry:
//! - `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY` (both required to enable)
//! - `AZURE_OPENAI_MODEL` deployment name (default `DeepSeek-R1`)
//!
//! OpenAI:
//! - `OPENAI_API_KEY` (enables the profile), `OPENAI_MODEL` (default `gpt-4o-mini`),
//!   `OPENAI_BASE_URL` (default `https://api.openai.com`)
//!
//! Ollama:
//! - `OLLAMA_MODEL` (enables the profile), `OLLAMA_URL` or `OLLAMA_PORT`
//!
//! Embeddings:
//! - `EMBEDDING_PROVIDER` (default `ollama`), `EMBEDDING_MODEL` (required)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt, env_opt_u32, env_opt_u64, must_env,
        validate_http_endpoint,
    },
};

/// Default deadline for a single chat call.
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 30;

/// Default temperature for grounded answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Resolves the Ollama endpoint from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
/// 3. `http://localhost:11434`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = env_opt("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = env_opt("OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Ok("http://localhost:11434".to_string())
}

fn chat_timeout() -> Result<u64, AiLlmError> {
    Ok(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS))
}

/// Chat config for the Azure AI Foundry deployment, if `AZURE_OPENAI_ENDPOINT` is set.
///
/// # Errors
/// - [`ConfigError::MissingVar`] if the endpoint is set but the API key is not
/// - [`ConfigError::InvalidFormat`] if the endpoint is not http(s)
pub fn config_azure_chat() -> Result<Option<LlmModelConfig>, AiLlmError> {
    let Some(endpoint) = env_opt("AZURE_OPENAI_ENDPOINT") else {
        return Ok(None);
    };
    validate_http_endpoint("AZURE_OPENAI_ENDPOINT", &endpoint)?;
    let api_key = must_env("AZURE_OPENAI_API_KEY")?;

    Ok(Some(LlmModelConfig {
        provider: LlmProvider::AzureOpenAI,
        model: env_opt("AZURE_OPENAI_MODEL").unwrap_or_else(|| "DeepSeek-R1".to_string()),
        endpoint,
        api_key: Some(api_key),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(DEFAULT_TEMPERATURE),
        top_p: None,
        timeout_secs: Some(chat_timeout()?),
    }))
}

/// Chat config for the public OpenAI API, if `OPENAI_API_KEY` is set.
pub fn config_openai_chat() -> Result<Option<LlmModelConfig>, AiLlmError> {
    let Some(api_key) = env_opt("OPENAI_API_KEY") else {
        return Ok(None);
    };
    let endpoint = env_opt("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com".into());
    validate_http_endpoint("OPENAI_BASE_URL", &endpoint)?;

    Ok(Some(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: env_opt("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
        endpoint,
        api_key: Some(api_key),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(DEFAULT_TEMPERATURE),
        top_p: None,
        timeout_secs: Some(chat_timeout()?),
    }))
}

/// Chat config for a local Ollama model, if `OLLAMA_MODEL` is set.
pub fn config_ollama_chat() -> Result<Option<LlmModelConfig>, AiLlmError> {
    let Some(model) = env_opt("OLLAMA_MODEL") else {
        return Ok(None);
    };

    Ok(Some(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint: ollama_endpoint()?,
        api_key: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(DEFAULT_TEMPERATURE),
        top_p: None,
        timeout_secs: Some(chat_timeout()?),
    }))
}

/// All chat configs that the environment enables.
pub fn chat_configs_from_env() -> Result<Vec<LlmModelConfig>, AiLlmError> {
    let list: Vec<LlmModelConfig> = [config_azure_chat()?, config_openai_chat()?, config_ollama_chat()?]
        .into_iter()
        .flatten()
        .collect();
    if list.is_empty() {
        return Err(ConfigError::NoChatProvider.into());
    }
    Ok(list)
}

/// Default provider from `LLM_PROVIDER` (falls back to `azure`).
pub fn default_provider_from_env() -> Result<LlmProvider, AiLlmError> {
    match env_opt("LLM_PROVIDER") {
        Some(v) => Ok(v.parse::<LlmProvider>()?),
        None => Ok(LlmProvider::AzureOpenAI),
    }
}

/// Constructs the **embedding** config.
///
/// The embedding provider reuses the chat credentials of the same provider
/// (Azure/OpenAI) or the Ollama endpoint.
///
/// # Env
/// - `EMBEDDING_PROVIDER` (default `ollama`)
/// - `EMBEDDING_MODEL` (required)
///
/// # Defaults
/// - `temperature = Some(0.0)` (deterministic)
/// - `timeout_secs = Some(30)`
pub fn config_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let provider = match env_opt("EMBEDDING_PROVIDER") {
        Some(v) => v.parse::<LlmProvider>()?,
        None => LlmProvider::Ollama,
    };
    let model = must_env("EMBEDDING_MODEL")?;

    let (endpoint, api_key) = match provider {
        LlmProvider::Ollama => (ollama_endpoint()?, None),
        LlmProvider::AzureOpenAI => {
            let endpoint = must_env("AZURE_OPENAI_ENDPOINT")?;
            validate_http_endpoint("AZURE_OPENAI_ENDPOINT", &endpoint)?;
            (endpoint, Some(must_env("AZURE_OPENAI_API_KEY")?))
        }
        LlmProvider::OpenAI => (
            env_opt("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com".into()),
            Some(must_env("OPENAI_API_KEY")?),
        ),
    };

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}
