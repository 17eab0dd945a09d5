use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for large language model (LLM) inference.
///
/// This enum distinguishes between the hosted Azure AI Foundry deployment,
/// the public OpenAI API and a local Ollama runtime.
///
/// # Examples
///
/// ```
/// use ai_llm_service::LlmProvider;
///
/// let p: LlmProvider = "azure".parse().unwrap();
/// assert_eq!(p, LlmProvider::AzureOpenAI);
/// assert_eq!(p.as_str(), "azure");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Azure AI Foundry / Azure OpenAI deployment (OpenAI-compatible `/openai/v1`).
    #[serde(rename = "azure")]
    AzureOpenAI,
    /// OpenAI's public API.
    #[serde(rename = "openai")]
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

impl LlmProvider {
    /// Stable lowercase name used in configs, JSON payloads and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::AzureOpenAI => "azure",
            LlmProvider::OpenAI => "openai",
            LlmProvider::Ollama => "ollama",
        }
    }

    /// True for providers speaking the OpenAI chat-completions dialect.
    pub fn is_openai_compatible(&self) -> bool {
        matches!(self, LlmProvider::AzureOpenAI | LlmProvider::OpenAI)
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" | "azure_openai" | "azure-openai" | "foundry" => Ok(LlmProvider::AzureOpenAI),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!("Azure".parse::<LlmProvider>().unwrap(), LlmProvider::AzureOpenAI);
        assert_eq!("azure-openai".parse::<LlmProvider>().unwrap(), LlmProvider::AzureOpenAI);
        assert_eq!("ChatGPT".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAI);
        assert_eq!(" ollama ".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = "anthropic".parse::<LlmProvider>().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProvider(ref p) if p == "anthropic"));
    }

    #[test]
    fn serde_uses_short_names() {
        let json = serde_json::to_string(&LlmProvider::AzureOpenAI).unwrap();
        assert_eq!(json, "\"azure\"");
        let back: LlmProvider = serde_json::from_str("\"ollama\"").unwrap();
        assert_eq!(back, LlmProvider::Ollama);
    }
}
