use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::error::BotError;

/// Settings of the Discord adapter, read once at startup.
#[derive(Clone, Debug)]
pub struct BotConfig {
    pub discord_token: String,
    pub application_id: Option<u64>,
    /// Base URL of the HTTP API, without trailing slash.
    pub backend_url: String,
    pub backend_timeout: Duration,
    pub rag_k: usize,
    pub conversation_ttl: Duration,
    pub max_users: usize,
    /// Characters of the previous answer kept in a follow-up query.
    pub followup_context_chars: usize,
    pub log_dir: PathBuf,
}

impl BotConfig {
    /// # Errors
    /// [`BotError::MissingToken`] without `DISCORD_TOKEN`, [`BotError::Config`]
    /// when a numeric variable does not parse or is zero.
    pub fn from_env() -> Result<Self, BotError> {
        let discord_token = var("DISCORD_TOKEN").ok_or(BotError::MissingToken)?;

        let cfg = Self {
            discord_token,
            application_id: parse_opt("DISCORD_APPLICATION_ID")?,
            backend_url: var("BACKEND_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8000".into())
                .trim_end_matches('/')
                .to_string(),
            backend_timeout: Duration::from_secs(parse_or("BACKEND_TIMEOUT_SECS", 30)?),
            rag_k: parse_or("RAG_K", 4)?,
            conversation_ttl: Duration::from_secs(parse_or("CONVERSATION_TTL_SECS", 3600)?),
            max_users: parse_or("CONVERSATION_MAX_USERS", 10_000)?,
            followup_context_chars: parse_or("FOLLOWUP_CONTEXT_CHARS", 1500)?,
            log_dir: var("LOG_DIR").unwrap_or_else(|| "logs".into()).into(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), BotError> {
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(BotError::Config(format!(
                "BACKEND_URL must start with http:// or https://, got '{}'",
                self.backend_url
            )));
        }
        let zero = [
            ("BACKEND_TIMEOUT_SECS", self.backend_timeout.is_zero()),
            ("RAG_K", self.rag_k == 0),
            ("CONVERSATION_TTL_SECS", self.conversation_ttl.is_zero()),
            ("CONVERSATION_MAX_USERS", self.max_users == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(BotError::Config(format!("{name} must be greater than zero")));
        }
        Ok(())
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_opt<T: FromStr>(name: &str) -> Result<Option<T>, BotError> {
    match var(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| BotError::Config(format!("{name} is not a valid number: '{raw}'"))),
    }
}

fn parse_or<T: FromStr>(name: &str, default: T) -> Result<T, BotError> {
    Ok(parse_opt(name)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BotConfig {
        BotConfig {
            discord_token: "t".into(),
            application_id: None,
            backend_url: "http://127.0.0.1:8000".into(),
            backend_timeout: Duration::from_secs(30),
            rag_k: 4,
            conversation_ttl: Duration::from_secs(3600),
            max_users: 10,
            followup_context_chars: 1500,
            log_dir: "logs".into(),
        }
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(cfg().validate().is_ok());

        let mut c = cfg();
        c.backend_url = "127.0.0.1:8000".into();
        assert!(matches!(c.validate(), Err(BotError::Config(_))));

        let mut c = cfg();
        c.rag_k = 0;
        let err = c.validate().unwrap_err().to_string();
        assert!(err.contains("RAG_K"));
    }
}
