//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use crate::error::ContextorError;

/// Knobs of the orchestrator. All fields have defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextorConfig {
    /// k when the request does not specify one.
    pub default_k: usize,
    /// Requests above this k are clamped down to it.
    pub max_k: usize,
    /// Evidence guardrail: the top hit must score at least this much.
    pub min_score: f32,
    pub retrieval_timeout: Duration,
    pub generation_timeout: Duration,
    /// Character budget of the context block in the prompt.
    pub max_context_chars: usize,
    /// Longer queries are rejected as validation errors.
    pub max_query_chars: usize,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            default_k: 4,
            max_k: 20,
            min_score: 0.55,
            retrieval_timeout: Duration::from_secs(15),
            generation_timeout: Duration::from_secs(30),
            max_context_chars: 12_000,
            max_query_chars: 4_000,
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables on top of [`Default`].
    ///
    /// `RAG_DEFAULT_K`, `RAG_MAX_K`, `RAG_MIN_SCORE`, `RAG_RETRIEVAL_TIMEOUT_SECS`,
    /// `RAG_GENERATION_TIMEOUT_SECS`, `RAG_MAX_CONTEXT_CHARS`, `MAX_QUERY_CHARS`.
    ///
    /// # Errors
    /// [`ContextorError::Config`] when a value does not parse or the result is inconsistent.
    pub fn from_env() -> Result<Self, ContextorError> {
        let d = Self::default();
        let cfg = Self {
            default_k: parse("RAG_DEFAULT_K", d.default_k)?,
            max_k: parse("RAG_MAX_K", d.max_k)?,
            min_score: parse("RAG_MIN_SCORE", d.min_score)?,
            retrieval_timeout: Duration::from_secs(parse(
                "RAG_RETRIEVAL_TIMEOUT_SECS",
                d.retrieval_timeout.as_secs(),
            )?),
            generation_timeout: Duration::from_secs(parse(
                "RAG_GENERATION_TIMEOUT_SECS",
                d.generation_timeout.as_secs(),
            )?),
            max_context_chars: parse("RAG_MAX_CONTEXT_CHARS", d.max_context_chars)?,
            max_query_chars: parse("MAX_QUERY_CHARS", d.max_query_chars)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ContextorError> {
        if self.default_k == 0 || self.max_k == 0 {
            return Err(ContextorError::Config("k values must be > 0".into()));
        }
        if self.default_k > self.max_k {
            return Err(ContextorError::Config(format!(
                "RAG_DEFAULT_K ({}) exceeds RAG_MAX_K ({})",
                self.default_k, self.max_k
            )));
        }
        if !self.min_score.is_finite() {
            return Err(ContextorError::Config("RAG_MIN_SCORE must be finite".into()));
        }
        if self.retrieval_timeout.is_zero() || self.generation_timeout.is_zero() {
            return Err(ContextorError::Config("timeouts must be > 0".into()));
        }
        if self.max_query_chars == 0 {
            return Err(ContextorError::Config("MAX_QUERY_CHARS must be > 0".into()));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> Result<T, ContextorError> {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| ContextorError::Config(format!("{k} has an invalid value `{v}`"))),
        _ => Ok(dflt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ContextorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.default_k, 4);
        assert_eq!(cfg.generation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn default_k_above_max_is_rejected() {
        let cfg = ContextorConfig {
            default_k: 30,
            ..ContextorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ContextorError::Config(_))));
    }
}
