use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use contextor::RagOrchestrator;

use crate::core::stats::ServerStats;
use crate::error_handler::AppError;

pub const DEFAULT_API_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Retrieve → generate pipeline.
    pub orchestrator: Arc<RagOrchestrator>,
    /// Process-wide request and error counters.
    pub stats: ServerStats,
}

impl AppState {
    pub fn new(orchestrator: Arc<RagOrchestrator>) -> Self {
        Self {
            orchestrator,
            stats: ServerStats::new(),
        }
    }

    /// Wires the production pipeline from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        let orchestrator = RagOrchestrator::from_env()?;
        Ok(Self::new(Arc::new(orchestrator)))
    }
}

/// Process-level settings of the HTTP server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// `host:port` to bind.
    pub address: String,
    /// Directory of the JSON log file.
    pub log_dir: PathBuf,
}

impl ApiConfig {
    /// Reads `API_ADDRESS` and `LOG_DIR`.
    ///
    /// # Errors
    /// [`AppError::Config`] when `API_ADDRESS` is not a socket address.
    pub fn from_env() -> Result<Self, AppError> {
        let address = std::env::var("API_ADDRESS")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_ADDRESS.to_string());
        let log_dir = std::env::var("LOG_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        let cfg = Self {
            address: address.trim().to_string(),
            log_dir: PathBuf::from(log_dir),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.address.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("API_ADDRESS '{}' is not host:port: {e}", self.address))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_must_be_socket_addr() {
        let ok = ApiConfig {
            address: "0.0.0.0:8000".into(),
            log_dir: DEFAULT_LOG_DIR.into(),
        };
        assert!(ok.validate().is_ok());

        let bad = ApiConfig {
            address: "localhost".into(),
            ..ok
        };
        assert!(matches!(bad.validate(), Err(AppError::Config(_))));
    }
}
