use std::{error::Error, sync::Arc};

use api::core::app_state::{ApiConfig, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // `.env` is optional; real environment variables win.
    let _ = dotenvy::dotenv();

    let cfg = ApiConfig::from_env()?;
    let _log_guard = ai_llm_service::telemetry::init("info", &cfg.log_dir, "backend.log")?;

    let state = match AppState::from_env() {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!(error = %e, "startup configuration is invalid");
            return Err(e.into());
        }
    };

    info!(
        address = %cfg.address,
        log_dir = %cfg.log_dir.display(),
        default_provider = %state.orchestrator.default_provider(),
        "starting FAQ RAG backend"
    );

    api::start(state, &cfg.address).await?;

    Ok(())
}
