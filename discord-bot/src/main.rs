use std::{sync::Arc, time::Duration};

use discord_bot::{
    BotConfig, BotError,
    backend_client::HttpBackend,
    commands::BotCore,
    conversation::ConversationStore,
    handler::Handler,
};
use serenity::all::{ApplicationId, Client, GatewayIntents};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cfg = match BotConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("discord-bot: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = match ai_llm_service::telemetry::init("info", &cfg.log_dir, "discord-bot.log") {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("discord-bot: tracing not installed: {e}");
            None
        }
    };

    if let Err(e) = run(cfg).await {
        error!(error = %e, "bot stopped with an error");
        std::process::exit(1);
    }
}

async fn run(cfg: BotConfig) -> Result<(), BotError> {
    let backend = Arc::new(HttpBackend::new(&cfg.backend_url, cfg.backend_timeout)?);
    let store = Arc::new(ConversationStore::new(cfg.conversation_ttl, cfg.max_users));
    let sweep_every = (cfg.conversation_ttl / 4).max(Duration::from_secs(30));
    let sweeper = store.clone().spawn_sweeper(sweep_every);

    let core = Arc::new(BotCore::new(
        backend,
        store,
        cfg.rag_k,
        cfg.followup_context_chars,
    ));

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGE_REACTIONS;
    let mut builder = Client::builder(&cfg.discord_token, intents).event_handler(Handler::new(core));
    if let Some(id) = cfg.application_id {
        builder = builder.application_id(ApplicationId::new(id));
    }
    let mut client = builder.await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shard_manager.shutdown_all().await;
        }
    });

    info!(backend = %cfg.backend_url, k = cfg.rag_k, "starting Discord client");
    let result = client.start().await;
    sweeper.abort();
    result.map_err(BotError::from)
}
