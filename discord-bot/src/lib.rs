//! Discord adapter for the FAQ RAG backend.
//!
//! [`commands::BotCore`] holds the command logic and talks to the backend through
//! [`backend_client::BackendApi`]; [`handler::Handler`] wires it to serenity.

pub mod backend_client;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod format;
pub mod handler;

pub use config::BotConfig;
pub use error::BotError;
