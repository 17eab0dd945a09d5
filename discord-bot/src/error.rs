use thiserror::Error;

use crate::backend_client::SourceRef;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("DISCORD_TOKEN is not set")]
    MissingToken,

    #[error("config error: {0}")]
    Config(String),

    #[error("backend timed out")]
    Timeout,

    #[error("backend unreachable: {0}")]
    ConnectionRefused(String),

    /// Non-2xx from the backend, with whatever the error envelope carried.
    #[error("backend returned {status}: {message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
        request_id: Option<String>,
        contexts: Vec<SourceRef>,
    },

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("backend request failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Discord(#[from] serenity::Error),
}

impl BotError {
    /// Message shown to the Discord user.
    pub fn user_message(&self) -> String {
        match self {
            BotError::Timeout => {
                "⚠️ The knowledge service took too long to respond. Please try again.".into()
            }
            BotError::ConnectionRefused(_) => {
                "⚠️ I can't reach the knowledge service right now. Please try again later.".into()
            }
            BotError::Status {
                status, message, ..
            } if (400..500).contains(status) => {
                format!("⚠️ I couldn't process that question: {message}")
            }
            BotError::Status {
                status,
                message,
                request_id,
                ..
            } => match request_id {
                Some(id) => format!(
                    "⚠️ The knowledge service returned an error ({status}): {message} (request {id})"
                ),
                None => format!("⚠️ The knowledge service returned an error ({status}): {message}"),
            },
            BotError::Decode(_) => {
                "⚠️ I received an unexpected response from the knowledge service.".into()
            }
            other => format!("⚠️ Something went wrong: {other}"),
        }
    }

    /// Sources the backend retrieved before failing, if any.
    pub fn contexts(&self) -> &[SourceRef] {
        match self {
            BotError::Status { contexts, .. } => contexts,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BotError::Timeout
        } else if e.is_connect() {
            BotError::ConnectionRefused(e.to_string())
        } else if e.is_decode() {
            BotError::Decode(e.to_string())
        } else {
            BotError::Transport(e.to_string())
        }
    }
}
