//! Slash-command logic, independent of the Discord gateway.

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend_client::{BackendApi, SourceRef};
use crate::conversation::{ConversationState, ConversationStore};
use crate::error::BotError;
use crate::format::{NO_HISTORY, format_answer, format_sources};

/// What to post back for a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    /// Add 👍/👎 to the posted message.
    pub feedback_reactions: bool,
}

impl Reply {
    fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            feedback_reactions: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    Positive,
    Negative,
}

pub const THUMBS_UP: &str = "👍";
pub const THUMBS_DOWN: &str = "👎";

pub fn feedback_from_emoji(emoji: &str) -> Option<Feedback> {
    match emoji {
        THUMBS_UP => Some(Feedback::Positive),
        THUMBS_DOWN => Some(Feedback::Negative),
        _ => None,
    }
}

pub struct BotCore {
    backend: Arc<dyn BackendApi>,
    store: Arc<ConversationStore>,
    k: usize,
    followup_context_chars: usize,
}

impl BotCore {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        store: Arc<ConversationStore>,
        k: usize,
        followup_context_chars: usize,
    ) -> Self {
        Self {
            backend,
            store,
            k,
            followup_context_chars,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// `/ask question`
    pub async fn ask(&self, user: u64, question: &str) -> Reply {
        let question = question.trim();
        if question.is_empty() {
            return Reply::plain("⚠️ Please include a question.");
        }
        self.answer_and_remember(user, question, question).await
    }

    /// `/followup question`; rejected without a backend call when there is no history.
    pub async fn followup(&self, user: u64, text: &str) -> Reply {
        let text = text.trim();
        if text.is_empty() {
            return Reply::plain("⚠️ Please include a follow-up question.");
        }
        let Some(prev) = self.store.get(user).await else {
            return Reply::plain(NO_HISTORY);
        };
        let query = followup_query(&prev, text, self.followup_context_chars);
        self.answer_and_remember(user, text, &query).await
    }

    /// `/clear`
    pub async fn clear(&self, user: u64) -> Reply {
        if self.store.clear(user).await {
            Reply::plain("Conversation cleared.")
        } else {
            Reply::plain("There was no conversation to clear.")
        }
    }

    /// `/sources question`
    pub async fn sources(&self, question: &str) -> Reply {
        let question = question.trim();
        if question.is_empty() {
            return Reply::plain("⚠️ Please include a question.");
        }
        match self.backend.search(question, self.k).await {
            Ok(contexts) => Reply::plain(format_sources(question, &contexts)),
            Err(e) => Reply::plain(error_reply(&e)),
        }
    }

    async fn answer_and_remember(&self, user: u64, asked: &str, query: &str) -> Reply {
        match self.backend.answer(query, self.k).await {
            Ok(res) => {
                info!(
                    user,
                    request_id = %res.meta.request_id,
                    contexts = res.contexts.len(),
                    grounded = res.meta.grounded,
                    "answered"
                );
                let content = format_answer(&res.answer, &res.contexts);
                self.store
                    .put(user, ConversationState::new(asked, res.answer, res.contexts))
                    .await;
                Reply {
                    content,
                    feedback_reactions: true,
                }
            }
            Err(e) => {
                warn!(user, error = %e, "backend call failed");
                Reply::plain(error_reply(&e))
            }
        }
    }
}

/// Previous question, clamped previous answer, then the follow-up.
pub fn followup_query(prev: &ConversationState, text: &str, max_answer_chars: usize) -> String {
    let answer: String = prev.last_answer.chars().take(max_answer_chars).collect();
    format!(
        "Previous question: {}\nPrevious answer: {}\nFollow-up question: {}",
        prev.last_query.trim(),
        answer.trim(),
        text
    )
}

/// User-facing error, with the sources the backend found when it has them.
fn error_reply(e: &BotError) -> String {
    let msg = e.user_message();
    let contexts: &[SourceRef] = e.contexts();
    if contexts.is_empty() {
        msg
    } else {
        format_answer(&msg, contexts)
    }
}
