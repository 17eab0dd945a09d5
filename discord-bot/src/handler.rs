//! Serenity glue: command registration, interaction dispatch, reaction feedback.

use std::sync::Arc;

use serenity::all::{
    Command, CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    EventHandler, Interaction, Reaction, ReactionType, Ready,
};
use serenity::async_trait;
use tracing::{Instrument, error, info, info_span, warn};

use crate::commands::{BotCore, Reply, THUMBS_DOWN, THUMBS_UP, feedback_from_emoji};
use crate::error::BotError;

const QUESTION: &str = "question";

pub struct Handler {
    core: Arc<BotCore>,
}

impl Handler {
    pub fn new(core: Arc<BotCore>) -> Self {
        Self { core }
    }
}

/// Slash commands registered globally on `ready`.
pub fn command_definitions() -> Vec<CreateCommand> {
    let question = |desc: &str| {
        CreateCommandOption::new(CommandOptionType::String, QUESTION, desc).required(true)
    };
    vec![
        CreateCommand::new("ask")
            .description("Ask a question about the documentation")
            .add_option(question("Your question")),
        CreateCommand::new("followup")
            .description("Ask a follow-up to your previous question")
            .add_option(question("Your follow-up")),
        CreateCommand::new("clear").description("Forget your conversation history"),
        CreateCommand::new("sources")
            .description("Show which documents match a question (debug)")
            .add_option(question("Search text")),
    ]
}

fn question_option(cmd: &CommandInteraction) -> &str {
    cmd.data
        .options
        .iter()
        .find(|o| o.name == QUESTION)
        .and_then(|o| o.value.as_str())
        .unwrap_or_default()
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "connected to Discord");
        match Command::set_global_commands(&ctx.http, command_definitions()).await {
            Ok(cmds) => info!(count = cmds.len(), "slash commands registered"),
            Err(e) => error!(error = %e, "failed to register slash commands"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(cmd) = interaction else {
            return;
        };
        let span = info_span!("command", name = %cmd.data.name, user = cmd.user.id.get());
        if let Err(e) = self.dispatch(&ctx, &cmd).instrument(span).await {
            error!(command = %cmd.data.name, error = %e, "command failed");
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let bot_id = ctx.cache.current_user().id;
        let Some(user_id) = reaction.user_id else {
            return;
        };
        if user_id == bot_id {
            return;
        }
        let ReactionType::Unicode(emoji) = &reaction.emoji else {
            return;
        };
        let Some(feedback) = feedback_from_emoji(emoji) else {
            return;
        };
        match reaction.message(&ctx.http).await {
            Ok(msg) if msg.author.id == bot_id => info!(
                user = user_id.get(),
                message = msg.id.get(),
                channel = reaction.channel_id.get(),
                ?feedback,
                "answer feedback"
            ),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not load reacted message"),
        }
    }
}

impl Handler {
    async fn dispatch(&self, ctx: &Context, cmd: &CommandInteraction) -> Result<(), BotError> {
        let user = cmd.user.id.get();
        match cmd.data.name.as_str() {
            "clear" => {
                let reply = self.core.clear(user).await;
                let msg = CreateInteractionResponseMessage::new()
                    .content(reply.content)
                    .ephemeral(true);
                cmd.create_response(&ctx.http, CreateInteractionResponse::Message(msg))
                    .await?;
                Ok(())
            }
            name @ ("ask" | "followup" | "sources") => {
                // The backend may take longer than Discord's 3 s acknowledgement window.
                cmd.defer(&ctx.http).await?;
                let question = question_option(cmd);
                let reply = match name {
                    "ask" => self.core.ask(user, question).await,
                    "followup" => self.core.followup(user, question).await,
                    _ => self.core.sources(question).await,
                };
                self.post(ctx, cmd, reply).await
            }
            other => {
                warn!(command = other, "unknown command");
                Ok(())
            }
        }
    }

    async fn post(&self, ctx: &Context, cmd: &CommandInteraction, reply: Reply) -> Result<(), BotError> {
        let msg = cmd
            .edit_response(&ctx.http, EditInteractionResponse::new().content(reply.content))
            .await?;
        if reply.feedback_reactions {
            for emoji in [THUMBS_UP, THUMBS_DOWN] {
                if let Err(e) = msg
                    .react(&ctx.http, ReactionType::Unicode(emoji.to_string()))
                    .await
                {
                    warn!(error = %e, "failed to add feedback reaction");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_commands_are_defined() {
        assert_eq!(command_definitions().len(), 4);
    }
}
