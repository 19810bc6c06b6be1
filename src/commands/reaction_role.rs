use std::sync::Arc;

use serenity::builder::CreateApplicationCommand;
use serenity::model::channel::ReactionType;
use serenity::model::interactions::application_command::{ApplicationCommandInteraction, ApplicationCommandInteractionDataOptionValue, ApplicationCommandOptionType};
use serenity::model::Permissions;
use serenity::prelude::*;
use serenity::async_trait;
use tracing::warn;

use crate::app::App;
use crate::commands::{require_permission, respond_ephemeral, Command};
use crate::error::AxiomError;
use crate::reaction_roles::emoji_key;
use crate::storage::ReactionRoleBinding;

pub struct ReactionRoleCommand;

#[async_trait]
impl Command for ReactionRoleCommand {
    fn name(&self) -> &'static str {
        "reactionrole"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("reactionrole")
            .description("Post a panel that grants a role to everyone reacting with an emoji")
            .create_option(|option| {
                option.name("role")
                    .description("The role to grant")
                    .kind(ApplicationCommandOptionType::Role)
                    .required(true)
            })
            .create_option(|option| {
                option.name("emoji")
                    .description("The emoji members react with")
                    .kind(ApplicationCommandOptionType::String)
                    .required(true)
            })
            .create_option(|option| {
                option.name("message")
                    .description("Custom panel text")
                    .kind(ApplicationCommandOptionType::String)
                    .required(false)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::MANAGE_ROLES, "Manage Roles").await? {
            return Ok(());
        }

        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let mut role_id_opt: Option<u64> = None;
        let mut role_name_opt: Option<String> = None;
        let mut emoji_opt: Option<String> = None;
        let mut text_opt: Option<String> = None;

        for option in &command.data.options {
            match option.name.as_str() {
                "role" => {
                    if let ApplicationCommandInteractionDataOptionValue::Role(role) = &option.resolved.as_ref()
                        .ok_or(AxiomError { cause: "Couldn't resolve 'role' param".to_string() })? {
                        role_id_opt = Some(role.id.0);
                        role_name_opt = Some(role.name.clone());
                    } else {
                        return Err(AxiomError { cause: "Unexpected type for 'role' param".to_string() });
                    }
                }
                "emoji" => {
                    if let ApplicationCommandInteractionDataOptionValue::String(emoji) = &option.resolved.as_ref()
                        .ok_or(AxiomError { cause: "Couldn't resolve 'emoji' param".to_string() })? {
                        emoji_opt = Some(emoji.clone());
                    } else {
                        return Err(AxiomError { cause: "Unexpected type for 'emoji' param".to_string() });
                    }
                }
                "message" => {
                    if let ApplicationCommandInteractionDataOptionValue::String(text) = &option.resolved.as_ref()
                        .ok_or(AxiomError { cause: "Couldn't resolve 'message' param".to_string() })? {
                        text_opt = Some(text.clone());
                    } else {
                        return Err(AxiomError { cause: "Unexpected type for 'message' param".to_string() });
                    }
                }
                unknown => return Err(AxiomError { cause: format!("Unknown parameter: {}", unknown) })
            }
        }

        let role_id = role_id_opt.ok_or(AxiomError { cause: "Requires 'role' param".to_string() })?;
        let role_name = role_name_opt.ok_or(AxiomError { cause: "Requires 'role' param".to_string() })?;
        let emoji = emoji_opt.ok_or(AxiomError { cause: "Requires 'emoji' param".to_string() })?;

        let reaction: ReactionType = emoji.clone().try_into()
            .map_err(|_err| AxiomError { cause: format!("Couldn't parse {} as an emoji", emoji) })?;

        let text = text_opt.unwrap_or_else(|| format!("React with {} to receive the **{}** role. Remove your reaction to give it back.", emoji, role_name));

        let panel = command.channel_id.send_message(&ctx.http, |message| {
            message.embed(|embed| embed.title("🎭 Reaction Role").description(&text))
        }).await.map_err(|err| AxiomError { cause: format!("Failed to post the panel: {}", err) })?;

        // Seed our own reaction so the emoji is one click away. The
        // reaction handler skips the bot itself.
        if let Err(err) = ctx.http.create_reaction(panel.channel_id.0, panel.id.0, &reaction).await {
            warn!("Couldn't seed reaction on panel {}: {}", panel.id.0, err);
        }

        app.storage.save_reaction_role(&ReactionRoleBinding {
            guild_id: guild_id.0,
            message_id: panel.id.0,
            emoji: emoji_key(&reaction),
            role_id
        }).await?;

        respond_ephemeral(ctx, command, &format!("✅ Reaction role set up: {} grants **{}**.", emoji, role_name)).await
    }
}
