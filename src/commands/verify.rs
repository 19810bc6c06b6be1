use std::sync::Arc;

use serenity::builder::CreateApplicationCommand;
use serenity::model::id::RoleId;
use serenity::model::interactions::application_command::{ApplicationCommandInteraction, ApplicationCommandInteractionDataOptionValue, ApplicationCommandOptionType};
use serenity::model::interactions::message_component::ButtonStyle;
use serenity::model::interactions::InteractionResponseType;
use serenity::model::prelude::message_component::MessageComponentInteraction;
use serenity::model::prelude::InteractionApplicationCommandCallbackDataFlags;
use serenity::model::Permissions;
use serenity::prelude::*;
use serenity::async_trait;
use tracing::warn;

use crate::app::App;
use crate::commands::{require_permission, Command};
use crate::error::AxiomError;

/// Button ids carry the target role, so clicks need no stored state.
pub const VERIFY_PREFIX: &str = "verify_";

pub struct VerifyCommand;

#[async_trait]
impl Command for VerifyCommand {
    fn name(&self) -> &'static str {
        "verify"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("verify")
            .description("Post a verification panel that grants a role on click")
            .create_option(|option| {
                option.name("role")
                    .description("The role granted to verified members")
                    .kind(ApplicationCommandOptionType::Role)
                    .required(true)
            })
    }

    async fn run(&self, _app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::MANAGE_GUILD, "Manage Server").await? {
            return Ok(());
        }

        let option = command.data.options.get(0)
            .ok_or(AxiomError { cause: "Requires 'role' param".to_string() })?;
        let (role_id, role_name) = match &option.resolved.as_ref()
            .ok_or(AxiomError { cause: "Couldn't resolve 'role' param".to_string() })? {
            ApplicationCommandInteractionDataOptionValue::Role(role) => (role.id.0, role.name.clone()),
            _ => return Err(AxiomError { cause: "Unexpected type for 'role' param".to_string() })
        };

        command.create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message.content(format!("🛡️ Click the button below to verify and receive the **{}** role.", role_name))
                        .components(|components| components.create_action_row(|row| {
                            row.create_button(|button| {
                                button.custom_id(format!("{}{}", VERIFY_PREFIX, role_id))
                                    .label("Verify")
                                    .style(ButtonStyle::Primary)
                            })
                        }))
                })
        }).await.map_err(|err| AxiomError { cause: format!("Failed to send interaction response: {}", err) })
    }
}

pub async fn handle_component(_app: &Arc<App>, ctx: &Context, component: &MessageComponentInteraction) -> Result<(), AxiomError> {
    let guild_id = component.guild_id
        .ok_or(AxiomError { cause: "Verification buttons only work in servers.".to_string() })?;

    let role_id: u64 = component.data.custom_id
        .strip_prefix(VERIFY_PREFIX)
        .and_then(|raw| raw.parse().ok())
        .ok_or(AxiomError { cause: format!("Malformed verify button id: {}", component.data.custom_id) })?;

    let member = component.member.as_ref()
        .ok_or(AxiomError { cause: "Verification buttons only work in servers.".to_string() })?;

    let reply = if member.roles.contains(&RoleId(role_id)) {
        "You're already verified!".to_string()
    } else {
        match ctx.http.add_member_role(guild_id.0, component.user.id.0, role_id).await {
            Ok(_) => "✅ You've been verified!".to_string(),
            Err(err) => {
                warn!("Failed to grant verify role {} in guild {}: {}", role_id, guild_id.0, err);
                "❌ Couldn't verify you. Ask a moderator to check the bot's role position.".to_string()
            }
        }
    };

    component.create_interaction_response(&ctx.http, |response| {
        response.kind(InteractionResponseType::ChannelMessageWithSource)
            .interaction_response_data(|message| message
                .content(reply)
                .flags(InteractionApplicationCommandCallbackDataFlags::EPHEMERAL))
    }).await.map_err(|err| AxiomError { cause: format!("Failed to respond to component: {}", err) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_button_ids_round_trip() {
        let custom_id = format!("{}{}", VERIFY_PREFIX, 123456789u64);
        let parsed: Option<u64> = custom_id.strip_prefix(VERIFY_PREFIX).and_then(|raw| raw.parse().ok());

        assert_eq!(parsed, Some(123456789));
    }

    #[test]
    fn malformed_button_ids_do_not_parse() {
        for id in ["verify_", "verify_abc", "role_5"] {
            let parsed: Option<u64> = id.strip_prefix(VERIFY_PREFIX).and_then(|raw| raw.parse().ok());
            assert_eq!(parsed, None, "{} should not parse", id);
        }
    }
}
