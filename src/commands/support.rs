use std::sync::Arc;

use serenity::builder::CreateApplicationCommand;
use serenity::model::id::UserId;
use serenity::model::interactions::application_command::{ApplicationCommandInteraction, ApplicationCommandInteractionDataOptionValue, ApplicationCommandOptionType};
use serenity::prelude::*;
use serenity::async_trait;
use tracing::info;

use crate::app::App;
use crate::commands::{respond_ephemeral, Command};
use crate::error::AxiomError;
use crate::notify;
use crate::storage::NewSupportTicket;

pub struct SupportCommand;

#[async_trait]
impl Command for SupportCommand {
    fn name(&self) -> &'static str {
        "support"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("support")
            .description("Contact the Axiom support team")
            .create_option(|option| {
                option.name("message")
                    .description("Your support message")
                    .kind(ApplicationCommandOptionType::String)
                    .required(true)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        let option = command.data.options.get(0)
            .ok_or(AxiomError { cause: "Requires 'message' param".to_string() })?;
        let message = match &option.resolved.as_ref()
            .ok_or(AxiomError { cause: "Couldn't resolve 'message' param".to_string() })? {
            ApplicationCommandInteractionDataOptionValue::String(message) => message.clone(),
            _ => return Err(AxiomError { cause: "Unexpected type for 'message' param".to_string() })
        };

        let user = match app.storage.user_by_discord_id(command.user.id.0).await? {
            Some(user) => user,
            None => return respond_ephemeral(ctx, command, "❌ Please login to the website first to contact support.").await
        };

        let guild_name = match command.guild_id {
            Some(guild_id) => match ctx.cache.guild(guild_id).await {
                Some(guild) => guild.name,
                None => "Unknown server".to_string()
            },
            None => "Direct Message".to_string()
        };

        let ticket_id = app.storage.create_support_ticket(&NewSupportTicket {
            user_id: user.id.clone(),
            discord_user_id: command.user.id.0.to_string(),
            username: command.user.name.clone(),
            message: message.clone(),
            guild_name: guild_name.clone()
        }).await?;

        info!("Support ticket {} opened by {}", ticket_id, command.user.name);

        respond_ephemeral(ctx, command, "✅ Your support request has been submitted! Our team will respond via DM within 24 hours.").await?;

        notify::dm_user(ctx, command.user.id, &format!(
            "🎫 Your support ticket `{}` has been received. Our team will respond shortly.\n📝 Your message: {}",
            ticket_id, message
        )).await;

        for admin_id in &app.config.admin_discord_ids {
            notify::dm_user(ctx, UserId(*admin_id), &format!(
                "🎫 New support ticket `{}`\n👤 {} (`{}`)\n🏠 {}\n📝 {}",
                ticket_id, command.user.name, command.user.id.0, guild_name, message
            )).await;
        }

        Ok(())
    }
}
