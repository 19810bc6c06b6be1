use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Context;
use tracing::error;

use crate::app::App;
use crate::notify;

const DEFAULT_WELCOME: &str = "Welcome to {server}, {user}!";
const DEFAULT_GOODBYE: &str = "{user} has left {server}.";

/// Substitutes the {user} and {server} placeholders of a configured
/// welcome/goodbye message.
pub fn render(template: &str, user: &str, server: &str) -> String {
    template.replace("{user}", user).replace("{server}", server)
}

pub async fn send_welcome(app: &App, ctx: &Context, guild_id: GuildId, user_id: u64) {
    send_greeting(app, ctx, guild_id, format!("<@{}>", user_id), true).await;
}

pub async fn send_goodbye(app: &App, ctx: &Context, guild_id: GuildId, username: &str) {
    send_greeting(app, ctx, guild_id, username.to_string(), false).await;
}

async fn send_greeting(app: &App, ctx: &Context, guild_id: GuildId, user: String, joining: bool) {
    let settings = match app.storage.guild_settings(guild_id.0).await {
        Ok(settings) => settings,
        Err(err) => {
            error!("Failed to load settings for guild {}: {}", guild_id.0, err.cause);
            return;
        }
    };

    let (channel_id, message) = if joining {
        (settings.welcome_channel_id, settings.welcome_message.unwrap_or_else(|| DEFAULT_WELCOME.to_string()))
    } else {
        (settings.goodbye_channel_id, settings.goodbye_message.unwrap_or_else(|| DEFAULT_GOODBYE.to_string()))
    };

    let channel_id = match channel_id {
        Some(id) => ChannelId(id),
        None => return
    };

    let server_name = match ctx.cache.guild(guild_id).await {
        Some(guild) => guild.name,
        None => "the server".to_string()
    };

    notify::channel_message(ctx, channel_id, &render(&message, &user, &server_name)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_both_placeholders() {
        assert_eq!(render("Welcome to {server}, {user}!", "<@1>", "Axiom"), "Welcome to Axiom, <@1>!");
    }

    #[test]
    fn render_handles_repeated_placeholders() {
        assert_eq!(render("{user} {user}", "bob", "x"), "bob bob");
    }

    #[test]
    fn render_leaves_plain_messages_untouched()  {
        assert_eq!(render("Goodbye.", "bob", "x"), "Goodbye.");
    }
}
