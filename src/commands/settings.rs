use std::sync::Arc;

use serenity::builder::CreateApplicationCommand;
use serenity::model::interactions::application_command::{ApplicationCommandInteraction, ApplicationCommandInteractionDataOptionValue, ApplicationCommandOptionType};
use serenity::model::interactions::InteractionResponseType;
use serenity::model::Permissions;
use serenity::prelude::*;
use serenity::async_trait;

use crate::app::App;
use crate::commands::{require_permission, respond_ephemeral, respond_text, Command};
use crate::error::AxiomError;

fn resolved_channel_id(command: &ApplicationCommandInteraction) -> Result<u64, AxiomError> {
    let option = command.data.options.get(0)
        .ok_or(AxiomError { cause: "Requires 'channel' param".to_string() })?;
    match &option.resolved.as_ref()
        .ok_or(AxiomError { cause: "Couldn't resolve 'channel' param".to_string() })? {
        ApplicationCommandInteractionDataOptionValue::Channel(channel) => Ok(channel.id.0),
        _ => Err(AxiomError { cause: "Unexpected type for 'channel' param".to_string() })
    }
}

pub struct SetWelcomeCommand;

#[async_trait]
impl Command for SetWelcomeCommand {
    fn name(&self) -> &'static str {
        "setwelcome"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("setwelcome")
            .description("Greet new members in a channel")
            .create_option(|option| {
                option.name("channel")
                    .description("The channel for welcome messages")
                    .kind(ApplicationCommandOptionType::Channel)
                    .required(true)
            })
            .create_option(|option| {
                option.name("message")
                    .description("Welcome text; {user} and {server} are substituted")
                    .kind(ApplicationCommandOptionType::String)
                    .required(false)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::MANAGE_GUILD, "Manage Server").await? {
            return Ok(());
        }
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let mut channel_id_opt: Option<u64> = None;
        let mut message_opt: Option<String> = None;

        for option in &command.data.options {
            match option.name.as_str() {
                "channel" => {
                    if let ApplicationCommandInteractionDataOptionValue::Channel(channel) = &option.resolved.as_ref()
                        .ok_or(AxiomError { cause: "Couldn't resolve 'channel' param".to_string() })? {
                        channel_id_opt = Some(channel.id.0);
                    } else {
                        return Err(AxiomError { cause: "Unexpected type for 'channel' param".to_string() });
                    }
                }
                "message" => {
                    if let ApplicationCommandInteractionDataOptionValue::String(message) = &option.resolved.as_ref()
                        .ok_or(AxiomError { cause: "Couldn't resolve 'message' param".to_string() })? {
                        message_opt = Some(message.clone());
                    } else {
                        return Err(AxiomError { cause: "Unexpected type for 'message' param".to_string() });
                    }
                }
                unknown => return Err(AxiomError { cause: format!("Unknown parameter: {}", unknown) })
            }
        }

        let channel_id = channel_id_opt.ok_or(AxiomError { cause: "Requires 'channel' param".to_string() })?;

        let mut settings = app.storage.guild_settings(guild_id.0).await?;
        settings.welcome_channel_id = Some(channel_id);
        settings.welcome_message = message_opt;
        app.storage.save_guild_settings(&settings).await?;

        respond_text(ctx, command, &format!("✅ New members will be welcomed in <#{}>.", channel_id)).await
    }
}

pub struct SetGoodbyeCommand;

#[async_trait]
impl Command for SetGoodbyeCommand {
    fn name(&self) -> &'static str {
        "setgoodbye"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("setgoodbye")
            .description("Announce departures in a channel")
            .create_option(|option| {
                option.name("channel")
                    .description("The channel for goodbye messages")
                    .kind(ApplicationCommandOptionType::Channel)
                    .required(true)
            })
            .create_option(|option| {
                option.name("message")
                    .description("Goodbye text; {user} and {server} are substituted")
                    .kind(ApplicationCommandOptionType::String)
                    .required(false)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::MANAGE_GUILD, "Manage Server").await? {
            return Ok(());
        }
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let mut channel_id_opt: Option<u64> = None;
        let mut message_opt: Option<String> = None;

        for option in &command.data.options {
            match option.name.as_str() {
                "channel" => {
                    if let ApplicationCommandInteractionDataOptionValue::Channel(channel) = &option.resolved.as_ref()
                        .ok_or(AxiomError { cause: "Couldn't resolve 'channel' param".to_string() })? {
                        channel_id_opt = Some(channel.id.0);
                    } else {
                        return Err(AxiomError { cause: "Unexpected type for 'channel' param".to_string() });
                    }
                }
                "message" => {
                    if let ApplicationCommandInteractionDataOptionValue::String(message) = &option.resolved.as_ref()
                        .ok_or(AxiomError { cause: "Couldn't resolve 'message' param".to_string() })? {
                        message_opt = Some(message.clone());
                    } else {
                        return Err(AxiomError { cause: "Unexpected type for 'message' param".to_string() });
                    }
                }
                unknown => return Err(AxiomError { cause: format!("Unknown parameter: {}", unknown) })
            }
        }

        let channel_id = channel_id_opt.ok_or(AxiomError { cause: "Requires 'channel' param".to_string() })?;

        let mut settings = app.storage.guild_settings(guild_id.0).await?;
        settings.goodbye_channel_id = Some(channel_id);
        settings.goodbye_message = message_opt;
        app.storage.save_guild_settings(&settings).await?;

        respond_text(ctx, command, &format!("✅ Departures will be announced in <#{}>.", channel_id)).await
    }
}

pub struct SetPrefixCommand;

#[async_trait]
impl Command for SetPrefixCommand {
    fn name(&self) -> &'static str {
        "setprefix"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("setprefix")
            .description("Set the prefix for page information commands")
            .create_option(|option| {
                option.name("prefix")
                    .description("New command prefix (e.g. \"!\")")
                    .kind(ApplicationCommandOptionType::String)
                    .required(true)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::MANAGE_GUILD, "Manage Server").await? {
            return Ok(());
        }
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let option = command.data.options.get(0)
            .ok_or(AxiomError { cause: "Requires 'prefix' param".to_string() })?;
        let prefix = match &option.resolved.as_ref()
            .ok_or(AxiomError { cause: "Couldn't resolve 'prefix' param".to_string() })? {
            ApplicationCommandInteractionDataOptionValue::String(prefix) => prefix.clone(),
            _ => return Err(AxiomError { cause: "Unexpected type for 'prefix' param".to_string() })
        };

        if prefix.is_empty() || prefix.chars().count() > 3 {
            return respond_ephemeral(ctx, command, "❌ Prefix must be 1 to 3 characters.").await;
        }

        let mut settings = app.storage.guild_settings(guild_id.0).await?;
        settings.command_prefix = prefix.clone();
        app.storage.save_guild_settings(&settings).await?;

        respond_text(ctx, command, &format!("✅ Command prefix is now `{}`. Try `{}page home`.", prefix, prefix)).await
    }
}

pub struct SetQuestChannelCommand;

#[async_trait]
impl Command for SetQuestChannelCommand {
    fn name(&self) -> &'static str {
        "setquestchannel"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("setquestchannel")
            .description("Set the channel for quest completion notifications")
            .create_option(|option| {
                option.name("channel")
                    .description("Channel to send quest notifications")
                    .kind(ApplicationCommandOptionType::Channel)
                    .required(true)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::MANAGE_CHANNELS, "Manage Channels").await? {
            return Ok(());
        }
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;
        let channel_id = resolved_channel_id(command)?;

        let mut settings = app.storage.guild_settings(guild_id.0).await?;
        settings.quest_channel_id = Some(channel_id);
        app.storage.save_guild_settings(&settings).await?;

        respond_text(ctx, command, &format!("✅ Quest completion notifications will now be sent to <#{}>.", channel_id)).await
    }
}

pub struct SetBoostChannelCommand;

#[async_trait]
impl Command for SetBoostChannelCommand {
    fn name(&self) -> &'static str {
        "setboostchannel"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("setboostchannel")
            .description("Set the channel for boost notifications")
            .create_option(|option| {
                option.name("channel")
                    .description("Channel to send boost notifications")
                    .kind(ApplicationCommandOptionType::Channel)
                    .required(true)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::MANAGE_CHANNELS, "Manage Channels").await? {
            return Ok(());
        }
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;
        let channel_id = resolved_channel_id(command)?;

        let mut settings = app.storage.guild_settings(guild_id.0).await?;
        settings.boost_channel_id = Some(channel_id);
        app.storage.save_guild_settings(&settings).await?;

        respond_text(ctx, command, &format!("✅ Server boost notifications will now be sent to <#{}>.", channel_id)).await
    }
}

pub struct RemoveQuestChannelCommand;

#[async_trait]
impl Command for RemoveQuestChannelCommand {
    fn name(&self) -> &'static str {
        "removequestchannel"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("removequestchannel")
            .description("Remove the quest notification channel")
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::MANAGE_CHANNELS, "Manage Channels").await? {
            return Ok(());
        }
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let mut settings = app.storage.guild_settings(guild_id.0).await?;
        if settings.quest_channel_id.is_none() {
            return respond_ephemeral(ctx, command, "❌ No quest channel is currently set.").await;
        }

        settings.quest_channel_id = None;
        app.storage.save_guild_settings(&settings).await?;

        respond_text(ctx, command, "✅ Quest completion notifications have been disabled.").await
    }
}

pub struct RemoveBoostChannelCommand;

#[async_trait]
impl Command for RemoveBoostChannelCommand {
    fn name(&self) -> &'static str {
        "removeboostchannel"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("removeboostchannel")
            .description("Remove the boost notification channel")
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::MANAGE_CHANNELS, "Manage Channels").await? {
            return Ok(());
        }
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let mut settings = app.storage.guild_settings(guild_id.0).await?;
        if settings.boost_channel_id.is_none() {
            return respond_ephemeral(ctx, command, "❌ No boost channel is currently set.").await;
        }

        settings.boost_channel_id = None;
        app.storage.save_guild_settings(&settings).await?;

        respond_text(ctx, command, "✅ Server boost notifications have been disabled.").await
    }
}

pub struct QuestSettingsCommand;

#[async_trait]
impl Command for QuestSettingsCommand {
    fn name(&self) -> &'static str {
        "questsettings"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("questsettings")
            .description("View this server's notification settings")
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let settings = app.storage.guild_settings(guild_id.0).await?;

        let channel_or_unset = |id: Option<u64>| id.map(|id| format!("<#{}>", id)).unwrap_or_else(|| "Not set".to_string());
        let quest = channel_or_unset(settings.quest_channel_id);
        let boost = channel_or_unset(settings.boost_channel_id);

        command.create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.create_embed(|embed| {
                    embed.title("🎯 Notification Settings")
                        .field("🎉 Quest channel", quest, true)
                        .field("🚀 Boost channel", boost, true)
                        .field("⚙️ Command prefix", format!("`{}`", settings.command_prefix), true)
                }))
        }).await.map_err(|err| AxiomError { cause: format!("Failed to send interaction response: {}", err) })
    }
}
