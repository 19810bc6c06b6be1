mod bump;
mod info;
mod reaction_role;
mod settings;
mod support;
mod template;
mod verify;

use std::collections::HashMap;
use std::sync::Arc;

use serenity::async_trait;
use serenity::builder::{CreateApplicationCommand, CreateApplicationCommands};
use serenity::model::guild::{Guild, Member};
use serenity::model::id::RoleId;
use serenity::model::interactions::application_command::ApplicationCommandInteraction;
use serenity::model::interactions::InteractionResponseType;
use serenity::model::prelude::message_component::MessageComponentInteraction;
use serenity::model::prelude::InteractionApplicationCommandCallbackDataFlags;
use serenity::model::Permissions;
use serenity::prelude::*;

use crate::app::App;
use crate::error::AxiomError;

/// One slash command: how it is declared to the platform and how an
/// invocation is answered. The registry maps names to these, so each
/// handler is independently testable and dispatch stays a lookup.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand;

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError>;
}

pub fn registry() -> HashMap<&'static str, Box<dyn Command>> {
    let commands: Vec<Box<dyn Command>> = vec![
        Box::new(bump::BumpCommand),
        Box::new(bump::BumpToolsCommand),
        Box::new(bump::BumpChannelCommand),
        Box::new(template::AddTemplateCommand),
        Box::new(template::TemplateProcessCommand),
        Box::new(reaction_role::ReactionRoleCommand),
        Box::new(verify::VerifyCommand),
        Box::new(support::SupportCommand),
        Box::new(settings::SetWelcomeCommand),
        Box::new(settings::SetGoodbyeCommand),
        Box::new(settings::SetPrefixCommand),
        Box::new(settings::SetQuestChannelCommand),
        Box::new(settings::SetBoostChannelCommand),
        Box::new(settings::RemoveQuestChannelCommand),
        Box::new(settings::RemoveBoostChannelCommand),
        Box::new(settings::QuestSettingsCommand),
        Box::new(info::PingCommand),
        Box::new(info::ServerInfoCommand),
        Box::new(info::UserInfoCommand),
        Box::new(info::PollCommand)
    ];

    commands.into_iter().map(|command| (command.name(), command)).collect()
}

/// Declares the full command set; run on every ready, last registration
/// wins.
pub fn create_commands<'a>(registry: &HashMap<&'static str, Box<dyn Command>>,
                           commands: &'a mut CreateApplicationCommands) -> &'a mut CreateApplicationCommands {
    for command in registry.values() {
        commands.create_application_command(|builder| command.register(builder));
    }
    commands
}

pub async fn dispatch_command(app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
    match app.commands.get(command.data.name.as_str()) {
        Some(handler) => handler.run(app, ctx, command).await,
        None => respond_ephemeral(ctx, command, "Unknown command").await
    }
}

pub async fn dispatch_component(app: &Arc<App>, ctx: &Context, component: &MessageComponentInteraction) -> Result<(), AxiomError> {
    if component.data.custom_id.starts_with(verify::VERIFY_PREFIX) {
        verify::handle_component(app, ctx, component).await
    } else {
        component.create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content("Unknown component"))
        }).await.map_err(|err| AxiomError { cause: format!("Failed to respond to component: {}", err) })
    }
}

pub async fn respond_text(ctx: &Context, command: &ApplicationCommandInteraction, content: &str) -> Result<(), AxiomError> {
    command.create_interaction_response(&ctx.http, |response| {
        response.kind(InteractionResponseType::ChannelMessageWithSource)
            .interaction_response_data(|message| message.content(content))
    }).await.map_err(|err| AxiomError { cause: format!("Failed to send interaction response: {}", err) })
}

pub async fn respond_ephemeral(ctx: &Context, command: &ApplicationCommandInteraction, content: &str) -> Result<(), AxiomError> {
    command.create_interaction_response(&ctx.http, |response| {
        response.kind(InteractionResponseType::ChannelMessageWithSource)
            .interaction_response_data(|message| message
                .content(content)
                .flags(InteractionApplicationCommandCallbackDataFlags::EPHEMERAL))
    }).await.map_err(|err| AxiomError { cause: format!("Failed to send interaction response: {}", err) })
}

/// Effective permissions from the cached guild: owner gets everything,
/// everyone else the union of @everyone and their role permissions.
pub fn member_permissions(guild: &Guild, member: &Member) -> Permissions {
    if guild.owner_id == member.user.id {
        return Permissions::all();
    }

    let mut permissions = guild.roles.get(&RoleId(guild.id.0))
        .map(|role| role.permissions)
        .unwrap_or_else(Permissions::empty);
    for role_id in &member.roles {
        if let Some(role) = guild.roles.get(role_id) {
            permissions |= role.permissions;
        }
    }

    if permissions.contains(Permissions::ADMINISTRATOR) {
        Permissions::all()
    } else {
        permissions
    }
}

/// Gate for privileged commands. Replies ephemerally and returns false
/// when the invoker lacks the permission; a rejected invocation mutates
/// nothing and is not an error.
pub async fn require_permission(ctx: &Context, command: &ApplicationCommandInteraction,
                                required: Permissions, label: &str) -> Result<bool, AxiomError> {
    let guild_id = match command.guild_id {
        Some(id) => id,
        None => {
            respond_ephemeral(ctx, command, "This command can only be run in servers.").await?;
            return Ok(false);
        }
    };

    let member = match &command.member {
        Some(member) => member,
        None => {
            respond_ephemeral(ctx, command, "This command can only be run in servers.").await?;
            return Ok(false);
        }
    };

    let permissions = match ctx.cache.guild(guild_id).await {
        Some(guild) => member_permissions(&guild, member),
        None => Permissions::empty()
    };

    if !permissions.contains(required) {
        respond_ephemeral(ctx, command, &format!("❌ You need **{}** permission to use this command.", label)).await?;
        return Ok(false);
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_the_command_surface() {
        let registry = registry();

        for name in ["bump", "bumptools", "bumpchannel", "support", "addtemplate", "templateprocess",
                     "ping", "serverinfo", "userinfo", "setwelcome", "setgoodbye", "poll",
                     "verify", "reactionrole", "setprefix", "setquestchannel", "setboostchannel",
                     "removequestchannel", "removeboostchannel", "questsettings"] {
            assert!(registry.contains_key(name), "missing command: {}", name);
        }
        assert_eq!(registry.len(), 20);
    }

    #[test]
    fn registry_keys_match_declared_names() {
        for (name, command) in registry() {
            assert_eq!(name, command.name());
        }
    }
}
