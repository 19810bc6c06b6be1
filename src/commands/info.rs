use std::sync::Arc;

use serenity::builder::CreateApplicationCommand;
use serenity::model::interactions::application_command::{ApplicationCommandInteraction, ApplicationCommandInteractionDataOptionValue, ApplicationCommandOptionType};
use serenity::model::interactions::InteractionResponseType;
use serenity::prelude::*;
use serenity::async_trait;
use tracing::warn;

use crate::app::App;
use crate::commands::{respond_ephemeral, respond_text, Command};
use crate::error::AxiomError;

pub struct PingCommand;

#[async_trait]
impl Command for PingCommand {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("ping").description("Replies with Pong!")
    }

    async fn run(&self, _app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        respond_text(ctx, command, "Pong! 🏓").await
    }
}

pub struct ServerInfoCommand;

#[async_trait]
impl Command for ServerInfoCommand {
    fn name(&self) -> &'static str {
        "serverinfo"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("serverinfo").description("Show information about this server")
    }

    async fn run(&self, _app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let guild = match ctx.cache.guild(guild_id).await {
            Some(guild) => guild,
            None => return respond_ephemeral(ctx, command, "❌ Couldn't load this server's details.").await
        };

        command.create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.create_embed(|embed| {
                    embed.title(format!("🏠 {}", guild.name))
                        .field("👥 Members", guild.member_count.to_string(), true)
                        .field("👑 Owner", format!("<@{}>", guild.owner_id.0), true)
                        .field("📅 Created", guild_id.created_at().format("%Y-%m-%d").to_string(), true)
                }))
        }).await.map_err(|err| AxiomError { cause: format!("Failed to send interaction response: {}", err) })
    }
}

pub struct UserInfoCommand;

#[async_trait]
impl Command for UserInfoCommand {
    fn name(&self) -> &'static str {
        "userinfo"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("userinfo")
            .description("Show information about a member")
            .create_option(|option| {
                option.name("user")
                    .description("The member to look up (defaults to you)")
                    .kind(ApplicationCommandOptionType::User)
                    .required(false)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        let mut target = command.user.clone();
        for option in &command.data.options {
            if option.name == "user" {
                if let Some(ApplicationCommandInteractionDataOptionValue::User(user, _member)) = &option.resolved {
                    target = user.clone();
                }
            }
        }

        // Coins show up only for accounts linked on the website.
        let coins = match app.storage.user_by_discord_id(target.id.0).await {
            Ok(Some(user)) => format!("{} coins", user.coins),
            Ok(None) => "Not linked to the website".to_string(),
            Err(err) => {
                warn!("Failed to look up directory account for {}: {}", target.id.0, err.cause);
                "Unavailable".to_string()
            }
        };

        command.create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.create_embed(|embed| {
                    embed.title(format!("👤 {}", target.tag()))
                        .field("🆔 ID", target.id.0.to_string(), true)
                        .field("📅 Account created", target.id.created_at().format("%Y-%m-%d").to_string(), true)
                        .field("💰 Balance", coins, true)
                }))
        }).await.map_err(|err| AxiomError { cause: format!("Failed to send interaction response: {}", err) })
    }
}

pub struct PollCommand;

#[async_trait]
impl Command for PollCommand {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("poll")
            .description("Create a reaction poll with up to four options")
            .create_option(|option| {
                option.name("question")
                    .description("The poll question")
                    .kind(ApplicationCommandOptionType::String)
                    .required(true)
            })
            .create_option(|option| {
                option.name("option1")
                    .description("First option")
                    .kind(ApplicationCommandOptionType::String)
                    .required(true)
            })
            .create_option(|option| {
                option.name("option2")
                    .description("Second option")
                    .kind(ApplicationCommandOptionType::String)
                    .required(true)
            })
            .create_option(|option| {
                option.name("option3")
                    .description("Third option")
                    .kind(ApplicationCommandOptionType::String)
                    .required(false)
            })
            .create_option(|option| {
                option.name("option4")
                    .description("Fourth option")
                    .kind(ApplicationCommandOptionType::String)
                    .required(false)
            })
    }

    async fn run(&self, _app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        let mut question_opt: Option<String> = None;
        let mut options: Vec<String> = Vec::new();

        for option in &command.data.options {
            if let Some(ApplicationCommandInteractionDataOptionValue::String(value)) = &option.resolved {
                if option.name == "question" {
                    question_opt = Some(value.clone());
                } else {
                    options.push(value.clone());
                }
            }
        }

        let question = question_opt.ok_or(AxiomError { cause: "Requires 'question' param".to_string() })?;
        if options.len() < 2 {
            return respond_ephemeral(ctx, command, "❌ A poll needs at least two options.").await;
        }

        const NUMBERS: [&str; 4] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣"];
        let body = options.iter()
            .enumerate()
            .map(|(index, option)| format!("{} {}", NUMBERS[index], option))
            .collect::<Vec<String>>()
            .join("\n");

        command.create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.create_embed(|embed| {
                    embed.title(format!("📊 {}", question)).description(body)
                }))
        }).await.map_err(|err| AxiomError { cause: format!("Failed to send interaction response: {}", err) })?;

        // Seed one reaction per option so voting is one click.
        let poll_message = command.get_interaction_response(&ctx.http).await
            .map_err(|err| AxiomError { cause: format!("Failed to fetch poll message: {}", err) })?;
        for number in NUMBERS.iter().take(options.len()) {
            let reaction = serenity::model::channel::ReactionType::Unicode(number.to_string());
            if let Err(err) = ctx.http.create_reaction(poll_message.channel_id.0, poll_message.id.0, &reaction).await {
                warn!("Couldn't seed poll reaction {}: {}", number, err);
            }
        }

        Ok(())
    }
}
