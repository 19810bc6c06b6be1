use std::sync::Arc;

use chrono::Utc;
use serenity::builder::CreateApplicationCommand;
use serenity::model::id::ChannelId;
use serenity::model::interactions::application_command::{ApplicationCommandInteraction, ApplicationCommandInteractionDataOptionValue, ApplicationCommandOptionType};
use serenity::model::interactions::InteractionResponseType;
use serenity::model::Permissions;
use serenity::prelude::*;
use serenity::async_trait;
use tracing::{error, info, warn};

use crate::app::App;
use crate::bump::{plan_bump, remaining_cooldown_minutes, BumpPlan};
use crate::commands::{require_permission, respond_ephemeral, respond_text, Command};
use crate::error::AxiomError;
use crate::storage::BumpProfile;

pub struct BumpCommand;

#[async_trait]
impl Command for BumpCommand {
    fn name(&self) -> &'static str {
        "bump"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("bump")
            .description("Broadcast this server's listing to every registered bump channel")
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let profile = app.storage.bump_profile(guild_id.0).await?;
        let targets = app.storage.bump_targets().await?;

        match plan_bump(profile, targets, Utc::now(), app.config.bump.cooldown_minutes) {
            BumpPlan::NotEnabled => {
                respond_ephemeral(ctx, command, "❌ Bumping is not enabled for this server. Enable it on the website first.").await
            }
            BumpPlan::CoolingDown { remaining_minutes } => {
                respond_ephemeral(ctx, command, &format!("⏳ This server was bumped recently. Try again in {} minutes.", remaining_minutes)).await
            }
            BumpPlan::Deliver { profile, targets } => {
                // The fan-out can outlive the acknowledgment window, so
                // defer first and edit the reply with the tally.
                command.create_interaction_response(&ctx.http, |response| {
                    response.kind(InteractionResponseType::DeferredChannelMessageWithSource)
                }).await.map_err(|err| AxiomError { cause: format!("Failed to acknowledge command: {}", err) })?;

                let mut delivered = 0u32;
                let mut failed = 0u32;
                for target in &targets {
                    let result = ChannelId(target.channel_id).send_message(&ctx.http, |message| {
                        message.embed(|embed| {
                            embed.title(format!("📣 {}", profile.name))
                                .description(&profile.description)
                                .field("👥 Members", profile.member_count.to_string(), true)
                                .field("🔗 Invite", &profile.invite_url, true)
                        })
                    }).await;

                    match result {
                        Ok(_) => delivered += 1,
                        Err(err) => {
                            failed += 1;
                            warn!("Bump delivery to channel {} in guild {} failed: {}", target.channel_id, target.guild_id, err);
                        }
                    }
                }

                // The cooldown gates invocation cadence, not delivery
                // success, so the timestamp advances even on failures.
                if let Err(err) = app.storage.record_bump(guild_id.0, Utc::now()).await {
                    error!("Failed to record bump for guild {}: {}", guild_id.0, err.cause);
                }

                info!("Guild {} bumped to {} channels ({} failed)", guild_id.0, delivered, failed);

                let summary = if failed == 0 {
                    format!("📣 **{}** was bumped to {} servers!", profile.name, delivered)
                } else {
                    format!("📣 **{}** was bumped to {} servers ({} deliveries failed).", profile.name, delivered, failed)
                };
                command.edit_original_interaction_response(&ctx.http, |message| message.content(summary)).await
                    .map_err(|err| AxiomError { cause: format!("Failed to edit interaction response: {}", err) })?;
                Ok(())
            }
        }
    }
}

pub struct BumpToolsCommand;

#[async_trait]
impl Command for BumpToolsCommand {
    fn name(&self) -> &'static str {
        "bumptools"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("bumptools")
            .description("Show this server's bump status and configuration")
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let profile = app.storage.bump_profile(guild_id.0).await?;
        let settings = app.storage.guild_settings(guild_id.0).await?;

        let enabled = profile.as_ref().map(|p| p.enabled).unwrap_or(false);
        let last_bump = profile.as_ref().and_then(|p: &BumpProfile| p.last_bump_at);
        let cooldown = remaining_cooldown_minutes(last_bump, Utc::now(), app.config.bump.cooldown_minutes);

        command.create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.create_embed(|embed| {
                    embed.title("🛠️ Bump Status")
                        .field("Enabled", if enabled { "Yes" } else { "No (enable on the website)" }, true)
                        .field("Receiving channel", settings.bump_channel_id
                            .map(|id| format!("<#{}>", id))
                            .unwrap_or_else(|| "Not set".to_string()), true)
                        .field("Last bump", last_bump
                            .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                            .unwrap_or_else(|| "Never".to_string()), true)
                        .field("Ready", match cooldown {
                            Some(minutes) => format!("In {} minutes", minutes),
                            None => "Now".to_string()
                        }, true)
                }))
        }).await.map_err(|err| AxiomError { cause: format!("Failed to send interaction response: {}", err) })
    }
}

pub struct BumpChannelCommand;

#[async_trait]
impl Command for BumpChannelCommand {
    fn name(&self) -> &'static str {
        "bumpchannel"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("bumpchannel")
            .description("Manage the channel that receives bumps from other servers")
            .create_option(|option| {
                option.name("set")
                    .description("Register a channel to receive bumps")
                    .kind(ApplicationCommandOptionType::SubCommand)
                    .create_sub_option(|suboption| {
                        suboption.name("channel")
                            .description("The channel to deliver bumps to")
                            .kind(ApplicationCommandOptionType::Channel)
                            .required(true)
                    })
            })
            .create_option(|option| {
                option.name("remove")
                    .description("Stop receiving bumps")
                    .kind(ApplicationCommandOptionType::SubCommand)
            })
            .create_option(|option| {
                option.name("info")
                    .description("Show the currently registered bump channel")
                    .kind(ApplicationCommandOptionType::SubCommand)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let subcommand = command.data.options.get(0)
            .ok_or(AxiomError { cause: "Subcommand is required.".to_string() })?;

        let mut settings = app.storage.guild_settings(guild_id.0).await?;

        match subcommand.name.as_str() {
            "set" => {
                if !require_permission(ctx, command, Permissions::MANAGE_CHANNELS, "Manage Channels").await? {
                    return Ok(());
                }

                let mut channel_id_opt: Option<u64> = None;
                for option in &subcommand.options {
                    match option.name.as_str() {
                        "channel" => {
                            if let ApplicationCommandInteractionDataOptionValue::Channel(channel) = &option.resolved.as_ref()
                                .ok_or(AxiomError { cause: "Couldn't resolve 'channel' param".to_string() })? {
                                channel_id_opt = Some(channel.id.0);
                            } else {
                                return Err(AxiomError { cause: "Unexpected type for 'channel' param".to_string() });
                            }
                        }
                        unknown => return Err(AxiomError { cause: format!("Unknown parameter: {}", unknown) })
                    }
                }
                let channel_id = channel_id_opt.ok_or(AxiomError { cause: "Requires 'channel' param".to_string() })?;

                settings.bump_channel_id = Some(channel_id);
                app.storage.save_guild_settings(&settings).await?;

                respond_text(ctx, command, &format!("✅ Bumps from other servers will now be delivered to <#{}>.", channel_id)).await
            }
            "remove" => {
                if !require_permission(ctx, command, Permissions::MANAGE_CHANNELS, "Manage Channels").await? {
                    return Ok(());
                }

                if settings.bump_channel_id.is_none() {
                    return respond_ephemeral(ctx, command, "❌ No bump channel is currently set.").await;
                }

                settings.bump_channel_id = None;
                app.storage.save_guild_settings(&settings).await?;

                respond_text(ctx, command, "✅ This server will no longer receive bumps.").await
            }
            "info" => {
                let reply = match settings.bump_channel_id {
                    Some(id) => format!("Bumps are delivered to <#{}>.", id),
                    None => "No bump channel is set. Use /bumpchannel set to register one.".to_string()
                };
                respond_ephemeral(ctx, command, &reply).await
            }
            unknown => Err(AxiomError { cause: format!("Unknown subcommand: {}", unknown) })
        }
    }
}
