use std::sync::Arc;

use chrono::Utc;
use serenity::builder::CreateApplicationCommand;
use serenity::model::interactions::application_command::{ApplicationCommandInteraction, ApplicationCommandInteractionDataOptionValue, ApplicationCommandOptionType};
use serenity::model::interactions::InteractionResponseType;
use serenity::model::Permissions;
use serenity::prelude::*;
use serenity::async_trait;
use tracing::info;

use crate::app::App;
use crate::commands::{require_permission, respond_ephemeral, respond_text, Command};
use crate::error::AxiomError;
use crate::template::{run_application, ProcessStatus, TemplateProcess};

pub struct AddTemplateCommand;

#[async_trait]
impl Command for AddTemplateCommand {
    fn name(&self) -> &'static str {
        "addtemplate"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("addtemplate")
            .description("Replace this server's channels and roles with a template from the website")
            .create_option(|option| {
                option.name("link")
                    .description("The template link from the website")
                    .kind(ApplicationCommandOptionType::String)
                    .required(true)
            })
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        if !require_permission(ctx, command, Permissions::ADMINISTRATOR, "Administrator").await? {
            return Ok(());
        }

        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let option = command.data.options.get(0)
            .ok_or(AxiomError { cause: "Requires 'link' param".to_string() })?;
        let link = match &option.resolved.as_ref()
            .ok_or(AxiomError { cause: "Couldn't resolve 'link' param".to_string() })? {
            ApplicationCommandInteractionDataOptionValue::String(link) => link.trim().to_string(),
            _ => return Err(AxiomError { cause: "Unexpected type for 'link' param".to_string() })
        };

        if !link.starts_with("https://") {
            return respond_ephemeral(ctx, command, "❌ That doesn't look like a template link. Copy it from the website's template page.").await;
        }

        let template = match app.storage.template_by_link(&link).await? {
            Some(template) => template,
            None => return respond_ephemeral(ctx, command, "❌ No template found for that link.").await
        };

        let now = Utc::now();
        let window = app.config.templates.confirmation_window_seconds;
        let existing = app.storage.template_process(guild_id.0).await?;

        if let Some(process) = &existing {
            if process.status == ProcessStatus::InProgress {
                return respond_ephemeral(ctx, command, "❌ A template application is already running. Check /templateprocess.").await;
            }

            // The confirming re-invocation: same template, inside the window.
            if process.template_id == template.id && process.confirmable_at(now, window) {
                if !app.storage.begin_template_run(guild_id.0).await? {
                    return respond_ephemeral(ctx, command, "❌ A template application is already running. Check /templateprocess.").await;
                }

                let mut process = process.clone();
                process.start(now);
                app.storage.save_template_process(&process).await?;

                info!("Guild {} confirmed template '{}'", guild_id.0, template.name);

                respond_text(ctx, command, &format!(
                    "🚧 Applying **{}**: deleting the current layout and creating {} channels and {} roles. Track it with /templateprocess.",
                    template.name, process.total_channels, process.total_roles
                )).await?;

                tokio::spawn(run_application(Arc::clone(app), ctx.clone(), guild_id, command.channel_id, template, process));
                return Ok(());
            }
        }

        // First invocation, or a stale/different pending record: write a
        // fresh pending record and ask for the confirming re-invocation.
        let process = TemplateProcess::pending(guild_id.0, &template, command.user.id.0, now);
        app.storage.save_template_process(&process).await?;

        respond_text(ctx, command, &format!(
            "⚠️ **{}** will DELETE every channel except the system channel and every role this bot can remove, then create {} channels and {} roles.\nRun /addtemplate with the same link again within {} seconds to confirm.",
            template.name, process.total_channels, process.total_roles, window
        )).await
    }
}

pub struct TemplateProcessCommand;

#[async_trait]
impl Command for TemplateProcessCommand {
    fn name(&self) -> &'static str {
        "templateprocess"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name("templateprocess")
            .description("Show the state of this server's template application")
    }

    async fn run(&self, app: &Arc<App>, ctx: &Context, command: &ApplicationCommandInteraction) -> Result<(), AxiomError> {
        let guild_id = command.guild_id
            .ok_or(AxiomError { cause: "This command can only be run in servers.".to_string() })?;

        let process = match app.storage.template_process(guild_id.0).await? {
            Some(process) => process,
            None => return respond_ephemeral(ctx, command, "No template process found for this server.").await
        };

        let status = match process.status {
            ProcessStatus::PendingConfirmation => "⏸️ Waiting for confirmation",
            ProcessStatus::InProgress => "🚧 In progress",
            ProcessStatus::Completed => "✅ Completed",
            ProcessStatus::Failed => "❌ Failed"
        };

        let errors = if process.errors.is_empty() {
            "None".to_string()
        } else {
            let mut lines: Vec<String> = process.errors.iter().take(5).cloned().collect();
            if process.errors.len() > 5 {
                lines.push(format!("…and {} more", process.errors.len() - 5));
            }
            lines.join("\n")
        };

        command.create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.create_embed(|embed| {
                    embed.title(format!("Template: {}", process.template_name))
                        .field("Status", status, true)
                        .field("Deleted", format!("{} channels, {} roles", process.channels_deleted, process.roles_deleted), true)
                        .field("Created", format!("{}/{} channels, {}/{} roles",
                            process.channels_created, process.total_channels,
                            process.roles_created, process.total_roles), true)
                        .field("Errors", errors, false)
                }))
        }).await.map_err(|err| AxiomError { cause: format!("Failed to send interaction response: {}", err) })
    }
}
