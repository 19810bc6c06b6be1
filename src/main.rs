mod app;
mod bump;
mod commands;
mod config;
mod error;
mod greetings;
mod invites;
mod membership;
mod model;
mod notify;
mod pages;
mod reaction_roles;
mod storage;
mod template;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sea_orm::{DatabaseConnection, SqlxPostgresConnector};

use serenity::async_trait;
use serenity::client::bridge::gateway::GatewayIntents;
use serenity::model::channel::{Message, Reaction};
use serenity::model::event::{InviteCreateEvent, InviteDeleteEvent};
use serenity::model::gateway::Ready;
use serenity::model::guild::Member;
use serenity::model::id::GuildId;
use serenity::model::interactions::application_command::ApplicationCommand;
use serenity::model::interactions::{Interaction, InteractionResponseType};
use serenity::model::prelude::InteractionApplicationCommandCallbackDataFlags;
use serenity::model::user::User;
use serenity::prelude::*;
use tracing::{error, info};

use crate::app::App;
use crate::storage::SqlStorage;

struct AxiomEventHandler {
    app: Arc<App>
}

#[async_trait]
impl EventHandler for AxiomEventHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Connected to Discord as {}#{}", ready.user.name, ready.user.discriminator);
    }

    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        invites::prime_ledger(&self.app, &ctx, &guilds).await;
        info!("Invite ledger primed for {} guilds", guilds.len());

        // Bulk overwrite of the global command set; safe to repeat on
        // every connect, last registration wins.
        match ApplicationCommand::set_global_application_commands(&ctx.http, |builder| {
            commands::create_commands(&self.app.commands, builder)
        }).await {
            Ok(registered) => info!("Registered {} application commands", registered.len()),
            Err(err) => error!("Failed to register application commands: {}", err)
        }
    }

    async fn guild_member_addition(&self, ctx: Context, guild_id: GuildId, new_member: Member) {
        invites::handle_member_join(&self.app, &ctx, guild_id, &new_member).await;
        greetings::send_welcome(&self.app, &ctx, guild_id, new_member.user.id.0).await;
    }

    async fn guild_member_removal(&self, ctx: Context, guild_id: GuildId, user: User, _member: Option<Member>) {
        membership::handle_member_leave(&self.app, &ctx, guild_id, user.id, &user.name).await;
        greetings::send_goodbye(&self.app, &ctx, guild_id, &user.name).await;
    }

    async fn reaction_add(&self, ctx: Context, added_reaction: Reaction) {
        reaction_roles::handle_reaction_add(&self.app, &ctx, &added_reaction).await;
    }

    async fn reaction_remove(&self, ctx: Context, removed_reaction: Reaction) {
        reaction_roles::handle_reaction_remove(&self.app, &ctx, &removed_reaction).await;
    }

    async fn invite_create(&self, _ctx: Context, data: InviteCreateEvent) {
        if let Some(guild_id) = data.guild_id {
            self.app.invites.record_create(guild_id.0, &data.code, 0).await;
        }
    }

    async fn invite_delete(&self, _ctx: Context, data: InviteDeleteEvent) {
        if let Some(guild_id) = data.guild_id {
            self.app.invites.record_delete(guild_id.0, &data.code).await;
        }
    }

    async fn message(&self, ctx: Context, new_message: Message) {
        pages::handle_message(&self.app, &ctx, &new_message).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match &interaction {
            Interaction::ApplicationCommand(command) => {
                if let Err(err) = commands::dispatch_command(&self.app, &ctx, command).await {
                    error!("Error while processing /{}: {}", command.data.name, err.cause);
                    if let Err(err) = command.create_interaction_response(&ctx.http, |response| {
                        response.kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|message| message
                                .content("❌ Something went wrong while processing your command.")
                                .flags(InteractionApplicationCommandCallbackDataFlags::EPHEMERAL))
                    }).await {
                        error!("Error while sending error message: {}", err);
                    }
                }
            }
            Interaction::MessageComponent(component) => {
                if let Err(err) = commands::dispatch_component(&self.app, &ctx, component).await {
                    error!("Error while processing component {}: {}", component.data.custom_id, err.cause);
                    if let Err(err) = component.create_interaction_response(&ctx.http, |response| {
                        response.kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|message| message
                                .content("❌ Something went wrong.")
                                .flags(InteractionApplicationCommandCallbackDataFlags::EPHEMERAL))
                    }).await {
                        error!("Error while sending error message: {}", err);
                    }
                }
            }
            _ => {
                error!("Unexpected interaction type: {:?}", interaction.kind());
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let config = config::load_config();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // A missing token is fatal: report and stop, no retries.
    if config.discord_bot_token.trim().is_empty() {
        error!("discord_bot_token is empty; refusing to start.");
        return;
    }

    let pool = PgPoolOptions::new()
        .max_connections(32)
        .connect(format!("postgres://axiom:{}@localhost/axiom", config.postgres_password).as_str()).await
        .expect("Unable to open DB connection");
    sqlx::migrate!().run(&pool).await
        .expect("Unable to migrate DB");

    let db: DatabaseConnection = SqlxPostgresConnector::from_sqlx_postgres_pool(pool);
    let app = Arc::new(App::new(config.clone(), Arc::new(SqlStorage::new(db))));

    let mut client = Client::builder(config.discord_bot_token.as_str())
        .intents(GatewayIntents::non_privileged().union(GatewayIntents::GUILD_MEMBERS))
        .event_handler(AxiomEventHandler { app })
        .application_id(config.discord_application_id)
        .await
        .expect("Failed to create discord client");

    if let Err(err) = client.start().await {
        error!("Failed to start discord client: {:?}", err);
    }
}
