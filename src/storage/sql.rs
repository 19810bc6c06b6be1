use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serenity::async_trait;

use crate::error::AxiomError;
use crate::membership::{penalty_for, PenaltyPolicy};
use crate::model::{guild_settings, reaction_role, server_join, server_listing, server_template, support_ticket, template_process, user};
use crate::storage::{BumpProfile, BumpTarget, DirectoryUser, GuildConfig, LeaveOutcome, NewSupportTicket, ReactionRoleBinding, Storage};
use crate::template::{ProcessStatus, TemplateChannel, TemplateDefinition, TemplateProcess, TemplateRole};

/// Production storage: the directory website's postgres database, shared
/// with the web application.
pub struct SqlStorage {
    db: DatabaseConnection
}

impl SqlStorage {
    pub fn new(db: DatabaseConnection) -> SqlStorage {
        SqlStorage { db }
    }
}

#[async_trait]
impl Storage for SqlStorage {
    async fn user_by_discord_id(&self, discord_id: u64) -> Result<Option<DirectoryUser>, AxiomError> {
        let found = user::Entity::find()
            .filter(user::Column::DiscordId.eq(discord_id.to_string()))
            .one(&self.db).await?;

        Ok(found.map(|model| DirectoryUser {
            id: model.id,
            username: model.username,
            coins: model.coins,
            invite_count: model.invite_count
        }))
    }

    async fn set_user_coins(&self, user_id: &str, coins: i64) -> Result<(), AxiomError> {
        let update = user::ActiveModel {
            id: Set(user_id.to_string()),
            coins: Set(coins),
            ..Default::default()
        };
        update.update(&self.db).await?;
        Ok(())
    }

    async fn record_invite_credit(&self, user_id: &str) -> Result<(), AxiomError> {
        let found = user::Entity::find_by_id(user_id.to_string()).one(&self.db).await?;
        let model = match found {
            Some(model) => model,
            None => return Err(AxiomError::new(format!("No directory user {}", user_id)))
        };

        let update = user::ActiveModel {
            id: Set(user_id.to_string()),
            invite_count: Set(model.invite_count + 1),
            ..Default::default()
        };
        update.update(&self.db).await?;
        Ok(())
    }

    async fn handle_membership_leave(&self, user_id: &str, guild_id: u64, left_at: DateTime<Utc>, policy: &PenaltyPolicy)
            -> Result<Option<LeaveOutcome>, AxiomError> {
        let open_join = server_join::Entity::find()
            .filter(server_join::Column::UserId.eq(user_id))
            .filter(server_join::Column::GuildId.eq(guild_id as i64))
            .filter(server_join::Column::LeftAt.is_null())
            .one(&self.db).await?;

        let join = match open_join {
            Some(join) => join,
            // Never joined through the directory, or the leave was already settled.
            None => return Ok(None)
        };

        let joined_at = join.created_at.with_timezone(&Utc);
        let coins_deducted = penalty_for(joined_at, left_at, policy);

        let close = server_join::ActiveModel {
            id: Set(join.id),
            left_at: Set(Some(left_at.into())),
            coins_deducted: Set(coins_deducted),
            ..Default::default()
        };
        close.update(&self.db).await?;

        let account = user::Entity::find_by_id(user_id.to_string()).one(&self.db).await?;
        let account = match account {
            Some(account) => account,
            None => return Err(AxiomError::new(format!("No directory user {}", user_id)))
        };

        let new_balance = (account.coins - coins_deducted).max(0);
        if coins_deducted > 0 {
            let update = user::ActiveModel {
                id: Set(user_id.to_string()),
                coins: Set(new_balance),
                ..Default::default()
            };
            update.update(&self.db).await?;
        }

        Ok(Some(LeaveOutcome { coins_deducted, new_balance }))
    }

    async fn guild_settings(&self, guild_id: u64) -> Result<GuildConfig, AxiomError> {
        let found = guild_settings::Entity::find_by_id(guild_id as i64).one(&self.db).await?;

        Ok(match found {
            Some(model) => settings_from_model(model),
            None => GuildConfig::new(guild_id)
        })
    }

    async fn save_guild_settings(&self, settings: &GuildConfig) -> Result<(), AxiomError> {
        let row = guild_settings::ActiveModel {
            guild_id: Set(settings.guild_id as i64),
            bump_channel_id: Set(settings.bump_channel_id.map(|id| id as i64)),
            quest_channel_id: Set(settings.quest_channel_id.map(|id| id as i64)),
            boost_channel_id: Set(settings.boost_channel_id.map(|id| id as i64)),
            command_prefix: Set(settings.command_prefix.clone()),
            welcome_channel_id: Set(settings.welcome_channel_id.map(|id| id as i64)),
            welcome_message: Set(settings.welcome_message.clone()),
            goodbye_channel_id: Set(settings.goodbye_channel_id.map(|id| id as i64)),
            goodbye_message: Set(settings.goodbye_message.clone())
        };

        if guild_settings::Entity::find_by_id(settings.guild_id as i64).one(&self.db).await?.is_some() {
            row.update(&self.db).await?;
        } else {
            row.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn bump_profile(&self, guild_id: u64) -> Result<Option<BumpProfile>, AxiomError> {
        let found = server_listing::Entity::find_by_id(guild_id as i64).one(&self.db).await?;

        Ok(found.map(|model| BumpProfile {
            guild_id: model.guild_id as u64,
            name: model.name,
            description: model.description,
            invite_url: model.invite_url,
            member_count: model.member_count,
            enabled: model.bump_enabled,
            last_bump_at: model.last_bump_at.map(|at| at.with_timezone(&Utc))
        }))
    }

    async fn bump_targets(&self) -> Result<Vec<BumpTarget>, AxiomError> {
        let rows = guild_settings::Entity::find()
            .filter(guild_settings::Column::BumpChannelId.is_not_null())
            .all(&self.db).await?;

        Ok(rows.into_iter()
            .filter_map(|model| model.bump_channel_id.map(|channel_id| BumpTarget {
                guild_id: model.guild_id as u64,
                channel_id: channel_id as u64
            }))
            .collect())
    }

    async fn record_bump(&self, guild_id: u64, at: DateTime<Utc>) -> Result<(), AxiomError> {
        let update = server_listing::ActiveModel {
            guild_id: Set(guild_id as i64),
            last_bump_at: Set(Some(at.into())),
            ..Default::default()
        };
        update.update(&self.db).await?;
        Ok(())
    }

    async fn template_by_link(&self, link: &str) -> Result<Option<TemplateDefinition>, AxiomError> {
        let found = server_template::Entity::find()
            .filter(server_template::Column::TemplateLink.eq(link))
            .one(&self.db).await?;

        let model = match found {
            Some(model) => model,
            None => return Ok(None)
        };

        let channels: Vec<TemplateChannel> = serde_json::from_value(model.channels)
            .map_err(|err| AxiomError::new(format!("Malformed channel list in template {}: {}", model.id, err)))?;
        let roles: Vec<TemplateRole> = serde_json::from_value(model.roles)
            .map_err(|err| AxiomError::new(format!("Malformed role list in template {}: {}", model.id, err)))?;

        Ok(Some(TemplateDefinition {
            id: model.id,
            name: model.name,
            channels,
            roles
        }))
    }

    async fn template_process(&self, guild_id: u64) -> Result<Option<TemplateProcess>, AxiomError> {
        let found = template_process::Entity::find_by_id(guild_id as i64).one(&self.db).await?;

        match found {
            Some(model) => Ok(Some(process_from_model(model)?)),
            None => Ok(None)
        }
    }

    async fn save_template_process(&self, process: &TemplateProcess) -> Result<(), AxiomError> {
        let errors = serde_json::to_value(&process.errors)
            .map_err(|err| AxiomError::new(format!("Failed to serialize process errors: {}", err)))?;

        let row = template_process::ActiveModel {
            guild_id: Set(process.guild_id as i64),
            template_id: Set(process.template_id.clone()),
            template_name: Set(process.template_name.clone()),
            status: Set(process.status.as_str().to_string()),
            total_channels: Set(process.total_channels as i32),
            total_roles: Set(process.total_roles as i32),
            channels_deleted: Set(process.channels_deleted as i32),
            roles_deleted: Set(process.roles_deleted as i32),
            channels_created: Set(process.channels_created as i32),
            roles_created: Set(process.roles_created as i32),
            errors: Set(errors),
            requested_by: Set(process.requested_by as i64),
            created_at: Set(process.created_at.into()),
            started_at: Set(process.started_at.map(|at| at.into())),
            completed_at: Set(process.completed_at.map(|at| at.into()))
        };

        if template_process::Entity::find_by_id(process.guild_id as i64).one(&self.db).await?.is_some() {
            row.update(&self.db).await?;
        } else {
            row.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn begin_template_run(&self, guild_id: u64) -> Result<bool, AxiomError> {
        let result = template_process::Entity::update_many()
            .col_expr(template_process::Column::Status, Expr::value(ProcessStatus::InProgress.as_str()))
            .filter(template_process::Column::GuildId.eq(guild_id as i64))
            .filter(template_process::Column::Status.eq(ProcessStatus::PendingConfirmation.as_str()))
            .exec(&self.db).await?;

        Ok(result.rows_affected == 1)
    }

    async fn reaction_role(&self, guild_id: u64, message_id: u64, emoji: &str) -> Result<Option<u64>, AxiomError> {
        let found = reaction_role::Entity::find()
            .filter(reaction_role::Column::GuildId.eq(guild_id as i64))
            .filter(reaction_role::Column::MessageId.eq(message_id as i64))
            .filter(reaction_role::Column::Emoji.eq(emoji))
            .one(&self.db).await?;

        Ok(found.map(|model| model.role_id as u64))
    }

    async fn save_reaction_role(&self, binding: &ReactionRoleBinding) -> Result<(), AxiomError> {
        let row = reaction_role::ActiveModel {
            guild_id: Set(binding.guild_id as i64),
            message_id: Set(binding.message_id as i64),
            emoji: Set(binding.emoji.clone()),
            role_id: Set(binding.role_id as i64),
            created_at: Set(Utc::now().into())
        };

        let existing = reaction_role::Entity::find()
            .filter(reaction_role::Column::GuildId.eq(binding.guild_id as i64))
            .filter(reaction_role::Column::MessageId.eq(binding.message_id as i64))
            .filter(reaction_role::Column::Emoji.eq(binding.emoji.as_str()))
            .one(&self.db).await?;

        if existing.is_some() {
            row.update(&self.db).await?;
        } else {
            row.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn create_support_ticket(&self, ticket: &NewSupportTicket) -> Result<String, AxiomError> {
        let ticket_id = format!("TKT-{}", Utc::now().format("%Y%m%d%H%M%S"));

        let row = support_ticket::ActiveModel {
            ticket_id: Set(ticket_id.clone()),
            user_id: Set(ticket.user_id.clone()),
            discord_user_id: Set(ticket.discord_user_id.clone()),
            username: Set(ticket.username.clone()),
            message: Set(ticket.message.clone()),
            guild_name: Set(ticket.guild_name.clone()),
            status: Set("open".to_string()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        row.insert(&self.db).await?;

        Ok(ticket_id)
    }
}

fn settings_from_model(model: guild_settings::Model) -> GuildConfig {
    GuildConfig {
        guild_id: model.guild_id as u64,
        bump_channel_id: model.bump_channel_id.map(|id| id as u64),
        quest_channel_id: model.quest_channel_id.map(|id| id as u64),
        boost_channel_id: model.boost_channel_id.map(|id| id as u64),
        command_prefix: model.command_prefix,
        welcome_channel_id: model.welcome_channel_id.map(|id| id as u64),
        welcome_message: model.welcome_message,
        goodbye_channel_id: model.goodbye_channel_id.map(|id| id as u64),
        goodbye_message: model.goodbye_message
    }
}

fn process_from_model(model: template_process::Model) -> Result<TemplateProcess, AxiomError> {
    let status = ProcessStatus::parse(&model.status)
        .ok_or(AxiomError { cause: format!("Unknown template process status: {}", model.status) })?;
    let errors: Vec<String> = serde_json::from_value(model.errors)
        .map_err(|err| AxiomError::new(format!("Malformed error list for guild {}: {}", model.guild_id, err)))?;

    Ok(TemplateProcess {
        guild_id: model.guild_id as u64,
        template_id: model.template_id,
        template_name: model.template_name,
        status,
        total_channels: model.total_channels as u32,
        total_roles: model.total_roles as u32,
        channels_deleted: model.channels_deleted as u32,
        roles_deleted: model.roles_deleted as u32,
        channels_created: model.channels_created as u32,
        roles_created: model.roles_created as u32,
        errors,
        requested_by: model.requested_by as u64,
        created_at: model.created_at.with_timezone(&Utc),
        started_at: model.started_at.map(|at| at.with_timezone(&Utc)),
        completed_at: model.completed_at.map(|at| at.with_timezone(&Utc))
    })
}
