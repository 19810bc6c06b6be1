use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serenity::model::channel::ChannelType;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Context;
use tracing::{error, info};

use crate::app::App;
use crate::notify;

/// One channel entry of a stored template, as the website editor emits it.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TemplateChannel {
    pub name: String,
    #[serde(default)]
    pub kind: TemplateChannelKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub topic: Option<String>
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TemplateChannelKind {
    Text,
    Voice,
    Category
}

impl Default for TemplateChannelKind {
    fn default() -> TemplateChannelKind {
        TemplateChannelKind::Text
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TemplateRole {
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub mentionable: bool
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateDefinition {
    pub id: String,
    pub name: String,
    pub channels: Vec<TemplateChannel>,
    pub roles: Vec<TemplateRole>
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProcessStatus {
    PendingConfirmation,
    InProgress,
    Completed,
    Failed
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::PendingConfirmation => "pending_confirmation",
            ProcessStatus::InProgress => "in_progress",
            ProcessStatus::Completed => "completed",
            ProcessStatus::Failed => "failed"
        }
    }

    pub fn parse(value: &str) -> Option<ProcessStatus> {
        match value {
            "pending_confirmation" => Some(ProcessStatus::PendingConfirmation),
            "in_progress" => Some(ProcessStatus::InProgress),
            "completed" => Some(ProcessStatus::Completed),
            "failed" => Some(ProcessStatus::Failed),
            _ => None
        }
    }
}

/// The per-guild application record. Counts and errors accumulate as the
/// workflow walks the deletion and creation phases; the record is never
/// rolled back.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateProcess {
    pub guild_id: u64,
    pub template_id: String,
    pub template_name: String,
    pub status: ProcessStatus,
    pub total_channels: u32,
    pub total_roles: u32,
    pub channels_deleted: u32,
    pub roles_deleted: u32,
    pub channels_created: u32,
    pub roles_created: u32,
    pub errors: Vec<String>,
    pub requested_by: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>
}

impl TemplateProcess {
    pub fn pending(guild_id: u64, template: &TemplateDefinition, requested_by: u64, now: DateTime<Utc>) -> TemplateProcess {
        TemplateProcess {
            guild_id,
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            status: ProcessStatus::PendingConfirmation,
            total_channels: template.channels.len() as u32,
            total_roles: template.roles.len() as u32,
            channels_deleted: 0,
            roles_deleted: 0,
            channels_created: 0,
            roles_created: 0,
            errors: Vec::new(),
            requested_by,
            created_at: now,
            started_at: None,
            completed_at: None
        }
    }

    /// A second /addtemplate only counts as the confirmation while the
    /// pending record is inside the window; older records are stale.
    pub fn confirmable_at(&self, now: DateTime<Utc>, window_seconds: i64) -> bool {
        self.status == ProcessStatus::PendingConfirmation
            && now.signed_duration_since(self.created_at) <= Duration::seconds(window_seconds)
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.status = ProcessStatus::InProgress;
        self.started_at = Some(now);
    }

    pub fn record_channel_deleted(&mut self) {
        self.channels_deleted += 1;
    }

    pub fn record_role_deleted(&mut self) {
        self.roles_deleted += 1;
    }

    pub fn record_channel_created(&mut self) {
        self.channels_created += 1;
    }

    pub fn record_role_created(&mut self) {
        self.roles_created += 1;
    }

    pub fn record_error(&mut self, error: String) {
        self.errors.push(error);
    }

    /// Terminal success. Accumulated errors are informational; a run that
    /// created 8 of 10 channels still completes.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = ProcessStatus::Completed;
        self.completed_at = Some(now);
    }

    /// Terminal failure, only for a run that could not start at all.
    pub fn fail(&mut self, error: String, now: DateTime<Utc>) {
        self.status = ProcessStatus::Failed;
        self.errors.push(error);
        self.completed_at = Some(now);
    }
}

/// Applies a confirmed template to the guild: best-effort deletion of the
/// existing channels and roles, then recreation from the template. Runs
/// detached from the interaction; progress is persisted after every item
/// so /templateprocess can poll mid-flight.
pub async fn run_application(app: Arc<App>, ctx: Context, guild_id: GuildId, reply_channel: ChannelId,
                             template: TemplateDefinition, mut process: TemplateProcess) {
    info!("Applying template '{}' to guild {}", template.name, guild_id.0);

    let system_channel = match ctx.cache.guild(guild_id).await {
        Some(guild) => guild.system_channel_id,
        None => None
    };

    // Deletion phase: every existing channel except the system channel.
    match guild_id.channels(&ctx.http).await {
        Ok(channels) => {
            for (channel_id, channel) in channels {
                if Some(channel_id) == system_channel {
                    continue;
                }
                match channel_id.delete(&ctx.http).await {
                    Ok(_) => process.record_channel_deleted(),
                    Err(err) => process.record_error(format!("Failed to delete channel #{}: {}", channel.name, err))
                }
                save_progress(&app, &process).await;
            }
        }
        Err(err) => process.record_error(format!("Failed to list channels: {}", err))
    }

    // Deletion phase: every role except @everyone and platform-managed ones.
    match ctx.http.get_guild_roles(guild_id.0).await {
        Ok(roles) => {
            for role in roles {
                if role.managed || role.id.0 == guild_id.0 {
                    continue;
                }
                match ctx.http.delete_role(guild_id.0, role.id.0).await {
                    Ok(_) => process.record_role_deleted(),
                    Err(err) => process.record_error(format!("Failed to delete role @{}: {}", role.name, err))
                }
                save_progress(&app, &process).await;
            }
        }
        Err(err) => process.record_error(format!("Failed to list roles: {}", err))
    }

    // Creation phase: roles first, then categories, then their children.
    for role in &template.roles {
        let result = guild_id.create_role(&ctx.http, |builder| {
            builder.name(&role.name)
                .colour(role.color as u64)
                .hoist(role.hoist)
                .mentionable(role.mentionable)
        }).await;
        match result {
            Ok(_) => process.record_role_created(),
            Err(err) => process.record_error(format!("Failed to create role @{}: {}", role.name, err))
        }
        save_progress(&app, &process).await;
    }

    let mut category_ids: HashMap<String, ChannelId> = HashMap::new();
    for channel in template.channels.iter().filter(|c| c.kind == TemplateChannelKind::Category) {
        let result = guild_id.create_channel(&ctx.http, |builder| {
            builder.name(&channel.name).kind(ChannelType::Category)
        }).await;
        match result {
            Ok(created) => {
                category_ids.insert(channel.name.clone(), created.id);
                process.record_channel_created();
            }
            Err(err) => process.record_error(format!("Failed to create category {}: {}", channel.name, err))
        }
        save_progress(&app, &process).await;
    }

    for channel in template.channels.iter().filter(|c| c.kind != TemplateChannelKind::Category) {
        let kind = match channel.kind {
            TemplateChannelKind::Voice => ChannelType::Voice,
            _ => ChannelType::Text
        };
        let parent = channel.category.as_ref().and_then(|name| category_ids.get(name)).copied();
        let result = guild_id.create_channel(&ctx.http, |builder| {
            builder.name(&channel.name).kind(kind);
            if let Some(topic) = &channel.topic {
                builder.topic(topic);
            }
            if let Some(parent_id) = parent {
                builder.category(parent_id);
            }
            builder
        }).await;
        match result {
            Ok(_) => process.record_channel_created(),
            Err(err) => process.record_error(format!("Failed to create channel #{}: {}", channel.name, err))
        }
        save_progress(&app, &process).await;
    }

    process.complete(Utc::now());
    save_progress(&app, &process).await;

    info!("Template '{}' applied to guild {}: {} channels, {} roles, {} errors",
        template.name, guild_id.0, process.channels_created, process.roles_created, process.errors.len());

    let summary = if process.errors.is_empty() {
        format!("✅ Template **{}** applied: {} channels and {} roles created.",
            template.name, process.channels_created, process.roles_created)
    } else {
        format!("✅ Template **{}** applied: {} channels and {} roles created, {} steps failed. Run /templateprocess for details.",
            template.name, process.channels_created, process.roles_created, process.errors.len())
    };
    notify::channel_message(&ctx, reply_channel, &summary).await;
}

async fn save_progress(app: &App, process: &TemplateProcess) {
    if let Err(err) = app.storage.save_template_process(process).await {
        error!("Failed to persist template progress for guild {}: {}", process.guild_id, err.cause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> TemplateDefinition {
        TemplateDefinition {
            id: "tpl-1".to_string(),
            name: "Community Starter".to_string(),
            channels: (0..10).map(|i| TemplateChannel {
                name: format!("channel-{}", i),
                kind: TemplateChannelKind::Text,
                category: None,
                topic: None
            }).collect(),
            roles: vec![TemplateRole { name: "Member".to_string(), color: 0, hoist: false, mentionable: false }]
        }
    }

    #[test]
    fn partial_channel_failures_still_complete() {
        let now = Utc::now();
        let mut process = TemplateProcess::pending(1, &template(), 99, now);
        process.start(now);

        for _ in 0..8 {
            process.record_channel_created();
        }
        process.record_error("Failed to create channel #channel-8: Missing Permissions".to_string());
        process.record_error("Failed to create channel #channel-9: Missing Permissions".to_string());
        process.complete(now);

        assert_eq!(process.status, ProcessStatus::Completed);
        assert_eq!(process.channels_created, 8);
        assert_eq!(process.errors.len(), 2);
        assert!(process.completed_at.is_some());
    }

    #[test]
    fn pending_confirmable_inside_window_only() {
        let now = Utc::now();
        let process = TemplateProcess::pending(1, &template(), 99, now);

        assert!(process.confirmable_at(now + Duration::seconds(30), 60));
        assert!(process.confirmable_at(now + Duration::seconds(60), 60));
        assert!(!process.confirmable_at(now + Duration::seconds(61), 60));
    }

    #[test]
    fn non_pending_records_are_never_confirmable() {
        let now = Utc::now();
        let mut process = TemplateProcess::pending(1, &template(), 99, now);
        process.start(now);

        assert!(!process.confirmable_at(now, 60));
    }

    #[test]
    fn failed_fetch_marks_failed_without_counts() {
        let now = Utc::now();
        let mut process = TemplateProcess::pending(1, &template(), 99, now);
        process.fail("Template no longer exists".to_string(), now);

        assert_eq!(process.status, ProcessStatus::Failed);
        assert_eq!(process.channels_deleted, 0);
        assert_eq!(process.channels_created, 0);
        assert_eq!(process.errors, vec!["Template no longer exists".to_string()]);
    }

    #[test]
    fn totals_reflect_template_size() {
        let process = TemplateProcess::pending(1, &template(), 99, Utc::now());

        assert_eq!(process.total_channels, 10);
        assert_eq!(process.total_roles, 1);
        assert_eq!(process.status, ProcessStatus::PendingConfirmation);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [ProcessStatus::PendingConfirmation, ProcessStatus::InProgress, ProcessStatus::Completed, ProcessStatus::Failed] {
            assert_eq!(ProcessStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProcessStatus::parse("unknown"), None);
    }
}
