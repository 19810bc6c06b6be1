use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serenity::async_trait;

use crate::error::AxiomError;
use crate::membership::{penalty_for, PenaltyPolicy};
use crate::storage::{BumpProfile, BumpTarget, DirectoryUser, GuildConfig, LeaveOutcome, NewSupportTicket, ReactionRoleBinding, Storage};
use crate::template::{ProcessStatus, TemplateDefinition, TemplateProcess};

#[derive(Clone, Debug)]
struct MembershipRecord {
    user_id: String,
    guild_id: u64,
    created_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, DirectoryUser>,
    discord_index: HashMap<u64, String>,
    joins: Vec<MembershipRecord>,
    settings: HashMap<u64, GuildConfig>,
    listings: HashMap<u64, BumpProfile>,
    templates: HashMap<String, TemplateDefinition>,
    processes: HashMap<u64, TemplateProcess>,
    reaction_roles: HashMap<(u64, u64, String), u64>,
    tickets: Vec<NewSupportTicket>
}

/// Process-lifetime storage. Backs the test suite, and doubles as the
/// no-database mode the settings store allows.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    pub fn seed_user(&self, id: &str, username: &str, discord_id: u64, coins: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.users.insert(id.to_string(), DirectoryUser {
            id: id.to_string(),
            username: username.to_string(),
            coins,
            invite_count: 0
        });
        inner.discord_index.insert(discord_id, id.to_string());
    }

    pub fn seed_join(&self, user_id: &str, guild_id: u64, joined_at: DateTime<Utc>) {
        self.inner.lock().unwrap().joins.push(MembershipRecord {
            user_id: user_id.to_string(),
            guild_id,
            created_at: joined_at,
            left_at: None
        });
    }

    pub fn seed_listing(&self, profile: BumpProfile) {
        self.inner.lock().unwrap().listings.insert(profile.guild_id, profile);
    }

    pub fn seed_template(&self, link: &str, template: TemplateDefinition) {
        self.inner.lock().unwrap().templates.insert(link.to_string(), template);
    }

    pub fn tickets(&self) -> Vec<NewSupportTicket> {
        self.inner.lock().unwrap().tickets.clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn user_by_discord_id(&self, discord_id: u64) -> Result<Option<DirectoryUser>, AxiomError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.discord_index.get(&discord_id).and_then(|id| inner.users.get(id)).cloned())
    }

    async fn set_user_coins(&self, user_id: &str, coins: i64) -> Result<(), AxiomError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.get_mut(user_id) {
            Some(user) => {
                user.coins = coins;
                Ok(())
            }
            None => Err(AxiomError::new(format!("No directory user {}", user_id)))
        }
    }

    async fn record_invite_credit(&self, user_id: &str) -> Result<(), AxiomError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.get_mut(user_id) {
            Some(user) => {
                user.invite_count += 1;
                Ok(())
            }
            None => Err(AxiomError::new(format!("No directory user {}", user_id)))
        }
    }

    async fn handle_membership_leave(&self, user_id: &str, guild_id: u64, left_at: DateTime<Utc>, policy: &PenaltyPolicy)
            -> Result<Option<LeaveOutcome>, AxiomError> {
        let mut inner = self.inner.lock().unwrap();

        let join = inner.joins.iter_mut()
            .find(|join| join.user_id == user_id && join.guild_id == guild_id && join.left_at.is_none());
        let join = match join {
            Some(join) => join,
            None => return Ok(None)
        };

        let coins_deducted = penalty_for(join.created_at, left_at, policy);
        join.left_at = Some(left_at);

        let user = match inner.users.get_mut(user_id) {
            Some(user) => user,
            None => return Err(AxiomError::new(format!("No directory user {}", user_id)))
        };

        let new_balance = (user.coins - coins_deducted).max(0);
        if coins_deducted > 0 {
            user.coins = new_balance;
        }

        Ok(Some(LeaveOutcome { coins_deducted, new_balance }))
    }

    async fn guild_settings(&self, guild_id: u64) -> Result<GuildConfig, AxiomError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.settings.get(&guild_id).cloned().unwrap_or_else(|| GuildConfig::new(guild_id)))
    }

    async fn save_guild_settings(&self, settings: &GuildConfig) -> Result<(), AxiomError> {
        self.inner.lock().unwrap().settings.insert(settings.guild_id, settings.clone());
        Ok(())
    }

    async fn bump_profile(&self, guild_id: u64) -> Result<Option<BumpProfile>, AxiomError> {
        Ok(self.inner.lock().unwrap().listings.get(&guild_id).cloned())
    }

    async fn bump_targets(&self) -> Result<Vec<BumpTarget>, AxiomError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.settings.values()
            .filter_map(|settings| settings.bump_channel_id.map(|channel_id| BumpTarget {
                guild_id: settings.guild_id,
                channel_id
            }))
            .collect())
    }

    async fn record_bump(&self, guild_id: u64, at: DateTime<Utc>) -> Result<(), AxiomError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.listings.get_mut(&guild_id) {
            Some(listing) => {
                listing.last_bump_at = Some(at);
                Ok(())
            }
            None => Err(AxiomError::new(format!("No listing for guild {}", guild_id)))
        }
    }

    async fn template_by_link(&self, link: &str) -> Result<Option<TemplateDefinition>, AxiomError> {
        Ok(self.inner.lock().unwrap().templates.get(link).cloned())
    }

    async fn template_process(&self, guild_id: u64) -> Result<Option<TemplateProcess>, AxiomError> {
        Ok(self.inner.lock().unwrap().processes.get(&guild_id).cloned())
    }

    async fn save_template_process(&self, process: &TemplateProcess) -> Result<(), AxiomError> {
        self.inner.lock().unwrap().processes.insert(process.guild_id, process.clone());
        Ok(())
    }

    async fn begin_template_run(&self, guild_id: u64) -> Result<bool, AxiomError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.processes.get_mut(&guild_id) {
            Some(process) if process.status == ProcessStatus::PendingConfirmation => {
                process.status = ProcessStatus::InProgress;
                Ok(true)
            }
            _ => Ok(false)
        }
    }

    async fn reaction_role(&self, guild_id: u64, message_id: u64, emoji: &str) -> Result<Option<u64>, AxiomError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.reaction_roles.get(&(guild_id, message_id, emoji.to_string())).copied())
    }

    async fn save_reaction_role(&self, binding: &ReactionRoleBinding) -> Result<(), AxiomError> {
        self.inner.lock().unwrap().reaction_roles
            .insert((binding.guild_id, binding.message_id, binding.emoji.clone()), binding.role_id);
        Ok(())
    }

    async fn create_support_ticket(&self, ticket: &NewSupportTicket) -> Result<String, AxiomError> {
        let mut inner = self.inner.lock().unwrap();
        inner.tickets.push(ticket.clone());
        Ok(format!("TKT-{:06}", inner.tickets.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settings_default_until_written_and_last_write_wins() {
        let storage = MemoryStorage::new();

        let defaults = storage.guild_settings(1).await.unwrap();
        assert_eq!(defaults.command_prefix, "!");
        assert_eq!(defaults.bump_channel_id, None);

        let mut settings = defaults;
        settings.bump_channel_id = Some(10);
        storage.save_guild_settings(&settings).await.unwrap();

        settings.bump_channel_id = Some(20);
        storage.save_guild_settings(&settings).await.unwrap();
        assert_eq!(storage.guild_settings(1).await.unwrap().bump_channel_id, Some(20));

        settings.bump_channel_id = None;
        storage.save_guild_settings(&settings).await.unwrap();
        assert_eq!(storage.guild_settings(1).await.unwrap().bump_channel_id, None);
    }

    #[tokio::test]
    async fn record_bump_advances_the_timestamp() {
        let storage = MemoryStorage::new();
        storage.seed_listing(BumpProfile {
            guild_id: 1,
            name: "Axiom HQ".to_string(),
            description: "The place".to_string(),
            invite_url: "https://discord.gg/axiom".to_string(),
            member_count: 250,
            enabled: true,
            last_bump_at: None
        });

        let now = Utc::now();
        storage.record_bump(1, now).await.unwrap();

        let profile = storage.bump_profile(1).await.unwrap().unwrap();
        assert_eq!(profile.last_bump_at, Some(now));
    }

    #[tokio::test]
    async fn concurrent_confirmations_admit_one_runner() {
        use crate::template::{TemplateDefinition, TemplateProcess};

        let storage = MemoryStorage::new();
        let template = TemplateDefinition {
            id: "tpl-1".to_string(),
            name: "Starter".to_string(),
            channels: vec![],
            roles: vec![]
        };
        let process = TemplateProcess::pending(1, &template, 99, Utc::now());
        storage.save_template_process(&process).await.unwrap();

        assert!(storage.begin_template_run(1).await.unwrap());
        assert!(!storage.begin_template_run(1).await.unwrap());
        assert!(!storage.begin_template_run(2).await.unwrap());
    }
}
