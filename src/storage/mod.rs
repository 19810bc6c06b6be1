mod sql;
pub mod memory;

pub use sql::SqlStorage;

use chrono::{DateTime, Utc};
use serenity::async_trait;

use crate::error::AxiomError;
use crate::membership::PenaltyPolicy;
use crate::template::{TemplateDefinition, TemplateProcess};

/// A directory-website account, as the bot sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectoryUser {
    pub id: String,
    pub username: String,
    pub coins: i64,
    pub invite_count: i32
}

/// Result of closing a membership record on leave.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaveOutcome {
    pub coins_deducted: i64,
    pub new_balance: i64
}

/// Per-guild bot settings. One row per guild, last write wins.
#[derive(Clone, Debug, PartialEq)]
pub struct GuildConfig {
    pub guild_id: u64,
    pub bump_channel_id: Option<u64>,
    pub quest_channel_id: Option<u64>,
    pub boost_channel_id: Option<u64>,
    pub command_prefix: String,
    pub welcome_channel_id: Option<u64>,
    pub welcome_message: Option<String>,
    pub goodbye_channel_id: Option<u64>,
    pub goodbye_message: Option<String>
}

impl GuildConfig {
    pub fn new(guild_id: u64) -> GuildConfig {
        GuildConfig {
            guild_id,
            bump_channel_id: None,
            quest_channel_id: None,
            boost_channel_id: None,
            command_prefix: "!".to_string(),
            welcome_channel_id: None,
            welcome_message: None,
            goodbye_channel_id: None,
            goodbye_message: None
        }
    }
}

/// The invoking guild's listing data needed to run and render a bump.
#[derive(Clone, Debug, PartialEq)]
pub struct BumpProfile {
    pub guild_id: u64,
    pub name: String,
    pub description: String,
    pub invite_url: String,
    pub member_count: i32,
    pub enabled: bool,
    pub last_bump_at: Option<DateTime<Utc>>
}

/// A registered bump destination.
#[derive(Clone, Debug, PartialEq)]
pub struct BumpTarget {
    pub guild_id: u64,
    pub channel_id: u64
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReactionRoleBinding {
    pub guild_id: u64,
    pub message_id: u64,
    pub emoji: String,
    pub role_id: u64
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewSupportTicket {
    pub user_id: String,
    pub discord_user_id: String,
    pub username: String,
    pub message: String,
    pub guild_name: String
}

/// Everything the bot consumes from the directory's data store. The
/// website owns most of these tables; the bot reads them and writes the
/// handful of columns called out on each method.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn user_by_discord_id(&self, discord_id: u64) -> Result<Option<DirectoryUser>, AxiomError>;

    async fn set_user_coins(&self, user_id: &str, coins: i64) -> Result<(), AxiomError>;

    /// Bumps the user's lifetime invite counter by one.
    async fn record_invite_credit(&self, user_id: &str) -> Result<(), AxiomError>;

    /// Closes the user's open membership row for the guild, deducting the
    /// policy's penalty when the stay was under the threshold. Returns
    /// None when the user has no open membership for the guild.
    async fn handle_membership_leave(&self, user_id: &str, guild_id: u64, left_at: DateTime<Utc>, policy: &PenaltyPolicy)
        -> Result<Option<LeaveOutcome>, AxiomError>;

    /// Never fails on a missing row; absent guilds get defaults.
    async fn guild_settings(&self, guild_id: u64) -> Result<GuildConfig, AxiomError>;

    async fn save_guild_settings(&self, settings: &GuildConfig) -> Result<(), AxiomError>;

    async fn bump_profile(&self, guild_id: u64) -> Result<Option<BumpProfile>, AxiomError>;

    /// Every guild with a registered bump channel, the invoker included.
    async fn bump_targets(&self) -> Result<Vec<BumpTarget>, AxiomError>;

    async fn record_bump(&self, guild_id: u64, at: DateTime<Utc>) -> Result<(), AxiomError>;

    async fn template_by_link(&self, link: &str) -> Result<Option<TemplateDefinition>, AxiomError>;

    async fn template_process(&self, guild_id: u64) -> Result<Option<TemplateProcess>, AxiomError>;

    async fn save_template_process(&self, process: &TemplateProcess) -> Result<(), AxiomError>;

    /// Compare-and-swap: pending_confirmation -> in_progress. Returns
    /// true only for the caller that performed the transition, so two
    /// concurrent confirmations admit exactly one runner.
    async fn begin_template_run(&self, guild_id: u64) -> Result<bool, AxiomError>;

    async fn reaction_role(&self, guild_id: u64, message_id: u64, emoji: &str) -> Result<Option<u64>, AxiomError>;

    async fn save_reaction_role(&self, binding: &ReactionRoleBinding) -> Result<(), AxiomError>;

    /// Returns the generated ticket id.
    async fn create_support_ticket(&self, ticket: &NewSupportTicket) -> Result<String, AxiomError>;
}
