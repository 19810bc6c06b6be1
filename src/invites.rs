use std::collections::HashMap;

use serenity::model::guild::Member;
use serenity::model::id::GuildId;
use serenity::prelude::Context;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::app::App;
use crate::config::EconomyConfig;
use crate::error::AxiomError;
use crate::notify;
use crate::storage::Storage;

/// Per-guild cache of invite-code use counts. Eventually consistent: it
/// is primed on ready, replaced wholesale after every join diff, and
/// nudged by invite-create/-delete events in between. The live fetch is
/// always the source of truth.
pub struct InviteLedger {
    guilds: RwLock<HashMap<u64, HashMap<String, u64>>>
}

impl InviteLedger {
    pub fn new() -> InviteLedger {
        InviteLedger { guilds: RwLock::new(HashMap::new()) }
    }

    pub async fn snapshot(&self, guild_id: u64) -> HashMap<String, u64> {
        self.guilds.read().await.get(&guild_id).cloned().unwrap_or_default()
    }

    pub async fn replace(&self, guild_id: u64, counts: HashMap<String, u64>) {
        self.guilds.write().await.insert(guild_id, counts);
    }

    pub async fn record_create(&self, guild_id: u64, code: &str, uses: u64) {
        self.guilds.write().await.entry(guild_id).or_default().insert(code.to_string(), uses);
    }

    pub async fn record_delete(&self, guild_id: u64, code: &str) {
        if let Some(counts) = self.guilds.write().await.get_mut(&guild_id) {
            counts.remove(code);
        }
    }
}

/// Picks the invite consumed by a join: the one whose live use count
/// exceeds the cached count. None when nothing grew (vanity URL join, or
/// the invite vanished before the fetch) — then no attribution is made.
pub fn find_consumed<'a>(cached: &HashMap<String, u64>, live: &'a [(String, u64)]) -> Option<&'a str> {
    live.iter()
        .find(|(code, uses)| *uses > cached.get(code).copied().unwrap_or(0))
        .map(|(code, _)| code.as_str())
}

#[derive(Clone, Debug, PartialEq)]
pub struct Award {
    pub amount: i64,
    pub new_balance: i64
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct JoinAwards {
    pub inviter: Option<Award>,
    pub joiner: Option<Award>
}

/// Credits the inviter (reward + lifetime invite count) and the joiner
/// (welcome bonus) when their directory accounts exist. The two awards
/// are independent: an unattributed join still pays the welcome bonus.
pub async fn award_join_credits(storage: &dyn Storage, inviter_discord_id: Option<u64>, joiner_discord_id: u64,
                                economy: &EconomyConfig) -> Result<JoinAwards, AxiomError> {
    let mut awards = JoinAwards::default();

    if let Some(inviter_id) = inviter_discord_id {
        if let Some(inviter) = storage.user_by_discord_id(inviter_id).await? {
            let new_balance = inviter.coins + economy.invite_reward;
            storage.set_user_coins(&inviter.id, new_balance).await?;
            storage.record_invite_credit(&inviter.id).await?;
            awards.inviter = Some(Award { amount: economy.invite_reward, new_balance });
        }
    }

    if let Some(joiner) = storage.user_by_discord_id(joiner_discord_id).await? {
        let new_balance = joiner.coins + economy.welcome_bonus;
        storage.set_user_coins(&joiner.id, new_balance).await?;
        awards.joiner = Some(Award { amount: economy.welcome_bonus, new_balance });
    }

    Ok(awards)
}

/// Member-join entry point: diffs live invite counts against the ledger,
/// refreshes the ledger, then pays out. Errors are contained per guild.
pub async fn handle_member_join(app: &App, ctx: &Context, guild_id: GuildId, member: &Member) {
    let live_invites = match ctx.http.get_guild_invites(guild_id.0).await {
        Ok(invites) => invites,
        Err(err) => {
            error!("Failed to fetch invites for guild {}: {}", guild_id.0, err);
            return;
        }
    };

    let live_counts: Vec<(String, u64)> = live_invites.iter()
        .map(|invite| (invite.code.clone(), invite.uses))
        .collect();

    let cached = app.invites.snapshot(guild_id.0).await;
    let used_code = find_consumed(&cached, &live_counts).map(|code| code.to_string());

    // Refresh before awarding so drift cannot accumulate across joins.
    app.invites.replace(guild_id.0, live_counts.into_iter().collect()).await;

    let inviter = used_code.as_deref().and_then(|code| {
        live_invites.iter()
            .find(|invite| invite.code == code)
            .map(|invite| invite.inviter.clone())
    });

    if let Some(inviter_user) = &inviter {
        info!("{} joined guild {} using invite by {}", member.user.name, guild_id.0, inviter_user.name);
    }

    let guild_name = match ctx.cache.guild(guild_id).await {
        Some(guild) => guild.name,
        None => "the server".to_string()
    };

    let awards = match award_join_credits(app.storage.as_ref(), inviter.as_ref().map(|user| user.id.0),
                                          member.user.id.0, &app.config.economy).await {
        Ok(awards) => awards,
        Err(err) => {
            warn!("Failed to award join credits in guild {}: {}", guild_id.0, err.cause);
            return;
        }
    };

    if let (Some(award), Some(inviter_user)) = (&awards.inviter, &inviter) {
        let invite_total = app.storage.user_by_discord_id(inviter_user.id.0).await.ok().flatten()
            .map(|user| user.invite_count)
            .unwrap_or(0);
        notify::dm_user(ctx, inviter_user.id, &format!(
            "🎉 You earned {} coins for inviting {} to {}! Your balance is now {} coins. Total invites: {}",
            award.amount, member.user.name, guild_name, award.new_balance, invite_total
        )).await;
    }

    if let Some(award) = &awards.joiner {
        notify::dm_user(ctx, member.user.id, &format!(
            "Welcome to {}! 🎉 You received {} coins as a welcome bonus!",
            guild_name, award.amount
        )).await;
    }
}

/// One live-count fetch per guild on ready, priming the ledger.
pub async fn prime_ledger(app: &App, ctx: &Context, guild_ids: &[GuildId]) {
    for guild_id in guild_ids {
        match ctx.http.get_guild_invites(guild_id.0).await {
            Ok(invites) => {
                let counts = invites.into_iter().map(|invite| (invite.code, invite.uses)).collect();
                app.invites.replace(guild_id.0, counts).await;
            }
            Err(err) => warn!("Failed to fetch invites for guild {}: {}", guild_id.0, err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    fn live(entries: &[(&str, u64)]) -> Vec<(String, u64)> {
        entries.iter().map(|(code, uses)| (code.to_string(), *uses)).collect()
    }

    #[test]
    fn attributes_the_invite_whose_count_grew() {
        let cached = HashMap::from([("A".to_string(), 3), ("B".to_string(), 5)]);

        assert_eq!(find_consumed(&cached, &live(&[("A", 3), ("B", 6)])), Some("B"));
    }

    #[test]
    fn no_growth_means_no_attribution() {
        let cached = HashMap::from([("A".to_string(), 3), ("B".to_string(), 5)]);

        assert_eq!(find_consumed(&cached, &live(&[("A", 3), ("B", 5)])), None);
    }

    #[test]
    fn a_new_invite_with_a_use_is_attributed() {
        let cached = HashMap::from([("A".to_string(), 3)]);

        assert_eq!(find_consumed(&cached, &live(&[("A", 3), ("C", 1)])), Some("C"));
    }

    #[tokio::test]
    async fn ledger_tracks_create_and_delete_events() {
        let ledger = InviteLedger::new();
        ledger.record_create(1, "A", 0).await;
        ledger.record_create(1, "B", 2).await;
        ledger.record_delete(1, "A").await;

        let snapshot = ledger.snapshot(1).await;
        assert_eq!(snapshot, HashMap::from([("B".to_string(), 2)]));
    }

    #[tokio::test]
    async fn ledger_is_keyed_per_guild() {
        let ledger = InviteLedger::new();
        ledger.record_create(1, "A", 1).await;
        ledger.record_create(2, "A", 7).await;

        assert_eq!(ledger.snapshot(1).await.get("A"), Some(&1));
        assert_eq!(ledger.snapshot(2).await.get("A"), Some(&7));
        assert!(ledger.snapshot(3).await.is_empty());
    }

    #[tokio::test]
    async fn both_parties_are_credited_independently() {
        let storage = MemoryStorage::new();
        storage.seed_user("inviter", "alice", 100, 10);
        storage.seed_user("joiner", "bob", 200, 0);
        let economy = EconomyConfig::default();

        let awards = award_join_credits(&storage, Some(100), 200, &economy).await.unwrap();

        assert_eq!(awards.inviter, Some(Award { amount: 5, new_balance: 15 }));
        assert_eq!(awards.joiner, Some(Award { amount: 2, new_balance: 2 }));

        let inviter = storage.user_by_discord_id(100).await.unwrap().unwrap();
        assert_eq!(inviter.coins, 15);
        assert_eq!(inviter.invite_count, 1);
    }

    #[tokio::test]
    async fn welcome_bonus_is_paid_without_attribution() {
        let storage = MemoryStorage::new();
        storage.seed_user("joiner", "bob", 200, 0);
        let economy = EconomyConfig::default();

        let awards = award_join_credits(&storage, None, 200, &economy).await.unwrap();

        assert_eq!(awards.inviter, None);
        assert_eq!(awards.joiner, Some(Award { amount: 2, new_balance: 2 }));
    }

    #[tokio::test]
    async fn unlinked_accounts_earn_nothing() {
        let storage = MemoryStorage::new();
        let economy = EconomyConfig::default();

        let awards = award_join_credits(&storage, Some(100), 200, &economy).await.unwrap();

        assert_eq!(awards, JoinAwards::default());
    }
}
