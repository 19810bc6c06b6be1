use chrono::{DateTime, Duration, Utc};
use serenity::model::id::{GuildId, UserId};
use serenity::prelude::Context;
use tracing::{error, info};

use crate::app::App;
use crate::config::EconomyConfig;
use crate::error::AxiomError;
use crate::notify;
use crate::storage::{LeaveOutcome, Storage};

/// Deduction applied to members who leave shortly after joining, to
/// discourage join-farm-leave abuse of the welcome bonus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PenaltyPolicy {
    pub penalty: i64,
    pub threshold_days: i64
}

impl From<&EconomyConfig> for PenaltyPolicy {
    fn from(economy: &EconomyConfig) -> PenaltyPolicy {
        PenaltyPolicy {
            penalty: economy.leave_penalty,
            threshold_days: economy.leave_penalty_days
        }
    }
}

/// A stay of exactly the threshold is long enough; only strictly shorter
/// stays are penalised.
pub fn stay_was_short(joined_at: DateTime<Utc>, left_at: DateTime<Utc>, threshold_days: i64) -> bool {
    left_at.signed_duration_since(joined_at) < Duration::days(threshold_days)
}

pub fn penalty_for(joined_at: DateTime<Utc>, left_at: DateTime<Utc>, policy: &PenaltyPolicy) -> i64 {
    if stay_was_short(joined_at, left_at, policy.threshold_days) {
        policy.penalty
    } else {
        0
    }
}

/// Member-leave entry point: looks the leaver up in the directory and
/// closes their membership record, deducting when the stay was short.
pub async fn settle_leave(storage: &dyn Storage, discord_user_id: u64, guild_id: u64, policy: &PenaltyPolicy)
        -> Result<Option<LeaveOutcome>, AxiomError> {
    let user = match storage.user_by_discord_id(discord_user_id).await? {
        Some(user) => user,
        None => return Ok(None)
    };

    storage.handle_membership_leave(&user.id, guild_id, Utc::now(), policy).await
}

/// Serenity glue: settles the penalty and notifies the leaver, containing
/// every error to this guild's event.
pub async fn handle_member_leave(app: &App, ctx: &Context, guild_id: GuildId, user_id: UserId, username: &str) {
    let policy = PenaltyPolicy::from(&app.config.economy);

    match settle_leave(app.storage.as_ref(), user_id.0, guild_id.0, &policy).await {
        Ok(Some(outcome)) if outcome.coins_deducted > 0 => {
            info!("Deducted {} coins from {} for leaving guild {} early", outcome.coins_deducted, username, guild_id.0);
            notify::dm_user(ctx, user_id, &format!(
                "⚠️ You left a server within {} days of joining and lost {} coins. Your balance is now {} coins.",
                policy.threshold_days, outcome.coins_deducted, outcome.new_balance
            )).await;
        }
        Ok(_) => {}
        Err(err) => error!("Failed to settle leave for {} in guild {}: {}", user_id.0, guild_id.0, err.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    fn policy() -> PenaltyPolicy {
        PenaltyPolicy { penalty: 1, threshold_days: 3 }
    }

    #[test]
    fn leaving_at_exactly_the_threshold_costs_nothing() {
        let joined = Utc::now();
        let left = joined + Duration::days(3);

        assert!(!stay_was_short(joined, left, 3));
        assert_eq!(penalty_for(joined, left, &policy()), 0);
    }

    #[test]
    fn leaving_one_second_early_costs_the_penalty() {
        let joined = Utc::now();
        let left = joined + Duration::days(3) - Duration::seconds(1);

        assert!(stay_was_short(joined, left, 3));
        assert_eq!(penalty_for(joined, left, &policy()), 1);
    }

    #[tokio::test]
    async fn unknown_user_is_a_no_op() {
        let storage = MemoryStorage::new();

        let outcome = settle_leave(&storage, 555, 1, &policy()).await.unwrap();
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn short_stay_deducts_and_reports_new_balance() {
        let storage = MemoryStorage::new();
        storage.seed_user("u1", "alice", 555, 10);
        storage.seed_join("u1", 1, Utc::now() - Duration::days(1));

        let outcome = settle_leave(&storage, 555, 1, &policy()).await.unwrap().unwrap();
        assert_eq!(outcome, LeaveOutcome { coins_deducted: 1, new_balance: 9 });

        let user = storage.user_by_discord_id(555).await.unwrap().unwrap();
        assert_eq!(user.coins, 9);
    }

    #[tokio::test]
    async fn long_stay_deducts_nothing() {
        let storage = MemoryStorage::new();
        storage.seed_user("u1", "alice", 555, 10);
        storage.seed_join("u1", 1, Utc::now() - Duration::days(30));

        let outcome = settle_leave(&storage, 555, 1, &policy()).await.unwrap().unwrap();
        assert_eq!(outcome, LeaveOutcome { coins_deducted: 0, new_balance: 10 });
    }

    #[tokio::test]
    async fn balance_is_clamped_at_zero() {
        let storage = MemoryStorage::new();
        storage.seed_user("u1", "alice", 555, 0);
        storage.seed_join("u1", 1, Utc::now() - Duration::hours(2));

        let outcome = settle_leave(&storage, 555, 1, &policy()).await.unwrap().unwrap();
        assert_eq!(outcome.new_balance, 0);
    }

    #[tokio::test]
    async fn second_leave_without_rejoin_is_a_no_op() {
        let storage = MemoryStorage::new();
        storage.seed_user("u1", "alice", 555, 10);
        storage.seed_join("u1", 1, Utc::now() - Duration::hours(2));

        settle_leave(&storage, 555, 1, &policy()).await.unwrap().unwrap();
        let again = settle_leave(&storage, 555, 1, &policy()).await.unwrap();
        assert_eq!(again, None);
    }
}
