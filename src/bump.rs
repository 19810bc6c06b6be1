use chrono::{DateTime, Duration, Utc};

use crate::storage::{BumpProfile, BumpTarget};

/// Outcome of the pure eligibility check behind /bump.
#[derive(Clone, Debug, PartialEq)]
pub enum BumpPlan {
    /// No listing, or bumping not enabled on the website.
    NotEnabled,
    CoolingDown { remaining_minutes: i64 },
    Deliver { profile: BumpProfile, targets: Vec<BumpTarget> }
}

/// Minutes until the guild may bump again, rounded up; None when the
/// guild is eligible. A guild that never bumped is always eligible.
pub fn remaining_cooldown_minutes(last_bump_at: Option<DateTime<Utc>>, now: DateTime<Utc>, cooldown_minutes: i64) -> Option<i64> {
    let last = last_bump_at?;
    let elapsed = now.signed_duration_since(last);
    let cooldown = Duration::minutes(cooldown_minutes);
    if elapsed >= cooldown {
        return None;
    }

    let remaining = cooldown - elapsed;
    Some((remaining.num_seconds() + 59) / 60)
}

/// Every registered bump channel except the invoking guild's own.
pub fn eligible_targets(targets: Vec<BumpTarget>, own_guild_id: u64) -> Vec<BumpTarget> {
    targets.into_iter().filter(|target| target.guild_id != own_guild_id).collect()
}

pub fn plan_bump(profile: Option<BumpProfile>, targets: Vec<BumpTarget>, now: DateTime<Utc>, cooldown_minutes: i64) -> BumpPlan {
    let profile = match profile {
        Some(profile) if profile.enabled => profile,
        _ => return BumpPlan::NotEnabled
    };

    if let Some(remaining_minutes) = remaining_cooldown_minutes(profile.last_bump_at, now, cooldown_minutes) {
        return BumpPlan::CoolingDown { remaining_minutes };
    }

    let targets = eligible_targets(targets, profile.guild_id);
    BumpPlan::Deliver { profile, targets }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(guild_id: u64, enabled: bool, last_bump_at: Option<DateTime<Utc>>) -> BumpProfile {
        BumpProfile {
            guild_id,
            name: "Axiom HQ".to_string(),
            description: "The place".to_string(),
            invite_url: "https://discord.gg/axiom".to_string(),
            member_count: 250,
            enabled,
            last_bump_at
        }
    }

    fn target(guild_id: u64, channel_id: u64) -> BumpTarget {
        BumpTarget { guild_id, channel_id }
    }

    #[test]
    fn missing_listing_is_rejected() {
        assert_eq!(plan_bump(None, vec![], Utc::now(), 120), BumpPlan::NotEnabled);
    }

    #[test]
    fn disabled_listing_is_rejected() {
        let now = Utc::now();
        assert_eq!(plan_bump(Some(profile(1, false, None)), vec![], now, 120), BumpPlan::NotEnabled);
    }

    #[test]
    fn thirty_minutes_into_a_two_hour_cooldown_is_rejected() {
        let now = Utc::now();
        let plan = plan_bump(Some(profile(1, true, Some(now - Duration::minutes(30)))), vec![], now, 120);

        assert_eq!(plan, BumpPlan::CoolingDown { remaining_minutes: 90 });
    }

    #[test]
    fn one_minute_past_the_cooldown_is_eligible() {
        let now = Utc::now();
        let plan = plan_bump(Some(profile(1, true, Some(now - Duration::minutes(121)))), vec![], now, 120);

        assert!(matches!(plan, BumpPlan::Deliver { .. }));
    }

    #[test]
    fn a_guild_that_never_bumped_is_eligible() {
        let now = Utc::now();
        let plan = plan_bump(Some(profile(1, true, None)), vec![target(2, 20)], now, 120);

        match plan {
            BumpPlan::Deliver { targets, .. } => assert_eq!(targets, vec![target(2, 20)]),
            other => panic!("expected delivery, got {:?}", other)
        }
    }

    #[test]
    fn fan_out_excludes_the_invoking_guild() {
        let targets = vec![target(1, 10), target(2, 20), target(3, 30)];

        assert_eq!(eligible_targets(targets, 1), vec![target(2, 20), target(3, 30)]);
    }

    #[test]
    fn two_guilds_registered_to_each_other_deliver_once() {
        let now = Utc::now();
        let targets = vec![target(1, 10), target(2, 20)];
        let plan = plan_bump(Some(profile(1, true, None)), targets, now, 120);

        match plan {
            BumpPlan::Deliver { targets, .. } => {
                assert_eq!(targets.len(), 1);
                assert_eq!(targets[0], target(2, 20));
            }
            other => panic!("expected delivery, got {:?}", other)
        }
    }

    #[test]
    fn remaining_minutes_round_up() {
        let now = Utc::now();
        let remaining = remaining_cooldown_minutes(Some(now - Duration::seconds(30)), now, 1);

        assert_eq!(remaining, Some(1));
    }
}
