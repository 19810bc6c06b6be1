use serenity::model::channel::{Reaction, ReactionType};
use tracing::error;

use serenity::prelude::Context;

use crate::app::App;

/// Canonical storage key for an emoji: the literal for unicode emoji,
/// `name:id` for custom emoji, so bindings survive cache misses.
pub fn emoji_key(emoji: &ReactionType) -> String {
    match emoji {
        ReactionType::Unicode(literal) => literal.clone(),
        ReactionType::Custom { id, name, .. } => format!("{}:{}", name.as_deref().unwrap_or(""), id.0),
        _ => String::new()
    }
}

pub async fn handle_reaction_add(app: &App, ctx: &Context, reaction: &Reaction) {
    apply_reaction(app, ctx, reaction, true).await;
}

pub async fn handle_reaction_remove(app: &App, ctx: &Context, reaction: &Reaction) {
    apply_reaction(app, ctx, reaction, false).await;
}

/// Grants on add, revokes on remove. Unbound emoji are a no-op; bot
/// reactions (our own panel seeds included) are ignored; grant/revoke
/// failures are logged, never surfaced to the reacting member.
async fn apply_reaction(app: &App, ctx: &Context, reaction: &Reaction, adding: bool) {
    let guild_id = match reaction.guild_id {
        Some(id) => id,
        None => return
    };
    let user_id = match reaction.user_id {
        Some(id) => id,
        None => return
    };

    if user_id == ctx.cache.current_user().await.id {
        return;
    }

    let key = emoji_key(&reaction.emoji);
    let role_id = match app.storage.reaction_role(guild_id.0, reaction.message_id.0, &key).await {
        Ok(Some(role_id)) => role_id,
        Ok(None) => return,
        Err(err) => {
            error!("Failed to look up reaction role in guild {}: {}", guild_id.0, err.cause);
            return;
        }
    };

    // The gateway payload carries only ids; fetch the reactor to skip
    // other bots before touching roles.
    match ctx.http.get_user(user_id.0).await {
        Ok(user) if user.bot => return,
        Ok(_) => {}
        Err(err) => {
            error!("Failed to fetch reacting user {}: {}", user_id.0, err);
            return;
        }
    }

    let result = if adding {
        ctx.http.add_member_role(guild_id.0, user_id.0, role_id).await
    } else {
        ctx.http.remove_member_role(guild_id.0, user_id.0, role_id).await
    };

    if let Err(err) = result {
        error!("Failed to {} role {} for {} in guild {}: {}",
            if adding { "grant" } else { "revoke" }, role_id, user_id.0, guild_id.0, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::id::EmojiId;

    use crate::storage::memory::MemoryStorage;
    use crate::storage::{ReactionRoleBinding, Storage};

    #[test]
    fn unicode_emoji_key_is_the_literal() {
        assert_eq!(emoji_key(&ReactionType::Unicode("🔥".to_string())), "🔥");
    }

    #[test]
    fn custom_emoji_key_pairs_name_and_id() {
        let emoji = ReactionType::Custom {
            animated: false,
            id: EmojiId(42),
            name: Some("blob".to_string())
        };
        assert_eq!(emoji_key(&emoji), "blob:42");
    }

    #[tokio::test]
    async fn bound_emoji_resolves_and_unbound_does_not() {
        let storage = MemoryStorage::new();
        storage.save_reaction_role(&ReactionRoleBinding {
            guild_id: 1,
            message_id: 10,
            emoji: "🔥".to_string(),
            role_id: 77
        }).await.unwrap();

        assert_eq!(storage.reaction_role(1, 10, "🔥").await.unwrap(), Some(77));
        assert_eq!(storage.reaction_role(1, 10, "🎉").await.unwrap(), None);
        assert_eq!(storage.reaction_role(1, 11, "🔥").await.unwrap(), None);
        assert_eq!(storage.reaction_role(2, 10, "🔥").await.unwrap(), None);
    }
}
