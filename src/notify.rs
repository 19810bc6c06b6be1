use serenity::model::id::{ChannelId, UserId};
use serenity::prelude::Context;
use tracing::{info, warn};

/// Best-effort direct message. Users with DMs closed are common; the
/// failure is logged and swallowed, never retried, never surfaced.
pub async fn dm_user(ctx: &Context, user_id: UserId, content: &str) {
    let channel = match user_id.create_dm_channel(&ctx.http).await {
        Ok(channel) => channel,
        Err(err) => {
            info!("Could not open DM channel for {}: {}", user_id.0, err);
            return;
        }
    };

    if let Err(err) = channel.say(&ctx.http, content).await {
        info!("Could not send DM to {}: {}", user_id.0, err);
    }
}

/// Best-effort channel post, same contract as dm_user.
pub async fn channel_message(ctx: &Context, channel_id: ChannelId, content: &str) {
    if let Err(err) = channel_id.say(&ctx.http, content).await {
        warn!("Could not send message to channel {}: {}", channel_id.0, err);
    }
}
