use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::{error, warn};

use crate::app::App;

struct PageInfo {
    name: &'static str,
    title: &'static str,
    description: &'static str,
    path: &'static str
}

const PAGES: [PageInfo; 5] = [
    PageInfo { name: "home", title: "Axiom", description: "Discover Discord servers and bots.", path: "/" },
    PageInfo { name: "servers", title: "Server Directory", description: "Browse and search every listed server.", path: "/servers" },
    PageInfo { name: "bots", title: "Bot Directory", description: "Browse and search every listed bot.", path: "/bots" },
    PageInfo { name: "store", title: "Store", description: "Spend your coins on listing boosts.", path: "/store" },
    PageInfo { name: "quests", title: "Quests", description: "Earn coins by completing quests.", path: "/quests" }
];

fn lookup(name: &str) -> Option<&'static PageInfo> {
    PAGES.iter().find(|page| page.name == name)
}

fn available() -> String {
    PAGES.iter().map(|page| page.name).collect::<Vec<&str>>().join(", ")
}

/// Prefix command `<prefix>page <name>`: links the named website page.
/// Everything else on the message event is ignored.
pub async fn handle_message(app: &App, ctx: &Context, message: &Message) {
    if message.author.bot {
        return;
    }
    let guild_id = match message.guild_id {
        Some(id) => id,
        None => return
    };

    let prefix = match app.storage.guild_settings(guild_id.0).await {
        Ok(settings) => settings.command_prefix,
        Err(err) => {
            error!("Failed to load settings for guild {}: {}", guild_id.0, err.cause);
            return;
        }
    };

    let body = match message.content.strip_prefix(prefix.as_str()) {
        Some(body) => body.trim(),
        None => return
    };

    let mut words = body.split_whitespace();
    if words.next() != Some("page") {
        return;
    }

    let reply = match words.next().map(|name| name.to_lowercase()) {
        None => format!("Usage: `{}page <name>` (e.g. `{}page home`)", prefix, prefix),
        Some(name) => match lookup(&name) {
            Some(page) => format!("📄 **{}** — {}\n{}{}", page.title, page.description, app.config.website_url, page.path),
            None => format!("❌ Page \"{}\" not found. Available pages: {}", name, available())
        }
    };

    if let Err(err) = message.channel_id.say(&ctx.http, reply).await {
        warn!("Couldn't reply to page command in guild {}: {}", guild_id.0, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pages_resolve() {
        assert_eq!(lookup("home").map(|page| page.path), Some("/"));
        assert_eq!(lookup("quests").map(|page| page.title), Some("Quests"));
    }

    #[test]
    fn unknown_pages_do_not() {
        assert!(lookup("admin").is_none());
    }
}
