use std::fs;
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct Config {
    pub discord_application_id: u64,
    pub discord_bot_token: String,
    pub postgres_password: String,
    #[serde(default)]
    pub admin_discord_ids: Vec<u64>,
    #[serde(default = "default_website_url")]
    pub website_url: String,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub bump: BumpConfig,
    #[serde(default)]
    pub templates: TemplateConfig
}

#[derive(Deserialize, Clone)]
pub struct EconomyConfig {
    #[serde(default = "default_invite_reward")]
    pub invite_reward: i64,
    #[serde(default = "default_welcome_bonus")]
    pub welcome_bonus: i64,
    #[serde(default = "default_leave_penalty")]
    pub leave_penalty: i64,
    #[serde(default = "default_leave_penalty_days")]
    pub leave_penalty_days: i64
}

#[derive(Deserialize, Clone)]
pub struct BumpConfig {
    #[serde(default = "default_bump_cooldown_minutes")]
    pub cooldown_minutes: i64
}

#[derive(Deserialize, Clone)]
pub struct TemplateConfig {
    #[serde(default = "default_confirmation_window_seconds")]
    pub confirmation_window_seconds: i64
}

fn default_website_url() -> String { "https://axiomer.up.railway.app".to_string() }
fn default_invite_reward() -> i64 { 5 }
fn default_welcome_bonus() -> i64 { 2 }
fn default_leave_penalty() -> i64 { 1 }
fn default_leave_penalty_days() -> i64 { 3 }
fn default_bump_cooldown_minutes() -> i64 { 120 }
fn default_confirmation_window_seconds() -> i64 { 60 }

impl Default for EconomyConfig {
    fn default() -> EconomyConfig {
        EconomyConfig {
            invite_reward: default_invite_reward(),
            welcome_bonus: default_welcome_bonus(),
            leave_penalty: default_leave_penalty(),
            leave_penalty_days: default_leave_penalty_days()
        }
    }
}

impl Default for BumpConfig {
    fn default() -> BumpConfig {
        BumpConfig { cooldown_minutes: default_bump_cooldown_minutes() }
    }
}

impl Default for TemplateConfig {
    fn default() -> TemplateConfig {
        TemplateConfig { confirmation_window_seconds: default_confirmation_window_seconds() }
    }
}

pub fn load_config() -> Config {
    let config_content = fs::read_to_string("config.toml")
        .expect("No config.toml present.");

    toml::from_str(config_content.as_str())
        .expect("Failed to deserialize config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_default_when_omitted() {
        let config: Config = toml::from_str(r#"
            discord_application_id = 1
            discord_bot_token = "token"
            postgres_password = "pw"
        "#).unwrap();

        assert_eq!(config.economy.invite_reward, 5);
        assert_eq!(config.economy.welcome_bonus, 2);
        assert_eq!(config.economy.leave_penalty, 1);
        assert_eq!(config.economy.leave_penalty_days, 3);
        assert_eq!(config.bump.cooldown_minutes, 120);
        assert_eq!(config.templates.confirmation_window_seconds, 60);
        assert!(config.admin_discord_ids.is_empty());
    }

    #[test]
    fn constants_overridable() {
        let config: Config = toml::from_str(r#"
            discord_application_id = 1
            discord_bot_token = "token"
            postgres_password = "pw"
            admin_discord_ids = [42]

            [economy]
            invite_reward = 10
            leave_penalty_days = 7

            [bump]
            cooldown_minutes = 30
        "#).unwrap();

        assert_eq!(config.economy.invite_reward, 10);
        assert_eq!(config.economy.welcome_bonus, 2);
        assert_eq!(config.economy.leave_penalty_days, 7);
        assert_eq!(config.bump.cooldown_minutes, 30);
        assert_eq!(config.admin_discord_ids, vec![42]);
    }
}
