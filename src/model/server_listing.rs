use sea_orm::entity::prelude::*;

/// A guild's directory listing. bump_enabled is toggled on the website;
/// the bot only reads it and stamps last_bump_at.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "server_listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    pub name: String,
    pub description: String,
    pub invite_url: String,
    pub member_count: i32,
    pub bump_enabled: bool,
    pub last_bump_at: Option<DateTimeWithTimeZone>
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
