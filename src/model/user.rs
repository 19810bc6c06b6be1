use sea_orm::entity::prelude::*;

/// A directory-website account. Owned by the website; the bot looks rows
/// up by discord_id and writes coins / invite_count.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub username: String,
    pub discord_id: Option<String>,
    pub coins: i64,
    pub invite_count: i32
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
