use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "guild_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    pub bump_channel_id: Option<i64>,
    pub quest_channel_id: Option<i64>,
    pub boost_channel_id: Option<i64>,
    pub command_prefix: String,
    pub welcome_channel_id: Option<i64>,
    pub welcome_message: Option<String>,
    pub goodbye_channel_id: Option<i64>,
    pub goodbye_message: Option<String>
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
