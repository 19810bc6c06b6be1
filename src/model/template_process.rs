use sea_orm::entity::prelude::*;

/// At most one application process per guild; the guild id is the key.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "template_processes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    pub template_id: String,
    pub template_name: String,
    pub status: String,
    pub total_channels: i32,
    pub total_roles: i32,
    pub channels_deleted: i32,
    pub roles_deleted: i32,
    pub channels_created: i32,
    pub roles_created: i32,
    pub errors: Json,
    pub requested_by: i64,
    pub created_at: DateTimeWithTimeZone,
    pub started_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
