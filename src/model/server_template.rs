use sea_orm::entity::prelude::*;

/// A shared server layout. channels/roles hold the JSON lists the
/// website editor produces; see template::{TemplateChannel, TemplateRole}.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "server_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub template_link: String,
    pub channels: Json,
    pub roles: Json
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
