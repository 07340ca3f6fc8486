use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "theme")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub display_name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub parent_code: Option<String>,
    pub display_hints: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Parent,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Parent => Entity::belongs_to(Entity)
                .from(Column::ParentCode)
                .to(Column::Code)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
