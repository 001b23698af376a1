use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "labels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub icon: Option<String>,
    pub sort_order: i32,
    pub is_visible: bool,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::label_categories::Entity")]
    LabelCategories,
}

impl Related<super::label_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LabelCategories.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        super::label_categories::Relation::Categories.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::label_categories::Relation::Labels.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
