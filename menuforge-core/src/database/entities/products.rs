use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub is_disabled: bool,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::category_products::Entity")]
    CategoryProducts,
}

impl Related<super::category_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CategoryProducts.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        super::category_products::Relation::Categories.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::category_products::Relation::Products.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
