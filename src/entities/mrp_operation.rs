use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Routing operation of a BOM; becomes one workorder per confirmed production order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mrp_operation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bom_id: i32,
    pub name: String,
    pub sequence: i32,
    pub assigned_user_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::mrp_bom::Entity",
        from = "Column::BomId",
        to = "super::mrp_bom::Column::Id"
    )]
    Bom,
}

impl Related<super::mrp_bom::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bom.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
