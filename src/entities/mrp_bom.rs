use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bill of materials header. Carries the default owner/admin/unit for requests.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mrp_bom")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub code: Option<String>,
    pub product_tmpl_id: i32,
    pub product_uom_id: Option<i32>,
    pub product_owner_id: Option<i32>,
    pub admin_id: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_template::Entity",
        from = "Column::ProductTmplId",
        to = "super::product_template::Column::Id"
    )]
    ProductTemplate,
    #[sea_orm(has_many = "super::mrp_operation::Entity")]
    Operations,
}

impl Related<super::product_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductTemplate.def()
    }
}

impl Related<super::mrp_operation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
