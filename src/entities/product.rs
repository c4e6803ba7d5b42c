use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product variant. BOMs attach to the template, requests to the variant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_tmpl_id: i32,
    pub name: String,
    pub default_code: Option<String>,
}

impl Model {
    pub fn display_name(&self) -> String {
        match &self.default_code {
            Some(code) if !code.is_empty() => format!("[{}] {}", code, self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_template::Entity",
        from = "Column::ProductTmplId",
        to = "super::product_template::Column::Id"
    )]
    Template,
}

impl Related<super::product_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
