use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductionState {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "progress")]
    Progress,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "cancel")]
    Cancel,
}

/// Production (manufacturing) order mirrored against a request.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mrp_production")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub origin: Option<String>,
    pub product_id: i32,
    pub product_qty: f64,
    pub product_uom_id: Option<i32>,
    pub bom_id: Option<i32>,
    pub date_start: Option<DateTimeUtc>,
    pub date_deadline: Option<DateTimeUtc>,
    pub date_finished: Option<DateTimeUtc>,
    pub requested_date: Option<DateTimeUtc>,
    pub expected_delivery_date: Option<DateTimeUtc>,
    /// Responsible user
    pub user_id: Option<i32>,
    pub state: ProductionState,
    #[sea_orm(unique)]
    pub mrp_request_id: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::mrp_request::Entity",
        from = "Column::MrpRequestId",
        to = "super::mrp_request::Column::Id"
    )]
    Request,
    #[sea_orm(has_many = "super::mrp_workorder::Entity")]
    Workorders,
}

impl Related<super::mrp_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl Related<super::mrp_workorder::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workorders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
