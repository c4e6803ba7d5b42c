use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Approval state of a manufacturing request.
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestState {
    #[default]
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "pending_po")]
    PendingPo,
    #[sea_orm(string_value = "change_requested")]
    ChangeRequested,
    #[sea_orm(string_value = "waiting_admin")]
    WaitingAdmin,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mrp_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// `RQ<DDMMYY><seq>`; not unique, same-day collisions are tolerated
    pub name: String,
    pub external_order_ref: Option<String>,
    pub product_id: i32,
    pub product_tmpl_id: i32,
    pub qty: f64,
    pub uom_id: Option<i32>,
    pub start_date: Option<DateTimeUtc>,
    pub requested_date: DateTimeUtc,
    pub expected_delivery_date: Option<DateTimeUtc>,
    pub bom_id: Option<i32>,
    pub bom_exists: bool,
    pub product_owner_id: Option<i32>,
    pub admin_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub state: RequestState,
    pub mrp_production_id: Option<i32>,
    pub notified_po: bool,
    pub auto_submitted_po: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
