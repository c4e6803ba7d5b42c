use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reminder/task targeted at a user.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mail_activity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub model: String,
    pub res_id: i32,
    pub activity_type_id: i32,
    pub user_id: i32,
    pub summary: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub date_deadline: Date,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::mail_activity_type::Entity",
        from = "Column::ActivityTypeId",
        to = "super::mail_activity_type::Column::Id"
    )]
    ActivityType,
}

impl Related<super::mail_activity_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
