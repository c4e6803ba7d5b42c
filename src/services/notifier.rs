use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entities::{mail_activity, mail_activity_type, mail_message, UserId};
use crate::entities::mail_message::MessageKind;
use crate::errors::{ServiceError, ServiceResult};

/// Audit message posted on a record, optionally targeted at one user.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub model: &'static str,
    pub res_id: i32,
    pub body: String,
    pub author_id: Option<UserId>,
    pub recipient_id: Option<UserId>,
    pub kind: MessageKind,
    pub posted_at: DateTime<Utc>,
}

impl OutgoingMessage {
    pub fn note(model: &'static str, res_id: i32, body: impl Into<String>) -> Self {
        Self {
            model,
            res_id,
            body: body.into(),
            author_id: None,
            recipient_id: None,
            kind: MessageKind::Comment,
            posted_at: Utc::now(),
        }
    }

    pub fn notify(mut self, recipient: UserId) -> Self {
        self.recipient_id = Some(recipient);
        self.kind = MessageKind::Notification;
        self
    }

    pub fn by(mut self, author: UserId) -> Self {
        self.author_id = Some(author);
        self
    }

    pub fn at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = posted_at;
        self
    }
}

/// Reminder/task entry for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRequest {
    pub model: &'static str,
    pub res_id: i32,
    /// Activity type code, e.g. `todo`
    pub activity_type: String,
    pub user_id: UserId,
    pub summary: String,
    pub note: Option<String>,
    pub deadline: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, message: OutgoingMessage) -> ServiceResult<()>;

    /// Fails with `MissingConfiguration` when the activity type does not exist.
    async fn schedule_activity(&self, activity: ActivityRequest) -> ServiceResult<()>;
}

/// Notifier writing to the `mail_message` / `mail_activity` tables.
#[derive(Clone)]
pub struct DbNotifier {
    db: Arc<DatabaseConnection>,
}

impl DbNotifier {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    #[instrument(skip(self, message), fields(model = message.model, res_id = message.res_id))]
    async fn post_message(&self, message: OutgoingMessage) -> ServiceResult<()> {
        let db = &*self.db;
        mail_message::ActiveModel {
            model: Set(message.model.to_string()),
            res_id: Set(message.res_id),
            body: Set(message.body),
            author_id: Set(message.author_id),
            recipient_id: Set(message.recipient_id),
            kind: Set(message.kind),
            created_at: Set(message.posted_at),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        debug!("Message posted");
        Ok(())
    }

    #[instrument(skip(self, activity), fields(res_id = activity.res_id, user_id = activity.user_id))]
    async fn schedule_activity(&self, activity: ActivityRequest) -> ServiceResult<()> {
        let db = &*self.db;
        let activity_type = mail_activity_type::Entity::find()
            .filter(mail_activity_type::Column::Code.eq(activity.activity_type.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::MissingConfiguration(format!(
                    "Activity type '{}' is not configured",
                    activity.activity_type
                ))
            })?;

        mail_activity::ActiveModel {
            model: Set(activity.model.to_string()),
            res_id: Set(activity.res_id),
            activity_type_id: Set(activity_type.id),
            user_id: Set(activity.user_id),
            summary: Set(activity.summary),
            note: Set(activity.note),
            date_deadline: Set(activity.deadline),
            created_at: Set(activity.created_at),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        debug!("Activity scheduled");
        Ok(())
    }
}
