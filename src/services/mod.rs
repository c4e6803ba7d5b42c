//! Approval workflow services.
//!
//! [`MrpWorkflow`] owns both write paths (request and production order) and every
//! state-machine action and scheduled sweep on top of them.

use chrono::Duration;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::events::{Event, EventSender};

pub mod approval;
pub mod bom_defaults;
pub mod change_tracking;
pub mod jobs;
pub mod notifier;
pub mod production;
pub mod references;
pub mod requests;
pub mod roles;
pub mod sequence;
pub mod state_machine;
pub mod sync;
pub mod workorders;

pub use jobs::JobReport;
pub use notifier::{ActivityRequest, DbNotifier, Notifier, OutgoingMessage};
pub use production::{NewProduction, ProductionApproval};
pub use requests::NewRequest;
pub use roles::{DbRoleDirectory, RoleDirectory, RoleTable};
pub use state_machine::{transition, RequestAction};
pub use sync::{ProductionChanges, RequestChanges};
pub use workorders::WorkorderQuery;

/// Tunables of the workflow that are not per-call.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Minimum age of a `new` request before the auto-submit sweep picks it up
    pub auto_submit_delay: Duration,
    /// Activity type code used for product-owner reminders
    pub reminder_activity_type: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            auto_submit_delay: Duration::minutes(1),
            reminder_activity_type: "todo".to_string(),
        }
    }
}

/// Manufacturing request workflow service
#[derive(Clone)]
pub struct MrpWorkflow {
    db: Arc<DatabaseConnection>,
    roles: Arc<dyn RoleDirectory>,
    notifier: Arc<dyn Notifier>,
    event_sender: Option<EventSender>,
    settings: WorkflowSettings,
}

impl MrpWorkflow {
    pub fn new(
        db: Arc<DatabaseConnection>,
        roles: Arc<dyn RoleDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            roles,
            notifier,
            event_sender: None,
            settings: WorkflowSettings::default(),
        }
    }

    /// Workflow backed entirely by the database: `user_role` for roles,
    /// `mail_message`/`mail_activity` for notifications.
    pub fn with_database(db: Arc<DatabaseConnection>) -> Self {
        let roles = Arc::new(DbRoleDirectory::new(db.clone()));
        let notifier = Arc::new(DbNotifier::new(db.clone()));
        Self::new(db, roles, notifier)
    }

    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }
}
