#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use mrp_approval::{
    context::ExecutionContext,
    db::{self, DbConfig},
    entities::{
        mail_message, mrp_bom, mrp_operation, mrp_request, product, product_template, uom, user,
        Role,
    },
    events::{self, EventSender},
    services::{DbNotifier, MrpWorkflow, NewRequest, RoleTable},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};
use tokio::sync::mpsc;

/// Users of the fixture.
#[derive(Debug, Clone, Copy)]
pub struct Users {
    pub requester: i32,
    pub owner: i32,
    pub admin: i32,
    pub designer: i32,
    pub worker: i32,
}

/// Catalog of the fixture: a widget with a BOM and a gadget without one.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    pub units: i32,
    /// Second unit sharing the display name of `units`
    pub units_alias: i32,
    pub dozens: i32,
    pub widget: i32,
    pub widget_tmpl: i32,
    pub widget_bom: i32,
    pub gadget: i32,
}

/// Harness backed by an in-memory SQLite database with the full schema.
pub struct TestWorkflow {
    pub workflow: MrpWorkflow,
    pub db: Arc<DatabaseConnection>,
    pub roles: Arc<RoleTable>,
    pub users: Users,
    pub catalog: Catalog,
    _event_task: tokio::task::JoinHandle<()>,
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 15, 10, 0, 0).unwrap()
}

impl TestWorkflow {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let users = Users {
            requester: insert_user(&pool, "Alice Requester", "alice").await,
            owner: insert_user(&pool, "Olivia Owner", "olivia").await,
            admin: insert_user(&pool, "Adam Admin", "adam").await,
            designer: insert_user(&pool, "Dana Designer", "dana").await,
            worker: insert_user(&pool, "Walt Worker", "walt").await,
        };

        let units = insert_uom(&pool, "Units").await;
        let units_alias = insert_uom(&pool, "Units").await;
        let dozens = insert_uom(&pool, "Dozens").await;

        let widget_tmpl = insert_template(&pool, "Widget", Some(units)).await;
        let widget = insert_product(&pool, widget_tmpl, "Widget", Some("WID")).await;
        let widget_bom = mrp_bom::ActiveModel {
            code: Set(Some("B1".into())),
            product_tmpl_id: Set(widget_tmpl),
            product_uom_id: Set(Some(units)),
            product_owner_id: Set(Some(users.owner)),
            admin_id: Set(Some(users.admin)),
            created_at: Set(fixed_now()),
            updated_at: Set(fixed_now()),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .expect("insert bom")
        .id;
        insert_operation(&pool, widget_bom, "Inspection", 20, None).await;
        insert_operation(&pool, widget_bom, "Assembly", 10, Some(users.worker)).await;

        let gadget_tmpl = insert_template(&pool, "Gadget", Some(units)).await;
        let gadget = insert_product(&pool, gadget_tmpl, "Gadget", None).await;

        let roles = Arc::new(
            RoleTable::new()
                .with_member(Role::ProductOwner, users.owner)
                .with_member(Role::Admin, users.admin)
                .with_member(Role::DesignTeam, users.designer),
        );

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let workflow = MrpWorkflow::new(
            db.clone(),
            roles.clone(),
            Arc::new(DbNotifier::new(db.clone())),
        )
        .with_event_sender(EventSender::new(event_tx));

        Self {
            workflow,
            db,
            roles,
            users,
            catalog: Catalog {
                units,
                units_alias,
                dozens,
                widget,
                widget_tmpl,
                widget_bom,
                gadget,
            },
            _event_task: event_task,
        }
    }

    pub fn ctx(&self, actor: i32) -> ExecutionContext {
        ExecutionContext::new(actor).at(fixed_now())
    }

    /// Widget request created by the requester, defaulted from the widget BOM.
    pub async fn widget_request(&self, qty: f64) -> mrp_request::Model {
        self.workflow
            .create_request(
                &self.ctx(self.users.requester),
                NewRequest::new(self.catalog.widget, qty),
            )
            .await
            .expect("create widget request")
    }

    /// Widget request walked to `waiting_admin`.
    pub async fn waiting_admin_request(&self) -> mrp_request::Model {
        let request = self.widget_request(10.0).await;
        self.workflow
            .submit_to_product_owner(&self.ctx(self.users.requester), request.id)
            .await
            .expect("submit");
        self.workflow
            .accept_by_product_owner(&self.ctx(self.users.owner), request.id)
            .await
            .expect("accept")
    }

    pub async fn messages_for(&self, model: &str, res_id: i32) -> Vec<mail_message::Model> {
        mail_message::Entity::find()
            .filter(mail_message::Column::Model.eq(model))
            .filter(mail_message::Column::ResId.eq(res_id))
            .order_by_asc(mail_message::Column::Id)
            .all(&*self.db)
            .await
            .expect("load messages")
    }
}

async fn insert_user(db: &DatabaseConnection, name: &str, login: &str) -> i32 {
    user::ActiveModel {
        name: Set(name.into()),
        login: Set(login.into()),
        active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
    .id
}

async fn insert_uom(db: &DatabaseConnection, name: &str) -> i32 {
    uom::ActiveModel {
        name: Set(name.into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert uom")
    .id
}

async fn insert_template(db: &DatabaseConnection, name: &str, uom_id: Option<i32>) -> i32 {
    product_template::ActiveModel {
        name: Set(name.into()),
        uom_id: Set(uom_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert template")
    .id
}

async fn insert_product(
    db: &DatabaseConnection,
    tmpl_id: i32,
    name: &str,
    code: Option<&str>,
) -> i32 {
    product::ActiveModel {
        product_tmpl_id: Set(tmpl_id),
        name: Set(name.into()),
        default_code: Set(code.map(str::to_string)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert product")
    .id
}

async fn insert_operation(
    db: &DatabaseConnection,
    bom_id: i32,
    name: &str,
    sequence: i32,
    assigned_user_id: Option<i32>,
) -> i32 {
    mrp_operation::ActiveModel {
        bom_id: Set(bom_id),
        name: Set(name.into()),
        sequence: Set(sequence),
        assigned_user_id: Set(assigned_user_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert operation")
    .id
}
