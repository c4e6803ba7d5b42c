//! Request <-> production order synchronization and change tracking.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use common::{fixed_now, TestWorkflow};
use mrp_approval::{
    entities::{mrp_request, ProductionState, RequestState},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{NewProduction, ProductionChanges, RequestChanges, WorkorderQuery},
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use tokio::sync::mpsc;

#[tokio::test]
async fn tracked_request_change_flags_and_mirrors_to_production() {
    let app = TestWorkflow::new().await;
    let request = app.waiting_admin_request().await;
    let production_id = request.mrp_production_id.unwrap();

    let updated = app
        .workflow
        .write_request(
            &app.ctx(app.users.requester),
            request.id,
            RequestChanges {
                qty: Some(12.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.state, RequestState::ChangeRequested);
    assert_eq!(
        updated.note.as_deref(),
        Some("[2024-11-15 10:00:00] Change Requested: Quantity changed from '10' to '12'")
    );

    let production = app.workflow.find_production(production_id).await.unwrap();
    assert_eq!(production.product_qty, 12.0);
    assert_eq!(production.state, ProductionState::Draft);
}

#[tokio::test]
async fn start_date_sets_both_production_dates() {
    let app = TestWorkflow::new().await;
    let request = app.waiting_admin_request().await;
    let start = Utc.with_ymd_and_hms(2024, 12, 2, 8, 0, 0).unwrap();

    let updated = app
        .workflow
        .write_request(
            &app.ctx(app.users.requester),
            request.id,
            RequestChanges {
                start_date: Some(Some(start)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        updated.note.as_deref(),
        Some("[2024-11-15 10:00:00] Change Requested: Start Date changed from 'not set' to '2024-12-02 08:00:00'")
    );

    let production = app
        .workflow
        .find_production(updated.mrp_production_id.unwrap())
        .await
        .unwrap();
    assert_eq!(production.date_start, Some(start));
    assert_eq!(production.date_deadline, Some(start));
}

#[tokio::test]
async fn references_are_compared_by_display_name() {
    let app = TestWorkflow::new().await;
    let request = app.waiting_admin_request().await;

    let updated = app
        .workflow
        .write_request(
            &app.ctx(app.users.requester),
            request.id,
            RequestChanges {
                uom_id: Some(Some(app.catalog.units_alias)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.state, RequestState::WaitingAdmin);
    assert_eq!(updated.note, None);
    let production = app
        .workflow
        .find_production(updated.mrp_production_id.unwrap())
        .await
        .unwrap();
    assert_eq!(production.product_uom_id, Some(app.catalog.units_alias));
}

#[tokio::test]
async fn change_notes_append_to_existing_note() {
    let app = TestWorkflow::new().await;
    let request = app.waiting_admin_request().await;
    let ctx = app.ctx(app.users.requester);

    app.workflow
        .write_request(
            &ctx,
            request.id,
            RequestChanges {
                qty: Some(11.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let updated = app
        .workflow
        .write_request(
            &ctx,
            request.id,
            RequestChanges {
                uom_id: Some(Some(app.catalog.dozens)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let note = updated.note.unwrap();
    let entries: Vec<_> = note.lines().collect();
    assert_eq!(
        entries,
        vec![
            "[2024-11-15 10:00:00] Change Requested: Quantity changed from '10' to '11'",
            "[2024-11-15 10:00:00] Change Requested: Unit of Measure changed from 'Units' to 'Dozens'",
        ]
    );
}

#[tokio::test]
async fn production_change_flags_request_and_syncs_back() {
    let app = TestWorkflow::new().await;
    let request = app.waiting_admin_request().await;
    let production_id = request.mrp_production_id.unwrap();

    app.workflow
        .write_production(
            &app.ctx(app.users.owner),
            production_id,
            ProductionChanges {
                product_qty: Some(20.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let request = app.workflow.find_request(request.id).await.unwrap();
    assert_eq!(request.state, RequestState::ChangeRequested);
    assert_eq!(request.qty, 20.0);
    assert_eq!(
        request.note.as_deref(),
        Some("[2024-11-15 10:00:00] Change Requested: Quantity To Produce changed from '10' to '20'")
    );
}

#[tokio::test]
async fn production_deadline_backfills_request_start() {
    let app = TestWorkflow::new().await;
    let request = app.waiting_admin_request().await;
    let deadline = Utc.with_ymd_and_hms(2024, 12, 20, 17, 0, 0).unwrap();

    app.workflow
        .write_production(
            &app.ctx(app.users.owner),
            request.mrp_production_id.unwrap(),
            ProductionChanges {
                date_deadline: Some(Some(deadline)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let request = app.workflow.find_request(request.id).await.unwrap();
    assert_eq!(request.start_date, Some(deadline));
}

#[tokio::test]
async fn untracked_production_write_leaves_request_alone() {
    let app = TestWorkflow::new().await;
    let request = app.waiting_admin_request().await;

    app.workflow
        .write_production(
            &app.ctx(app.users.owner),
            request.mrp_production_id.unwrap(),
            ProductionChanges {
                origin: Some(Some("Customer PO 7".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let after = app.workflow.find_request(request.id).await.unwrap();
    assert_eq!(after.state, RequestState::WaitingAdmin);
    assert_eq!(after.note, None);
}

#[tokio::test]
async fn mark_done_requires_approved_request() {
    let app = TestWorkflow::new().await;
    let request = app.waiting_admin_request().await;
    let production_id = request.mrp_production_id.unwrap();

    let err = app
        .workflow
        .mark_production_done(&app.ctx(app.users.owner), &[production_id])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PreconditionFailed(_));
    assert_eq!(
        err.user_message(),
        "Cannot move the Manufacturing Order to 'Done' as the request is pending admin approval."
    );

    let production = app.workflow.find_production(production_id).await.unwrap();
    assert_eq!(production.state, ProductionState::Draft);
    assert_eq!(production.date_finished, None);
    let approval = app.workflow.production_approval(production_id).await.unwrap();
    assert!(!approval.request_approved);
}

#[tokio::test]
async fn mark_done_does_not_flag_approved_request() {
    let app = TestWorkflow::new().await;
    let request = app.waiting_admin_request().await;
    let production_id = request.mrp_production_id.unwrap();
    app.workflow
        .approve_by_admin(&app.ctx(app.users.admin), request.id)
        .await
        .unwrap();

    let done = app
        .workflow
        .mark_production_done(&app.ctx(app.users.owner), &[production_id])
        .await
        .unwrap();

    assert_eq!(done[0].state, ProductionState::Done);
    assert_eq!(done[0].date_finished, Some(fixed_now()));
    assert_eq!(done[0].date_start, Some(fixed_now()));

    let request = app.workflow.find_request(request.id).await.unwrap();
    assert_eq!(request.state, RequestState::Approved);
    assert_eq!(request.start_date, Some(fixed_now()));
    assert_eq!(request.note, None);
}

#[tokio::test]
async fn orphan_production_creates_request_waiting_for_admin() {
    let app = TestWorkflow::new().await;
    let production = app
        .workflow
        .create_production(
            &app.ctx(app.users.owner),
            NewProduction {
                product_uom_id: Some(app.catalog.units),
                bom_id: Some(app.catalog.widget_bom),
                date_deadline: Some(fixed_now() + Duration::days(7)),
                ..NewProduction::new(app.catalog.widget, 5.0)
            },
        )
        .await
        .unwrap();

    let request_id = production.mrp_request_id.expect("synthesized request");
    let request = app.workflow.find_request(request_id).await.unwrap();
    assert_eq!(request.state, RequestState::WaitingAdmin);
    assert_eq!(request.mrp_production_id, Some(production.id));
    assert_eq!(
        request.note.as_deref(),
        Some("Created automatically from MO by Olivia Owner")
    );
    assert_eq!(request.start_date, Some(fixed_now() + Duration::days(7)));
    assert_eq!(request.qty, 5.0);
    assert_eq!(production.name, format!("MO{}", &request.name[2..]));
}

#[tokio::test]
async fn orphan_production_without_bom_takes_product_defaults() {
    let app = TestWorkflow::new().await;
    let production = app
        .workflow
        .create_production(
            &app.ctx(app.users.owner),
            NewProduction::new(app.catalog.widget, 5.0),
        )
        .await
        .unwrap();
    assert_eq!(production.bom_id, Some(app.catalog.widget_bom));
    assert_eq!(production.product_uom_id, Some(app.catalog.units));

    let request_id = production.mrp_request_id.unwrap();
    let request = app.workflow.find_request(request_id).await.unwrap();
    assert_eq!(request.bom_id, Some(app.catalog.widget_bom));
    assert_eq!(request.uom_id, Some(app.catalog.units));
    assert!(request.bom_exists);

    let approved = app
        .workflow
        .approve_by_admin(&app.ctx(app.users.admin), request_id)
        .await
        .unwrap();
    assert_eq!(approved.state, RequestState::Approved);

    let workorders = app
        .workflow
        .count_workorders(
            &app.ctx(app.users.admin),
            WorkorderQuery::for_production(production.id),
        )
        .await
        .unwrap();
    assert_eq!(workorders, 2);
}

#[tokio::test]
async fn failed_propagation_keeps_the_original_write() {
    let app = TestWorkflow::new().await;
    let request = app.widget_request(10.0).await;
    let mut dangling: mrp_request::ActiveModel = request.clone().into();
    dangling.mrp_production_id = Set(Some(9999));
    dangling.update(&*app.db).await.unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let workflow = app.workflow.clone().with_event_sender(EventSender::new(tx));
    let updated = workflow
        .write_request(
            &app.ctx(app.users.requester),
            request.id,
            RequestChanges {
                qty: Some(4.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.qty, 4.0);
    assert_eq!(updated.state, RequestState::ChangeRequested);

    let stored = app.workflow.find_request(request.id).await.unwrap();
    assert_eq!(stored.qty, 4.0);

    drop(workflow);
    let mut failures = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Event::SyncPropagationFailed { record_id, .. } = event {
            failures.push(record_id);
        }
    }
    assert_eq!(failures, vec![9999]);
}

#[tokio::test]
async fn second_production_for_request_is_rejected() {
    let app = TestWorkflow::new().await;
    let request = app.widget_request(3.0).await;
    app.workflow
        .submit_to_product_owner(&app.ctx(app.users.requester), request.id)
        .await
        .unwrap();

    let err = app
        .workflow
        .create_production(
            &app.ctx(app.users.owner),
            NewProduction {
                mrp_request_id: Some(request.id),
                ..NewProduction::new(app.catalog.widget, 3.0)
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
    assert_eq!(
        err.user_message(),
        "A Manufacturing Order already exists for this request."
    );
}

#[tokio::test]
async fn production_bom_selection_updates_request_assignees() {
    let app = TestWorkflow::new().await;
    let request = app
        .workflow
        .create_request(
            &app.ctx(app.users.requester),
            mrp_approval::services::NewRequest {
                product_owner_id: Some(app.users.designer),
                admin_id: Some(app.users.designer),
                ..mrp_approval::services::NewRequest::new(app.catalog.widget, 2.0)
            },
        )
        .await
        .unwrap();
    let submitted = app
        .workflow
        .submit_to_product_owner(&app.ctx(app.users.requester), request.id)
        .await
        .unwrap();

    let production = app
        .workflow
        .select_production_bom(
            &app.ctx(app.users.admin),
            submitted.mrp_production_id.unwrap(),
            app.catalog.widget_bom,
        )
        .await
        .unwrap();
    assert_eq!(production.user_id, Some(app.users.owner));

    let request = app.workflow.find_request(request.id).await.unwrap();
    assert_eq!(request.product_owner_id, Some(app.users.owner));
    assert_eq!(request.admin_id, Some(app.users.admin));
}
