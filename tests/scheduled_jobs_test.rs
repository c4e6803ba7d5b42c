mod common;

use chrono::{Duration, NaiveDate};
use common::{fixed_now, TestWorkflow};
use mrp_approval::{
    config::JobsConfig,
    entities::{mail_activity, mail_activity_type, RequestState, USER_MODEL},
    errors::ErrorKind,
    scheduler::{JobKind, Scheduler},
    services::{JobReport, NewRequest},
};
use sea_orm::EntityTrait;

#[tokio::test]
async fn auto_submit_waits_for_delay_and_runs_once() {
    let app = TestWorkflow::new().await;
    let request = app.widget_request(10.0).await;
    let system = app.users.requester;

    let early = app.ctx(system).at(fixed_now() + Duration::seconds(30));
    let report = app.workflow.auto_submit_pending(&early, 100).await.unwrap();
    assert_eq!(report, JobReport::default());

    let later = app.ctx(system).at(fixed_now() + Duration::minutes(5));
    let report = app.workflow.auto_submit_pending(&later, 100).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.remaining, 0);

    let submitted = app.workflow.find_request(request.id).await.unwrap();
    assert_eq!(submitted.state, RequestState::PendingPo);
    assert!(submitted.auto_submitted_po);
    assert!(submitted.mrp_production_id.is_some());

    let again = app.workflow.auto_submit_pending(&later, 100).await.unwrap();
    assert_eq!(again.processed, 0);
}

#[tokio::test]
async fn auto_submit_skips_requests_without_owner() {
    let app = TestWorkflow::new().await;
    let gadget = app
        .workflow
        .create_request(
            &app.ctx(app.users.requester),
            NewRequest::new(app.catalog.gadget, 1.0),
        )
        .await
        .unwrap();
    assert_eq!(gadget.product_owner_id, None);

    let ctx = app.ctx(app.users.requester).at(fixed_now() + Duration::hours(1));
    let report = app.workflow.auto_submit_pending(&ctx, 100).await.unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(
        app.workflow.find_request(gadget.id).await.unwrap().state,
        RequestState::New
    );
}

#[tokio::test]
async fn reminders_create_one_activity_per_request() {
    let app = TestWorkflow::new().await;
    let request = app.widget_request(10.0).await;
    let ctx = app.ctx(app.users.requester);
    app.workflow
        .submit_to_product_owner(&ctx, request.id)
        .await
        .unwrap();

    let report = app.workflow.remind_product_owners(&ctx, 100).await.unwrap();
    assert_eq!(report.processed, 1);

    let activities = mail_activity::Entity::find().all(&*app.db).await.unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].user_id, app.users.owner);
    assert_eq!(activities[0].summary, "Review Request: RQ151124001");
    assert_eq!(
        activities[0].date_deadline,
        NaiveDate::from_ymd_opt(2024, 11, 15).unwrap()
    );
    assert!(app.workflow.find_request(request.id).await.unwrap().notified_po);

    let again = app.workflow.remind_product_owners(&ctx, 100).await.unwrap();
    assert_eq!(again.processed, 0);
    assert_eq!(mail_activity::Entity::find().all(&*app.db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reminders_degrade_without_activity_type() {
    let app = TestWorkflow::new().await;
    let request = app.widget_request(10.0).await;
    let ctx = app.ctx(app.users.requester);
    app.workflow
        .submit_to_product_owner(&ctx, request.id)
        .await
        .unwrap();
    mail_activity_type::Entity::delete_many()
        .exec(&*app.db)
        .await
        .unwrap();

    let report = app.workflow.remind_product_owners(&ctx, 100).await.unwrap();
    assert_eq!(
        report,
        JobReport {
            processed: 0,
            failed: 1,
            remaining: 1
        }
    );
    assert!(!app.workflow.find_request(request.id).await.unwrap().notified_po);
}

#[tokio::test]
async fn daily_summary_lists_yesterdays_pending_requests_per_admin() {
    let app = TestWorkflow::new().await;
    let old_ctx = app.ctx(app.users.requester).at(fixed_now() - Duration::days(2));
    let old = app
        .workflow
        .create_request(&old_ctx, NewRequest::new(app.catalog.widget, 1.0))
        .await
        .unwrap();
    app.workflow
        .submit_to_product_owner(&old_ctx, old.id)
        .await
        .unwrap();

    let fresh = app.widget_request(10.0).await;
    app.workflow
        .submit_to_product_owner(&app.ctx(app.users.requester), fresh.id)
        .await
        .unwrap();

    let next_day = app.ctx(app.users.requester).at(fixed_now() + Duration::days(1));
    let report = app
        .workflow
        .notify_admins_of_daily_pending(&next_day, 100)
        .await
        .unwrap();
    assert_eq!(report.processed, 1);

    let messages = app.messages_for(USER_MODEL, app.users.admin).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].body,
        "Pending Manufacturing Requests from yesterday:\n- RQ151124001 ([WID] Widget)\n"
    );
    assert_eq!(messages[0].recipient_id, Some(app.users.admin));
}

#[tokio::test]
async fn purge_removes_only_stale_rejected_requests() {
    let app = TestWorkflow::new().await;
    let rejected = app.waiting_admin_request().await;
    app.workflow
        .reject_by_admin(&app.ctx(app.users.admin), rejected.id)
        .await
        .unwrap();
    let open = app.widget_request(1.0).await;

    let soon = app.ctx(app.users.admin).at(fixed_now() + Duration::days(2));
    let report = app
        .workflow
        .purge_old_rejected(&soon, Duration::days(3), 100)
        .await
        .unwrap();
    assert_eq!(report.processed, 0);
    assert!(app.workflow.find_request(rejected.id).await.is_ok());

    let later = app.ctx(app.users.admin).at(fixed_now() + Duration::days(4));
    let report = app
        .workflow
        .purge_old_rejected(&later, Duration::days(3), 100)
        .await
        .unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.remaining, 0);

    let err = app.workflow.find_request(rejected.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(app.workflow.find_request(open.id).await.is_ok());
}

#[tokio::test]
async fn purge_respects_batch_limit() {
    let app = TestWorkflow::new().await;
    let admin = app.ctx(app.users.admin);
    let first = app.waiting_admin_request().await;
    let second = app.waiting_admin_request().await;
    for request in [&first, &second] {
        app.workflow
            .reject_by_admin(&admin, request.id)
            .await
            .unwrap();
    }

    let later = app.ctx(app.users.admin).at(fixed_now() + Duration::days(4));
    let report = app
        .workflow
        .purge_old_rejected(&later, Duration::days(3), 1)
        .await
        .unwrap();
    assert_eq!(
        report,
        JobReport {
            processed: 1,
            failed: 0,
            remaining: 1
        }
    );
    assert!(app.workflow.find_request(first.id).await.is_err());
    assert!(app.workflow.find_request(second.id).await.is_ok());
}

#[tokio::test]
async fn daily_summary_reports_unlisted_requests_beyond_limit() {
    let app = TestWorkflow::new().await;
    let requester = app.ctx(app.users.requester);
    for qty in [1.0, 2.0] {
        let request = app.widget_request(qty).await;
        app.workflow
            .submit_to_product_owner(&requester, request.id)
            .await
            .unwrap();
    }

    let report = app
        .workflow
        .notify_admins_of_daily_pending(&requester, 1)
        .await
        .unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.remaining, 1);

    let messages = app.messages_for(USER_MODEL, app.users.admin).await;
    assert_eq!(
        messages[0].body,
        "Pending Manufacturing Requests from yesterday:\n- RQ151124001 ([WID] Widget)\n"
    );
}

#[tokio::test]
async fn scheduler_runs_a_single_job() {
    let app = TestWorkflow::new().await;
    let rejected = app.waiting_admin_request().await;
    app.workflow
        .reject_by_admin(&app.ctx(app.users.admin), rejected.id)
        .await
        .unwrap();

    let scheduler = Scheduler::new(app.workflow.clone(), JobsConfig::default());
    let report = scheduler.run_job(JobKind::Purge).await.unwrap();

    assert_eq!(report.processed, 1);
    assert!(app.workflow.find_request(rejected.id).await.is_err());
}
