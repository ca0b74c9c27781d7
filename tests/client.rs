mod common;

use std::net::TcpListener;
use std::sync::Arc;

use common::{seeded_storage, state, FixedPredictor};
use portal_server::client::{ClientError, PortalClient, QueryState};
use portal_server::models::{AssignmentPatch, AssignmentStatus};
use portal_server::predict::{Debt, ScoreRequest};
use portal_server::storage::Storage;
use portal_server::{app, AppState};

async fn serve(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app(state).into_make_service());
    tokio::spawn(server);
    format!("http://{}", addr)
}

#[tokio::test]
async fn dashboard_is_cached_after_fetch() {
    let base = serve(state(seeded_storage().await)).await;
    let client = PortalClient::new(base).unwrap();
    assert_eq!(client.cache().state("/api/dashboard"), QueryState::Idle);

    let dashboard = client.dashboard().await.unwrap();
    assert_eq!(dashboard.user.external_id, "andy");
    assert_eq!(dashboard.courses.len(), 3);
    assert_eq!(dashboard.tasks.len(), 3);
    assert!(matches!(
        client.cache().state("/api/dashboard"),
        QueryState::Success(_)
    ));
}

#[tokio::test]
async fn repeated_reads_come_from_the_cache() {
    let storage = seeded_storage().await;
    let base = serve(state(storage.clone())).await;
    let client = PortalClient::new(base).unwrap();

    assert_eq!(client.assignments().await.unwrap().len(), 4);
    storage
        .update_assignment(1, AssignmentPatch::status(AssignmentStatus::Submitted))
        .await
        .unwrap();

    let cached = client.assignments().await.unwrap();
    assert_eq!(cached[0].status, AssignmentStatus::Pending);

    client.cache().invalidate("/api/assignments");
    let fresh = client.assignments().await.unwrap();
    assert_eq!(fresh[0].status, AssignmentStatus::Submitted);
}

#[tokio::test]
async fn toggling_invalidates_dashboard_and_assignments() {
    let base = serve(state(seeded_storage().await)).await;
    let client = PortalClient::new(base).unwrap();

    let dashboard = client.dashboard().await.unwrap();
    let assignments = client.assignments().await.unwrap();
    let first = &dashboard.tasks[0];

    let updated = client.toggle_assignment(first).await.unwrap();
    assert_eq!(updated.status, AssignmentStatus::Completed);
    assert_eq!(client.cache().state("/api/dashboard"), QueryState::Idle);
    assert_eq!(client.cache().state("/api/assignments"), QueryState::Idle);

    let dashboard = client.dashboard().await.unwrap();
    assert_eq!(dashboard.tasks.len(), 2);
    assert!(dashboard.tasks.iter().all(|t| t.id != updated.id));

    let reverted = client.toggle_assignment(&updated).await.unwrap();
    assert_eq!(reverted.status, AssignmentStatus::Pending);
    assert_eq!(client.assignments().await.unwrap(), assignments);
}

#[tokio::test]
async fn missing_course_is_not_found() {
    let base = serve(state(seeded_storage().await)).await;
    let client = PortalClient::new(base).unwrap();

    let course = client.course(3).await.unwrap();
    assert_eq!(course.code, "MAT 267");

    let err = client.course(99).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(ref message) if message == "Course not found"));
    assert_eq!(
        client.cache().state("/api/courses/99"),
        QueryState::Error("Course not found".to_string())
    );
}

#[tokio::test]
async fn server_rejections_carry_the_field() {
    let base = serve(state(seeded_storage().await)).await;
    let client = PortalClient::new(base).unwrap();

    let patch = AssignmentPatch {
        course_id: Some(77),
        ..AssignmentPatch::default()
    };
    let err = client.update_assignment(1, &patch).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { ref field, .. } if field == "courseId"));
}

#[tokio::test]
async fn empty_patch_leaves_assignment_unchanged() {
    let base = serve(state(seeded_storage().await)).await;
    let client = PortalClient::new(base).unwrap();

    let before = client.assignments().await.unwrap();
    let after = client
        .update_assignment(1, &AssignmentPatch::default())
        .await
        .unwrap();
    assert_eq!(after, before[0]);
}

#[tokio::test]
async fn unknown_demo_user_is_unauthorized() {
    let base = serve(state(seeded_storage().await).with_demo_user(42)).await;
    let client = PortalClient::new(base).unwrap();

    let err = client.dashboard().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert_eq!(
        client.cache().state("/api/dashboard"),
        QueryState::Error("Unauthorized".to_string())
    );
}

#[tokio::test]
async fn score_round_trips_through_the_server() {
    let storage: Arc<dyn Storage> = seeded_storage().await;
    let state = state(storage).with_predictors(FixedPredictor::new(0.0), FixedPredictor::new(74.4));
    let client = PortalClient::new(serve(state).await).unwrap();

    let request = ScoreRequest {
        income: 3000.0,
        expenses: [("rent".to_string(), 1200.0)].into_iter().collect(),
        debt: Debt::Total(0.0),
        savings: 600.0,
    };
    let score = client.score(&request).await.unwrap();
    assert_eq!(score.score, 74);
}
