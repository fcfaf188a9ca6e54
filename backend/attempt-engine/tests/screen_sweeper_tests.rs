use std::time::Duration;

use attempt_engine::{
    create_router,
    services::{screen_service::ScreenService, screen_sweeper::ScreenSweeper},
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::time::advance;
use tower::ServiceExt;

mod common;

use common::{create_test_state, FakeGradingApi, QUIZ_ID};

async fn request(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn mount(app: &Router) -> String {
    let (status, body) = request(app, "POST", &format!("/api/v1/quizzes/{}/screens", QUIZ_ID)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["screen_id"].as_str().unwrap().to_string()
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_evicts_only_untouched_screens() {
    let api = FakeGradingApi::new(0);
    let state = create_test_state(&api);
    let app = create_router(state.clone());
    let sweeper = ScreenSweeper::new(state.clone());

    let active = mount(&app).await;
    let abandoned = mount(&app).await;
    let (status, _) = request(&app, "POST", &format!("/api/v1/screens/{}/attempts", abandoned)).await;
    assert_eq!(status, StatusCode::CREATED);

    advance(Duration::from_secs(20 * 60)).await;
    let (status, _) = request(&app, "GET", &format!("/api/v1/screens/{}", active)).await;
    assert_eq!(status, StatusCode::OK);

    advance(Duration::from_secs(15 * 60)).await;
    assert_eq!(sweeper.run_once().await, 1);

    let (status, _) = request(&app, "GET", &format!("/api/v1/screens/{}", abandoned)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = request(&app, "GET", &format!("/api/v1/screens/{}", active)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.screens.read().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_keeps_screens_with_open_timer_stream() {
    let api = FakeGradingApi::new(0);
    let state = create_test_state(&api);
    let app = create_router(state.clone());
    let service = ScreenService::new(state.clone());

    let screen_id = mount(&app).await;
    request(&app, "POST", &format!("/api/v1/screens/{}/attempts", screen_id)).await;
    let stream = service
        .subscribe_timer(screen_id.parse().unwrap())
        .await
        .unwrap();

    advance(Duration::from_secs(2 * 3600)).await;
    assert_eq!(service.evict_idle(Duration::from_secs(1800)).await, 0);

    drop(stream);
    assert_eq!(service.evict_idle(Duration::from_secs(1800)).await, 1);
    assert!(state.screens.read().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_recent_screens_survive_sweep() {
    let api = FakeGradingApi::new(600);
    let state = create_test_state(&api);
    let app = create_router(state.clone());

    mount(&app).await;
    advance(Duration::from_secs(60)).await;

    assert_eq!(ScreenSweeper::new(state.clone()).run_once().await, 0);
    assert_eq!(state.screens.read().await.len(), 1);
}
