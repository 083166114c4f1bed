mod support;

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};

use pressline_core::BoardError;
use pressline_server::routes;
use support::{ScriptedBoardApi, TestApp, board_item, page, test_app};

fn server(app: &TestApp) -> TestServer {
    TestServer::new(routes::create_router(app.state.clone())).unwrap()
}

#[tokio::test]
async fn board_serves_the_grouped_snapshot() {
    let api = ScriptedBoardApi::with_pages(vec![page(
        vec![
            board_item("7", Some("This Week")),
            board_item("8", Some("This Week")),
            board_item("9", None),
        ],
        None,
    )]);
    let app = test_app(api, true);
    let server = server(&app);

    let response = server.get("/api/board").await;
    response.assert_status_ok();
    let body: Value = response.json();

    let groups = body["boards"][0]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["title"], json!("This Week"));
    assert_eq!(groups[0]["items_page"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(groups[1]["title"], json!("Ungrouped"));
    assert_eq!(groups[1]["items_page"]["items"][0]["id"], json!("9"));
}

#[tokio::test]
async fn repeat_reads_hit_the_cache() {
    let api = ScriptedBoardApi::with_pages(vec![page(
        vec![board_item("7", Some("This Week"))],
        None,
    )]);
    let app = test_app(api, true);
    let server = server(&app);

    server.get("/api/board").await.assert_status_ok();
    server.get("/api/board").await.assert_status_ok();

    assert_eq!(app.board_api.page_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn board_requires_a_session() {
    let app = test_app(ScriptedBoardApi::default(), false);
    let server = server(&app);

    let response = server.get("/api/board").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(app.board_api.page_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unrecoverable_fetch_failure_is_a_500() {
    let api = ScriptedBoardApi::with_pages(vec![Err(BoardError::Api("upstream broke".into()))]);
    let app = test_app(api, true);
    let server = server(&app);

    let response = server.get("/api/board").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}
