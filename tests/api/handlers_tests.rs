use crate::common::{FakeBehavior, fake_runner, wait_for_status};
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{App, test};
use game_runner::api::{configure, json_config};
use game_runner::{GameRunner, ServerStatus};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

macro_rules! init_app {
    ($runner:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new($runner.clone()))
                .app_data(json_config())
                .configure(configure),
        )
        .await
    };
}

async fn create(runner: &GameRunner, name: &str) {
    runner
        .create_server(game_runner::CreateServerRequest::new(name, 1024))
        .await
        .unwrap();
}

#[actix_web::test]
async fn test_health() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;
    let app = init_app!(runner);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[actix_web::test]
async fn test_create_server() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;
    let app = init_app!(runner);

    let req = test::TestRequest::post()
        .uri("/api/servers")
        .set_json(json!({
            "serverName": "alpha",
            "maxRamMB": 1024,
            "allowedPorts": [25570]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["server"]["name"], "alpha");
    assert_eq!(body["server"]["status"], "installing");
    assert_eq!(body["server"]["maxRamMB"], 1024);
    assert_eq!(body["server"]["ports"], json!([25570]));

    wait_for_status(&runner, "alpha", ServerStatus::Stopped).await;

    let req = test::TestRequest::get().uri("/api/servers").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["servers"].as_array().unwrap().len(), 1);
    assert_eq!(body["servers"][0]["status"], "stopped");
}

#[actix_web::test]
async fn test_create_server_validation() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;
    let app = init_app!(runner);

    for payload in [
        json!({ "maxRamMB": 1024 }),
        json!({ "serverName": "alpha" }),
        json!({ "serverName": "alpha", "maxRamMB": 0 }),
        json!({ "serverName": "alpha", "maxRamMB": 1024, "templateType": "Nope" }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/servers")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload {}", payload);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("Validation"));
    }

    assert!(runner.list_servers().await.is_empty());
}

#[actix_web::test]
async fn test_malformed_body() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;
    let app = init_app!(runner);

    let req = test::TestRequest::post()
        .uri("/api/servers")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ \"serverName\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());

    let req = test::TestRequest::post()
        .uri("/api/servers/start")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_duplicate_name_conflict() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;
    let app = init_app!(runner);
    create(&runner, "alpha").await;

    let req = test::TestRequest::post()
        .uri("/api/servers")
        .set_json(json!({ "serverName": "ALPHA", "maxRamMB": 512 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_unknown_server_not_found() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;
    let app = init_app!(runner);

    for uri in ["/api/servers/start", "/api/servers/stop", "/api/servers/uninstall"] {
        let req = test::TestRequest::post()
            .uri(uri)
            .set_json(json!({ "serverName": "ghost" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("ghost"));
    }
}

#[actix_web::test]
async fn test_start_while_installing_conflicts() {
    let behavior = Arc::new(FakeBehavior::with_delay(Duration::from_millis(500)));
    let (runner, _dir) = fake_runner(behavior).await;
    let app = init_app!(runner);
    create(&runner, "slow").await;

    let req = test::TestRequest::post()
        .uri("/api/servers/start")
        .set_json(json!({ "serverName": "slow" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_start_stop_uninstall() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;
    let app = init_app!(runner);
    create(&runner, "alpha").await;
    wait_for_status(&runner, "alpha", ServerStatus::Stopped).await;

    let call = |uri: &'static str| {
        test::TestRequest::post()
            .uri(uri)
            .set_json(json!({ "serverName": "alpha" }))
            .to_request()
    };

    let body: Value = test::call_and_read_body_json(&app, call("/api/servers/start")).await;
    assert_eq!(body, json!({ "success": true }));
    assert_eq!(
        runner.get_server("alpha").await.unwrap().status,
        ServerStatus::Running
    );

    let body: Value = test::call_and_read_body_json(&app, call("/api/servers/stop")).await;
    assert_eq!(body, json!({ "success": true }));
    assert_eq!(
        runner.get_server("alpha").await.unwrap().status,
        ServerStatus::Stopped
    );

    let body: Value = test::call_and_read_body_json(&app, call("/api/servers/uninstall")).await;
    assert_eq!(body, json!({ "success": true }));
    assert!(runner.list_servers().await.is_empty());
}

#[actix_web::test]
async fn test_list_templates() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;
    let app = init_app!(runner);

    let req = test::TestRequest::get().uri("/api/templates").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], true);
    assert_eq!(
        body["templates"],
        json!([{ "name": "Fake", "version": "0.0.1" }])
    );
}
