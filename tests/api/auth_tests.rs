use crate::common::{FakeBehavior, fake_runner};
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{App, test};
use game_runner::api::{Authentication, TokenValidator, configure, json_config};
use game_runner::config::{AuthConfig, BearerAuthConfig, HttpConfig};
use mockall::mock;
use mockall::predicate::eq;
use serde_json::Value;
use std::sync::Arc;

mock! {
    pub Validator {}

    impl TokenValidator for Validator {
        fn validate(&self, token: &str) -> bool;
    }
}

macro_rules! init_app {
    ($runner:expr, $auth:expr) => {
        test::init_service(
            App::new()
                .wrap($auth)
                .app_data(Data::new($runner.clone()))
                .app_data(json_config())
                .configure(configure),
        )
        .await
    };
}

fn with_validator(validator: MockValidator) -> Authentication {
    Authentication::new(Some(Arc::new(validator)))
}

#[actix_web::test]
async fn test_valid_token_is_accepted() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;

    let mut validator = MockValidator::new();
    validator
        .expect_validate()
        .with(eq("secret"))
        .times(1)
        .return_const(true);
    let app = init_app!(runner, with_validator(validator));

    let req = test::TestRequest::get()
        .uri("/api/servers")
        .insert_header(("Authorization", "Bearer secret"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_invalid_token_is_rejected() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;

    let mut validator = MockValidator::new();
    validator
        .expect_validate()
        .with(eq("wrong"))
        .times(1)
        .return_const(false);
    let app = init_app!(runner, with_validator(validator));

    let req = test::TestRequest::post()
        .uri("/api/servers")
        .insert_header(("Authorization", "Bearer wrong"))
        .set_json(serde_json::json!({ "serverName": "alpha", "maxRamMB": 1024 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());

    // The request never reached the controller
    assert!(runner.list_servers().await.is_empty());
}

#[actix_web::test]
async fn test_missing_or_malformed_header_is_rejected() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;

    let mut validator = MockValidator::new();
    validator.expect_validate().never();
    let app = init_app!(runner, with_validator(validator));

    let req = test::TestRequest::get().uri("/api/templates").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/templates")
        .insert_header(("Authorization", "Basic c2VjcmV0"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_health_and_preflight_skip_authentication() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;

    let mut validator = MockValidator::new();
    validator.expect_validate().never();
    let app = init_app!(runner, with_validator(validator));

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::OPTIONS)
        .uri("/api/servers")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_ne!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_static_token_from_config() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;

    let config = HttpConfig {
        authenticate: Some(AuthConfig {
            bearer: Some(BearerAuthConfig {
                token: "configured".to_string(),
            }),
        }),
        ..HttpConfig::default()
    };
    let app = init_app!(runner, Authentication::from_config(&config));

    let req = test::TestRequest::get()
        .uri("/api/servers")
        .insert_header(("Authorization", "Bearer configured"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/servers")
        .insert_header(("Authorization", "Bearer other"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn test_no_token_configured_disables_authentication() {
    let (runner, _dir) = fake_runner(Arc::new(FakeBehavior::default())).await;
    let app = init_app!(runner, Authentication::from_config(&HttpConfig::default()));

    let req = test::TestRequest::get().uri("/api/servers").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}
