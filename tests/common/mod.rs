#![allow(dead_code)]

use actix_web::{body::MessageBody, dev::ServiceResponse, test, web};
use serde_json::{json, Value};
use std::sync::Arc;
use todoforge::{config::Config, state::AppState, store::MemoryStore};

pub const AUTH_HEADER: &str = "x-auth";

/// App state over a fresh memory store, with the cheapest bcrypt cost.
pub fn state() -> web::Data<AppState> {
    let config = Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-test-secret".to_string()),
        "BCRYPT_COST" => Some("4".to_string()),
        _ => None,
    })
    .expect("test config");
    web::Data::new(AppState::new(Arc::new(MemoryStore::new()), &config))
}

pub struct TestUser {
    pub id: String,
    pub token: String,
}

fn token_from<B>(resp: &ServiceResponse<B>) -> Option<String> {
    resp.headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn register_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    password: &str,
) -> Result<TestUser, String> {
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let token = token_from(&resp);
    let body = test::read_body(resp).await;

    if !status.is_success() {
        return Err(format!(
            "Failed to register user. Status: {}. Body: {}",
            status,
            String::from_utf8_lossy(&body)
        ));
    }
    let user: Value = serde_json::from_slice(&body)
        .map_err(|e| format!("Failed to parse registration response: {}", e))?;

    Ok(TestUser {
        id: user["id"].as_str().ok_or("missing id")?.to_string(),
        token: token.ok_or("missing x-auth header")?,
    })
}

pub async fn login_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    password: &str,
) -> Option<String> {
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    if resp.status().is_success() {
        token_from(&resp)
    } else {
        None
    }
}
