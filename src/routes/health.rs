use actix_web::{get, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

/// Plain-text landing page.
#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Todo Home Page")
}

/// Liveness check. Answers without touching the store.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now()
    }))
}
