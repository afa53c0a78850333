//! HTTP adapters: handlers, DTOs, error envelope, and shared state.

pub mod auth;
pub mod error;
pub mod health;
pub mod rsvps;
pub mod state;

pub use error::ApiResult;

use actix_web::{get, HttpResponse};

/// Service banner pointing clients at the interactive documentation.
#[utoipa::path(
    get,
    path = "/",
    tags = ["meta"],
    security([]),
    responses((status = 200, description = "Service banner"))
)]
#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "RSVP API",
        "docs": "/docs",
    }))
}
