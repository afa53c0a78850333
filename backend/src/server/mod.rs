//! Server construction and startup sequencing.
//!
//! Startup order is load-bearing: configuration resolves first (fatal when
//! incomplete), schema reconciliation runs to completion next (fatal on any
//! DDL failure), and only then does the HTTP server bind and the readiness
//! probe flip. No request is served against an unreconciled table.

mod config;

pub use config::{
    AppConfig, ConfigError, API_KEY_VAR, BIND_ADDR_VAR, CONNECT_TIMEOUT_VAR, DATABASE_URL_VAR,
};

use std::io;
use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App, HttpServer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::doc::ApiDoc;
use crate::domain::AuthGate;
use crate::inbound::http::health::{live, ready, HealthState};
use crate::inbound::http::rsvps::{list_rsvps, submit_rsvp};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::index;
use crate::outbound::persistence::{DbPool, DieselRsvpStore, PoolConfig, SchemaReconciler};

/// Assemble the application with all routes and documentation.
///
/// Used by both the production server and integration tests; tests inject a
/// fixture-backed [`HttpState`].
pub fn build_app(
    state: web::Data<HttpState>,
    health: web::Data<HealthState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(health)
        .service(index)
        .service(submit_rsvp)
        .service(list_rsvps)
        .service(ready)
        .service(live)
        .service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Reconcile the schema, build the pool, and serve until shutdown.
///
/// # Errors
/// Propagates configuration-independent startup failures (reconciliation,
/// pool construction, socket bind) as `io::Error` so `main` can abort with
/// a single error path.
pub async fn run(config: AppConfig) -> io::Result<()> {
    let reconciler = SchemaReconciler::new(&config.database_url, config.connect_timeout);
    let applied = tokio::task::spawn_blocking(move || reconciler.run())
        .await
        .map_err(io::Error::other)?
        .map_err(io::Error::other)?;
    info!(steps = applied, "schema reconciliation complete");

    let pool = DbPool::new(
        PoolConfig::new(&config.database_url).with_connection_timeout(config.connect_timeout),
    )
    .await
    .map_err(io::Error::other)?;

    let state = web::Data::new(HttpState::new(
        Arc::new(DieselRsvpStore::new(pool)),
        AuthGate::from_config(config.api_key.clone()),
    ));
    let health = web::Data::new(HealthState::new());

    let server_state = state.clone();
    let server_health = health.clone();
    let server = HttpServer::new(move || {
        build_app(server_state.clone(), server_health.clone())
    })
    .bind(config.bind_addr)?;

    health.mark_ready();
    info!(addr = %config.bind_addr, "serving");
    server.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FixtureRsvpStore;
    use actix_web::{http::StatusCode, test as actix_test};
    use serde_json::Value;

    fn fixture_state() -> web::Data<HttpState> {
        web::Data::new(HttpState::new(
            Arc::new(FixtureRsvpStore::new()),
            AuthGate::open(),
        ))
    }

    #[actix_web::test]
    async fn banner_points_at_the_docs() {
        let app = actix_test::init_service(build_app(
            fixture_state(),
            web::Data::new(HealthState::new()),
        ))
        .await;

        let request = actix_test::TestRequest::get().uri("/").to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["docs"], "/docs");
    }

    #[actix_web::test]
    async fn readiness_stays_down_until_marked() {
        let health = web::Data::new(HealthState::new());
        let app =
            actix_test::init_service(build_app(fixture_state(), health.clone())).await;

        let request = actix_test::TestRequest::get()
            .uri("/health/ready")
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn openapi_document_is_served() {
        let app = actix_test::init_service(build_app(
            fixture_state(),
            web::Data::new(HealthState::new()),
        ))
        .await;

        let request = actix_test::TestRequest::get()
            .uri("/api-docs/openapi.json")
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
