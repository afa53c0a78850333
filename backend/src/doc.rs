//! OpenAPI documentation configuration.
//!
//! Defines [`ApiDoc`], the generated specification for the REST API:
//! endpoint paths, component schemas, and the `X-API-Key` security scheme
//! used by the protected listing. Swagger UI serves the document at `/docs`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::rsvps::{RsvpCreateRequest, RsvpResponse, RsvpSubmitResponse};

/// Enrich the generated document with the API-key security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "ApiKeyHeader",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "X-API-Key",
                "Shared secret required for GET /rsvps when configured.",
            ))),
        );
    }
}

/// OpenAPI document for the RSVP API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "RSVP API",
        description = "Submit and list RSVPs for the frontend RSVP page."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("ApiKeyHeader" = [])),
    paths(
        crate::inbound::http::index,
        crate::inbound::http::rsvps::submit_rsvp,
        crate::inbound::http::rsvps::list_rsvps,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        RsvpCreateRequest,
        RsvpResponse,
        RsvpSubmitResponse,
        Error,
        ErrorCode
    )),
    tags(
        (name = "rsvps", description = "Submit and list RSVP records"),
        (name = "health", description = "Endpoints for health checks"),
        (name = "meta", description = "Service metadata")
    )
)]
pub struct ApiDoc;
