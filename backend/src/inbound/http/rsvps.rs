//! RSVP API handlers.
//!
//! ```text
//! POST /rsvps {"name":"Ann","email":"ann@x.com","coming":true}
//! GET  /rsvps            (X-API-Key when a secret is configured)
//! ```
//!
//! Submission is deliberately ungated so the public form can post without
//! credentials; only the listing is protected.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

use crate::domain::ports::RsvpStoreError;
use crate::domain::{
    Allergies, EmailAddress, Error, GuestName, Rsvp, RsvpSubmission, RsvpValidationError,
    SubmissionOutcome,
};
use crate::inbound::http::auth::require_api_key;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::ApiResult;

const fn default_coming() -> bool {
    true
}

/// Request body for `POST /rsvps`.
///
/// `coming` defaults to true and `transport_assist` to false when omitted,
/// matching the public form's behaviour.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RsvpCreateRequest {
    /// Guest name, 1 to 255 characters after trimming.
    #[schema(example = "Ann")]
    pub name: String,
    /// Syntactically valid email address.
    #[schema(example = "ann@x.com")]
    pub email: String,
    /// Whether the guest is coming.
    #[serde(default = "default_coming")]
    pub coming: bool,
    /// Optional allergies note, up to 500 characters.
    #[serde(default)]
    pub allergies: Option<String>,
    /// Whether the guest needs help with transport.
    #[serde(default)]
    pub transport_assist: bool,
}

impl TryFrom<RsvpCreateRequest> for RsvpSubmission {
    type Error = RsvpValidationError;

    fn try_from(value: RsvpCreateRequest) -> Result<Self, Self::Error> {
        let allergies = value.allergies.map(Allergies::new).transpose()?;
        Ok(
            Self::new(GuestName::new(value.name)?, EmailAddress::new(value.email)?)
                .with_coming(value.coming)
                .with_allergies(allergies)
                .with_transport_assist(value.transport_assist),
        )
    }
}

/// RSVP record as returned from the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RsvpResponse {
    /// Storage-assigned identifier.
    pub id: i32,
    /// Guest name.
    pub name: String,
    /// Guest email.
    pub email: String,
    /// Whether the guest is coming.
    pub coming: bool,
    /// Allergies note, if any.
    pub allergies: Option<String>,
    /// Whether the guest needs help with transport.
    pub transport_assist: bool,
    /// Timestamp of the most recent submission for this record.
    pub created_at: DateTime<Utc>,
}

impl From<Rsvp> for RsvpResponse {
    fn from(value: Rsvp) -> Self {
        Self {
            id: value.id,
            name: value.name.into(),
            email: value.email.into(),
            coming: value.coming,
            allergies: value.allergies.map(String::from),
            transport_assist: value.transport_assist,
            created_at: value.created_at,
        }
    }
}

/// Response body for `POST /rsvps`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RsvpSubmitResponse {
    /// Always `"ok"` on success.
    #[schema(example = "ok")]
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
    /// True when an existing RSVP for the same name and email was replaced.
    pub updated: bool,
}

impl From<SubmissionOutcome> for RsvpSubmitResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        let updated = outcome.is_replaced();
        Self {
            status: "ok".to_owned(),
            message: if updated {
                "RSVP updated successfully.".to_owned()
            } else {
                "RSVP submitted successfully.".to_owned()
            },
            updated,
        }
    }
}

fn map_validation_error(err: RsvpValidationError) -> Error {
    let (field, code) = match err {
        RsvpValidationError::EmptyName => ("name", "empty_name"),
        RsvpValidationError::NameTooLong { .. } => ("name", "too_long"),
        RsvpValidationError::EmptyEmail => ("email", "empty_email"),
        RsvpValidationError::InvalidEmail => ("email", "invalid_email"),
        RsvpValidationError::EmailTooLong { .. } => ("email", "too_long"),
        RsvpValidationError::AllergiesTooLong { .. } => ("allergies", "too_long"),
    };
    Error::invalid_request(err.to_string()).with_details(json!({
        "field": field,
        "code": code,
    }))
}

fn map_store_error(err: RsvpStoreError) -> Error {
    match err {
        RsvpStoreError::Duplicate { .. } => {
            Error::conflict("an RSVP for this name and email already exists")
        }
        RsvpStoreError::Connection { message } => {
            error!(message, "rsvp store connection failed");
            Error::internal("database unavailable")
        }
        RsvpStoreError::Query { message } => {
            error!(message, "rsvp store query failed");
            Error::internal("database error")
        }
    }
}

/// Submit an RSVP: one record per `(name, email)`, replaced on resubmission.
#[utoipa::path(
    post,
    path = "/rsvps",
    request_body = RsvpCreateRequest,
    responses(
        (status = 201, description = "RSVP stored", body = RsvpSubmitResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 409, description = "Duplicate RSVP", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["rsvps"],
    operation_id = "submitRsvp",
    security([])
)]
#[post("/rsvps")]
pub async fn submit_rsvp(
    state: web::Data<HttpState>,
    payload: web::Json<RsvpCreateRequest>,
) -> ApiResult<HttpResponse> {
    let submission =
        RsvpSubmission::try_from(payload.into_inner()).map_err(map_validation_error)?;
    let outcome = state
        .rsvps
        .submit(&submission)
        .await
        .map_err(map_store_error)?;
    Ok(HttpResponse::Created().json(RsvpSubmitResponse::from(outcome)))
}

/// List all RSVPs, most recent submission first.
#[utoipa::path(
    get,
    path = "/rsvps",
    responses(
        (status = 200, description = "All RSVPs, newest first", body = [RsvpResponse]),
        (status = 401, description = "Invalid or missing API key", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["rsvps"],
    operation_id = "listRsvps"
)]
#[get("/rsvps")]
pub async fn list_rsvps(
    req: HttpRequest,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Vec<RsvpResponse>>> {
    require_api_key(&req, &state.auth)?;
    let records = state.rsvps.list_all().await.map_err(map_store_error)?;
    Ok(web::Json(
        records.into_iter().map(RsvpResponse::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{FixtureRsvpStore, RsvpStore};
    use crate::domain::{AuthGate, ErrorCode};
    use actix_web::{http::StatusCode, test as actix_test, App};
    use rstest::rstest;
    use serde_json::Value;
    use std::sync::Arc;

    fn state_with_gate(auth: AuthGate) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(Arc::new(FixtureRsvpStore::new()), auth))
    }

    async fn post_rsvp(
        app: &impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
        body: Value,
    ) -> actix_web::dev::ServiceResponse {
        let request = actix_test::TestRequest::post()
            .uri("/rsvps")
            .set_json(body)
            .to_request();
        actix_test::call_service(app, request).await
    }

    #[actix_web::test]
    async fn submit_reports_created_then_replaced() {
        let state = state_with_gate(AuthGate::open());
        let app = actix_test::init_service(
            App::new()
                .app_data(state.clone())
                .service(submit_rsvp)
                .service(list_rsvps),
        )
        .await;

        let response = post_rsvp(&app, json!({ "name": "Ann", "email": "ann@x.com" })).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["updated"], false);

        let response = post_rsvp(
            &app,
            json!({ "name": "Ann", "email": "ann@x.com", "coming": false, "allergies": "nuts" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["updated"], true);

        let request = actix_test::TestRequest::get().uri("/rsvps").to_request();
        let records: Vec<RsvpResponse> =
            actix_test::call_and_read_body_json(&app, request).await;
        assert_eq!(records.len(), 1);
        assert!(!records[0].coming);
        assert_eq!(records[0].allergies.as_deref(), Some("nuts"));
    }

    #[rstest]
    #[case(json!({ "name": "", "email": "ann@x.com" }), "name", "empty_name")]
    #[case(json!({ "name": "Ann", "email": "nope" }), "email", "invalid_email")]
    #[case(
        json!({ "name": "Ann", "email": "ann@x.com", "allergies": "x".repeat(501) }),
        "allergies",
        "too_long"
    )]
    #[actix_web::test]
    async fn submit_rejects_invalid_input(
        #[case] body: Value,
        #[case] field: &str,
        #[case] code: &str,
    ) {
        let state = state_with_gate(AuthGate::open());
        let app =
            actix_test::init_service(App::new().app_data(state).service(submit_rsvp)).await;

        let response = post_rsvp(&app, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["code"], "invalid_request");
        assert_eq!(value["details"]["field"], field);
        assert_eq!(value["details"]["code"], code);
    }

    #[actix_web::test]
    async fn list_requires_the_configured_key() {
        let state = state_with_gate(AuthGate::with_secret("s3cret"));
        let app = actix_test::init_service(
            App::new()
                .app_data(state.clone())
                .service(submit_rsvp)
                .service(list_rsvps),
        )
        .await;

        // Write stays ungated even with a secret configured.
        let response = post_rsvp(&app, json!({ "name": "Ann", "email": "ann@x.com" })).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let request = actix_test::TestRequest::get().uri("/rsvps").to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = actix_test::TestRequest::get()
            .uri("/rsvps")
            .insert_header(("X-API-Key", "s3cret"))
            .to_request();
        let records: Vec<RsvpResponse> =
            actix_test::call_and_read_body_json(&app, request).await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn store_errors_map_to_the_error_taxonomy() {
        let conflict = map_store_error(RsvpStoreError::duplicate("(Ann, ann@x.com)"));
        assert_eq!(conflict.code, ErrorCode::Conflict);

        let unavailable = map_store_error(RsvpStoreError::connection("timed out"));
        assert_eq!(unavailable.code, ErrorCode::InternalError);
        assert_eq!(unavailable.message, "database unavailable");

        let query = map_store_error(RsvpStoreError::query("syntax"));
        assert_eq!(query.code, ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn fixture_store_orders_newest_first() {
        let store = FixtureRsvpStore::new();
        for (name, email) in [("Ann", "ann@x.com"), ("Bob", "bob@x.com")] {
            let submission = RsvpSubmission::new(
                GuestName::new(name).expect("name"),
                EmailAddress::new(email).expect("email"),
            );
            store.submit(&submission).await.expect("submit");
        }
        let rows = store.list_all().await.expect("list");
        let mut sorted = rows.clone();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        assert_eq!(rows, sorted);
    }
}
