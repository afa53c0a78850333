//! API-key extraction for gated endpoints.
//!
//! Keep handlers focused on request/response mapping: the header name and
//! extraction mechanics live here, the admit/deny decision in
//! [`AuthGate`](crate::domain::AuthGate).

use actix_web::HttpRequest;

use crate::domain::AuthGate;

use super::ApiResult;

/// Header carrying the shared secret for protected reads.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Extract the presented API key from the request, if any.
///
/// A header that is present but not valid UTF-8 counts as absent; the gate
/// will deny it when a secret is configured.
pub fn presented_api_key(req: &HttpRequest) -> Option<&str> {
    req.headers().get(API_KEY_HEADER)?.to_str().ok()
}

/// Admit or deny the request according to the configured gate.
///
/// # Errors
/// Propagates the gate's unauthorised error when the key is absent or wrong.
pub fn require_api_key(req: &HttpRequest, gate: &AuthGate) -> ApiResult<()> {
    gate.authorize(presented_api_key(req))
}
