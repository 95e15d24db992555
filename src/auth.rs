use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{api::AppState, models::response::UnauthorizedResponse};

pub const SIGNATURE_HEADER: &str = "x-send-verify-hash";

const MAX_BODY_BYTES: usize = 1024 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// Bytes stripped from both ends of the body before signing. Form feed is not
/// among them.
const TRIMMED_BYTES: &[u8] = b" \t\n\r\0\x0B";

fn trim_body(body: &[u8]) -> &[u8] {
    let start = body
        .iter()
        .position(|b| !TRIMMED_BYTES.contains(b))
        .unwrap_or(body.len());
    let end = body
        .iter()
        .rposition(|b| !TRIMMED_BYTES.contains(b))
        .map_or(start, |i| i + 1);

    &body[start..end]
}

/// Lowercase hex HMAC-SHA256 of the body with surrounding whitespace trimmed.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(trim_body(body));

    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_signature(secret: &str, body: &[u8], given: &str) -> bool {
    let expected = sign_body(secret, body);

    expected.as_bytes().ct_eq(given.as_bytes()).into()
}

/// Rejects requests whose signature header is absent or does not match the body.
pub async fn require_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Could not read request body");
            return unauthorized();
        }
    };

    let given = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if given.is_empty() || !verify_signature(&state.send_secret, &bytes, given) {
        return unauthorized();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn unauthorized() -> Response {
    warn!("Unauthorised");

    (StatusCode::UNAUTHORIZED, Json(UnauthorizedResponse::default())).into_response()
}
