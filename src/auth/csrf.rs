use axum::http::HeaderMap;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use super::Requester;
use crate::constants::CSRF_HEADER;
use crate::error::{BridgeError, BridgeResult};

/// Generate a CSRF token for form protection.
pub fn generate_csrf_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Check the anti-forgery token on a state-changing request.
///
/// Guests carry no session, so there is nothing to forge and the check passes.
/// Signed-in requesters must echo their session token in the form field or in
/// the `x-csrf-token` header.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidCsrfToken`] on a missing or mismatched token.
pub fn verify_csrf(
    requester: &Requester,
    headers: &HeaderMap,
    form_token: Option<&str>,
) -> BridgeResult<()> {
    let Some(session) = &requester.session else {
        return Ok(());
    };

    let supplied = form_token.filter(|t| !t.is_empty()).or_else(|| {
        headers
            .get(CSRF_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|t| !t.is_empty())
    });

    match supplied {
        Some(token) if token == session.csrf_token => Ok(()),
        _ => Err(BridgeError::InvalidCsrfToken),
    }
}
