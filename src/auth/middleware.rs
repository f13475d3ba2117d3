use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::generate_csrf_token;
use crate::config::Config;
use crate::forum::{Collaborators, Session};

/// Whoever is making the request. Guests have uid 0 and no session.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    pub uid: i64,
    pub session: Option<Session>,
}

impl Requester {
    #[must_use]
    pub fn guest() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.uid > 0
    }

    /// Token the widget must echo back on writes. Guests get a throwaway one.
    #[must_use]
    pub fn csrf_token(&self) -> String {
        self.session
            .as_ref()
            .map_or_else(generate_csrf_token, |s| s.csrf_token.clone())
    }
}

/// Pull the session token named `cookie_name` out of the `Cookie` header.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == cookie_name && !value.is_empty()).then_some(value)
        })
}

#[async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
    Collaborators: FromRef<S>,
    Arc<Config>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<Config>::from_ref(state);
        let services = Collaborators::from_ref(state);

        let Some(token) = session_token(&parts.headers, &config.session_cookie) else {
            return Ok(Self::guest());
        };

        let session = match services.users.session(token).await {
            Ok(Some(s)) => s,
            Ok(None) => return Ok(Self::guest()),
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, treating request as guest");
                return Ok(Self::guest());
            }
        };

        if session.is_expired(chrono::Utc::now()) {
            return Ok(Self::guest());
        }

        Ok(Self {
            uid: session.uid,
            session: Some(session),
        })
    }
}

/// Require the requester to be a forum administrator.
/// Returns 403 Forbidden otherwise.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Requester);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    Collaborators: FromRef<S>,
    Arc<Config>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let requester = match Requester::from_request_parts(parts, state).await {
            Ok(requester) => requester,
            Err(never) => match never {},
        };
        let services = Collaborators::from_ref(state);

        match services.users.is_administrator(requester.uid).await {
            Ok(true) => Ok(Self(requester)),
            Ok(false) => Err((
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "[[error:no-privileges]]" })),
            )
                .into_response()),
            Err(e) => {
                tracing::error!(error = %e, uid = requester.uid, "Administrator check failed");
                Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
            }
        }
    }
}
