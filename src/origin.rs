//! Trusted-origin resolution and the CORS gate in front of every widget route.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;
use url::Url;

use crate::constants::{ALLOWED_HEADERS, ALLOWED_METHODS};
use crate::error::{BridgeError, BridgeResult};

/// Ordered table of trusted origin prefixes.
///
/// Positions are significant: they index the category and display-name lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginRegistry {
    entries: Vec<String>,
}

impl OriginRegistry {
    /// Parse a comma-separated origin list. Entries are trimmed; empty entries
    /// keep their position but never match.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self {
            entries: list.split(',').map(|entry| entry.trim().to_string()).collect(),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, position: usize) -> Option<&str> {
        self.entries.get(position).map(String::as_str)
    }

    /// Position of the last entry that is a prefix of `origin`.
    #[must_use]
    pub fn resolve(&self, origin: Option<&str>) -> Option<usize> {
        let origin = origin?;
        self.entries
            .iter()
            .rposition(|entry| !entry.is_empty() && origin.starts_with(entry.as_str()))
    }

    /// Position of the last entry whose host part appears in an article url.
    ///
    /// Used for linkbacks, where only the stored article url is known.
    #[must_use]
    pub fn resolve_article_url(&self, url: &str) -> Option<usize> {
        self.entries.iter().rposition(|entry| {
            let host = entry_host(entry);
            !host.is_empty() && url.contains(host.as_str())
        })
    }
}

/// Host part of a configured entry. Entries that are not absolute urls keep
/// their text with any scheme prefix removed.
fn entry_host(entry: &str) -> String {
    match Url::parse(entry) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
        Err(_) => entry
            .strip_prefix("https://")
            .or_else(|| entry.strip_prefix("http://"))
            .unwrap_or(entry)
            .to_string(),
    }
}

/// Extract the declared `Origin` header, if readable.
#[must_use]
pub fn request_origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(ORIGIN).and_then(|value| value.to_str().ok())
}

/// Permission for a trusted origin to read the response.
#[derive(Debug, Clone)]
pub struct CorsGrant {
    position: usize,
    allow_origin: HeaderValue,
}

impl CorsGrant {
    /// Position of the matched entry in the trusted-origin table.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn allowed_origin(&self) -> &str {
        self.allow_origin.to_str().unwrap_or_default()
    }

    /// Add the CORS headers to an outgoing header map.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }

    /// Render `response` with the CORS headers attached.
    pub fn wrap(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        self.apply(response.headers_mut());
        response
    }

    /// Answer a preflight request.
    #[must_use]
    pub fn preflight(&self) -> Response {
        let mut response = self.wrap(StatusCode::NO_CONTENT);
        response.headers_mut().insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        response
    }
}

/// Decides whether a cross-origin request may see a response.
#[derive(Debug, Clone, Copy)]
pub struct OriginGate<'a> {
    registry: &'a OriginRegistry,
}

impl<'a> OriginGate<'a> {
    #[must_use]
    pub fn new(registry: &'a OriginRegistry) -> Self {
        Self { registry }
    }

    /// Grant access to a trusted origin, echoing the configured entry.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UntrustedOrigin`] when no entry matches. A warning
    /// naming the origin and the configured list is logged.
    pub fn authorize(&self, headers: &HeaderMap) -> BridgeResult<CorsGrant> {
        let origin = request_origin(headers);

        let grant = self.registry.resolve(origin).and_then(|position| {
            let entry = self.registry.entry(position)?;
            HeaderValue::from_str(entry)
                .ok()
                .map(|allow_origin| CorsGrant {
                    position,
                    allow_origin,
                })
        });

        grant.ok_or_else(|| {
            warn!(
                origin = origin.unwrap_or("<none>"),
                trusted = %self.registry.entries().join(", "),
                "Origin does not match any trusted blog url"
            );
            BridgeError::UntrustedOrigin {
                origin: origin.map(str::to_string),
            }
        })
    }
}

/// Response for a request from an untrusted origin: no body, no CORS headers.
///
/// The browser's same-origin policy then blocks the embedding page from
/// reading anything.
#[derive(Debug, Clone, Copy)]
pub struct Dropped;

impl IntoResponse for Dropped {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}
