//! Vote and bookmark toggles.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::forum::ReactionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Vote,
    Bookmark,
}

impl ReactionKind {
    /// Name of the form field carrying the direction flag.
    #[must_use]
    pub fn direction_field(self) -> &'static str {
        match self {
            Self::Vote => "isUpvote",
            Self::Bookmark => "isBookmark",
        }
    }
}

/// Parse a direction flag. Only a JSON boolean is accepted.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedInput`] for a missing value, invalid JSON,
/// or JSON that is not a boolean.
pub fn parse_direction(field: &'static str, raw: Option<&str>) -> BridgeResult<bool> {
    let raw = raw.ok_or_else(|| BridgeError::malformed(field, "missing"))?;
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Bool(flag)) => Ok(flag),
        Ok(other) => Err(BridgeError::malformed(
            field,
            format!("expected true or false, got {other}"),
        )),
        Err(e) => Err(BridgeError::malformed(field, e)),
    }
}

/// Parse a post id sent as form text.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedInput`] when the value is not an integer.
pub fn parse_pid(raw: Option<&str>) -> BridgeResult<i64> {
    let raw = raw.ok_or_else(|| BridgeError::malformed("toPid", "missing"))?;
    raw.trim()
        .parse()
        .map_err(|e| BridgeError::malformed("toPid", e))
}

/// Uniform `{error, result}` body for reaction endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionResponse {
    pub error: Option<String>,
    pub result: Option<Value>,
}

impl From<&BridgeResult<Value>> for ReactionResponse {
    fn from(outcome: &BridgeResult<Value>) -> Self {
        match outcome {
            Ok(result) => Self {
                error: None,
                result: Some(result.clone()),
            },
            Err(e) => Self {
                error: Some(e.to_string()),
                result: None,
            },
        }
    }
}

/// Validates reaction input and delegates to the forum's primitives.
pub struct ReactionToggler<'a> {
    store: &'a dyn ReactionStore,
}

impl<'a> ReactionToggler<'a> {
    #[must_use]
    pub fn new(store: &'a dyn ReactionStore) -> Self {
        Self { store }
    }

    /// Turn a vote or bookmark on or off for `uid`.
    ///
    /// Input is validated before the store is touched.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedInput`] for a bad direction flag or post
    /// id, and [`BridgeError::Upstream`] when the store rejects the toggle.
    pub async fn toggle(
        &self,
        kind: ReactionKind,
        raw_direction: Option<&str>,
        raw_pid: Option<&str>,
        uid: i64,
    ) -> BridgeResult<Value> {
        let on = parse_direction(kind.direction_field(), raw_direction)?;
        let pid = parse_pid(raw_pid)?;

        debug!(?kind, on, pid, uid, "Toggling reaction");

        let result = match (kind, on) {
            (ReactionKind::Vote, true) => to_value(self.store.upvote(pid, uid).await?),
            (ReactionKind::Vote, false) => to_value(self.store.unvote(pid, uid).await?),
            (ReactionKind::Bookmark, true) => to_value(self.store.bookmark(pid, uid).await?),
            (ReactionKind::Bookmark, false) => to_value(self.store.unbookmark(pid, uid).await?),
        };
        result.map_err(|e| BridgeError::Upstream(e.into()))
    }
}

fn to_value<T: Serialize>(value: T) -> serde_json::Result<Value> {
    serde_json::to_value(value)
}
