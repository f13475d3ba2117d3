//! Replies posted from the widget's compose box.

use serde::Deserialize;
use tracing::info;

use crate::error::{BridgeError, BridgeResult};
use crate::forum::{NewReply, ThreadStore};

/// Reply form as posted by the widget.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyForm {
    pub content: Option<String>,
    pub tid: Option<String>,
    pub url: Option<String>,
    pub to_pid: Option<String>,
    #[serde(rename = "_csrf")]
    pub csrf: Option<String>,
}

impl ReplyForm {
    /// Convert to a storage request for `uid`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedInput`] when `tid` or `toPid` are not
    /// integers.
    pub fn to_reply(&self, uid: i64) -> BridgeResult<NewReply> {
        let tid = self
            .tid
            .as_deref()
            .ok_or_else(|| BridgeError::malformed("tid", "missing"))?
            .trim()
            .parse()
            .map_err(|e| BridgeError::malformed("tid", e))?;

        let to_pid = match self.to_pid.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse().map_err(|e| BridgeError::malformed("toPid", e))?),
        };

        Ok(NewReply {
            tid,
            uid,
            to_pid,
            content: self.content.clone().unwrap_or_default(),
        })
    }
}

/// Validate and store a reply, returning the new post id.
///
/// # Errors
///
/// Returns [`BridgeError::MalformedInput`] for bad ids and
/// [`BridgeError::Upstream`] when the forum refuses the reply.
pub async fn submit(threads: &dyn ThreadStore, form: &ReplyForm, uid: i64) -> BridgeResult<i64> {
    let reply = form.to_reply(uid)?;
    let pid = threads.reply(&reply).await?;
    info!(tid = reply.tid, pid, uid, "Reply posted from embedded widget");
    Ok(pid)
}
