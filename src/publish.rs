//! First-time publication of an external article as a forum thread.

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::binding::ArticleKey;
use crate::constants::{ARTICLE_URL_FIELD, PUBLISHERS_GROUP, RESOLVE_CATEGORY_FROM_ORIGIN};
use crate::error::{BridgeError, BridgeResult, PublishStage};
use crate::forum::{Collaborators, NewThread};
use crate::redirect;
use crate::settings::BridgeSettings;

/// Message returned when the requester may not publish.
pub const PUBLISH_DENIED: &str =
    "Only Administrators or members of the publishers group can publish articles";

/// Publish form as posted by the blog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishForm {
    pub markdown: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    /// External article id.
    pub id: Option<String>,
    /// JSON array of tag names.
    pub tags: Option<String>,
    #[serde(alias = "blogger")]
    pub namespace: Option<String>,
    /// JSON integer; `-1` derives the category from the request origin.
    pub cid: Option<String>,
    #[serde(rename = "_csrf")]
    pub csrf: Option<String>,
}

/// A validated publish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub key: ArticleKey,
    pub title: String,
    pub markdown: String,
    pub url: String,
    pub tags: Vec<String>,
    pub cid: i64,
    pub uid: i64,
    /// Declared `Origin` of the request.
    pub origin: Option<String>,
    /// `Referer` of the request.
    pub referer: Option<String>,
}

impl PublishForm {
    /// Parse the JSON-valued fields.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedInput`] when `cid` or `tags` are not
    /// valid JSON of the expected shape, or `id` is missing.
    pub fn into_request(
        self,
        uid: i64,
        origin: Option<String>,
        referer: Option<String>,
    ) -> BridgeResult<PublishRequest> {
        let cid_raw = self
            .cid
            .ok_or_else(|| BridgeError::malformed("cid", "missing"))?;
        let cid: i64 =
            serde_json::from_str(&cid_raw).map_err(|e| BridgeError::malformed("cid", e))?;

        let tags = match self.tags.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => {
                serde_json::from_str(raw).map_err(|e| BridgeError::malformed("tags", e))?
            }
        };

        let article_id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BridgeError::malformed("id", "missing"))?;

        Ok(PublishRequest {
            key: ArticleKey::new(self.namespace.as_deref(), article_id),
            title: self.title.unwrap_or_default(),
            markdown: self.markdown.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            tags,
            cid,
            uid,
            origin,
            referer,
        })
    }
}

/// Result of a publish that created or found a thread.
#[derive(Debug)]
pub enum PublishOutcome {
    Published { tid: i64, redirect: String },
    /// The article was already bound to a live thread; nothing was created.
    AlreadyPublished { tid: i64, redirect: String },
    /// The thread exists but a follow-up write failed.
    Degraded {
        tid: i64,
        redirect: String,
        failures: Vec<BridgeError>,
    },
}

impl PublishOutcome {
    #[must_use]
    pub fn tid(&self) -> i64 {
        match self {
            Self::Published { tid, .. }
            | Self::AlreadyPublished { tid, .. }
            | Self::Degraded { tid, .. } => *tid,
        }
    }

    #[must_use]
    pub fn redirect(&self) -> &str {
        match self {
            Self::Published { redirect, .. }
            | Self::AlreadyPublished { redirect, .. }
            | Self::Degraded { redirect, .. } => redirect,
        }
    }
}

/// Orchestrates permission check, thread creation and binding.
pub struct PublishCoordinator<'a> {
    collaborators: &'a Collaborators,
}

impl<'a> PublishCoordinator<'a> {
    #[must_use]
    pub fn new(collaborators: &'a Collaborators) -> Self {
        Self { collaborators }
    }

    /// Category to publish into, resolving the sentinel through the origin.
    #[must_use]
    pub fn effective_category(request: &PublishRequest, settings: &BridgeSettings) -> i64 {
        if request.cid != RESOLVE_CATEGORY_FROM_ORIGIN {
            return request.cid;
        }
        let position = settings.registry().resolve(request.origin.as_deref());
        settings.sites().resolve(position).category_id
    }

    /// Administrators and publishers may publish. Both checks run concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::AuthorizationDenied`] when neither grants, or
    /// [`BridgeError::Upstream`] when a check fails.
    pub async fn authorize(&self, uid: i64) -> BridgeResult<()> {
        let users = &self.collaborators.users;
        let (is_administrator, is_publisher) = tokio::try_join!(
            users.is_administrator(uid),
            users.is_member(uid, PUBLISHERS_GROUP),
        )?;

        if is_administrator || is_publisher {
            Ok(())
        } else {
            Err(BridgeError::AuthorizationDenied(PUBLISH_DENIED.to_string()))
        }
    }

    /// Publish an article as a new thread, or find its existing thread.
    ///
    /// Thread creation is not serialized per article: two concurrent calls
    /// for the same key can both create a thread, and the binding ends up
    /// pointing at one of them.
    ///
    /// # Errors
    ///
    /// Fails without writing anything when authorization fails or the thread
    /// cannot be created. Failures after the thread exists are reported in
    /// [`PublishOutcome::Degraded`] instead.
    pub async fn publish(
        &self,
        request: &PublishRequest,
        settings: &BridgeSettings,
    ) -> BridgeResult<PublishOutcome> {
        let cid = Self::effective_category(request, settings);

        self.authorize(request.uid).await?;

        let redirect = redirect::after_publish(request.referer.as_deref(), &request.url);

        if let Some(tid) = self.live_binding(request).await? {
            info!(
                tid,
                namespace = %request.key.namespace,
                article_id = %request.key.article_id,
                "Article already published"
            );
            return Ok(PublishOutcome::AlreadyPublished { tid, redirect });
        }

        let created = self
            .collaborators
            .threads
            .create_thread(&NewThread {
                uid: request.uid,
                cid,
                title: request.title.clone(),
                content: request.markdown.clone(),
                tags: request.tags.clone(),
                external_link: Some(request.url.clone()),
                external_comment: Some(request.markdown.clone()),
            })
            .await?;
        let tid = created.tid;

        let mut failures = Vec::new();

        if let Err(e) = self
            .collaborators
            .threads
            .set_post_field(created.pid, ARTICLE_URL_FIELD, &request.url)
            .await
        {
            failures.push(partial_failure(request, tid, PublishStage::LinkbackField, e));
        }

        if let Err(e) = self.collaborators.bindings.create(&request.key, tid).await {
            failures.push(partial_failure(request, tid, PublishStage::Binding, e));
        }

        if failures.is_empty() {
            info!(
                tid,
                cid,
                namespace = %request.key.namespace,
                article_id = %request.key.article_id,
                "Article published"
            );
            Ok(PublishOutcome::Published { tid, redirect })
        } else {
            Ok(PublishOutcome::Degraded {
                tid,
                redirect,
                failures,
            })
        }
    }

    /// Existing binding whose thread still has a root post.
    async fn live_binding(&self, request: &PublishRequest) -> BridgeResult<Option<i64>> {
        let Some(tid) = self.collaborators.bindings.get(&request.key).await? else {
            return Ok(None);
        };

        let main_post = self
            .collaborators
            .threads
            .main_post(tid, request.uid)
            .await?;
        if main_post.is_none() {
            warn!(
                tid,
                namespace = %request.key.namespace,
                article_id = %request.key.article_id,
                "Bound thread is gone, publishing a new one"
            );
            return Ok(None);
        }
        Ok(Some(tid))
    }
}

fn partial_failure(
    request: &PublishRequest,
    tid: i64,
    stage: PublishStage,
    source: anyhow::Error,
) -> BridgeError {
    error!(
        tid,
        %stage,
        namespace = %request.key.namespace,
        article_id = %request.key.article_id,
        error = %source,
        "Thread created but publish did not complete; reconcile manually"
    );
    BridgeError::PartialPublish { tid, stage, source }
}
