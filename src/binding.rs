//! Binding between an external article and its discussion thread.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::constants::DEFAULT_NAMESPACE;

/// Identifies an article on an embedding site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleKey {
    /// Tenant (blog) the article belongs to.
    pub namespace: String,
    /// Opaque id chosen by the embedding page.
    pub article_id: String,
}

impl ArticleKey {
    /// Build a key, using the default namespace when none (or an empty one)
    /// is given.
    pub fn new(namespace: Option<&str>, article_id: impl Into<String>) -> Self {
        let namespace = namespace
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE);

        Self {
            namespace: namespace.to_string(),
            article_id: article_id.into(),
        }
    }
}

/// Storage for article → thread bindings.
///
/// `create` is an unconditional write. Callers that want at most one thread
/// per article must check `get` first; two concurrent publishers can still
/// both pass that check, leaving two threads and a binding to whichever
/// write landed last.
#[async_trait]
pub trait BindingStore: Send + Sync {
    async fn get(&self, key: &ArticleKey) -> Result<Option<i64>>;

    async fn create(&self, key: &ArticleKey, tid: i64) -> Result<()>;
}
