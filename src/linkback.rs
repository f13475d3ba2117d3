//! "Posted from" attribution for threads published from a blog.

use maud::html;
use serde::Serialize;

use crate::constants::ARTICLE_URL_FIELD;
use crate::error::BridgeResult;
use crate::forum::ThreadStore;
use crate::settings::BridgeSettings;

/// Attribution for a post that came from an external article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Linkback {
    pub url: String,
    pub blog_name: String,
    /// Rendered HTML snippet for the post's profile area.
    pub content: String,
}

impl Linkback {
    /// Build the attribution for an article url under the current settings.
    #[must_use]
    pub fn for_article(url: &str, settings: &BridgeSettings) -> Self {
        let position = settings.registry().resolve_article_url(url);
        let blog_name = settings.sites().label(position);

        let content = html! {
            "Posted from "
            strong { a href=(url) target="_blank" { (blog_name) } }
        }
        .into_string();

        Self {
            url: url.to_string(),
            blog_name,
            content,
        }
    }
}

/// Look up the attribution for a post, if it was published from an article.
///
/// # Errors
///
/// Returns [`crate::BridgeError::Upstream`] if the post field lookup fails.
pub async fn for_post(
    threads: &dyn ThreadStore,
    pid: i64,
    settings: &BridgeSettings,
) -> BridgeResult<Option<Linkback>> {
    let url = threads.post_field(pid, ARTICLE_URL_FIELD).await?;
    Ok(url
        .filter(|url| !url.is_empty())
        .map(|url| Linkback::for_article(&url, settings)))
}
