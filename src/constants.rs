//! Shared constants used across the application.

/// Namespace used when the embedding page does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Group whose members may publish articles without being administrators.
pub const PUBLISHERS_GROUP: &str = "publishers";

/// Group whose members are forum administrators.
pub const ADMINISTRATORS_GROUP: &str = "administrators";

/// Category id the publish form sends when the category should be derived
/// from the requesting origin.
pub const RESOLVE_CATEGORY_FROM_ORIGIN: i64 = -1;

/// Anchor the embed widget scrolls to after a redirect.
pub const COMMENTS_ANCHOR: &str = "nodebb-comments";

/// Post field recording the external article a thread was published from.
pub const ARTICLE_URL_FIELD: &str = "blog-comments:url";

/// Number of posts in one page of the comment feed.
pub const FEED_PAGE_SIZE: i64 = 10;

/// Headers a trusted origin may send.
pub const ALLOWED_HEADERS: &str = "X-Requested-With, X-HTTP-Method-Override, Content-Type, Accept";

/// Methods advertised to a trusted origin on preflight.
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// Header carrying the anti-forgery token on POST requests.
pub const CSRF_HEADER: &str = "x-csrf-token";
