//! Redirect targets back to the embedding page.

use url::Url;

use crate::constants::COMMENTS_ANCHOR;

/// Where to send the browser after a reply.
///
/// A url that already carries a fragment keeps it instead of getting the
/// comments anchor. On failure the message travels in an `error` query
/// parameter placed before the fragment.
#[must_use]
pub fn after_reply(url: &str, error: Option<&str>) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return after_reply_raw(url, error);
    };

    match error {
        None if parsed.fragment().is_some() => url.to_string(),
        None => {
            parsed.set_fragment(Some(COMMENTS_ANCHOR));
            parsed.to_string()
        }
        Some(message) => {
            parsed.query_pairs_mut().append_pair("error", message);
            if parsed.fragment().is_none() {
                parsed.set_fragment(Some(COMMENTS_ANCHOR));
            }
            parsed.to_string()
        }
    }
}

/// Textual splice for relative or otherwise unparseable urls.
fn after_reply_raw(url: &str, error: Option<&str>) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };

    match (error, fragment) {
        (None, Some(_)) => url.to_string(),
        (None, None) => format!("{url}#{COMMENTS_ANCHOR}"),
        (Some(message), fragment) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!(
                "{base}{separator}error={}#{}",
                urlencoding::encode(message),
                fragment.unwrap_or(COMMENTS_ANCHOR)
            )
        }
    }
}

/// Where to send the publisher after a successful publish.
///
/// Goes back to the referring page (falling back to the article url) at the
/// comments anchor, unless the article url carries its own fragment.
#[must_use]
pub fn after_publish(referer: Option<&str>, url: &str) -> String {
    let has_fragment = Url::parse(url).map_or_else(
        |_| url.contains('#'),
        |parsed| parsed.fragment().is_some(),
    );
    if has_fragment {
        return url.to_string();
    }

    let base = referer.filter(|r| !r.is_empty()).unwrap_or(url);
    match Url::parse(base) {
        Ok(mut parsed) => {
            parsed.set_fragment(Some(COMMENTS_ANCHOR));
            parsed.to_string()
        }
        Err(_) => {
            let base = base.split_once('#').map_or(base, |(before, _)| before);
            format!("{base}#{COMMENTS_ANCHOR}")
        }
    }
}
