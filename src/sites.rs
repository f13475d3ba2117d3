//! Per-site publishing configuration.
//!
//! The admin configures three comma-separated lists (origins, category ids,
//! display names) that line up by position. They are folded here into one
//! ordered table of records. Each field stays optional so a missing or
//! malformed value falls back to the first site's value, then to a constant.
//!
//! Both the category and the display-name lists resolve to integers. The raw
//! display-name text is also kept as a label for human-facing attribution.

use serde::Serialize;

/// Category used when neither the matched site nor the first site has one.
pub const DEFAULT_CATEGORY_ID: i64 = 1;

/// Display name used when neither the matched site nor the first site has one.
pub const DEFAULT_DISPLAY_NAME: i64 = 1;

/// One external site as configured by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    pub origin_prefix: Option<String>,
    pub category_id: Option<i64>,
    pub display_name: Option<i64>,
    pub display_label: Option<String>,
}

/// Resolved configuration for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub category_id: i64,
    pub display_name: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteTable {
    entries: Vec<SiteEntry>,
}

impl SiteTable {
    /// Zip the three configured lists into records. Lists may differ in length.
    #[must_use]
    pub fn from_lists(origins: &str, category_ids: &str, display_names: &str) -> Self {
        let origins: Vec<&str> = origins.split(',').collect();
        let category_ids: Vec<&str> = category_ids.split(',').collect();
        let display_names: Vec<&str> = display_names.split(',').collect();
        let len = origins.len().max(category_ids.len()).max(display_names.len());

        let entries = (0..len)
            .map(|i| SiteEntry {
                origin_prefix: origins.get(i).and_then(|v| non_empty(v)),
                category_id: category_ids.get(i).and_then(|v| parse_leading_int(v)),
                display_name: display_names.get(i).and_then(|v| parse_leading_int(v)),
                display_label: display_names.get(i).and_then(|v| non_empty(v)),
            })
            .collect();

        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[SiteEntry] {
        &self.entries
    }

    /// Resolve the site at `position`, falling back field by field to the
    /// first site and then to the constant defaults. Never fails.
    #[must_use]
    pub fn resolve(&self, position: Option<usize>) -> SiteConfig {
        let at = position.and_then(|p| self.entries.get(p));
        let first = self.entries.first();

        let category_id = at
            .and_then(|e| e.category_id)
            .or_else(|| first.and_then(|e| e.category_id))
            .unwrap_or(DEFAULT_CATEGORY_ID);

        let display_name = at
            .and_then(|e| e.display_name)
            .or_else(|| first.and_then(|e| e.display_name))
            .unwrap_or(DEFAULT_DISPLAY_NAME);

        SiteConfig {
            category_id,
            display_name,
        }
    }

    /// Free-text label for the site at `position`, with the same fallback
    /// order as [`SiteTable::resolve`] ending in the default display name.
    #[must_use]
    pub fn label(&self, position: Option<usize>) -> String {
        let at = position.and_then(|p| self.entries.get(p));
        let first = self.entries.first();

        at.and_then(|e| e.display_label.clone())
            .or_else(|| first.and_then(|e| e.display_label.clone()))
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse a leading decimal integer the way form values were historically
/// read: surrounding whitespace is ignored, trailing garbage is dropped, and
/// zero counts as "no value".
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let parsed: i64 = digits[..end].parse().ok()?;
    let parsed = if negative { -parsed } else { parsed };

    (parsed != 0).then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("12"), Some(12));
        assert_eq!(parse_leading_int(" 7 "), Some(7));
        assert_eq!(parse_leading_int("5abc"), Some(5));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("0"), None);
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999999"), None);
    }

    #[test]
    fn test_resolve_by_position() {
        let table = SiteTable::from_lists("https://a, https://b", "3, 4", "5, 6");
        assert_eq!(
            table.resolve(Some(1)),
            SiteConfig {
                category_id: 4,
                display_name: 6
            }
        );
        assert_eq!(table.resolve(Some(0)).category_id, 3);
    }

    #[test]
    fn test_display_names_parse_as_integers() {
        let table = SiteTable::from_lists("https://a, https://b", "3, 4", "Alpha, 7 Beta");
        assert_eq!(table.resolve(Some(0)).display_name, DEFAULT_DISPLAY_NAME);
        assert_eq!(table.resolve(Some(1)).display_name, 7);

        let table = SiteTable::from_lists("https://a, https://b", "3, 4", "12, Beta");
        assert_eq!(table.resolve(Some(1)).display_name, 12);
    }

    #[test]
    fn test_label_keeps_text() {
        let table = SiteTable::from_lists("https://a, https://b", "3, 4", "Alpha, 7 Beta");
        assert_eq!(table.label(Some(1)), "7 Beta");
        assert_eq!(table.label(Some(9)), "Alpha");
        assert_eq!(SiteTable::default().label(None), "1");
    }

    #[test]
    fn test_short_list_falls_back_to_first_entry() {
        let table = SiteTable::from_lists("https://a, https://b, https://c", "8", "9");
        let resolved = table.resolve(Some(2));
        assert_eq!(resolved.category_id, 8);
        assert_eq!(resolved.display_name, 9);
    }

    #[test]
    fn test_malformed_entry_falls_back_to_first_entry() {
        let table = SiteTable::from_lists("https://a, https://b", "6, nope", "2, ");
        let resolved = table.resolve(Some(1));
        assert_eq!(resolved.category_id, 6);
        assert_eq!(resolved.display_name, 2);
        assert_eq!(table.label(Some(1)), "2");
    }

    #[test]
    fn test_everything_malformed_uses_defaults() {
        let table = SiteTable::from_lists("", "x,y", "");
        let resolved = table.resolve(Some(1));
        assert_eq!(resolved.category_id, DEFAULT_CATEGORY_ID);
        assert_eq!(resolved.display_name, DEFAULT_DISPLAY_NAME);

        let resolved = SiteTable::default().resolve(Some(5));
        assert_eq!(resolved.category_id, DEFAULT_CATEGORY_ID);
    }

    #[test]
    fn test_unknown_position_uses_first_entry() {
        let table = SiteTable::from_lists("https://a", "2", "4");
        assert_eq!(table.resolve(None).category_id, 2);
        assert_eq!(table.resolve(Some(40)).display_name, 4);
    }

    #[test]
    fn test_resolution_is_total() {
        let lists = ["", ",", "1", "a,b,c", " 4 ,,x", "0,0", "-1", "12,13,14,15"];
        for cids in lists {
            for names in lists {
                let table = SiteTable::from_lists("https://a,https://b", cids, names);
                for position in [None, Some(0), Some(1), Some(2), Some(usize::MAX)] {
                    let resolved = table.resolve(position);
                    assert_ne!(resolved.category_id, 0);
                    assert_ne!(resolved.display_name, 0);
                    assert!(!table.label(position).is_empty());
                }
            }
        }
    }
}
