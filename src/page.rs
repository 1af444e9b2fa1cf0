//! Page-number detection for saved listing pages.
//!
//! The listing renders its pager as a `<select>` whose current page is the
//! `selected` `<option>`. Attribute order and quoting vary between saves, so
//! the pattern only anchors on the tag name, the bare `selected` word, and the
//! digits between the tags.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static SELECTED_OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<option\b[^>]*\bselected\b[^>]*>([0-9]+)</option>").unwrap()
});

/// Returns the page number of the first selected `<option>`, or `None` when the
/// page has no pager, the value is not purely numeric, or it does not fit a `u32`.
pub fn page_number(content: &str) -> Option<u32> {
    let caps = SELECTED_OPTION_RE.captures(content)?;
    caps[1].parse().ok()
}

pub fn read_page_number(path: &Path) -> Result<Option<u32>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(page_number(&content))
}
