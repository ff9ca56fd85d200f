//! Resource locator parsing.
//!
//! A locator is whatever the user hands us: a full watch URL, an embed URL,
//! a short-host link, or a bare resource id. The resolver turns any accepted
//! shape into the canonical resource id.

use crate::error::{OppsumError, Result};
use regex::Regex;
use url::Url;

/// Resolves a user-supplied locator into a canonical resource id.
pub trait LocatorResolver: Send + Sync {
    /// Resolve a locator, or fail with an `UnsupportedInput` error.
    fn resolve(&self, locator: &str) -> Result<String>;
}

/// URL-based locator resolver.
///
/// Accepts `…/watch?v=ID` and `…/watch?id=ID` URLs, `…/embed/ID`, `…/v/ID`,
/// short-host links like `youtu.be/ID`, and bare 11-character ids.
pub struct UrlLocatorResolver {
    bare_id_regex: Regex,
}

/// Hosts whose entire path is the resource id.
const SHORT_HOSTS: &[&str] = &["youtu.be"];

impl UrlLocatorResolver {
    pub fn new() -> Self {
        let bare_id_regex = Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("Invalid regex");
        Self { bare_id_regex }
    }

    fn resolve_url(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?;

        if SHORT_HOSTS.contains(&host) {
            let id = url.path().trim_start_matches('/');
            return (!id.is_empty()).then(|| id.to_string());
        }

        let mut segments = url.path_segments()?;
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(k, _)| k == "v" || k == "id")
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty()),
            Some("embed") | Some("v") => segments
                .next()
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
            _ => None,
        }
    }
}

impl Default for UrlLocatorResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LocatorResolver for UrlLocatorResolver {
    fn resolve(&self, locator: &str) -> Result<String> {
        let input = locator.trim();

        if self.bare_id_regex.is_match(input) {
            return Ok(input.to_string());
        }

        if let Ok(url) = Url::parse(input) {
            if let Some(id) = self.resolve_url(&url) {
                return Ok(id);
            }
        }

        Err(OppsumError::UnsupportedInput(format!(
            "unsupported locator format: {}",
            locator
        )))
    }
}
