//! Path prefix matching and rewriting.
//!
//! # Responsibilities
//! - Normalize configured prefixes
//! - Match a request path against a prefix on segment boundaries
//! - Strip the matched prefix, keeping a leading slash
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/users` matches `/users` and `/users/42`, never `/usersx`
//! - No regex to guarantee O(n) matching

/// Normalize a configured prefix: drop trailing slashes, keep the root as `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Matches the request path against a normalized prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. The prefix is normalized.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: normalize_prefix(prefix.as_ref()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` starts with the prefix on a segment boundary.
    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }

    /// Strip the prefix from `path`, returning the remainder with a leading slash.
    pub fn strip<'a>(&self, path: &'a str) -> Option<std::borrow::Cow<'a, str>> {
        use std::borrow::Cow;

        if self.prefix == "/" {
            return Some(if path.starts_with('/') {
                Cow::Borrowed(path)
            } else {
                Cow::Owned(format!("/{}", path))
            });
        }

        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() {
            Some(Cow::Borrowed("/"))
        } else if rest.starts_with('/') {
            Some(Cow::Borrowed(rest))
        } else {
            None
        }
    }
}
