//! Credential shape checks
//!
//! Vendors that require a credential of a particular form receive a
//! [`Matcher`] at construction time, so a malformed credential is rejected
//! before any request is sent.

use regex::Regex;
use std::sync::LazyLock;

static NAMECHEAP_PASSWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{32}$").expect("static pattern is valid"));

/// Validates credential strings against vendor-defined shapes
pub trait Matcher: Send + Sync {
    /// A Namecheap dynamic DNS password
    fn namecheap_password(&self, password: &str) -> bool;
}

/// Regex-backed [`Matcher`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMatcher;

impl RegexMatcher {
    /// Create a new matcher
    pub fn new() -> Self {
        Self
    }
}

impl Matcher for RegexMatcher {
    fn namecheap_password(&self, password: &str) -> bool {
        NAMECHEAP_PASSWORD.is_match(password)
    }
}
