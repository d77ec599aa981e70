//! Helpers shared by vendor adapters

use crate::config::IpVersion;
use http::HeaderValue;
use std::net::IpAddr;

/// User agent sent with every vendor request
pub const USER_AGENT: &str = concat!("ddns/", env!("CARGO_PKG_VERSION"));

/// Longest body excerpt kept in a status error
const MAX_BODY_EXCERPT: usize = 256;

/// Build the fully qualified name of a record
///
/// `"@"` is the zone apex and `"*"` a wildcard, shown as `any.<domain>`.
pub fn build_domain_name(host: &str, domain: &str) -> String {
    match host {
        "@" => domain.to_string(),
        "*" => format!("any.{}", domain),
        _ => format!("{}.{}", host, domain),
    }
}

/// Render the one-line description every provider uses for `Display`
pub fn describe(domain: &str, host: &str, provider: &str, ip_version: IpVersion) -> String {
    format!(
        "[domain: {} | host: {} | provider: {} | ip: {}]",
        domain, host, provider, ip_version
    )
}

/// Flatten a response body to a single line for error messages
///
/// Whitespace runs (newlines included) collapse to one space and the
/// result is cut at a fixed length.
pub fn body_to_single_line(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if line.chars().count() <= MAX_BODY_EXCERPT {
        return line;
    }
    let mut excerpt: String = line.chars().take(MAX_BODY_EXCERPT).collect();
    excerpt.push_str("...");
    excerpt
}

/// Header value for [`USER_AGENT`]
pub fn user_agent() -> HeaderValue {
    HeaderValue::from_static(USER_AGENT)
}

/// Compare two addresses by value, treating IPv4-mapped IPv6 as IPv4
pub fn same_ip(a: IpAddr, b: IpAddr) -> bool {
    a.to_canonical() == b.to_canonical()
}
