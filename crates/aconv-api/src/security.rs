//! Outbound URL screening (SSRF protection).
//!
//! Media and webhook URLs are fetched or called by this server, so they must
//! not point at loopback, private, link-local or cloud metadata addresses.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use tracing::warn;
use url::{Host, Url};

/// Maximum URL length to prevent DoS attacks.
const MAX_URL_LENGTH: usize = 2048;

/// Host names that always resolve to internal endpoints.
static BLOCKED_HOSTS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "localhost",
        "metadata",
        "metadata.google.internal",
        "metadata.azure.internal",
        "instance-data",
        "instance-data.ec2.internal",
    ])
});

/// Result of URL validation.
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationResult {
    /// URL is valid and allowed.
    Valid,
    /// URL is malformed or uses an unsupported protocol.
    Invalid(String),
    /// URL targets an internal address.
    Blocked(String),
    /// URL exceeds maximum length.
    TooLong,
}

impl UrlValidationResult {
    /// Convert to Result for easy error handling.
    pub fn into_result(self) -> Result<(), String> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(msg) => Err(msg),
            Self::Blocked(reason) => Err(reason),
            Self::TooLong => Err(format!(
                "URL exceeds maximum length of {} characters",
                MAX_URL_LENGTH
            )),
        }
    }
}

/// Validate a URL this server will reach out to.
///
/// Checks length and protocol (http/https only), then rejects hosts that
/// target internal networks unless `allow_private` is set.
pub fn validate_remote_url(url: &str, allow_private: bool) -> UrlValidationResult {
    if url.len() > MAX_URL_LENGTH {
        return UrlValidationResult::TooLong;
    }

    let url = url.trim();
    if url.is_empty() {
        return UrlValidationResult::Invalid("URL cannot be empty".to_string());
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return UrlValidationResult::Invalid(format!("Invalid URL format: {}", e)),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return UrlValidationResult::Invalid(format!(
                "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
                scheme
            ))
        }
    }

    let internal = match parsed.host() {
        None => return UrlValidationResult::Invalid("URL must have a valid host".to_string()),
        Some(Host::Domain(domain)) => is_internal_domain(&domain.to_lowercase()),
        Some(Host::Ipv4(ip)) => is_internal_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_internal_ip(IpAddr::V6(ip)),
    };

    if internal && !allow_private {
        warn!(url = %url, "Blocked URL targeting an internal host");
        return UrlValidationResult::Blocked(
            "URL appears to target an internal or restricted endpoint".to_string(),
        );
    }

    UrlValidationResult::Valid
}

fn is_internal_domain(domain: &str) -> bool {
    BLOCKED_HOSTS.contains(domain)
        || domain.ends_with(".localhost")
        || domain.ends_with(".internal")
        || domain.starts_with("metadata.")
}

fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_internal_ipv4(v4),
            None => is_internal_ipv6(v6),
        },
    }
}

fn is_internal_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64)
}

fn is_internal_ipv6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00 // unique local fc00::/7
        || (first & 0xffc0) == 0xfe80 // link-local fe80::/10
}
