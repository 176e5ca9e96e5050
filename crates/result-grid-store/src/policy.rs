// crates/result-grid-store/src/policy.rs
// ============================================================================
// Module: Outbound Host Policy
// Description: Host allowlist/denylist and private-network blocking.
// Purpose: Validate externally-supplied URLs before any request is sent.
// Dependencies: thiserror, url
// ============================================================================

//! ## Overview
//! Run records and store endpoints name URLs the grid did not choose, so
//! every outbound request is checked first: denylist, then allowlist, then
//! resolution of the host to concrete addresses with private, link-local,
//! loopback, and multicast ranges refused. Resolution happens at
//! enforcement time so a hostname cannot smuggle a forbidden address past
//! a string-level check.

use std::net::IpAddr;
use std::net::ToSocketAddrs;

use thiserror::Error;
use url::Host;
use url::Url;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Host-policy violations raised before a request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The URL names no host.
    #[error("url has no host")]
    MissingHost,
    /// The host matches the denylist.
    #[error("host denied: {0}")]
    Denied(String),
    /// An allowlist is configured and the host is not on it.
    #[error("host not in allowlist: {0}")]
    NotAllowed(String),
    /// The host resolves to a private or link-local address.
    #[error("host resolves to private or link-local address: {0}")]
    PrivateAddress(String),
    /// The host could not be resolved.
    #[error("dns lookup failed: {0}")]
    Resolve(String),
    /// The URL carries no usable port for resolution.
    #[error("missing port for host resolution")]
    MissingPort,
}

// ============================================================================
// SECTION: Host Policy
// ============================================================================

/// Host allowlist + denylist policy for outbound HTTP clients.
#[derive(Debug, Clone, Default)]
pub struct HostPolicy {
    /// Optional allowlist of hosts. When set, only matching hosts are allowed.
    allowlist: Option<Vec<HostPattern>>,
    /// Explicitly denied hosts (matched before the allowlist).
    denylist: Vec<HostPattern>,
    /// Whether private and link-local ranges are allowed.
    allow_private_networks: bool,
}

impl HostPolicy {
    /// Creates a default policy (public hosts only, private ranges denied).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the allowlist with the provided hosts.
    #[must_use]
    pub fn allow_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowlist = Some(parse_host_patterns(hosts));
        self
    }

    /// Replaces the denylist with the provided hosts.
    #[must_use]
    pub fn deny_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.denylist = parse_host_patterns(hosts);
        self
    }

    /// Allows requests to private and link-local ranges.
    #[must_use]
    pub const fn allow_private_networks(mut self) -> Self {
        self.allow_private_networks = true;
        self
    }

    /// Validates the provided URL against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the host is missing, denied, absent from
    /// a configured allowlist, unresolvable, or resolves to a private or
    /// link-local address while private networks are disallowed.
    pub fn enforce(&self, url: &Url) -> Result<(), PolicyError> {
        let host = url.host().ok_or(PolicyError::MissingHost)?;
        let host_label = normalize_host_label(&host);
        if self.denylist.iter().any(|pattern| pattern.matches(&host_label)) {
            return Err(PolicyError::Denied(host_label));
        }
        if let Some(allowlist) = &self.allowlist
            && !allowlist.iter().any(|pattern| pattern.matches(&host_label))
        {
            return Err(PolicyError::NotAllowed(host_label));
        }
        if !self.allow_private_networks {
            let ips = resolve_host_ips(&host, url)?;
            if ips.iter().any(is_private_or_link_local) {
                return Err(PolicyError::PrivateAddress(host_label));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Host Patterns
// ============================================================================

/// Host allow/deny pattern.
#[derive(Debug, Clone)]
enum HostPattern {
    /// Exact host match.
    Exact(String),
    /// Wildcard suffix match (for example: *.example.com).
    WildcardSuffix(String),
}

impl HostPattern {
    /// Parses a host pattern string into a normalized matcher.
    fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let normalized = normalize_host_string(trimmed);
        if let Some(suffix) = normalized.strip_prefix("*.") {
            if suffix.is_empty() {
                return None;
            }
            return Some(Self::WildcardSuffix(suffix.to_string()));
        }
        Some(Self::Exact(normalized))
    }

    /// Returns true when the pattern matches the provided host.
    fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(value) => host == value,
            Self::WildcardSuffix(suffix) => {
                if host.len() <= suffix.len() || !host.ends_with(suffix) {
                    return false;
                }
                let boundary = host.len() - suffix.len() - 1;
                host.as_bytes().get(boundary) == Some(&b'.')
            }
        }
    }
}

/// Parses an iterable of host patterns into normalized matchers.
fn parse_host_patterns<I, S>(hosts: I) -> Vec<HostPattern>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    hosts.into_iter().filter_map(|host| HostPattern::parse(host.as_ref())).collect()
}

/// Normalizes a host into a lowercase label for matching.
fn normalize_host_label(host: &Host<&str>) -> String {
    match host {
        Host::Domain(domain) => normalize_host_string(domain),
        Host::Ipv4(ip) => ip.to_string(),
        Host::Ipv6(ip) => ip.to_string(),
    }
}

/// Normalizes raw host strings by trimming trailing dots and brackets.
fn normalize_host_string(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    let trimmed =
        trimmed.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(trimmed);
    trimmed.to_ascii_lowercase()
}

// ============================================================================
// SECTION: Address Resolution
// ============================================================================

/// Resolves a host to concrete addresses for private-range validation.
fn resolve_host_ips(host: &Host<&str>, url: &Url) -> Result<Vec<IpAddr>, PolicyError> {
    match host {
        Host::Ipv4(ip) => Ok(vec![IpAddr::V4(*ip)]),
        Host::Ipv6(ip) => Ok(vec![IpAddr::V6(*ip)]),
        Host::Domain(domain) => {
            let port = url.port_or_known_default().ok_or(PolicyError::MissingPort)?;
            (*domain, port)
                .to_socket_addrs()
                .map(|addrs| addrs.map(|addr| addr.ip()).collect())
                .map_err(|err| PolicyError::Resolve(err.to_string()))
        }
    }
}

/// Returns true if the address is private, link-local, loopback, or
/// otherwise unroutable from the public internet.
const fn is_private_or_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => {
            addr.is_private()
                || addr.is_loopback()
                || addr.is_link_local()
                || addr.is_unspecified()
                || addr.is_multicast()
                || addr.is_broadcast()
        }
        IpAddr::V6(addr) => {
            addr.is_loopback()
                || addr.is_unique_local()
                || addr.is_unicast_link_local()
                || addr.is_unspecified()
                || addr.is_multicast()
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn loopback_addresses_are_blocked_by_default() {
        let policy = HostPolicy::new();
        assert_eq!(
            policy.enforce(&url("http://127.0.0.1:8080/report.json")),
            Err(PolicyError::PrivateAddress("127.0.0.1".to_string()))
        );
        assert_eq!(
            policy.enforce(&url("http://[::1]:8080/report.json")),
            Err(PolicyError::PrivateAddress("::1".to_string()))
        );
    }

    #[test]
    fn private_and_link_local_ranges_are_blocked_by_default() {
        let policy = HostPolicy::new();
        for raw in ["http://10.0.0.8/x", "http://192.168.1.20/x", "http://169.254.1.1/x"] {
            assert!(matches!(policy.enforce(&url(raw)), Err(PolicyError::PrivateAddress(_))));
        }
    }

    #[test]
    fn allowing_private_networks_admits_loopback() {
        let policy = HostPolicy::new().allow_private_networks();
        assert_eq!(policy.enforce(&url("http://127.0.0.1:8080/report.json")), Ok(()));
    }

    #[test]
    fn allowlists_reject_unlisted_hosts() {
        let policy = HostPolicy::new()
            .allow_hosts(["storage.example", "*.reports.example"])
            .allow_private_networks();
        assert_eq!(
            policy.enforce(&url("http://127.0.0.1:8080/report.json")),
            Err(PolicyError::NotAllowed("127.0.0.1".to_string()))
        );
    }

    #[test]
    fn denylists_win_over_allowlists() {
        let policy = HostPolicy::new()
            .allow_hosts(["127.0.0.1"])
            .deny_hosts(["127.0.0.1"])
            .allow_private_networks();
        assert_eq!(
            policy.enforce(&url("http://127.0.0.1/x")),
            Err(PolicyError::Denied("127.0.0.1".to_string()))
        );
    }

    #[test]
    fn wildcard_patterns_match_subdomains_only() {
        let pattern = HostPattern::parse("*.example.com").unwrap();
        assert!(pattern.matches("a.example.com"));
        assert!(pattern.matches("deep.a.example.com"));
        assert!(!pattern.matches("example.com"));
        assert!(!pattern.matches("notexample.com"));
    }

    #[test]
    fn urls_without_hosts_are_rejected() {
        let policy = HostPolicy::new();
        assert_eq!(policy.enforce(&url("data:text/plain,hello")), Err(PolicyError::MissingHost));
    }
}
