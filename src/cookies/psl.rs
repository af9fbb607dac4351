//! Public Suffix List (PSL) checks for cookie Domain attributes.
//!
//! Prevents supercookie attacks by rejecting cookies set on public
//! suffixes like `.com`, `.co.uk`, etc.
//!
//! Uses Mozilla's Public Suffix List via the `psl` crate.

use psl::{List, Psl};

/// Check if a domain is a public suffix (e.g., "com", "co.uk").
pub fn is_public_suffix(domain: &str) -> bool {
    let domain_lower = domain.to_ascii_lowercase();
    let domain_bytes = domain_lower.as_bytes();
    List.suffix(domain_bytes)
        .is_some_and(|suffix| suffix.as_bytes() == domain_bytes)
}

/// The registrable domain ("site") of a host: its public suffix plus one
/// label. `None` for a bare public suffix.
pub fn registrable_domain(host: &str) -> Option<String> {
    let host_lower = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = List.domain(host_lower.as_bytes())?;
    std::str::from_utf8(domain.as_bytes()).ok().map(str::to_string)
}

/// Resolve a cookie's Domain attribute against the host that set it.
///
/// Returns the stored domain and whether the cookie is host-only, or
/// `None` if the host may not set a cookie for that domain. A Domain
/// naming a public suffix is only accepted when it is the host itself,
/// and then the cookie becomes host-only.
pub fn cookie_domain_scope(attr: &str, host: &str) -> Option<(String, bool)> {
    let domain = attr.trim_start_matches('.').to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    if domain.is_empty() {
        return None;
    }

    if is_public_suffix(&domain) {
        return (domain == host).then_some((host, true));
    }
    if domain == host {
        return Some((domain, false));
    }
    // IP literals only ever match themselves.
    if host.parse::<std::net::IpAddr>().is_ok() {
        return None;
    }
    host.ends_with(&format!(".{}", domain)).then_some((domain, false))
}
