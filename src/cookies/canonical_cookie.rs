use crate::cookies::psl;
use time::{Duration, OffsetDateTime};
use url::Url;

/// Represents a cookie.
/// Modeled after Chromium's `net::CanonicalCookie`.
///
/// Identity within a jar is `(domain, path, name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCookie {
    pub name: String,
    pub value: String,
    /// Lower-case, without a leading dot.
    pub domain: String,
    pub path: String,
    pub creation_time: OffsetDateTime,
    pub expiration_time: Option<OffsetDateTime>,
    /// Max-Age as received, in seconds.
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub host_only: bool,
    pub same_site: SameSite,
    /// The Set-Cookie line this cookie was parsed from.
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    #[default]
    Unspecified,
    NoRestriction,
    Lax,
    Strict,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Unspecified => "",
            SameSite::NoRestriction => "None",
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "none" => SameSite::NoRestriction,
            "lax" => SameSite::Lax,
            "strict" => SameSite::Strict,
            _ => SameSite::Unspecified,
        }
    }
}

/// Fields a caller may supply when injecting a cookie by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieParts {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<OffsetDateTime>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

/// RFC 6265 section 5.1.4 default-path of a request URL.
pub fn default_path(url: &Url) -> String {
    let path = url.path();
    if !path.starts_with('/') {
        return "/".to_string();
    }
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path[..i].to_string(),
    }
}

impl CanonicalCookie {
    /// Build a cookie for `url` from its attributes.
    ///
    /// Returns `None` when the domain is not one the URL may set.
    pub fn from_parts(url: &Url, parts: CookieParts, now: OffsetDateTime) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        let (domain, host_only) = match parts.domain.as_deref().filter(|d| !d.is_empty()) {
            Some(attr) => psl::cookie_domain_scope(attr, &host)?,
            None => (host, true),
        };

        let path = match parts.path {
            Some(p) if p.starts_with('/') => p,
            _ => default_path(url),
        };

        // Max-Age wins over Expires.
        let expiration_time = match parts.max_age {
            Some(secs) if secs <= 0 => Some(OffsetDateTime::UNIX_EPOCH),
            Some(secs) => Some(now + Duration::seconds(secs)),
            None => parts.expires,
        };

        Some(Self {
            name: parts.name,
            value: parts.value,
            domain,
            path,
            creation_time: now,
            expiration_time,
            max_age: parts.max_age,
            secure: parts.secure,
            http_only: parts.http_only,
            host_only,
            same_site: parts.same_site,
            raw: None,
        })
    }

    /// Parse one `Set-Cookie` header received from `url`.
    pub fn from_set_cookie(url: &Url, line: &str, now: OffsetDateTime) -> Option<Self> {
        let parsed = cookie::Cookie::parse(line).ok()?;
        if parsed.name().is_empty() {
            return None;
        }
        let same_site = match parsed.same_site() {
            Some(cookie::SameSite::Lax) => SameSite::Lax,
            Some(cookie::SameSite::Strict) => SameSite::Strict,
            Some(cookie::SameSite::None) => SameSite::NoRestriction,
            None => SameSite::Unspecified,
        };
        let parts = CookieParts {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain: parsed.domain().map(str::to_string),
            path: parsed.path().map(str::to_string),
            expires: parsed.expires().and_then(|e| e.datetime()),
            max_age: parsed.max_age().map(|d| d.whole_seconds()),
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            same_site,
        };

        let mut cookie = Self::from_parts(url, parts, now)?;
        if !cookie.has_valid_prefix(url.scheme() == "https") {
            return None;
        }
        cookie.raw = Some(line.to_string());
        Some(cookie)
    }

    pub fn is_expired(&self, current_time: OffsetDateTime) -> bool {
        self.expiration_time.is_some_and(|expiry| expiry <= current_time)
    }

    /// RFC 6265bis `__Secure-` and `__Host-` prefix rules.
    pub fn has_valid_prefix(&self, secure_origin: bool) -> bool {
        if self.name.starts_with("__Secure-") && (!self.secure || !secure_origin) {
            return false;
        }
        if self.name.starts_with("__Host-")
            && (!self.secure || self.path != "/" || !self.host_only || !secure_origin)
        {
            return false;
        }
        true
    }

    /// Whether this cookie would be sent to `url`.
    pub fn matches_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.secure && url.scheme() != "https" && url.scheme() != "wss" {
            return false;
        }
        domain_matches(&self.domain, host, self.host_only) && path_matches(&self.path, url.path())
    }

    pub fn same_key(&self, other: &CanonicalCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

/// RFC 6265 domain matching.
fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
    if request_host.eq_ignore_ascii_case(cookie_domain) {
        return true;
    }
    if host_only || request_host.parse::<std::net::IpAddr>().is_ok() {
        return false;
    }
    request_host.len() > cookie_domain.len()
        && request_host.to_ascii_lowercase().ends_with(cookie_domain)
        && request_host.as_bytes()[request_host.len() - cookie_domain.len() - 1] == b'.'
}

/// RFC 6265 path matching.
fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}
