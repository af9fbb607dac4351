use crate::cookies::canonical_cookie::{CanonicalCookie, CookieParts};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use tracing::trace;
use url::Url;

/// Maximum cookies per domain (Chromium default).
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// Maximum total cookies per jar.
const MAX_COOKIES_TOTAL: usize = 3000;

/// The cookie jar of one session.
/// Modeled after Chromium's `net::CookieMonster`.
///
/// Every operation holds the jar lock for its whole duration, so readers
/// never see a half-applied update.
#[derive(Debug, Default)]
pub struct CookieMonster {
    // Map<Domain, List<Cookie>>
    store: Mutex<HashMap<String, Vec<CanonicalCookie>>>,
}

impl CookieMonster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<CanonicalCookie>>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a cookie. An already expired cookie deletes any
    /// stored cookie with the same key and is not stored itself.
    fn insert_locked(
        store: &mut HashMap<String, Vec<CanonicalCookie>>,
        mut cookie: CanonicalCookie,
        now: OffsetDateTime,
    ) {
        let entry = store.entry(cookie.domain.clone()).or_default();
        if let Some(pos) = entry.iter().position(|c| c.same_key(&cookie)) {
            // A replacement keeps the original creation time, as browsers do.
            let old = entry.remove(pos);
            cookie.creation_time = old.creation_time;
        }
        if cookie.is_expired(now) {
            trace!(name = %cookie.name, domain = %cookie.domain, "cookie deleted");
            return;
        }

        // Per-domain limit: evict the oldest.
        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            let Some(oldest) = (0..entry.len()).min_by_key(|&i| entry[i].creation_time) else {
                break;
            };
            entry.remove(oldest);
        }
        entry.push(cookie);

        let mut total: usize = store.values().map(Vec::len).sum();
        while total > MAX_COOKIES_TOTAL {
            let oldest = store
                .iter()
                .flat_map(|(domain, list)| {
                    list.iter().enumerate().map(move |(i, c)| (domain, i, c.creation_time))
                })
                .min_by_key(|(_, _, created)| *created)
                .map(|(domain, i, _)| (domain.clone(), i));
            let Some((domain, i)) = oldest else {
                break;
            };
            if let Some(list) = store.get_mut(&domain) {
                list.remove(i);
            }
            total -= 1;
        }
    }

    /// Parse a `Set-Cookie` line received from `url` and store the result.
    ///
    /// Returns the parsed cookie, or `None` if the line was rejected.
    pub fn parse_and_save_cookie(&self, url: &Url, cookie_line: &str) -> Option<CanonicalCookie> {
        let now = OffsetDateTime::now_utc();
        let Some(cookie) = CanonicalCookie::from_set_cookie(url, cookie_line, now) else {
            trace!(url = %url, "rejected Set-Cookie line");
            return None;
        };
        Self::insert_locked(&mut self.lock(), cookie.clone(), now);
        Some(cookie)
    }

    /// Store several caller-supplied cookies for `url` under one lock.
    ///
    /// Cookies whose domain `url` may not set are skipped.
    pub fn add_cookies<I>(&self, url: &Url, cookies: I) -> usize
    where
        I: IntoIterator<Item = CookieParts>,
    {
        let now = OffsetDateTime::now_utc();
        let mut store = self.lock();
        let mut added = 0;
        for parts in cookies {
            if let Some(cookie) = CanonicalCookie::from_parts(url, parts, now) {
                Self::insert_locked(&mut store, cookie, now);
                added += 1;
            }
        }
        added
    }

    /// Get cookies matching the URL, longest path first, then oldest first.
    pub fn get_cookies_for_url(&self, url: &Url) -> Vec<CanonicalCookie> {
        let Some(host) = url.host_str() else {
            return Vec::new();
        };
        let now = OffsetDateTime::now_utc();
        let store = self.lock();

        let mut result: Vec<CanonicalCookie> = Self::get_matching_domains(host)
            .iter()
            .filter_map(|domain| store.get(domain))
            .flatten()
            .filter(|cookie| !cookie.is_expired(now) && cookie.matches_url(url))
            .cloned()
            .collect();

        result.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });
        result
    }

    /// `Cookie` request header value for `url`, if any cookie applies.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.get_cookies_for_url(url);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Get all domains to check for a given host.
    /// Returns the host itself and all parent domains.
    fn get_matching_domains(host: &str) -> Vec<String> {
        let host = host.to_ascii_lowercase();
        let mut domains = vec![host.clone()];
        let mut rest = host.as_str();
        while let Some((_, parent)) = rest.split_once('.') {
            if parent.is_empty() {
                break;
            }
            domains.push(parent.to_string());
            rest = parent;
        }
        domains
    }

    /// Get total cookie count.
    pub fn total_cookie_count(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    /// Clear all cookies.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn parts(name: &str, value: &str) -> CookieParts {
        CookieParts { name: name.into(), value: value.into(), ..Default::default() }
    }

    #[test]
    fn test_same_key_replaces() {
        let jar = CookieMonster::new();
        let u = url("https://example.test/");
        jar.add_cookies(&u, [parts("a", "1")]);
        jar.add_cookies(&u, [parts("a", "2")]);
        let cookies = jar.get_cookies_for_url(&u);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, "2");
    }

    #[test]
    fn test_same_name_different_path_coexist() {
        let jar = CookieMonster::new();
        let u = url("https://example.test/");
        jar.parse_and_save_cookie(&u, "a=root; Path=/");
        jar.parse_and_save_cookie(&u, "a=deep; Path=/app");
        assert_eq!(jar.total_cookie_count(), 2);
        assert_eq!(
            jar.cookie_header(&url("https://example.test/app/x")).unwrap(),
            "a=deep; a=root"
        );
        assert_eq!(jar.cookie_header(&u).unwrap(), "a=root");
    }

    #[test]
    fn test_secure_cookie_needs_tls() {
        let jar = CookieMonster::new();
        jar.parse_and_save_cookie(&url("https://example.test/"), "s=1; Secure");
        assert!(jar.cookie_header(&url("http://example.test/")).is_none());
        assert!(jar.cookie_header(&url("https://example.test/")).is_some());
    }

    #[test]
    fn test_domain_cookie_reaches_subdomains() {
        let jar = CookieMonster::new();
        jar.parse_and_save_cookie(&url("https://example.com/"), "d=1; Domain=example.com");
        assert_eq!(jar.cookie_header(&url("https://a.b.example.com/")).unwrap(), "d=1");
        assert!(jar.cookie_header(&url("https://example.org/")).is_none());
    }

    #[test]
    fn test_expired_cookie_deletes() {
        let jar = CookieMonster::new();
        let u = url("https://example.test/");
        jar.parse_and_save_cookie(&u, "a=1");
        jar.parse_and_save_cookie(&u, "a=gone; Max-Age=0");
        assert_eq!(jar.total_cookie_count(), 0);
    }

    #[test]
    fn test_per_domain_limit() {
        let jar = CookieMonster::new();
        let u = url("https://example.test/");
        jar.add_cookies(&u, (0..60).map(|i| parts(&format!("c{}", i), "v")));
        assert_eq!(jar.total_cookie_count(), MAX_COOKIES_PER_DOMAIN);
    }

    #[test]
    fn test_matching_domains() {
        assert_eq!(
            CookieMonster::get_matching_domains("a.b.example.com"),
            vec!["a.b.example.com", "b.example.com", "example.com", "com"]
        );
    }
}
