use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::cookies::psl::registrable_domain;
use crate::cookies::CanonicalCookie;
use crate::emulation;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::response::HttpResponse;
use crate::http::transaction::{HttpNetworkTransaction, HttpRequestInfo};
use crate::socket::connectjob::ConnectJob;
use crate::urlrequest::context::Session;
use crate::urlrequest::request::URLRequest;
use bytes::Bytes;
use http::{Method, StatusCode};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use url::{Host, Url};

/// Logs at `info` when the request asked for debug output, `debug` otherwise.
macro_rules! hop_event {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

/// Headers that describe the body and go away with it.
const BODY_HEADERS: [&str; 4] = ["content-type", "content-length", "content-encoding", "transfer-encoding"];

/// Headers not forwarded to a redirect target on another site.
const CREDENTIAL_HEADERS: [&str; 3] = ["authorization", "cookie", "cookie2"];

/// What the executor hands to the marshaller.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub response: HttpResponse,
    /// Effective URL after redirects.
    pub url: Url,
    /// Name to value of the cookies visible at `url`.
    pub cookies: BTreeMap<String, String>,
}

/// Runs one request through profile resolution, connection setup and the
/// redirect chain. Roughly equivalent to net::URLRequestHttpJob.
pub struct URLRequestJob<'a> {
    request: &'a URLRequest,
    session: &'a Session,
    default_profile: &'a str,
    max_redirects: usize,
    state: LoadState,
}

/// Whether both URLs share a registrable domain. IP literals and bare
/// public suffixes only match themselves.
fn same_site(prev: &Url, next: &Url) -> bool {
    match (prev.host(), next.host()) {
        (Some(Host::Domain(p)), Some(Host::Domain(n))) => {
            match (registrable_domain(p), registrable_domain(n)) {
                (Some(p), Some(n)) => p == n,
                _ => p.eq_ignore_ascii_case(n),
            }
        }
        (Some(p), Some(n)) => p == n,
        _ => false,
    }
}

/// The URL a redirect response points at, or `None` if it is not a redirect.
fn redirect_target(response: &HttpResponse, current: &Url) -> Result<Option<Url>, NetError> {
    if !matches!(response.status().as_u16(), 301 | 302 | 303 | 307 | 308) {
        return Ok(None);
    }
    let Some(location) = response.location() else {
        return Ok(None);
    };
    let next = current
        .join(location.trim())
        .map_err(|e| NetError::InvalidRedirect(format!("{}: {}", location, e)))?;
    if !matches!(next.scheme(), "http" | "https") {
        return Err(NetError::InvalidRedirect(next.to_string()));
    }
    Ok(Some(next))
}

/// `a=1; b=2` to `[("a", "1"), ("b", "2")]`.
fn cookie_pairs(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Join cookie sources into one `Cookie` value. Earlier sources win on a
/// name collision and keep their position.
fn merge_cookies(sources: &[Vec<(String, String)>]) -> Option<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    for (name, value) in sources.iter().flatten() {
        if seen.contains(&name.as_str()) {
            continue;
        }
        seen.push(name);
        out.push(format!("{}={}", name, value));
    }
    (!out.is_empty()).then(|| out.join("; "))
}

impl<'a> URLRequestJob<'a> {
    pub fn new(
        request: &'a URLRequest,
        session: &'a Session,
        default_profile: &'a str,
        max_redirects: usize,
    ) -> Self {
        Self {
            request,
            session,
            default_profile,
            max_redirects,
            state: LoadState::Idle,
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.state
    }

    pub async fn run(&mut self) -> Result<JobOutcome, NetError> {
        let result = self.run_inner().await;
        self.state = match result {
            Ok(_) => LoadState::Completed,
            Err(_) => LoadState::Failed,
        };
        result
    }

    fn uses_jar(&self) -> bool {
        !self.request.without_cookie_jar
    }

    /// Cookie header for one hop: the caller's `Cookie` header first, then
    /// per-request cookies when the jar is off, then jar cookies.
    fn hop_headers(&self, headers: &OrderedHeaderMap, url: &Url) -> Result<OrderedHeaderMap, NetError> {
        let mut headers = headers.clone();
        let explicit = headers
            .get("cookie")
            .and_then(|v| v.to_str().ok())
            .map(cookie_pairs)
            .unwrap_or_default();

        let per_request = if self.uses_jar() {
            Vec::new()
        } else {
            self.request
                .cookies
                .iter()
                .map(|c| (c.name.clone(), c.value.clone()))
                .collect()
        };

        let jar = if self.uses_jar() {
            self.session
                .cookie_store()
                .get_cookies_for_url(url)
                .into_iter()
                .map(|c| (c.name, c.value))
                .collect()
        } else {
            Vec::new()
        };

        if let Some(value) = merge_cookies(&[explicit, per_request, jar]) {
            headers.insert("cookie", &value)?;
            headers.reorder(&self.request.header_order);
        }
        Ok(headers)
    }

    /// Store the hop's `Set-Cookie` lines and record them in `seen`.
    fn absorb_cookies(&self, response: &HttpResponse, url: &Url, seen: &mut BTreeMap<String, String>) {
        let now = OffsetDateTime::now_utc();
        for line in response.set_cookies() {
            let cookie = if self.uses_jar() {
                self.session.cookie_store().parse_and_save_cookie(url, line)
            } else {
                CanonicalCookie::from_set_cookie(url, line, now)
            };
            let Some(cookie) = cookie else {
                continue;
            };
            if cookie.is_expired(now) {
                seen.remove(&cookie.name);
            } else {
                seen.insert(cookie.name, cookie.value);
            }
        }
    }

    async fn run_inner(&mut self) -> Result<JobOutcome, NetError> {
        let request = self.request;
        let session = self.session;
        let verbose = request.debug;

        self.state = LoadState::ResolvingProfile;
        let emulation = emulation::resolve(
            request.profile.as_deref(),
            request.custom_profile.as_ref(),
            self.default_profile,
        )?;
        hop_event!(verbose, profile = %emulation.name, ja3 = %emulation.tls.ja3_string(), "profile resolved");

        if self.uses_jar() && !request.cookies.is_empty() {
            let added = self
                .session
                .cookie_store()
                .add_cookies(&request.url, request.cookies.iter().cloned());
            hop_event!(verbose, added, "request cookies stored in jar");
        }

        let proxy = session.proxy();
        let job = ConnectJob {
            emulation: &emulation,
            handshake: request.handshake.clone(),
            tls: session.tls(),
            pins: session.pins(),
            proxy: proxy.as_ref(),
            disable_ipv6: request.disable_ipv6,
            local_address: request.local_address,
            force_http1: request.force_http1,
        };

        let mut method = request.method.clone();
        let mut url = request.url.clone();
        let mut body = request.body.clone();
        let mut headers = request.headers.clone();
        let mut seen_cookies = BTreeMap::new();
        let mut hops = 0;

        loop {
            self.state = LoadState::Negotiating;
            let info = HttpRequestInfo {
                method: method.clone(),
                url: url.clone(),
                headers: self.hop_headers(&headers, &url)?,
                body: body.clone(),
            };

            let mut transaction = HttpNetworkTransaction::new(&job, session.pool());
            self.state = LoadState::SendingRequest;
            let mut response = transaction.start(&info).await?;
            self.state = LoadState::AwaitingResponse;
            hop_event!(
                verbose,
                method = %method,
                url = %url,
                status = response.status().as_u16(),
                version = ?response.version(),
                reused = transaction.was_reused(),
                "response received"
            );

            self.absorb_cookies(&response, &url, &mut seen_cookies);

            let next = if request.follow_redirects {
                redirect_target(&response, &url)?
            } else {
                None
            };
            let Some(next) = next else {
                response.decode_body()?;
                let cookies = self.final_cookies(&url, seen_cookies);
                return Ok(JobOutcome { response, url, cookies });
            };

            if hops >= self.max_redirects {
                return Err(NetError::TooManyRedirects(hops));
            }
            hops += 1;
            self.state = LoadState::FollowingRedirect;

            let status = response.status();
            let rewrite = matches!(
                status,
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
            );
            if rewrite {
                if method != Method::HEAD {
                    method = Method::GET;
                }
                body = Bytes::new();
                for name in BODY_HEADERS {
                    headers.remove(name);
                }
            }
            if !same_site(&url, &next) {
                for name in CREDENTIAL_HEADERS {
                    headers.remove(name);
                }
            }
            hop_event!(verbose, from = %url, to = %next, status = status.as_u16(), hop = hops, "following redirect");
            url = next;
        }
    }

    fn final_cookies(&self, url: &Url, mut seen: BTreeMap<String, String>) -> BTreeMap<String, String> {
        if self.uses_jar() {
            for cookie in self.session.cookie_store().get_cookies_for_url(url) {
                seen.insert(cookie.name, cookie.value);
            }
        }
        seen
    }
}
