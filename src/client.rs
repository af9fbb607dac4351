//! The request engine with builder pattern.
//!
//! An [`Engine`] owns the session registry and the handle registry. Its
//! methods mirror the operations of the C ABI on typed values; every value
//! they return is also retained, as JSON, until [`Engine::release`].
//!
//! # Example
//!
//! ```rust,ignore
//! use mimicnet::{Engine, marshal::RequestInput};
//!
//! let engine = Engine::builder()
//!     .default_profile("firefox_110")
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let resp = engine.request(RequestInput {
//!     request_url: "https://example.com/".into(),
//!     request_method: "GET".into(),
//!     session_id: Some("s1".into()),
//!     ..Default::default()
//! }).await;
//! engine.release(&resp.id)?;
//! ```

use crate::base::neterror::NetError;
use crate::emulation;
use crate::http::decompress;
use crate::marshal::{
    self, AddCookiesInput, CookieJson, CookiesOutput, DecompressInput, DecompressOutput,
    DestroyOutput, DestroySessionInput, GetCookiesInput, HandleRegistry, RequestInput, Response,
};
use crate::urlrequest::{JobOutcome, SessionManager, URLRequest, URLRequestJob};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, debug_span, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// Engine-wide defaults. Everything else arrives with each request.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Profile used when a request names none.
    pub default_profile: String,
    /// Whole-operation timeout when a request sets none.
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Idle connections kept per connection group.
    pub max_idle_per_host: usize,
    /// Panic policy when a request does not set `catchPanics`.
    pub catch_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_profile: emulation::DEFAULT_PROFILE.to_string(),
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            max_idle_per_host: 4,
            catch_panics: false,
        }
    }
}

/// Builder for creating an [`Engine`].
#[derive(Debug, Default)]
#[must_use]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    /// Set the profile used when a request names none.
    pub fn default_profile(mut self, name: impl Into<String>) -> Self {
        self.config.default_profile = name.into();
        self
    }

    /// Set the default whole-operation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, hops: usize) -> Self {
        self.config.max_redirects = hops;
        self
    }

    pub fn max_idle_per_host(mut self, count: usize) -> Self {
        self.config.max_idle_per_host = count;
        self
    }

    /// Convert panics during a request into status-0 responses by default.
    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.config.catch_panics = enabled;
        self
    }

    /// Build the engine. Fails if the default profile is not a built-in one.
    pub fn build(self) -> Result<Engine, NetError> {
        if emulation::lookup(&self.config.default_profile).is_none() {
            return Err(NetError::UnknownProfile(self.config.default_profile));
        }
        Ok(Engine::with_config(self.config))
    }
}

/// Sessions, retained payloads and the operations on them.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    sessions: SessionManager,
    registry: HandleRegistry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn parse_url(url: &str) -> Result<Url, NetError> {
    Url::parse(url.trim()).map_err(|e| NetError::InvalidUrl(format!("{}: {}", url, e)))
}

fn require_session_id(id: &str) -> Result<&str, NetError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(NetError::InvalidPayload("no sessionId provided".into()));
    }
    Ok(id)
}

impl Engine {
    /// Engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn with_config(config: EngineConfig) -> Self {
        Self {
            sessions: SessionManager::new(config.max_idle_per_host),
            registry: HandleRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    fn retain<T: Serialize>(&self, id: &str, value: &T) -> Result<(), NetError> {
        let payload = serde_json::to_string(value)
            .map_err(|e| NetError::Internal(format!("serialize response: {}", e)))?;
        self.registry.insert(id, payload)?;
        Ok(())
    }

    /// A retained status-0 response describing `err`.
    pub fn fail(&self, session_id: Option<String>, err: &NetError) -> Response {
        let response = marshal::failure(new_id(), session_id, err);
        if let Err(e) = self.retain(&response.id, &response) {
            warn!(error = %e, "failed to retain error response");
        }
        response
    }

    /// Execute a request. Failures come back as status-0 responses.
    pub async fn request(&self, input: RequestInput) -> Response {
        let id = new_id();
        let session_id = input.session_id.clone().filter(|s| !s.is_empty());
        let catch = input.catch_panics.unwrap_or(self.config.catch_panics);

        let span = if input.with_debug {
            info_span!("request", %id, session = session_id.as_deref().unwrap_or(""))
        } else {
            debug_span!("request", %id, session = session_id.as_deref().unwrap_or(""))
        };

        let outcome = if catch {
            match AssertUnwindSafe(self.execute(&input))
                .catch_unwind()
                .instrument(span)
                .await
            {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(panic);
                    warn!(%id, %message, "request panicked");
                    Err(NetError::Internal(message))
                }
            }
        } else {
            self.execute(&input).instrument(span).await
        };

        let response = match outcome {
            Ok(outcome) => marshal::success(id, session_id.clone(), &outcome, input.is_byte_response),
            Err(e) => {
                debug!(%id, error = %e, code = e.as_i32(), "request failed");
                marshal::failure(id, session_id.clone(), &e)
            }
        };
        match self.retain(&response.id, &response) {
            Ok(()) => response,
            Err(e) => self.fail(session_id, &e),
        }
    }

    async fn execute(&self, input: &RequestInput) -> Result<JobOutcome, NetError> {
        let request = URLRequest::from_input(input)?;

        let session = match input.session_id.as_deref().filter(|s| !s.is_empty()) {
            Some(id) => self.sessions.get_or_create(id),
            None => self.sessions.ephemeral(&new_id()),
        };
        session.pool().cleanup_idle_sockets();
        match input.proxy_url.as_deref() {
            Some(proxy) => session.update_proxy(proxy, input.is_rotating_proxy)?,
            None if input.is_rotating_proxy => session.pool().clear(),
            None => {}
        }
        if !input.certificate_pinning_hosts.is_empty() {
            session.update_pins(&input.certificate_pinning_hosts)?;
        }

        let timeout = request.timeout.unwrap_or(self.config.timeout);
        let mut job = URLRequestJob::new(
            &request,
            &session,
            &self.config.default_profile,
            self.config.max_redirects,
        );
        let result = tokio::time::timeout(timeout, job.run()).await;
        match result {
            Ok(result) => result,
            Err(_) => {
                debug!(state = ?job.load_state(), "request timed out");
                Err(NetError::TimedOut(timeout.as_millis() as u64))
            }
        }
    }

    fn cookies_output(&self, session_id: &str, url: &Url) -> Result<CookiesOutput, NetError> {
        let session = self.sessions.get_or_create(session_id);
        let output = CookiesOutput {
            id: new_id(),
            cookies: session
                .cookie_store()
                .get_cookies_for_url(url)
                .iter()
                .map(CookieJson::from)
                .collect(),
        };
        self.retain(&output.id, &output)?;
        Ok(output)
    }

    /// Cookies of a session that apply to a URL.
    ///
    /// An unknown session id starts an empty session.
    pub fn cookies_for(&self, input: &GetCookiesInput) -> Result<CookiesOutput, NetError> {
        let session_id = require_session_id(&input.session_id)?;
        let url = parse_url(&input.url)?;
        self.cookies_output(session_id, &url)
    }

    /// Store cookies for a URL and return the session's cookies for it.
    pub fn add_cookies(&self, input: &AddCookiesInput) -> Result<CookiesOutput, NetError> {
        let session_id = require_session_id(&input.session_id)?;
        let url = parse_url(&input.url)?;
        let session = self.sessions.get_or_create(session_id);
        let added = session
            .cookie_store()
            .add_cookies(&url, input.cookies.iter().map(CookieJson::to_parts));
        debug!(session = session_id, added, offered = input.cookies.len(), "cookies added");
        self.cookies_output(session_id, &url)
    }

    pub fn destroy_session(&self, input: &DestroySessionInput) -> Result<DestroyOutput, NetError> {
        let output = DestroyOutput {
            id: new_id(),
            success: self.sessions.destroy(input.session_id.trim()),
        };
        self.retain(&output.id, &output)?;
        Ok(output)
    }

    /// Drop every session. Retained payloads are not affected.
    pub fn destroy_all(&self) -> Result<DestroyOutput, NetError> {
        self.sessions.destroy_all();
        let output = DestroyOutput { id: new_id(), success: true };
        self.retain(&output.id, &output)?;
        Ok(output)
    }

    /// Release a retained payload.
    pub fn release(&self, id: &str) -> Result<(), NetError> {
        self.registry.release(id)
    }

    /// Drops every retained payload. Pointers handed out over the C ABI are
    /// invalid afterwards.
    pub fn release_all(&self) {
        self.registry.release_all();
    }

    /// Decode a compressed body. The body is read as base64 first and only
    /// falls back to raw text when it is not valid base64.
    pub fn decompress_body(&self, input: &DecompressInput) -> Result<DecompressOutput, NetError> {
        let output = DecompressOutput {
            id: new_id(),
            body: decompress::decompress_text(&input.encoding, &input.body)?,
        };
        self.retain(&output.id, &output)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let engine = Engine::builder().build().unwrap();
        let config = engine.config();
        assert_eq!(config.default_profile, "chrome_110");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.max_idle_per_host, 4);
        assert!(!config.catch_panics);
    }

    #[test]
    fn test_builder_rejects_unknown_default_profile() {
        let err = Engine::builder().default_profile("netscape_4").build().unwrap_err();
        assert_eq!(err, NetError::UnknownProfile("netscape_4".into()));
    }

    #[test]
    fn test_cookie_roundtrip_replaces_same_key() {
        let engine = Engine::new();
        let add = |value: &str| AddCookiesInput {
            session_id: "s1".into(),
            url: "https://example.test/".into(),
            cookies: vec![CookieJson { name: "a".into(), value: value.into(), ..Default::default() }],
        };
        engine.add_cookies(&add("1")).unwrap();
        let out = engine.add_cookies(&add("2")).unwrap();
        assert_eq!(out.cookies.len(), 1);
        assert_eq!(out.cookies[0].value, "2");
        assert_eq!(out.cookies[0].domain, "example.test");

        let get = GetCookiesInput { session_id: "s1".into(), url: "https://example.test/x".into() };
        assert_eq!(engine.cookies_for(&get).unwrap().cookies.len(), 1);
        assert!(engine.registry().contains(&out.id));
    }

    #[test]
    fn test_missing_session_id() {
        let engine = Engine::new();
        let get = GetCookiesInput { session_id: " ".into(), url: "https://example.test/".into() };
        assert!(matches!(engine.cookies_for(&get), Err(NetError::InvalidPayload(_))));
    }

    #[test]
    fn test_destroy_and_release() {
        let engine = Engine::new();
        engine.sessions().get_or_create("s1");
        let input = DestroySessionInput { session_id: "s1".into() };
        let first = engine.destroy_session(&input).unwrap();
        let second = engine.destroy_session(&input).unwrap();
        assert!(first.success);
        assert!(!second.success);

        assert!(engine.release(&first.id).is_ok());
        assert!(matches!(engine.release(&first.id), Err(NetError::HandleNotFound(_))));

        let kept = engine.destroy_all().unwrap();
        engine.release_all();
        assert!(!engine.registry().contains(&kept.id));
    }

    #[test]
    fn test_decompress_body_is_retained() {
        let engine = Engine::new();
        let out = engine
            .decompress_body(&DecompressInput { encoding: "identity".into(), body: "aGk=".into() })
            .unwrap();
        assert_eq!(out.body, "hi");
        assert!(engine.registry().payload(&out.id).unwrap().contains("\"body\":\"hi\""));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_status_zero() {
        let engine = Engine::new();
        let resp = engine
            .request(RequestInput {
                request_url: "https://example.test/".into(),
                request_method: "GET".into(),
                timeout_seconds: 1,
                timeout_milliseconds: 1,
                session_id: Some("s1".into()),
                ..Default::default()
            })
            .await;
        assert_eq!(resp.status, 0);
        assert!(resp.body.contains("mutually exclusive"));
        assert_eq!(resp.session_id.as_deref(), Some("s1"));
        assert!(engine.registry().contains(&resp.id));
    }

    #[tokio::test]
    async fn test_unknown_profile_is_status_zero() {
        let engine = Engine::new();
        let resp = engine
            .request(RequestInput {
                request_url: "http://127.0.0.1:9/".into(),
                request_method: "GET".into(),
                tls_client_identifier: Some("chrome_1".into()),
                ..Default::default()
            })
            .await;
        assert_eq!(resp.status, 0);
        assert!(resp.body.contains("unknown tls client profile"));
        assert!(resp.session_id.is_none());
    }
}
