//! Session state and the session registry.
//!
//! A [`Session`] plays the part of Chromium's `net::URLRequestContext`: it
//! bundles the cookie jar, TLS resumption cache, certificate pins, proxy
//! and idle connections that requests under one identifier share.

use crate::base::neterror::NetError;
use crate::cookies::monster::CookieMonster;
use crate::socket::pool::ClientSocketPool;
use crate::socket::proxy::ProxySettings;
use crate::socket::tls::TlsContext;
use crate::tls::pinning::PinStore;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// State shared by every request that names the same session identifier.
#[derive(Debug)]
pub struct Session {
    id: String,
    cookie_store: CookieMonster,
    tls: TlsContext,
    pins: PinStore,
    pin_hosts: Mutex<HashMap<String, Vec<String>>>,
    proxy: Mutex<Option<ProxySettings>>,
    pool: ClientSocketPool,
}

impl Session {
    pub fn new(id: impl Into<String>, max_idle_per_host: usize) -> Self {
        Self {
            id: id.into(),
            cookie_store: CookieMonster::new(),
            tls: TlsContext::new(),
            pins: PinStore::new(),
            pin_hosts: Mutex::new(HashMap::new()),
            proxy: Mutex::new(None),
            pool: ClientSocketPool::new(max_idle_per_host),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cookie_store(&self) -> &CookieMonster {
        &self.cookie_store
    }

    pub fn tls(&self) -> &TlsContext {
        &self.tls
    }

    pub fn pins(&self) -> &PinStore {
        &self.pins
    }

    pub fn pool(&self) -> &ClientSocketPool {
        &self.pool
    }

    pub fn proxy(&self) -> Option<ProxySettings> {
        self.proxy.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Apply a request's `proxyUrl`. An empty string clears the proxy.
    ///
    /// With `rotating`, idle connections are closed even when the URL is
    /// unchanged so the next request gets a fresh exit.
    pub fn update_proxy(&self, proxy_url: &str, rotating: bool) -> Result<(), NetError> {
        let next = match proxy_url.trim() {
            "" => None,
            url => Some(ProxySettings::parse(url)?),
        };
        let mut current = self.proxy.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != next || rotating {
            debug!(session = %self.id, rotating, "proxy changed, closing idle connections");
            *current = next;
            self.pool.clear();
        }
        Ok(())
    }

    /// Replace the certificate pins. Idle connections were verified
    /// against the old pins and are closed. Re-applying the same map is a no-op.
    pub fn update_pins(&self, hosts: &HashMap<String, Vec<String>>) -> Result<(), NetError> {
        let mut applied = self.pin_hosts.lock().unwrap_or_else(PoisonError::into_inner);
        if *applied == *hosts {
            return Ok(());
        }
        self.pins.replace_all(hosts)?;
        *applied = hosts.clone();
        self.pool.clear();
        Ok(())
    }
}

/// Identifier to session map.
///
/// The only process-wide mutable state of an engine. Distinct sessions
/// never share locks beyond the map shard holding them.
#[derive(Debug)]
pub struct SessionManager {
    sessions: DashMap<String, Arc<Session>>,
    max_idle_per_host: usize,
}

impl SessionManager {
    pub fn new(max_idle_per_host: usize) -> Self {
        Self { sessions: DashMap::new(), max_idle_per_host }
    }

    /// Session for `id`, created empty on first use.
    pub fn get_or_create(&self, id: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.get(id) {
            return Arc::clone(&session);
        }
        let entry = self.sessions.entry(id.to_string()).or_insert_with(|| {
            debug!(session = id, "session created");
            Arc::new(Session::new(id, self.max_idle_per_host))
        });
        Arc::clone(&entry)
    }

    /// A session that is not registered, for requests without an identifier.
    pub fn ephemeral(&self, id: &str) -> Arc<Session> {
        Arc::new(Session::new(id, self.max_idle_per_host))
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|s| Arc::clone(&s))
    }

    /// Remove a session. Returns whether it existed.
    ///
    /// Requests already running keep their handle on the old state; the
    /// next request with this identifier starts a fresh session.
    pub fn destroy(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id);
        if let Some((_, session)) = &removed {
            session.pool().clear();
        }
        removed.is_some()
    }

    pub fn destroy_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().pool().clear();
        }
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let manager = SessionManager::new(4);
        let a = manager.get_or_create("s1");
        let b = manager.get_or_create("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_destroy_then_recreate_is_fresh() {
        let manager = SessionManager::new(4);
        let url = url::Url::parse("https://example.test/").unwrap();
        manager.get_or_create("s1").cookie_store().parse_and_save_cookie(&url, "a=1");

        assert!(manager.destroy("s1"));
        assert!(!manager.destroy("s1"));
        assert!(manager.get("s1").is_none());

        let fresh = manager.get_or_create("s1");
        assert_eq!(fresh.cookie_store().total_cookie_count(), 0);
    }

    #[test]
    fn test_destroy_all_twice() {
        let manager = SessionManager::new(4);
        manager.get_or_create("a");
        manager.get_or_create("b");
        manager.destroy_all();
        manager.destroy_all();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_concurrent_get_or_create() {
        let manager = Arc::new(SessionManager::new(4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || manager.get_or_create("shared"))
            })
            .collect();
        let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_proxy_updates() {
        let session = Session::new("p", 4);
        session.update_proxy("http://127.0.0.1:8080", false).unwrap();
        assert!(session.proxy().is_some());
        session.update_proxy("", false).unwrap();
        assert!(session.proxy().is_none());
        assert!(session.update_proxy("ftp://x", false).is_err());
    }
}
