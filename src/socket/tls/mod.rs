//! TLS handshakes with an emulated ClientHello.
//!
//! [`TlsContext`] is owned by one session. It caches a BoringSSL connector
//! per (fingerprint, handshake flags) and the resumption sessions those
//! connectors produce, so a session reuses tickets only with the profile
//! that earned them.

use crate::base::neterror::NetError;
use boring::ex_data::Index;
use boring::ssl::{Ssl, SslConnector, SslMethod, SslSession, SslSessionCacheMode};
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tokio::net::TcpStream;
use tokio_boring::SslStream;
use tracing::debug;

pub mod clienthello;
pub mod names;
pub mod options;

pub use self::clienthello::ClientHelloSpec;
pub use self::names::{CertCompression, GREASE_PLACEHOLDER};
pub use self::options::TlsOptions;

/// Per-connection handshake switches that do not change the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HandshakeOptions {
    pub insecure_skip_verify: bool,
    pub random_extension_order: bool,
    /// Sent as SNI instead of the URL host.
    pub server_name_overwrite: Option<String>,
}

static SESSION_KEY_INDEX: OnceLock<Index<Ssl, String>> = OnceLock::new();

fn session_key_index() -> Result<Index<Ssl, String>, NetError> {
    if let Some(index) = SESSION_KEY_INDEX.get() {
        return Ok(*index);
    }
    let index = Ssl::new_ex_index()
        .map_err(|e| NetError::NegotiationSetupFailed(format!("ex index: {}", e)))?;
    Ok(*SESSION_KEY_INDEX.get_or_init(|| index))
}

/// Connector and resumption cache for one session.
#[derive(Default)]
pub struct TlsContext {
    connectors: DashMap<String, SslConnector>,
    sessions: Arc<DashMap<String, SslSession>>,
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext")
            .field("connectors", &self.connectors.len())
            .field("cached_sessions", &self.sessions.len())
            .finish()
    }
}

impl TlsContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn connector_key(spec: &ClientHelloSpec, opts: &HandshakeOptions) -> String {
        format!(
            "{}#{}{}",
            spec.fingerprint_key(),
            u8::from(opts.insecure_skip_verify),
            u8::from(opts.random_extension_order)
        )
    }

    fn connector(
        &self,
        key: &str,
        spec: &ClientHelloSpec,
        opts: &HandshakeOptions,
    ) -> Result<SslConnector, NetError> {
        if let Some(connector) = self.connectors.get(key) {
            return Ok(connector.clone());
        }

        let tls = TlsOptions::from_client_hello(
            spec,
            opts.random_extension_order,
            opts.insecure_skip_verify,
        )?;
        let mut builder = SslConnector::builder(SslMethod::tls())
            .map_err(|e| NetError::NegotiationSetupFailed(e.to_string()))?;
        tls.apply_to_builder(&mut builder)?;

        let index = session_key_index()?;
        let sessions = Arc::clone(&self.sessions);
        builder.set_session_cache_mode(SslSessionCacheMode::CLIENT);
        builder.set_new_session_callback(move |ssl, session| {
            if let Some(key) = ssl.ex_data(index) {
                sessions.insert(key.clone(), session);
            }
        });

        let connector = builder.build();
        self.connectors.insert(key.to_string(), connector.clone());
        Ok(connector)
    }

    /// Run the client handshake over an established (possibly tunnelled) stream.
    pub async fn handshake(
        &self,
        spec: &ClientHelloSpec,
        opts: &HandshakeOptions,
        host: &str,
        port: u16,
        stream: TcpStream,
    ) -> Result<SslStream<TcpStream>, NetError> {
        let connector_key = Self::connector_key(spec, opts);
        let connector = self.connector(&connector_key, spec, opts)?;
        let session_key = format!("{}@{}:{}", connector_key, host, port);

        let mut config = connector
            .configure()
            .map_err(|e| NetError::NegotiationSetupFailed(e.to_string()))?;

        let server_name = opts.server_name_overwrite.as_deref().unwrap_or(host);
        if !should_set_sni(server_name) {
            config.set_use_server_name_indication(false);
        }
        if opts.insecure_skip_verify || opts.server_name_overwrite.is_some() {
            config.set_verify_hostname(false);
        }

        config.set_ex_data(session_key_index()?, session_key.clone());
        if let Some(session) = self.sessions.get(&session_key) {
            debug!(host, port, "offering tls session for resumption");
            // SAFETY: the session was produced by a connector built from this
            // same SslContext, which is the requirement of SSL_set_session.
            unsafe { config.set_session(&session) }
                .map_err(|e| NetError::SslProtocolError(e.to_string()))?;
        }

        tokio_boring::connect(config, server_name, stream)
            .await
            .map_err(|e| NetError::SslProtocolError(format!("{:?}", e)))
    }

    pub fn cached_sessions(&self) -> usize {
        self.sessions.len()
    }
}

/// Per RFC 6066, SNI must not be sent for literal IP addresses.
pub fn should_set_sni(host: &str) -> bool {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<std::net::IpAddr>()
        .is_err()
}
