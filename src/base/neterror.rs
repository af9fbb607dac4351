use thiserror::Error;

/// Coarse error categories surfaced to callers.
///
/// Every [`NetError`] maps onto exactly one of these through [`NetError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidPayload,
    UnknownProfile,
    InvalidProfile,
    NegotiationSetupFailed,
    ConnectionFailed,
    Timeout,
    TooManyRedirects,
    UnsupportedEncoding,
    DecodeError,
    HandleNotFound,
    Internal,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Input errors
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("unsupported request method: {0}")]
    MethodNotSupported(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    // Profile errors
    #[error("unknown tls client profile: {0}")]
    UnknownProfile(String),
    #[error("invalid tls client profile: {0}")]
    InvalidProfile(String),

    // Negotiation setup
    #[error("failed to set up TLS negotiation: {0}")]
    NegotiationSetupFailed(String),

    // Connection errors
    #[error("Connection to {host}:{port} failed: {reason}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("Name not resolved for {domain}: {reason}")]
    NameNotResolvedFor { domain: String, reason: String },
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Proxy connection failed: {0}")]
    ProxyConnectionFailed(String),
    #[error("Tunnel connection failed: {0}")]
    TunnelConnectionFailed(String),
    #[error("SOCKS connection failed: {0}")]
    SocksConnectionFailed(String),
    #[error("SSL handshake failed: {0}")]
    SslProtocolError(String),
    #[error("bad ssl pin detected for {0}")]
    SslPinnedKeyNotInCertChain(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("HTTP/2 protocol error: {0}")]
    Http2ProtocolError(String),
    #[error("HTTP/2 stream reset by server (error code {0})")]
    Http2StreamReset(u32),
    #[error("HTTP/2 compression error: {0}")]
    Http2CompressionError(String),

    // Request lifecycle
    #[error("request timed out after {0} ms")]
    TimedOut(u64),
    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),
    #[error("invalid redirect location: {0}")]
    InvalidRedirect(String),

    // Decompression
    #[error("unsupported content encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("failed to decode body: {0}")]
    DecodeError(String),

    // Registry
    #[error("no retained result for handle {0}")]
    HandleNotFound(String),

    // Internal faults captured by the panic policy
    #[error("internal fault: {0}")]
    Internal(String),
}

impl NetError {
    pub fn connection_failed_to(host: &str, port: u16, err: std::io::Error) -> Self {
        NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            reason: err.to_string(),
        }
    }

    pub fn dns_failed(domain: &str, err: std::io::Error) -> Self {
        NetError::NameNotResolvedFor {
            domain: domain.to_string(),
            reason: err.to_string(),
        }
    }

    /// Caller-facing category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::InvalidPayload(_)
            | NetError::InvalidUrl(_)
            | NetError::MethodNotSupported(_)
            | NetError::InvalidHeader(_) => ErrorKind::InvalidPayload,
            NetError::UnknownProfile(_) => ErrorKind::UnknownProfile,
            NetError::InvalidProfile(_) => ErrorKind::InvalidProfile,
            NetError::NegotiationSetupFailed(_) => ErrorKind::NegotiationSetupFailed,
            NetError::ConnectionFailedTo { .. }
            | NetError::NameNotResolvedFor { .. }
            | NetError::ConnectionClosed
            | NetError::ProxyConnectionFailed(_)
            | NetError::TunnelConnectionFailed(_)
            | NetError::SocksConnectionFailed(_)
            | NetError::SslProtocolError(_)
            | NetError::SslPinnedKeyNotInCertChain(_)
            | NetError::InvalidResponse(_)
            | NetError::Http2ProtocolError(_)
            | NetError::Http2StreamReset(_)
            | NetError::Http2CompressionError(_)
            | NetError::InvalidRedirect(_) => ErrorKind::ConnectionFailed,
            NetError::TimedOut(_) => ErrorKind::Timeout,
            NetError::TooManyRedirects(_) => ErrorKind::TooManyRedirects,
            NetError::UnsupportedEncoding(_) => ErrorKind::UnsupportedEncoding,
            NetError::DecodeError(_) => ErrorKind::DecodeError,
            NetError::HandleNotFound(_) => ErrorKind::HandleNotFound,
            NetError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a failed attempt on a reused connection may be retried on a fresh one.
    pub fn is_stale_connection(&self) -> bool {
        matches!(
            self,
            NetError::ConnectionClosed | NetError::Http2ProtocolError(_)
        )
    }

    /// Chromium-style negative error code.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionFailedTo { .. } => -104,
            NetError::NameNotResolvedFor { .. } => -105,
            NetError::SslProtocolError(_) => -107,
            NetError::TunnelConnectionFailed(_) => -111,
            NetError::TimedOut(_) => -118,
            NetError::SocksConnectionFailed(_) => -120,
            NetError::ProxyConnectionFailed(_) => -130,
            NetError::SslPinnedKeyNotInCertChain(_) => -150,

            NetError::InvalidUrl(_) => -300,
            NetError::InvalidRedirect(_) => -303,
            NetError::TooManyRedirects(_) => -310,
            NetError::InvalidResponse(_) => -320,
            NetError::MethodNotSupported(_) => -322,
            NetError::DecodeError(_) => -330,
            NetError::Http2ProtocolError(_) => -337,
            NetError::Http2CompressionError(_) => -363,
            NetError::Http2StreamReset(_) => -372,
            NetError::UnsupportedEncoding(_) => -371,

            // Engine-level codes live outside Chromium's ranges.
            NetError::InvalidPayload(_) => -1000,
            NetError::InvalidHeader(_) => -1001,
            NetError::UnknownProfile(_) => -1010,
            NetError::InvalidProfile(_) => -1011,
            NetError::NegotiationSetupFailed(_) => -1012,
            NetError::HandleNotFound(_) => -1020,
            NetError::Internal(_) => -1099,
        }
    }
}
