//! Error context helpers.
//!
//! Extension traits that turn IO errors into `NetError` variants carrying
//! the host, port or proxy they relate to.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Attach the target host and port.
    ///
    /// ```ignore
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("example.com", 443)?;
    /// // Error: "Connection to example.com:443 failed: connection refused"
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Attach the domain that failed to resolve.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;

    /// Attach the proxy that the IO happened on.
    fn proxy_context(self, proxy: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| NetError::connection_failed_to(host, port, e))
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::dns_failed(domain, e))
    }

    fn proxy_context(self, proxy: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::ProxyConnectionFailed(format!("{}: {}", proxy, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_connection_context() {
        let result: Result<(), io::Error> =
            Err(Error::new(ErrorKind::ConnectionRefused, "refused"));
        let err = result.connection_context("example.test", 443).unwrap_err();

        match err {
            NetError::ConnectionFailedTo { host, port, reason } => {
                assert_eq!(host, "example.test");
                assert_eq!(port, 443);
                assert!(reason.contains("refused"));
            }
            _ => panic!("Expected ConnectionFailedTo"),
        }
    }

    #[test]
    fn test_dns_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::NotFound, "no such host"));
        let err = result.dns_context("unknown.example.test").unwrap_err();

        match err {
            NetError::NameNotResolvedFor { domain, .. } => {
                assert_eq!(domain, "unknown.example.test");
            }
            _ => panic!("Expected NameNotResolvedFor"),
        }
    }

    #[test]
    fn test_proxy_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::BrokenPipe, "pipe"));
        let err = result.proxy_context("127.0.0.1:8080").unwrap_err();
        assert!(matches!(err, NetError::ProxyConnectionFailed(msg) if msg.contains("8080")));
    }
}
