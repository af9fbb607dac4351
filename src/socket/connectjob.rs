use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::emulation::Emulation;
use crate::socket::client::SocketType;
use crate::socket::proxy::ProxySettings;
use crate::socket::tls::{HandshakeOptions, TlsContext};
use crate::tls::pinning::PinStore;
use std::net::{IpAddr, SocketAddr};
use tokio::net::{TcpSocket, TcpStream};
use tracing::debug;
use url::{Host, Url};

/// Host and port a URL points at, with IPv6 brackets removed.
pub fn target_of(url: &Url) -> Result<(String, u16), NetError> {
    let host = match url.host() {
        Some(Host::Domain(d)) => d.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => return Err(NetError::InvalidUrl(format!("{} has no host", url))),
    };
    let port = url
        .port_or_known_default()
        .ok_or_else(|| NetError::InvalidUrl(format!("{} has no port", url)))?;
    Ok((host, port))
}

/// Manages the connection process: DNS -> TCP -> proxy tunnel -> TLS.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob<'a> {
    pub emulation: &'a Emulation,
    pub handshake: HandshakeOptions,
    pub tls: &'a TlsContext,
    pub pins: &'a PinStore,
    pub proxy: Option<&'a ProxySettings>,
    pub disable_ipv6: bool,
    pub local_address: Option<IpAddr>,
    pub force_http1: bool,
}

impl ConnectJob<'_> {
    pub async fn connect(&self, url: &Url) -> Result<SocketType, NetError> {
        let (host, port) = target_of(url)?;

        let mut stream = match self.proxy {
            Some(proxy) => {
                let (phost, pport) = proxy.host_port()?;
                debug!(proxy = %proxy.redacted(), target = %host, port, "dialing via proxy");
                let mut stream = self
                    .dial(phost, pport)
                    .await
                    .map_err(|e| NetError::ProxyConnectionFailed(format!("{}: {}", proxy.redacted(), e)))?;
                proxy.establish_tunnel(&mut stream, &host, port).await?;
                stream
            }
            None => self.dial(&host, port).await?,
        };
        stream.set_nodelay(true).connection_context(&host, port)?;

        if url.scheme() != "https" {
            return Ok(SocketType::Tcp(stream));
        }

        let spec = if self.force_http1 {
            self.emulation.tls.without_h2()
        } else {
            self.emulation.tls.clone()
        };
        let mut handshake = self.handshake.clone();
        handshake.random_extension_order |= self.emulation.permute_extensions;

        let tls_stream = self.tls.handshake(&spec, &handshake, &host, port, stream).await?;
        let socket = SocketType::Ssl(tls_stream);

        if !self.pins.is_empty() {
            let hashes = socket.peer_spki_hashes()?;
            self.pins.check(&host, &hashes)?;
        }
        debug!(
            host = %host,
            port,
            profile = %self.emulation.name,
            h2 = socket.negotiated_h2(),
            "tls connection established"
        );
        Ok(socket)
    }

    async fn dial(&self, host: &str, port: u16) -> Result<TcpStream, NetError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .dns_context(host)?
            .filter(|addr| !self.disable_ipv6 || addr.is_ipv4())
            .collect();
        if addrs.is_empty() {
            return Err(NetError::NameNotResolvedFor {
                domain: host.to_string(),
                reason: "no usable addresses".into(),
            });
        }

        let mut last_err = None;
        for addr in addrs {
            match self.dial_addr(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(NetError::connection_failed_to(
            host,
            port,
            last_err.unwrap_or_else(|| std::io::Error::other("no addresses tried")),
        ))
    }

    async fn dial_addr(&self, addr: SocketAddr) -> std::io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if let Some(local) = self.local_address {
            if local.is_ipv4() == addr.is_ipv4() {
                socket.bind(SocketAddr::new(local, 0))?;
            }
        }
        socket.connect(addr).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::lookup;
    use tokio::net::TcpListener;

    #[test]
    fn test_target_of() {
        let url = Url::parse("https://[::1]:8443/x").unwrap();
        assert_eq!(target_of(&url).unwrap(), ("::1".to_string(), 8443));
        let url = Url::parse("http://example.test/").unwrap();
        assert_eq!(target_of(&url).unwrap(), ("example.test".to_string(), 80));
    }

    #[tokio::test]
    async fn test_plain_connect_with_local_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let emulation = lookup("chrome_110").unwrap();
        let tls = TlsContext::new();
        let pins = PinStore::new();
        let job = ConnectJob {
            emulation: &emulation,
            handshake: HandshakeOptions::default(),
            tls: &tls,
            pins: &pins,
            proxy: None,
            disable_ipv6: true,
            local_address: Some("127.0.0.1".parse().unwrap()),
            force_http1: false,
        };
        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
        let socket = job.connect(&url).await.unwrap();
        assert!(matches!(socket, SocketType::Tcp(_)));
        let (_server, peer) = listener.accept().await.unwrap();
        assert_eq!(peer.ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_refused_connection_reports_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let emulation = lookup("chrome_110").unwrap();
        let tls = TlsContext::new();
        let pins = PinStore::new();
        let job = ConnectJob {
            emulation: &emulation,
            handshake: HandshakeOptions::default(),
            tls: &tls,
            pins: &pins,
            proxy: None,
            disable_ipv6: false,
            local_address: None,
            force_http1: false,
        };
        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
        match job.connect(&url).await.unwrap_err() {
            NetError::ConnectionFailedTo { host, port: p, .. } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(p, port);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
