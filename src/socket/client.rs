use crate::base::neterror::NetError;
use crate::tls::pinning::{spki_hash, SpkiHash};
use futures::task::noop_waker_ref;
use std::fmt;
use std::io::ErrorKind;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_boring::SslStream;

/// Represents a connected socket (TCP or SSL).
/// Mimics net::StreamSocket.
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + Sync + fmt::Debug {
    /// Non-blocking liveness check, not a full probe.
    fn is_connected(&self) -> bool;
}

#[derive(Debug)]
pub enum SocketType {
    Tcp(TcpStream),
    Ssl(SslStream<TcpStream>),
}

impl SocketType {
    /// A socket counts as live while peeking neither hits EOF nor an error.
    ///
    /// Peeking leaves pending bytes in place: an idle TLS connection
    /// routinely holds post-handshake records such as session tickets.
    fn check_tcp_connected(stream: &TcpStream) -> bool {
        if stream.peer_addr().is_err() {
            return false;
        }
        let mut byte = [0u8; 1];
        let mut buf = ReadBuf::new(&mut byte);
        let mut cx = Context::from_waker(noop_waker_ref());
        match stream.poll_peek(&mut cx, &mut buf) {
            Poll::Pending => true,
            Poll::Ready(Ok(0)) => false,
            Poll::Ready(Ok(_)) => true,
            Poll::Ready(Err(ref e)) => e.kind() == ErrorKind::WouldBlock,
        }
    }

    /// True when ALPN selected HTTP/2.
    pub fn negotiated_h2(&self) -> bool {
        match self {
            SocketType::Tcp(_) => false,
            SocketType::Ssl(s) => s.ssl().selected_alpn_protocol() == Some(&b"h2"[..]),
        }
    }

    /// SPKI hashes of every certificate the peer presented.
    pub fn peer_spki_hashes(&self) -> Result<Vec<SpkiHash>, NetError> {
        let SocketType::Ssl(s) = self else {
            return Ok(Vec::new());
        };
        let mut hashes = Vec::new();
        if let Some(chain) = s.ssl().peer_cert_chain() {
            for cert in chain {
                hashes.push(spki_hash(cert)?);
            }
        }
        if hashes.is_empty() {
            if let Some(leaf) = s.ssl().peer_certificate() {
                hashes.push(spki_hash(&leaf)?);
            }
        }
        Ok(hashes)
    }
}

impl AsyncRead for SocketType {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            SocketType::Ssl(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketType {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            SocketType::Ssl(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_flush(cx),
            SocketType::Ssl(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            SocketType::Ssl(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

impl StreamSocket for SocketType {
    fn is_connected(&self) -> bool {
        match self {
            SocketType::Tcp(s) => Self::check_tcp_connected(s),
            SocketType::Ssl(s) => Self::check_tcp_connected(s.get_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_liveness() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (mut server, _) = listener.accept().await.unwrap();

        let socket = SocketType::Tcp(client);
        assert!(socket.is_connected());
        assert!(!socket.negotiated_h2());
        assert!(socket.peer_spki_hashes().unwrap().is_empty());

        server.shutdown().await.unwrap();
        drop(server);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!socket.is_connected());
    }
}
