use crate::base::neterror::NetError;
use crate::http::h2fingerprint::H2Fingerprint;
use crate::http::response::HttpResponse;
use crate::http::transaction::HttpRequestInfo;
use crate::socket::client::SocketType;
use bytes::{Bytes, BytesMut};
use http::{Request, Version};
use http2::client::SendRequest;
use http2::Reason;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::spawn;
use tracing::{debug, trace};

pub type H1Sender = http1::SendRequest<Full<Bytes>>;

/// Wraps the underlying protocol stream (H1/H2).
/// Equivalent to net::HttpStream.
#[derive(Debug)]
pub enum HttpStream {
    Http1(H1Sender),
    Http2(H2Sender),
}

fn h1_error(e: hyper::Error) -> NetError {
    if e.is_canceled() || e.is_closed() || e.is_incomplete_message() {
        debug!(error = %e, "http/1.1 connection closed");
        NetError::ConnectionClosed
    } else {
        NetError::InvalidResponse(e.to_string())
    }
}

fn h2_error(e: http2::Error) -> NetError {
    if e.is_io() || e.is_go_away() {
        debug!(error = %e, "h2 connection closed");
        return NetError::ConnectionClosed;
    }
    match e.reason() {
        Some(reason) if reason == Reason::COMPRESSION_ERROR => {
            NetError::Http2CompressionError(e.to_string())
        }
        Some(reason) if e.is_reset() => NetError::Http2StreamReset(u32::from(reason)),
        _ => NetError::Http2ProtocolError(e.to_string()),
    }
}

/// `path?query` of a URL, the request target of an origin-form request.
pub fn origin_form(url: &url::Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}

/// Request handle of a multiplexed HTTP/2 connection.
///
/// The connection itself runs on a spawned task that flips `closed` when it
/// ends.
#[derive(Clone)]
pub struct H2Sender {
    send: SendRequest<Bytes>,
    closed: Arc<AtomicBool>,
}

impl fmt::Debug for H2Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("H2Sender")
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl H2Sender {
    /// Write the preface with the profile's SETTINGS, WINDOW_UPDATE and
    /// PRIORITY frames, then hand back a request handle.
    pub async fn handshake<T>(io: T, fingerprint: &H2Fingerprint) -> Result<Self, NetError>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let builder = fingerprint.client_builder();
        let (send, conn) = builder.handshake::<T, Bytes>(io).await.map_err(h2_error)?;
        trace!(akamai = %fingerprint.akamai_string(), "h2 handshake done");

        let closed = Arc::new(AtomicBool::new(false));
        let flag = closed.clone();
        spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "h2 connection task ended");
            }
            flag.store(true, Ordering::Release);
        });

        Ok(Self { send, closed })
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    async fn send(&self, req: &HttpRequestInfo) -> Result<HttpResponse, NetError> {
        let uri = format!(
            "{}://{}{}",
            req.url.scheme(),
            req.authority(),
            origin_form(&req.url)
        );
        let mut request = Request::builder()
            .method(req.method.clone())
            .uri(uri)
            .version(Version::HTTP_2)
            .body(())
            .map_err(|e| NetError::InvalidHeader(e.to_string()))?;
        *request.headers_mut() = req.headers.to_h2_header_map();

        let mut send = self.send.clone().ready().await.map_err(h2_error)?;
        let end_of_stream = req.body.is_empty();
        let (response, mut stream) = send
            .send_request(request, end_of_stream)
            .map_err(h2_error)?;
        if !end_of_stream {
            stream.send_data(req.body.clone(), true).map_err(h2_error)?;
        }

        let (parts, mut recv) = response.await.map_err(h2_error)?.into_parts();
        let mut body = BytesMut::new();
        while let Some(chunk) = recv.data().await {
            let chunk = chunk.map_err(h2_error)?;
            recv.flow_control()
                .release_capacity(chunk.len())
                .map_err(h2_error)?;
            body.extend_from_slice(&chunk);
        }
        Ok(HttpResponse::from_parts(parts, body.freeze()))
    }
}

impl HttpStream {
    /// Whether the connection can carry another request.
    pub fn is_reusable(&self) -> bool {
        match self {
            HttpStream::Http1(sender) => !sender.is_closed(),
            HttpStream::Http2(sender) => sender.is_open(),
        }
    }

    /// Send one request and read the whole response.
    pub async fn send(&mut self, req: &HttpRequestInfo) -> Result<HttpResponse, NetError> {
        match self {
            HttpStream::Http1(sender) => {
                sender.ready().await.map_err(h1_error)?;
                let mut request = Request::builder()
                    .method(req.method.clone())
                    .uri(origin_form(&req.url))
                    .version(Version::HTTP_11)
                    .body(Full::new(req.body.clone()))
                    .map_err(|e| NetError::InvalidHeader(e.to_string()))?;
                let mut headers = req.headers.clone();
                headers.prepend_if_absent("host", &req.authority())?;
                *request.headers_mut() = headers.to_header_map();

                let resp = sender.send_request(request).await.map_err(h1_error)?;
                let (parts, body) = resp.into_parts();
                let body = body.collect().await.map_err(h1_error)?.to_bytes();
                Ok(HttpResponse::from_parts(parts, body))
            }
            HttpStream::Http2(sender) => sender.send(req).await,
        }
    }
}

/// Turns connected sockets into protocol streams.
pub struct HttpStreamFactory;

impl HttpStreamFactory {
    /// Speak HTTP/2 when ALPN selected it, HTTP/1.1 otherwise.
    pub async fn create_stream(
        socket: SocketType,
        h2: &H2Fingerprint,
    ) -> Result<HttpStream, NetError> {
        if socket.negotiated_h2() {
            return Ok(HttpStream::Http2(H2Sender::handshake(socket, h2).await?));
        }

        let (sender, conn) = http1::Builder::new()
            .title_case_headers(true)
            .handshake(TokioIo::new(socket))
            .await
            .map_err(h1_error)?;

        spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "http/1.1 connection task ended");
            }
        });

        Ok(HttpStream::Http1(sender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::h2fingerprint::{PriorityParam, SettingId, FIREFOX_PSEUDO_ORDER};
    use crate::http::orderedheaders::OrderedHeaderMap;
    use http::Method;
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};
    use url::Url;

    const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

    async fn read_frame(io: &mut DuplexStream) -> (u8, u32, Vec<u8>) {
        let mut head = [0u8; 9];
        io.read_exact(&mut head).await.unwrap();
        let len = u32::from_be_bytes([0, head[0], head[1], head[2]]) as usize;
        let stream = u32::from_be_bytes([head[5], head[6], head[7], head[8]]) & 0x7fff_ffff;
        let mut payload = vec![0u8; len];
        io.read_exact(&mut payload).await.unwrap();
        (head[3], stream, payload)
    }

    fn chrome_like() -> H2Fingerprint {
        H2Fingerprint::builder()
            .setting(SettingId::HeaderTableSize, 65_536)
            .setting(SettingId::EnablePush, 0)
            .setting(SettingId::InitialWindowSize, 6_291_456)
            .setting(SettingId::MaxHeaderListSize, 262_144)
            .connection_flow(15_663_105)
            .build()
            .unwrap()
    }

    #[test]
    fn test_origin_form() {
        let url = Url::parse("https://example.test/a/b?x=1&y=2#frag").unwrap();
        assert_eq!(origin_form(&url), "/a/b?x=1&y=2");
        let url = Url::parse("https://example.test").unwrap();
        assert_eq!(origin_form(&url), "/");
    }

    #[tokio::test]
    async fn test_preface_carries_profile_settings() {
        let (client, mut server) = duplex(1 << 16);
        let _sender = H2Sender::handshake(client, &chrome_like()).await.unwrap();

        let mut preface = [0u8; 24];
        server.read_exact(&mut preface).await.unwrap();
        assert_eq!(&preface[..], PREFACE);

        let (kind, stream, payload) = read_frame(&mut server).await;
        assert_eq!((kind, stream), (0x4, 0));
        let settings: Vec<(u16, u32)> = payload
            .chunks(6)
            .map(|c| {
                (
                    u16::from_be_bytes([c[0], c[1]]),
                    u32::from_be_bytes([c[2], c[3], c[4], c[5]]),
                )
            })
            .collect();
        assert_eq!(
            settings,
            vec![(1, 65_536), (2, 0), (4, 6_291_456), (6, 262_144)]
        );

        let (kind, stream, payload) = read_frame(&mut server).await;
        assert_eq!((kind, stream), (0x8, 0));
        let increment = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        assert_eq!(increment, 15_663_105);
    }

    #[tokio::test]
    async fn test_priority_frames_sent_after_settings() {
        let fp = H2Fingerprint::builder()
            .setting(SettingId::InitialWindowSize, 131_072)
            .pseudo_order(FIREFOX_PSEUDO_ORDER)
            .connection_flow(12_517_377)
            .priority(3, PriorityParam::new(0, 200, false))
            .priority(5, PriorityParam::new(0, 100, false))
            .build()
            .unwrap();
        let (client, mut server) = duplex(1 << 16);
        let _sender = H2Sender::handshake(client, &fp).await.unwrap();

        let mut preface = [0u8; 24];
        server.read_exact(&mut preface).await.unwrap();
        let mut kinds = Vec::new();
        let mut priority_streams = Vec::new();
        for _ in 0..4 {
            let (kind, stream, _) = read_frame(&mut server).await;
            if kind == 0x2 {
                priority_streams.push(stream);
            }
            kinds.push(kind);
        }
        assert_eq!(kinds[0], 0x4);
        assert!(kinds.contains(&0x8));
        assert_eq!(priority_streams, vec![3, 5]);
    }

    #[tokio::test]
    async fn test_request_round_trip_over_h2() {
        let (client, server) = duplex(1 << 16);
        let server = spawn(async move {
            let mut conn = http2::server::handshake(server).await.unwrap();
            let mut seen = Vec::new();
            while let Some(accepted) = conn.accept().await {
                let (request, mut respond) = accepted.unwrap();
                let names: Vec<String> =
                    request.headers().keys().map(|n| n.as_str().to_string()).collect();
                seen.push((request.uri().path().to_string(), names));
                let response = http::Response::builder()
                    .status(201)
                    .header("set-cookie", "a=1")
                    .header("set-cookie", "b=2")
                    .body(())
                    .unwrap();
                let mut body = respond.send_response(response, false).unwrap();
                body.send_data(Bytes::from_static(b"hello h2"), true).unwrap();
            }
            seen
        });

        let mut stream = HttpStream::Http2(H2Sender::handshake(client, &chrome_like()).await.unwrap());
        let mut headers = OrderedHeaderMap::new();
        headers.insert("connection", "keep-alive").unwrap();
        headers.insert("user-agent", "mimicnet-test").unwrap();
        headers.insert("accept", "*/*").unwrap();
        let req = HttpRequestInfo {
            method: Method::GET,
            url: Url::parse("https://example.test/path?q=1").unwrap(),
            headers,
            body: Bytes::new(),
        };

        let resp = stream.send(&req).await.unwrap();
        assert_eq!(resp.status().as_u16(), 201);
        assert_eq!(resp.version(), Version::HTTP_2);
        assert_eq!(&resp.body()[..], b"hello h2");
        assert_eq!(resp.set_cookies().collect::<Vec<_>>(), vec!["a=1", "b=2"]);
        assert!(stream.is_reusable());

        drop(stream);
        let seen = server.await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "/path");
        assert_eq!(seen[0].1, vec!["user-agent".to_string(), "accept".to_string()]);
    }
}
