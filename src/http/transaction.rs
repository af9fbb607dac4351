use crate::base::neterror::NetError;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::response::HttpResponse;
use crate::http::streamfactory::{HttpStream, HttpStreamFactory};
use crate::socket::connectjob::ConnectJob;
use crate::socket::pool::{ClientSocketPool, GroupId};
use bytes::Bytes;
use http::Method;
use tracing::debug;
use url::Url;

/// A single hop as it goes on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequestInfo {
    pub method: Method,
    pub url: Url,
    pub headers: OrderedHeaderMap,
    pub body: Bytes,
}

impl HttpRequestInfo {
    /// `host[:port]`, with the port only when it differs from the scheme default.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}

/// Runs one request/response exchange over a pooled or fresh connection.
/// Roughly equivalent to net::HttpNetworkTransaction.
pub struct HttpNetworkTransaction<'a> {
    job: &'a ConnectJob<'a>,
    pool: &'a ClientSocketPool,
    reused: bool,
}

impl<'a> HttpNetworkTransaction<'a> {
    pub fn new(job: &'a ConnectJob<'a>, pool: &'a ClientSocketPool) -> Self {
        Self { job, pool, reused: false }
    }

    /// Whether the last exchange ran on a pooled connection.
    pub fn was_reused(&self) -> bool {
        self.reused
    }

    /// Send `request` and read the whole response.
    ///
    /// A pooled connection that turns out to be closed by the peer is
    /// replaced by a fresh one once. Errors on a fresh connection are final.
    pub async fn start(&mut self, request: &HttpRequestInfo) -> Result<HttpResponse, NetError> {
        let group = GroupId::for_job(self.job, &request.url)?;

        if let Some(stream) = self.pool.checkout(&group) {
            self.reused = true;
            match self.send_on(stream, &group, request).await {
                Err(e) if e.is_stale_connection() => {
                    debug!(url = %request.url, error = %e, "pooled connection was stale, reconnecting");
                }
                result => return result,
            }
        }

        self.reused = false;
        let socket = self.job.connect(&request.url).await?;
        let stream = HttpStreamFactory::create_stream(socket, &self.job.emulation.http2).await?;
        self.send_on(stream, &group, request).await
    }

    async fn send_on(
        &self,
        mut stream: HttpStream,
        group: &GroupId,
        request: &HttpRequestInfo,
    ) -> Result<HttpResponse, NetError> {
        let response = stream.send(request).await?;
        if stream.is_reusable() {
            self.pool.release(group.clone(), stream);
        }
        Ok(response)
    }
}
