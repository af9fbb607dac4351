use crate::base::neterror::NetError;
use crate::http::streamfactory::HttpStream;
use crate::socket::connectjob::{target_of, ConnectJob};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::trace;
use url::Url;

/// Idle connections older than this are closed instead of reused.
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Identifies a connection group.
///
/// Everything that shapes the handshake is part of the key, so a pooled
/// connection is only handed to a request that would have produced the
/// same connection itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId {
    fingerprint: String,
    scheme: String,
    host: String,
    port: u16,
    proxy: Option<String>,
    insecure: bool,
    random_extension_order: bool,
    force_http1: bool,
    server_name: Option<String>,
    local_address: Option<IpAddr>,
    disable_ipv6: bool,
}

impl GroupId {
    pub fn for_job(job: &ConnectJob<'_>, url: &Url) -> Result<Self, NetError> {
        let (host, port) = target_of(url)?;
        Ok(GroupId {
            fingerprint: job.emulation.pool_key(),
            scheme: url.scheme().to_string(),
            host,
            port,
            proxy: job
                .proxy
                .map(|p| format!("{}#{}", p.redacted(), p.username.as_deref().unwrap_or(""))),
            insecure: job.handshake.insecure_skip_verify,
            random_extension_order: job.handshake.random_extension_order
                || job.emulation.permute_extensions,
            force_http1: job.force_http1,
            server_name: job.handshake.server_name_overwrite.clone(),
            local_address: job.local_address,
            disable_ipv6: job.disable_ipv6,
        })
    }
}

/// Idle connection with the time it was returned.
struct IdleSocket {
    stream: HttpStream,
    start_time: Instant,
}

/// Idle connections of one session.
///
/// A connection is owned by exactly one request at a time: `checkout`
/// removes it from the pool and `release` puts it back once the response
/// has been read in full.
pub struct ClientSocketPool {
    max_idle_per_group: usize,
    groups: DashMap<GroupId, VecDeque<IdleSocket>>,
}

impl std::fmt::Debug for ClientSocketPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSocketPool")
            .field("max_idle_per_group", &self.max_idle_per_group)
            .field("idle", &self.idle_socket_count())
            .finish()
    }
}

impl Default for ClientSocketPool {
    fn default() -> Self {
        Self::new(4)
    }
}

impl ClientSocketPool {
    pub fn new(max_idle_per_group: usize) -> Self {
        Self { max_idle_per_group, groups: DashMap::new() }
    }

    /// Take the most recently used live connection of a group.
    pub fn checkout(&self, group_id: &GroupId) -> Option<HttpStream> {
        let mut group = self.groups.get_mut(group_id)?;
        let now = Instant::now();
        while let Some(idle) = group.pop_back() {
            if now.duration_since(idle.start_time) < IDLE_TIMEOUT && idle.stream.is_reusable() {
                trace!(host = %group_id.host, port = group_id.port, "reusing idle connection");
                return Some(idle.stream);
            }
            // Dead or expired, dropped here.
        }
        None
    }

    /// Return a connection after use. Unusable connections are dropped.
    pub fn release(&self, group_id: GroupId, stream: HttpStream) {
        if self.max_idle_per_group == 0 || !stream.is_reusable() {
            return;
        }
        let mut group = self.groups.entry(group_id).or_default();
        group.push_back(IdleSocket { stream, start_time: Instant::now() });
        while group.len() > self.max_idle_per_group {
            group.pop_front();
        }
    }

    /// Close every idle connection.
    pub fn clear(&self) {
        self.groups.clear();
    }

    /// Get total idle socket count across all groups.
    pub fn idle_socket_count(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    /// Drop expired and dead idle connections.
    pub fn cleanup_idle_sockets(&self) {
        let now = Instant::now();
        self.groups.retain(|_, group| {
            group.retain(|idle| {
                now.duration_since(idle.start_time) < IDLE_TIMEOUT && idle.stream.is_reusable()
            });
            !group.is_empty()
        });
    }
}
