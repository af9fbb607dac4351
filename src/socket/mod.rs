//! Socket and connection management.
//!
//! Mirrors Chromium's `net/socket/`:
//! - [`connectjob`]: DNS → TCP → proxy tunnel → TLS
//! - [`pool`]: idle connections keyed by everything that shapes the handshake
//! - [`proxy`]: HTTP CONNECT and SOCKS5 tunnels
//! - [`tls`]: BoringSSL ClientHello construction

pub mod client;
pub mod connectjob;
pub mod pool;
pub mod proxy;
pub mod tls;
