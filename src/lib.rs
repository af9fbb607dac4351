//! # mimicnet
//!
//! An HTTP request engine that looks like a specific browser on the wire.
//!
//! Each request names a fingerprint profile (or supplies a custom one) and
//! the engine reproduces that client's TLS ClientHello and HTTP/2 connection
//! preface, sends the caller's headers in the caller's order, and keeps
//! cookies and connections per session.
//!
//! The engine is driven through a JSON-in, JSON-out C ABI ([`ffi`]) or the
//! equivalent typed Rust API on [`Engine`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mimicnet::{Engine, marshal::RequestInput};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Engine::new();
//!     let response = engine
//!         .request(RequestInput {
//!             session_id: Some("my-session".into()),
//!             tls_client_identifier: Some("chrome_110".into()),
//!             request_url: "https://example.com/".into(),
//!             request_method: "GET".into(),
//!             ..Default::default()
//!         })
//!         .await;
//!     println!("Status: {}", response.status);
//!     engine.release(&response.id).ok();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy and load states
//! - [`emulation`] - Built-in and custom fingerprint profiles
//! - [`socket`] - Connection setup, proxies, TLS handshakes and pooling
//! - [`tls`] - Certificate pinning
//! - [`http`] - HTTP/1.1 and HTTP/2 exchanges, header order, decoding
//! - [`cookies`] - Per-session cookie jar
//! - [`urlrequest`] - Sessions and the request executor
//! - [`marshal`] - Boundary JSON schema and the handle registry
//! - [`ffi`] - C ABI functions
//!
//! ## Logging
//!
//! All diagnostics go through `tracing`. The C ABI installs a subscriber
//! filtered by `MIMICNET_LOG`; Rust callers install their own.

pub mod base;
pub mod client;
pub mod cookies;
pub mod emulation;
pub mod ffi;
pub mod http;
pub mod marshal;
pub mod socket;
pub mod tls;
pub mod urlrequest;

pub use base::neterror::{ErrorKind, NetError};
pub use client::{Engine, EngineBuilder, EngineConfig};
pub use emulation::{CustomTlsClient, Emulation};
pub use marshal::{RequestInput, Response};
