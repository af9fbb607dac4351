//! HTTP layer.
//!
//! - [`transaction`]: one exchange over a pooled or fresh connection
//! - [`streamfactory`]: HTTP/1.1 (hyper) or HTTP/2 (http2) per ALPN
//! - [`h2fingerprint`]: SETTINGS, pseudo-header and priority layout of a profile
//! - [`orderedheaders`]: header list that keeps emission order
//! - [`decompress`]: `Content-Encoding` decoding

pub mod decompress;
pub mod h2fingerprint;
pub mod orderedheaders;
pub mod response;
pub mod streamfactory;
pub mod transaction;

pub use response::HttpResponse;
