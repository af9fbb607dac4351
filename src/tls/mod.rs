//! Certificate pinning for emulated TLS connections.

pub mod pinning;

pub use pinning::{spki_hash, PinSet, PinStore, SpkiHash};
