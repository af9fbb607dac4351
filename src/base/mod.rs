//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): every failure the engine can report
//! - [`ErrorKind`](neterror::ErrorKind): the caller-facing error taxonomy
//! - [`LoadState`](loadstate::LoadState): request executor states

pub mod context;
pub mod loadstate;
pub mod neterror;

#[cfg(test)]
mod tests;
