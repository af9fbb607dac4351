//! Request execution.
//!
//! - [`request`]: validation of a request payload into a [`URLRequest`]
//! - [`job`]: the redirect loop with cookie merging and persistence
//! - [`context`]: sessions and the session registry

pub mod context;
pub mod job;
pub mod request;

pub use context::{Session, SessionManager};
pub use job::{JobOutcome, URLRequestJob};
pub use request::URLRequest;
