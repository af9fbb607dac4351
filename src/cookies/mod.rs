//! Per-session cookie storage.
//!
//! | Chromium (C++) | mimicnet (Rust) | Responsibility |
//! |----------------|-----------------|----------------|
//! | `net::CookieMonster` | [`CookieMonster`](monster::CookieMonster) | Cookie jar with eviction |
//! | `net::CanonicalCookie` | [`CanonicalCookie`](canonical_cookie::CanonicalCookie) | Single cookie representation |
//! | `net::registry_controlled_domains` | [`psl`] | Domain attribute validation |

pub mod canonical_cookie;
pub mod monster;
pub mod psl;

pub use canonical_cookie::{CanonicalCookie, CookieParts, SameSite};
pub use monster::CookieMonster;
