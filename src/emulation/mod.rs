//! Fingerprint profile resolution.
//!
//! An [`Emulation`] couples the ordered ClientHello parameters with the
//! HTTP/2 preface of one client. Profiles come from the built-in registry
//! ([`profiles`]) or from a caller-supplied [`CustomTlsClient`].

mod custom;
mod factory;
pub mod profiles;

pub use custom::{CustomTlsClient, PriorityFrame, PriorityParam};
pub use factory::{lookup, profile_names, Emulation, EmulationBuilder, EmulationFactory};

use crate::base::neterror::NetError;

/// Identifier used when a request names no profile.
pub const DEFAULT_PROFILE: &str = "chrome_110";

/// Pick the profile for one request.
///
/// A custom profile wins over an identifier. With neither, `default` is
/// looked up. Unknown identifiers fail with `UnknownProfile`.
pub fn resolve(
    identifier: Option<&str>,
    custom: Option<&CustomTlsClient>,
    default: &str,
) -> Result<Emulation, NetError> {
    if let Some(custom) = custom {
        return custom.to_emulation();
    }
    let name = identifier
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(default);
    lookup(name).ok_or_else(|| NetError::UnknownProfile(name.to_string()))
}
