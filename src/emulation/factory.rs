//! Emulation factory and core types.

use crate::base::neterror::NetError;
use crate::emulation::profiles::{Chrome, Firefox, OkHttp, Opera, Safari};
use crate::http::h2fingerprint::H2Fingerprint;
use crate::socket::tls::ClientHelloSpec;

/// Factory trait for creating emulation configurations.
///
/// Implemented by the browser enums in [`profiles`](crate::emulation::profiles)
/// and by [`Emulation`] itself.
pub trait EmulationFactory {
    /// Create an [`Emulation`] from this factory.
    fn emulation(self) -> Emulation;
}

/// A resolved fingerprint profile: everything that shapes the wire bytes
/// of a connection, and nothing that varies per request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Emulation {
    /// Registry name, or `custom`.
    pub name: String,
    pub tls: ClientHelloSpec,
    pub http2: H2Fingerprint,
    /// Ask BoringSSL to permute extensions on every handshake.
    pub permute_extensions: bool,
}

impl Emulation {
    #[inline]
    pub fn builder() -> EmulationBuilder {
        EmulationBuilder::default()
    }

    /// Key under which connections made with this profile may be shared.
    pub fn pool_key(&self) -> String {
        format!(
            "{}#{}#{:?}#{}",
            self.tls.fingerprint_key(),
            self.http2.akamai_string(),
            self.http2.header_priority,
            u8::from(self.permute_extensions)
        )
    }
}

/// Builder for [`Emulation`] configuration.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct EmulationBuilder {
    name: Option<String>,
    tls: Option<ClientHelloSpec>,
    http2: Option<H2Fingerprint>,
    permute_extensions: bool,
}

impl EmulationBuilder {
    #[inline]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn tls(mut self, spec: ClientHelloSpec) -> Self {
        self.tls = Some(spec);
        self
    }

    #[inline]
    pub fn http2(mut self, fp: H2Fingerprint) -> Self {
        self.http2 = Some(fp);
        self
    }

    #[inline]
    pub fn permute_extensions(mut self, enabled: bool) -> Self {
        self.permute_extensions = enabled;
        self
    }

    /// Build the Emulation. The ClientHello is required; HTTP/2 falls back
    /// to RFC defaults.
    pub fn build(self) -> Result<Emulation, NetError> {
        let tls = self
            .tls
            .ok_or_else(|| NetError::InvalidProfile("profile has no tls parameters".into()))?;
        tls.validate()?;
        Ok(Emulation {
            name: self.name.unwrap_or_else(|| "custom".to_string()),
            tls,
            http2: self.http2.unwrap_or_default(),
            permute_extensions: self.permute_extensions,
        })
    }
}

impl EmulationFactory for Emulation {
    #[inline]
    fn emulation(self) -> Emulation {
        self
    }
}

/// Every built-in identifier, in registry order.
pub fn profile_names() -> impl Iterator<Item = &'static str> {
    Chrome::ALL
        .iter()
        .map(|p| p.name())
        .chain(Safari::ALL.iter().map(|p| p.name()))
        .chain(Firefox::ALL.iter().map(|p| p.name()))
        .chain(Opera::ALL.iter().map(|p| p.name()))
        .chain(OkHttp::ALL.iter().map(|p| p.name()))
}

/// Look up a built-in profile by identifier, ignoring ASCII case.
pub fn lookup(identifier: &str) -> Option<Emulation> {
    let id = identifier.trim().to_ascii_lowercase();

    fn find<P: Copy + EmulationFactory>(
        all: &[P],
        name: impl Fn(P) -> &'static str,
        id: &str,
    ) -> Option<Emulation> {
        all.iter().copied().find(|p| name(*p) == id).map(P::emulation)
    }

    find(Chrome::ALL, Chrome::name, &id)
        .or_else(|| find(Safari::ALL, Safari::name, &id))
        .or_else(|| find(Firefox::ALL, Firefox::name, &id))
        .or_else(|| find(Opera::ALL, Opera::name, &id))
        .or_else(|| find(OkHttp::ALL, OkHttp::name, &id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_name_resolves_to_itself() {
        let mut seen = HashSet::new();
        for name in profile_names() {
            assert!(seen.insert(name), "duplicate profile name {}", name);
            let emulation = lookup(name).unwrap();
            assert_eq!(emulation.name, name);
            emulation.tls.validate().unwrap();
        }
        assert_eq!(seen.len(), 27);
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(lookup("Chrome_103").unwrap().name, "chrome_103");
        assert_eq!(lookup(" SAFARI_IOS_16_0 ").unwrap().name, "safari_ios_16_0");
        assert!(lookup("netscape_4").is_none());
    }

    #[test]
    fn test_builder_requires_tls() {
        let err = Emulation::builder().build().unwrap_err();
        assert!(matches!(err, NetError::InvalidProfile(_)));

        let spec = ClientHelloSpec::from_ja3("771,4865,0-10,29,0").unwrap();
        let emulation = Emulation::builder().tls(spec).build().unwrap();
        assert_eq!(emulation.name, "custom");
        assert!(emulation.http2.settings.is_empty());
    }

    #[test]
    fn test_pool_key_separates_profiles() {
        let a = lookup("chrome_103").unwrap();
        let b = lookup("firefox_110").unwrap();
        assert_ne!(a.pool_key(), b.pool_key());
        assert_eq!(a.pool_key(), lookup("chrome_103").unwrap().pool_key());

        let mut c = a.clone();
        c.http2.header_priority = Some(crate::http::h2fingerprint::PriorityParam::new(0, 255, true));
        assert_ne!(a.pool_key(), c.pool_key());
    }
}
