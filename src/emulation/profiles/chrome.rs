//! Chrome browser profiles.
//!
//! Desktop Chrome 103 through 110 share one ClientHello shape. From 106 the
//! SETTINGS frame also carries ENABLE_PUSH=0, and 110 permutes its
//! extensions on every connection.

use crate::emulation::{Emulation, EmulationFactory};
use crate::http::h2fingerprint::{H2Fingerprint, SettingId, CHROME_PSEUDO_ORDER};
use crate::socket::tls::{CertCompression, ClientHelloSpec, GREASE_PLACEHOLDER as GREASE};

/// Chrome browser versions for emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Chrome {
    V103,
    V104,
    V105,
    V106,
    V107,
    V108,
    V109,
    /// Chrome 110 (default profile)
    V110,
}

impl Default for Chrome {
    fn default() -> Self {
        Chrome::V110
    }
}

impl Chrome {
    pub const ALL: &'static [Chrome] = &[
        Chrome::V103,
        Chrome::V104,
        Chrome::V105,
        Chrome::V106,
        Chrome::V107,
        Chrome::V108,
        Chrome::V109,
        Chrome::V110,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Chrome::V103 => "chrome_103",
            Chrome::V104 => "chrome_104",
            Chrome::V105 => "chrome_105",
            Chrome::V106 => "chrome_106",
            Chrome::V107 => "chrome_107",
            Chrome::V108 => "chrome_108",
            Chrome::V109 => "chrome_109",
            Chrome::V110 => "chrome_110",
        }
    }
}

impl EmulationFactory for Chrome {
    fn emulation(self) -> Emulation {
        let enable_push = !matches!(self, Chrome::V103 | Chrome::V104 | Chrome::V105);
        Emulation {
            name: self.name().to_string(),
            tls: chrome_client_hello(),
            http2: chrome_h2(enable_push),
            permute_extensions: self == Chrome::V110,
        }
    }
}

/// ClientHello shared by Chromium-based desktop browsers of this era.
pub(crate) fn chrome_client_hello() -> ClientHelloSpec {
    ClientHelloSpec {
        tls_version: 771,
        cipher_suites: vec![
            GREASE, 4865, 4866, 4867, 49195, 49199, 49196, 49200, 52393, 52392, 49171, 49172, 156,
            157, 47, 53,
        ],
        extensions: vec![
            GREASE, 0, 23, 65281, 10, 11, 35, 16, 5, 13, 18, 51, 45, 43, 27, 17513, GREASE, 21,
        ],
        supported_groups: vec![GREASE, 29, 23, 24],
        point_formats: vec![0],
        supported_versions: vec![GREASE, 0x0304, 0x0303],
        key_share_curves: vec![GREASE, 29],
        signature_algorithms: vec![
            0x0403, 0x0804, 0x0401, 0x0503, 0x0805, 0x0501, 0x0806, 0x0601,
        ],
        delegated_credentials: Vec::new(),
        alpn_protocols: vec!["h2".into(), "http/1.1".into()],
        alps_protocols: vec!["h2".into()],
        cert_compression: vec![CertCompression::Brotli],
    }
}

/// Chromium HTTP/2 preface. `enable_push` adds ENABLE_PUSH=0 after
/// HEADER_TABLE_SIZE.
pub(crate) fn chrome_h2(enable_push: bool) -> H2Fingerprint {
    let mut settings = vec![(SettingId::HeaderTableSize, 65_536)];
    if enable_push {
        settings.push((SettingId::EnablePush, 0));
    }
    settings.extend([
        (SettingId::MaxConcurrentStreams, 1000),
        (SettingId::InitialWindowSize, 6_291_456),
        (SettingId::MaxHeaderListSize, 262_144),
    ]);
    H2Fingerprint {
        settings,
        pseudo_order: CHROME_PSEUDO_ORDER,
        connection_flow: 15_663_105,
        priorities: Vec::new(),
        header_priority: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_akamai_text() {
        assert_eq!(
            Chrome::V110.emulation().http2.akamai_string(),
            "1:65536;2:0;3:1000;4:6291456;6:262144|15663105|0|m,a,s,p"
        );
        assert_eq!(
            Chrome::V103.emulation().http2.akamai_string(),
            "1:65536;3:1000;4:6291456;6:262144|15663105|0|m,a,s,p"
        );
    }

    #[test]
    fn test_chrome_ja3_ignores_grease() {
        let spec = chrome_client_hello();
        assert_eq!(
            spec.ja3_string(),
            "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,\
             0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513-21,29-23-24,0"
        );
        assert!(spec.uses_grease());
    }

    #[test]
    fn test_only_110_permutes() {
        assert!(Chrome::V110.emulation().permute_extensions);
        assert!(!Chrome::V109.emulation().permute_extensions);
    }
}
