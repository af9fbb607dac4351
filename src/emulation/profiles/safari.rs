//! Safari profiles for macOS, iPadOS and iOS.

use crate::emulation::{Emulation, EmulationFactory};
use crate::http::h2fingerprint::{H2Fingerprint, SettingId, SAFARI_PSEUDO_ORDER};
use crate::socket::tls::{CertCompression, ClientHelloSpec, GREASE_PLACEHOLDER as GREASE};

/// Safari versions for emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Safari {
    V15_6_1,
    V16_0,
    IPad15_6,
    Ios15_5,
    Ios15_6,
    Ios16_0,
}

impl Default for Safari {
    fn default() -> Self {
        Safari::V16_0
    }
}

impl Safari {
    pub const ALL: &'static [Safari] = &[
        Safari::V15_6_1,
        Safari::V16_0,
        Safari::IPad15_6,
        Safari::Ios15_5,
        Safari::Ios15_6,
        Safari::Ios16_0,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Safari::V15_6_1 => "safari_15_6_1",
            Safari::V16_0 => "safari_16_0",
            Safari::IPad15_6 => "safari_ipad_15_6",
            Safari::Ios15_5 => "safari_ios_15_5",
            Safari::Ios15_6 => "safari_ios_15_6",
            Safari::Ios16_0 => "safari_ios_16_0",
        }
    }

    fn is_mobile(self) -> bool {
        !matches!(self, Safari::V15_6_1 | Safari::V16_0)
    }
}

impl EmulationFactory for Safari {
    fn emulation(self) -> Emulation {
        // Mobile WebKit advertises a smaller stream window.
        let window = if self.is_mobile() { 2_097_152 } else { 4_194_304 };
        Emulation {
            name: self.name().to_string(),
            tls: safari_client_hello(),
            http2: H2Fingerprint {
                settings: vec![
                    (SettingId::InitialWindowSize, window),
                    (SettingId::MaxConcurrentStreams, 100),
                ],
                pseudo_order: SAFARI_PSEUDO_ORDER,
                connection_flow: 10_485_760,
                priorities: Vec::new(),
                header_priority: None,
            },
            permute_extensions: false,
        }
    }
}

fn safari_client_hello() -> ClientHelloSpec {
    ClientHelloSpec {
        tls_version: 771,
        cipher_suites: vec![
            GREASE, 4865, 4866, 4867, 49196, 49195, 52393, 49200, 49199, 52392, 49162, 49161,
            49172, 49171, 157, 156, 53, 47, 49160, 49170, 10,
        ],
        extensions: vec![
            GREASE, 0, 23, 65281, 10, 11, 16, 5, 13, 18, 51, 45, 43, 27, GREASE, 21,
        ],
        supported_groups: vec![GREASE, 29, 23, 24, 25],
        point_formats: vec![0],
        supported_versions: vec![GREASE, 0x0304, 0x0303, 0x0302, 0x0301],
        key_share_curves: vec![GREASE, 29],
        signature_algorithms: vec![
            0x0403, 0x0804, 0x0401, 0x0503, 0x0203, 0x0805, 0x0501, 0x0806, 0x0601, 0x0201,
        ],
        delegated_credentials: Vec::new(),
        alpn_protocols: vec!["h2".into(), "http/1.1".into()],
        alps_protocols: Vec::new(),
        cert_compression: vec![CertCompression::Zlib],
    }
}
