//! OkHttp 4 on Android.
//!
//! The Android release only changes the platform TLS defaults between 10 and
//! 13, and not in a way visible in the ClientHello, so all four share one
//! spec.

use crate::emulation::{Emulation, EmulationFactory};
use crate::http::h2fingerprint::{H2Fingerprint, PriorityParam, SettingId, FIREFOX_PSEUDO_ORDER};
use crate::socket::tls::ClientHelloSpec;

/// OkHttp 4 builds for emulation, by Android release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum OkHttp {
    Android10,
    Android11,
    Android12,
    Android13,
}

impl Default for OkHttp {
    fn default() -> Self {
        OkHttp::Android13
    }
}

impl OkHttp {
    pub const ALL: &'static [OkHttp] = &[
        OkHttp::Android10,
        OkHttp::Android11,
        OkHttp::Android12,
        OkHttp::Android13,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OkHttp::Android10 => "okhttp4_android_10",
            OkHttp::Android11 => "okhttp4_android_11",
            OkHttp::Android12 => "okhttp4_android_12",
            OkHttp::Android13 => "okhttp4_android_13",
        }
    }
}

impl EmulationFactory for OkHttp {
    fn emulation(self) -> Emulation {
        Emulation {
            name: self.name().to_string(),
            tls: ClientHelloSpec {
                tls_version: 771,
                cipher_suites: vec![
                    4865, 4866, 4867, 49195, 49196, 52393, 49199, 49200, 52392, 49171, 49172, 156,
                    157, 47, 53,
                ],
                extensions: vec![0, 23, 65281, 10, 11, 35, 16, 5, 13, 51, 45, 43, 21],
                supported_groups: vec![29, 23, 24],
                point_formats: vec![0],
                supported_versions: vec![0x0304, 0x0303],
                key_share_curves: vec![29],
                signature_algorithms: vec![
                    0x0403, 0x0804, 0x0401, 0x0503, 0x0805, 0x0501, 0x0806, 0x0601, 0x0201,
                ],
                delegated_credentials: Vec::new(),
                alpn_protocols: vec!["h2".into(), "http/1.1".into()],
                alps_protocols: Vec::new(),
                cert_compression: Vec::new(),
            },
            http2: H2Fingerprint {
                settings: vec![(SettingId::InitialWindowSize, 16_777_216)],
                pseudo_order: FIREFOX_PSEUDO_ORDER,
                connection_flow: 16_711_681,
                priorities: Vec::new(),
                // OkHttp sets the PRIORITY flag with an all-zero block.
                header_priority: Some(PriorityParam::new(0, 0, false)),
            },
            permute_extensions: false,
        }
    }
}
