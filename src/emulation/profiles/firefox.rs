//! Firefox browser profiles.
//!
//! Firefox 102 through 110 send the same ClientHello. Their HTTP/2 preface
//! is the distinctive part: six PRIORITY frames building the classic
//! Gecko dependency tree, and request HEADERS hanging off stream 13.

use crate::emulation::{Emulation, EmulationFactory};
use crate::http::h2fingerprint::{
    H2Fingerprint, PriorityFrame, PriorityParam, SettingId, FIREFOX_PSEUDO_ORDER,
};
use crate::socket::tls::ClientHelloSpec;

/// Firefox browser versions for emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Firefox {
    V102,
    V104,
    V105,
    V106,
    V108,
    V110,
}

impl Default for Firefox {
    fn default() -> Self {
        Firefox::V110
    }
}

impl Firefox {
    pub const ALL: &'static [Firefox] = &[
        Firefox::V102,
        Firefox::V104,
        Firefox::V105,
        Firefox::V106,
        Firefox::V108,
        Firefox::V110,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Firefox::V102 => "firefox_102",
            Firefox::V104 => "firefox_104",
            Firefox::V105 => "firefox_105",
            Firefox::V106 => "firefox_106",
            Firefox::V108 => "firefox_108",
            Firefox::V110 => "firefox_110",
        }
    }
}

impl EmulationFactory for Firefox {
    fn emulation(self) -> Emulation {
        Emulation {
            name: self.name().to_string(),
            tls: firefox_client_hello(),
            http2: firefox_h2(),
            permute_extensions: false,
        }
    }
}

fn firefox_client_hello() -> ClientHelloSpec {
    ClientHelloSpec {
        tls_version: 771,
        cipher_suites: vec![
            4865, 4867, 4866, 49195, 49199, 52393, 52392, 49196, 49200, 49162, 49161, 49171,
            49172, 156, 157, 47, 53,
        ],
        extensions: vec![0, 23, 65281, 10, 11, 35, 16, 5, 34, 51, 43, 13, 45, 28, 21],
        supported_groups: vec![29, 23, 24, 25, 256, 257],
        point_formats: vec![0],
        supported_versions: vec![0x0304, 0x0303],
        key_share_curves: vec![29, 23],
        signature_algorithms: vec![
            0x0403, 0x0503, 0x0603, 0x0804, 0x0805, 0x0806, 0x0401, 0x0501, 0x0601, 0x0203,
            0x0201,
        ],
        delegated_credentials: vec![0x0403, 0x0503, 0x0603, 0x0203],
        alpn_protocols: vec!["h2".into(), "http/1.1".into()],
        alps_protocols: Vec::new(),
        cert_compression: Vec::new(),
    }
}

fn firefox_h2() -> H2Fingerprint {
    const fn dep(on: u32, weight: u8) -> PriorityParam {
        PriorityParam::new(on, weight, false)
    }
    H2Fingerprint {
        settings: vec![
            (SettingId::HeaderTableSize, 65_536),
            (SettingId::InitialWindowSize, 131_072),
            (SettingId::MaxFrameSize, 16_384),
        ],
        pseudo_order: FIREFOX_PSEUDO_ORDER,
        connection_flow: 12_517_377,
        priorities: vec![
            PriorityFrame::new(3, dep(0, 200)),
            PriorityFrame::new(5, dep(0, 100)),
            PriorityFrame::new(7, dep(0, 0)),
            PriorityFrame::new(9, dep(7, 0)),
            PriorityFrame::new(11, dep(3, 0)),
            PriorityFrame::new(13, dep(0, 240)),
        ],
        header_priority: Some(dep(13, 41)),
    }
}
