//! Caller-supplied fingerprint profiles (`customTlsClient`).
//!
//! Anything the caller leaves out comes from a fixed baseline, never from a
//! named profile, so a custom profile cannot silently inherit half of a
//! browser's fingerprint.

use crate::base::neterror::NetError;
use crate::emulation::Emulation;
use crate::http::h2fingerprint::{parse_pseudo_order, setting_code, setting_from_name, H2Fingerprint};
pub use crate::http::h2fingerprint::{PriorityFrame, PriorityParam};
use crate::socket::tls::names;
use crate::socket::tls::{CertCompression, ClientHelloSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// The `customTlsClient` object of a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomTlsClient {
    pub ja3_string: String,
    pub supported_signature_algorithms: Option<Vec<String>>,
    pub supported_delegated_credentials_algorithms: Option<Vec<String>>,
    pub supported_versions: Option<Vec<String>>,
    pub key_share_curves: Option<Vec<String>>,
    pub cert_compression_algo: Option<String>,
    pub alpn_protocols: Option<Vec<String>>,
    pub alps_protocols: Option<Vec<String>>,
    pub h2_settings: Option<BTreeMap<String, u32>>,
    pub h2_settings_order: Option<Vec<String>>,
    pub pseudo_header_order: Option<Vec<String>>,
    pub connection_flow: Option<u32>,
    pub priority_frames: Option<Vec<PriorityFrame>>,
    pub header_priority: Option<PriorityParam>,
}

/// Values used for every field a custom profile omits.
mod baseline {
    pub const SUPPORTED_VERSIONS: [u16; 2] = [0x0304, 0x0303];
    pub const KEY_SHARE_CURVES: [u16; 1] = [29];
    pub const SIGNATURE_ALGORITHMS: [u16; 8] = [
        0x0403, 0x0804, 0x0401, 0x0503, 0x0805, 0x0501, 0x0806, 0x0601,
    ];
    pub const ALPN: [&str; 2] = ["h2", "http/1.1"];
}

fn invalid(msg: String) -> NetError {
    NetError::InvalidProfile(msg)
}

fn map_names(
    names: Option<&Vec<String>>,
    what: &str,
    lookup: fn(&str) -> Option<u16>,
    fallback: &[u16],
) -> Result<Vec<u16>, NetError> {
    match names {
        None => Ok(fallback.to_vec()),
        Some(list) => list
            .iter()
            .map(|n| lookup(n).ok_or_else(|| invalid(format!("unknown {}: {}", what, n))))
            .collect(),
    }
}

impl CustomTlsClient {
    pub fn client_hello(&self) -> Result<ClientHelloSpec, NetError> {
        let mut spec = ClientHelloSpec::from_ja3(&self.ja3_string)?;
        for id in spec.extensions.iter().filter(|id| !names::is_known_extension(**id)) {
            debug!(extension = id, "extension has no handshake support and is not sent");
        }

        spec.supported_versions = map_names(
            self.supported_versions.as_ref(),
            "tls version",
            names::version_from_name,
            &baseline::SUPPORTED_VERSIONS,
        )?;
        spec.key_share_curves = map_names(
            self.key_share_curves.as_ref(),
            "key share curve",
            names::curve_from_name,
            &baseline::KEY_SHARE_CURVES,
        )?;
        spec.signature_algorithms = map_names(
            self.supported_signature_algorithms.as_ref(),
            "signature algorithm",
            names::sigalg_from_name,
            &baseline::SIGNATURE_ALGORITHMS,
        )?;
        spec.delegated_credentials = map_names(
            self.supported_delegated_credentials_algorithms.as_ref(),
            "delegated credential algorithm",
            names::sigalg_from_name,
            &[],
        )?;

        spec.alpn_protocols = match &self.alpn_protocols {
            Some(list) => list.clone(),
            None => baseline::ALPN.iter().map(|s| s.to_string()).collect(),
        };
        spec.alps_protocols = self.alps_protocols.clone().unwrap_or_default();

        spec.cert_compression = match self.cert_compression_algo.as_deref() {
            None | Some("") => Vec::new(),
            Some(name) => vec![CertCompression::from_name(name)
                .ok_or_else(|| invalid(format!("unknown cert compression: {}", name)))?],
        };

        spec.validate()?;
        Ok(spec)
    }

    pub fn http2(&self) -> Result<H2Fingerprint, NetError> {
        let base = H2Fingerprint::default();
        let mut builder = H2Fingerprint::builder()
            .connection_flow(self.connection_flow.unwrap_or(base.connection_flow));

        let settings = self.h2_settings.clone().unwrap_or_default();
        let ordered: Vec<String> = match &self.h2_settings_order {
            Some(order) => {
                let listed: HashSet<&String> = order.iter().collect();
                if listed.len() != order.len()
                    || listed.len() != settings.len()
                    || !settings.keys().all(|k| listed.contains(k))
                {
                    return Err(invalid(
                        "h2SettingsOrder must list exactly the keys of h2Settings".into(),
                    ));
                }
                order.clone()
            }
            None => {
                // Without an explicit order, settings go out in identifier order.
                let mut keys: Vec<String> = settings.keys().cloned().collect();
                keys.sort_by_key(|k| setting_from_name(k).map(setting_code));
                keys
            }
        };
        for name in &ordered {
            let id = setting_from_name(name)
                .ok_or_else(|| invalid(format!("unknown h2 setting: {}", name)))?;
            let value = settings
                .get(name)
                .copied()
                .ok_or_else(|| invalid(format!("no value for h2 setting {}", name)))?;
            builder = builder.setting(id, value);
        }

        builder = builder.pseudo_order(match &self.pseudo_header_order {
            Some(order) => parse_pseudo_order(order)?,
            None => base.pseudo_order,
        });

        for frame in self.priority_frames.iter().flatten() {
            builder = builder.priority(frame.stream_id, frame.priority_param);
        }
        if let Some(param) = self.header_priority {
            builder = builder.header_priority(param);
        }
        builder.build()
    }

    pub fn to_emulation(&self) -> Result<Emulation, NetError> {
        Emulation::builder()
            .name("custom")
            .tls(self.client_hello()?)
            .http2(self.http2()?)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CustomTlsClient {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_full_custom_profile() {
        let custom = parse(
            r#"{
                "ja3String": "771,4865-4866-4867-49195,0-23-65281-10-11-35-16-5-13-51-45-43-21,29-23-24,0",
                "h2Settings": {"HEADER_TABLE_SIZE": 65536, "INITIAL_WINDOW_SIZE": 6291456, "MAX_HEADER_LIST_SIZE": 262144},
                "h2SettingsOrder": ["INITIAL_WINDOW_SIZE", "HEADER_TABLE_SIZE", "MAX_HEADER_LIST_SIZE"],
                "supportedSignatureAlgorithms": ["ECDSAWithP256AndSHA256", "PSSWithSHA256"],
                "supportedVersions": ["GREASE", "1.3", "1.2"],
                "keyShareCurves": ["GREASE", "X25519"],
                "certCompressionAlgo": "brotli",
                "pseudoHeaderOrder": [":method", ":path", ":authority", ":scheme"],
                "connectionFlow": 15663105,
                "priorityFrames": [{"streamID": 3, "priorityParam": {"streamDep": 0, "exclusive": false, "weight": 200}}],
                "headerPriority": {"streamDep": 3, "exclusive": true, "weight": 255}
            }"#,
        );
        let e = custom.to_emulation().unwrap();
        assert_eq!(e.name, "custom");
        assert_eq!(e.tls.signature_algorithms, vec![0x0403, 0x0804]);
        assert_eq!(e.tls.cert_compression, vec![CertCompression::Brotli]);
        assert_eq!(e.tls.alpn_protocols, vec!["h2", "http/1.1"]);
        assert_eq!(
            e.http2.akamai_string(),
            "4:6291456;1:65536;6:262144|15663105|3:0:0:201|m,p,a,s"
        );
        assert_eq!(e.http2.header_priority, Some(PriorityParam::new(3, 255, true)));
    }

    #[test]
    fn test_omitted_fields_use_baseline() {
        let e = parse(r#"{"ja3String": "771,4865,0-10-11-16,29,0"}"#)
            .to_emulation()
            .unwrap();
        assert_eq!(e.tls.supported_versions, vec![0x0304, 0x0303]);
        assert!(e.http2.settings.is_empty());
        assert_eq!(e.http2.connection_flow, 0);
        assert!(e.http2.priorities.is_empty());
    }

    #[test]
    fn test_settings_without_order_sorted_by_id() {
        let e = parse(
            r#"{"ja3String": "771,4865,0,29,0",
                "h2Settings": {"MAX_FRAME_SIZE": 16384, "ENABLE_PUSH": 0}}"#,
        )
        .to_emulation()
        .unwrap();
        assert_eq!(e.http2.akamai_string(), "2:0;5:16384|0|0|m,a,s,p");
    }

    #[test]
    fn test_invalid_custom_profiles() {
        let cases = [
            r#"{"ja3String": "771,4865,0"}"#,
            r#"{"ja3String": "771,4865-4865,0,29,0"}"#,
            r#"{"ja3String": "771,4865,0,29,0", "keyShareCurves": ["P999"]}"#,
            r#"{"ja3String": "771,4865,0,29,0", "h2Settings": {"BOGUS": 1}}"#,
            r#"{"ja3String": "771,4865,0,29,0", "h2Settings": {"ENABLE_PUSH": 0}, "h2SettingsOrder": ["ENABLE_PUSH", "MAX_FRAME_SIZE"]}"#,
            r#"{"ja3String": "771,4865,0,29,0", "h2Settings": {"MAX_FRAME_SIZE": 100}}"#,
            r#"{"ja3String": "771,4865,0,29,0", "pseudoHeaderOrder": [":method", ":method", ":path", ":scheme"]}"#,
            r#"{"ja3String": "771,4865,0,29,0", "priorityFrames": [{"streamID": 0, "priorityParam": {}}]}"#,
            r#"{"ja3String": "771,4865,0,29,0", "certCompressionAlgo": "lzma"}"#,
        ];
        for case in cases {
            let err = parse(case).to_emulation().unwrap_err();
            assert!(matches!(err, NetError::InvalidProfile(_)), "{}: {:?}", case, err);
        }
    }
}
