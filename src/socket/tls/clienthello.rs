//! Ordered ClientHello parameters.
//!
//! A [`ClientHelloSpec`] is the resolved, ordered description of the first
//! handshake message for one profile. Everything else in the TLS layer is
//! derived from it: the BoringSSL connector settings, the JA3 text and its
//! digest, and the key under which connectors and resumption sessions are
//! cached.

use super::names::{self, CertCompression};
use crate::base::neterror::NetError;
use std::collections::HashSet;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientHelloSpec {
    /// Legacy record version as written in the first JA3 field.
    pub tls_version: u16,
    pub cipher_suites: Vec<u16>,
    pub extensions: Vec<u16>,
    pub supported_groups: Vec<u16>,
    pub point_formats: Vec<u8>,
    pub supported_versions: Vec<u16>,
    pub key_share_curves: Vec<u16>,
    pub signature_algorithms: Vec<u16>,
    pub delegated_credentials: Vec<u16>,
    pub alpn_protocols: Vec<String>,
    pub alps_protocols: Vec<String>,
    pub cert_compression: Vec<CertCompression>,
}

impl ClientHelloSpec {
    /// Parse the five JA3 fields into a spec with the remaining lists empty.
    ///
    /// `771,4865-4866,0-23-65281,29-23,0` yields ciphers, extension order,
    /// groups and point formats in the order given.
    pub fn from_ja3(ja3: &str) -> Result<Self, NetError> {
        let fields: Vec<&str> = ja3.trim().split(',').collect();
        if fields.len() != 5 {
            return Err(NetError::InvalidProfile(format!(
                "ja3 string must have 5 fields, got {}",
                fields.len()
            )));
        }

        let tls_version: u16 = fields[0]
            .parse()
            .map_err(|_| NetError::InvalidProfile(format!("bad ja3 version: {}", fields[0])))?;
        if !names::is_tls_version(tls_version) {
            return Err(NetError::InvalidProfile(format!(
                "unknown tls version in ja3: {}",
                tls_version
            )));
        }

        let cipher_suites = parse_id_list(fields[1], "cipher")?;
        if cipher_suites.is_empty() {
            return Err(NetError::InvalidProfile("ja3 has no cipher suites".into()));
        }
        let extensions = parse_id_list(fields[2], "extension")?;
        let supported_groups = parse_id_list(fields[3], "curve")?;

        let mut point_formats = Vec::new();
        for part in fields[4].split('-').filter(|p| !p.is_empty()) {
            let pf: u8 = part
                .parse()
                .map_err(|_| NetError::InvalidProfile(format!("bad point format: {}", part)))?;
            point_formats.push(pf);
        }

        Ok(Self {
            tls_version,
            cipher_suites,
            extensions,
            supported_groups,
            point_formats,
            supported_versions: Vec::new(),
            key_share_curves: Vec::new(),
            signature_algorithms: Vec::new(),
            delegated_credentials: Vec::new(),
            alpn_protocols: Vec::new(),
            alps_protocols: Vec::new(),
            cert_compression: Vec::new(),
        })
    }

    /// Reject duplicate non-GREASE entries in every ordered list.
    pub fn validate(&self) -> Result<(), NetError> {
        check_unique(&self.cipher_suites, "cipher suites")?;
        check_unique(&self.extensions, "extensions")?;
        check_unique(&self.supported_groups, "supported groups")?;
        check_unique(&self.supported_versions, "supported versions")?;
        check_unique(&self.key_share_curves, "key share curves")?;
        check_unique(&self.signature_algorithms, "signature algorithms")?;
        check_unique(&self.delegated_credentials, "delegated credentials")?;

        let mut seen = HashSet::new();
        for alpn in &self.alpn_protocols {
            if alpn.is_empty() || alpn.len() > 255 {
                return Err(NetError::InvalidProfile(format!("bad alpn protocol: {:?}", alpn)));
            }
            if !seen.insert(alpn) {
                return Err(NetError::InvalidProfile(format!("duplicate alpn protocol: {}", alpn)));
            }
        }
        Ok(())
    }

    pub fn has_extension(&self, id: u16) -> bool {
        self.extensions.contains(&id)
    }

    /// True when any ordered list carries a GREASE placeholder.
    pub fn uses_grease(&self) -> bool {
        [
            &self.cipher_suites,
            &self.extensions,
            &self.supported_groups,
            &self.supported_versions,
            &self.key_share_curves,
        ]
        .iter()
        .any(|list| list.iter().any(|v| names::is_grease(*v)))
    }

    /// JA3 text with GREASE values removed.
    pub fn ja3_string(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.tls_version,
            join_ids(&self.cipher_suites),
            join_ids(&self.extensions),
            join_ids(&self.supported_groups),
            self.point_formats
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join("-"),
        )
    }

    /// Lowercase hex MD5 of [`ja3_string`](Self::ja3_string).
    pub fn ja3_hash(&self) -> Result<String, NetError> {
        use boring::hash::{hash, MessageDigest};

        let digest = hash(MessageDigest::md5(), self.ja3_string().as_bytes())
            .map_err(|e| NetError::Internal(format!("md5: {}", e)))?;
        let mut hex = String::with_capacity(32);
        for byte in digest.iter() {
            let _ = write!(hex, "{:02x}", byte);
        }
        Ok(hex)
    }

    /// Every ordered field, GREASE positions included.
    ///
    /// Two specs with the same members in a different order produce
    /// different keys; connectors and pooled connections are keyed by it.
    pub fn fingerprint_key(&self) -> String {
        let grease_aware = |ids: &[u16]| {
            ids.iter()
                .map(|v| {
                    if names::is_grease(*v) {
                        "G".to_string()
                    } else {
                        v.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join("-")
        };
        let compression = self
            .cert_compression
            .iter()
            .map(|c| c.id().to_string())
            .collect::<Vec<_>>()
            .join("-");

        format!(
            "{}|{}|{}|{}|{:?}|{}|{}|{}|{}|{}|{}|{}",
            self.tls_version,
            grease_aware(&self.cipher_suites),
            grease_aware(&self.extensions),
            grease_aware(&self.supported_groups),
            self.point_formats,
            grease_aware(&self.supported_versions),
            grease_aware(&self.key_share_curves),
            grease_aware(&self.signature_algorithms),
            grease_aware(&self.delegated_credentials),
            self.alpn_protocols.join(","),
            self.alps_protocols.join(","),
            compression,
        )
    }

    /// Lowest and highest TLS version offered.
    pub fn version_range(&self) -> (u16, u16) {
        let offered: Vec<u16> = self
            .supported_versions
            .iter()
            .copied()
            .filter(|v| names::is_tls_version(*v))
            .collect();
        match (offered.iter().min(), offered.iter().max()) {
            (Some(min), Some(max)) => (*min, *max),
            _ => (self.tls_version.min(0x0303), self.tls_version),
        }
    }

    /// Colon-separated BoringSSL cipher string for the pre-1.3 suites.
    pub fn cipher_list(&self) -> Result<Option<String>, NetError> {
        let names: Vec<&str> = self
            .cipher_suites
            .iter()
            .filter(|id| !names::is_grease(**id) && !names::is_tls13_cipher(**id))
            .filter_map(|id| names::cipher_boring_name(*id))
            .collect();

        if names.is_empty() {
            let (min, _) = self.version_range();
            if min < 0x0304 {
                return Err(NetError::NegotiationSetupFailed(
                    "no usable TLS 1.2 cipher suites in profile".into(),
                ));
            }
            return Ok(None);
        }
        Ok(Some(names.join(":")))
    }

    pub fn curves_list(&self) -> Result<String, NetError> {
        let names: Vec<&str> = self
            .supported_groups
            .iter()
            .filter_map(|id| names::curve_boring_name(*id))
            .collect();
        if names.is_empty() {
            return Err(NetError::NegotiationSetupFailed(
                "no supported groups usable by the tls stack".into(),
            ));
        }
        Ok(names.join(":"))
    }

    pub fn sigalgs_list(&self) -> Option<String> {
        let names: Vec<&str> = self
            .signature_algorithms
            .iter()
            .filter_map(|id| names::sigalg_boring_name(*id))
            .collect();
        (!names.is_empty()).then(|| names.join(":"))
    }

    /// ALPN protocols in length-prefixed wire format.
    pub fn alpn_wire(&self) -> Result<Vec<u8>, NetError> {
        let mut wire = Vec::new();
        for proto in &self.alpn_protocols {
            let len = u8::try_from(proto.len()).map_err(|_| {
                NetError::NegotiationSetupFailed(format!("alpn protocol too long: {}", proto))
            })?;
            wire.push(len);
            wire.extend_from_slice(proto.as_bytes());
        }
        Ok(wire)
    }

    pub fn offers_h2(&self) -> bool {
        self.alpn_protocols.iter().any(|p| p == "h2")
    }

    /// Drop `h2` from ALPN so the server negotiates HTTP/1.1.
    pub fn without_h2(&self) -> Self {
        let mut spec = self.clone();
        spec.alpn_protocols.retain(|p| p != "h2");
        spec.alps_protocols.retain(|p| p != "h2");
        if spec.alpn_protocols.is_empty() {
            spec.alpn_protocols.push("http/1.1".into());
        }
        spec
    }
}

fn parse_id_list(field: &str, what: &str) -> Result<Vec<u16>, NetError> {
    let mut ids = Vec::new();
    for part in field.split('-').filter(|p| !p.is_empty()) {
        let id: u16 = part
            .trim()
            .parse()
            .map_err(|_| NetError::InvalidProfile(format!("bad {} id: {}", what, part)))?;
        ids.push(id);
    }
    Ok(ids)
}

fn check_unique(ids: &[u16], what: &str) -> Result<(), NetError> {
    let mut seen = HashSet::new();
    for id in ids.iter().filter(|id| !names::is_grease(**id)) {
        if !seen.insert(*id) {
            return Err(NetError::InvalidProfile(format!("duplicate entry {} in {}", id, what)));
        }
    }
    Ok(())
}

fn join_ids(ids: &[u16]) -> String {
    ids.iter()
        .filter(|v| !names::is_grease(**v))
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
