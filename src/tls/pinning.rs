//! Certificate pinning.
//!
//! Hosts map to sets of base64 SHA-256 SPKI hashes. A host written as
//! `*.example.com` also covers every subdomain of `example.com`. A
//! connection is accepted when any certificate in the peer chain matches
//! any pin for the host.

use crate::base::neterror::NetError;
use base64::Engine as _;
use boring::x509::X509Ref;
use dashmap::DashMap;
use std::collections::HashMap;

/// SHA-256 hash of a certificate's SPKI (Subject Public Key Info).
pub type SpkiHash = [u8; 32];

/// Pins for one host entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinSet {
    pub domain: String,
    pub include_subdomains: bool,
    pub pins: Vec<SpkiHash>,
}

impl PinSet {
    /// Parse a host pattern; a leading `*.` turns on subdomain matching.
    pub fn new(pattern: &str) -> Self {
        let lower = pattern.trim().to_ascii_lowercase();
        match lower.strip_prefix("*.") {
            Some(domain) => Self {
                domain: domain.to_string(),
                include_subdomains: true,
                pins: Vec::new(),
            },
            None => Self {
                domain: lower,
                include_subdomains: false,
                pins: Vec::new(),
            },
        }
    }

    /// Add a pin (base64-encoded SHA-256 hash).
    pub fn add_pin_base64(&mut self, pin_base64: &str) -> Result<(), NetError> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(pin_base64.trim())
            .map_err(|e| NetError::InvalidPayload(format!("bad pin {}: {}", pin_base64, e)))?;

        let hash: SpkiHash = decoded.try_into().map_err(|_| {
            NetError::InvalidPayload(format!("pin {} is not a sha256 hash", pin_base64))
        })?;
        self.pins.push(hash);
        Ok(())
    }

    pub fn add_pin(&mut self, hash: SpkiHash) {
        self.pins.push(hash);
    }

    pub fn matches(&self, cert_hashes: &[SpkiHash]) -> bool {
        cert_hashes.iter().any(|h| self.pins.contains(h))
    }
}

/// Thread-safe store for certificate pins.
#[derive(Debug, Default)]
pub struct PinStore {
    pins: DashMap<String, PinSet>,
}

impl PinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from the `certificatePinningHosts` request map.
    pub fn from_hosts(hosts: &HashMap<String, Vec<String>>) -> Result<Self, NetError> {
        let store = Self::new();
        store.replace_all(hosts)?;
        Ok(store)
    }

    /// Replace every entry with the given host map.
    pub fn replace_all(&self, hosts: &HashMap<String, Vec<String>>) -> Result<(), NetError> {
        let mut parsed = Vec::with_capacity(hosts.len());
        for (pattern, pins) in hosts {
            let mut set = PinSet::new(pattern);
            for pin in pins {
                set.add_pin_base64(pin)?;
            }
            parsed.push(set);
        }
        self.pins.clear();
        for set in parsed {
            self.add(set);
        }
        Ok(())
    }

    /// Add or replace a pin set.
    pub fn add(&self, pin_set: PinSet) {
        self.pins.insert(pin_set.domain.clone(), pin_set);
    }

    /// Returns Ok if the pins match or no pins exist for this host.
    pub fn check(&self, host: &str, cert_hashes: &[SpkiHash]) -> Result<(), NetError> {
        let host_lower = host.to_ascii_lowercase();

        if let Some(pin_set) = self.pins.get(&host_lower) {
            return Self::verify(&pin_set, &host_lower, cert_hashes);
        }

        let parts: Vec<&str> = host_lower.split('.').collect();
        for i in 1..parts.len() {
            let parent = parts[i..].join(".");
            if let Some(pin_set) = self.pins.get(&parent) {
                if pin_set.include_subdomains {
                    return Self::verify(&pin_set, &host_lower, cert_hashes);
                }
            }
        }

        Ok(())
    }

    fn verify(pin_set: &PinSet, host: &str, cert_hashes: &[SpkiHash]) -> Result<(), NetError> {
        if pin_set.matches(cert_hashes) {
            Ok(())
        } else {
            Err(NetError::SslPinnedKeyNotInCertChain(host.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

/// SHA-256 over the certificate's DER-encoded public key.
pub fn spki_hash(cert: &X509Ref) -> Result<SpkiHash, NetError> {
    use boring::hash::{hash, MessageDigest};

    let pubkey = cert
        .public_key()
        .map_err(|e| NetError::SslProtocolError(format!("peer public key: {}", e)))?;
    let spki_der = pubkey
        .public_key_to_der()
        .map_err(|e| NetError::SslProtocolError(format!("peer spki: {}", e)))?;
    let digest = hash(MessageDigest::sha256(), &spki_der)
        .map_err(|e| NetError::SslProtocolError(format!("spki hash: {}", e)))?;

    let mut result = [0u8; 32];
    result.copy_from_slice(&digest);
    Ok(result)
}
