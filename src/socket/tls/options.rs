use super::clienthello::ClientHelloSpec;
use super::names::ext;
use crate::base::neterror::NetError;
use boring::ssl::{SslConnectorBuilder, SslVerifyMode, SslVersion};

/// Connector-level settings derived from a [`ClientHelloSpec`].
///
/// BoringSSL fixes the relative order of its own extensions. Cipher, group,
/// signature-algorithm and ALPN order are honoured exactly; GREASE and
/// extension permutation are toggled as whole features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub min_tls_version: u16,
    pub max_tls_version: u16,
    pub cipher_list: Option<String>,
    pub curves_list: String,
    pub sigalgs_list: Option<String>,
    pub alpn_wire: Vec<u8>,
    pub grease_enabled: bool,
    pub permute_extensions: bool,
    pub enable_ocsp_stapling: bool,
    pub enable_signed_cert_timestamps: bool,
    pub session_ticket: bool,
    pub verify_peer: bool,
}

impl TlsOptions {
    pub fn from_client_hello(
        spec: &ClientHelloSpec,
        permute_extensions: bool,
        insecure_skip_verify: bool,
    ) -> Result<Self, NetError> {
        let (min_tls_version, max_tls_version) = spec.version_range();
        Ok(Self {
            min_tls_version,
            max_tls_version,
            cipher_list: spec.cipher_list()?,
            curves_list: spec.curves_list()?,
            sigalgs_list: spec.sigalgs_list(),
            alpn_wire: spec.alpn_wire()?,
            grease_enabled: spec.uses_grease(),
            permute_extensions,
            enable_ocsp_stapling: spec.has_extension(ext::STATUS_REQUEST),
            enable_signed_cert_timestamps: spec.has_extension(ext::SIGNED_CERT_TIMESTAMP),
            session_ticket: spec.has_extension(ext::SESSION_TICKET),
            verify_peer: !insecure_skip_verify,
        })
    }

    /// Apply this configuration to an SSL connector builder.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), NetError> {
        builder
            .set_min_proto_version(Some(ssl_version(self.min_tls_version)?))
            .map_err(|e| setup_failed("min version", e))?;
        builder
            .set_max_proto_version(Some(ssl_version(self.max_tls_version)?))
            .map_err(|e| setup_failed("max version", e))?;

        if let Some(ciphers) = &self.cipher_list {
            builder
                .set_cipher_list(ciphers)
                .map_err(|e| setup_failed("cipher list", e))?;
        }

        builder
            .set_curves_list(&self.curves_list)
            .map_err(|e| setup_failed("curves", e))?;

        if let Some(sigalgs) = &self.sigalgs_list {
            builder
                .set_sigalgs_list(sigalgs)
                .map_err(|e| setup_failed("signature algorithms", e))?;
        }

        if !self.alpn_wire.is_empty() {
            builder
                .set_alpn_protos(&self.alpn_wire)
                .map_err(|e| setup_failed("alpn", e))?;
        }

        builder.set_grease_enabled(self.grease_enabled);
        builder.set_permute_extensions(self.permute_extensions);

        if self.enable_ocsp_stapling {
            builder.enable_ocsp_stapling();
        }
        if self.enable_signed_cert_timestamps {
            builder.enable_signed_cert_timestamps();
        }
        if !self.session_ticket {
            builder.set_options(boring::ssl::SslOptions::NO_TICKET);
        }

        builder.set_verify(if self.verify_peer {
            SslVerifyMode::PEER
        } else {
            SslVerifyMode::NONE
        });

        Ok(())
    }
}

fn ssl_version(id: u16) -> Result<SslVersion, NetError> {
    match id {
        0x0301 => Ok(SslVersion::TLS1),
        0x0302 => Ok(SslVersion::TLS1_1),
        0x0303 => Ok(SslVersion::TLS1_2),
        0x0304 => Ok(SslVersion::TLS1_3),
        other => Err(NetError::NegotiationSetupFailed(format!(
            "unsupported tls version {:#06x}",
            other
        ))),
    }
}

fn setup_failed(what: &str, err: boring::error::ErrorStack) -> NetError {
    NetError::NegotiationSetupFailed(format!("{}: {}", what, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::tls::names::GREASE_PLACEHOLDER;
    use boring::ssl::{SslConnector, SslMethod};

    fn chrome_like() -> ClientHelloSpec {
        let mut spec = ClientHelloSpec::from_ja3(
            "771,4865-4866-4867-49195-49199,0-23-65281-10-11-35-16-5-13-18-51-45-43,29-23-24,0",
        )
        .unwrap();
        spec.cipher_suites.insert(0, GREASE_PLACEHOLDER);
        spec.supported_versions = vec![GREASE_PLACEHOLDER, 0x0304, 0x0303];
        spec.signature_algorithms = vec![0x0403, 0x0804, 0x0401];
        spec.alpn_protocols = vec!["h2".into(), "http/1.1".into()];
        spec
    }

    #[test]
    fn test_options_follow_spec() {
        let opts = TlsOptions::from_client_hello(&chrome_like(), false, false).unwrap();
        assert_eq!((opts.min_tls_version, opts.max_tls_version), (0x0303, 0x0304));
        assert!(opts.grease_enabled);
        assert!(opts.enable_ocsp_stapling);
        assert!(opts.enable_signed_cert_timestamps);
        assert!(opts.session_ticket);
        assert!(opts.verify_peer);
        assert_eq!(opts.curves_list, "X25519:P-256:P-384");
    }

    #[test]
    fn test_insecure_disables_verification() {
        let opts = TlsOptions::from_client_hello(&chrome_like(), true, true).unwrap();
        assert!(!opts.verify_peer);
        assert!(opts.permute_extensions);
    }

    #[test]
    fn test_apply_to_builder() {
        let opts = TlsOptions::from_client_hello(&chrome_like(), false, false).unwrap();
        let mut builder = SslConnector::builder(SslMethod::tls()).unwrap();
        assert!(opts.apply_to_builder(&mut builder).is_ok());
    }

    #[test]
    fn test_unknown_curves_fail_setup() {
        let mut spec = chrome_like();
        spec.supported_groups = vec![256, 257];
        assert!(matches!(
            TlsOptions::from_client_hello(&spec, false, false),
            Err(NetError::NegotiationSetupFailed(_))
        ));
    }
}
