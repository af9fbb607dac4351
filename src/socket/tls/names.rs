//! IANA code points and the names used to refer to them.
//!
//! Two directions are covered: the names accepted in custom profile
//! definitions (`"P256"`, `"PSSWithSHA256"`, `"1.3"`) and the names
//! BoringSSL's list setters understand (`"P-256"`, `"RSA-PSS+SHA256"`).

/// Placeholder written into ordered lists where a GREASE value goes.
pub const GREASE_PLACEHOLDER: u16 = 0x0a0a;

/// TLS extension ids.
pub mod ext {
    pub const SERVER_NAME: u16 = 0;
    pub const STATUS_REQUEST: u16 = 5;
    pub const SUPPORTED_GROUPS: u16 = 10;
    pub const EC_POINT_FORMATS: u16 = 11;
    pub const SIGNATURE_ALGORITHMS: u16 = 13;
    pub const ALPN: u16 = 16;
    pub const SIGNED_CERT_TIMESTAMP: u16 = 18;
    pub const PADDING: u16 = 21;
    pub const EXTENDED_MASTER_SECRET: u16 = 23;
    pub const COMPRESS_CERTIFICATE: u16 = 27;
    pub const RECORD_SIZE_LIMIT: u16 = 28;
    pub const DELEGATED_CREDENTIALS: u16 = 34;
    pub const SESSION_TICKET: u16 = 35;
    pub const PRE_SHARED_KEY: u16 = 41;
    pub const EARLY_DATA: u16 = 42;
    pub const SUPPORTED_VERSIONS: u16 = 43;
    pub const COOKIE: u16 = 44;
    pub const PSK_KEY_EXCHANGE_MODES: u16 = 45;
    pub const CERTIFICATE_AUTHORITIES: u16 = 47;
    pub const SIGNATURE_ALGORITHMS_CERT: u16 = 50;
    pub const KEY_SHARE: u16 = 51;
    pub const QUIC_TRANSPORT_PARAMETERS: u16 = 57;
    pub const NPN: u16 = 13172;
    pub const APPLICATION_SETTINGS: u16 = 17513;
    pub const APPLICATION_SETTINGS_NEW: u16 = 17613;
    pub const CHANNEL_ID: u16 = 30032;
    pub const ENCRYPTED_CLIENT_HELLO: u16 = 65037;
    pub const RENEGOTIATION_INFO: u16 = 65281;

    pub const KNOWN: &[u16] = &[
        SERVER_NAME,
        STATUS_REQUEST,
        SUPPORTED_GROUPS,
        EC_POINT_FORMATS,
        SIGNATURE_ALGORITHMS,
        ALPN,
        SIGNED_CERT_TIMESTAMP,
        PADDING,
        EXTENDED_MASTER_SECRET,
        COMPRESS_CERTIFICATE,
        RECORD_SIZE_LIMIT,
        DELEGATED_CREDENTIALS,
        SESSION_TICKET,
        PRE_SHARED_KEY,
        EARLY_DATA,
        SUPPORTED_VERSIONS,
        COOKIE,
        PSK_KEY_EXCHANGE_MODES,
        CERTIFICATE_AUTHORITIES,
        SIGNATURE_ALGORITHMS_CERT,
        KEY_SHARE,
        QUIC_TRANSPORT_PARAMETERS,
        NPN,
        APPLICATION_SETTINGS,
        APPLICATION_SETTINGS_NEW,
        CHANNEL_ID,
        ENCRYPTED_CLIENT_HELLO,
        RENEGOTIATION_INFO,
    ];
}

/// RFC 8701 GREASE values have the form 0x?A?A with equal bytes.
pub fn is_grease(value: u16) -> bool {
    (value & 0x0f0f) == 0x0a0a && (value >> 8) == (value & 0xff)
}

pub fn is_known_extension(id: u16) -> bool {
    is_grease(id) || ext::KNOWN.contains(&id)
}

/// TLS 1.3 suites cannot be configured through the cipher string.
pub fn is_tls13_cipher(id: u16) -> bool {
    (0x1301..=0x1305).contains(&id)
}

/// BoringSSL cipher-string name of a TLS 1.2-and-below suite.
pub fn cipher_boring_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0xc02b => "ECDHE-ECDSA-AES128-GCM-SHA256",
        0xc02f => "ECDHE-RSA-AES128-GCM-SHA256",
        0xc02c => "ECDHE-ECDSA-AES256-GCM-SHA384",
        0xc030 => "ECDHE-RSA-AES256-GCM-SHA384",
        0xcca9 => "ECDHE-ECDSA-CHACHA20-POLY1305",
        0xcca8 => "ECDHE-RSA-CHACHA20-POLY1305",
        0xc009 => "ECDHE-ECDSA-AES128-SHA",
        0xc00a => "ECDHE-ECDSA-AES256-SHA",
        0xc013 => "ECDHE-RSA-AES128-SHA",
        0xc014 => "ECDHE-RSA-AES256-SHA",
        0xc027 => "ECDHE-RSA-AES128-SHA256",
        0x009c => "AES128-GCM-SHA256",
        0x009d => "AES256-GCM-SHA384",
        0x002f => "AES128-SHA",
        0x0035 => "AES256-SHA",
        0x003c => "AES128-SHA256",
        0x000a => "DES-CBC3-SHA",
        _ => return None,
    })
}

pub fn curve_from_name(name: &str) -> Option<u16> {
    Some(match name {
        "GREASE" => GREASE_PLACEHOLDER,
        "P256" => 23,
        "P384" => 24,
        "P521" => 25,
        "X25519" => 29,
        "X25519Kyber768" => 0x6399,
        _ => return None,
    })
}

pub fn curve_boring_name(id: u16) -> Option<&'static str> {
    Some(match id {
        23 => "P-256",
        24 => "P-384",
        25 => "P-521",
        29 => "X25519",
        _ => return None,
    })
}

pub fn sigalg_from_name(name: &str) -> Option<u16> {
    Some(match name {
        "PKCS1WithSHA256" => 0x0401,
        "PKCS1WithSHA384" => 0x0501,
        "PKCS1WithSHA512" => 0x0601,
        "PSSWithSHA256" => 0x0804,
        "PSSWithSHA384" => 0x0805,
        "PSSWithSHA512" => 0x0806,
        "ECDSAWithP256AndSHA256" => 0x0403,
        "ECDSAWithP384AndSHA384" => 0x0503,
        "ECDSAWithP521AndSHA512" => 0x0603,
        "PKCS1WithSHA1" => 0x0201,
        "ECDSAWithSHA1" => 0x0203,
        "Ed25519" => 0x0807,
        "SHA224_RSA" => 0x0301,
        "SHA224_ECDSA" => 0x0303,
        _ => return None,
    })
}

pub fn sigalg_boring_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0403 => "ECDSA+SHA256",
        0x0503 => "ECDSA+SHA384",
        0x0603 => "ECDSA+SHA512",
        0x0804 => "RSA-PSS+SHA256",
        0x0805 => "RSA-PSS+SHA384",
        0x0806 => "RSA-PSS+SHA512",
        0x0401 => "RSA+SHA256",
        0x0501 => "RSA+SHA384",
        0x0601 => "RSA+SHA512",
        0x0201 => "RSA+SHA1",
        0x0203 => "ECDSA+SHA1",
        0x0807 => "Ed25519",
        _ => return None,
    })
}

pub fn version_from_name(name: &str) -> Option<u16> {
    Some(match name {
        "GREASE" => GREASE_PLACEHOLDER,
        "1.3" => 0x0304,
        "1.2" => 0x0303,
        "1.1" => 0x0302,
        "1.0" => 0x0301,
        _ => return None,
    })
}

pub fn is_tls_version(id: u16) -> bool {
    (0x0301..=0x0304).contains(&id)
}

/// Certificate compression algorithms (RFC 8879).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertCompression {
    Zlib,
    Brotli,
    Zstd,
}

impl CertCompression {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "zlib" => Some(Self::Zlib),
            "brotli" => Some(Self::Brotli),
            "zstd" => Some(Self::Zstd),
            _ => None,
        }
    }

    pub fn id(self) -> u16 {
        match self {
            Self::Zlib => 1,
            Self::Brotli => 2,
            Self::Zstd => 3,
        }
    }
}
