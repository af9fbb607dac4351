//! JSON schema of the call surface.
//!
//! Every input tolerates `null` where a collection or flag is expected, and
//! cookie objects accept both camelCase and capitalized field names.

use crate::cookies::{CanonicalCookie, CookieParts, SameSite};
use crate::emulation::CustomTlsClient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// The `request` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestInput {
    pub session_id: Option<String>,
    pub tls_client_identifier: Option<String>,
    pub custom_tls_client: Option<CustomTlsClient>,
    #[serde(deserialize_with = "null_default")]
    pub follow_redirects: bool,
    #[serde(deserialize_with = "null_default")]
    pub force_http1: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_byte_response: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_byte_request: bool,
    #[serde(deserialize_with = "null_default")]
    pub with_debug: bool,
    #[serde(deserialize_with = "null_default")]
    pub without_cookie_jar: bool,
    #[serde(deserialize_with = "null_default")]
    pub with_default_cookie_jar: bool,
    #[serde(rename = "withRandomTLSExtensionOrder", deserialize_with = "null_default")]
    pub with_random_tls_extension_order: bool,
    #[serde(deserialize_with = "null_default")]
    pub insecure_skip_verify: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_rotating_proxy: bool,
    #[serde(rename = "disableIPV6", deserialize_with = "null_default")]
    pub disable_ipv6: bool,
    /// Overrides the engine's panic policy for this call.
    pub catch_panics: Option<bool>,
    #[serde(deserialize_with = "null_default")]
    pub timeout_seconds: u64,
    #[serde(deserialize_with = "null_default")]
    pub timeout_milliseconds: u64,
    pub proxy_url: Option<String>,
    pub server_name_overwrite: Option<String>,
    pub local_address: Option<String>,
    /// Request headers. JSON object order is not kept: names missing from
    /// `header_order` go on the wire after the listed ones, sorted by name.
    #[serde(deserialize_with = "null_default")]
    pub headers: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_default")]
    pub header_order: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub default_headers: BTreeMap<String, Vec<String>>,
    #[serde(deserialize_with = "null_default")]
    pub certificate_pinning_hosts: HashMap<String, Vec<String>>,
    #[serde(deserialize_with = "null_default")]
    pub request_url: String,
    #[serde(deserialize_with = "null_default")]
    pub request_method: String,
    pub request_body: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub request_cookies: Vec<CookieJson>,
}

/// Result of `request`. Also used for every failure, with `status` 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    #[serde(default)]
    pub used_protocol: String,
}

fn unix_expires<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => OffsetDateTime::parse(&s, &Rfc3339)
            .ok()
            .filter(|t| t.year() > 1)
            .map(OffsetDateTime::unix_timestamp),
        _ => None,
    })
}

fn same_site_name<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        // Numeric SameSite modes: 2 Lax, 3 Strict, 4 None.
        Some(Value::Number(n)) => match n.as_u64() {
            Some(2) => "Lax",
            Some(3) => "Strict",
            Some(4) => "None",
            _ => "",
        }
        .to_string(),
        _ => String::new(),
    })
}

/// A cookie as it crosses the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CookieJson {
    #[serde(alias = "Name", deserialize_with = "null_default")]
    pub name: String,
    #[serde(alias = "Value", deserialize_with = "null_default")]
    pub value: String,
    #[serde(alias = "Path", deserialize_with = "null_default")]
    pub path: String,
    #[serde(alias = "Domain", deserialize_with = "null_default")]
    pub domain: String,
    /// Unix seconds. Absent for session cookies.
    #[serde(alias = "Expires", deserialize_with = "unix_expires")]
    pub expires: Option<i64>,
    /// Zero means unset, negative means delete now.
    #[serde(alias = "MaxAge", deserialize_with = "null_default")]
    pub max_age: i64,
    #[serde(alias = "Secure", deserialize_with = "null_default")]
    pub secure: bool,
    #[serde(alias = "HttpOnly", deserialize_with = "null_default")]
    pub http_only: bool,
    #[serde(alias = "SameSite", deserialize_with = "same_site_name")]
    pub same_site: String,
    #[serde(alias = "Raw", deserialize_with = "null_default")]
    pub raw: String,
}

impl CookieJson {
    pub fn to_parts(&self) -> CookieParts {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        CookieParts {
            name: self.name.clone(),
            value: self.value.clone(),
            domain: non_empty(&self.domain),
            path: non_empty(&self.path),
            expires: self
                .expires
                .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok()),
            max_age: (self.max_age != 0).then_some(self.max_age),
            secure: self.secure,
            http_only: self.http_only,
            same_site: SameSite::from_name(&self.same_site),
        }
    }
}

impl From<&CanonicalCookie> for CookieJson {
    fn from(c: &CanonicalCookie) -> Self {
        CookieJson {
            name: c.name.clone(),
            value: c.value.clone(),
            path: c.path.clone(),
            domain: c.domain.clone(),
            expires: c.expiration_time.map(OffsetDateTime::unix_timestamp),
            max_age: c.max_age.unwrap_or(0),
            secure: c.secure,
            http_only: c.http_only,
            same_site: c.same_site.as_str().to_string(),
            raw: c.raw.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetCookiesInput {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddCookiesInput {
    pub session_id: String,
    pub url: String,
    #[serde(deserialize_with = "null_default")]
    pub cookies: Vec<CookieJson>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookiesOutput {
    pub id: String,
    pub cookies: Vec<CookieJson>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DestroySessionInput {
    pub session_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestroyOutput {
    pub id: String,
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompressInput {
    /// Content coding: `gzip`, `deflate`, `br`, `zstd` or `identity`.
    #[serde(rename = "type")]
    pub encoding: String,
    /// Base64 of the compressed bytes, optionally as a `data:` URI. Text
    /// that does not decode as base64 is used as the raw bytes.
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecompressOutput {
    pub id: String,
    pub body: String,
}
