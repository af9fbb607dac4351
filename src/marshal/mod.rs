//! Response marshalling and the handle registry.
//!
//! Turns executor results into the boundary's JSON schema ([`types`]) and
//! keeps every emitted payload alive in a [`HandleRegistry`] until the
//! caller releases it.

pub mod registry;
pub mod sniff;
pub mod types;

pub use registry::HandleRegistry;
pub use types::{
    AddCookiesInput, CookieJson, CookiesOutput, DecompressInput, DecompressOutput,
    DestroyOutput, DestroySessionInput, GetCookiesInput, RequestInput, Response,
};

use crate::base::neterror::NetError;
use crate::urlrequest::job::JobOutcome;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::Version;
use std::collections::BTreeMap;

/// `content-type` → `Content-Type`.
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

fn protocol_name(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// `data:<mime>;base64,<payload>`.
pub fn data_uri(body: &[u8], content_type: Option<&str>) -> String {
    format!(
        "data:{};base64,{}",
        sniff::mime_type(body, content_type),
        STANDARD.encode(body)
    )
}

/// Response for a request that completed with an HTTP status.
pub fn success(
    id: String,
    session_id: Option<String>,
    outcome: &JobOutcome,
    byte_response: bool,
) -> Response {
    let response = &outcome.response;

    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in response.headers() {
        headers
            .entry(canonical_header_name(name))
            .or_default()
            .push(value.clone());
    }

    let body = if byte_response {
        data_uri(response.body(), response.content_type())
    } else {
        String::from_utf8_lossy(response.body()).into_owned()
    };

    Response {
        id,
        session_id,
        status: response.status().as_u16(),
        target: outcome.url.to_string(),
        body,
        headers,
        cookies: outcome.cookies.clone(),
        used_protocol: protocol_name(response.version()).to_string(),
    }
}

/// Status-0 response carrying the error text as its body.
pub fn failure(id: String, session_id: Option<String>, err: &NetError) -> Response {
    Response {
        id,
        session_id,
        status: 0,
        body: err.to_string(),
        ..Default::default()
    }
}
