use crate::base::neterror::NetError;
use crate::cookies::CookieParts;
use crate::emulation::CustomTlsClient;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::marshal::RequestInput;
use crate::socket::tls::HandshakeOptions;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use http::Method;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use url::Url;

const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PATCH,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// A validated request, ready for the executor.
///
/// Settings that belong to the session (proxy, pins) are applied to the
/// session before the request runs and are not part of this value.
#[derive(Debug, Clone)]
pub struct URLRequest {
    pub method: Method,
    pub url: Url,
    pub headers: OrderedHeaderMap,
    /// Declared header order, reapplied after headers are added per hop.
    pub header_order: Vec<String>,
    pub body: Bytes,
    /// Built-in profile name; `custom_profile` wins when both are set.
    pub profile: Option<String>,
    pub custom_profile: Option<CustomTlsClient>,
    pub cookies: Vec<CookieParts>,
    pub follow_redirects: bool,
    /// `None` means the engine default.
    pub timeout: Option<Duration>,
    pub handshake: HandshakeOptions,
    pub force_http1: bool,
    pub disable_ipv6: bool,
    pub local_address: Option<IpAddr>,
    pub without_cookie_jar: bool,
    pub byte_response: bool,
    pub debug: bool,
}

fn parse_method(name: &str) -> Result<Method, NetError> {
    let upper = name.trim().to_ascii_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
        .ok_or_else(|| NetError::MethodNotSupported(name.to_string()))
}

/// `localAddress` may be a bare IP or `ip:port`; only the IP is used.
fn parse_local_address(text: &str) -> Result<IpAddr, NetError> {
    let text = text.trim();
    text.parse::<IpAddr>()
        .or_else(|_| text.parse::<SocketAddr>().map(|a| a.ip()))
        .map_err(|_| NetError::InvalidPayload(format!("invalid local address: {}", text)))
}

fn timeout_of(input: &RequestInput) -> Result<Option<Duration>, NetError> {
    match (input.timeout_seconds, input.timeout_milliseconds) {
        (0, 0) => Ok(None),
        (s, 0) => Ok(Some(Duration::from_secs(s))),
        (0, ms) => Ok(Some(Duration::from_millis(ms))),
        _ => Err(NetError::InvalidPayload(
            "timeoutSeconds and timeoutMilliseconds are mutually exclusive".into(),
        )),
    }
}

/// Request headers first, then default headers the request does not set,
/// arranged by the declared order.
fn build_headers(input: &RequestInput) -> Result<OrderedHeaderMap, NetError> {
    let mut pairs: Vec<(&str, String)> = input
        .headers
        .iter()
        .map(|(n, v)| (n.as_str(), v.clone()))
        .collect();
    for (name, values) in &input.default_headers {
        if values.is_empty() || input.headers.keys().any(|n| n.eq_ignore_ascii_case(name)) {
            continue;
        }
        pairs.push((name.as_str(), values.join(", ")));
    }
    OrderedHeaderMap::from_parts(pairs.iter().map(|(n, v)| (*n, v.as_str())), &input.header_order)
}

impl URLRequest {
    pub fn from_input(input: &RequestInput) -> Result<Self, NetError> {
        if input.request_url.trim().is_empty() {
            return Err(NetError::InvalidPayload("no request url provided".into()));
        }
        if input.request_method.trim().is_empty() {
            return Err(NetError::InvalidPayload("no request method provided".into()));
        }
        let method = parse_method(&input.request_method)?;
        let url = Url::parse(input.request_url.trim())
            .map_err(|e| NetError::InvalidUrl(format!("{}: {}", input.request_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(NetError::InvalidUrl(input.request_url.clone()));
        }

        let body = match input.request_body.as_deref() {
            None | Some("") => Bytes::new(),
            Some(text) if input.is_byte_request => Bytes::from(
                STANDARD
                    .decode(text.trim())
                    .map_err(|e| NetError::InvalidPayload(format!("request body is not base64: {}", e)))?,
            ),
            Some(text) => Bytes::from(text.to_string()),
        };

        let local_address = input
            .local_address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .map(parse_local_address)
            .transpose()?;

        Ok(URLRequest {
            method,
            url,
            headers: build_headers(input)?,
            header_order: input.header_order.clone(),
            body,
            profile: input.tls_client_identifier.clone(),
            custom_profile: input.custom_tls_client.clone(),
            cookies: input.request_cookies.iter().map(|c| c.to_parts()).collect(),
            follow_redirects: input.follow_redirects,
            timeout: timeout_of(input)?,
            handshake: HandshakeOptions {
                insecure_skip_verify: input.insecure_skip_verify,
                random_extension_order: input.with_random_tls_extension_order,
                server_name_overwrite: input
                    .server_name_overwrite
                    .clone()
                    .filter(|s| !s.is_empty()),
            },
            force_http1: input.force_http1,
            disable_ipv6: input.disable_ipv6,
            local_address,
            without_cookie_jar: input.without_cookie_jar,
            byte_response: input.is_byte_response,
            debug: input.with_debug,
        })
    }
}
