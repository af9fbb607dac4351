//! A fully read HTTP response.

use crate::base::neterror::NetError;
use crate::http::decompress;
use bytes::Bytes;
use http::{StatusCode, Version};

/// Response with its body read into memory.
///
/// Header names are lower-case. Repeated headers keep their wire order.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(
        status: StatusCode,
        version: Version,
        headers: Vec<(String, String)>,
        body: Bytes,
    ) -> Self {
        Self { status, version, headers, body }
    }

    pub fn from_parts(parts: http::response::Parts, body: Bytes) -> Self {
        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        Self::new(parts.status, parts.version, headers, body)
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Every value of `name`, in the order received.
    pub fn header_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_all(name).next()
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn set_cookies(&self) -> impl Iterator<Item = &str> + '_ {
        self.header_all("set-cookie")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Undo the `Content-Encoding` the server applied.
    ///
    /// The encoding headers are removed once the body is decoded so the
    /// captured response describes the bytes it carries.
    pub fn decode_body(&mut self) -> Result<(), NetError> {
        let Some(encoding) = self.header("content-encoding").map(str::to_string) else {
            return Ok(());
        };
        if self.body.is_empty() {
            return Ok(());
        }
        self.body = Bytes::from(decompress::decode_chain(&encoding, &self.body)?);
        self.headers.retain(|(n, _)| {
            !n.eq_ignore_ascii_case("content-encoding") && !n.eq_ignore_ascii_case("content-length")
        });
        Ok(())
    }
}
