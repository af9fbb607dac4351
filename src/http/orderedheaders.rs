use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// Headers that are meaningful only on an HTTP/1.1 connection.
const CONNECTION_SPECIFIC: [&str; 6] = [
    "connection",
    "host",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
];

/// A header list that strictly preserves emission order.
///
/// Request headers and the caller's declared order are folded into this one
/// list up front, so the wire order never depends on two structures agreeing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedHeaderMap {
    headers: Vec<(HeaderName, HeaderValue)>,
}

fn parse_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), NetError> {
    let name_header =
        HeaderName::from_str(name).map_err(|_| NetError::InvalidHeader(name.to_string()))?;
    let value_header = HeaderValue::from_str(value)
        .map_err(|_| NetError::InvalidHeader(format!("{}: bad value", name)))?;
    Ok((name_header, value_header))
}

impl OrderedHeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an unordered header map and a declared order.
    ///
    /// Names in `order` come first, in that order (case-insensitive); names
    /// the order does not mention follow in map order. Order entries without
    /// a matching header are ignored.
    pub fn from_parts<'a, I>(headers: I, order: &[String]) -> Result<Self, NetError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut pending: Vec<(HeaderName, HeaderValue)> = Vec::new();
        for (name, value) in headers {
            pending.push(parse_pair(name, value)?);
        }

        let mut out = Self { headers: pending };
        out.reorder(order);
        Ok(out)
    }

    /// Move the headers named in `order` to the front, in that order.
    /// The rest keep their relative order.
    pub fn reorder(&mut self, order: &[String]) {
        let mut pending = std::mem::take(&mut self.headers);
        for wanted in order {
            let Ok(wanted) = HeaderName::from_str(wanted) else {
                continue;
            };
            let mut i = 0;
            while i < pending.len() {
                if pending[i].0 == wanted {
                    self.headers.push(pending.remove(i));
                } else {
                    i += 1;
                }
            }
        }
        self.headers.extend(pending);
    }

    /// Set a header, replacing an existing value in place.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        let (name_header, value_header) = parse_pair(name, value)?;
        if let Some((_, v)) = self.headers.iter_mut().find(|(n, _)| *n == name_header) {
            *v = value_header;
        } else {
            self.headers.push((name_header, value_header));
        }
        Ok(())
    }

    /// Set a header only when it is absent.
    pub fn insert_if_absent(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        if self.contains(name) {
            return Ok(());
        }
        let pair = parse_pair(name, value)?;
        self.headers.push(pair);
        Ok(())
    }

    /// Put a header first unless it is already present.
    pub fn prepend_if_absent(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        if self.contains(name) {
            return Ok(());
        }
        let pair = parse_pair(name, value)?;
        self.headers.insert(0, pair);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) {
        if let Ok(target) = HeaderName::from_str(name) {
            self.headers.retain(|(n, _)| *n != target);
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        let target = HeaderName::from_str(name).ok()?;
        self.headers
            .iter()
            .find(|(n, _)| *n == target)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(n, v)| (n, v))
    }

    /// Headers allowed on an HTTP/2 stream, in order.
    pub fn to_h2_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if !CONNECTION_SPECIFIC.contains(&name.as_str()) {
                map.append(name.clone(), value.clone());
            }
        }
        map
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Consumes the map and returns a standard http::HeaderMap.
    /// Note: http::HeaderMap preserves insertion order.
    pub fn to_header_map(self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            map.append(name, value);
        }
        map
    }
}
