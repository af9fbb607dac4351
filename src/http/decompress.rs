//! Content-Encoding decoders.
//!
//! Used on the request path for `Content-Encoding` and standalone by the
//! `decompressBody` boundary call.

use crate::base::neterror::NetError;
use base64::engine::general_purpose;
use base64::Engine as _;
use std::io::Read;

fn read_all<R: Read>(mut reader: R, what: &str) -> Result<Vec<u8>, NetError> {
    let mut decoded = Vec::new();
    reader
        .read_to_end(&mut decoded)
        .map_err(|e| NetError::DecodeError(format!("{}: {}", what, e)))?;
    Ok(decoded)
}

fn decode_gzip(data: &[u8]) -> Result<Vec<u8>, NetError> {
    read_all(flate2::read::MultiGzDecoder::new(data), "gzip")
}

/// Servers disagree on whether "deflate" means zlib-wrapped or raw.
fn decode_deflate(data: &[u8]) -> Result<Vec<u8>, NetError> {
    if let Ok(decoded) = read_all(flate2::read::ZlibDecoder::new(data), "deflate") {
        return Ok(decoded);
    }
    read_all(flate2::read::DeflateDecoder::new(data), "deflate")
}

fn decode_brotli(data: &[u8]) -> Result<Vec<u8>, NetError> {
    read_all(brotli::Decompressor::new(data, 4096), "brotli")
}

fn decode_zstd(data: &[u8]) -> Result<Vec<u8>, NetError> {
    zstd::stream::decode_all(data).map_err(|e| NetError::DecodeError(format!("zstd: {}", e)))
}

/// Decode one content coding.
pub fn decode(encoding: &str, data: &[u8]) -> Result<Vec<u8>, NetError> {
    match encoding.trim().to_ascii_lowercase().as_str() {
        "gzip" | "x-gzip" => decode_gzip(data),
        "deflate" => decode_deflate(data),
        "br" => decode_brotli(data),
        "zstd" => decode_zstd(data),
        "identity" | "" => Ok(data.to_vec()),
        other => Err(NetError::UnsupportedEncoding(other.to_string())),
    }
}

/// Decode a `Content-Encoding` list such as `"gzip, br"`.
///
/// Codings are listed in the order they were applied, so they are undone
/// from last to first.
pub fn decode_chain(header: &str, data: &[u8]) -> Result<Vec<u8>, NetError> {
    let mut current = data.to_vec();
    for encoding in header.rsplit(',') {
        current = decode(encoding, &current)?;
    }
    Ok(current)
}

/// Decode a body handed in as text.
///
/// Base64 comes first: the body is read as base64, optionally behind a
/// `data:...;base64,` prefix, whenever it decodes as such. Only text that
/// is not valid base64 is taken as the raw compressed bytes, so a raw body
/// that happens to be valid base64 is decoded as base64.
pub fn decompress_text(encoding: &str, body: &str) -> Result<String, NetError> {
    let payload = match body.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => body,
    };
    let raw = general_purpose::STANDARD
        .decode(payload.trim())
        .unwrap_or_else(|_| body.as_bytes().to_vec());
    let decoded = decode(encoding, &raw)?;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    const TEXT: &[u8] = b"the quick brown fox jumps over the lazy dog";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_each_coding() {
        assert_eq!(decode("gzip", &gzip(TEXT)).unwrap(), TEXT);

        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(TEXT).unwrap();
        assert_eq!(decode("deflate", &zlib.finish().unwrap()).unwrap(), TEXT);

        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(TEXT).unwrap();
        assert_eq!(decode("deflate", &raw.finish().unwrap()).unwrap(), TEXT);

        let mut br = Vec::new();
        {
            let mut w = brotli::CompressorWriter::new(&mut br, 4096, 5, 22);
            w.write_all(TEXT).unwrap();
        }
        assert_eq!(decode("br", &br).unwrap(), TEXT);

        let zst = zstd::stream::encode_all(TEXT, 3).unwrap();
        assert_eq!(decode("ZSTD", &zst).unwrap(), TEXT);
    }

    #[test]
    fn test_chain_is_undone_in_reverse() {
        let zst_of_gz = zstd::stream::encode_all(&gzip(TEXT)[..], 3).unwrap();
        assert_eq!(decode_chain("gzip, zstd", &zst_of_gz).unwrap(), TEXT);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            decode("lzma", TEXT).unwrap_err(),
            NetError::UnsupportedEncoding("lzma".into())
        );
        assert!(matches!(decode("gzip", b"not gzip").unwrap_err(), NetError::DecodeError(_)));
    }

    #[test]
    fn test_decompress_text_forms() {
        let b64 = general_purpose::STANDARD.encode(gzip(TEXT));
        let expected = String::from_utf8(TEXT.to_vec()).unwrap();
        assert_eq!(decompress_text("gzip", &b64).unwrap(), expected);
        let data_uri = format!("data:application/octet-stream;base64,{}", b64);
        assert_eq!(decompress_text("gzip", &data_uri).unwrap(), expected);
        assert_eq!(decompress_text("identity", "plain text").unwrap(), "plain text");
    }

    #[test]
    fn test_base64_wins_over_raw_text() {
        // "abcd" is valid base64 for the bytes 69 b7 1d.
        let out = decompress_text("identity", "abcd").unwrap();
        assert_eq!(out, String::from_utf8_lossy(&[0x69, 0xb7, 0x1d]));
        assert_eq!(decompress_text("identity", "abc").unwrap(), "abc");
    }
}
