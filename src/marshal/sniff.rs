//! MIME type detection from leading bytes, for byte-mode response bodies.

/// (mask, pattern, mime). A byte matches when `data & mask == pattern`.
const SIGNATURES: &[(&[u8], &[u8], &str)] = &[
    (b"\xFF\xFF\xFF\xFF\xFF", b"%PDF-", "application/pdf"),
    (
        b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        b"%!PS-Adobe-",
        "application/postscript",
    ),
    (b"\xFF\xFF\xFF\xFF\xFF\xFF", b"GIF87a", "image/gif"),
    (b"\xFF\xFF\xFF\xFF\xFF\xFF", b"GIF89a", "image/gif"),
    (
        b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        b"\x89PNG\x0D\x0A\x1A\x0A",
        "image/png",
    ),
    (b"\xFF\xFF\xFF", b"\xFF\xD8\xFF", "image/jpeg"),
    (b"\xFF\xFF", b"BM", "image/bmp"),
    (b"\xFF\xFF\xFF\xFF", b"\x00\x00\x01\x00", "image/x-icon"),
    (
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WEBPVP",
        "image/webp",
    ),
    (
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WAVE",
        "audio/wave",
    ),
    (b"\xFF\xFF\xFF", b"ID3", "audio/mpeg"),
    (b"\xFF\xFF\xFF\xFF\xFF", b"OggS\x00", "application/ogg"),
    (b"\xFF\xFF\xFF\xFF", b"wOFF", "font/woff"),
    (b"\xFF\xFF\xFF\xFF", b"wOF2", "font/woff2"),
    (b"\xFF\xFF\xFF", b"\x1F\x8B\x08", "application/x-gzip"),
    (b"\xFF\xFF\xFF\xFF", b"PK\x03\x04", "application/zip"),
    (
        b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        b"Rar!\x1A\x07\x00",
        "application/x-rar-compressed",
    ),
    (b"\xFF\xFF\xFF\xFF", b"\x00asm", "application/wasm"),
];

/// Tags that mark an HTML document, compared case-insensitively after
/// leading whitespace and followed by a space or `>`.
const HTML_TAGS: &[&str] = &[
    "<!DOCTYPE HTML",
    "<HTML",
    "<HEAD",
    "<SCRIPT",
    "<IFRAME",
    "<H1",
    "<DIV",
    "<FONT",
    "<TABLE",
    "<A",
    "<STYLE",
    "<TITLE",
    "<B",
    "<BODY",
    "<BR",
    "<P",
    "<!--",
];

fn matches_signature(data: &[u8], mask: &[u8], pattern: &[u8]) -> bool {
    data.len() >= pattern.len()
        && data
            .iter()
            .zip(mask.iter().zip(pattern))
            .all(|(b, (m, p))| b & m == *p)
}

/// ISO BMFF (`ftyp` box) with an mp4 brand.
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size < 12 || box_size % 4 != 0 || data.len() < box_size || &data[4..8] != b"ftyp" {
        return false;
    }
    if &data[8..11] == b"mp4" {
        return true;
    }
    data[16.min(box_size)..box_size]
        .chunks_exact(4)
        .any(|brand| &brand[..3] == b"mp4")
}

fn sniff_markup(data: &[u8]) -> Option<&'static str> {
    let start = data.iter().position(|b| !b" \t\n\x0C\r".contains(b))?;
    let data = &data[start..];

    for tag in HTML_TAGS {
        let tag = tag.as_bytes();
        if data.len() > tag.len()
            && data[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(data[tag.len()], b' ' | b'>')
        {
            return Some("text/html; charset=utf-8");
        }
    }
    if data.starts_with(b"<?xml") {
        return Some("text/xml; charset=utf-8");
    }
    None
}

/// Detect the MIME type of `data` from its first bytes.
pub fn sniff(data: &[u8]) -> Option<&'static str> {
    let head = &data[..data.len().min(512)];
    if let Some((_, _, mime)) = SIGNATURES
        .iter()
        .find(|(mask, pattern, _)| matches_signature(head, mask, pattern))
    {
        return Some(mime);
    }
    if is_mp4(head) {
        return Some("video/mp4");
    }
    sniff_markup(head)
}

/// MIME type for a byte-mode body: sniffed, then the declared type, then
/// `application/octet-stream`.
pub fn mime_type(data: &[u8], content_type: Option<&str>) -> String {
    sniff(data)
        .map(str::to_string)
        .or_else(|| {
            content_type
                .map(str::trim)
                .filter(|ct| !ct.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images() {
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), Some("image/png"));
        assert_eq!(sniff(b"\xFF\xD8\xFF\xE0\0\x10JFIF"), Some("image/jpeg"));
        assert_eq!(sniff(b"GIF89a\x01\0"), Some("image/gif"));
        assert_eq!(sniff(b"RIFF\x10\0\0\0WEBPVP8 "), Some("image/webp"));
    }

    #[test]
    fn test_documents() {
        assert_eq!(sniff(b"%PDF-1.7\n"), Some("application/pdf"));
        assert_eq!(sniff(b"  \n<!doctype html>"), Some("text/html; charset=utf-8"));
        assert_eq!(sniff(b"<?xml version=\"1.0\"?>"), Some("text/xml; charset=utf-8"));
        assert_eq!(sniff(b"<html"), None);
    }

    #[test]
    fn test_mp4() {
        let mut data = vec![0, 0, 0, 0x18];
        data.extend_from_slice(b"ftypisom\0\0\x02\0isommp41");
        assert_eq!(sniff(&data), Some("video/mp4"));
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(mime_type(b"\x01\x02\x03", Some("image/avif")), "image/avif");
        assert_eq!(mime_type(b"\x01\x02\x03", None), "application/octet-stream");
        assert_eq!(mime_type(b"\x01\x02\x03", Some(" ")), "application/octet-stream");
        assert_eq!(mime_type(b"GIF87a", Some("text/plain")), "image/gif");
    }
}
