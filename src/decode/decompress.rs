//! Content-Encoding handling.

use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

use crate::error_handling::DecodeError;

/// Brotli decoder buffer size.
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Decompresses `body` according to a `content-encoding` value.
///
/// Unknown or missing encodings return the body unchanged, except that a body
/// starting with the gzip magic bytes is gunzipped anyway.
pub fn decompress(body: &[u8], encoding: Option<&str>) -> Result<Vec<u8>, DecodeError> {
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        Some("gzip") | Some("x-gzip") => gunzip(body),
        Some("deflate") => inflate(body),
        Some("br") => unbrotli(body),
        _ if body.starts_with(&[0x1f, 0x8b]) => gunzip(body),
        _ => Ok(body.to_vec()),
    }
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoded = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut decoded)
        .map_err(|source| DecodeError::Decompression {
            encoding: "gzip".to_string(),
            source,
        })?;
    Ok(decoded)
}

/// `deflate` is zlib-wrapped per RFC, but some servers send raw deflate.
fn inflate(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoded = Vec::new();
    if ZlibDecoder::new(data).read_to_end(&mut decoded).is_ok() {
        return Ok(decoded);
    }
    decoded.clear();
    DeflateDecoder::new(data)
        .read_to_end(&mut decoded)
        .map_err(|source| DecodeError::Decompression {
            encoding: "deflate".to_string(),
            source,
        })?;
    Ok(decoded)
}

fn unbrotli(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoded = Vec::new();
    brotli::Decompressor::new(data, BROTLI_BUFFER_SIZE)
        .read_to_end(&mut decoded)
        .map_err(|source| DecodeError::Decompression {
            encoding: "br".to_string(),
            source,
        })?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    const BODY: &[u8] = br#"{"basicInfo":{"recordCount":12,"productId":"p-1"}}"#;

    #[test]
    fn test_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(BODY).expect("write");
        let compressed = encoder.finish().expect("finish");
        assert_eq!(decompress(&compressed, Some("gzip")).expect("gunzip"), BODY);
        // Magic bytes are honoured without a header
        assert_eq!(decompress(&compressed, None).expect("sniffed"), BODY);
    }

    #[test]
    fn test_deflate_zlib_and_raw() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(BODY).expect("write");
        let zlib = zlib.finish().expect("finish");
        assert_eq!(decompress(&zlib, Some("deflate")).expect("zlib"), BODY);

        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(BODY).expect("write");
        let raw = raw.finish().expect("finish");
        assert_eq!(decompress(&raw, Some("Deflate")).expect("raw"), BODY);
    }

    #[test]
    fn test_brotli() {
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
            writer.write_all(BODY).expect("write");
        }
        assert_eq!(decompress(&compressed, Some("br")).expect("brotli"), BODY);
    }

    #[test]
    fn test_identity_and_unknown() {
        assert_eq!(decompress(BODY, None).expect("identity"), BODY);
        assert_eq!(decompress(BODY, Some("identity")).expect("identity"), BODY);
    }

    #[test]
    fn test_corrupt_gzip_is_an_error() {
        let err = decompress(b"\x1f\x8bnot really gzip", Some("gzip")).unwrap_err();
        assert!(matches!(err, DecodeError::Decompression { ref encoding, .. } if encoding == "gzip"));
    }
}
