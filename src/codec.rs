//! zlib stream compression, the encoding behind both PNG image data and
//! the PDF `FlateDecode` filter.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compress `data` into a zlib stream.
pub fn deflate(data: &[u8], level: Compression) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level);
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress a zlib stream.
pub fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Decompress at most `limit` bytes of a zlib stream.
///
/// Output past `limit` is discarded without being decoded, so a small stream
/// that expands enormously costs no more than `limit` bytes of memory.
pub fn inflate_limited(data: &[u8], limit: usize) -> std::io::Result<Vec<u8>> {
    let cap = u64::try_from(limit).unwrap_or(u64::MAX);
    let mut decoder = ZlibDecoder::new(data).take(cap.saturating_add(1));
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    if decoded.len() > limit {
        log::warn!(
            "[Codec] zlib stream inflates past {} bytes, ignoring the rest",
            limit
        );
        decoded.truncate(limit);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflate_reverses_deflate() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let packed = deflate(&data, Compression::best()).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(inflate(&packed).unwrap(), data);
    }

    #[test]
    fn inflate_rejects_garbage() {
        assert!(inflate(&[0x13, 0x37, 0x00, 0x01]).is_err());
    }

    #[test]
    fn limited_inflate_stops_at_the_limit() {
        let packed = deflate(&vec![0u8; 1 << 20], Compression::best()).unwrap();
        assert_eq!(inflate_limited(&packed, 100).unwrap(), vec![0u8; 100]);
    }

    #[test]
    fn limited_inflate_keeps_short_streams_whole() {
        let data = b"scanline bytes".to_vec();
        let packed = deflate(&data, Compression::fast()).unwrap();
        assert_eq!(inflate_limited(&packed, 1000).unwrap(), data);
    }
}
