//! PNG container framing: signature check and chunk splitting.

use crate::error::{PngError, Result};
use std::fmt;

/// The eight bytes every PNG file starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunk lengths are limited to 2^31 - 1 by the PNG format.
const MAX_CHUNK_LEN: u32 = 0x7FFF_FFFF;

/// Whether `bytes` starts with the PNG signature.
///
/// Cheap enough to use for format dispatch before constructing a
/// [`PngImage`](crate::PngImage).
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.len() >= PNG_SIGNATURE.len() && bytes[..PNG_SIGNATURE.len()] == PNG_SIGNATURE
}

/// Four byte chunk tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

#[allow(non_upper_case_globals)]
impl ChunkType {
    pub const IHDR: Self = Self(*b"IHDR");
    pub const PLTE: Self = Self(*b"PLTE");
    pub const IDAT: Self = Self(*b"IDAT");
    pub const IEND: Self = Self(*b"IEND");
    pub const tRNS: Self = Self(*b"tRNS");
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single chunk, borrowing its content from the input buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub chunk_type: ChunkType,
    pub data: &'a [u8],
    pub declared_crc: u32,
}

impl fmt::Debug for Chunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("chunk_type", &self.chunk_type)
            .field("len", &self.data.len())
            .field("declared_crc", &format_args!("{:08X}", self.declared_crc))
            .finish()
    }
}

impl Chunk<'_> {
    /// CRC-32 of the tag followed by the content, as the file should declare it.
    pub fn computed_crc(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.chunk_type.0);
        hasher.update(self.data);
        hasher.finalize()
    }
}

fn take<'a>(rest: &mut &'a [u8], n: usize, what: &str) -> Result<&'a [u8]> {
    if rest.len() < n {
        return Err(PngError::MalformedChunkStream(format!(
            "truncated {}: needed {} bytes, {} left",
            what,
            n,
            rest.len()
        )));
    }
    let (head, tail) = rest.split_at(n);
    *rest = tail;
    Ok(head)
}

fn take_u32(rest: &mut &[u8], what: &str) -> Result<u32> {
    let bytes = take(rest, 4, what)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Split a PNG byte stream into its chunks, up to and including IEND.
///
/// The header chunk must come first. Anything after IEND is ignored.
pub fn read_chunks(bytes: &[u8], verify_checksums: bool) -> Result<Vec<Chunk<'_>>> {
    if !is_png(bytes) {
        return Err(PngError::NotAPng);
    }

    let mut rest = &bytes[PNG_SIGNATURE.len()..];
    let mut chunks = Vec::new();

    loop {
        if rest.is_empty() {
            return Err(PngError::MalformedChunkStream(
                "stream ended before IEND chunk".to_string(),
            ));
        }

        let len = take_u32(&mut rest, "chunk length")?;
        if len > MAX_CHUNK_LEN {
            return Err(PngError::MalformedChunkStream(format!(
                "chunk length {} exceeds limit",
                len
            )));
        }
        let tag = take(&mut rest, 4, "chunk type")?;
        let chunk_type = ChunkType([tag[0], tag[1], tag[2], tag[3]]);
        let data = take(&mut rest, len as usize, "chunk data")?;
        let declared_crc = take_u32(&mut rest, "chunk checksum")?;

        let chunk = Chunk {
            chunk_type,
            data,
            declared_crc,
        };

        if chunks.is_empty() && chunk_type != ChunkType::IHDR {
            return Err(PngError::MalformedChunkStream(format!(
                "first chunk is {}, expected IHDR",
                chunk_type
            )));
        }

        if verify_checksums {
            let computed = chunk.computed_crc();
            if computed != declared_crc {
                return Err(PngError::MalformedChunkStream(format!(
                    "{} checksum mismatch: declared {:08X}, computed {:08X}",
                    chunk_type, declared_crc, computed
                )));
            }
        }

        chunks.push(chunk);

        if chunk_type == ChunkType::IEND {
            break;
        }
    }

    log::debug!("[Chunks] Read {} chunks", chunks.len());
    Ok(chunks)
}

/// Concatenate the content of every IDAT chunk, in file order.
pub fn image_data(chunks: &[Chunk<'_>]) -> Vec<u8> {
    let total = chunks
        .iter()
        .filter(|c| c.chunk_type == ChunkType::IDAT)
        .map(|c| c.data.len())
        .sum();
    let mut data = Vec::with_capacity(total);
    for chunk in chunks.iter().filter(|c| c.chunk_type == ChunkType::IDAT) {
        data.extend_from_slice(chunk.data);
    }
    data
}
