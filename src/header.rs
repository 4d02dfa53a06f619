//! Header, palette and transparency chunk decoding

use crate::chunk::{Chunk, ChunkType};
use crate::error::{PngError, Result};

/// PNG color model, as stored in the header chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorType {
    Grayscale,
    Truecolor,
    Indexed,
    GrayscaleAlpha,
    TruecolorAlpha,
}

impl ColorType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ColorType::Grayscale),
            2 => Ok(ColorType::Truecolor),
            3 => Ok(ColorType::Indexed),
            4 => Ok(ColorType::GrayscaleAlpha),
            6 => Ok(ColorType::TruecolorAlpha),
            other => Err(PngError::UnsupportedColorType(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            ColorType::Grayscale => 0,
            ColorType::Truecolor => 2,
            ColorType::Indexed => 3,
            ColorType::GrayscaleAlpha => 4,
            ColorType::TruecolorAlpha => 6,
        }
    }

    /// Color components per pixel, not counting alpha. Indexed pixels are a
    /// single palette index.
    pub fn colors(self) -> u8 {
        match self {
            ColorType::Grayscale | ColorType::Indexed | ColorType::GrayscaleAlpha => 1,
            ColorType::Truecolor | ColorType::TruecolorAlpha => 3,
        }
    }

    /// Samples per pixel, alpha included.
    pub fn channels(self) -> u8 {
        self.colors() + u8::from(self.has_alpha())
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ColorType::GrayscaleAlpha | ColorType::TruecolorAlpha)
    }

    fn allowed_bit_depths(self) -> &'static [u8] {
        match self {
            ColorType::Grayscale => &[1, 2, 4, 8, 16],
            ColorType::Indexed => &[1, 2, 4, 8],
            ColorType::Truecolor | ColorType::GrayscaleAlpha | ColorType::TruecolorAlpha => {
                &[8, 16]
            }
        }
    }
}

/// Largest width or height a PNG header may declare.
pub const MAX_DIMENSION: u32 = 0x7FFF_FFFF;

/// Decoded IHDR fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderInfo {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub interlace_method: u8,
}

impl HeaderInfo {
    /// Decode and validate the header chunk.
    pub fn from_chunk(chunk: &Chunk<'_>) -> Result<Self> {
        let data = chunk.data;
        if data.len() < 13 {
            return Err(PngError::MalformedChunkStream(format!(
                "IHDR holds {} bytes, expected 13",
                data.len()
            )));
        }

        let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let bit_depth = data[8];
        let color_type = ColorType::from_u8(data[9])?;
        let compression_method = data[10];
        let filter_method = data[11];
        let interlace_method = data[12];

        if interlace_method != 0 {
            return Err(PngError::UnsupportedInterlace(interlace_method));
        }
        if width == 0 || height == 0 {
            return Err(PngError::InvalidHeader(format!(
                "image dimensions {}x{} are empty",
                width, height
            )));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(PngError::InvalidHeader(format!(
                "image dimensions {}x{} exceed {}",
                width, height, MAX_DIMENSION
            )));
        }
        if !color_type.allowed_bit_depths().contains(&bit_depth) {
            return Err(PngError::InvalidHeader(format!(
                "bit depth {} is not allowed for color type {}",
                bit_depth,
                color_type.as_u8()
            )));
        }
        if compression_method != 0 {
            return Err(PngError::InvalidHeader(format!(
                "unknown compression method {}",
                compression_method
            )));
        }
        if filter_method != 0 {
            return Err(PngError::InvalidHeader(format!(
                "unknown filter method {}",
                filter_method
            )));
        }

        let header = HeaderInfo {
            width,
            height,
            bit_depth,
            color_type,
            interlace_method,
        };
        if header.image_data_len().is_none() {
            return Err(PngError::InvalidHeader(format!(
                "image of {}x{} at {} bits per sample is too large to address",
                width, height, bit_depth
            )));
        }
        Ok(header)
    }

    /// Bytes of pixel data in one scanline, without the filter byte.
    ///
    /// `None` when the size does not fit in `usize`.
    pub fn row_bytes(&self) -> Option<usize> {
        let sample_bits = self.color_type.channels() as usize * self.bit_depth as usize;
        let bits = (self.width as usize).checked_mul(sample_bits)?;
        Some(bits.div_ceil(8))
    }

    /// Length of the inflated image data: every scanline plus its filter
    /// byte. `None` when the size does not fit in `usize`.
    pub fn image_data_len(&self) -> Option<usize> {
        self.row_bytes()?
            .checked_add(1)?
            .checked_mul(self.height as usize)
    }

    /// Distance in bytes to the corresponding byte of the previous pixel, as
    /// used by the scanline filters. Never less than one.
    pub fn bytes_per_pixel(&self) -> usize {
        let bits = self.color_type.channels() as usize * self.bit_depth as usize;
        bits.div_ceil(8).max(1)
    }
}

/// RGB palette entries from the PLTE chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaletteTable {
    entries: Vec<[u8; 3]>,
}

impl PaletteTable {
    pub fn from_chunk(chunk: &Chunk<'_>) -> Result<Self> {
        let data = chunk.data;
        if data.is_empty() || data.len() % 3 != 0 {
            return Err(PngError::InvalidHeader(format!(
                "palette length {} is not a positive multiple of 3",
                data.len()
            )));
        }
        let entries: Vec<[u8; 3]> = data.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        if entries.len() > 256 {
            return Err(PngError::InvalidHeader(format!(
                "palette has {} entries, at most 256 allowed",
                entries.len()
            )));
        }
        Ok(PaletteTable { entries })
    }

    pub fn entries(&self) -> &[[u8; 3]] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The palette as packed RGB bytes, the layout an indexed color space
    /// lookup table uses.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.entries.iter().flatten().copied().collect()
    }
}

/// Decoded tRNS chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransparencyInfo {
    /// Grayscale sample value treated as fully transparent.
    GrayKey(u16),
    /// Alpha per palette index. Indices past the end are opaque.
    PaletteAlpha(Vec<u8>),
}

impl TransparencyInfo {
    /// Decode a tRNS chunk for the given color type.
    ///
    /// Returns `None` where the chunk carries nothing this crate can use:
    /// truecolor keys are not supported and the alpha color types may not
    /// carry the chunk at all.
    pub fn from_chunk(chunk: &Chunk<'_>, color_type: ColorType) -> Result<Option<Self>> {
        let data = chunk.data;
        match color_type {
            ColorType::Grayscale => {
                if data.len() < 2 {
                    return Err(PngError::MalformedChunkStream(format!(
                        "grayscale tRNS holds {} bytes, expected 2",
                        data.len()
                    )));
                }
                Ok(Some(TransparencyInfo::GrayKey(u16::from_be_bytes([
                    data[0], data[1],
                ]))))
            }
            ColorType::Indexed => Ok(Some(TransparencyInfo::PaletteAlpha(data.to_vec()))),
            ColorType::Truecolor => {
                log::warn!("[Header] Ignoring tRNS chunk: truecolor color keys are not supported");
                Ok(None)
            }
            ColorType::GrayscaleAlpha | ColorType::TruecolorAlpha => {
                log::warn!("[Header] Ignoring tRNS chunk on an image with an alpha channel");
                Ok(None)
            }
        }
    }

    /// Alpha for a palette index; 255 for anything the chunk does not cover.
    pub fn palette_alpha(&self, index: usize) -> u8 {
        match self {
            TransparencyInfo::PaletteAlpha(alphas) => alphas.get(index).copied().unwrap_or(255),
            TransparencyInfo::GrayKey(_) => 255,
        }
    }
}

/// Find the header, palette and transparency among the chunks and validate
/// that they fit together.
pub fn read_metadata(
    chunks: &[Chunk<'_>],
) -> Result<(HeaderInfo, Option<PaletteTable>, Option<TransparencyInfo>)> {
    let first = chunks.first().ok_or_else(|| {
        PngError::MalformedChunkStream("stream holds no chunks".to_string())
    })?;
    if first.chunk_type != ChunkType::IHDR {
        return Err(PngError::MalformedChunkStream(format!(
            "first chunk is {}, expected IHDR",
            first.chunk_type
        )));
    }
    let header = HeaderInfo::from_chunk(first)?;
    log::debug!(
        "[Header] {}x{}, {} bits, color type {}",
        header.width,
        header.height,
        header.bit_depth,
        header.color_type.as_u8()
    );

    let mut palette = None;
    let mut transparency = None;
    for chunk in &chunks[1..] {
        if chunk.chunk_type == ChunkType::PLTE && palette.is_none() {
            palette = Some(PaletteTable::from_chunk(chunk)?);
        } else if chunk.chunk_type == ChunkType::tRNS && transparency.is_none() {
            transparency = TransparencyInfo::from_chunk(chunk, header.color_type)?;
        }
    }

    match header.color_type {
        ColorType::Indexed => {
            if palette.is_none() {
                return Err(PngError::MissingPalette);
            }
        }
        _ => {
            // A palette on a non-indexed image is only a quantization hint.
            palette = None;
        }
    }

    Ok((header, palette, transparency))
}
