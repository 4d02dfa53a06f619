//! A PNG prepared for embedding
//!
//! All the work happens in [`PngImage::with_options`]; afterwards the image is
//! read-only and only holds the compressed streams.
//!
//! Grayscale, truecolor and indexed images keep their IDAT data untouched: a
//! PDF reader undoes the PNG row filters itself when told to by a predictor.
//! Images with an alpha channel have to be decoded so the alpha samples can
//! move into a separate soft mask.

use crate::alpha::split_alpha;
use crate::chunk::{image_data, read_chunks};
use crate::codec::{deflate, inflate_limited};
use crate::error::{PngError, Result};
use crate::filter::unfilter;
use crate::header::{read_metadata, ColorType, HeaderInfo, PaletteTable, TransparencyInfo};
use crate::pdf::{
    build_image_xobject, ColorSpace, ImageDescriptor, ObjectAllocator, PdfVersion, PredictorParams,
};
use crate::EmbeddableImage;
use flate2::Compression;

/// Options for PNG extraction
#[derive(Debug, Clone, Copy)]
pub struct PngOptions {
    /// Check every chunk's CRC-32 against its declared value
    pub verify_checksums: bool,
    /// Compression level for streams that have to be re-encoded
    pub compression: Compression,
}

impl Default for PngOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            compression: Compression::default(),
        }
    }
}

/// PNG data ready to become an image XObject.
#[derive(Debug, Clone)]
pub struct PngImage {
    header: HeaderInfo,
    palette: Option<PaletteTable>,
    transparency: Option<TransparencyInfo>,
    color_space: ColorSpace,
    img_data: Vec<u8>,
    alpha_data: Option<Vec<u8>>,
    mask: Option<Vec<u32>>,
    decode_parms: Option<PredictorParams>,
    min_version: PdfVersion,
}

impl PngImage {
    /// Whether `bytes` look like a PNG at all.
    pub fn can_render(bytes: &[u8]) -> bool {
        crate::chunk::is_png(bytes)
    }

    pub fn new(bytes: &[u8]) -> Result<Self> {
        Self::with_options(bytes, &PngOptions::default())
    }

    pub fn with_options(bytes: &[u8], options: &PngOptions) -> Result<Self> {
        let chunks = read_chunks(bytes, options.verify_checksums)?;
        let (header, palette, transparency) = read_metadata(&chunks)?;
        log::debug!("[Png] Header validated");

        let idat = image_data(&chunks);
        if idat.is_empty() {
            return Err(PngError::MalformedChunkStream(
                "no IDAT chunk data".to_string(),
            ));
        }

        let color_space = match &palette {
            Some(palette) => ColorSpace::Indexed {
                lookup: palette.to_bytes(),
            },
            None if header.color_type.colors() == 1 => ColorSpace::DeviceGray,
            None => ColorSpace::DeviceRgb,
        };

        let (img_data, alpha_data, decode_parms) = if header.color_type.has_alpha() {
            let (color, alpha) = extract_split(&header, &idat, options.compression)?;
            (color, alpha, None)
        } else {
            log::debug!("[Png] Passing {} bytes of image data through", idat.len());
            let params = PredictorParams::png_optimum(
                header.color_type.colors(),
                header.bit_depth,
                header.width,
            );
            (idat, None, Some(params))
        };

        let mask = match &transparency {
            Some(trns) if alpha_data.is_none() => color_key_mask(trns, palette.as_ref()),
            _ => None,
        };

        let min_version = PdfVersion::required_for(header.bit_depth, alpha_data.is_some());
        log::debug!(
            "[Png] Extracted: alpha {}, mask {:?}, needs PDF {}",
            alpha_data.is_some(),
            mask,
            min_version
        );

        Ok(PngImage {
            header,
            palette,
            transparency,
            color_space,
            img_data,
            alpha_data,
            mask,
            decode_parms,
            min_version,
        })
    }

    pub fn header(&self) -> &HeaderInfo {
        &self.header
    }

    /// Bits per color component in the primary stream.
    pub fn bits(&self) -> u8 {
        self.header.bit_depth
    }

    pub fn color_type(&self) -> ColorType {
        self.header.color_type
    }

    /// Color components per pixel in the primary stream.
    pub fn colors(&self) -> u8 {
        self.header.color_type.colors()
    }

    pub fn palette(&self) -> Option<&PaletteTable> {
        self.palette.as_ref()
    }

    pub fn transparency(&self) -> Option<&TransparencyInfo> {
        self.transparency.as_ref()
    }

    /// Zlib-compressed primary image data.
    pub fn img_data(&self) -> &[u8] {
        &self.img_data
    }

    /// Zlib-compressed alpha plane, if any pixel is not fully opaque.
    pub fn alpha_data(&self) -> Option<&[u8]> {
        self.alpha_data.as_deref()
    }

    pub fn has_alpha_channel(&self) -> bool {
        self.alpha_data.is_some()
    }

    /// Write the image (and its soft mask and palette, when present) into
    /// `alloc`.
    pub fn build_pdf_object<A: ObjectAllocator + ?Sized>(&self, alloc: &mut A) -> ImageDescriptor {
        build_image_xobject(self, alloc)
    }
}

/// Decode image data carrying alpha and re-encode the color and alpha
/// planes separately. The alpha plane is dropped when fully opaque.
fn extract_split(
    header: &HeaderInfo,
    idat: &[u8],
    level: Compression,
) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
    let needed = header.image_data_len().ok_or_else(|| {
        PngError::InvalidHeader(format!(
            "image of {}x{} is too large to address",
            header.width, header.height
        ))
    })?;
    let inflated = inflate_limited(idat, needed)?;
    let raw = unfilter(header, &inflated)?;
    drop(inflated);

    let split = split_alpha(header, &raw);
    drop(raw);

    let color = deflate(&split.color, level)?;
    let alpha = if split.is_opaque() {
        log::debug!("[Png] Alpha channel is fully opaque, dropping soft mask");
        None
    } else {
        Some(deflate(&split.alpha, level)?)
    };
    Ok((color, alpha))
}

/// Color key `/Mask` ranges for an image without an alpha channel.
///
/// A grayscale key maps directly. For palettes only fully transparent indices
/// can be keyed, and only as one contiguous range, so the first run of them
/// is used.
fn color_key_mask(trns: &TransparencyInfo, palette: Option<&PaletteTable>) -> Option<Vec<u32>> {
    match trns {
        TransparencyInfo::GrayKey(key) => Some(vec![*key as u32, *key as u32]),
        TransparencyInfo::PaletteAlpha(_) => {
            let entries = palette.map_or(0, |p| p.len());
            let alphas: Vec<u8> = (0..entries).map(|i| trns.palette_alpha(i)).collect();

            if alphas.iter().any(|&a| a != 0 && a != 255) {
                log::warn!("[Png] Partially transparent palette entries are rendered opaque");
            }

            let start = alphas.iter().position(|&a| a == 0)?;
            let run = alphas[start..].iter().take_while(|&&a| a == 0).count();
            let end = start + run - 1;
            if alphas[end + 1..].contains(&0) {
                log::warn!("[Png] Only palette indices {}..={} can be masked", start, end);
            }
            Some(vec![start as u32, end as u32])
        }
    }
}

impl EmbeddableImage for PngImage {
    fn width(&self) -> u32 {
        self.header.width
    }

    fn height(&self) -> u32 {
        self.header.height
    }

    fn bits_per_component(&self) -> u8 {
        self.header.bit_depth
    }

    fn color_space(&self) -> ColorSpace {
        self.color_space.clone()
    }

    fn primary_stream(&self) -> &[u8] {
        &self.img_data
    }

    fn soft_mask(&self) -> Option<&[u8]> {
        self.alpha_data.as_deref()
    }

    fn mask(&self) -> Option<&[u32]> {
        self.mask.as_deref()
    }

    fn decode_parms(&self) -> Option<PredictorParams> {
        self.decode_parms
    }

    fn min_pdf_version(&self) -> PdfVersion {
        self.min_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette(n: usize) -> PaletteTable {
        let data = vec![0u8; n * 3];
        let chunk = crate::chunk::Chunk {
            chunk_type: crate::chunk::ChunkType::PLTE,
            data: &data,
            declared_crc: 0,
        };
        PaletteTable::from_chunk(&chunk).unwrap()
    }

    #[test]
    fn gray_key_masks_one_value() {
        let mask = color_key_mask(&TransparencyInfo::GrayKey(7), None);
        assert_eq!(mask, Some(vec![7, 7]));
    }

    #[test]
    fn palette_mask_uses_first_transparent_run() {
        let trns = TransparencyInfo::PaletteAlpha(vec![255, 0, 0, 255, 0]);
        assert_eq!(color_key_mask(&trns, Some(&palette(8))), Some(vec![1, 2]));
    }

    #[test]
    fn palette_mask_ignores_indices_past_the_array() {
        let trns = TransparencyInfo::PaletteAlpha(vec![255, 255]);
        assert_eq!(color_key_mask(&trns, Some(&palette(4))), None);

        let trns = TransparencyInfo::PaletteAlpha(vec![255, 0]);
        assert_eq!(color_key_mask(&trns, Some(&palette(4))), Some(vec![1, 1]));
    }
}
