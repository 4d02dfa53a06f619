//! Separating interleaved alpha samples from color samples

use crate::header::HeaderInfo;

/// Color and alpha planes of an image with an alpha channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitChannels {
    /// Color samples at the source bit depth, pixel after pixel.
    pub color: Vec<u8>,
    /// One byte per pixel.
    pub alpha: Vec<u8>,
}

impl SplitChannels {
    /// Whether every pixel is fully opaque, in which case the alpha plane
    /// carries no information.
    pub fn is_opaque(&self) -> bool {
        self.alpha.iter().all(|&a| a == 0xFF)
    }
}

/// Split unfiltered gray+alpha or RGB+alpha pixel bytes.
///
/// Only 8 and 16 bit depths carry alpha channels. For 16-bit sources the
/// alpha keeps its most significant byte only. At most `width * height`
/// pixels are read, and never more than `raw` holds.
pub fn split_alpha(header: &HeaderInfo, raw: &[u8]) -> SplitChannels {
    let sample_bytes = (header.bit_depth as usize / 8).max(1);
    let color_bytes = header.color_type.colors() as usize * sample_bytes;
    let pixel_bytes = color_bytes + sample_bytes;
    let pixels = (header.width as usize)
        .saturating_mul(header.height as usize)
        .min(raw.len() / pixel_bytes);

    let mut color = Vec::with_capacity(pixels * color_bytes);
    let mut alpha = Vec::with_capacity(pixels);

    for pixel in raw.chunks_exact(pixel_bytes).take(pixels) {
        color.extend_from_slice(&pixel[..color_bytes]);
        alpha.push(pixel[color_bytes]);
    }

    SplitChannels { color, alpha }
}
