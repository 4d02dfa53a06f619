//! Scanline filter reconstruction.
//!
//! Every scanline of inflated PNG image data starts with a filter type byte,
//! followed by the filtered pixel bytes. Reconstruction walks the rows in
//! order, keeping only the previous reconstructed row around.

use crate::error::{PngError, Result};
use crate::header::HeaderInfo;

/// Per-scanline filter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None,
    Sub,
    Up,
    Average,
    Paeth,
}

impl FilterType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(FilterType::None),
            1 => Ok(FilterType::Sub),
            2 => Ok(FilterType::Up),
            3 => Ok(FilterType::Average),
            4 => Ok(FilterType::Paeth),
            other => Err(PngError::InvalidFilterType(other)),
        }
    }
}

fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    // The order of these tests is fixed by the PNG format.
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Reverse one filtered scanline in place.
///
/// `prev` is the already reconstructed row above (all zeros for the first
/// row) and must be the same length as `row`. `bpp` is the byte distance to
/// the previous pixel.
pub fn unfilter_row(filter: FilterType, bpp: usize, prev: &[u8], row: &mut [u8]) {
    debug_assert_eq!(prev.len(), row.len());
    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        FilterType::Up => {
            for (p, b) in row.iter_mut().zip(prev) {
                *p = p.wrapping_add(*b);
            }
        }
        FilterType::Average => {
            for i in 0..row.len() {
                let a = if i >= bpp { row[i - bpp] as u16 } else { 0 };
                let b = prev[i] as u16;
                row[i] = row[i].wrapping_add(((a + b) / 2) as u8);
            }
        }
        FilterType::Paeth => {
            for i in 0..row.len() {
                let (a, c) = if i >= bpp {
                    (row[i - bpp], prev[i - bpp])
                } else {
                    (0, 0)
                };
                row[i] = row[i].wrapping_add(paeth_predictor(a, prev[i], c));
            }
        }
    }
}

/// Reconstruct raw pixel bytes from inflated image data.
///
/// The result holds `height` rows of `row_bytes` each, with the filter bytes
/// removed. Trailing bytes past the last scanline are ignored.
pub fn unfilter(header: &HeaderInfo, data: &[u8]) -> Result<Vec<u8>> {
    let (row_bytes, needed) = match (header.row_bytes(), header.image_data_len()) {
        (Some(row_bytes), Some(needed)) => (row_bytes, needed),
        _ => {
            return Err(PngError::InvalidHeader(format!(
                "image of {}x{} is too large to address",
                header.width, header.height
            )))
        }
    };
    let bpp = header.bytes_per_pixel();

    if data.len() < needed {
        return Err(PngError::MalformedChunkStream(format!(
            "image data holds {} bytes, expected {}",
            data.len(),
            needed
        )));
    }

    let mut out = Vec::with_capacity(needed - header.height as usize);
    let mut prev = vec![0u8; row_bytes];
    let mut row = vec![0u8; row_bytes];

    for line in data[..needed].chunks_exact(row_bytes + 1) {
        let filter = FilterType::from_u8(line[0])?;
        row.copy_from_slice(&line[1..]);
        unfilter_row(filter, bpp, &prev, &mut row);
        out.extend_from_slice(&row);
        std::mem::swap(&mut prev, &mut row);
    }

    Ok(out)
}
