//! Error type for PNG extraction

use thiserror::Error;

/// Everything that can stop a PNG from being turned into an image XObject.
///
/// All variants are fatal for the image in question: no partial descriptor is
/// ever produced.
#[derive(Debug, Error)]
pub enum PngError {
    #[error("Not a PNG image: signature mismatch")]
    NotAPng,
    #[error("Malformed chunk stream: {0}")]
    MalformedChunkStream(String),
    #[error("Invalid PNG header: {0}")]
    InvalidHeader(String),
    #[error("Unsupported PNG color type {0}")]
    UnsupportedColorType(u8),
    #[error("Unsupported PNG interlace method {0}")]
    UnsupportedInterlace(u8),
    #[error("Indexed-color PNG has no palette")]
    MissingPalette,
    #[error("Invalid scanline filter type {0}")]
    InvalidFilterType(u8),
    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PngError>;
