//! PNG to PDF Image XObject Library
//!
//! Core logic for embedding PNG images in PDF documents. Parses the PNG
//! container, keeps the compressed image data where the PDF `FlateDecode`
//! filter with a PNG predictor can consume it as is, and otherwise decodes the
//! pixels to move the alpha channel into a soft mask.
//!
//! Streams are registered with the host document through [`ObjectAllocator`],
//! which `lopdf::Document` implements.

pub mod alpha;
pub mod chunk;
pub mod codec;
pub mod error;
pub mod filter;
pub mod header;
pub mod pdf;
pub mod png;

pub use chunk::is_png;
pub use error::{PngError, Result};
pub use header::{ColorType, HeaderInfo, PaletteTable, TransparencyInfo};
pub use pdf::{
    build_image_xobject, raise_document_version, ColorSpace, ImageDescriptor, ObjectAllocator,
    PdfVersion, PredictorParams,
};
pub use png::{PngImage, PngOptions};

/// What a PDF writer needs from an image format to embed it as an image
/// XObject.
pub trait EmbeddableImage {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn bits_per_component(&self) -> u8;
    fn color_space(&self) -> ColorSpace;
    /// `FlateDecode`-compressed sample data.
    fn primary_stream(&self) -> &[u8];
    /// `FlateDecode`-compressed 8-bit alpha plane.
    fn soft_mask(&self) -> Option<&[u8]>;
    /// Color key mask ranges, two numbers per color component.
    fn mask(&self) -> Option<&[u32]>;
    fn decode_parms(&self) -> Option<PredictorParams>;
    fn min_pdf_version(&self) -> PdfVersion;

    fn build_pdf_object(&self, alloc: &mut dyn ObjectAllocator) -> ImageDescriptor {
        build_image_xobject(self, alloc)
    }
}

/// Image formats this crate can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
}

impl ImageFormat {
    /// Detect the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        if is_png(bytes) {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }
}

/// Parse `bytes` with the codec matching their format.
pub fn load_image(bytes: &[u8]) -> Result<Box<dyn EmbeddableImage>> {
    match ImageFormat::sniff(bytes) {
        Some(ImageFormat::Png) => Ok(Box::new(PngImage::new(bytes)?)),
        None => Err(PngError::NotAPng),
    }
}
