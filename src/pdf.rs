//! Building image XObjects from extracted image data
//!
//! The host document owns the object graph; this module only needs a way to
//! register streams in it, expressed as [`ObjectAllocator`].

use crate::EmbeddableImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::fmt;

/// Anything that can take ownership of a stream object and hand back an
/// indirect reference to it.
pub trait ObjectAllocator {
    fn add_stream(&mut self, stream: Stream) -> ObjectId;
}

impl ObjectAllocator for Document {
    fn add_stream(&mut self, stream: Stream) -> ObjectId {
        self.add_object(Object::Stream(stream))
    }
}

/// A PDF header version, ordered the way versions compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub const V1_0: PdfVersion = PdfVersion { major: 1, minor: 0 };
    /// Transparency groups, needed for soft masks.
    pub const V1_4: PdfVersion = PdfVersion { major: 1, minor: 4 };
    /// 16 bits per component.
    pub const V1_5: PdfVersion = PdfVersion { major: 1, minor: 5 };

    /// Parse a version such as `"1.7"`.
    pub fn parse(s: &str) -> Option<PdfVersion> {
        let (major, minor) = s.trim().split_once('.')?;
        Some(PdfVersion {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    /// Version needed for an image with the given properties.
    pub fn required_for(bits_per_component: u8, has_soft_mask: bool) -> PdfVersion {
        if bits_per_component > 8 {
            PdfVersion::V1_5
        } else if has_soft_mask {
            PdfVersion::V1_4
        } else {
            PdfVersion::V1_0
        }
    }
}

impl fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Raise a document's header version so it can hold an image requiring
/// `required`. Never lowers it.
pub fn raise_document_version(doc: &mut Document, required: PdfVersion) {
    let current = PdfVersion::parse(&doc.version);
    if current.map_or(true, |v| v < required) {
        log::debug!(
            "[Pdf] Raising document version from {} to {}",
            doc.version,
            required
        );
        doc.version = required.to_string();
    }
}

/// Color space of an embedded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    /// Palette indices into an RGB lookup table, three bytes per entry.
    Indexed { lookup: Vec<u8> },
}

impl ColorSpace {
    /// Highest valid index of an indexed color space.
    pub fn hival(&self) -> Option<u8> {
        match self {
            ColorSpace::Indexed { lookup } => Some((lookup.len() / 3).saturating_sub(1) as u8),
            _ => None,
        }
    }

    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::DeviceRgb => 3,
            ColorSpace::DeviceGray | ColorSpace::Indexed { .. } => 1,
        }
    }
}

/// `/DecodeParms` for a stream still carrying PNG row filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    /// 15: PNG predictors, chosen per row.
    pub predictor: u8,
    pub colors: u8,
    pub bits_per_component: u8,
    pub columns: u32,
}

impl PredictorParams {
    pub fn png_optimum(colors: u8, bits_per_component: u8, columns: u32) -> Self {
        PredictorParams {
            predictor: 15,
            colors,
            bits_per_component,
            columns,
        }
    }

    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Predictor", Object::Integer(self.predictor as i64));
        dict.set("Colors", Object::Integer(self.colors as i64));
        dict.set("BitsPerComponent", Object::Integer(self.bits_per_component as i64));
        dict.set("Columns", Object::Integer(self.columns as i64));
        dict
    }
}

/// What was written for one image, with references into the allocator.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    /// The image XObject itself.
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: ColorSpace,
    /// Stream holding the lookup table of an indexed color space.
    pub palette_id: Option<ObjectId>,
    pub filter: &'static str,
    pub smask_id: Option<ObjectId>,
    pub mask: Option<Vec<u32>>,
    pub decode_parms: Option<PredictorParams>,
    pub min_version: PdfVersion,
}

fn image_dictionary(width: u32, height: u32, bits_per_component: u8, len: usize) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("BitsPerComponent", Object::Integer(bits_per_component as i64));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    dict.set("Length", Object::Integer(len as i64));
    dict
}

/// Register the streams for `image` with `alloc` and describe the result.
///
/// The soft mask and the palette are written first so the image dictionary
/// can reference them.
pub fn build_image_xobject<I, A>(image: &I, alloc: &mut A) -> ImageDescriptor
where
    I: EmbeddableImage + ?Sized,
    A: ObjectAllocator + ?Sized,
{
    let width = image.width();
    let height = image.height();
    let bits = image.bits_per_component();
    let primary = image.primary_stream();

    let mut dict = image_dictionary(width, height, bits, primary.len());

    let smask_id = image.soft_mask().map(|alpha| {
        let mut smask_dict = image_dictionary(width, height, 8, alpha.len());
        smask_dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
        smask_dict.set(
            "Decode",
            Object::Array(vec![Object::Integer(0), Object::Integer(1)]),
        );
        alloc.add_stream(Stream::new(smask_dict, alpha.to_vec()))
    });

    let color_space = image.color_space();
    let mut palette_id = None;
    match &color_space {
        ColorSpace::DeviceGray => {
            dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
        }
        ColorSpace::DeviceRgb => {
            dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        }
        ColorSpace::Indexed { lookup } => {
            let mut palette_dict = Dictionary::new();
            palette_dict.set("Length", Object::Integer(lookup.len() as i64));
            let id = alloc.add_stream(Stream::new(palette_dict, lookup.clone()));
            palette_id = Some(id);
            dict.set(
                "ColorSpace",
                Object::Array(vec![
                    Object::Name(b"Indexed".to_vec()),
                    Object::Name(b"DeviceRGB".to_vec()),
                    Object::Integer(color_space.hival().unwrap_or(0) as i64),
                    Object::Reference(id),
                ]),
            );
        }
    }

    let decode_parms = image.decode_parms();
    if let Some(params) = decode_parms {
        dict.set("DecodeParms", Object::Dictionary(params.to_dictionary()));
    }

    let mask = image.mask().map(|m| m.to_vec());
    if let Some(id) = smask_id {
        dict.set("SMask", Object::Reference(id));
    } else if let Some(ranges) = &mask {
        dict.set(
            "Mask",
            Object::Array(ranges.iter().map(|&v| Object::Integer(v as i64)).collect()),
        );
    }

    let id = alloc.add_stream(Stream::new(dict, primary.to_vec()));
    log::debug!(
        "[Pdf] Image XObject {:?}: {}x{}, {} bpc, smask {:?}",
        id,
        width,
        height,
        bits,
        smask_id
    );

    ImageDescriptor {
        id,
        width,
        height,
        bits_per_component: bits,
        color_space,
        palette_id,
        filter: "FlateDecode",
        smask_id,
        mask: if smask_id.is_some() { None } else { mask },
        decode_parms,
        min_version: image.min_pdf_version(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_compare_and_print() {
        assert!(PdfVersion::V1_0 < PdfVersion::V1_4);
        assert!(PdfVersion::V1_4 < PdfVersion::V1_5);
        assert_eq!(PdfVersion::V1_4.to_string(), "1.4");
        assert_eq!(PdfVersion::parse("1.7"), Some(PdfVersion { major: 1, minor: 7 }));
        assert_eq!(PdfVersion::parse("junk"), None);
    }

    #[test]
    fn required_version_prefers_bit_depth() {
        assert_eq!(PdfVersion::required_for(8, false), PdfVersion::V1_0);
        assert_eq!(PdfVersion::required_for(8, true), PdfVersion::V1_4);
        assert_eq!(PdfVersion::required_for(16, true), PdfVersion::V1_5);
        assert_eq!(PdfVersion::required_for(16, false), PdfVersion::V1_5);
    }

    #[test]
    fn document_version_only_goes_up() {
        let mut doc = Document::with_version("1.3");
        raise_document_version(&mut doc, PdfVersion::V1_4);
        assert_eq!(doc.version, "1.4");
        raise_document_version(&mut doc, PdfVersion::V1_0);
        assert_eq!(doc.version, "1.4");
    }

    #[test]
    fn hival_is_last_palette_index() {
        let cs = ColorSpace::Indexed {
            lookup: vec![0; 3 * 16],
        };
        assert_eq!(cs.hival(), Some(15));
        assert_eq!(cs.components(), 1);
        assert_eq!(ColorSpace::DeviceRgb.hival(), None);
    }

    #[test]
    fn predictor_dictionary_entries() {
        let dict = PredictorParams::png_optimum(3, 8, 258).to_dictionary();
        assert_eq!(dict.get(b"Predictor").unwrap().as_i64().unwrap(), 15);
        assert_eq!(dict.get(b"Colors").unwrap().as_i64().unwrap(), 3);
        assert_eq!(dict.get(b"BitsPerComponent").unwrap().as_i64().unwrap(), 8);
        assert_eq!(dict.get(b"Columns").unwrap().as_i64().unwrap(), 258);
    }
}
