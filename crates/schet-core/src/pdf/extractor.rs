//! PDF text and page image extraction using lopdf and pdf-extract.

use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{DirectTextBackend, PageRenderer, Result};
use crate::error::PdfError;

/// Stateless PDF backend: every call parses the given bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl DirectTextBackend for PdfExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String> {
        let pdf = LoadedPdf::load(data)?;
        let text = pdf_extract::extract_text_from_mem(&pdf.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
        debug!("Direct text layer: {} chars", text.len());
        Ok(text)
    }
}

impl PageRenderer for PdfExtractor {
    fn render_pages(&self, data: &[u8], max_pages: usize) -> Result<Vec<DynamicImage>> {
        let pdf = LoadedPdf::load(data)?;
        let pages = pdf.document.get_pages();
        let limit = if max_pages == 0 { pages.len() } else { max_pages };

        let mut images = Vec::new();
        for (&number, &page_id) in pages.iter().take(limit) {
            // A scanned page is one full-page image; keep the largest.
            let page_image = pdf
                .page_images(page_id)
                .into_iter()
                .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()));

            match page_image {
                Some(img) => images.push(img),
                None => trace!("Page {} has no decodable image", number),
            }
        }

        if images.is_empty() {
            return Err(PdfError::ImageExtraction("no page images found".to_string()));
        }

        debug!("Rendered {} of {} pages", images.len(), pages.len());
        Ok(images)
    }
}

/// A parsed document plus the bytes pdf-extract should read.
struct LoadedPdf {
    document: Document,
    raw_data: Vec<u8>,
}

impl LoadedPdf {
    fn load(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if document.is_encrypted() {
            // Many generated invoices are encrypted with an empty user password
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        if document.get_pages().is_empty() {
            return Err(PdfError::NoPages);
        }

        Ok(Self { document, raw_data })
    }

    fn page_images(&self, page_id: ObjectId) -> Vec<DynamicImage> {
        let doc = &self.document;
        let Some(resources) = page_resources(doc, page_id) else {
            return Vec::new();
        };
        let Ok(xobjects) = resources.get(b"XObject") else {
            return Vec::new();
        };
        let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) else {
            return Vec::new();
        };

        xobj_dict
            .iter()
            .filter_map(|(_, obj_ref)| doc.dereference(obj_ref).ok())
            .filter_map(|(_, obj)| decode_image(doc, obj))
            .collect()
    }
}

/// Resources of a page, following `Parent` links for inherited ones.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
            return Some(res_dict.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}

fn decode_image(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter");
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    image_from_raw(&data, width, height, color_space)
}

fn image_from_raw(data: &[u8], width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = width as usize * height as usize;

    let rgba: Vec<u8> = match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= pixels * 3 => data[..pixels * 3]
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        b"DeviceGray" | b"G" if data.len() >= pixels => {
            data[..pixels].iter().flat_map(|&g| [g, g, g, 255]).collect()
        }
        _ => {
            trace!(
                "Could not decode image: colorspace={:?}, data_len={}",
                String::from_utf8_lossy(color_space),
                data.len()
            );
            return None;
        }
    };

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_parse_error() {
        let err = PdfExtractor::new().extract_text(b"not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));

        let err = PdfExtractor::new().render_pages(b"", 0).unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_raw_gray_image() {
        let img = image_from_raw(&[0, 128, 255, 64], 2, 2, b"DeviceGray").unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        assert_eq!(img.to_rgba8().get_pixel(1, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_raw_image_too_short() {
        assert!(image_from_raw(&[0, 0, 0], 2, 2, b"DeviceRGB").is_none());
        assert!(image_from_raw(&[0; 12], 2, 2, b"Indexed").is_none());
    }
}
