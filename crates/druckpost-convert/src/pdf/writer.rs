// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: single-page intermediate PDFs built with `lopdf`.
//
// Output carries no timestamps or random ids, so the same input always
// serialises to the same bytes.

use druckpost_core::error::StageError;
use druckpost_core::types::MediaSize;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tracing::{debug, instrument};

/// White border kept around fitted images, in points (a quarter inch).
const IMAGE_MARGIN_PT: f32 = 18.0;

/// Raster data ready to be placed as an image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub encoding: ImageEncoding,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    fn pdf_name(&self) -> &'static str {
        match self {
            Self::Gray => "DeviceGray",
            Self::Rgb => "DeviceRGB",
        }
    }
}

/// How `EmbeddedImage::data` is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Baseline or progressive JPEG, embedded unchanged.
    Dct,
    /// zlib-compressed 8-bit samples.
    Flate,
}

impl ImageEncoding {
    fn pdf_filter(&self) -> &'static str {
        match self {
            Self::Dct => "DCTDecode",
            Self::Flate => "FlateDecode",
        }
    }
}

/// Builds one-page PDF documents on a fixed media size.
pub struct PdfWriter {
    media: MediaSize,
}

impl PdfWriter {
    pub fn new(media: MediaSize) -> Self {
        Self { media }
    }

    /// A page holding `image`, scaled to fit inside the margins and centred.
    #[instrument(skip_all, fields(media = %self.media, width = image.width, height = image.height))]
    pub fn image_page(&self, image: EmbeddedImage) -> Result<Vec<u8>, StageError> {
        if image.width == 0 || image.height == 0 {
            return Err(StageError::UnsupportedContent("image has no pixels".into()));
        }

        let (page_w, page_h) = self.media.dimensions_pt();
        let (x, y, w, h) = fit_centred(
            image.width as f32,
            image.height as f32,
            page_w - 2.0 * IMAGE_MARGIN_PT,
            page_h - 2.0 * IMAGE_MARGIN_PT,
        );
        let (x, y) = (x + IMAGE_MARGIN_PT, y + IMAGE_MARGIN_PT);

        let mut doc = Document::with_version("1.5");
        let xobject = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width),
                "Height" => i64::from(image.height),
                "ColorSpace" => image.color_space.pdf_name(),
                "BitsPerComponent" => 8,
                "Filter" => image.encoding.pdf_filter(),
            },
            image.data,
        );
        let xobject_id = doc.add_object(xobject);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let resources = dictionary! {
            "XObject" => dictionary! { "Im0" => xobject_id },
        };

        debug!(x, y, w, h, "image placed");
        self.finish(doc, content, resources)
    }

    /// A page of Helvetica text lines starting near the top-left corner.
    #[instrument(skip_all, fields(media = %self.media, lines = lines.len()))]
    pub fn text_page(&self, lines: &[String]) -> Result<Vec<u8>, StageError> {
        let (_, page_h) = self.media.dimensions_pt();
        let font_size: f32 = 18.0;
        let leading: f32 = 26.0;

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), font_size.into()]),
            Operation::new("TL", vec![leading.into()]),
            Operation::new("Td", vec![72.into(), (page_h - 96.0).into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(latin1(line))]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        self.finish(doc, Content { operations }, resources)
    }

    /// Add page tree and catalog around one page and serialise.
    fn finish(
        &self,
        mut doc: Document,
        content: Content,
        resources: lopdf::Dictionary,
    ) -> Result<Vec<u8>, StageError> {
        let (page_w, page_h) = self.media.dimensions_pt();

        let encoded = content.encode().map_err(|err| {
            StageError::UnsupportedContent(format!("PDF content encoding failed: {err}"))
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(|err| {
            StageError::UnsupportedContent(format!("PDF serialisation failed: {err}"))
        })?;
        Ok(out)
    }
}

/// Largest `w x h` box with the image's aspect ratio inside `max_w x max_h`,
/// centred. Returns (x, y, width, height).
fn fit_centred(img_w: f32, img_h: f32, max_w: f32, max_h: f32) -> (f32, f32, f32, f32) {
    let scale = (max_w / img_w).min(max_h / img_h);
    let (w, h) = (img_w * scale, img_h * scale);
    ((max_w - w) / 2.0, (max_h - h) / 2.0, w, h)
}

/// Map to WinAnsi bytes; characters outside Latin-1 become '?'.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::PdfReader;

    fn gray_pixel() -> EmbeddedImage {
        EmbeddedImage {
            width: 1,
            height: 1,
            color_space: ColorSpace::Gray,
            encoding: ImageEncoding::Flate,
            data: vec![0x78, 0x9c, 0x63, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01],
        }
    }

    #[test]
    fn fit_keeps_aspect_and_centres() {
        let (x, y, w, h) = fit_centred(200.0, 100.0, 400.0, 400.0);
        assert_eq!((w, h), (400.0, 200.0));
        assert_eq!((x, y), (0.0, 100.0));
    }

    #[test]
    fn image_page_is_a_single_page_pdf() {
        let pdf = PdfWriter::new(MediaSize::A4).image_page(gray_pixel()).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));
        assert_eq!(PdfReader::from_bytes(&pdf).unwrap().page_count(), 1);
    }

    #[test]
    fn output_is_deterministic() {
        let writer = PdfWriter::new(MediaSize::Letter);
        assert_eq!(
            writer.image_page(gray_pixel()).unwrap(),
            writer.image_page(gray_pixel()).unwrap()
        );
        let lines = vec!["DRUCKPOST TEST PAGE".to_string()];
        assert_eq!(writer.text_page(&lines).unwrap(), writer.text_page(&lines).unwrap());
    }

    #[test]
    fn empty_image_is_rejected() {
        let mut image = gray_pixel();
        image.width = 0;
        assert!(PdfWriter::new(MediaSize::A4).image_page(image).is_err());
    }

    #[test]
    fn text_page_uses_the_media_box() {
        let pdf = PdfWriter::new(MediaSize::Legal)
            .text_page(&["hello".to_string()])
            .unwrap();
        let reader = PdfReader::from_bytes(&pdf).unwrap();
        assert_eq!(reader.page_count(), 1);
        assert_eq!(reader.media_box(1), Some((612.0, 1008.0)));
    }

    #[test]
    fn non_latin_characters_are_replaced() {
        assert_eq!(latin1("Grüße €"), vec![b'G', b'r', 0xfc, 0xdf, b'e', b' ', b'?']);
    }
}
