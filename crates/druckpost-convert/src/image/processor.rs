// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decodes submitted pictures and prepares the samples that
// get embedded into the intermediate PDF.

use std::io::Write;

use druckpost_core::error::StageError;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use tracing::{debug, info, instrument};

use crate::pdf::{ColorSpace, EmbeddedImage, ImageEncoding};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns the transformed processor:
///
/// ```ignore
/// let embedded = ImageProcessor::from_bytes(&png)?
///     .limit_size(4960, 7016)
///     .flatten_alpha()
///     .into_embedded()?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    /// Decode raw encoded bytes (PNG, WEBP, JPEG, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, StageError> {
        let img = image::load_from_memory(data).map_err(|err| {
            StageError::UnsupportedContent(format!("failed to decode image: {err}"))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Downscale to fit within `max_width` x `max_height`, preserving aspect
    /// ratio. Images already inside the bounds are left alone.
    #[instrument(skip(self), fields(max_width, max_height))]
    pub fn limit_size(self, max_width: u32, max_height: u32) -> Self {
        let (w, h) = self.image.dimensions();
        if w <= max_width && h <= max_height {
            return self;
        }
        info!(from_w = w, from_h = h, max_width, max_height, "Downscaling image");
        let resized =
            self.image
                .resize(max_width, max_height, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    /// Composite transparent pixels over white paper.
    #[instrument(skip(self))]
    pub fn flatten_alpha(self) -> Self {
        if !self.image.color().has_alpha() {
            return self;
        }
        let rgba = self.image.to_rgba8();
        let flattened = ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
            let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let blend = |channel: u8| -> u8 {
                let alpha = u16::from(a);
                ((u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
            };
            image::Rgb([blend(r), blend(g), blend(b)])
        });
        Self {
            image: DynamicImage::ImageRgb8(flattened),
        }
    }

    /// zlib-compress the samples as 8-bit gray or RGB.
    pub fn into_embedded(self) -> Result<EmbeddedImage, StageError> {
        let (width, height) = self.image.dimensions();
        let (color_space, samples) = if self.image.color().has_color() {
            (ColorSpace::Rgb, self.image.to_rgb8().into_raw())
        } else {
            (ColorSpace::Gray, self.image.to_luma8().into_raw())
        };

        let mut encoder = ZlibEncoder::new(Vec::with_capacity(samples.len() / 4), Compression::default());
        encoder.write_all(&samples)?;
        let data = encoder.finish()?;

        debug!(width, height, ?color_space, compressed = data.len(), "Image samples compressed");
        Ok(EmbeddedImage {
            width,
            height,
            color_space,
            encoding: ImageEncoding::Flate,
            data,
        })
    }
}

/// Frame header fields of a JPEG file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegHeader {
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

/// Read the start-of-frame header of a JPEG without decoding it.
///
/// Returns `None` if `data` is not a JPEG or the header is malformed.
pub fn jpeg_header(data: &[u8]) -> Option<JpegHeader> {
    if !data.starts_with(&[0xff, 0xd8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xff {
            return None;
        }
        let marker = data[pos + 1];
        // Fill bytes and standalone markers carry no length.
        if marker == 0xff {
            pos += 1;
            continue;
        }
        if marker == 0x01 || (0xd0..=0xd7).contains(&marker) {
            pos += 2;
            continue;
        }
        let len = usize::from(u16::from_be_bytes([data[pos + 2], data[pos + 3]]));
        if len < 2 {
            return None;
        }
        let is_sof = (0xc0..=0xcf).contains(&marker) && !matches!(marker, 0xc4 | 0xc8 | 0xcc);
        if is_sof {
            let seg = data.get(pos + 4..pos + 2 + len)?;
            if seg.len() < 6 {
                return None;
            }
            let height = u32::from(u16::from_be_bytes([seg[1], seg[2]]));
            let width = u32::from(u16::from_be_bytes([seg[3], seg[4]]));
            return Some(JpegHeader {
                width,
                height,
                components: seg[5],
            });
        }
        if marker == 0xda {
            // Start of scan before any frame header.
            return None;
        }
        pos += 2 + len;
    }
    None
}

/// Embed a JPEG unchanged when it is gray or RGB and its header is sane.
pub fn passthrough_jpeg(data: &[u8]) -> Option<EmbeddedImage> {
    let header = jpeg_header(data)?;
    let color_space = match header.components {
        1 => ColorSpace::Gray,
        3 => ColorSpace::Rgb,
        _ => return None,
    };
    if header.width == 0 || header.height == 0 {
        return None;
    }
    Some(EmbeddedImage {
        width: header.width,
        height: header.height,
        color_space,
        encoding: ImageEncoding::Dct,
        data: data.to_vec(),
    })
}
