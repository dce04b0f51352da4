// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: picture to single-page PDF.

pub mod processor;

use async_trait::async_trait;
use druckpost_core::error::StageError;
use druckpost_core::types::Stage;
use tracing::{debug, instrument};

use crate::converter::{Converter, StageInput};
use crate::pdf::PdfWriter;

pub use processor::{ImageProcessor, JpegHeader, jpeg_header, passthrough_jpeg};

/// Places a picture on one page of the job's media size.
///
/// Gray and RGB JPEGs are embedded as-is; everything else is decoded, limited
/// to the raster resolution and embedded losslessly.
#[derive(Debug, Clone)]
pub struct ImageConverter {
    raster_dpi: u32,
}

impl ImageConverter {
    pub fn new(raster_dpi: u32) -> Self {
        Self {
            raster_dpi: raster_dpi.max(1),
        }
    }
}

#[async_trait]
impl Converter for ImageConverter {
    fn stage(&self) -> Stage {
        Stage::ImageToPdf
    }

    #[instrument(skip_all, fields(file_name = %input.file_name, bytes = input.bytes.len()))]
    async fn convert(&self, input: StageInput<'_>) -> Result<Vec<u8>, StageError> {
        let media = input.options.media;
        let embedded = match passthrough_jpeg(input.bytes) {
            Some(jpeg) => {
                debug!(width = jpeg.width, height = jpeg.height, "embedding JPEG unchanged");
                jpeg
            }
            None => {
                // Pixels beyond what the printer can resolve only inflate the job.
                let (page_w, page_h) = media.dimensions_pt();
                let max_w = (page_w / 72.0 * self.raster_dpi as f32).ceil() as u32;
                let max_h = (page_h / 72.0 * self.raster_dpi as f32).ceil() as u32;
                let bytes = input.bytes.to_vec();
                tokio::task::spawn_blocking(move || {
                    ImageProcessor::from_bytes(&bytes)?
                        .limit_size(max_w, max_h)
                        .flatten_alpha()
                        .into_embedded()
                })
                .await
                .map_err(|e| StageError::UnsupportedContent(format!("image worker failed: {e}")))??
            }
        };
        PdfWriter::new(media).image_page(embedded)
    }
}
