// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// druckpost-convert: turns submitted documents into printer-ready jobs.
//
// A document is classified into a route, run through the route's converter
// stages (office or image to PDF, then PDF to PCL XL) and leaves as a
// PJL-wrapped job carrying its copy count and duplex setting.

pub mod classify;
pub mod converter;
pub mod encoder;
pub mod image;
pub mod office;
pub mod pdf;
pub mod process;
pub mod raster;

use std::sync::Arc;

use druckpost_core::config::Settings;

pub use classify::{ConversionRoute, classify};
pub use converter::{Converter, ConverterChain, StageInput};
pub use encoder::PrintDirectives;
pub use crate::image::ImageConverter;
pub use office::OfficeConverter;
pub use pdf::{PdfReader, PdfWriter};
pub use raster::{GhostscriptBackend, RasterBackend, RasterConverter};

/// The production chain: LibreOffice, the built-in image embedder and
/// Ghostscript, configured from `settings`.
pub fn standard_chain(settings: &Settings) -> ConverterChain {
    let converters = &settings.converters;
    let timeouts = &settings.timeouts;
    ConverterChain::new()
        .with(Arc::new(OfficeConverter::new(
            converters.soffice_bin.clone(),
            timeouts.convert,
        )))
        .with(Arc::new(ImageConverter::new(converters.raster_dpi)))
        .with(Arc::new(RasterConverter::ghostscript(
            converters.gs_bin.clone(),
            timeouts.raster,
            converters.raster_dpi,
        )))
}
