// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: inspecting submitted PDFs and writing intermediate ones.

pub mod reader;
pub mod writer;

pub use reader::PdfReader;
pub use writer::{ColorSpace, EmbeddedImage, ImageEncoding, PdfWriter};
