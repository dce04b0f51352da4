// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format classifier: picks a conversion route from the declared MIME type and
// the file extension.  Pure static lookup, content is never sniffed.

use std::path::Path;

use druckpost_core::error::{DruckpostError, Result};
use druckpost_core::types::{RouteTag, Stage};
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

const OFFICE_EXTENSIONS: &[&str] = &["doc", "docx", "xls", "xlsx", "odt", "ods"];

const OFFICE_MIME_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.oasis.opendocument.text",
    "application/vnd.oasis.opendocument.spreadsheet",
];

/// Classify a document.
///
/// Categories are tried in order PDF, image, office; a category matches when
/// either the MIME type or the extension names it.
pub fn classify(file_name: &str, mime: Option<&str>) -> RouteTag {
    let mime = mime
        .map(|m| {
            // Drop parameters such as "; charset=binary".
            m.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
        })
        .unwrap_or_default();
    let ext = extension_of(file_name);

    let tag = if mime == "application/pdf" || ext == "pdf" {
        RouteTag::PdfPassthrough
    } else if mime.starts_with("image/") || IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        RouteTag::Image
    } else if OFFICE_MIME_TYPES.contains(&mime.as_str()) || OFFICE_EXTENSIONS.contains(&ext.as_str())
    {
        RouteTag::OfficeDocument
    } else {
        RouteTag::Unsupported
    };

    debug!(file_name, mime = %mime, ext = %ext, route = %tag, "document classified");
    tag
}

/// Lower-cased extension of `file_name`, empty if there is none.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Ordered converter stages for one job.
///
/// The last stage always produces the raster print format; [`ConversionRoute::new`]
/// refuses anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRoute {
    stages: Vec<Stage>,
}

impl ConversionRoute {
    /// Build a route, checking that it ends in the terminal raster stage and
    /// that no earlier stage is terminal.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        match stages.split_last() {
            Some((last, rest)) if last.is_terminal() && !rest.iter().any(Stage::is_terminal) => {
                Ok(Self { stages })
            }
            _ => Err(DruckpostError::Defect(format!(
                "conversion route {stages:?} does not end in the raster stage"
            ))),
        }
    }

    /// The standard route for a classified document.
    pub fn for_tag(tag: RouteTag, file_name: &str) -> Result<Self> {
        let stages = match tag {
            RouteTag::PdfPassthrough => vec![Stage::PdfToRaster],
            RouteTag::Image => vec![Stage::ImageToPdf, Stage::PdfToRaster],
            RouteTag::OfficeDocument => vec![Stage::OfficeToPdf, Stage::PdfToRaster],
            RouteTag::Unsupported => {
                return Err(DruckpostError::UnsupportedFormat(file_name.to_string()));
            }
        };
        Self::new(stages)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_by_mime_or_extension() {
        assert_eq!(classify("report.pdf", None), RouteTag::PdfPassthrough);
        assert_eq!(classify("REPORT.PDF", None), RouteTag::PdfPassthrough);
        assert_eq!(classify("blob", Some("application/pdf")), RouteTag::PdfPassthrough);
    }

    #[test]
    fn images() {
        for name in ["a.jpg", "a.JPEG", "a.png", "a.webp"] {
            assert_eq!(classify(name, None), RouteTag::Image, "{name}");
        }
        assert_eq!(classify("photo", Some("image/heic")), RouteTag::Image);
    }

    #[test]
    fn office_documents() {
        for name in ["a.doc", "a.docx", "a.xls", "a.xlsx", "a.odt", "a.ods"] {
            assert_eq!(classify(name, None), RouteTag::OfficeDocument, "{name}");
        }
        assert_eq!(
            classify("upload.bin", Some("application/vnd.oasis.opendocument.text")),
            RouteTag::OfficeDocument
        );
    }

    #[test]
    fn earlier_category_wins_whether_by_mime_or_extension() {
        assert_eq!(classify("scan.pdf", Some("image/png")), RouteTag::PdfPassthrough);
        assert_eq!(classify("notes.docx", Some("image/png")), RouteTag::Image);
        assert_eq!(classify("x", Some("Application/PDF; charset=binary")), RouteTag::PdfPassthrough);
    }

    #[test]
    fn everything_else_is_unsupported() {
        assert_eq!(classify("setup.exe", None), RouteTag::Unsupported);
        assert_eq!(classify("notes.txt", Some("text/plain")), RouteTag::Unsupported);
        assert_eq!(classify("", None), RouteTag::Unsupported);
    }

    #[test]
    fn routes_end_in_raster() {
        for tag in [RouteTag::PdfPassthrough, RouteTag::Image, RouteTag::OfficeDocument] {
            let route = ConversionRoute::for_tag(tag, "f").unwrap();
            assert_eq!(route.stages().last(), Some(&Stage::PdfToRaster));
        }
    }

    #[test]
    fn unsupported_tag_has_no_route() {
        let err = ConversionRoute::for_tag(RouteTag::Unsupported, "setup.exe").unwrap_err();
        assert!(matches!(err, DruckpostError::UnsupportedFormat(name) if name == "setup.exe"));
    }

    #[test]
    fn malformed_routes_are_defects() {
        for stages in [
            vec![],
            vec![Stage::OfficeToPdf],
            vec![Stage::PdfToRaster, Stage::ImageToPdf],
            vec![Stage::PdfToRaster, Stage::PdfToRaster],
        ] {
            assert!(matches!(ConversionRoute::new(stages), Err(DruckpostError::Defect(_))));
        }
    }
}
