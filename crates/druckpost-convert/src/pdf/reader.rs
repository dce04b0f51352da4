// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: page inspection of in-memory PDFs using the `lopdf` crate.

use druckpost_core::error::StageError;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, instrument};

/// Page tree depth beyond which inherited attributes are not searched.
const MAX_INHERIT_DEPTH: usize = 32;

/// Read-only view of a parsed PDF.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Parse raw PDF bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, StageError> {
        let document = Document::load_mem(data).map_err(|err| {
            StageError::UnsupportedContent(format!("failed to parse PDF: {err}"))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Width and height of page `page_number` (1-indexed) in points, taking
    /// a `/MediaBox` inherited from the page tree into account.
    pub fn media_box(&self, page_number: u32) -> Option<(f32, f32)> {
        let page_id = *self.document.get_pages().get(&page_number)?;
        let mut dict = self.document.get_dictionary(page_id).ok()?;

        for _ in 0..MAX_INHERIT_DEPTH {
            let own = dict.get(b"MediaBox").ok();
            if let Some(size) = own.and_then(|obj| box_size(&self.document, obj)) {
                return Some(size);
            }
            let parent: ObjectId = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.document.get_dictionary(parent).ok()?;
        }
        None
    }
}

/// `[llx lly urx ury]`, possibly behind an indirect reference.
fn box_size(doc: &Document, obj: &Object) -> Option<(f32, f32)> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let coords: Vec<f32> = obj
        .as_array()
        .ok()?
        .iter()
        .map(|v| v.as_float().ok())
        .collect::<Option<_>>()?;
    match coords.as_slice() {
        [llx, lly, urx, ury] => Some(((urx - llx).abs(), (ury - lly).abs())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_unsupported_content() {
        let err = PdfReader::from_bytes(b"definitely not a pdf").err().unwrap();
        assert!(matches!(err, StageError::UnsupportedContent(_)));
    }

    #[test]
    fn missing_page_has_no_media_box() {
        let pdf = crate::pdf::PdfWriter::new(druckpost_core::types::MediaSize::A4)
            .text_page(&[])
            .unwrap();
        let reader = PdfReader::from_bytes(&pdf).unwrap();
        assert_eq!(reader.media_box(1), Some((595.0, 842.0)));
        assert_eq!(reader.media_box(2), None);
    }
}
