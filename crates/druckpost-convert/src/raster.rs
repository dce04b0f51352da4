// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF to PCL XL raster stage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use druckpost_core::error::StageError;
use druckpost_core::integrity::short_hash;
use druckpost_core::types::Stage;
use tracing::{info, instrument, warn};

use crate::converter::{Converter, StageInput};
use crate::encoder::{PrintDirectives, extract_pclxl};
use crate::pdf::PdfReader;
use crate::process::run_bounded;

/// Where the `%PDF-` marker may appear; Ghostscript tolerates leading junk
/// up to this offset.
const PDF_HEADER_WINDOW: usize = 1024;

/// Something that renders a PDF into a PCL XL stream.
#[async_trait]
pub trait RasterBackend: Send + Sync {
    /// Short name for logs and error messages.
    fn name(&self) -> &str;

    async fn render(&self, pdf: &[u8], directives: &PrintDirectives) -> Result<Vec<u8>, StageError>;
}

/// Renders with Ghostscript's `pxlmono` device.
#[derive(Debug, Clone)]
pub struct GhostscriptBackend {
    program: String,
    timeout: Duration,
}

impl GhostscriptBackend {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RasterBackend for GhostscriptBackend {
    fn name(&self) -> &str {
        &self.program
    }

    async fn render(&self, pdf: &[u8], directives: &PrintDirectives) -> Result<Vec<u8>, StageError> {
        let scratch = tempfile::tempdir()?;
        let source = scratch.path().join("job.pdf");
        tokio::fs::write(&source, pdf).await?;

        let mut args = directives.ghostscript_args();
        args.push(source.to_string_lossy().into_owned());
        let output = run_bounded(&self.program, &args, scratch.path(), self.timeout).await?;
        Ok(output.stdout)
    }
}

/// The terminal stage: PDF in, PJL-wrapped PCL XL job out.
#[derive(Clone)]
pub struct RasterConverter {
    backend: Arc<dyn RasterBackend>,
    raster_dpi: u32,
}

impl RasterConverter {
    pub fn new(backend: Arc<dyn RasterBackend>, raster_dpi: u32) -> Self {
        Self {
            backend,
            raster_dpi: raster_dpi.max(1),
        }
    }

    pub fn ghostscript(program: impl Into<String>, timeout: Duration, raster_dpi: u32) -> Self {
        Self::new(Arc::new(GhostscriptBackend::new(program, timeout)), raster_dpi)
    }
}

#[async_trait]
impl Converter for RasterConverter {
    fn stage(&self) -> Stage {
        Stage::PdfToRaster
    }

    #[instrument(skip_all, fields(file_name = %input.file_name, backend = self.backend.name()))]
    async fn convert(&self, input: StageInput<'_>) -> Result<Vec<u8>, StageError> {
        let window = &input.bytes[..input.bytes.len().min(PDF_HEADER_WINDOW)];
        if !window.windows(5).any(|w| w == b"%PDF-") {
            return Err(StageError::UnsupportedContent("input is not a PDF".into()));
        }
        check_pages(input.bytes).await?;

        let directives = PrintDirectives::from_options(input.options, self.raster_dpi);
        info!(
            copies = directives.copies,
            duplex = directives.duplex.sides_keyword(),
            media = %directives.media,
            scaling = directives.scaling.keyword(),
            dpi = directives.resolution_dpi,
            "rendering PDF to PCL XL"
        );

        let rendered = self.backend.render(input.bytes, &directives).await?;
        let pclxl = extract_pclxl(&rendered).ok_or_else(|| {
            StageError::UnsupportedContent(format!(
                "{} produced {} bytes that are not PCL XL",
                self.backend.name(),
                rendered.len()
            ))
        })?;

        let job = directives.wrap(input.file_name, pclxl);
        info!(bytes = job.len(), hash = %short_hash(&job), "raster job encoded");
        Ok(job)
    }
}

/// Refuse PDFs that parse but contain no pages.  PDFs our parser cannot read
/// are left for Ghostscript to judge.
async fn check_pages(pdf: &[u8]) -> Result<(), StageError> {
    let bytes = pdf.to_vec();
    let pages = tokio::task::spawn_blocking(move || {
        PdfReader::from_bytes(&bytes).map(|reader| reader.page_count())
    })
    .await
    .map_err(|e| StageError::UnsupportedContent(format!("PDF inspection failed: {e}")))?;

    match pages {
        Ok(0) => Err(StageError::UnsupportedContent("PDF has no pages".into())),
        Ok(pages) => {
            info!(pages, "PDF inspected");
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, "PDF not readable by inspector, passing to renderer");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use druckpost_core::types::{DuplexMode, JobDefaults, JobOptions, MediaSize};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::encoder::{self, UEL};
    use crate::pdf::PdfWriter;

    /// Pretends to be Ghostscript: emits its PJL preamble and a tiny stream.
    struct FakeGs {
        seen: Mutex<Vec<Vec<String>>>,
        output: Vec<u8>,
    }

    impl FakeGs {
        fn pclxl() -> Self {
            let mut output = UEL.to_vec();
            output.extend_from_slice(b"@PJL ENTER LANGUAGE=PCLXL\n) HP-PCL XL;3;0\n\xc0\x00");
            output.extend_from_slice(UEL);
            Self {
                seen: Mutex::new(Vec::new()),
                output,
            }
        }
    }

    #[async_trait]
    impl RasterBackend for FakeGs {
        fn name(&self) -> &str {
            "fake-gs"
        }

        async fn render(&self, _: &[u8], d: &PrintDirectives) -> Result<Vec<u8>, StageError> {
            self.seen.lock().unwrap().push(d.ghostscript_args());
            Ok(self.output.clone())
        }
    }

    fn options(copies: u32, duplex: DuplexMode) -> JobOptions {
        JobOptions {
            copies,
            duplex,
            ..JobOptions::from_defaults(&JobDefaults::default())
        }
    }

    fn sample_pdf() -> Vec<u8> {
        PdfWriter::new(MediaSize::A4)
            .text_page(&["page".to_string()])
            .unwrap()
    }

    #[tokio::test]
    async fn wraps_backend_output_with_job_directives() {
        let gs = Arc::new(FakeGs::pclxl());
        let converter = RasterConverter::new(gs.clone(), 600);
        let pdf = sample_pdf();
        let opts = options(3, DuplexMode::Off);

        let job = converter
            .convert(StageInput {
                bytes: &pdf,
                file_name: "report.pdf",
                options: &opts,
            })
            .await
            .unwrap();

        assert!(encoder::is_print_job(&job));
        let directives = encoder::read_directives(&job).unwrap();
        assert_eq!(directives.copies, Some(3));
        assert_eq!(directives.duplex, Some(false));
        // Ghostscript's own PJL preamble does not survive.
        let text = String::from_utf8_lossy(&job);
        assert_eq!(text.matches("ENTER LANGUAGE").count(), 1);
        assert!(!gs.seen.lock().unwrap()[0].iter().any(|a| a.contains("Duplex")));
    }

    #[tokio::test]
    async fn duplex_reaches_the_renderer() {
        let gs = Arc::new(FakeGs::pclxl());
        let converter = RasterConverter::new(gs.clone(), 300);
        let pdf = sample_pdf();
        let opts = options(1, DuplexMode::LongEdge);
        converter
            .convert(StageInput {
                bytes: &pdf,
                file_name: "a.pdf",
                options: &opts,
            })
            .await
            .unwrap();
        let args = gs.seen.lock().unwrap()[0].clone();
        assert!(args.contains(&"-dDuplex".to_string()));
        assert!(args.contains(&"-r300".to_string()));
    }

    #[tokio::test]
    async fn non_pdf_input_is_rejected_before_rendering() {
        let gs = Arc::new(FakeGs::pclxl());
        let converter = RasterConverter::new(gs.clone(), 600);
        let opts = options(1, DuplexMode::Off);
        let err = converter
            .convert(StageInput {
                bytes: b"GIF89a",
                file_name: "a.pdf",
                options: &opts,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::UnsupportedContent(_)));
        assert!(gs.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_output_must_be_pclxl() {
        let gs = Arc::new(FakeGs {
            seen: Mutex::new(Vec::new()),
            output: b"GPL Ghostscript: Unrecoverable error".to_vec(),
        });
        let converter = RasterConverter::new(gs, 600);
        let pdf = sample_pdf();
        let opts = options(1, DuplexMode::Off);
        let err = converter
            .convert(StageInput {
                bytes: &pdf,
                file_name: "a.pdf",
                options: &opts,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::UnsupportedContent(msg) if msg.contains("fake-gs")));
    }

    #[tokio::test]
    async fn missing_ghostscript_is_a_spawn_failure() {
        let converter =
            RasterConverter::ghostscript("druckpost-no-gs", Duration::from_secs(5), 600);
        let pdf = sample_pdf();
        let opts = options(1, DuplexMode::Off);
        let err = converter
            .convert(StageInput {
                bytes: &pdf,
                file_name: "a.pdf",
                options: &opts,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Spawn { .. }));
    }
}
