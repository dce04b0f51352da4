// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office document to PDF through a headless LibreOffice.

use std::time::Duration;

use async_trait::async_trait;
use druckpost_core::error::StageError;
use druckpost_core::types::Stage;
use tracing::{debug, instrument};

use crate::classify::extension_of;
use crate::converter::{Converter, StageInput};
use crate::process::run_bounded;

/// Runs `soffice --headless --convert-to pdf` in a scratch directory.
///
/// Each conversion gets its own user profile so parallel jobs do not fight
/// over LibreOffice's profile lock.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    program: String,
    timeout: Duration,
}

impl OfficeConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn args(input: &str, outdir: &str, profile_url: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "--headless",
            "--nologo",
            "--nofirststartwizard",
            "--nodefault",
            "--norestore",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(format!("-env:UserInstallation={profile_url}"));
        args.extend(["--convert-to".into(), "pdf".into(), "--outdir".into(), outdir.into()]);
        args.push(input.into());
        args
    }
}

#[async_trait]
impl Converter for OfficeConverter {
    fn stage(&self) -> Stage {
        Stage::OfficeToPdf
    }

    #[instrument(skip_all, fields(file_name = %input.file_name, bytes = input.bytes.len()))]
    async fn convert(&self, input: StageInput<'_>) -> Result<Vec<u8>, StageError> {
        let scratch = tempfile::tempdir()?;
        let outdir = scratch.path().join("out");
        let profile = scratch.path().join("profile");
        tokio::fs::create_dir_all(&outdir).await?;

        // LibreOffice picks its import filter from the extension.
        let ext = match extension_of(input.file_name) {
            ext if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => ext,
            _ => "bin".to_string(),
        };
        let source = scratch.path().join(format!("document.{ext}"));
        tokio::fs::write(&source, input.bytes).await?;

        let args = Self::args(
            &source.to_string_lossy(),
            &outdir.to_string_lossy(),
            &format!("file://{}", profile.to_string_lossy()),
        );
        run_bounded(&self.program, &args, scratch.path(), self.timeout).await?;

        let produced = outdir.join("document.pdf");
        let pdf = match tokio::fs::read(&produced).await {
            Ok(pdf) => pdf,
            Err(_) => {
                return Err(StageError::UnsupportedContent(
                    "office suite exited cleanly but wrote no PDF".into(),
                ));
            }
        };
        if !pdf.starts_with(b"%PDF") {
            return Err(StageError::UnsupportedContent(
                "office suite output is not a PDF".into(),
            ));
        }
        debug!(pdf_bytes = pdf.len(), "office document converted");
        Ok(pdf)
    }
}
