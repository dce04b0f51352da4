// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print option encoder.
//
// Job options become two things: the page-setup arguments handed to
// Ghostscript, and a PJL envelope around the PCL XL stream it produces.  Copy
// count and duplex travel once, as PJL directives ahead of the page data, so a
// three-copy job is still converted and sent only once.
//
//   ESC%-12345X@PJL JOB NAME="report.pdf"
//   @PJL SET COPIES=3
//   @PJL SET DUPLEX=OFF
//   @PJL SET PAPER=A4
//   @PJL SET RESOLUTION=600
//   @PJL ENTER LANGUAGE=PCLXL
//   ) HP-PCL XL;...            <- Ghostscript output, its own preamble removed
//   ESC%-12345X@PJL EOJ NAME="report.pdf"
//   ESC%-12345X

use druckpost_core::types::{DuplexMode, JobOptions, MediaSize, ScalingMode};

/// Universal Exit Language sequence that opens and closes every PJL job.
pub const UEL: &[u8] = b"\x1b%-12345X";

/// Stream header every PCL XL stream starts with.
pub const PCLXL_SIGNATURE: &[u8] = b") HP-PCL XL";

/// How far into Ghostscript's output the PCL XL header may appear.
const SIGNATURE_WINDOW: usize = 4096;

const MAX_JOB_NAME: usize = 80;

/// Everything the raster stage needs to know about a job's page setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintDirectives {
    pub copies: u32,
    pub duplex: DuplexMode,
    pub media: MediaSize,
    pub resolution_dpi: u32,
    /// Reported in logs; has no directive of its own.
    pub scaling: ScalingMode,
}

impl PrintDirectives {
    pub fn from_options(options: &JobOptions, resolution_dpi: u32) -> Self {
        Self {
            copies: options.copies.max(1),
            duplex: options.duplex,
            media: options.media,
            resolution_dpi,
            scaling: options.scaling,
        }
    }

    /// Ghostscript arguments rendering a PDF to monochrome PCL XL on stdout.
    ///
    /// The input file name is appended by the caller.  No copy count is
    /// passed: copies are a PJL directive.
    pub fn ghostscript_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-q",
            "-dSAFER",
            "-dBATCH",
            "-dNOPAUSE",
            "-sDEVICE=pxlmono",
            "-sOutputFile=-",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(format!("-r{}", self.resolution_dpi));
        args.push(format!("-sPAPERSIZE={}", self.media.gs_paper_name()));
        if self.duplex.is_duplex() {
            args.push("-dDuplex".into());
            args.push("-dTumble=false".into());
        }
        args
    }

    /// PJL job header, up to and including `ENTER LANGUAGE`.
    pub fn pjl_header(&self, job_name: &str) -> Vec<u8> {
        let name = sanitize_job_name(job_name);
        let mut header = Vec::with_capacity(256);
        header.extend_from_slice(UEL);
        push_line(&mut header, &format!("@PJL JOB NAME=\"{name}\""));
        push_line(&mut header, &format!("@PJL SET COPIES={}", self.copies));
        match self.duplex {
            DuplexMode::Off => push_line(&mut header, "@PJL SET DUPLEX=OFF"),
            DuplexMode::LongEdge => {
                push_line(&mut header, "@PJL SET DUPLEX=ON");
                push_line(&mut header, "@PJL SET BINDING=LONGEDGE");
            }
        }
        push_line(&mut header, &format!("@PJL SET PAPER={}", self.media.pjl_paper()));
        push_line(&mut header, &format!("@PJL SET RESOLUTION={}", self.resolution_dpi));
        push_line(&mut header, "@PJL ENTER LANGUAGE=PCLXL");
        header
    }

    /// PJL trailer closing the job opened by [`PrintDirectives::pjl_header`].
    pub fn pjl_footer(&self, job_name: &str) -> Vec<u8> {
        let mut footer = Vec::with_capacity(64);
        footer.extend_from_slice(UEL);
        push_line(
            &mut footer,
            &format!("@PJL EOJ NAME=\"{}\"", sanitize_job_name(job_name)),
        );
        footer.extend_from_slice(UEL);
        footer
    }

    /// Wrap a bare PCL XL stream in this job's PJL envelope.
    pub fn wrap(&self, job_name: &str, pclxl: &[u8]) -> Vec<u8> {
        let mut job = self.pjl_header(job_name);
        job.reserve(pclxl.len() + 64);
        job.extend_from_slice(pclxl);
        job.extend_from_slice(&self.pjl_footer(job_name));
        job
    }
}

/// Locate the PCL XL stream inside Ghostscript output, dropping the PJL
/// preamble and trailing UEL Ghostscript writes around it.
///
/// Returns `None` when the output does not look like PCL XL at all.
pub fn extract_pclxl(output: &[u8]) -> Option<&[u8]> {
    let window = &output[..output.len().min(SIGNATURE_WINDOW)];
    let start = find(window, PCLXL_SIGNATURE)?;
    let body = &output[start..];
    Some(body.strip_suffix(UEL).unwrap_or(body))
}

/// Whether `bytes` is a complete PJL-wrapped print job.
pub fn is_print_job(bytes: &[u8]) -> bool {
    bytes.starts_with(UEL) && bytes[UEL.len()..].starts_with(b"@PJL") && bytes.ends_with(UEL)
}

/// Directives read back from a PJL header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDirectives {
    pub copies: Option<u32>,
    pub duplex: Option<bool>,
    pub paper: Option<String>,
}

/// Read the `SET` directives of the PJL header at the start of `job`.
///
/// Stops at `ENTER LANGUAGE`; page data is never inspected.
pub fn read_directives(job: &[u8]) -> Option<EncodedDirectives> {
    let rest = job.strip_prefix(UEL)?;
    let end = find(rest, b"@PJL ENTER LANGUAGE")?;
    let header = std::str::from_utf8(&rest[..end]).ok()?;

    let mut directives = EncodedDirectives {
        copies: None,
        duplex: None,
        paper: None,
    };
    for line in header.lines() {
        let Some((key, value)) = line.trim().strip_prefix("@PJL SET ").and_then(|s| s.split_once('='))
        else {
            continue;
        };
        match key {
            "COPIES" => directives.copies = value.parse().ok(),
            "DUPLEX" => directives.duplex = Some(value == "ON"),
            "PAPER" => directives.paper = Some(value.to_string()),
            _ => {}
        }
    }
    Some(directives)
}

fn push_line(buf: &mut Vec<u8>, line: &str) {
    buf.extend_from_slice(line.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

/// Printable ASCII without quotes, at most [`MAX_JOB_NAME`] characters.
fn sanitize_job_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| *c != '"')
        .take(MAX_JOB_NAME)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "druckpost".into()
    } else {
        cleaned.to_string()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
