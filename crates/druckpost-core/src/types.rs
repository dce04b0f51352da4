// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Druckpost print pipeline.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::integrity::hash_bytes;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of whoever submitted a job (a chat id on the messaging side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequesterId(pub i64);

impl std::fmt::Display for RequesterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequesterId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Media sizes the raster stage knows how to set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaSize {
    A4,
    Letter,
    Legal,
}

impl MediaSize {
    /// Parse a configured media keyword (`A4`, `letter`, ...).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "a4" | "iso_a4_210x297mm" => Some(Self::A4),
            "letter" | "na_letter_8.5x11in" => Some(Self::Letter),
            "legal" | "na_legal_8.5x14in" => Some(Self::Legal),
            _ => None,
        }
    }

    /// Resolve a configured keyword, falling back to A4 with a warning.
    pub fn resolve(keyword: &str) -> Self {
        Self::from_keyword(keyword).unwrap_or_else(|| {
            warn!(media = keyword, fallback = "A4", "unknown media size, using fallback");
            Self::A4
        })
    }

    /// Ghostscript `-sPAPERSIZE` name.
    pub fn gs_paper_name(&self) -> &'static str {
        match self {
            Self::A4 => "a4",
            Self::Letter => "letter",
            Self::Legal => "legal",
        }
    }

    /// PJL `PAPER` value.
    pub fn pjl_paper(&self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::Letter => "LETTER",
            Self::Legal => "LEGAL",
        }
    }

    /// Page dimensions in PostScript points (width, height).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            Self::A4 => (595.0, 842.0),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
        }
    }
}

impl std::fmt::Display for MediaSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.pjl_paper())
    }
}

/// Duplex printing mode. Only long-edge binding is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DuplexMode {
    Off,
    LongEdge,
}

impl DuplexMode {
    /// Parse an IPP-style `sides` keyword.
    pub fn from_sides_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "one-sided" => Some(Self::Off),
            "two-sided-long-edge" => Some(Self::LongEdge),
            _ => None,
        }
    }

    /// IPP `sides` keyword for this mode.
    pub fn sides_keyword(&self) -> &'static str {
        match self {
            Self::Off => "one-sided",
            Self::LongEdge => "two-sided-long-edge",
        }
    }

    pub fn is_duplex(&self) -> bool {
        matches!(self, Self::LongEdge)
    }
}

/// Scaling policy. Informational only: it is reported, never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalingMode {
    FitToPage,
    ActualSize,
}

impl ScalingMode {
    pub fn resolve(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "fit-to-page" | "fit" | "auto" => Self::FitToPage,
            "none" | "actual-size" | "actual" => Self::ActualSize,
            other => {
                warn!(scaling = other, fallback = "fit-to-page", "unknown scaling mode");
                Self::FitToPage
            }
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::FitToPage => "fit-to-page",
            Self::ActualSize => "actual-size",
        }
    }
}

/// Process-wide defaults a caption is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefaults {
    pub duplex: DuplexMode,
    pub media: MediaSize,
    pub scaling: ScalingMode,
    /// Upper bound for the copy count a caption may request.
    pub max_copies: u32,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            duplex: DuplexMode::Off,
            media: MediaSize::A4,
            scaling: ScalingMode::FitToPage,
            max_copies: 99,
        }
    }
}

/// Resolved options for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub copies: u32,
    pub duplex: DuplexMode,
    pub media: MediaSize,
    pub scaling: ScalingMode,
}

impl JobOptions {
    /// Options for a job with no caption at all.
    pub fn from_defaults(defaults: &JobDefaults) -> Self {
        Self {
            copies: 1,
            duplex: defaults.duplex,
            media: defaults.media,
            scaling: defaults.scaling,
        }
    }
}

/// Conversion route chosen by the format classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteTag {
    PdfPassthrough,
    Image,
    OfficeDocument,
    Unsupported,
}

impl std::fmt::Display for RouteTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::PdfPassthrough => "pdf-passthrough",
            Self::Image => "image",
            Self::OfficeDocument => "office-document",
            Self::Unsupported => "unsupported",
        })
    }
}

/// A single converter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    OfficeToPdf,
    ImageToPdf,
    PdfToRaster,
}

impl Stage {
    /// Whether this stage emits the final raster print format.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PdfToRaster)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::OfficeToPdf => "office-to-pdf",
            Self::ImageToPdf => "image-to-pdf",
            Self::PdfToRaster => "pdf-to-raster",
        })
    }
}

/// A submitted document, immutable once constructed.
#[derive(Debug, Clone)]
pub struct PrintJob {
    id: JobId,
    document: Vec<u8>,
    media_type: Option<String>,
    file_name: String,
    caption: Option<String>,
    requester: RequesterId,
    submitted_at: DateTime<Utc>,
    /// SHA-256 of the document bytes, for log correlation. Computed on
    /// first use.
    content_hash: OnceLock<String>,
}

impl PrintJob {
    pub fn new(
        document: Vec<u8>,
        file_name: impl Into<String>,
        media_type: Option<String>,
        caption: Option<String>,
        requester: RequesterId,
    ) -> Self {
        Self {
            id: JobId::new(),
            document,
            media_type,
            file_name: file_name.into(),
            caption,
            requester,
            submitted_at: Utc::now(),
            content_hash: OnceLock::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn document(&self) -> &[u8] {
        &self.document
    }

    pub fn size(&self) -> u64 {
        self.document.len() as u64
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn requester(&self) -> RequesterId {
        self.requester
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn content_hash(&self) -> &str {
        self.content_hash.get_or_init(|| hash_bytes(&self.document))
    }
}

/// Outcome of one device session. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub bytes_sent: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn delivered(bytes_sent: u64) -> Self {
        Self {
            bytes_sent,
            success: true,
            error: None,
        }
    }

    pub fn failed(bytes_sent: u64, error: impl Into<String>) -> Self {
        Self {
            bytes_sent,
            success: false,
            error: Some(error.into()),
        }
    }
}
