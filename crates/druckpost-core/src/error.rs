// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Druckpost.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Stage;

/// Top-level error type for all Druckpost operations.
#[derive(Debug, Error)]
pub enum DruckpostError {
    // -- Intake errors --
    #[error("requester {0} is not on the whitelist")]
    Unauthorized(String),

    #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    // -- Conversion errors --
    #[error("conversion failed in {stage} stage: {source}")]
    Conversion {
        stage: Stage,
        #[source]
        source: StageError,
    },

    // -- Device errors --
    #[error("printer at {addr} is not reachable: {detail}")]
    DeviceUnreachable { addr: String, detail: String },

    #[error("delivery to {addr} incomplete after {sent} of {total} bytes: {detail}")]
    DeliveryIncomplete {
        addr: String,
        sent: u64,
        total: u64,
        detail: String,
    },

    // -- Configuration --
    #[error("invalid printer URI '{uri}': {reason}")]
    InvalidEndpoint { uri: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    // -- Programming-logic violations --
    #[error("internal defect: {0}")]
    Defect(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DruckpostError>;

/// Failure of a single converter stage.
///
/// Stages report what went wrong; the chain attaches *which* stage failed
/// when lifting this into [`DruckpostError::Conversion`].
#[derive(Debug, Error)]
pub enum StageError {
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("unsupported content: {0}")]
    UnsupportedContent(String),

    #[error("failed to start {program}: {detail}")]
    Spawn { program: String, detail: String },

    #[error("{program} exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable, machine-readable failure kind reported at the job boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    ConversionFailure,
    FileTooLarge,
    Unauthorized,
    DeviceUnreachable,
    DeliveryIncomplete,
    Configuration,
    Defect,
}

impl DruckpostError {
    /// Lift a stage failure into a conversion error for `stage`.
    pub fn conversion(stage: Stage, source: StageError) -> Self {
        Self::Conversion { stage, source }
    }

    /// Which failure kind this error reports as.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unauthorized(_) => FailureKind::Unauthorized,
            Self::FileTooLarge { .. } => FailureKind::FileTooLarge,
            Self::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            Self::Conversion { .. } => FailureKind::ConversionFailure,
            Self::DeviceUnreachable { .. } => FailureKind::DeviceUnreachable,
            Self::DeliveryIncomplete { .. } => FailureKind::DeliveryIncomplete,
            Self::InvalidEndpoint { .. } | Self::Config(_) => FailureKind::Configuration,
            Self::Defect(_) | Self::Io(_) => FailureKind::Defect,
        }
    }

    /// The converter stage that failed, if this is a conversion error.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Conversion { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
