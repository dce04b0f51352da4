// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Short, specific reply messages for chat users.
//
// Every failure kind gets its own wording so a user can tell "printer is off"
// from "file too big" without reading logs.

use crate::error::{DruckpostError, StageError};

/// A reply-ready description of a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What the user can do about it.
    pub suggestion: String,
    /// Whether resubmitting the same job may succeed.
    pub retriable: bool,
}

impl HumanError {
    /// Message and suggestion as a single reply line.
    pub fn reply_text(&self) -> String {
        format!("{} {}", self.message, self.suggestion)
    }
}

/// A byte count in MB, with one decimal place unless it is whole.
pub fn megabytes(bytes: u64) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    let text = format!("{mb:.1}");
    text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
}

/// Convert a `DruckpostError` into a message for the requester.
pub fn humanize_error(err: &DruckpostError) -> HumanError {
    match err {
        DruckpostError::Unauthorized(_) => HumanError {
            message: "Not allowed.".into(),
            suggestion: "This chat is not on the printer's whitelist.".into(),
            retriable: false,
        },

        DruckpostError::FileTooLarge { limit, .. } => HumanError {
            message: "File too big.".into(),
            suggestion: format!("The limit is {} MB.", megabytes(*limit)),
            retriable: false,
        },

        DruckpostError::UnsupportedFormat(_) => HumanError {
            message: "Unsupported file.".into(),
            suggestion: "Send a PDF, an image (JPEG/PNG/WEBP) or a Word/Excel/ODF document."
                .into(),
            retriable: false,
        },

        DruckpostError::Conversion { stage, source } => {
            let retriable = matches!(source, StageError::Timeout(_));
            HumanError {
                message: "Conversion failed.".into(),
                suggestion: if retriable {
                    format!("The {stage} step took too long. Try again in a moment.")
                } else {
                    format!("The {stage} step could not process this file ({source}).")
                },
                retriable,
            }
        }

        DruckpostError::DeviceUnreachable { addr, .. } => HumanError {
            message: "Printer not reachable.".into(),
            suggestion: format!("Check that the printer is on and {addr} is open, then try /ping."),
            retriable: true,
        },

        DruckpostError::DeliveryIncomplete { sent, total, .. } => HumanError {
            message: "Printer connection dropped.".into(),
            suggestion: format!(
                "Only {sent} of {total} bytes arrived; nothing was resumed. Send the file again."
            ),
            retriable: true,
        },

        DruckpostError::InvalidEndpoint { .. } | DruckpostError::Config(_) => HumanError {
            message: "Printer is misconfigured.".into(),
            suggestion: "Ask the administrator to check PRINTER_URI and the bot settings.".into(),
            retriable: false,
        },

        DruckpostError::Defect(detail) => HumanError {
            message: "Internal error.".into(),
            suggestion: format!("This is a bug in the print bot: {detail}"),
            retriable: false,
        },

        DruckpostError::Io(io_err) => HumanError {
            message: "Internal error.".into(),
            suggestion: format!("Temporary files could not be handled: {io_err}"),
            retriable: true,
        },
    }
}
