// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-side retry policy with exponential backoff and jitter.
//
// Nothing in the pipeline retries on its own.  A front end that wants to
// resubmit a failed job asks `should_retry` and sleeps for the returned
// delay; the job is then run again from the start, conversion included.

use std::time::Duration;

use druckpost_core::error::{DruckpostError, StageError};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Whether resubmitting the same job can succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// Printer off, connection dropped, converter too slow.
    Transient,
    /// The same input will fail the same way.
    Permanent,
}

/// Retry configuration.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry, the failure is permanent.
    GiveUp,
    /// Maximum retries exhausted.
    Exhausted,
}

/// Classify a `DruckpostError` for retry decisions.
pub fn classify_error(err: &DruckpostError) -> ErrorClass {
    match err {
        DruckpostError::DeviceUnreachable { .. } | DruckpostError::DeliveryIncomplete { .. } => {
            ErrorClass::Transient
        }
        DruckpostError::Conversion { source, .. } => match source {
            StageError::Timeout(_) => ErrorClass::Transient,
            StageError::Io(io_err) => classify_io(io_err),
            StageError::UnsupportedContent(_)
            | StageError::Spawn { .. }
            | StageError::ExitStatus { .. } => ErrorClass::Permanent,
        },
        DruckpostError::Io(io_err) => classify_io(io_err),
        DruckpostError::Unauthorized(_)
        | DruckpostError::FileTooLarge { .. }
        | DruckpostError::UnsupportedFormat(_)
        | DruckpostError::InvalidEndpoint { .. }
        | DruckpostError::Config(_)
        | DruckpostError::Defect(_) => ErrorClass::Permanent,
    }
}

fn classify_io(io_err: &std::io::Error) -> ErrorClass {
    match io_err.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            ErrorClass::Permanent
        }
        _ => ErrorClass::Transient,
    }
}

/// Decide whether to retry after failed attempt number `attempt` (0-based).
pub fn should_retry(err: &DruckpostError, attempt: u32, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!(kind = ?err.kind(), "permanent error, not retrying");
            RetryDecision::GiveUp
        }
        ErrorClass::Transient if attempt >= config.max_retries => {
            warn!(attempt, max = config.max_retries, "retry limit exhausted");
            RetryDecision::Exhausted
        }
        ErrorClass::Transient => {
            let delay = compute_delay(attempt, config);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "scheduling retry");
            RetryDecision::RetryAfter(delay)
        }
    }
}

/// delay = min(base * 2^attempt + jitter, max_delay), jitter in [0, base).
pub fn compute_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_ms = config.base_delay.as_millis() as u64;
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(10));
    let total_ms = exp_ms.saturating_add(jitter(base_ms, attempt));
    Duration::from_millis(total_ms.min(config.max_delay.as_millis() as u64))
}

/// Deterministic spread across [0, base).
fn jitter(base_ms: u64, attempt: u32) -> u64 {
    let hash = u64::from(attempt).wrapping_mul(6364136223846793005);
    hash % base_ms.max(1)
}
