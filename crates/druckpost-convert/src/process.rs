// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded execution of external converters.
//
// The child is spawned with `kill_on_drop`, so both an elapsed timeout and a
// dropped job future terminate it.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use druckpost_core::error::StageError;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

/// Longest stderr excerpt kept in an error.
const STDERR_EXCERPT: usize = 512;

/// Run `program` with `args` in `working_dir` and collect its output.
///
/// A non-zero exit status is an error carrying the tail of stderr.
pub async fn run_bounded(
    program: &str,
    args: &[String],
    working_dir: &Path,
    limit: Duration,
) -> Result<Output, StageError> {
    info!(program, ?args, timeout_s = limit.as_secs(), "starting converter");

    let child = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| StageError::Spawn {
            program: program.to_string(),
            detail: e.to_string(),
        })?;

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(program, timeout_s = limit.as_secs(), "converter timed out, killed");
            return Err(StageError::Timeout(limit));
        }
    };

    if !output.status.success() {
        return Err(StageError::ExitStatus {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: stderr_excerpt(&output.stderr),
        });
    }
    Ok(output)
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| text.len() - i <= STDERR_EXCERPT)
        .unwrap_or(text.len());
    text[start..].to_string()
}
