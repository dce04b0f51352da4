// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckpost: core types, errors, configuration and caption parsing shared
// across all crates.

pub mod caption;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod human_errors;
pub mod integrity;
pub mod types;

pub use caption::parse_caption;
pub use config::{AppConfig, Settings};
pub use endpoint::DeviceEndpoint;
pub use error::{DruckpostError, FailureKind, StageError};
pub use types::*;
