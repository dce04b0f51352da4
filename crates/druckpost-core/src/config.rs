// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Read once at start-up from (in increasing priority) built-in defaults, an
// optional TOML file and the process environment, then validated into an
// immutable `Settings` value shared by the whole process.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::endpoint::DeviceEndpoint;
use crate::error::{DruckpostError, Result};
use crate::types::{DuplexMode, JobDefaults, MediaSize, RequesterId, ScalingMode};

/// Config file looked up when none is given explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "druckpost.toml";

/// Raw settings as read from file and environment.
///
/// Field names match the lower-cased environment variables
/// (`PRINTER_URI` -> `printer_uri`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Printer URI, e.g. `socket://192.168.178.176:9100`. Required.
    pub printer_uri: String,
    /// Comma separated requester ids. Empty means everyone may print.
    pub allowed_chat_ids: String,
    /// Largest accepted document, in megabytes.
    pub max_file_mb: f64,
    /// Media keyword (`A4`, `letter`, `legal`).
    pub default_media: String,
    /// `one-sided` or `two-sided-long-edge`.
    pub default_sides: String,
    /// Reported only; never changes the output.
    pub default_scaling: String,
    pub log_level: String,
    pub max_copies: u32,
    pub connect_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub convert_timeout_secs: u64,
    pub raster_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub soffice_bin: String,
    pub gs_bin: String,
    pub raster_dpi: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            printer_uri: String::new(),
            allowed_chat_ids: String::new(),
            max_file_mb: 40.0,
            default_media: "A4".into(),
            default_sides: "one-sided".into(),
            default_scaling: "fit-to-page".into(),
            log_level: "INFO".into(),
            max_copies: 99,
            connect_timeout_secs: 5,
            write_timeout_secs: 30,
            convert_timeout_secs: 120,
            raster_timeout_secs: 120,
            probe_timeout_secs: 2,
            soffice_bin: "soffice".into(),
            gs_bin: "gs".into(),
            raster_dpi: 600,
        }
    }
}

/// Timeouts bounding every blocking step of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub write: Duration,
    pub convert: Duration,
    pub raster: Duration,
    pub probe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            write: Duration::from_secs(30),
            convert: Duration::from_secs(120),
            raster: Duration::from_secs(120),
            probe: Duration::from_secs(2),
        }
    }
}

/// External converter binaries and raster parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterSettings {
    pub soffice_bin: String,
    pub gs_bin: String,
    pub raster_dpi: u32,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            soffice_bin: "soffice".into(),
            gs_bin: "gs".into(),
            raster_dpi: 600,
        }
    }
}

/// Validated, process-wide settings. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The URI exactly as configured, for `status`.
    pub printer_uri: String,
    pub endpoint: DeviceEndpoint,
    pub defaults: JobDefaults,
    pub max_file_bytes: u64,
    /// Empty means no whitelist is enforced.
    pub allowed_requesters: BTreeSet<RequesterId>,
    pub log_level: String,
    pub timeouts: Timeouts,
    pub converters: ConverterSettings,
}

impl AppConfig {
    /// Load from `file` (or [`DEFAULT_CONFIG_FILE`] if present) and the
    /// process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, None)
    }

    /// Like [`AppConfig::load`], with an explicit environment instead of the
    /// process one.
    pub fn load_with_env(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let loaded: AppConfig = Config::builder()
            .add_source(file_source)
            .add_source(Environment::default().source(env))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| DruckpostError::Config(e.to_string()))?;

        debug!(printer_uri = %loaded.printer_uri, "configuration loaded");
        Ok(loaded)
    }

    /// `log_level` as an `EnvFilter` directive.
    pub fn log_filter(&self) -> String {
        self.log_level.trim().to_ascii_lowercase()
    }

    /// Check and resolve the raw values.
    ///
    /// An invalid printer URI is fatal.  Unknown media, sides or scaling
    /// keywords fall back to a default with a warning.
    pub fn validate(&self) -> Result<Settings> {
        let endpoint = DeviceEndpoint::parse(&self.printer_uri)?;

        let duplex = DuplexMode::from_sides_keyword(&self.default_sides).unwrap_or_else(|| {
            warn!(sides = %self.default_sides, fallback = "one-sided", "unknown default sides");
            DuplexMode::Off
        });

        if !self.max_file_mb.is_finite() || self.max_file_mb <= 0.0 {
            return Err(DruckpostError::Config(format!(
                "max_file_mb must be a positive number, got {}",
                self.max_file_mb
            )));
        }
        if self.raster_dpi == 0 {
            return Err(DruckpostError::Config("raster_dpi must be positive".into()));
        }

        Ok(Settings {
            printer_uri: self.printer_uri.trim().to_string(),
            endpoint,
            defaults: JobDefaults {
                duplex,
                media: MediaSize::resolve(&self.default_media),
                scaling: ScalingMode::resolve(&self.default_scaling),
                max_copies: self.max_copies.max(1),
            },
            max_file_bytes: (self.max_file_mb * 1024.0 * 1024.0) as u64,
            allowed_requesters: parse_whitelist(&self.allowed_chat_ids),
            log_level: self.log_level.clone(),
            timeouts: Timeouts {
                connect: secs(self.connect_timeout_secs),
                write: secs(self.write_timeout_secs),
                convert: secs(self.convert_timeout_secs),
                raster: secs(self.raster_timeout_secs),
                probe: secs(self.probe_timeout_secs),
            },
            converters: ConverterSettings {
                soffice_bin: self.soffice_bin.clone(),
                gs_bin: self.gs_bin.clone(),
                raster_dpi: self.raster_dpi,
            },
        })
    }
}

impl Settings {
    /// Settings for a given endpoint with every other value at its default.
    pub fn for_endpoint(endpoint: DeviceEndpoint) -> Self {
        Self {
            printer_uri: endpoint.to_string(),
            endpoint,
            defaults: JobDefaults::default(),
            max_file_bytes: 40 * 1024 * 1024,
            allowed_requesters: BTreeSet::new(),
            log_level: "INFO".into(),
            timeouts: Timeouts::default(),
            converters: ConverterSettings::default(),
        }
    }
}

/// Timeouts of zero would make every step fail immediately.
fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

/// Parse the comma separated whitelist, skipping entries that are not ids.
fn parse_whitelist(raw: &str) -> BTreeSet<RequesterId> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(entry, "ignoring non-numeric whitelist entry");
                None
            }
        })
        .collect()
}
