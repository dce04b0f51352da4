// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckpost Print: the job pipeline from inbound document to printer.
// Authorization, conversion through `druckpost-convert`, per-endpoint
// serialization and the raw TCP session to the device.

pub mod diagnostics;
pub mod frontend;
pub mod pipeline;
pub mod probe;
pub mod raw_client;
pub mod retry;
pub mod serializer;

pub use frontend::{Authorizer, InboundDocument, Whitelist};
pub use pipeline::{FailureReport, JobOutcome, PrintPipeline};
pub use raw_client::{DeviceSession, send_raw};
pub use serializer::{JobSerializer, SessionState};
