// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Converter capability and the chain that runs a route through it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use druckpost_core::error::{DruckpostError, Result, StageError};
use druckpost_core::integrity::short_hash;
use druckpost_core::types::{JobOptions, Stage};
use tracing::{debug, info, instrument, warn};

use crate::classify::ConversionRoute;
use crate::encoder;

/// What a stage gets to work with.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    /// Output of the previous stage, or the submitted document.
    pub bytes: &'a [u8],
    /// File name as submitted.
    pub file_name: &'a str,
    pub options: &'a JobOptions,
}

/// One conversion stage: bytes in, bytes out.
#[async_trait]
pub trait Converter: Send + Sync {
    /// The stage this converter implements.
    fn stage(&self) -> Stage;

    async fn convert(&self, input: StageInput<'_>) -> std::result::Result<Vec<u8>, StageError>;
}

/// Converters keyed by the stage they implement.
#[derive(Clone, Default)]
pub struct ConverterChain {
    converters: HashMap<Stage, Arc<dyn Converter>>,
}

impl ConverterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter, replacing any previous one for the same stage.
    pub fn with(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters.insert(converter.stage(), converter);
        self
    }

    /// Run `document` through every stage of `route`.
    ///
    /// The first failing stage aborts the job.  The result is always a
    /// complete PJL-wrapped print job; anything else is a defect.
    #[instrument(skip_all, fields(file_name = %file_name, stages = ?route.stages(), input_bytes = document.len()))]
    pub async fn run(
        &self,
        route: &ConversionRoute,
        document: &[u8],
        file_name: &str,
        options: &JobOptions,
    ) -> Result<Vec<u8>> {
        let mut produced: Option<Vec<u8>> = None;

        for &stage in route.stages() {
            let converter = self.converters.get(&stage).ok_or_else(|| {
                DruckpostError::Defect(format!("no converter registered for the {stage} stage"))
            })?;

            let input = StageInput {
                bytes: produced.as_deref().unwrap_or(document),
                file_name,
                options,
            };
            let started = Instant::now();
            let output = converter.convert(input).await.map_err(|err| {
                warn!(%stage, error = %err, "converter stage failed");
                DruckpostError::conversion(stage, err)
            })?;

            info!(
                %stage,
                input_bytes = input.bytes.len(),
                output_bytes = output.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "converter stage finished"
            );
            produced = Some(output);
        }

        let job = produced.ok_or_else(|| DruckpostError::Defect("empty conversion route".into()))?;
        if !encoder::is_print_job(&job) {
            return Err(DruckpostError::Defect(
                "final stage did not produce a PJL print job".into(),
            ));
        }
        debug!(bytes = job.len(), hash = %short_hash(&job), "print job ready");
        Ok(job)
    }
}

impl std::fmt::Debug for ConverterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stages: Vec<String> = self.converters.keys().map(Stage::to_string).collect();
        stages.sort();
        f.debug_struct("ConverterChain").field("stages", &stages).finish()
    }
}
