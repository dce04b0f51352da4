// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print pipeline: from an inbound document to a delivery result.
//
//   authorize -> size check -> classify -> caption -> convert -> serialize -> send
//
// Every failure is caught here and turned into a `JobOutcome`; nothing
// escapes to the front end except that value.

use std::sync::Arc;

use druckpost_convert::{ConversionRoute, ConverterChain, PdfWriter, classify, standard_chain};
use druckpost_core::caption::parse_caption;
use druckpost_core::config::Settings;
use druckpost_core::error::{DruckpostError, FailureKind, Result};
use druckpost_core::human_errors::humanize_error;
use druckpost_core::types::{DeliveryResult, JobId, JobOptions, PrintJob, RequesterId, RouteTag, Stage};
use serde::Serialize;
use tracing::{Instrument, Span, error, info, info_span, warn};

use crate::frontend::{Authorizer, InboundDocument, Whitelist};
use crate::serializer::JobSerializer;

/// File name used for the diagnostic page.
pub const TEST_PAGE_NAME: &str = "druckpost-testpage.pdf";

/// Why a job failed, in reportable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub detail: String,
    pub message: String,
    pub suggestion: String,
    pub retriable: bool,
}

impl FailureReport {
    fn from_error(err: &DruckpostError) -> Self {
        let human = humanize_error(err);
        Self {
            kind: err.kind(),
            stage: err.failed_stage(),
            detail: err.to_string(),
            message: human.message,
            suggestion: human.suggestion,
            retriable: human.retriable,
        }
    }
}

/// The structured result of one submission.
#[derive(Debug, Serialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub file_name: String,
    pub requester: RequesterId,
    /// Absent when the job was rejected before its caption was read.
    pub options: Option<JobOptions>,
    pub route: Option<RouteTag>,
    pub delivery: DeliveryResult,
    pub failure: Option<FailureReport>,
    #[serde(skip)]
    error: Option<DruckpostError>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.delivery.success
    }

    /// The underlying error, for callers that decide on retries.
    pub fn error(&self) -> Option<&DruckpostError> {
        self.error.as_ref()
    }

    /// The status line sent back to the requester.
    pub fn reply_text(&self) -> String {
        match (&self.failure, &self.options) {
            (Some(failure), _) => format!("{} {}", failure.message, failure.suggestion),
            (None, Some(options)) => format!(
                "Sent to printer: {} ({} bytes, copies: {}, duplex: {}).",
                self.file_name,
                self.delivery.bytes_sent,
                options.copies,
                if options.duplex.is_duplex() { "on" } else { "off" },
            ),
            (None, None) => format!("Sent to printer: {}.", self.file_name),
        }
    }
}

/// What a job got as far as before it stopped.
#[derive(Default)]
struct Progress {
    options: Option<JobOptions>,
    route: Option<RouteTag>,
}

/// The print pipeline.  Cheap to clone; clones share the serializer.
#[derive(Clone)]
pub struct PrintPipeline {
    settings: Arc<Settings>,
    chain: ConverterChain,
    serializer: Arc<JobSerializer>,
    authorizer: Arc<dyn Authorizer>,
}

impl PrintPipeline {
    pub fn new(
        settings: Arc<Settings>,
        chain: ConverterChain,
        serializer: Arc<JobSerializer>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            settings,
            chain,
            serializer,
            authorizer,
        }
    }

    /// Production wiring: external converters and the configured whitelist.
    pub fn standard(settings: Settings) -> Self {
        let chain = standard_chain(&settings);
        let whitelist = Whitelist::new(settings.allowed_requesters.clone());
        Self::new(
            Arc::new(settings),
            chain,
            Arc::new(JobSerializer::new()),
            Arc::new(whitelist),
        )
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn serializer(&self) -> &Arc<JobSerializer> {
        &self.serializer
    }

    /// `Unauthorized` unless `requester` may use the printer.
    pub fn authorize(&self, requester: RequesterId) -> Result<()> {
        if self.authorizer.is_allowed(requester) {
            Ok(())
        } else {
            warn!(requester = requester.0, "requester rejected");
            Err(DruckpostError::Unauthorized(requester.to_string()))
        }
    }

    /// Print one document received from the front end.
    pub async fn submit(&self, document: InboundDocument) -> JobOutcome {
        let job = document.into_job();
        let span = info_span!(
            "print_job",
            job_id = %job.id(),
            requester = job.requester().0,
            file_name = %job.file_name(),
            bytes = job.size(),
            hash = tracing::field::Empty,
        );
        async {
            let mut progress = Progress::default();
            let result = self.process(&job, &mut progress).await;
            finish(&job, progress, result)
        }
        .instrument(span)
        .await
    }

    /// Print the built-in diagnostic page: one copy, single-sided, through
    /// the full pipeline.
    pub async fn print_test_page(&self, requester: RequesterId) -> JobOutcome {
        let lines = [
            "DRUCKPOST TEST PAGE".to_string(),
            "RAW 9100 / PCL XL".to_string(),
            format!("Printer: {}", self.settings.printer_uri),
            format!("Media: {}", self.settings.defaults.media),
            "OK.".to_string(),
        ];
        let pdf = match PdfWriter::new(self.settings.defaults.media).text_page(&lines) {
            Ok(pdf) => pdf,
            Err(err) => {
                let job = PrintJob::new(Vec::new(), TEST_PAGE_NAME, None, None, requester);
                let err = DruckpostError::Defect(format!("test page could not be built: {err}"));
                return finish(&job, Progress::default(), Err(err));
            }
        };

        self.submit(InboundDocument {
            bytes: pdf,
            file_name: TEST_PAGE_NAME.into(),
            mime: Some("application/pdf".into()),
            caption: Some("1 off".into()),
            requester,
        })
        .await
    }

    async fn process(&self, job: &PrintJob, progress: &mut Progress) -> Result<DeliveryResult> {
        self.authorize(job.requester())?;

        let limit = self.settings.max_file_bytes;
        if job.size() > limit {
            return Err(DruckpostError::FileTooLarge {
                size: job.size(),
                limit,
            });
        }
        Span::current().record("hash", job.content_hash());

        let tag = classify(job.file_name(), job.media_type());
        progress.route = Some(tag);
        let route = ConversionRoute::for_tag(tag, job.file_name())?;

        let options = parse_caption(job.caption(), &self.settings.defaults);
        progress.options = Some(options);
        info!(
            route = %tag,
            copies = options.copies,
            duplex = options.duplex.sides_keyword(),
            media = %options.media,
            "job accepted"
        );

        let payload = self
            .chain
            .run(&route, job.document(), job.file_name(), &options)
            .await?;

        let endpoint = &self.settings.endpoint;
        info!(
            endpoint = %endpoint,
            bytes = payload.len(),
            queued = self.serializer.queued(endpoint),
            "job ready for printer"
        );
        self.serializer
            .deliver(endpoint, payload, self.settings.timeouts)
            .await
    }
}

impl std::fmt::Debug for PrintPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintPipeline")
            .field("endpoint", &self.settings.endpoint)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

fn finish(job: &PrintJob, progress: Progress, result: Result<DeliveryResult>) -> JobOutcome {
    let (delivery, failure, error) = match result {
        Ok(delivery) => {
            info!(bytes = delivery.bytes_sent, "job printed");
            (delivery, None, None)
        }
        Err(err) => {
            let sent = match &err {
                DruckpostError::DeliveryIncomplete { sent, .. } => *sent,
                _ => 0,
            };
            match err.kind() {
                FailureKind::Defect => error!(error = %err, "job aborted by defect"),
                kind => warn!(?kind, error = %err, "job failed"),
            }
            let report = FailureReport::from_error(&err);
            (
                DeliveryResult::failed(sent, report.detail.clone()),
                Some(report),
                Some(err),
            )
        }
    };

    JobOutcome {
        job_id: job.id(),
        file_name: job.file_name().to_string(),
        requester: job.requester(),
        options: progress.options,
        route: progress.route,
        delivery,
        failure,
        error,
    }
}
