// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckpost: chat-to-printer pipeline, command-line front end.
//
// Plays the part of the messaging front end: each invocation is one inbound
// message from `--requester`, and the reply is printed to stdout.  Logs go to
// stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use druckpost_core::config::AppConfig;
use druckpost_core::human_errors::humanize_error;
use druckpost_core::types::RequesterId;
use druckpost_print::diagnostics::{help_text, ping, status_text};
use druckpost_print::retry::{RetryConfig, RetryDecision, should_retry};
use druckpost_print::{InboundDocument, JobOutcome, PrintPipeline};
use tracing::{Subscriber, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Parser, Debug)]
#[command(name = "druckpost")]
#[command(about = "Print documents on a raw TCP (port 9100) printer", long_about = None)]
#[command(version, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (default: ./druckpost.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Chat id the request comes from
    #[arg(short, long, global = true, default_value = "0", allow_negative_numbers = true)]
    requester: i64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a document
    Print {
        /// PDF, image or office document
        file: PathBuf,

        /// Caption, e.g. "2 on" for two duplex copies
        #[arg(long)]
        caption: Option<String>,

        /// Declared MIME type
        #[arg(long)]
        mime: Option<String>,

        /// Resubmit up to N times after a transient failure
        #[arg(long, default_value = "0")]
        retries: u32,

        /// Print the job outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the configured printer
    Status,

    /// Check TCP reachability of the printer
    Ping {
        /// Host to probe instead of the configured printer
        host: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print a one-page test job
    Testpage {
        #[arg(long)]
        json: bool,
    },

    /// Usage and current settings
    Help,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let cfg = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    // Installed before validation, which logs every fallback it applies.
    tracing::subscriber::set_global_default(log_subscriber(&cfg, std::io::stderr))
        .context("installing logger")?;
    let settings = cfg.validate().context("validating configuration")?;

    info!(endpoint = %settings.endpoint, "druckpost starting");
    let pipeline = PrintPipeline::standard(settings);
    let requester = RequesterId(cli.requester);

    match cli.command {
        Commands::Print {
            file,
            caption,
            mime,
            retries,
            json,
        } => {
            let document = read_document(&file, caption, mime, requester).await?;
            let outcome = submit_with_retries(&pipeline, document, RetryConfig::with_retries(retries)).await;
            report(&outcome, json)
        }
        Commands::Testpage { json } => {
            let outcome = pipeline.print_test_page(requester).await;
            report(&outcome, json)
        }
        other => {
            if let Err(err) = pipeline.authorize(requester) {
                println!("{}", humanize_error(&err).reply_text());
                return Ok(ExitCode::FAILURE);
            }
            match other {
                Commands::Status => println!("{}", status_text(pipeline.settings())),
                Commands::Ping { host, json } => {
                    let report = ping(pipeline.settings(), host.as_deref()).await;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        println!("{}", report.text());
                    }
                }
                _ => println!("{}", help_text(pipeline.settings())),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Log to `writer`, filtered by `RUST_LOG` or else the configured level.
fn log_subscriber<W>(cfg: &AppConfig, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cfg.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

async fn read_document(
    path: &Path,
    caption: Option<String>,
    mime: Option<String>,
    requester: RequesterId,
) -> Result<InboundDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    Ok(InboundDocument {
        bytes,
        file_name,
        mime,
        caption,
        requester,
    })
}

/// Submit, resubmitting from scratch while the failure is transient.
async fn submit_with_retries(
    pipeline: &PrintPipeline,
    document: InboundDocument,
    config: RetryConfig,
) -> JobOutcome {
    let mut attempt = 0;
    loop {
        let outcome = pipeline.submit(document.clone()).await;
        let decision = outcome.error().map(|err| should_retry(err, attempt, &config));
        match decision {
            Some(RetryDecision::RetryAfter(delay)) => {
                warn!(attempt, delay_ms = delay.as_millis() as u64, "job failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            _ => return outcome,
        }
    }
}

fn report(outcome: &JobOutcome, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        println!("{}", outcome.reply_text());
    }
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn configuration_fallbacks_reach_the_log() {
        let env: HashMap<String, String> = [
            ("PRINTER_URI", "socket://127.0.0.1:9100"),
            ("DEFAULT_MEDIA", "B5"),
            ("DEFAULT_SIDES", "sometimes"),
            ("ALLOWED_CHAT_IDS", "abc,7"),
            ("LOG_LEVEL", "warn"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let cfg = AppConfig::load_with_env(None, Some(env)).unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = log_subscriber(&cfg, move || writer.clone());
        let settings = tracing::subscriber::with_default(subscriber, || cfg.validate()).unwrap();

        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("unknown media size"), "{log}");
        assert!(log.contains("unknown default sides"), "{log}");
        assert!(log.contains("ignoring non-numeric whitelist entry"), "{log}");
        assert_eq!(settings.allowed_requesters.len(), 1);
    }

    #[test]
    fn print_accepts_caption_and_negative_requester() {
        let cli = Cli::try_parse_from([
            "druckpost",
            "--requester",
            "-1001",
            "print",
            "report.pdf",
            "--caption",
            "3 off",
            "--retries",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.requester, -1001);
        match cli.command {
            Commands::Print {
                file,
                caption,
                retries,
                json,
                ..
            } => {
                assert_eq!(file, PathBuf::from("report.pdf"));
                assert_eq!(caption.as_deref(), Some("3 off"));
                assert_eq!(retries, 2);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ping_host_is_optional() {
        let cli = Cli::try_parse_from(["druckpost", "ping"]).unwrap();
        assert!(matches!(cli.command, Commands::Ping { host: None, .. }));
        let cli = Cli::try_parse_from(["druckpost", "ping", "10.0.0.7"]).unwrap();
        assert!(matches!(cli.command, Commands::Ping { host: Some(h), .. } if h == "10.0.0.7"));
    }

    #[test]
    fn help_is_an_ordinary_command() {
        let cli = Cli::try_parse_from(["druckpost", "help", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Help));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[tokio::test]
    async fn permanent_failures_are_not_resubmitted() {
        use druckpost_core::Settings;
        use druckpost_core::endpoint::DeviceEndpoint;

        let pipeline = PrintPipeline::standard(Settings::for_endpoint(DeviceEndpoint::raw("127.0.0.1", 9)));
        let document = InboundDocument {
            bytes: b"MZ".to_vec(),
            file_name: "setup.exe".into(),
            mime: None,
            caption: None,
            requester: RequesterId(1),
        };
        let outcome = submit_with_retries(&pipeline, document, RetryConfig::with_retries(5)).await;
        assert!(!outcome.is_success());
        assert!(outcome.reply_text().starts_with("Unsupported file."));
    }
}
