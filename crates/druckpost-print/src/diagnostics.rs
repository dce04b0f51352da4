// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic commands: status, ping and help.
//
// Each returns the reply text the front end sends back; `ping` also keeps the
// per-port reports for structured output.  `testpage` lives on the pipeline
// because it is an ordinary print job.

use druckpost_core::config::Settings;
use druckpost_core::endpoint::{DeviceEndpoint, IPP_PORT, RAW_PORT};
use druckpost_core::human_errors::megabytes;
use serde::Serialize;
use tracing::info;

use crate::probe::{ProbeReport, probe_ports};

/// `status`: the configured destination.
pub fn status_text(settings: &Settings) -> String {
    format!("Printer: {}", settings.printer_uri)
}

/// Outcome of `ping`.
#[derive(Debug, Clone, Serialize)]
pub struct PingReport {
    pub host: String,
    /// The port jobs would be sent to.
    pub print_port: u16,
    pub ports: Vec<ProbeReport>,
}

impl PingReport {
    /// True when the print port answered.
    pub fn printer_reachable(&self) -> bool {
        self.ports.iter().any(|p| p.port == self.print_port && p.reachable)
    }

    pub fn text(&self) -> String {
        let mut text = format!("TCP ping to {}:", self.host);
        for report in &self.ports {
            text.push_str("\n- ");
            text.push_str(&report.line());
        }
        text
    }
}

/// `ping [host]`: probe the raw port and, for information, IPP.
///
/// Without `host` the configured printer host is used.  The configured port
/// is probed too when it is not 9100.
pub async fn ping(settings: &Settings, host: Option<&str>) -> PingReport {
    let explicit = host.map(str::trim).filter(|h| !h.is_empty());
    let target = match explicit {
        Some(h) => DeviceEndpoint::raw(h, RAW_PORT),
        None => settings.endpoint.clone(),
    };

    let mut ports = vec![RAW_PORT, IPP_PORT];
    if !ports.contains(&target.port) {
        ports.insert(0, target.port);
    }

    info!(host = %target.host, ?ports, "probing printer");
    PingReport {
        host: target.host.clone(),
        print_port: target.port,
        ports: probe_ports(&target, &ports, settings.timeouts.probe).await,
    }
}

/// `help`: usage plus the settings in effect.
pub fn help_text(settings: &Settings) -> String {
    let defaults = &settings.defaults;
    let duplex = if defaults.duplex.is_duplex() {
        "on (long edge)"
    } else {
        "off (single-sided)"
    };
    let whitelist = match settings.allowed_requesters.len() {
        0 => "open to everyone".to_string(),
        n => format!("{n} allowed chat(s)"),
    };

    format!(
        "Druckpost: prints PDFs, images (JPEG/PNG/WEBP) and Word/Excel/ODF documents \
         on the configured printer over raw TCP 9100, without a spooler.\n\
         \n\
         Usage\n\
         Send a file. Optionally put copies and duplex in the caption:\n\
         \x20 2 on   2 copies, duplex on\n\
         \x20 3 off  3 copies, single-sided\n\
         \x20 2      2 copies, default duplex\n\
         \x20 on/off 1 copy, duplex on/off\n\
         Duplex binds on the long edge. At most {max} copies per job.\n\
         \n\
         Commands\n\
         \x20 status      configured printer\n\
         \x20 ping [host] TCP check of ports 9100 (raw) and 631 (IPP)\n\
         \x20 testpage    one page, 1 copy, duplex off\n\
         \x20 help        this text\n\
         \n\
         Current settings\n\
         \x20 Printer: {uri}\n\
         \x20 Media: {media}  Duplex default: {duplex}  Scaling: {scaling}\n\
         \x20 File size limit: {limit} MB\n\
         \x20 Access: {whitelist}",
        max = defaults.max_copies,
        uri = settings.printer_uri,
        media = defaults.media,
        scaling = defaults.scaling.keyword(),
        limit = megabytes(settings.max_file_bytes),
    )
}

#[cfg(test)]
mod tests {
    use druckpost_core::types::{DuplexMode, RequesterId};
    use tokio::net::TcpListener;

    use super::*;

    fn settings() -> Settings {
        Settings::for_endpoint(DeviceEndpoint::parse("socket://10.1.2.3:9100").unwrap())
    }

    #[test]
    fn status_shows_the_configured_uri() {
        assert_eq!(status_text(&settings()), "Printer: socket://10.1.2.3:9100");
    }

    #[test]
    fn help_reflects_current_settings() {
        let mut s = settings();
        s.defaults.duplex = DuplexMode::LongEdge;
        s.allowed_requesters.insert(RequesterId(5));
        let text = help_text(&s);
        assert!(text.contains("socket://10.1.2.3:9100"));
        assert!(text.contains("Duplex default: on (long edge)"));
        assert!(text.contains("File size limit: 40 MB"));
        assert!(text.contains("1 allowed chat(s)"));
        assert!(text.contains("ping [host]"));
    }

    #[test]
    fn help_shows_fractional_size_limit() {
        let mut s = settings();
        s.max_file_bytes = 512 * 1024;
        assert!(help_text(&s).contains("File size limit: 0.5 MB"));
    }

    #[tokio::test]
    async fn ping_probes_configured_port_when_non_standard() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let settings = Settings::for_endpoint(DeviceEndpoint::raw("127.0.0.1", port));

        let report = ping(&settings, None).await;
        let probed: Vec<u16> = report.ports.iter().map(|p| p.port).collect();
        assert_eq!(probed, vec![port, RAW_PORT, IPP_PORT]);
        assert!(report.ports[0].reachable);
        assert!(report.printer_reachable());
        assert!(report.text().starts_with("TCP ping to 127.0.0.1:"));
    }

    #[tokio::test]
    async fn ping_honours_the_host_argument() {
        let report = ping(&settings(), Some("127.0.0.1")).await;
        assert_eq!(report.host, "127.0.0.1");
        let probed: Vec<u16> = report.ports.iter().map(|p| p.port).collect();
        assert_eq!(probed, vec![RAW_PORT, IPP_PORT]);
    }
}
