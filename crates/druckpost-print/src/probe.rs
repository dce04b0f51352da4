// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reachability probe: a bare TCP connect, nothing written.  Used by `ping`,
// never by the print path.

use std::time::{Duration, Instant};

use druckpost_core::endpoint::DeviceEndpoint;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Result of probing one port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub addr: String,
    pub port: u16,
    pub reachable: bool,
    /// Time to establish the connection, when it succeeded.
    pub latency_ms: Option<f64>,
    pub error: Option<String>,
}

impl ProbeReport {
    /// `Port 9100: open (1.3 ms)` / `Port 631: closed (connection refused)`.
    pub fn line(&self) -> String {
        match (self.reachable, self.latency_ms, &self.error) {
            (true, Some(ms), _) => format!("Port {}: open ({ms:.1} ms)", self.port),
            (true, None, _) => format!("Port {}: open", self.port),
            (false, _, Some(err)) => format!("Port {}: closed ({err})", self.port),
            (false, _, None) => format!("Port {}: closed", self.port),
        }
    }
}

/// Connect to `endpoint` and close again immediately.
pub async fn probe(endpoint: &DeviceEndpoint, limit: Duration) -> ProbeReport {
    let addr = endpoint.address();
    let started = Instant::now();
    let outcome = match timeout(limit, TcpStream::connect(&addr)).await {
        Ok(Ok(_stream)) => Ok(started.elapsed()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}s", limit.as_secs())),
    };
    debug!(addr = %addr, ?outcome, "probe finished");

    match outcome {
        Ok(elapsed) => ProbeReport {
            addr,
            port: endpoint.port,
            reachable: true,
            latency_ms: Some(elapsed.as_secs_f64() * 1000.0),
            error: None,
        },
        Err(error) => ProbeReport {
            addr,
            port: endpoint.port,
            reachable: false,
            latency_ms: None,
            error: Some(error),
        },
    }
}

/// Probe several ports of the same host concurrently, results in port order.
pub async fn probe_ports(host: &DeviceEndpoint, ports: &[u16], limit: Duration) -> Vec<ProbeReport> {
    let handles: Vec<_> = ports
        .iter()
        .map(|&port| {
            let endpoint = host.with_port(port);
            tokio::spawn(async move { probe(&endpoint, limit).await })
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(e) => debug!(error = %e, "probe task lost"),
        }
    }
    reports
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn open_port_reports_latency() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let report = probe(&DeviceEndpoint::raw("127.0.0.1", port), Duration::from_secs(2)).await;
        assert!(report.reachable);
        assert!(report.latency_ms.is_some());
        assert!(report.line().starts_with(&format!("Port {port}: open (")));
    }

    #[tokio::test]
    async fn closed_port_reports_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let report = probe(&DeviceEndpoint::raw("127.0.0.1", port), Duration::from_secs(2)).await;
        assert!(!report.reachable);
        assert!(report.error.is_some());
        assert!(report.line().contains("closed"));
    }

    #[tokio::test]
    async fn multiple_ports_keep_their_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };

        let reports = probe_ports(
            &DeviceEndpoint::raw("127.0.0.1", open),
            &[open, closed],
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(reports.len(), 2);
        assert_eq!((reports[0].port, reports[0].reachable), (open, true));
        assert_eq!((reports[1].port, reports[1].reachable), (closed, false));
    }
}
