// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP device session (JetDirect, port 9100).
//
// The simplest possible print protocol: open a TCP socket, dump the job,
// shut down the write side.  There is no handshake and nothing comes back, so
// "delivered" means every byte was accepted by the socket.  A failed job is
// never resumed; the caller decides whether to send it again from scratch.

use std::time::Duration;

use druckpost_core::endpoint::DeviceEndpoint;
use druckpost_core::error::{DruckpostError, Result};
use druckpost_core::types::DeliveryResult;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Bytes handed to the socket per write.
const CHUNK_SIZE: usize = 64 * 1024;

/// One open connection to the printer.
pub struct DeviceSession {
    stream: TcpStream,
    addr: String,
    write_timeout: Duration,
    sent: u64,
}

impl DeviceSession {
    /// Connect to `endpoint` within `connect_timeout`.
    ///
    /// `write_timeout` bounds every individual chunk written later, so a
    /// printer that stops reading is detected without capping the size of
    /// the job.
    #[instrument(skip_all, fields(addr = %endpoint.address()))]
    pub async fn open(
        endpoint: &DeviceEndpoint,
        connect_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Self> {
        let addr = endpoint.address();
        let unreachable = |detail: String| DruckpostError::DeviceUnreachable {
            addr: addr.clone(),
            detail,
        };

        let stream = timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                unreachable(format!("connect timed out after {connect_timeout:?}"))
            })?
            .map_err(|e| unreachable(e.to_string()))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "could not disable Nagle");
        }

        info!(addr = %addr, "connected to printer");
        Ok(Self {
            stream,
            addr,
            write_timeout,
            sent: 0,
        })
    }

    /// Bytes accepted by the socket so far.
    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    /// Write the whole payload or fail with the count actually transmitted.
    pub async fn write(&mut self, payload: &[u8]) -> Result<u64> {
        let total = payload.len() as u64;
        for chunk in payload.chunks(CHUNK_SIZE) {
            match timeout(self.write_timeout, self.stream.write_all(chunk)).await {
                Ok(Ok(())) => {
                    self.sent += chunk.len() as u64;
                    debug!(sent = self.sent, total, "raw TCP progress");
                }
                Ok(Err(e)) => return Err(self.incomplete(total, e.to_string())),
                Err(_) => {
                    let detail = format!("printer stopped reading for {:?}", self.write_timeout);
                    return Err(self.incomplete(total, detail));
                }
            }
        }
        match timeout(self.write_timeout, self.stream.flush()).await {
            Ok(Ok(())) => Ok(self.sent),
            Ok(Err(e)) => Err(self.incomplete(total, format!("flush: {e}"))),
            Err(_) => Err(self.incomplete(total, "flush timed out".into())),
        }
    }

    /// Signal end of job by shutting down the write side.
    pub async fn close(mut self) -> Result<()> {
        match timeout(self.write_timeout, self.stream.shutdown()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(self.incomplete(self.sent, format!("shutdown: {e}"))),
            Err(_) => Err(self.incomplete(self.sent, "shutdown timed out".into())),
        }
    }

    fn incomplete(&self, total: u64, detail: String) -> DruckpostError {
        warn!(addr = %self.addr, sent = self.sent, total, detail = %detail, "delivery incomplete");
        DruckpostError::DeliveryIncomplete {
            addr: self.addr.clone(),
            sent: self.sent,
            total,
            detail,
        }
    }
}

/// Open, write, close.  `close` runs even when the write fails.
#[instrument(skip(payload), fields(addr = %endpoint.address(), total = payload.len()))]
pub async fn send_raw(
    endpoint: &DeviceEndpoint,
    payload: &[u8],
    connect_timeout: Duration,
    write_timeout: Duration,
) -> Result<DeliveryResult> {
    let mut session = DeviceSession::open(endpoint, connect_timeout, write_timeout).await?;
    let written = session.write(payload).await;
    let closed = session.close().await;

    let sent = written?;
    closed?;
    info!(bytes = sent, "raw TCP print job sent");
    Ok(DeliveryResult::delivered(sent))
}
