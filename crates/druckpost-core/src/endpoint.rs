// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer endpoint parsed from a `socket://host:port` URI.
//
// Druckpost talks to exactly one kind of device: a printer listening for raw
// PCL on a TCP port (JetDirect style, usually 9100).  Any other scheme is
// rejected at start-up so no job is ever accepted against an endpoint we
// cannot drive.

use serde::{Deserialize, Serialize};

use crate::error::{DruckpostError, Result};

/// Default raw TCP port (HP JetDirect).
pub const RAW_PORT: u16 = 9100;

/// Standard IPP port, probed informationally by `ping`.
pub const IPP_PORT: u16 = 631;

/// Transport used to reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// Plain TCP, bytes in, nothing back.
    RawSocket,
}

/// Process-wide printer address. Read-only after start-up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: u16,
    pub transport: TransportKind,
}

impl DeviceEndpoint {
    /// Build an endpoint directly from host and port.
    pub fn raw(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            transport: TransportKind::RawSocket,
        }
    }

    /// Parse a `socket://host[:port][/]` URI.
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| DruckpostError::InvalidEndpoint {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(invalid("no printer URI configured (expected socket://IP:9100)"));
        }

        let (scheme, rest) = trimmed
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme (expected socket://IP:9100)"))?;
        if !scheme.eq_ignore_ascii_case("socket") {
            return Err(invalid("only socket:// (raw TCP) printers are supported"));
        }

        // Anything after the authority (path, query) carries no meaning for
        // raw printing and is dropped.
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let authority = authority.rsplit('@').next().unwrap_or(authority);

        let (host, port) = split_host_port(authority).map_err(|reason| invalid(&reason))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self::raw(host, port.unwrap_or(RAW_PORT)))
    }

    /// `host:port` form suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        address_of(&self.host, self.port)
    }

    /// Same host, a different port (used by the IPP probe).
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            port,
            ..self.clone()
        }
    }
}

impl std::fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "socket://{}", self.address())
    }
}

/// Format `host:port`, bracketing IPv6 literals.
pub fn address_of(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn split_host_port(authority: &str) -> std::result::Result<(String, Option<u16>), String> {
    if let Some(rest) = authority.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| "unterminated IPv6 address".to_string())?;
        let port = match tail.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None if tail.is_empty() => None,
            None => return Err(format!("unexpected '{tail}' after IPv6 address")),
        };
        return Ok((host.to_string(), port));
    }

    match authority.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => {
            Err("IPv6 addresses must be bracketed, e.g. [fe80::1]:9100".to_string())
        }
        Some((host, port)) => Ok((host.to_string(), Some(parse_port(port)?))),
        None => Ok((authority.to_string(), None)),
    }
}

fn parse_port(text: &str) -> std::result::Result<u16, String> {
    match text.parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("invalid port '{text}'")),
        Ok(port) => Ok(port),
    }
}
