// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// What the messaging front end hands to the pipeline, and the authorization
// check it is subject to.

use std::collections::BTreeSet;

use druckpost_core::types::{PrintJob, RequesterId};
use tracing::debug;

/// An attachment received from a chat, as delivered by the front end.
#[derive(Debug, Clone)]
pub struct InboundDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    /// MIME type declared by the messaging service, if any.
    pub mime: Option<String>,
    pub caption: Option<String>,
    pub requester: RequesterId,
}

impl InboundDocument {
    pub fn into_job(self) -> PrintJob {
        PrintJob::new(self.bytes, self.file_name, self.mime, self.caption, self.requester)
    }
}

/// Decides whether a requester may use the printer.
pub trait Authorizer: Send + Sync {
    fn is_allowed(&self, requester: RequesterId) -> bool;
}

/// A fixed set of requester ids. An empty set admits everyone.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    allowed: BTreeSet<RequesterId>,
}

impl Whitelist {
    pub fn new(allowed: BTreeSet<RequesterId>) -> Self {
        Self { allowed }
    }

    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl FromIterator<RequesterId> for Whitelist {
    fn from_iter<I: IntoIterator<Item = RequesterId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Authorizer for Whitelist {
    fn is_allowed(&self, requester: RequesterId) -> bool {
        let allowed = self.is_open() || self.allowed.contains(&requester);
        debug!(requester = requester.0, allowed, "whitelist check");
        allowed
    }
}
