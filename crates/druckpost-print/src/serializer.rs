// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job serializer: one device session per printer endpoint at a time.
//
// Each endpoint owns a single-permit semaphore.  Tokio's semaphore hands out
// permits in request order, which gives FIFO admission; a job whose future is
// dropped while waiting simply leaves the wait list.  Once admitted, the
// session runs on its own task, so it finishes (or times out) even if the
// submitter goes away, and both the permit and the busy flag are released by
// `Drop` however the task ends.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use druckpost_core::config::Timeouts;
use druckpost_core::endpoint::DeviceEndpoint;
use druckpost_core::error::{DruckpostError, Result};
use druckpost_core::types::DeliveryResult;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::raw_client::send_raw;

/// Per-endpoint session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Busy,
}

#[derive(Debug)]
struct EndpointGuard {
    permit: Arc<Semaphore>,
    busy: AtomicBool,
    waiting: AtomicUsize,
}

impl EndpointGuard {
    fn new() -> Self {
        Self {
            permit: Arc::new(Semaphore::new(1)),
            busy: AtomicBool::new(false),
            waiting: AtomicUsize::new(0),
        }
    }
}

/// Marks the endpoint busy for as long as it lives.
struct BusyFlag(Arc<EndpointGuard>);

impl BusyFlag {
    fn raise(guard: Arc<EndpointGuard>) -> Self {
        guard.busy.store(true, Ordering::SeqCst);
        Self(guard)
    }
}

impl Drop for BusyFlag {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::SeqCst);
    }
}

/// Counts a job in the wait list until it is admitted or dropped.
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Serializes device sessions per endpoint. Shared by all jobs of a process.
#[derive(Debug, Default)]
pub struct JobSerializer {
    guards: Mutex<HashMap<DeviceEndpoint, Arc<EndpointGuard>>>,
}

impl JobSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self, endpoint: &DeviceEndpoint) -> Arc<EndpointGuard> {
        let mut guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
        guards
            .entry(endpoint.clone())
            .or_insert_with(|| Arc::new(EndpointGuard::new()))
            .clone()
    }

    pub fn state(&self, endpoint: &DeviceEndpoint) -> SessionState {
        if self.guard(endpoint).busy.load(Ordering::SeqCst) {
            SessionState::Busy
        } else {
            SessionState::Idle
        }
    }

    /// Jobs waiting for admission to `endpoint`.
    pub fn queued(&self, endpoint: &DeviceEndpoint) -> usize {
        self.guard(endpoint).waiting.load(Ordering::SeqCst)
    }

    /// Wait for the endpoint, then run `session` as the only session on it.
    ///
    /// A panic inside `session` is reported as a defect; the endpoint is back
    /// to idle either way.
    pub async fn run_exclusive<F, Fut, T>(&self, endpoint: &DeviceEndpoint, session: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.guard(endpoint);

        let permit = {
            let _waiting = Waiting::enter(&guard.waiting);
            debug!(endpoint = %endpoint, queued = guard.waiting.load(Ordering::SeqCst), "waiting for printer");
            guard
                .permit
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| DruckpostError::Defect("endpoint guard closed".into()))?
        };

        let busy = BusyFlag::raise(guard.clone());
        info!(endpoint = %endpoint, "session admitted");
        let task = tokio::spawn(async move {
            let _permit = permit;
            let _busy = busy;
            session().await
        });

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                let what = if join_error.is_panic() { "panicked" } else { "was cancelled" };
                error!(endpoint = %endpoint, "device session {what}");
                Err(DruckpostError::Defect(format!("device session for {endpoint} {what}")))
            }
        }
    }

    /// Deliver `payload` to `endpoint` once every earlier job has finished.
    pub async fn deliver(
        &self,
        endpoint: &DeviceEndpoint,
        payload: Vec<u8>,
        timeouts: Timeouts,
    ) -> Result<DeliveryResult> {
        let target = endpoint.clone();
        self.run_exclusive(endpoint, move || async move {
            send_raw(&target, &payload, timeouts.connect, timeouts.write).await
        })
        .await
    }
}
