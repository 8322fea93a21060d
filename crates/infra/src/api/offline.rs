//! Offline queue hand-off
//!
//! When a mutating request fails with a timeout or transport error while the
//! device reports no connectivity, the request is parked in the offline queue
//! and the caller gets a localized "saved, will sync" notice instead of a
//! hard failure.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lugn_domain::{QueuedMethod, QueuedRequest};
use tracing::{info, warn};

use super::context::RequestContext;
use super::errors::CollaboratorError;
use super::traits::{ConnectivityProbe, OfflineQueue};

pub struct OfflineQueueBridge {
    queue: Arc<dyn OfflineQueue>,
    connectivity: Arc<dyn ConnectivityProbe>,
}

impl OfflineQueueBridge {
    pub fn new(queue: Arc<dyn OfflineQueue>, connectivity: Arc<dyn ConnectivityProbe>) -> Self {
        Self { queue, connectivity }
    }

    pub fn is_offline(&self) -> bool {
        !self.connectivity.is_online()
    }

    /// Park the request if its method is queueable.
    ///
    /// Returns the queued method, or `None` for GET/PATCH and other methods
    /// the queue does not store. A queue write failure is logged; the caller
    /// still receives the offline notice.
    pub async fn enqueue(&self, ctx: &RequestContext) -> Option<QueuedMethod> {
        let method = QueuedMethod::from_http(ctx.method.as_str())?;
        let request = QueuedRequest::new(method, ctx.url.clone(), ctx.body.clone());
        let id = request.id;

        match self.queue.queue_request(request).await {
            Ok(()) => {
                info!(%method, url = %ctx.url, queued_id = %id, "request queued for offline sync");
            }
            Err(err) => {
                warn!(%method, url = %ctx.url, error = %err, "failed to queue offline request");
            }
        }
        Some(method)
    }
}

/// Process-local FIFO offline queue
#[derive(Debug, Default)]
pub struct MemoryOfflineQueue {
    entries: Mutex<VecDeque<QueuedRequest>>,
}

impl MemoryOfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<QueuedRequest>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn enqueue(&self, request: QueuedRequest) {
        self.lock().push_back(request);
    }

    /// Remove and return every queued request in insertion order
    pub fn drain(&self) -> Vec<QueuedRequest> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl OfflineQueue for MemoryOfflineQueue {
    async fn queue_request(&self, request: QueuedRequest) -> Result<(), CollaboratorError> {
        self.enqueue(request);
        Ok(())
    }
}

/// Online/offline switch driven by the host platform
#[derive(Debug)]
pub struct ConnectivityFlag {
    online: AtomicBool,
}

impl ConnectivityFlag {
    pub const fn online() -> Self {
        Self { online: AtomicBool::new(true) }
    }

    pub const fn offline() -> Self {
        Self { online: AtomicBool::new(false) }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::online()
    }
}

impl ConnectivityProbe for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }
}
