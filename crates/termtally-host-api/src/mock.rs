//! Mock session reader for testing

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use termtally_config::HostConfig;
use termtally_util::HostId;
use tokio::time::Instant;

use crate::{ReaderError, ReaderResult, SessionListing, SessionReader, SessionRecord};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock reader for unit/integration testing
///
/// Each host reports whatever was last scripted for it (nothing by default).
#[derive(Default)]
pub struct MockReader {
    sessions: Arc<Mutex<HashMap<HostId, SessionListing>>>,
    failing: Arc<Mutex<HashSet<HostId>>>,
    delays: Arc<Mutex<HashMap<HostId, Duration>>>,
    reads: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    read_starts: Mutex<Vec<Instant>>,
}

/// Counts a read as in flight until dropped, even if the read is cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the sessions a host reports from now on
    pub fn set_sessions(&self, host: impl Into<HostId>, records: Vec<SessionRecord>) {
        lock(&self.sessions).insert(host.into(), SessionListing::new(records));
    }

    /// Script a full listing, including a malformed line count
    pub fn set_listing(&self, host: impl Into<HostId>, listing: SessionListing) {
        lock(&self.sessions).insert(host.into(), listing);
    }

    /// Make reads of a host fail (or succeed again)
    pub fn set_failing(&self, host: impl Into<HostId>, failing: bool) {
        let host = host.into();
        let mut set = lock(&self.failing);
        if failing {
            set.insert(host);
        } else {
            set.remove(&host);
        }
    }

    /// Make reads of a host take `delay` before answering
    pub fn set_delay(&self, host: impl Into<HostId>, delay: Duration) {
        lock(&self.delays).insert(host.into(), delay);
    }

    /// Number of reads attempted so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Most reads that were ever running at the same time
    pub fn max_concurrent_reads(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// When each read started, in order
    pub fn read_starts(&self) -> Vec<Instant> {
        lock(&self.read_starts).clone()
    }
}

#[async_trait]
impl SessionReader for MockReader {
    async fn list_sessions(&self, host: &HostConfig) -> ReaderResult<SessionListing> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        lock(&self.read_starts).push(Instant::now());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = lock(&self.delays).get(&host.id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if lock(&self.failing).contains(&host.id) {
            return Err(ReaderError::HostUnreachable(format!(
                "mock failure for {}",
                host.address
            )));
        }

        Ok(lock(&self.sessions)
            .get(&host.id)
            .cloned()
            .unwrap_or_default())
    }
}
