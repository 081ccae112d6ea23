use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live metrics around the transport.
pub struct TransportStatistics(Arc<TransportStatisticsInner>);

impl Deref for TransportStatistics {
    type Target = TransportStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct TransportStatisticsInner {
    /// The number of commands sent to remote peers.
    pub(crate) num_requests_sent: Counter,
    /// The number of commands sent to remote peers which failed.
    pub(crate) num_send_failures: Counter,
    /// The number of commands handled on behalf of remote peers.
    pub(crate) num_requests_handled: Counter,
    /// The number of work units successfully handed to remote peers.
    pub(crate) num_work_forwarded: Counter,
}

impl TransportStatisticsInner {
    /// The number of commands sent to remote peers.
    pub fn num_requests_sent(&self) -> u64 {
        self.num_requests_sent.load(Ordering::Relaxed)
    }

    /// The number of commands sent to remote peers which failed.
    pub fn num_send_failures(&self) -> u64 {
        self.num_send_failures.load(Ordering::Relaxed)
    }

    /// The number of commands handled on behalf of remote peers.
    pub fn num_requests_handled(&self) -> u64 {
        self.num_requests_handled.load(Ordering::Relaxed)
    }

    /// The number of work units successfully handed to remote peers.
    pub fn num_work_forwarded(&self) -> u64 {
        self.num_work_forwarded.load(Ordering::Relaxed)
    }
}
