#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dwork_node::{
    ConnectionConfig,
    DworkNode,
    DworkNodeBuilder,
    NodeError,
    NotificationListener,
    WorkExecutor,
};
use dwork_rpc::{async_trait, WorkError, WorkUnit};
use parking_lot::Mutex;

#[derive(Default)]
struct MockExecutorInner {
    received: Mutex<Vec<WorkUnit>>,
    error: Mutex<Option<WorkError>>,
    start_elapsed: AtomicU64,
    short_running_free: AtomicU64,
    long_running_free: AtomicU64,
}

#[derive(Clone, Default)]
/// An executor which records the work it receives.
pub struct MockExecutor(Arc<MockExecutorInner>);

impl MockExecutor {
    pub fn with_capacity(short_running_free: u64, long_running_free: u64) -> Self {
        let executor = Self::default();
        executor
            .0
            .short_running_free
            .store(short_running_free, Ordering::Relaxed);
        executor
            .0
            .long_running_free
            .store(long_running_free, Ordering::Relaxed);
        executor
    }

    /// Sets the elapsed time reported when starting work.
    pub fn set_start_elapsed(&self, millis: u64) {
        self.0.start_elapsed.store(millis, Ordering::Relaxed);
    }

    /// Makes every subsequent submission fail with the given error.
    pub fn fail_with(&self, error: WorkError) {
        *self.0.error.lock() = Some(error);
    }

    pub fn received(&self) -> Vec<WorkUnit> {
        self.0.received.lock().clone()
    }

    fn accept(&self, work: WorkUnit) -> Result<(), WorkError> {
        if let Some(error) = self.0.error.lock().clone() {
            return Err(error);
        }

        self.0.received.lock().push(work);
        Ok(())
    }
}

#[async_trait]
impl WorkExecutor for MockExecutor {
    async fn local_do_work(&self, work: WorkUnit) -> Result<(), WorkError> {
        self.accept(work)
    }

    async fn local_start_work(&self, work: WorkUnit) -> Result<u64, WorkError> {
        self.accept(work)?;
        Ok(self.0.start_elapsed.load(Ordering::Relaxed))
    }

    async fn local_schedule_work(&self, work: WorkUnit) -> Result<(), WorkError> {
        self.accept(work)
    }

    fn local_short_running_free(&self) -> u64 {
        self.0.short_running_free.load(Ordering::Relaxed)
    }

    fn local_long_running_free(&self) -> u64 {
        self.0.long_running_free.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Default)]
/// A listener which records the events it is notified of.
pub struct RecordingListener(Arc<Mutex<Vec<String>>>);

impl RecordingListener {
    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    fn record(&self, event: String) {
        self.0.lock().push(event);
    }
}

impl NotificationListener for RecordingListener {
    fn join(&self, peer_id: &str) {
        self.record(format!("join:{peer_id}"));
    }

    fn leave(&self, peer_id: &str) {
        self.record(format!("leave:{peer_id}"));
    }

    fn update_short_running_free(&self, peer_id: &str, count: u64) {
        self.record(format!("short:{peer_id}:{count}"));
    }

    fn delta_do_work_accepted(&self, peer_id: &str) {
        self.record(format!("accepted:{peer_id}"));
    }
}

/// Starts a node listening on a fresh local address.
pub async fn start_node(
    node_id: &str,
    peers: Vec<(String, String)>,
    executor: MockExecutor,
) -> Result<DworkNode, NodeError> {
    let addr = test_helper::get_unused_addr();
    DworkNodeBuilder::new(node_id, connection_config(addr, peers), executor)
        .connect()
        .await
}

pub fn connection_config(addr: SocketAddr, peers: Vec<(String, String)>) -> ConnectionConfig {
    ConnectionConfig::new(addr, addr, peers)
}
