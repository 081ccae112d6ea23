use async_trait::async_trait;
use dwork_rpc::{WorkError, WorkUnit};

#[async_trait]
/// The local work executor which runs work units on this node.
///
/// Work forwarded by peers, and work submitted to the node itself, ends up
/// here. Errors are returned to the caller exactly as they are raised.
pub trait WorkExecutor: Send + Sync + 'static {
    /// Accepts the work and waits for it to complete.
    async fn local_do_work(&self, work: WorkUnit) -> Result<(), WorkError>;

    /// Accepts the work and waits for it to start.
    ///
    /// Returns the number of milliseconds the work took to start.
    async fn local_start_work(&self, work: WorkUnit) -> Result<u64, WorkError>;

    /// Accepts the work without waiting for it to start.
    async fn local_schedule_work(&self, work: WorkUnit) -> Result<(), WorkError>;

    /// The number of free short-running slots.
    fn local_short_running_free(&self) -> u64;

    /// The number of free long-running slots.
    fn local_long_running_free(&self) -> u64;
}
