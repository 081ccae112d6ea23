use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dwork_rpc::{
    Handler,
    HandlerError,
    Reply,
    Request,
    RequestKind,
    RpcClient,
    Server,
    Value,
};

#[derive(Default, Clone)]
pub struct CountingHandler {
    count: Arc<AtomicU64>,
}

#[dwork_rpc::async_trait]
impl Handler for CountingHandler {
    async fn on_request(&self, request: Request) -> Result<Reply, HandlerError> {
        let delta = request.long_arg(1)?;
        let total = self.count.fetch_add(delta as u64, Ordering::Relaxed) + delta as u64;
        Ok(Reply::Long(total as i64))
    }
}

#[tokio::test]
async fn test_many_messages() {
    let _ = tracing_subscriber::fmt::try_init();

    let addr = test_helper::get_unused_addr();
    let handler = CountingHandler::default();
    let server = Server::listen(addr, handler.clone()).await.unwrap();

    let client = RpcClient::new();
    let address = addr.to_string();

    let mut tasks = Vec::new();
    for i in 0..250 {
        let client = client.clone();
        let address = address.clone();
        tasks.push(tokio::spawn(async move {
            client
                .send(
                    &address,
                    RequestKind::UpdateShortRunningFree,
                    &[Value::from(format!("node-{i}")), Value::Long(2)],
                )
                .await
        }));
    }

    for task in tasks {
        let reply = task.await.unwrap().expect("Send should succeed");
        assert!(matches!(reply, Reply::Long(n) if n > 0 && n <= 500));
    }

    assert_eq!(handler.count.load(Ordering::Relaxed), 500);
    server.shutdown().await;
}
