mod utils;

use dwork_node::DworkNodeBuilder;
use dwork_rpc::WorkUnit;
use utils::{connection_config, start_node, MockExecutor, RecordingListener};

#[tokio::test]
async fn test_join_on_start() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let executor_1 = MockExecutor::default();
    let listener = RecordingListener::default();
    let addr_1 = test_helper::get_unused_addr();
    let node_1 = DworkNodeBuilder::new(
        "node-1",
        connection_config(addr_1, vec![]),
        executor_1.clone(),
    )
    .with_listener(listener.clone())
    .connect()
    .await?;
    assert!(node_1.registry().is_empty());

    let executor_2 = MockExecutor::default();
    let node_2 = start_node(
        "node-2",
        vec![("node-1".to_string(), addr_1.to_string())],
        executor_2.clone(),
    )
    .await?;

    assert_eq!(
        node_1.registry().lookup("node-2")?,
        node_2.listen_addr().to_string(),
        "Node 1 should have learned node 2's address."
    );
    assert!(node_1.capacity().get("node-2").is_some());
    assert_eq!(listener.events(), vec!["join:node-2".to_string()]);

    let work = WorkUnit::new(b"hello, world".to_vec());
    node_2.client().do_work("node-1", &work).await?;
    assert_eq!(executor_1.received(), vec![work.clone()]);

    node_1.client().schedule_work("node-2", &work).await?;
    assert_eq!(executor_2.received(), vec![work]);
    assert_eq!(node_2.statistics().num_work_forwarded(), 1);
    assert_eq!(node_1.statistics().num_requests_handled(), 2);

    node_2.shutdown().await;
    node_1.shutdown().await;

    Ok(())
}

#[tokio::test]
async fn test_leave_on_shutdown() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let node_1 = start_node("node-1", vec![], MockExecutor::default()).await?;
    let node_2 = start_node(
        "node-2",
        vec![("node-1".to_string(), node_1.listen_addr().to_string())],
        MockExecutor::default(),
    )
    .await?;
    assert!(node_1.registry().contains("node-2"));

    node_2.shutdown().await;
    assert!(
        !node_1.registry().contains("node-2"),
        "Node 2 should have been removed after leaving."
    );
    assert!(node_1.capacity().get("node-2").is_none());

    node_1.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_leave_unknown_peer() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let node_1 = start_node("node-1", vec![], MockExecutor::default()).await?;
    let node_2 = start_node("node-2", vec![], MockExecutor::default()).await?;

    // Node 1 has never heard of node 2, leaving is still acknowledged.
    node_2.add_peer("node-1", node_1.listen_addr().to_string());
    node_2.client().leave("node-1").await?;
    assert!(node_1.registry().is_empty());

    node_2.remove_peer("node-1");
    let err = node_2.client().leave("node-1").await.unwrap_err();
    assert!(matches!(err, dwork_rpc::TransportError::UnknownPeer(_)));

    node_2.shutdown().await;
    node_1.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_start_with_unreachable_peer() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let dead_addr = test_helper::get_unused_addr();
    let node = start_node(
        "node-1",
        vec![("node-2".to_string(), dead_addr.to_string())],
        MockExecutor::default(),
    )
    .await?;

    assert!(node.registry().contains("node-2"));
    assert_eq!(node.statistics().num_send_failures(), 1);

    node.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_static_peers_registered() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let node_1 = start_node("node-1", vec![], MockExecutor::default()).await?;

    let listener = RecordingListener::default();
    let dead_addr = test_helper::get_unused_addr();
    let peers = vec![
        ("node-1".to_string(), node_1.listen_addr().to_string()),
        ("node-2".to_string(), node_1.listen_addr().to_string()),
        ("node-3".to_string(), dead_addr.to_string()),
    ];
    let addr = test_helper::get_unused_addr();
    let node_2 = DworkNodeBuilder::new(
        "node-2",
        connection_config(addr, peers),
        MockExecutor::default(),
    )
    .with_listener(listener.clone())
    .connect()
    .await?;

    assert_eq!(node_2.registry().len(), 2);
    assert!(!node_2.registry().contains("node-2"));
    assert!(node_2.capacity().get("node-1").is_some());
    assert!(node_2.capacity().get("node-3").is_some());
    assert!(node_2.capacity().get("node-2").is_none());

    let mut events = listener.events();
    events.sort();
    assert_eq!(events, vec!["join:node-1".to_string(), "join:node-3".to_string()]);

    node_2.shutdown().await;
    node_1.shutdown().await;
    Ok(())
}
