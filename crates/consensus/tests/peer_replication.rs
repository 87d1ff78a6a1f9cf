//! Multi-node replication over real websocket sessions

use ledger_chain::is_valid_chain;
use ledger_consensus::{Node, NodeBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

async fn start_node() -> (Arc<Node>, SocketAddr) {
    let node = Arc::new(
        NodeBuilder::new()
            .p2p_addr("127.0.0.1:0")
            .send_timeout_ms(1_000)
            .connect_timeout_ms(1_000)
            .build(),
    );
    let addr = node.start().await.unwrap();
    (node, addr)
}

/// Poll `check` until it holds or five seconds pass
async fn wait_until(what: &str, check: impl Fn() -> bool) {
    for _ in 0..250 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {}", what);
}

#[tokio::test]
async fn test_mined_block_reaches_peer() {
    let (a, a_addr) = start_node().await;
    let (b, _) = start_node().await;

    b.add_peer(&a_addr.to_string()).await.unwrap();
    wait_until("both sessions open", || {
        a.list_peers().len() == 1 && b.list_peers().len() == 1
    })
    .await;

    let block = a.mine("x").unwrap();

    wait_until("b to extend", || b.chain_len() == 2).await;
    assert_eq!(b.latest_block(), block);
    assert_eq!(b.latest_block().data, "x");
    assert_eq!(b.list_chain(), a.list_chain());
}

#[tokio::test]
async fn test_lagging_node_catches_up_on_connect() {
    let (a, a_addr) = start_node().await;
    a.mine("one").unwrap();
    a.mine("two").unwrap();
    assert_eq!(a.chain_len(), 3);

    let (b, _) = start_node().await;
    b.add_peer(&format!("ws://{}", a_addr)).await.unwrap();

    wait_until("b to converge", || b.chain_len() == 3).await;
    assert_eq!(b.list_chain(), a.list_chain());
    assert!(is_valid_chain(&b.list_chain()));
}

#[tokio::test]
async fn test_longer_chain_wins_across_peers() {
    let (a, a_addr) = start_node().await;
    let (b, _) = start_node().await;
    for i in 0..3 {
        b.mine(format!("b{}", i)).unwrap();
    }
    a.mine("a0").unwrap();

    b.add_peer(&a_addr.to_string()).await.unwrap();

    wait_until("a to adopt b's chain", || a.list_chain() == b.list_chain()).await;
    assert_eq!(a.chain_len(), 4);
    assert_eq!(a.latest_block().data, "b2");
}

#[tokio::test]
async fn test_gossip_is_relayed() {
    let (a, a_addr) = start_node().await;
    let (b, b_addr) = start_node().await;
    let (c, _) = start_node().await;

    b.add_peer(&a_addr.to_string()).await.unwrap();
    c.add_peer(&b_addr.to_string()).await.unwrap();
    wait_until("sessions open", || {
        a.list_peers().len() == 1 && b.list_peers().len() == 2
    })
    .await;

    a.mine("relayed").unwrap();

    wait_until("c to hear through b", || c.chain_len() == 2).await;
    assert_eq!(c.latest_block().data, "relayed");
}

#[tokio::test]
async fn test_unreachable_peer_is_dropped() {
    let (a, _) = start_node().await;

    // Bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    assert!(a.add_peer(&dead.to_string()).await.is_err());
    assert!(a.list_peers().is_empty());
    assert_eq!(a.chain_len(), 1);
}

#[tokio::test]
async fn test_closed_peer_is_pruned() {
    let (a, a_addr) = start_node().await;
    let (b, _) = start_node().await;

    let session = b.add_peer(&a_addr.to_string()).await.unwrap();
    wait_until("a sees b", || a.list_peers().len() == 1).await;

    b.close_session(session);

    wait_until("a prunes b", || a.list_peers().is_empty()).await;
    a.mine("after close").unwrap();
    assert_eq!(a.chain_len(), 2);
    assert_eq!(b.chain_len(), 1);
}
