//! End-to-end tests over the TCP line protocol

use leaderboard::{DrainTask, LeaderboardServer, LeaderboardService, RankedSkipList};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

struct TestServer {
    addr: SocketAddr,
    service: LeaderboardService,
    cancel: CancellationToken,
}

impl TestServer {
    async fn start() -> Self {
        let service = LeaderboardService::with_skiplist(
            RankedSkipList::with_params(16, 0.5, Some(9)),
            Duration::from_secs(30),
            64,
        );
        let cancel = CancellationToken::new();
        let server = LeaderboardServer::bind("127.0.0.1:0", service.clone()).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run(cancel.clone()));
        TestServer {
            addr,
            service,
            cancel,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        TestClient {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send(&mut self, request: &str) -> Value {
        self.writer.write_all(request.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        let line = self.lines.next_line().await.unwrap().expect("connection closed");
        serde_json::from_str(&line).unwrap()
    }
}

#[tokio::test]
async fn test_ping() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(server.addr).await;
    assert_eq!(client.send("PING").await, json!("PONG"));
}

#[tokio::test]
async fn test_update_then_query() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(server.addr).await;

    assert_eq!(client.send("UPDATE 1 100").await, json!({"score": "100"}));
    assert_eq!(client.send("UPDATE 2 100").await, json!({"score": "100"}));
    assert_eq!(client.send("UPDATE 3 90").await, json!({"score": "90"}));
    assert_eq!(client.send("UPDATE 3 -0.5").await, json!({"score": "89.5"}));
    server.service.drain();

    assert_eq!(
        client.send("RANGE 1 3").await,
        json!([
            {"customer_id": 1, "score": "100", "rank": 1},
            {"customer_id": 2, "score": "100", "rank": 2},
            {"customer_id": 3, "score": "89.5", "rank": 3},
        ])
    );
    assert_eq!(
        client.send("NEIGHBORS 2 1 1").await,
        json!([
            {"customer_id": 1, "score": "100", "rank": 1},
            {"customer_id": 2, "score": "100", "rank": 2},
            {"customer_id": 3, "score": "89.5", "rank": 3},
        ])
    );
    assert_eq!(client.send("NEIGHBORS 99").await, json!([]));
    assert_eq!(
        client.send(&format!("NEIGHBORS 1 {} 0", usize::MAX)).await,
        json!([{"customer_id": 1, "score": "100", "rank": 1}])
    );
    assert_eq!(client.send(&format!("NEIGHBORS 3 0 {}", 1usize << 40)).await.as_array().unwrap().len(), 1);
    assert_eq!(client.send("RANGE 5 10").await, json!([]));
}

#[tokio::test]
async fn test_errors_keep_connection_open() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(server.addr).await;

    let reply = client.send("UPDATE 1 1001").await;
    assert!(reply["error"].as_str().unwrap().contains("outside"));

    let reply = client.send("JUMP 1").await;
    assert!(reply["error"].as_str().unwrap().contains("unknown command"));

    assert_eq!(client.send("PING").await, json!("PONG"));
    assert_eq!(server.service.batcher().pending_len(), 0);
}

#[tokio::test]
async fn test_clients_share_state() {
    let server = TestServer::start().await;
    let cancel = CancellationToken::new();
    let drain = DrainTask::new(server.service.batcher().clone(), Duration::from_millis(10))
        .spawn(cancel.clone());

    let mut a = TestClient::connect(server.addr).await;
    let mut b = TestClient::connect(server.addr).await;

    a.send("UPDATE 7 10").await;
    assert_eq!(b.send("UPDATE 7 5").await, json!({"score": "15"}));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(
        a.send("NEIGHBORS 7").await,
        json!([{"customer_id": 7, "score": "15", "rank": 1}])
    );

    cancel.cancel();
    drain.await.unwrap();
}
