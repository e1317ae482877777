//! End-to-end subscription tests against an in-process fake gateway.
//!
//! A real `LedgerManager` connects to a local WebSocket server that
//! plays the gateway's role: it accepts the subscribe request, pushes
//! event frames, and drops the socket to exercise the supervisor.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use gridmart_db::models::job::{Job, JobStatus};
use gridmart_ledger::config::{ContractAbi, LedgerConfig};
use gridmart_ledger::manager::LedgerManager;
use gridmart_ledger::reconnect::ReconnectConfig;
use gridmart_ledger::store::{JobStore, MemoryJobStore};

const ABI: &str = r#"[
    {"type":"event","name":"JobPosted","inputs":[
        {"name":"jobId","type":"uint256"},
        {"name":"client","type":"address"},
        {"name":"price","type":"uint256"},
        {"name":"jobHash","type":"string"}]},
    {"type":"event","name":"JobAccepted","inputs":[
        {"name":"jobId","type":"uint256"},
        {"name":"provider","type":"address"}]},
    {"type":"event","name":"JobCompleted","inputs":[
        {"name":"jobId","type":"uint256"},
        {"name":"resultHash","type":"string"}]},
    {"type":"event","name":"JobPaid","inputs":[{"name":"jobId","type":"uint256"}]}
]"#;

fn test_config(addr: std::net::SocketAddr) -> LedgerConfig {
    LedgerConfig {
        ws_url: format!("ws://{addr}"),
        contract_address: "0xCONTRACT".to_string(),
        abi: ContractAbi::parse(ABI).unwrap(),
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            multiplier: 1.0,
        },
    }
}

fn event_frame(event: &str, args: serde_json::Value) -> Message {
    Message::Text(
        serde_json::json!({"type": "event", "data": {"event": event, "args": args}}).to_string(),
    )
}

/// Accept one subscriber, verify its subscribe request, and ack it.
async fn accept_subscriber(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.expect("accept failed");
    let mut ws = tokio_tungstenite::accept_async(stream)
        .await
        .expect("WebSocket handshake failed");

    let frame = ws
        .next()
        .await
        .expect("expected a subscribe request")
        .expect("subscribe request errored");
    let request: serde_json::Value =
        serde_json::from_str(frame.to_text().expect("subscribe request must be text"))
            .expect("subscribe request must be JSON");
    assert_eq!(request["op"], "subscribe");
    assert_eq!(request["contract"], "0xCONTRACT");

    ws.send(Message::Text(
        serde_json::json!({"type": "subscribed", "data": {"subscription_id": "sub-1"}}).to_string(),
    ))
    .await
    .expect("failed to ack subscription");

    ws
}

/// Poll the store until the job satisfies `pred`, within a 5s budget.
async fn wait_for_job<F>(store: &MemoryJobStore, job_id: &str, what: &str, pred: F) -> Job
where
    F: Fn(&Job) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if let Some(job) = store.find_by_job_id(job_id).await.unwrap() {
            if pred(&job) {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Poll a synchronous condition within a 5s budget.
async fn wait_until<F>(what: &str, mut check: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn resubscribes_after_drop_and_resumes_without_losing_state() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store = Arc::new(MemoryJobStore::new());
    let manager = LedgerManager::start(test_config(addr), store.clone()).unwrap();

    // First connection: deliver the first half of the lifecycle, then
    // drop the socket without a close frame.
    let mut ws = accept_subscriber(&listener).await;
    ws.send(event_frame(
        "JobPosted",
        serde_json::json!({"jobId": "7", "client": "0xAA", "price": "1000", "jobHash": "Qm123"}),
    ))
    .await
    .unwrap();
    ws.send(event_frame(
        "JobAccepted",
        serde_json::json!({"jobId": "7", "provider": "0xBB"}),
    ))
    .await
    .unwrap();

    wait_for_job(&store, "7", "the first two events to apply", |job| {
        job.status == JobStatus::InProgress
    })
    .await;
    drop(ws);

    // The supervisor re-subscribes after its delay; the rest of the
    // lifecycle applies on top of the already-projected state.
    let mut ws = accept_subscriber(&listener).await;
    ws.send(event_frame(
        "JobCompleted",
        serde_json::json!({"jobId": "7", "resultHash": "Qm999"}),
    ))
    .await
    .unwrap();
    ws.send(event_frame("JobPaid", serde_json::json!({"jobId": "7"})))
        .await
        .unwrap();

    let job = wait_for_job(&store, "7", "the full lifecycle to apply", |job| {
        job.status == JobStatus::Paid
    })
    .await;

    assert_eq!(job.client.as_deref(), Some("0xAA"));
    assert_eq!(job.price.as_deref(), Some("1000"));
    assert_eq!(job.job_hash.as_deref(), Some("Qm123"));
    assert_eq!(job.accepted_by.as_deref(), Some("0xBB"));
    assert_eq!(job.result_hash.as_deref(), Some("Qm999"));
    assert_eq!(
        store.snapshot().len(),
        1,
        "reconnect must not duplicate records"
    );

    manager.shutdown().await;
}

#[tokio::test]
async fn bad_frames_do_not_take_down_the_subscription() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store = Arc::new(MemoryJobStore::new());
    let manager = LedgerManager::start(test_config(addr), store.clone()).unwrap();

    let mut ws = accept_subscriber(&listener).await;
    // Garbage, an unknown message type, an unknown contract event, and
    // a malformed known event — none of them may stop the pipeline.
    ws.send(Message::Text("garbage".to_string())).await.unwrap();
    ws.send(Message::Text(
        serde_json::json!({"type": "heartbeat", "data": {}}).to_string(),
    ))
    .await
    .unwrap();
    ws.send(event_frame(
        "ProviderRegistered",
        serde_json::json!({"provider": "0xBB"}),
    ))
    .await
    .unwrap();
    ws.send(event_frame("JobPosted", serde_json::json!({"jobId": "8"})))
        .await
        .unwrap();
    ws.send(event_frame(
        "JobPosted",
        serde_json::json!({"jobId": "9", "client": "0xAA", "price": "500", "jobHash": "QmA"}),
    ))
    .await
    .unwrap();

    wait_for_job(&store, "9", "the valid event to apply", |_| true).await;

    assert!(manager.is_connected());
    assert_eq!(store.snapshot().len(), 1);

    manager.shutdown().await;
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn shutdown_stops_the_connection_task() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let store = Arc::new(MemoryJobStore::new());
    let manager = LedgerManager::start(test_config(addr), store.clone()).unwrap();

    let mut ws = accept_subscriber(&listener).await;
    wait_until("the subscription to come up", || manager.is_connected()).await;

    manager.shutdown().await;
    assert!(!manager.is_connected());

    // Frames sent after shutdown must not be applied.
    let _ = ws
        .send(event_frame(
            "JobPosted",
            serde_json::json!({"jobId": "1", "client": "0xAA", "price": "1", "jobHash": "Qm1"}),
        ))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.snapshot().is_empty());
}
