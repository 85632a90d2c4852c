//! Log submission and retrieval integration tests
//!
//! Covers the encoding pipeline end to end: plain JSON, negotiated
//! gzip/deflate compression and the protobuf path, plus the query limits.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use flate2::read::{DeflateDecoder, GzDecoder};
use prost::Message;
use serde_json::json;

use logserver::api::{create_router, proto, AppState};
use logserver::config::Config;
use logserver::store::{MemoryLogStore, MemoryUserStore, ReservedAdmin};

async fn spawn_server(max_records: u64) -> String {
    let mut config = Config::default();
    config.logs.max_records = max_records;

    let admin = ReservedAdmin::synthesize(&config.admin).unwrap();
    let policy = config.password_policy().unwrap();

    let state = AppState::new(
        &config,
        Arc::new(MemoryUserStore::new(admin, policy)),
        Arc::new(MemoryLogStore::new(config.logs.max_records)),
    );

    let app = create_router(state, Duration::from_secs(15));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}", addr)
}

async fn admin_client(base: &str) -> reqwest::Client {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap();

    let status = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({ "login": "admin", "password": "admin" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status.as_u16(), 200);

    client
}

fn batch(count: u32) -> serde_json::Value {
    let records: Vec<_> = (1..=count)
        .map(|i| {
            json!({
                "logTime": format!("2023-04-05T06:{:02}:00Z", i),
                "level": 2,
                "message1": format!("event {}", i),
                "message2": "detail",
            })
        })
        .collect();
    json!(records)
}

async fn add_logs(client: &reqwest::Client, base: &str, records: serde_json::Value) -> u16 {
    client
        .post(format!("{}/api/private/add-log", base))
        .json(&records)
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}

#[tokio::test]
async fn test_insert_and_query_roundtrip() {
    let base = spawn_server(1000).await;
    let client = admin_client(&base).await;

    assert_eq!(add_logs(&client, &base, batch(3)).await, 201);

    let resp = client
        .get(format!("{}/api/private/records", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp.headers().get("content-encoding").is_none());

    let body: serde_json::Value = resp.json().await.unwrap();
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(body["limited"], false);

    // newest first
    assert_eq!(records[0]["message1"], "event 3");
    assert_eq!(records[2]["message1"], "event 1");
    assert!(records.iter().all(|r| r["id"].as_u64().unwrap() != 0));
    assert!(records.iter().all(|r| r.get("realTime").is_some()));
}

#[tokio::test]
async fn test_time_range_filter() {
    let base = spawn_server(1000).await;
    let client = admin_client(&base).await;

    assert_eq!(add_logs(&client, &base, batch(5)).await, 201);

    let body: serde_json::Value = client
        .get(format!("{}/api/private/records", base))
        .json(&json!({
            "timeFrom": "2023-04-05T06:02:00Z",
            "timeTo": "2023-04-05T06:04:00Z",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["message1"], "event 4");
    assert_eq!(records[2]["message1"], "event 2");
}

#[tokio::test]
async fn test_empty_result_is_plain_object() {
    let base = spawn_server(1000).await;
    let client = admin_client(&base).await;

    let resp = client
        .get(format!("{}/api/private/records", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"{}");
}

#[tokio::test]
async fn test_gzip_negotiation_matches_plain_response() {
    let base = spawn_server(1000).await;
    let client = admin_client(&base).await;

    assert_eq!(add_logs(&client, &base, batch(4)).await, 201);

    let plain: serde_json::Value = client
        .get(format!("{}/api/private/records", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let resp = client
        .get(format!("{}/api/private/records", base))
        .header("Accept-Encoding", "gzip")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers().get("content-encoding").unwrap(), "gzip");
    assert_eq!(resp.headers().get("content-type").unwrap(), "application/json");

    let compressed = resp.bytes().await.unwrap();
    let mut decoder = GzDecoder::new(compressed.as_ref());
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).unwrap();

    let unpacked: serde_json::Value = serde_json::from_slice(&decompressed).unwrap();
    assert_eq!(unpacked, plain);
}

#[tokio::test]
async fn test_deflate_negotiation() {
    let base = spawn_server(1000).await;
    let client = admin_client(&base).await;

    assert_eq!(add_logs(&client, &base, batch(2)).await, 201);

    let resp = client
        .get(format!("{}/api/private/records", base))
        .header("Accept-Encoding", "deflate")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers().get("content-encoding").unwrap(), "deflate");

    let compressed = resp.bytes().await.unwrap();
    let mut decoder = DeflateDecoder::new(compressed.as_ref());
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).unwrap();

    let body: serde_json::Value = serde_json::from_slice(&decompressed).unwrap();
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_protobuf_response() {
    let base = spawn_server(1000).await;
    let client = admin_client(&base).await;

    assert_eq!(add_logs(&client, &base, batch(3)).await, 201);

    let resp = client
        .get(format!("{}/api/private/records", base))
        .header("binary-format", "protobuf")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers().get("binary-format").unwrap(), "protobuf");

    // the protobuf payload ships gzip-compressed
    let compressed = resp.bytes().await.unwrap();
    let mut decoder = GzDecoder::new(compressed.as_ref());
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).unwrap();

    let message = proto::LogRecords::decode(decompressed.as_slice()).unwrap();
    assert_eq!(message.records.len(), 3);
    assert!(!message.limited);
    assert_eq!(message.records[0].message1, "event 3");
    assert_eq!(message.records[0].level, 2);
    assert!(message.records[0].log_time.is_some());
    assert!(message.records[0].real_time.is_some());
}

#[tokio::test]
async fn test_caller_limit_sets_flag() {
    let base = spawn_server(1000).await;
    let client = admin_client(&base).await;

    assert_eq!(add_logs(&client, &base, batch(5)).await, 201);

    let body: serde_json::Value = client
        .get(format!("{}/api/private/records", base))
        .json(&json!({ "limit": 3 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["records"].as_array().unwrap().len(), 3);
    assert_eq!(body["limited"], true);
    // truncation keeps the newest records
    assert_eq!(body["records"][0]["message1"], "event 5");
}

#[tokio::test]
async fn test_server_cap_overflow_is_an_error() {
    let base = spawn_server(2).await;
    let client = admin_client(&base).await;

    assert_eq!(add_logs(&client, &base, batch(3)).await, 201);

    let resp = client
        .get(format!("{}/api/private/records", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("max 2"));
}

#[tokio::test]
async fn test_invalid_batch_is_rejected_whole() {
    let base = spawn_server(1000).await;
    let client = admin_client(&base).await;

    let bad = json!([
        { "logTime": "2023-04-05T06:01:00Z", "level": 2, "message1": "ok" },
        { "logTime": "2023-04-05T06:02:00Z", "level": 0, "message1": "bad level" },
    ]);
    let resp = client
        .post(format!("{}/api/private/add-log", base))
        .json(&bad)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // nothing was stored
    let resp = client
        .get(format!("{}/api/private/records", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"{}");
}

#[tokio::test]
async fn test_records_requires_session() {
    let base = spawn_server(1000).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/private/records", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}
