//! `HttpTransport` against a one-shot HTTP server on loopback.

use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use arena_core::client::{MatchPlayer, RemoteMatchClient};
use arena_core::error::ArenaError;
use arena_core::fakes::sample_context;
use arena_core::model::MatchRequest;
use arena_core::transport::{ArenaTransport, Endpoint, HttpTransport, TransportError};

const COOKIE: &str = "rememberMe=abc";

/// Serve a single canned response. Returns the services base URL and a handle
/// resolving to the raw request that was received.
async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
            if request_complete(&raw) {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&raw).into_owned()
    });

    (format!("http://{addr}/services"), handle)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

fn transport(base_url: &str) -> HttpTransport {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpTransport::from_client(base_url, COOKIE, client)
}

fn request() -> MatchRequest {
    MatchRequest {
        code: "print(42)".to_string(),
        programming_language_id: "Python3".to_string(),
        agent1_id: -1,
        agent2_id: 777,
        game_options: None,
    }
}

async fn play(base_url: &str) -> Result<arena_core::model::MatchResult, ArenaError> {
    RemoteMatchClient::new(Arc::new(transport(base_url)))
        .play_match(&sample_context(), &request())
        .await
}

// -------------------------------------------------------------------------
// Status handling
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_rate_limit_body_on_error_status() {
    let (base_url, server) =
        serve_once("422 Unprocessable Entity", r#"{"id":407,"message":"m"}"#).await;

    let err = play(&base_url).await.unwrap_err();
    assert!(matches!(err, ArenaError::RateLimited(ref m) if m == "m"));

    let raw = server.await.unwrap().to_lowercase();
    assert!(raw.starts_with("post /services/testsession/play "));
    assert!(raw.contains("cookie: rememberme=abc"));
    assert!(raw.contains(r#""agentsids":[-1,777]"#));
}

#[tokio::test]
async fn test_non_json_error_body_is_remote_error() {
    let (base_url, server) = serve_once("500 Internal Server Error", "oops").await;

    let err = play(&base_url).await.unwrap_err();
    assert!(!err.is_rate_limited());
    assert!(matches!(err, ArenaError::RemoteService(ref m) if m.contains("500")));
    server.await.unwrap();
}

#[tokio::test]
async fn test_error_status_keeps_the_api_body() {
    let (base_url, server) =
        serve_once("400 Bad Request", r#"{"id":12,"message":"bad handle"}"#).await;

    let err = transport(&base_url)
        .call(Endpoint::StartTestSession, json!(["h"]))
        .await
        .unwrap_err();
    assert_eq!(err.api_error_id(), Some(12));
    assert_eq!(err.message(), "bad handle");
    assert!(matches!(err, TransportError::Status { status: 400, .. }));
    server.await.unwrap();
}

// -------------------------------------------------------------------------
// Success bodies
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_success_body_decodes_match_result() {
    let body = json!({
        "frames": [{"agentId": -1, "view": "v"}],
        "gameId": 555,
        "refereeInput": "seed=9",
        "scores": [12, 3],
        "ranks": [0, 1]
    })
    .to_string();
    let (base_url, server) = serve_once("200 OK", &body).await;

    let result = play(&base_url).await.unwrap();
    assert_eq!(result.game_id, 555);
    assert_eq!(result.referee_input, "seed=9");
    assert!(result.won(0));
    assert_eq!(result.score(1), Some(3.0));
    server.await.unwrap();
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let (base_url, server) = serve_once("200 OK", "").await;

    let value = transport(&base_url)
        .call(Endpoint::StartTestSession, json!(["h"]))
        .await
        .unwrap();
    assert!(value.is_null());
    server.await.unwrap();
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
    let (base_url, server) = serve_once("200 OK", "{not json").await;

    let err = transport(&base_url)
        .call(Endpoint::UserRanking, json!(["h", "global"]))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)));
    server.await.unwrap();
}
