//! Tests for the HTTP count/clear endpoints

use axum::body::Body;
use axum::http::{Request, StatusCode};
use mail_test_srv::api::{router, ApiServer};
use mail_test_srv::storage::{MailStore, ReceivedMessage};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

fn message(from: &str, to: &str) -> ReceivedMessage {
    ReceivedMessage {
        sender: from.to_string(),
        recipient: to.to_string(),
        body: "body\r\n".to_string(),
    }
}

fn seeded_store() -> Arc<MailStore> {
    let storage = Arc::new(MailStore::new());
    for (from, to) in [("a", "b"), ("a", "b"), ("a", "c"), ("c", "a"), ("c", "b")] {
        storage.append(message(from, to));
    }
    storage
}

async fn send(storage: &Arc<MailStore>, method: &str, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router(Arc::clone(storage)).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_count() {
    let storage = seeded_store();

    let cases = [
        ("/count", 5),
        ("/count?from=a", 3),
        ("/count?from=c", 2),
        ("/count?to=b", 3),
        ("/count?from=a&to=b", 2),
        ("/count?from=nobody", 0),
    ];

    for (uri, expected) in cases {
        let (status, body) = send(&storage, "GET", uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        let count: usize = body.trim().parse().unwrap();
        assert_eq!(count, expected, "{}", uri);
    }
}

#[tokio::test]
async fn test_clear() {
    let storage = Arc::new(MailStore::new());
    storage.append(message("a", "b"));

    let (status, _) = send(&storage, "POST", "/clear").await;
    assert_eq!(status, StatusCode::OK);
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_clear_rejects_other_methods() {
    let storage = Arc::new(MailStore::new());
    storage.append(message("a", "b"));

    for method in ["GET", "PUT", "DELETE"] {
        let (status, _) = send(&storage, method, "/clear").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", method);
    }
    assert_eq!(storage.len(), 1);
}

#[tokio::test]
async fn test_count_after_clear() {
    let storage = seeded_store();
    send(&storage, "POST", "/clear").await;
    storage.append(message("a", "b"));

    let (_, body) = send(&storage, "GET", "/count").await;
    assert_eq!(body.trim(), "1");
}

#[tokio::test]
async fn test_api_server_over_tcp() {
    let storage = seeded_store();
    let server = ApiServer::bind("127.0.0.1:0", Arc::clone(&storage))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /count?to=b HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.ends_with("3\n"), "{}", response);
}
