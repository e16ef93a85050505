//! Integration tests for the HTTP object API transport, backed by a
//! wiremock server standing in for the real endpoint.

use std::path::PathBuf;

use wiremock::matchers::{body_json, header, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fanout_core::domain::newtypes::{RemoteRef, TransportName};
use fanout_core::ports::ITransport;
use fanout_http::HttpApiTransport;

fn transport(server: &MockServer) -> HttpApiTransport {
    HttpApiTransport::new(
        TransportName::new("api".to_string()).unwrap(),
        server.uri(),
        "secret-token".to_string(),
    )
    .unwrap()
}

fn temp_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_upload_returns_server_assigned_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "upload"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "f-83c1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let path = temp_file(&dir, "notes.txt", b"hello world");

    let transport = transport(&server);
    let reference = transport.upload(&path, "notes.txt", None).await.unwrap();
    assert_eq!(reference.as_str(), "f-83c1");
}

#[tokio::test]
async fn test_upload_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "upload"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let path = temp_file(&dir, "notes.txt", b"hello");

    let transport = transport(&server);
    let result = transport.upload(&path, "notes.txt", None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_upload_missing_local_file_is_reported() {
    let server = MockServer::start().await;
    let transport = transport(&server);

    let result = transport
        .upload(std::path::Path::new("/no/such/file"), "gone.txt", None)
        .await;
    assert!(result.is_err());
    // No request should have reached the server.
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mkdir_sends_name_and_parent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "mkdir"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(serde_json::json!({
            "name": "docs",
            "parent_id": "d-root"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "d-7"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(&server);
    let parent = RemoteRef::new("d-root".to_string()).unwrap();
    let reference = transport.mkdir("docs", Some(&parent)).await.unwrap();
    assert_eq!(reference.as_str(), "d-7");
}

#[tokio::test]
async fn test_mkdir_at_root_sends_null_parent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "mkdir"))
        .and(body_json(serde_json::json!({
            "name": "docs",
            "parent_id": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "d-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(&server);
    let reference = transport.mkdir("docs", None).await.unwrap();
    assert_eq!(reference.as_str(), "d-1");
}

#[tokio::test]
async fn test_delete_sends_type_and_soft_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "delete"))
        .and(body_json(serde_json::json!({
            "id": "f-83c1",
            "type": "file",
            "permanent": false
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(&server);
    let reference = RemoteRef::new("f-83c1".to_string()).unwrap();
    transport.delete(&reference, false).await.unwrap();
}

#[tokio::test]
async fn test_delete_folder_uses_folder_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "delete"))
        .and(body_json(serde_json::json!({
            "id": "d-7",
            "type": "folder",
            "permanent": false
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(&server);
    let reference = RemoteRef::new("d-7".to_string()).unwrap();
    transport.delete(&reference, true).await.unwrap();
}

#[tokio::test]
async fn test_delete_of_absent_object_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "delete"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transport = transport(&server);
    let reference = RemoteRef::new("f-gone".to_string()).unwrap();
    transport.delete(&reference, false).await.unwrap();
}

#[tokio::test]
async fn test_delete_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "delete"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let transport = transport(&server);
    let reference = RemoteRef::new("f-1".to_string()).unwrap();
    assert!(transport.delete(&reference, false).await.is_err());
}
