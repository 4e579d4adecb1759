//! HTTP adapter tests against a local server
//!
//! The server speaks just enough HTTP/1.1 for one request per connection and
//! records everything it receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ut_core::{
    download_file, list_files, upload_file, CachedCredential, DownloadRequest, Endpoints, Error,
    Session, UploadRequest,
};
use ut_http::HttpTransport;

#[derive(Clone)]
struct Route {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    /// Content-Length to announce when it should differ from the body
    declared_length: Option<usize>,
}

impl Route {
    fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
            declared_length: None,
        }
    }

    fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: "application/octet-stream",
            body,
            declared_length: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

struct TestServer {
    base: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();

        let (table, log) = (routes.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(handle(socket, table.clone(), log.clone()));
            }
        });

        Self {
            base,
            routes,
            requests,
        }
    }

    fn route(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(path.to_string(), route);
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn request_to(&self, path: &str) -> Recorded {
        self.requests()
            .into_iter()
            .find(|r| r.path.split('?').next() == Some(path))
            .unwrap_or_else(|| panic!("no request to {path}"))
    }

    fn session(&self) -> Session {
        Session::new(
            HttpTransport::new().unwrap(),
            Endpoints::new(format!("{}/v6", self.base), format!("{}/f/", self.base)),
            CachedCredential::fixed("sk_live_test"),
        )
    }
}

async fn handle(
    mut socket: TcpStream,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    log: Arc<Mutex<Vec<Recorded>>>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };

    let key = request.path.split('?').next().unwrap_or_default().to_string();
    let route = routes.lock().unwrap().get(&key).cloned();
    log.lock().unwrap().push(request);

    let route = route.unwrap_or_else(|| Route::bytes(404, b"not found".to_vec()));
    let head = format!(
        "HTTP/1.1 {} Test\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        route.status,
        route.content_type,
        route.declared_length.unwrap_or(route.body.len()),
    );
    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(&route.body).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut start = lines.next()?.split(' ');
    let method = start.next()?.to_string();
    let path = start.next()?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let mut body = buf[head_end + 4..].to_vec();
    if let Some(len) = headers.get("content-length") {
        let len: usize = len.parse().ok()?;
        while body.len() < len {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    } else if headers.get("transfer-encoding").map(String::as_str) == Some("chunked") {
        while !body.ends_with(b"0\r\n\r\n") {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body = dechunk(&body);
    }

    Some(Recorded {
        method,
        path,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn dechunk(mut raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(line_end) = find(raw, b"\r\n") {
        let size_text = String::from_utf8_lossy(&raw[..line_end]);
        let size = usize::from_str_radix(size_text.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        out.extend_from_slice(&raw[start..start + size]);
        raw = &raw[start + size + 2..];
    }
    out
}

fn body_text(request: &Recorded) -> String {
    String::from_utf8_lossy(&request.body).to_lowercase()
}

#[tokio::test]
async fn test_api_call_sends_key_header_and_json() {
    let server = TestServer::start().await;
    server.route(
        "/v6/listFiles",
        Route::json(200, json!({"hasMore": false, "files": []})),
    );

    let listing = list_files(&server.session()).await.unwrap();
    assert!(listing.files.is_empty());

    let request = server.request_to("/v6/listFiles");
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.headers.get("x-uploadthing-api-key").map(String::as_str),
        Some("sk_live_test")
    );
    assert!(request.headers["content-type"].starts_with("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_unauthorized_status_reaches_core() {
    let server = TestServer::start().await;
    server.route("/v6/listFiles", Route::json(401, json!({"error": "bad key"})));

    let err = list_files(&server.session()).await.unwrap_err();
    assert!(matches!(err, Error::CredentialInvalid));
}

#[tokio::test]
async fn test_server_error_body_is_kept() {
    let server = TestServer::start().await;
    server.route("/v6/listFiles", Route::bytes(503, b"maintenance".to_vec()));

    match list_files(&server.session()).await.unwrap_err() {
        Error::RemoteApi { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_submits_multipart_form() {
    let server = TestServer::start().await;
    server.route(
        "/v6/uploadFiles",
        Route::json(
            200,
            json!({"data": [{
                "url": format!("{}/bucket", server.base),
                "fields": {"key": "abc-photo.png", "policy": "p0licy"},
                "key": "abc-photo.png",
                "fileName": "photo.png",
                "fileUrl": format!("{}/f/abc-photo.png", server.base)
            }]}),
        ),
    );
    server.route("/bucket", Route::bytes(204, Vec::new()));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.png");
    std::fs::write(&path, b"not really a png").unwrap();

    let receipt = upload_file(&server.session(), &UploadRequest::new(&path), None)
        .await
        .unwrap();
    assert_eq!(receipt.file_key, "abc-photo.png");
    assert_eq!(receipt.outcome.bytes_transferred, 16);

    let negotiation = server.request_to("/v6/uploadFiles");
    let body: serde_json::Value = serde_json::from_slice(&negotiation.body).unwrap();
    assert_eq!(body["files"][0]["name"], "photo.png");
    assert_eq!(body["files"][0]["type"], "image/png");
    assert_eq!(body["acl"], "public-read");

    let submission = server.request_to("/bucket");
    assert_eq!(submission.method, "POST");
    assert!(submission.headers["content-type"].starts_with("multipart/form-data; boundary="));
    assert!(!submission.headers.contains_key("x-uploadthing-api-key"));

    let text = body_text(&submission);
    assert!(text.contains("name=\"policy\"\r\n\r\np0licy"));
    assert!(text.contains("name=\"key\"\r\n\r\nabc-photo.png"));
    assert!(text.contains("name=\"file\"; filename=\"photo.png\""));
    assert!(text.contains("content-type: image/png"));
    assert!(text.contains("not really a png"));
}

#[tokio::test]
async fn test_public_download_writes_exact_bytes() {
    let server = TestServer::start().await;
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    server.route("/f/k1-report.bin", Route::bytes(200, content.clone()));

    let dir = TempDir::new().unwrap();
    let request = DownloadRequest {
        file_key: "k1-report.bin".into(),
        private: false,
        output: dir.path().to_string_lossy().into_owned(),
    };

    let receipt = download_file(&server.session(), &request, false, |_| false, None)
        .await
        .unwrap();
    assert_eq!(receipt.path, dir.path().join("report.bin"));
    assert_eq!(receipt.outcome.bytes_transferred, content.len() as u64);
    assert_eq!(std::fs::read(&receipt.path).unwrap(), content);

    let get = server.request_to("/f/k1-report.bin");
    assert_eq!(get.method, "GET");
    assert!(!get.headers.contains_key("x-uploadthing-api-key"));
}

#[tokio::test]
async fn test_private_download_follows_signed_url() {
    let server = TestServer::start().await;
    server.route(
        "/v6/requestFileAccess",
        Route::json(
            200,
            json!({"url": format!("{}/signed/k2-notes.txt?sig=abc", server.base)}),
        ),
    );
    server.route("/signed/k2-notes.txt", Route::bytes(200, b"secret notes".to_vec()));

    let dir = TempDir::new().unwrap();
    let request = DownloadRequest {
        file_key: "k2-notes.txt".into(),
        private: true,
        output: dir.path().to_string_lossy().into_owned(),
    };

    let receipt = download_file(&server.session(), &request, false, |_| false, None)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&receipt.path).unwrap(), b"secret notes");

    let access = server.request_to("/v6/requestFileAccess");
    let body: serde_json::Value = serde_json::from_slice(&access.body).unwrap();
    assert_eq!(body, json!({"fileKey": "k2-notes.txt"}));
    assert!(server.request_to("/signed/k2-notes.txt").path.ends_with("?sig=abc"));
}

#[tokio::test]
async fn test_truncated_download_leaves_no_file() {
    let server = TestServer::start().await;
    let mut route = Route::bytes(200, b"only ten b".to_vec());
    route.declared_length = Some(100);
    server.route("/f/k3-cut.txt", route);

    let dir = TempDir::new().unwrap();
    let request = DownloadRequest {
        file_key: "k3-cut.txt".into(),
        private: false,
        output: dir.path().to_string_lossy().into_owned(),
    };

    let err = download_file(&server.session(), &request, false, |_| false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)), "got {err:?}");
    assert!(!dir.path().join("cut.txt").exists());
}

#[tokio::test]
async fn test_missing_file_is_remote_error() {
    let server = TestServer::start().await;

    let dir = TempDir::new().unwrap();
    let request = DownloadRequest {
        file_key: "k4-gone.txt".into(),
        private: false,
        output: dir.path().to_string_lossy().into_owned(),
    };

    let err = download_file(&server.session(), &request, false, |_| false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RemoteApi { status: 404, .. }));
    assert!(!dir.path().join("gone.txt").exists());
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = Session::new(
        HttpTransport::new().unwrap(),
        Endpoints::new(format!("http://{addr}/v6"), format!("http://{addr}/f/")),
        CachedCredential::fixed("sk_live_test"),
    );

    let err = list_files(&session).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert_eq!(err.exit_code(), 3);
}
