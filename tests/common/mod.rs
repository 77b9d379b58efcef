//! Common test utilities for the upscaler integration tests
//!
//! - [`MockServer`]: a minimal HTTP/1.1 server on a loopback port that
//!   records every request and answers through a handler closure
//! - [`ScriptedTransport`]: an in-memory job queue replaying a fixed status
//!   sequence
//! - image fixtures

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use image_upscaler::client::{LogEntry, QueueError, QueueHandle, QueueStatus};
use image_upscaler::{ChannelObserver, Credentials, ProgressEvent, QueueTransport};

pub const TEST_KEY: &str = "test-key";
pub const TEST_MODEL: &str = "fal-ai/clarity-upscaler";

/// A request as received by [`MockServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Request target including the query string
    pub path: String,
    /// Header names are lowercase
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }

    /// Base URL of the server that received this request.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.header("host").unwrap_or("127.0.0.1"))
    }
}

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    pub fn bytes(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    pub fn not_found() -> Self {
        Self::bytes(404, "text/plain", b"not found".to_vec())
    }

    fn to_bytes(&self) -> Vec<u8> {
        let reason = match self.status {
            200 => "OK",
            401 => "Unauthorized",
            404 => "Not Found",
            422 => "Unprocessable Entity",
            500 => "Internal Server Error",
            _ => "Status",
        };
        let mut out = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            reason,
            self.content_type,
            self.body.len()
        )
        .into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync>;

/// Loopback HTTP server answering every request through a handler.
pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Mock server has no address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let recorded = requests.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(serve_connection(stream, handler, recorded));
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    /// Server that answers every request with the same response.
    pub async fn fixed(response: MockResponse) -> Self {
        Self::start(move |_| response.clone()).await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: Handler,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Ok(Some(request)) = read_request(&mut stream).await else {
        return;
    };
    let response = handler(&request);
    recorded.lock().unwrap().push(request);
    let _ = stream.write_all(&response.to_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<RecordedRequest>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(head_end + content_length);

    Ok(Some(RecordedRequest {
        method,
        path,
        headers,
        body: buf[head_end..body_end].to_vec(),
    }))
}

/// In-memory queue replaying a scripted status sequence.
///
/// Once the script runs out every status poll reports completion.
pub struct ScriptedTransport {
    statuses: Mutex<VecDeque<QueueStatus>>,
    output: Value,
    enqueue_failure: Option<String>,
    calls: AtomicUsize,
    arguments: Mutex<Option<Value>>,
}

impl ScriptedTransport {
    pub fn new(statuses: Vec<QueueStatus>, output: Value) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            output,
            enqueue_failure: None,
            calls: AtomicUsize::new(0),
            arguments: Mutex::new(None),
        }
    }

    /// Enqueue fails with a transport error carrying `message`.
    pub fn failing_enqueue(mut self, message: &str) -> Self {
        self.enqueue_failure = Some(message.to_string());
        self
    }

    /// Number of calls made to any transport method.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Arguments of the last enqueue.
    pub fn arguments(&self) -> Option<Value> {
        self.arguments.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueTransport for ScriptedTransport {
    async fn enqueue(
        &self,
        _credentials: &Credentials,
        arguments: &Value,
    ) -> Result<QueueHandle, QueueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.arguments.lock().unwrap() = Some(arguments.clone());
        if let Some(message) = &self.enqueue_failure {
            return Err(QueueError::Transport(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                message.clone(),
            ))));
        }
        Ok(QueueHandle {
            request_id: "req-scripted".to_string(),
            status_url: "scripted://status".to_string(),
            response_url: "scripted://response".to_string(),
        })
    }

    async fn status(
        &self,
        _credentials: &Credentials,
        _handle: &QueueHandle,
    ) -> Result<QueueStatus, QueueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        Ok(next.unwrap_or(QueueStatus::Completed {
            logs: vec![],
            error: None,
        }))
    }

    async fn result(
        &self,
        _credentials: &Credentials,
        _handle: &QueueHandle,
    ) -> Result<Value, QueueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }

    fn model_id(&self) -> &str {
        TEST_MODEL
    }
}

/// Status carrying the given log lines.
pub fn in_progress(messages: &[&str]) -> QueueStatus {
    QueueStatus::InProgress {
        logs: messages.iter().map(|m| LogEntry::new(*m)).collect(),
    }
}

/// Model output pointing at `url`.
pub fn output_json(url: &str) -> Value {
    json!({
        "image": {"url": url, "content_type": "image/png"},
        "seed": 7
    })
}

/// Opaque test image with a diagonal gradient.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    }))
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    upscale_codec::encode_to_bytes(&gradient(width, height)).expect("Failed to encode fixture")
}

/// Observer recording into a channel.
pub fn recording_observer() -> (ChannelObserver, UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelObserver::new(tx), rx)
}

/// Every event currently buffered in `rx`.
pub fn drain(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
