#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_backend_mock::MockBackend;
use history_store::{KeyValueStore, MemoryStore, StoreError};
use scout_chat::{ChatOrchestrator, Phase};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub struct Harness {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub backend: Arc<MockBackend>,
    pub store: Arc<MemoryStore>,
}

pub fn harness(backend: MockBackend) -> Harness {
    harness_with_store(backend, MemoryStore::new())
}

pub fn harness_with_store(backend: MockBackend, store: MemoryStore) -> Harness {
    let backend = Arc::new(backend);
    let store = Arc::new(store);
    let orchestrator = Arc::new(ChatOrchestrator::new(
        Arc::clone(&backend) as _,
        Arc::clone(&store) as _,
    ));
    Harness {
        orchestrator,
        backend,
        store,
    }
}

/// Yields until `orchestrator` reaches `phase`.
pub async fn wait_for_phase(orchestrator: &ChatOrchestrator, phase: Phase) {
    for _ in 0..10_000 {
        if orchestrator.phase() == phase {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("orchestrator never reached {phase:?}");
}

/// Store whose reads succeed and whose writes always fail.
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    pub failed_writes: AtomicUsize,
}

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        self.failed_writes.fetch_add(1, Ordering::AcqRel);
        Err(StoreError::io(
            "writing value",
            key,
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        ))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        Err(StoreError::io(
            "removing value",
            key,
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        ))
    }
}

#[derive(Clone)]
pub enum ScriptedResponse {
    Respond {
        status: u16,
        content_type: &'static str,
        chunks: Vec<Vec<u8>>,
    },
    Reset,
}

impl ScriptedResponse {
    pub fn lines(status: u16, chunks: &[&str]) -> Self {
        Self::Respond {
            status,
            content_type: "text/event-stream",
            chunks: chunks.iter().map(|chunk| chunk.as_bytes().to_vec()).collect(),
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::Respond {
            status,
            content_type: "application/json",
            chunks: vec![body.as_bytes().to_vec()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub body: String,
}

/// Local HTTP server answering requests with scripted responses, in order.
pub struct ScriptedServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    pub async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let counter = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener.local_addr().expect("listener address");

        let handle = tokio::spawn({
            let requests = Arc::clone(&requests);
            async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let scripts = Arc::clone(&scripts);
                    let counter = Arc::clone(&counter);
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, counter, requests).await;
                    });
                }
            }
        });

        Self {
            base_url: format!("http://{addr}/api"),
            requests,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    counter: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Ok(request) = read_request(&mut socket).await else {
        return;
    };
    requests.lock().expect("requests lock").push(request);

    let index = counter.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| ScriptedResponse::json(500, r#"{"error":"unexpected request"}"#));

    let ScriptedResponse::Respond {
        status,
        content_type,
        chunks,
    } = response
    else {
        return;
    };

    let head = format!(
        "HTTP/1.1 {status} Scripted\r\nContent-Type: {content_type}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    for chunk in chunks {
        let framed = [
            format!("{:X}\r\n", chunk.len()).into_bytes(),
            chunk,
            b"\r\n".to_vec(),
        ]
        .concat();
        if socket.write_all(&framed).await.is_err() {
            return;
        }
        let _ = socket.flush().await;
    }
    let _ = socket.write_all(b"0\r\n\r\n").await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> io::Result<RecordedRequest> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    let header_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(position) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..header_end]).into_owned();
    let path = head
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    let content_length = head
        .to_ascii_lowercase()
        .lines()
        .find_map(|line| {
            line.strip_prefix("content-length:")
                .map(|value| value.trim().to_string())
        })
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < header_end + content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
    }

    Ok(RecordedRequest {
        path,
        body: String::from_utf8_lossy(&request[header_end..]).into_owned(),
    })
}
