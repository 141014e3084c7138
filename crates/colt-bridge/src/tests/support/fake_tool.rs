//! A loopback HTTP server standing in for the remote tool.
//!
//! Each connection carries one request; the server records it and answers
//! with whatever the responder closure returns, then closes the connection.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};

/// A request received by [`FakeTool`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) body: String,
}

impl RecordedRequest {
    pub(crate) fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    /// The `method` member of a JSON RPC envelope.
    pub(crate) fn rpc_method(&self) -> Option<String> {
        self.json()
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}

/// Status and body written back for one request.
#[derive(Debug, Clone)]
pub(crate) struct CannedResponse {
    status: u16,
    body: String,
}

impl CannedResponse {
    pub(crate) fn result(value: Value) -> Self {
        Self::raw(200, json!({ "result": value }).to_string())
    }

    pub(crate) fn error(value: Value) -> Self {
        Self::raw(200, json!({ "error": value }).to_string())
    }

    pub(crate) fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

type Responder = dyn Fn(&RecordedRequest) -> CannedResponse + Send + Sync;

pub(crate) struct FakeTool {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeTool {
    pub(crate) fn spawn<F>(responder: F) -> Result<Self>
    where
        F: Fn(&RecordedRequest) -> CannedResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake tool")?;
        listener
            .set_nonblocking(true)
            .context("fake tool nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let responder: Arc<Responder> = Arc::new(responder);

        let thread_requests = Arc::clone(&requests);
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            Self::serve(&listener, &*responder, &thread_requests, &thread_stop);
        });

        Ok(Self {
            port,
            requests,
            stop,
            handle: Some(handle),
        })
    }

    /// Answers every request with `result`.
    pub(crate) fn answering(result: Value) -> Result<Self> {
        Self::spawn(move |_| CannedResponse::result(result.clone()))
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub(crate) fn rpc_methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(RecordedRequest::rpc_method)
            .collect()
    }

    fn serve(
        listener: &TcpListener,
        responder: &Responder,
        requests: &Mutex<Vec<RecordedRequest>>,
        stop: &AtomicBool,
    ) {
        while !stop.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _)) => {
                    if let Err(error) = Self::answer(stream, responder, requests) {
                        eprintln!("fake tool failed to answer: {error:#}");
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => return,
            }
        }
    }

    fn answer(
        stream: TcpStream,
        responder: &Responder,
        requests: &Mutex<Vec<RecordedRequest>>,
    ) -> Result<()> {
        stream.set_nonblocking(false).context("blocking stream")?;
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .context("read timeout")?;
        let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);

        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .context("read request line")?;
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_owned();
        let path = parts.next().unwrap_or_default().to_owned();

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).context("read header")?;
            let trimmed = header.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some((name, value)) = trimmed.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().context("content length")?;
            }
        }

        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).context("read body")?;
        let recorded = RecordedRequest {
            method,
            path,
            body: String::from_utf8(body).context("utf8 body")?,
        };
        let response = responder(&recorded);
        requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?
            .push(recorded);

        let mut writer = stream;
        write!(
            writer,
            "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            response.status,
            response.body.len(),
            response.body
        )
        .context("write response")?;
        writer.flush().context("flush response")
    }
}

impl Drop for FakeTool {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Returns a loopback port with nothing listening on it.
pub(crate) fn closed_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe listener");
    listener.local_addr().expect("local addr").port()
}
