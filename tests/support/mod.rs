//! Local chat-completions server for end-to-end comparison tests.

use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub type HarnessResult<T> = Result<T, String>;

/// System prompts containing this marker get a direct answer, no tool call.
pub const DIRECT_MARKER: &str = "[direct]";
pub const FINAL_ANSWER: &str = "张三今年28岁，是一名软件工程师。";
pub const DIRECT_ANSWER: &str = "我不需要查询也能回答。";

/// Scripted server that answers by conversation state.
///
/// - system prompt contains [`DIRECT_MARKER`]: plain text answer
/// - history already has a tool result: final answer text
/// - otherwise: one `get_character_info` call for the last user message
///
/// Each connection is served on its own thread so concurrent runs overlap.
pub struct MockModelServer {
    address: String,
    shutdown: Arc<AtomicBool>,
    bodies: Arc<Mutex<Vec<Value>>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl MockModelServer {
    pub fn start() -> HarnessResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .map_err(|e| format!("failed binding mock server: {e}"))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| format!("failed setting nonblocking listener: {e}"))?;
        let addr = listener
            .local_addr()
            .map_err(|e| format!("failed getting mock server addr: {e}"))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let shutdown_flag = Arc::clone(&shutdown);
        let captured = Arc::clone(&bodies);
        let thread = thread::spawn(move || {
            let mut workers = Vec::new();
            while !shutdown_flag.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let captured = Arc::clone(&captured);
                        workers.push(thread::spawn(move || {
                            let _ = handle_mock_request(&mut stream, &captured);
                        }));
                    }
                    Err(_) => thread::sleep(Duration::from_millis(10)),
                }
            }
            for worker in workers {
                let _ = worker.join();
            }
        });

        Ok(Self {
            address: format!("http://{addr}"),
            shutdown,
            bodies,
            thread: Some(thread),
        })
    }

    pub fn base_url_v1(&self) -> String {
        format!("{}/v1", self.address)
    }

    /// Parsed JSON bodies of every request handled so far.
    pub fn request_bodies(&self) -> Vec<Value> {
        self.bodies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl Drop for MockModelServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(host) = self.address.strip_prefix("http://") {
            let _ = TcpStream::connect(host).and_then(|s| s.shutdown(Shutdown::Both));
        }
        if let Some(join) = self.thread.take() {
            let _ = join.join();
        }
    }
}

fn handle_mock_request(stream: &mut TcpStream, bodies: &Mutex<Vec<Value>>) -> HarnessResult<()> {
    stream
        .set_nonblocking(false)
        .map_err(|e| format!("failed setting blocking stream: {e}"))?;
    let request = read_http_json_body(stream)?;
    let response = scripted_reply(&request);
    bodies
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .push(request);
    // Long enough for the two runs to overlap.
    thread::sleep(Duration::from_millis(50));
    write_http_json(stream, &response)
}

fn scripted_reply(request: &Value) -> Value {
    let messages = request["messages"].as_array().cloned().unwrap_or_default();
    let system = messages
        .first()
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default();
    if system.contains(DIRECT_MARKER) {
        return text_completion(DIRECT_ANSWER);
    }
    if messages.iter().any(|m| m["role"] == "tool") {
        return text_completion(FINAL_ANSWER);
    }
    let name = messages
        .iter()
        .rev()
        .find(|m| m["role"] == "user")
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default();
    tool_call_completion(name)
}

fn text_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-text",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 30, "completion_tokens": 12, "total_tokens": 42}
    })
}

fn tool_call_completion(name: &str) -> Value {
    json!({
        "id": "chatcmpl-tool",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_lookup_1",
                    "type": "function",
                    "function": {
                        "name": "get_character_info",
                        "arguments": json!({"name": name}).to_string()
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28}
    })
}

fn read_http_json_body(stream: &mut TcpStream) -> HarnessResult<Value> {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .map_err(|e| format!("failed setting read timeout: {e}"))?;
    let mut buffer = Vec::<u8>::new();
    let mut temp = [0u8; 2048];
    let mut header_end: Option<usize> = None;
    let mut content_length: usize = 0;

    loop {
        let n = stream
            .read(&mut temp)
            .map_err(|e| format!("failed reading request bytes: {e}"))?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&temp[..n]);
        if header_end.is_none() {
            if let Some(idx) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                header_end = Some(idx);
                let headers = String::from_utf8_lossy(&buffer[..idx]).to_string();
                content_length = parse_content_length(&headers).unwrap_or(0);
            }
        }
        if let Some(idx) = header_end {
            if buffer.len().saturating_sub(idx + 4) >= content_length {
                break;
            }
        }
    }

    let idx =
        header_end.ok_or_else(|| "malformed HTTP request (missing header end)".to_string())?;
    serde_json::from_slice(&buffer[idx + 4..])
        .map_err(|e| format!("failed parsing request json: {e}"))
}

fn parse_content_length(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.eq_ignore_ascii_case("content-length") {
            value.trim().parse::<usize>().ok()
        } else {
            None
        }
    })
}

fn write_http_json(stream: &mut TcpStream, body: &Value) -> HarnessResult<()> {
    let payload = serde_json::to_string(body)
        .map_err(|e| format!("failed serializing response json: {e}"))?;
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    stream
        .write_all(response.as_bytes())
        .map_err(|e| format!("failed writing response bytes: {e}"))
}
