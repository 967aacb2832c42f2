//! Minimal HTTP/1.1 server with scripted routes for integration tests.
//!
//! Each route answers with its replies in order and repeats the last one
//! once they run out. Unknown targets get a JSON 404. Every request is
//! recorded so tests can assert on headers and hit counts.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    Json { status: u16, body: String },
    Bytes {
        status: u16,
        content_type: &'static str,
        disposition: Option<String>,
        body: Vec<u8>,
    },
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Reply::Json {
            status,
            body: body.to_string(),
        }
    }

    pub fn image(body: &[u8]) -> Self {
        Reply::Bytes {
            status: 200,
            content_type: "image/webp",
            disposition: None,
            body: body.to_vec(),
        }
    }

    pub fn attachment(filename: &str, body: &[u8]) -> Self {
        Reply::Bytes {
            status: 200,
            content_type: "image/webp",
            disposition: Some(format!("attachment; filename=\"{filename}\"")),
            body: body.to_vec(),
        }
    }

    /// What an object store returns for an expired signed URL.
    pub fn expired() -> Self {
        Reply::Bytes {
            status: 403,
            content_type: "application/xml",
            disposition: None,
            body: b"<Error><Code>AccessDenied</Code><Message>Request has expired</Message></Error>"
                .to_vec(),
        }
    }
}

/// One recorded request.
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub target: String,
    pub authorization: Option<String>,
    pub range: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Default)]
struct State {
    routes: HashMap<(String, String), (Vec<Reply>, usize)>,
    hits: Vec<Hit>,
}

#[derive(Clone)]
pub struct AssetServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl AssetServer {
    /// Origin without trailing slash, e.g. `http://127.0.0.1:12345`.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, target: &str) -> String {
        format!("{}{}", self.base, target)
    }

    /// Script `method target`; `target` includes the query string.
    pub fn route(&self, method: &str, target: &str, replies: Vec<Reply>) {
        let mut st = self.state.lock().unwrap();
        st.routes
            .insert((method.to_string(), target.to_string()), (replies, 0));
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.lock().unwrap().hits.clone()
    }

    pub fn hits_for(&self, method: &str, target: &str) -> Vec<Hit> {
        self.hits()
            .into_iter()
            .filter(|h| h.method == method && h.target == target)
            .collect()
    }
}

/// Starts the server in a background thread. It runs until the process exits.
pub fn start() -> AssetServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(State::default()));
    let server_state = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&server_state);
            thread::spawn(move || handle(stream, &state));
        }
    });
    AssetServer {
        base: format!("http://127.0.0.1:{}", port),
        state,
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(hit) = read_request(&mut stream) else {
        return;
    };

    let reply = {
        let mut st = state.lock().unwrap();
        let key = (hit.method.clone(), hit.target.clone());
        let reply = st.routes.get_mut(&key).and_then(|(replies, next)| {
            let r = replies.get(*next).or_else(|| replies.last()).cloned();
            *next += 1;
            r
        });
        st.hits.push(hit);
        reply.unwrap_or_else(|| {
            Reply::json(
                404,
                serde_json::json!({"code": "NOT_FOUND", "message": "no such route", "status": 404}),
            )
        })
    };

    let (status, content_type, disposition, body) = match reply {
        Reply::Json { status, body } => (status, "application/json", None, body.into_bytes()),
        Reply::Bytes {
            status,
            content_type,
            disposition,
            body,
        } => (status, content_type, disposition, body),
    };
    let disposition = disposition
        .map(|d| format!("Content-Disposition: {d}\r\n"))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        reason(status),
        content_type,
        body.len(),
        disposition
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

/// Reads headers and a Content-Length body; answers `Expect: 100-continue`.
fn read_request(stream: &mut TcpStream) -> Option<Hit> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = find(&data, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if headers
        .get("expect")
        .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"))
    {
        let _ = stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n");
    }
    let mut body = data[header_end..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }

    Some(Hit {
        method,
        target,
        authorization: headers.remove("authorization"),
        range: headers.remove("range"),
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
