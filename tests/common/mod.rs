#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};

use craftdeck::{Endpoints, Fetcher, Paths};
use tempfile::TempDir;

/// Canned response for one path.
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    /// Omit Content-Length and close the connection to end the body.
    pub no_length: bool,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: value.to_string().into_bytes(),
            no_length: false,
        }
    }

    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            no_length: false,
        }
    }

    pub fn unsized_bytes(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            no_length: true,
        }
    }
}

/// Minimal HTTP/1.1 responder on 127.0.0.1. Routes match the request path
/// without its query string; unknown paths get 404. Requested paths (with
/// query) are recorded.
pub struct TestServer {
    pub base: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn start(routes: impl FnOnce(&str) -> Vec<(String, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: HashMap<String, Reply> = routes(&base).into_iter().collect();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let _ = handle(stream, &routes, &seen);
            }
        });

        Self { base, requests }
    }

    pub fn fetcher(&self) -> Fetcher {
        Fetcher::new(Endpoints::under(&self.base)).unwrap()
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn handle(
    stream: TcpStream,
    routes: &HashMap<String, Reply>,
    seen: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
    seen.lock().unwrap().push(target.clone());
    let path = target.split('?').next().unwrap_or("/");

    let mut stream = stream;
    match routes.get(path) {
        Some(reply) if reply.no_length => {
            write!(stream, "HTTP/1.0 {} OK\r\nConnection: close\r\n\r\n", reply.status)?;
            stream.write_all(&reply.body)?;
        }
        Some(reply) => {
            write!(
                stream,
                "HTTP/1.1 {} OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reply.status,
                reply.body.len()
            )?;
            stream.write_all(&reply.body)?;
        }
        None => {
            write!(
                stream,
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )?;
        }
    }
    stream.flush()
}

/// Scratch base and game directories with the standard layout created.
pub fn scratch_paths() -> (TempDir, Paths) {
    let tmp = tempfile::tempdir().unwrap();
    let paths = Paths::with_roots(tmp.path().join("work"), tmp.path().join("game"));
    paths.ensure_dirs().unwrap();
    (tmp, paths)
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
