#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// What the test server answers with.
#[derive(Clone, Copy)]
pub enum Mode {
    /// Plain `200 OK` with body `OK`.
    Ok,
    /// `200 OK` with a small JSON body.
    Json,
    /// Echo the raw request head back as the response body.
    EchoHead,
    /// Fixed `404 Not Found`.
    NotFound,
}

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
    hits: Arc<AtomicUsize>,
}

impl ServerHandle {
    /// Number of requests the server has answered.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a lightweight HTTP server for tests.
pub fn spawn_http_server(mode: Mode) -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {err}"))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {err}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {err}"))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_inner = hits.clone();

    let handle = thread::spawn(move || loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match listener.accept() {
            Ok((stream, _)) => {
                hits_inner.fetch_add(1, Ordering::SeqCst);
                thread::spawn(move || handle_client(stream, mode));
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(_) => break,
        }
    });

    Ok((
        format!("http://{addr}"),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
            hits,
        },
    ))
}

/// A URL nothing is listening on (the port is bound, then released).
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}")
}

fn handle_client(mut stream: TcpStream, mode: Mode) {
    let mut buffer = [0u8; 4096];
    let read = match stream.read(&mut buffer) {
        Ok(n) => n,
        Err(_) => return,
    };

    let (status_line, content_type, body) = match mode {
        Mode::Ok => ("200 OK", "text/plain", "OK".to_string()),
        Mode::Json => (
            "200 OK",
            "application/json",
            "{\"ok\":true,\"count\":3}".to_string(),
        ),
        Mode::EchoHead => (
            "200 OK",
            "text/plain",
            String::from_utf8_lossy(&buffer[..read]).to_string(),
        ),
        Mode::NotFound => ("404 Not Found", "text/plain", "missing".to_string()),
    };

    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    if stream.flush().is_err() {
        return;
    }
    drop(stream.shutdown(Shutdown::Both));
}
