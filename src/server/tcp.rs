//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread por conexión. Cada conexión lleva un solo request
//! (HTTP/1.0, `Connection: close`).

use crate::http::request::{find_subsequence, HEADER_TERMINATOR};
use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::handlers;
use crate::jobs::manager::JobManager;
use crate::router::Router;
use crate::shutdown::ShutdownSignal;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Tamaño máximo de un request (headers + body)
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Tiempo máximo esperando bytes del cliente
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Resultado de leer un request del socket
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// El peer cerró sin mandar nada
    Empty,
    Request(Vec<u8>),
    TooLarge,
}

/// Servidor HTTP/1.0
pub struct Server {
    address: String,
    router: Arc<Router>,
    listener: Option<TcpListener>,
}

impl Server {
    pub fn new(address: impl Into<String>, router: Router) -> Self {
        Self {
            address: address.into(),
            router: Arc::new(router),
            listener: None,
        }
    }

    /// Hace bind sin empezar a aceptar; útil con puerto 0
    pub fn bind(&mut self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind(&self.address)?;
        let local = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(local)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Acepta conexiones para siempre
    pub fn run(&mut self) -> io::Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = match self.listener.as_ref() {
            Some(listener) => listener,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "listener not bound")),
        };

        tracing::info!(address = %listener.local_addr()?, "HTTP server listening");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    let spawned = thread::Builder::new()
                        .name("http-conn".to_string())
                        .spawn(move || {
                            if let Err(e) = handle_connection(stream, &router) {
                                tracing::warn!(error = %e, "connection error");
                            }
                        });
                    if let Err(e) = spawned {
                        tracing::error!(error = %e, "failed to spawn connection thread");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to accept connection"),
            }
        }

        Ok(())
    }
}

/// Arma el router con todas las rutas del pipeline
pub fn build_router(manager: Arc<JobManager>, signal: ShutdownSignal) -> Router {
    let mut router = Router::new();

    {
        let manager = Arc::clone(&manager);
        router.register(Method::POST, "/jobs", move |req| handlers::submit_handler(req, &manager));
    }
    {
        let manager = Arc::clone(&manager);
        router.register(Method::GET, "/status", move |req| handlers::status_handler(req, &manager));
    }
    {
        let metrics = manager.metrics().clone();
        router.register(Method::GET, "/metrics", move |req| handlers::metrics_handler(req, &metrics));
    }
    {
        let metrics = manager.metrics().clone();
        router.register(Method::GET, "/metrics/json", move |req| {
            handlers::metrics_json_handler(req, &metrics)
        });
    }
    router.register(Method::POST, "/admin/shutdown", move |req| {
        handlers::shutdown_handler(req, &signal)
    });

    router
}

/// Lee headers y, si hay `Content-Length`, el body completo
pub fn read_request<R: Read>(stream: &mut R) -> io::Result<ReadOutcome> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];
    let mut expected_total: Option<usize> = None;

    loop {
        if let Some(total) = expected_total {
            if buffer.len() >= total {
                break;
            }
        }

        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        if buffer.len() > MAX_REQUEST_BYTES {
            return Ok(ReadOutcome::TooLarge);
        }

        if expected_total.is_none() {
            if let Some(pos) = find_subsequence(&buffer, HEADER_TERMINATOR) {
                let head_len = pos + HEADER_TERMINATOR.len();
                let body_len = content_length(&buffer[..pos]);
                match head_len.checked_add(body_len) {
                    Some(total) if total <= MAX_REQUEST_BYTES => expected_total = Some(total),
                    _ => return Ok(ReadOutcome::TooLarge),
                }
            }
        }
    }

    if buffer.is_empty() {
        Ok(ReadOutcome::Empty)
    } else {
        Ok(ReadOutcome::Request(buffer))
    }
}

/// `Content-Length` crudo de la sección de headers (0 si falta o es inválido)
fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn handle_connection(mut stream: TcpStream, router: &Router) -> io::Result<()> {
    let start = Instant::now();
    let request_id = format!("{:016x}", rand::random::<u64>());
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let raw = match read_request(&mut stream)? {
        ReadOutcome::Empty => {
            tracing::debug!(request_id = %request_id, "connection closed without data");
            return Ok(());
        }
        ReadOutcome::TooLarge => None,
        ReadOutcome::Request(raw) => Some(raw),
    };

    let (mut response, target) = match raw.as_deref().map(Request::parse) {
        None => (
            Response::error(StatusCode::PayloadTooLarge, "Request too large"),
            "-".to_string(),
        ),
        Some(Ok(request)) => {
            let target = format!("{} {}", request.method(), request.path());
            (router.route(&request), target)
        }
        Some(Err(e)) => {
            tracing::debug!(request_id = %request_id, error = %e, "parse error");
            (
                Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e)),
                "-".to_string(),
            )
        }
    };

    response.add_header("X-Request-Id", &request_id);
    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    tracing::debug!(
        request_id = %request_id,
        request = %target,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request served"
    );

    Ok(())
}
