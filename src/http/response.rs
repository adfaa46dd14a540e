//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Builder de respuestas HTTP/1.0 serializables a bytes.
//!
//! ```
//! use job_pipeline::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "text/plain")
//!     .with_body("worker_jobs_pending 0\n");
//!
//! assert!(response.to_bytes().starts_with(b"HTTP/1.0 200 OK\r\n"));
//! ```

use super::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;

/// Respuesta HTTP/1.0 completa
///
/// Los headers se ordenan por nombre para que la salida sea estable.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    /// Respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega (o sobrescribe) un header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body y su `Content-Length`
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self
    }

    /// Respuesta 200 con body JSON ya serializado
    pub fn json(body: &str) -> Self {
        Self::json_with_status(StatusCode::Ok, body)
    }

    pub fn json_with_status(status: StatusCode, body: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    /// Serializa `value` como JSON
    ///
    /// Si la serialización falla responde 500.
    pub fn json_value<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::json_with_status(status, &body),
            Err(err) => Self::error(StatusCode::InternalServerError, &err.to_string()),
        }
    }

    /// Respuesta de texto plano con `Content-Type` arbitrario
    pub fn text(body: &str, content_type: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", content_type)
            .with_body(body)
    }

    /// Error con formato `{"error": "mensaje"}`
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self::json_with_status(status, &body)
    }

    /// Status line, headers, línea vacía y body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = format!("HTTP/1.0 {}\r\n", self.status).into_bytes();

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);
        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Descarta el body conservando `Content-Length` (respuesta a HEAD)
    pub fn strip_body(&mut self) {
        self.body.clear();
    }
}
