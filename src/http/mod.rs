//! # Módulo HTTP
//! src/http/mod.rs
//!
//! HTTP/1.0 mínimo para la superficie del pipeline: parsing de requests con
//! body (POST /jobs), construcción de responses y códigos de estado.
//!
//! ```text
//! POST /jobs HTTP/1.0\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 35\r\n
//! \r\n
//! {"type": "standard", "version": "v1"}
//! ```

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
