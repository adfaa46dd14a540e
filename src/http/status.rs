//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Sólo los códigos que el endpoint del pipeline realmente responde.

/// Códigos de estado soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok = 200,

    /// 202 Accepted - Pedido aceptado, se procesa en background
    Accepted = 202,

    /// 400 Bad Request - Body malformado o etiqueta inválida
    BadRequest = 400,

    /// 404 Not Found
    NotFound = 404,

    /// 405 Method Not Allowed - La ruta existe con otro método
    MethodNotAllowed = 405,

    /// 413 Payload Too Large
    PayloadTooLarge = 413,

    /// 500 Internal Server Error
    InternalServerError = 500,

    /// 503 Service Unavailable - El pipeline se está apagando
    ServiceUnavailable = 503,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Texto de razón estándar
    ///
    /// ```
    /// use job_pipeline::http::StatusCode;
    /// assert_eq!(StatusCode::ServiceUnavailable.reason_phrase(), "Service Unavailable");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Accepted => "Accepted",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
