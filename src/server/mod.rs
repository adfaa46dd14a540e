//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! 1. Escucha en un puerto
//! 2. Acepta conexiones (un thread por conexión)
//! 3. Lee el request completo (headers + body)
//! 4. Rutea al handler y escribe la respuesta

pub mod tcp;

pub use tcp::{build_router, Server};
