//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes
//! 3. Lee y parsea la cabecera de cada request HTTP
//! 4. Despacha al handler y escribe la respuesta (streaming para archivos)
//!
//! Modelo de concurrencia: un thread por conexión, I/O bloqueante, la
//! conexión se cierra al terminar cada request (HTTP/1.0).

pub mod tcp;

// Re-exportar para facilitar el uso
pub use tcp::Server;
