//! # Módulo HTTP
//!
//! Este módulo implementa el protocolo HTTP/1.0 desde cero, sin usar
//! librerías de alto nivel. Incluye:
//!
//! - Parsing de la cabecera de requests HTTP/1.0
//! - Construcción de responses HTTP
//! - Manejo de status codes
//!
//! ## Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.0\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! (body)
//! ```
//!
//! A diferencia de un parser de buffer completo, aquí solo se parsea la
//! cabecera: el body de un POST (que puede ser un archivo grande) se queda
//! en el socket y lo consume el handler en streaming.
//!
//! ## Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 13\r\n
//! \r\n
//! <html>...</html>
//! ```

pub mod request;   // Parsing de la cabecera de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

// Re-exportamos los tipos principales para facilitar su uso
pub use request::{Method, Request};
pub use response::Response;
pub use status::StatusCode;
