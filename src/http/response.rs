//! # Construcción de Respuestas HTTP
//!
//! Este módulo proporciona una API para construir respuestas HTTP/1.0
//! de forma programática y convertirlas a bytes para enviar al cliente.
//!
//! Para archivos grandes la respuesta se divide en dos partes: la cabecera
//! (`head_bytes`) se escribe primero y el body se copia en streaming desde
//! el archivo al socket, sin pasar por memoria.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use file_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "text/html")
//!     .with_body("<html></html>");
//!
//! let bytes = response.to_bytes();
//! // Ahora puedes enviar `bytes` por el socket
//! ```

use super::StatusCode;
use crate::pages;
use std::collections::HashMap;

/// Representa una respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP (200, 404, etc.)
    status: StatusCode,

    /// Headers HTTP (Content-Type, Content-Length, etc.)
    /// Usamos HashMap para evitar duplicados
    headers: HashMap<String, String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una nueva respuesta con el código de estado especificado
    ///
    /// Por defecto, la respuesta no tiene headers ni body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header a la respuesta
    ///
    /// Si el header ya existe, se sobrescribe.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Agrega un header a una respuesta existente (versión mutable)
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el cuerpo de la respuesta desde un string
    ///
    /// Automáticamente calcula y agrega el header `Content-Length`.
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self
    }

    /// Establece el cuerpo de la respuesta desde bytes
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self
    }

    /// Crea una respuesta HTML exitosa (200 OK)
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::Response;
    ///
    /// let response = Response::html("<html><body>hola</body></html>");
    /// ```
    pub fn html(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(body)
    }

    /// Crea una respuesta de error con una página HTML mínima
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::NotFound, "File not found");
    /// ```
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = format!(
            "<!DOCTYPE html>\n<html>\n<title>{status}</title>\n\
             <body>\n<h1>{status}</h1>\n<p>{}</p>\n</body>\n</html>\n",
            pages::escape_html(message),
        );
        Self::new(status)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(&body)
    }

    /// Crea una redirección 301 hacia `location`
    pub fn redirect(location: &str) -> Self {
        Self::new(StatusCode::MovedPermanently)
            .with_header("Location", location)
            .with_body("")
    }

    /// Cabecera de la respuesta lista para el socket
    ///
    /// Genera status line + headers + línea vacía, sin el body. El caller
    /// escribe después el body (por ejemplo con `std::io::copy` desde un
    /// archivo abierto).
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut result = Vec::new();

        // 1. Status line
        // Formato: HTTP/1.0 200 OK\r\n
        let status_line = format!("HTTP/1.0 {}\r\n", self.status);
        result.extend_from_slice(status_line.as_bytes());

        // 2. Headers
        // Formato: Header-Name: Value\r\n
        for (name, value) in &self.headers {
            let header_line = format!("{}: {}\r\n", name, value);
            result.extend_from_slice(header_line.as_bytes());
        }

        // 3. Línea vacía que separa headers del body
        result.extend_from_slice(b"\r\n");

        result
    }

    /// Convierte la respuesta completa (cabecera + body) a bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = self.head_bytes();
        result.extend_from_slice(&self.body);
        result
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response() {
        let response = Response::new(StatusCode::Ok);
        assert_eq!(response.status(), StatusCode::Ok);
        assert!(response.headers().is_empty());
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_with_header() {
        let response = Response::new(StatusCode::Ok)
            .with_header("Content-Type", "text/plain")
            .with_header("X-Custom", "value");

        assert_eq!(
            response.headers().get("Content-Type"),
            Some(&"text/plain".to_string())
        );
        assert_eq!(response.headers().get("X-Custom"), Some(&"value".to_string()));
    }

    #[test]
    fn test_with_body() {
        let response = Response::new(StatusCode::Ok).with_body("Hello World");

        assert_eq!(response.body(), b"Hello World");
        assert_eq!(
            response.headers().get("Content-Length"),
            Some(&"11".to_string())
        );
    }

    #[test]
    fn test_html_response() {
        let response = Response::html("<html></html>");

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(
            response.headers().get("Content-Type"),
            Some(&"text/html; charset=utf-8".to_string())
        );
    }

    #[test]
    fn test_error_response() {
        let response = Response::error(StatusCode::NotFound, "File not found");

        assert_eq!(response.status(), StatusCode::NotFound);
        let body_str = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body_str.contains("404 Not Found"));
        assert!(body_str.contains("File not found"));
    }

    #[test]
    fn test_error_response_escapes_message() {
        let response = Response::error(StatusCode::NotFound, "<script>");
        let body_str = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body_str.contains("&lt;script&gt;"));
        assert!(!body_str.contains("<script>"));
    }

    #[test]
    fn test_redirect() {
        let response = Response::redirect("/docs/");

        assert_eq!(response.status(), StatusCode::MovedPermanently);
        assert_eq!(
            response.headers().get("Location"),
            Some(&"/docs/".to_string())
        );
        assert_eq!(
            response.headers().get("Content-Length"),
            Some(&"0".to_string())
        );
    }

    #[test]
    fn test_to_bytes() {
        let response = Response::new(StatusCode::Ok)
            .with_header("Content-Type", "text/plain")
            .with_body("Test");

        let bytes = response.to_bytes();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 4\r\n"));
        assert!(text.ends_with("\r\n\r\nTest"));
    }

    #[test]
    fn test_head_bytes_has_no_body() {
        let response = Response::new(StatusCode::Ok).with_body("Test");
        let head = response.head_bytes();
        let text = String::from_utf8(head).unwrap();

        assert!(text.ends_with("\r\n\r\n"));
        assert!(!text.contains("Test"));
        // El Content-Length sigue presente: lo usa HEAD
        assert!(text.contains("Content-Length: 4\r\n"));
    }

    #[test]
    fn test_with_body_bytes() {
        let binary_data = vec![0x00, 0x01, 0x02, 0xFF];
        let response = Response::new(StatusCode::Ok).with_body_bytes(binary_data.clone());

        assert_eq!(response.body(), &binary_data[..]);
        assert_eq!(
            response.headers().get("Content-Length"),
            Some(&"4".to_string())
        );
    }
}
