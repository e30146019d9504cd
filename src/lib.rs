//! # HTTP File Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 concurrente que sirve un árbol de directorios y además
//! permite subir y borrar archivos desde el navegador. Implementado desde
//! cero para demostrar conceptos de sistemas operativos: concurrencia,
//! sincronización y manejo de recursos compartidos.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing y manejo del protocolo HTTP/1.0
//! - `server`: Lógica del servidor TCP y manejo de conexiones
//! - `handler`: Máquina de estados por request (GET, HEAD, POST)
//! - `resolver`: Traducción de paths HTTP a paths locales (sandboxing)
//! - `cache`: Cache de metadatos de archivos (tamaño, mtime, sha1sum)
//! - `upload`: Parser de bodies multipart/form-data
//! - `mime`: Tabla de extensiones → Content-Type
//! - `pages`: Renderizado HTML (listado de directorios, página de resultado)
//! - `metrics`: Recolección de métricas y observabilidad
//!
//! ## Ejemplo de uso
//!
//! ```ignore
//! use file_server::server::Server;
//! use file_server::config::Config;
//!
//! let config = Config::default();
//! let server = Server::new(config);
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod http;
pub mod config;
pub mod server;
pub mod handler;
pub mod resolver;
pub mod cache;
pub mod upload;
pub mod mime;
pub mod pages;
pub mod metrics;
