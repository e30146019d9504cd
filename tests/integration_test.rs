//! # Tests de Integración
//! tests/integration_test.rs
//!
//! Levantan el servidor completo sobre un puerto efímero y hablan HTTP/1.0
//! crudo por el socket, como lo haría un navegador (un request por
//! conexión). Cada test usa su propio directorio temporal como raíz.

use file_server::config::Config;
use file_server::server::Server;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

const BOUNDARY: &str = "----fronteraDePrueba42";

/// Servidor corriendo en fondo sobre un directorio temporal
struct TestServer {
    addr: std::net::SocketAddr,
    root: tempfile::TempDir,
}

impl TestServer {
    fn start() -> Self {
        let root = tempfile::tempdir().expect("tempdir");

        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.root = root.path().to_string_lossy().into_owned();

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local_addr");

        let server = Server::new(config);
        thread::spawn(move || {
            let _ = server.serve(listener);
        });

        Self { addr, root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Manda bytes crudos y retorna la respuesta completa
    fn raw(&self, request: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.addr).expect("connect");
        stream.write_all(request).expect("write");
        stream
            .shutdown(std::net::Shutdown::Write)
            .expect("shutdown");

        let mut response = Vec::new();
        stream.read_to_end(&mut response).expect("read");
        response
    }

    fn get(&self, path: &str) -> String {
        let request = format!("GET {} HTTP/1.0\r\n\r\n", path);
        String::from_utf8_lossy(&self.raw(request.as_bytes())).into_owned()
    }

    fn post(&self, path: &str, content_type: &str, body: &[u8]) -> String {
        let mut request = format!(
            "POST {} HTTP/1.0\r\nContent-Type: {}\r\nContent-Length: {}\r\nReferer: /\r\n\r\n",
            path,
            content_type,
            body.len()
        )
        .into_bytes();
        request.extend_from_slice(body);
        String::from_utf8_lossy(&self.raw(&request)).into_owned()
    }

    /// Repite un GET hasta que la respuesta cumpla el predicado
    ///
    /// Los metadatos del listado se calculan en fondo: el primer GET puede
    /// mostrar celdas vacías.
    fn get_until(&self, path: &str, predicate: impl Fn(&str) -> bool) -> String {
        for _ in 0..100 {
            let response = self.get(path);
            if predicate(&response) {
                return response;
            }
            thread::sleep(Duration::from_millis(20));
        }
        panic!("la respuesta de {} nunca cumplió la condición", path);
    }
}

fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

// ==================== GET ====================

#[test]
fn test_get_file_roundtrip() {
    let server = TestServer::start();
    fs::write(server.path("saludo.txt"), b"hola integracion").unwrap();

    let response = server.get("/saludo.txt");

    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/plain\r\n"));
    assert!(response.contains("Content-Length: 16\r\n"));
    assert!(response.ends_with("hola integracion"));
}

#[test]
fn test_get_missing_file_is_404() {
    let server = TestServer::start();

    let response = server.get("/no-existe.bin");
    assert!(response.starts_with("HTTP/1.0 404 Not Found\r\n"));
}

#[test]
fn test_directory_without_slash_redirects() {
    let server = TestServer::start();
    fs::create_dir(server.path("docs")).unwrap();

    let response = server.get("/docs");

    assert!(response.starts_with("HTTP/1.0 301 Moved Permanently\r\n"));
    assert!(response.contains("Location: /docs/\r\n"));
}

#[test]
fn test_index_html_takes_over_listing() {
    let server = TestServer::start();
    fs::write(server.path("index.html"), b"<html>la portada</html>").unwrap();

    let response = server.get("/");

    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(response.contains("la portada"));
    assert!(!response.contains("Directory listing"));
}

#[test]
fn test_listing_shows_size_and_sha1() {
    let server = TestServer::start();
    fs::write(server.path("datos.txt"), b"0123456789").unwrap();

    // El primer listado dispara el cálculo; repetir hasta que aparezca
    let response = server.get_until("/", |r| {
        r.contains("87acec17cd9dcd20a716cc2cf67417b71c8a7016")
    });

    assert!(response.contains("Directory listing for /"));
    assert!(response.contains("datos.txt"));
    assert!(response.contains("<td>10</td>")); // tamaño en bytes
}

#[test]
fn test_listing_marks_directories() {
    let server = TestServer::start();
    fs::create_dir(server.path("carpeta")).unwrap();

    let response = server.get("/");

    assert!(response.contains("href=\"carpeta/\""));
    assert!(response.contains(">carpeta/<"));
}

#[test]
fn test_traversal_cannot_escape_root() {
    let server = TestServer::start();

    // Normalizado bajo el root el path no existe: 404, nunca el archivo real
    let response = server.get("/../../../../etc/passwd");
    assert!(response.starts_with("HTTP/1.0 404 Not Found\r\n"));
}

// ==================== Upload ====================

#[test]
fn test_upload_byte_identical() {
    let server = TestServer::start();

    // Contenido con bytes binarios, \r\n internos y una línea parecida
    // al boundary: debe llegar byte a byte
    let mut content = Vec::new();
    content.extend_from_slice(b"primera linea\r\n");
    content.extend_from_slice(b"--casi fronteraDePrueba pero no\r\n");
    content.extend_from_slice(&[0u8, 1, 2, 254, 255]);
    content.extend_from_slice(b"\nfinal sin salto");

    let body = multipart_body("binario.dat", &content);
    let response = server.post("/", &multipart_content_type(), &body);

    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(response.contains("Success:"));
    assert_eq!(fs::read(server.path("binario.dat")).unwrap(), content);
}

#[test]
fn test_upload_collision_gets_suffix() {
    let server = TestServer::start();
    fs::write(server.path("repetido.txt"), b"el original").unwrap();

    let body = multipart_body("repetido.txt", b"el nuevo");
    let response = server.post("/", &multipart_content_type(), &body);

    assert!(response.contains("Success:"));
    assert_eq!(fs::read(server.path("repetido.txt")).unwrap(), b"el original");
    assert_eq!(fs::read(server.path("repetido.txt_")).unwrap(), b"el nuevo");
}

#[test]
fn test_concurrent_uploads_same_name_keep_both() {
    let server = TestServer::start();
    let server = std::sync::Arc::new(server);

    let mut handles = Vec::new();
    for i in 0..2 {
        let server = std::sync::Arc::clone(&server);
        handles.push(thread::spawn(move || {
            let content = format!("contenido del upload {}", i);
            let body = multipart_body("mismo.txt", content.as_bytes());
            server.post("/", &multipart_content_type(), &body)
        }));
    }
    for handle in handles {
        let response = handle.join().unwrap();
        assert!(response.contains("Success:"));
    }

    // Ningún upload pisó al otro: quedaron los dos archivos
    assert!(server.path("mismo.txt").exists());
    assert!(server.path("mismo.txt_").exists());

    let a = fs::read_to_string(server.path("mismo.txt")).unwrap();
    let b = fs::read_to_string(server.path("mismo.txt_")).unwrap();
    assert_ne!(a, b);
    assert!(a.starts_with("contenido del upload"));
    assert!(b.starts_with("contenido del upload"));
}

#[test]
fn test_upload_without_boundary_fails_with_200() {
    let server = TestServer::start();

    let response = server.post("/", "text/plain", b"esto no es multipart");

    // El formulario siempre recibe 200; el fallo va en la página
    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(response.contains("Failed:"));
}

// ==================== Delete ====================

#[test]
fn test_delete_flow_removes_file_and_metadata() {
    let server = TestServer::start();
    fs::write(server.path("efimero.txt"), b"para borrar").unwrap();

    // El listado fija el directorio de trabajo y calcula los metadatos
    server.get_until("/", |r| r.contains("<td>11</td>"));

    let response = server.post(
        "/delete",
        "application/x-www-form-urlencoded",
        b"filename=efimero.txt",
    );

    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(response.contains("Success:"));
    assert!(!server.path("efimero.txt").exists());

    // La entrada también salió del archivo de metadatos persistido
    let info = fs::read_to_string(server.path("__FILE_INFO.json")).unwrap();
    assert!(!info.contains("efimero.txt"));
}

#[test]
fn test_delete_missing_file_reports_failure() {
    let server = TestServer::start();
    server.get("/");

    let response = server.post(
        "/delete",
        "application/x-www-form-urlencoded",
        b"filename=nunca-existio.txt",
    );

    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(response.contains("Failed:"));
}

#[test]
fn test_delete_twice_second_fails() {
    let server = TestServer::start();
    fs::write(server.path("una-vez.txt"), b"x").unwrap();
    server.get("/");

    let first = server.post(
        "/delete",
        "application/x-www-form-urlencoded",
        b"filename=una-vez.txt",
    );
    assert!(first.contains("Success:"));

    let second = server.post(
        "/delete",
        "application/x-www-form-urlencoded",
        b"filename=una-vez.txt",
    );
    assert!(second.contains("Failed:"));
}

// ==================== Protocolo ====================

#[test]
fn test_head_omits_body() {
    let server = TestServer::start();
    fs::write(server.path("cabeza.txt"), b"solo headers").unwrap();

    let response =
        String::from_utf8_lossy(&server.raw(b"HEAD /cabeza.txt HTTP/1.0\r\n\r\n")).into_owned();

    assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(response.contains("Content-Length: 12\r\n"));
    assert!(!response.contains("solo headers"));
}

#[test]
fn test_malformed_request_is_400() {
    let server = TestServer::start();

    let response =
        String::from_utf8_lossy(&server.raw(b"QUE ES ESTO\r\n\r\n")).into_owned();
    assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));
}

#[test]
fn test_each_connection_serves_one_request() {
    let server = TestServer::start();
    fs::write(server.path("uno.txt"), b"1").unwrap();

    // Dos requests, dos conexiones: el server cierra después de cada una
    let first = server.get("/uno.txt");
    let second = server.get("/uno.txt");

    assert!(first.contains("Connection: close\r\n"));
    assert!(second.starts_with("HTTP/1.0 200 OK\r\n"));
}
