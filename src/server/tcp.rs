//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Implementación del servidor TCP que maneja múltiples conexiones
//! simultáneas usando threads. Cada conexión se procesa en su propio thread.
//!
//! Solo la cabecera del request se lee a memoria; el body de los POST se
//! queda en el `BufReader` y lo consume el handler en streaming. En la otra
//! dirección, los archivos se copian del descriptor al socket con
//! `io::copy`, sin pasar por un buffer intermedio completo.

use crate::config::Config;
use crate::handler::{self, Reply, ServerContext};
use crate::http::{Method, Request, Response, StatusCode};
use crate::metrics::MetricsCollector;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Tamaño máximo aceptado para la cabecera de un request (16 KiB)
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Valor del header Server
const SERVER_NAME: &str = concat!("FileServerWFM/", env!("CARGO_PKG_VERSION"));

/// Servidor HTTP/1.0 concurrente de archivos
pub struct Server {
    config: Config,
    context: Arc<ServerContext>,
    metrics: MetricsCollector,
}

impl Server {
    /// Crea el servidor con su contexto compartido (root + cache)
    pub fn new(config: Config) -> Self {
        let context = Arc::new(ServerContext::new(&config.root, &config.info_path()));

        Self {
            config,
            context,
            metrics: MetricsCollector::new(),
        }
    }

    /// Métricas del servidor, para observación externa
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Hace bind en la dirección configurada y atiende para siempre
    pub fn run(&self) -> io::Result<()> {
        let address = self.config.address();
        println!("[*] Iniciando servidor en {}", address);

        let listener = TcpListener::bind(&address)?;
        println!("[+] Servidor escuchando en {}", address);
        println!("[*] Sirviendo {} (modo concurrente: un thread por conexión)\n", self.config.root);

        self.serve(listener)
    }

    /// Loop de accept sobre un listener ya creado
    ///
    /// Separado de `run` para que los tests puedan usar un listener en un
    /// puerto efímero.
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let context = Arc::clone(&self.context);
                    let metrics = self.metrics.clone();

                    let peer_addr = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_string());

                    println!(" ✅ Nueva conexión desde: {}", peer_addr);

                    metrics.connection_opened();

                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, context, metrics.clone()) {
                            eprintln!("   ❌ Error en la conexión: {}", e);
                        }
                        metrics.connection_closed();
                    });
                }
                Err(e) => {
                    eprintln!("   ❌ Error al aceptar conexión: {}", e);
                }
            }
        }

        Ok(())
    }
}

/// Atiende una conexión completa: un request, una respuesta, cerrar
pub(crate) fn handle_connection(
    mut stream: TcpStream,
    context: Arc<ServerContext>,
    metrics: MetricsCollector,
) -> io::Result<()> {
    let start = Instant::now();

    // Request ID único para correlacionar logs
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    start.elapsed().as_nanos().hash(&mut hasher);
    thread::current().id().hash(&mut hasher);
    let request_id = format!("{:016x}", hasher.finish());

    // El reader se queda con el body; el stream original escribe la respuesta
    let mut reader = BufReader::new(stream.try_clone()?);

    let head = match read_head(&mut reader) {
        Ok(Some(head)) => head,
        Ok(None) => {
            println!("   ✅ Conexión cerrada sin datos\n");
            return Ok(());
        }
        // Cabecera no-UTF8 o demasiado grande: responder 400 y cerrar
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            println!("   ❌ Cabecera ilegible: {}", e);
            let response = Response::error(StatusCode::BadRequest, "Malformed request");
            return write_simple(&mut stream, response, &request_id, &metrics, start);
        }
        Err(e) => return Err(e),
    };

    let (reply, method) = match Request::parse(&head) {
        Ok(request) => {
            println!(
                "   ✅ {} {} [req_id: {}]",
                request.method().as_str(),
                request.path(),
                &request_id[..8]
            );
            let reply = handler::dispatch(&context, &request, &mut reader);
            (reply, request.method())
        }
        Err(e) => {
            println!("   ❌ Parse error: {}", e);
            let response = Response::error(StatusCode::BadRequest, &format!("Invalid: {}", e));
            (Reply::Response(response), Method::GET)
        }
    };

    let status;
    let bytes_sent;
    match reply {
        Reply::Response(mut response) => {
            add_common_headers(&mut response, &request_id);
            status = response.status();

            if method == Method::HEAD {
                // HEAD: mismos headers que el GET, sin body
                stream.write_all(&response.head_bytes())?;
                bytes_sent = 0;
            } else {
                stream.write_all(&response.to_bytes())?;
                bytes_sent = response.body().len() as u64;
            }
        }
        Reply::FileBody { mut head, mut file } => {
            add_common_headers(&mut head, &request_id);
            status = head.status();

            stream.write_all(&head.head_bytes())?;
            if method == Method::HEAD {
                bytes_sent = 0;
            } else {
                // Streaming del archivo al socket
                bytes_sent = io::copy(&mut file, &mut stream)?;
            }
        }
    }
    stream.flush()?;

    let latency = start.elapsed();
    metrics.record_request(status.as_u16(), bytes_sent, latency);

    println!("   ✅ {} ({:.2}ms)\n", status, latency.as_secs_f64() * 1000.0);

    Ok(())
}

/// Headers comunes a toda respuesta
fn add_common_headers(response: &mut Response, request_id: &str) {
    response.add_header("Server", SERVER_NAME);
    response.add_header("Connection", "close");
    response.add_header("X-Request-Id", request_id);
}

/// Escribe una respuesta simple y registra sus métricas
fn write_simple(
    stream: &mut TcpStream,
    mut response: Response,
    request_id: &str,
    metrics: &MetricsCollector,
    start: Instant,
) -> io::Result<()> {
    add_common_headers(&mut response, request_id);
    stream.write_all(&response.to_bytes())?;
    stream.flush()?;
    metrics.record_request(
        response.status().as_u16(),
        response.body().len() as u64,
        start.elapsed(),
    );
    Ok(())
}

/// Lee la cabecera del request, línea a línea, hasta la línea vacía
///
/// Retorna `None` si el peer cerró sin mandar nada. El body queda sin
/// consumir en el reader.
fn read_head<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut head = String::new();

    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            // EOF antes de la línea vacía
            if head.is_empty() {
                return Ok(None);
            }
            break;
        }
        if line == "\r\n" || line == "\n" {
            break;
        }
        head.push_str(&line);
        if head.len() > MAX_HEAD_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }
    }

    Ok(Some(head))
}
