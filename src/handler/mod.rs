//! # Despacho de Requests
//! src/handler/mod.rs
//!
//! Traduce cada request ya parseado a una respuesta: servir un archivo,
//! listar un directorio, recibir un upload o borrar un archivo. El handler
//! no toca el socket; recibe el `BufRead` del cuerpo y retorna un [`Reply`]
//! que el servidor escribe.
//!
//! ## Rutas
//!
//! - `GET`/`HEAD` sobre un directorio sin `/` final → 301 a la forma con `/`
//! - `GET`/`HEAD` sobre un directorio → `index.html`/`index.htm` si existe,
//!   si no el listado generado
//! - `GET`/`HEAD` sobre un archivo → el archivo, en streaming
//! - `POST /delete` → borra un archivo del último directorio listado
//! - `POST` a cualquier otro path → upload multipart hacia ese directorio
//!
//! Todo POST responde 200 con una página de resultado; el éxito o fallo
//! viaja en el contenido, como espera el formulario del navegador.

use crate::cache::{FileInfo, FileInfoCache};
use crate::http::{Method, Request, Response, StatusCode};
use crate::pages::{self, ListingRow};
use crate::resolver::{resolve, url_decode};
use crate::upload::{boundary_from_content_type, receive_file};
use crate::mime;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fs::{self, File};
use std::io::BufRead;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

/// Límite para el cuerpo urlencoded de un delete (4 KiB)
///
/// El formulario manda unas decenas de bytes; el límite evita reservar
/// memoria en base a un Content-Length hostil.
const MAX_FORM_BYTES: usize = 4 * 1024;

/// Caracteres que se escapan al armar los hrefs del listado
const HREF_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'%')
    .add(b'{')
    .add(b'}');

/// Estado compartido entre todas las conexiones
pub struct ServerContext {
    /// Directorio raíz servido
    root: String,

    /// Último directorio listado: destino de los `POST /delete`
    ///
    /// Es estado global a propósito, no por conexión: HTTP/1.0 cierra la
    /// conexión en cada request, así que el POST del formulario llega por
    /// una conexión distinta a la del GET que mostró el listado.
    work_dir: Mutex<String>,

    /// Cache de metadatos (tamaño, mtime, SHA1)
    cache: FileInfoCache,
}

impl ServerContext {
    /// Crea el contexto para servir `root`, persistiendo metadatos en
    /// `info_path`
    pub fn new(root: &str, info_path: &str) -> Self {
        let mut initial = root.trim_end_matches('/').to_string();
        initial.push('/');
        Self {
            root: root.to_string(),
            work_dir: Mutex::new(initial),
            cache: FileInfoCache::new(info_path),
        }
    }

    /// Directorio raíz servido
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Acceso al cache de metadatos
    pub fn cache(&self) -> &FileInfoCache {
        &self.cache
    }
}

/// Respuesta producida por el handler
///
/// Las páginas generadas y los errores caben en memoria; los archivos se
/// entregan como descriptor abierto para que el servidor los copie al
/// socket en streaming.
pub enum Reply {
    /// Respuesta completa en memoria
    Response(Response),

    /// Cabecera más archivo abierto (el body se copia con `io::copy`)
    FileBody {
        /// Cabecera con Content-Type, Content-Length y Last-Modified
        head: Response,
        /// Archivo ya abierto y verificado
        file: File,
    },
}

impl Reply {
    /// Código de estado de la respuesta, para el log de requests
    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Response(r) => r.status(),
            Reply::FileBody { head, .. } => head.status(),
        }
    }
}

/// Despacha un request a su handler según método y path
///
/// `body` es el stream del cuerpo, posicionado justo después de la línea
/// vacía que cierra los headers; solo los POST lo consumen.
pub fn dispatch<R: BufRead>(ctx: &ServerContext, request: &Request, body: &mut R) -> Reply {
    match request.method() {
        Method::GET | Method::HEAD => handle_get(ctx, request),
        Method::POST => Reply::Response(handle_post(ctx, request, body)),
    }
}

/// GET y HEAD: archivos, redirecciones de directorio y listados
fn handle_get(ctx: &ServerContext, request: &Request) -> Reply {
    let local = resolve(request.path(), &ctx.root);

    if Path::new(&local).is_dir() {
        // Directorio pedido sin slash final: redirigir a la forma canónica
        // para que los links relativos del listado resuelvan bien
        if !request.path().ends_with('/') {
            let location = format!("{}/", request.path());
            return Reply::Response(Response::redirect(&location));
        }

        // index.html/index.htm tienen prioridad sobre el listado
        for index in ["index.html", "index.htm"] {
            let candidate = Path::new(&local).join(index);
            if candidate.is_file() {
                return serve_file(&candidate.to_string_lossy());
            }
        }

        return list_directory(ctx, request, &local);
    }

    serve_file(&local)
}

/// Sirve un archivo regular con sus headers de metadatos
fn serve_file(local: &str) -> Reply {
    let file = match File::open(local) {
        Ok(f) => f,
        Err(_) => {
            return Reply::Response(Response::error(StatusCode::NotFound, "File not found"))
        }
    };

    let metadata = match file.metadata() {
        Ok(m) => m,
        Err(_) => {
            return Reply::Response(Response::error(StatusCode::NotFound, "File not found"))
        }
    };

    let mut head = Response::new(StatusCode::Ok)
        .with_header("Content-Type", mime::guess_type(local))
        .with_header("Content-Length", &metadata.len().to_string());
    if let Ok(mtime) = metadata.modified() {
        head.add_header("Last-Modified", &http_date(mtime));
    }

    Reply::FileBody { head, file }
}

/// Formatea un mtime como fecha HTTP (RFC 1123, siempre GMT)
fn http_date(mtime: SystemTime) -> String {
    DateTime::<Utc>::from(mtime)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Genera el listado HTML de un directorio
///
/// Actualiza el directorio de trabajo (destino de los deletes), consulta el
/// cache por cada archivo y persiste el cache si el set de claves cambió.
fn list_directory(ctx: &ServerContext, request: &Request, local: &str) -> Reply {
    let entries = match fs::read_dir(local) {
        Ok(e) => e,
        Err(_) => {
            return Reply::Response(Response::error(
                StatusCode::Forbidden,
                "No permission to list directory",
            ))
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort_by_key(|n| n.to_lowercase());

    // Este listado pasa a ser el destino de los próximos deletes
    {
        let mut work_dir = ctx.work_dir.lock().unwrap();
        *work_dir = local.to_string();
    }

    let mut rows = Vec::with_capacity(names.len());
    for name in &names {
        let full_path = Path::new(local).join(name);
        let full = full_path.to_string_lossy().into_owned();

        let mut display = name.clone();
        let mut link = utf8_percent_encode(name, HREF_ENCODE).to_string();
        if full_path.is_dir() {
            display.push('/');
            link.push('/');
        }
        // El marcador @ de symlink va solo en el nombre visible: el link
        // apunta al destino real
        let is_symlink = fs::symlink_metadata(&full_path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_symlink {
            display = format!("{}@", name);
        }

        let info = if full_path.is_file() {
            ctx.cache.get(&full)
        } else {
            FileInfo::placeholder()
        };

        rows.push(ListingRow {
            link,
            display,
            size: info.size,
            sha1sum: info.sha1sum,
        });
    }

    if ctx.cache.needs_flush() {
        ctx.cache.flush();
    }

    let page = pages::listing_page(&url_decode(request.path()), &rows);
    Reply::Response(Response::html(&page))
}

/// POST: `/delete` borra, cualquier otro path recibe un upload
fn handle_post<R: BufRead>(ctx: &ServerContext, request: &Request, body: &mut R) -> Response {
    if request.path() == "/delete" {
        handle_delete(ctx, request, body)
    } else {
        handle_upload(ctx, request, body)
    }
}

/// Borra el archivo indicado por el formulario del listado
///
/// El nombre llega urlencoded en el cuerpo (`filename=...`) y se borra
/// relativo al último directorio listado. El guard exige que ese directorio
/// exista y termine en `/`; si no, el delete falla sin tocar nada.
fn handle_delete<R: BufRead>(ctx: &ServerContext, request: &Request, body: &mut R) -> Response {
    let referer = request.header("Referer").unwrap_or("/").to_string();

    let length = match request.content_length() {
        Some(l) => l,
        None => return result_response(false, "No file specified", &referer),
    };
    if length > MAX_FORM_BYTES {
        return result_response(false, "Form body too large", &referer);
    }

    let mut buf = vec![0u8; length];
    if let Err(e) = std::io::Read::read_exact(body, &mut buf) {
        return result_response(false, &format!("Can't read request body ({})", e), &referer);
    }

    // Cuerpo application/x-www-form-urlencoded: filename=<nombre>
    let text = String::from_utf8_lossy(&buf);
    let mut filename = None;
    for pair in text.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == "filename" {
                filename = Some(url_decode(value));
            }
        }
    }

    let filename = match filename {
        Some(f) if !f.is_empty() => f,
        _ => return result_response(false, "No file specified", &referer),
    };

    let work_dir = ctx.work_dir.lock().unwrap().clone();
    if !(work_dir.ends_with('/') && Path::new(&work_dir).is_dir()) {
        let message = format!("Can't delete '{}' from here", filename);
        return result_response(false, &message, &referer);
    }

    let target = format!("{}{}", work_dir, filename);
    match fs::remove_file(&target) {
        Ok(()) => {
            ctx.cache.delete(&target);
            result_response(true, &format!("File '{}' delete success!", target), &referer)
        }
        Err(e) => result_response(false, &format!("{}", e), &referer),
    }
}

/// Recibe un upload multipart hacia el directorio del path del POST
fn handle_upload<R: BufRead>(ctx: &ServerContext, request: &Request, body: &mut R) -> Response {
    let referer = request.header("Referer").unwrap_or("/").to_string();

    let boundary = match request.header("Content-Type").and_then(boundary_from_content_type) {
        Some(b) => b,
        None => {
            return result_response(false, "Content-Type header doesn't contain boundary", &referer)
        }
    };

    let length = match request.content_length() {
        Some(l) => l,
        None => return result_response(false, "Length of the data is unknown", &referer),
    };

    let dest_dir = resolve(request.path(), &ctx.root);
    match receive_file(body, &boundary, length, &dest_dir) {
        Ok(path) => {
            result_response(true, &format!("File '{}' upload success!", path), &referer)
        }
        Err(e) => result_response(false, &e.to_string(), &referer),
    }
}

/// Página de resultado de un POST, siempre con estado 200
fn result_response(ok: bool, message: &str, referer: &str) -> Response {
    Response::html(&pages::result_page(ok, message, referer))
}
