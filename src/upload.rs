//! # Recepción de Uploads Multipart
//! src/upload.rs
//!
//! Parsea el cuerpo `multipart/form-data` que manda el formulario del
//! listado y escribe el archivo recibido en disco. El parser trabaja
//! línea a línea directamente sobre el `BufRead` del socket: el cuerpo
//! nunca se carga completo en memoria.
//!
//! Solo se procesa la primera parte del multipart (el campo `file` del
//! formulario); el presupuesto de bytes viene de `Content-Length` y el
//! parser jamás lee más allá de él.

use regex::bytes::Regex;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::OnceLock;

/// Errores al recibir un upload
///
/// Cada variante termina como mensaje "Failed: ..." en la página de
/// resultado; la conexión HTTP responde 200 igual.
#[derive(Debug)]
pub enum UploadError {
    /// El Content-Type no trae parámetro boundary
    NoBoundary,

    /// El cuerpo no comienza con la línea de boundary
    BadStart,

    /// La cabecera Content-Disposition no trae filename
    NoFilename,

    /// No se pudo crear el archivo destino
    CreateFailed(io::Error),

    /// Error de I/O leyendo el socket o escribiendo el archivo
    Io(io::Error),

    /// El cuerpo se agotó sin llegar al boundary de cierre
    UnexpectedEof,
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::NoBoundary => {
                write!(f, "Content-Type header doesn't contain boundary")
            }
            UploadError::BadStart => write!(f, "Content doesn't begin with boundary"),
            UploadError::NoFilename => write!(f, "Can't find out file name"),
            UploadError::CreateFailed(e) => write!(f, "Can't create file to write ({})", e),
            UploadError::Io(e) => write!(f, "I/O error while uploading ({})", e),
            UploadError::UnexpectedEof => write!(f, "Unexpected end of data"),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<io::Error> for UploadError {
    fn from(e: io::Error) -> Self {
        UploadError::Io(e)
    }
}

/// Extrae el boundary del header Content-Type
///
/// # Ejemplo
/// ```
/// use file_server::upload::boundary_from_content_type;
/// let ct = "multipart/form-data; boundary=----WebKitFormBoundaryX";
/// assert_eq!(
///     boundary_from_content_type(ct).as_deref(),
///     Some("----WebKitFormBoundaryX")
/// );
/// ```
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let (_, rest) = content_type.split_once("boundary=")?;
    let boundary = rest.split(';').next().unwrap_or(rest).trim();
    let boundary = boundary.trim_matches('"');
    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_string())
    }
}

/// Regex compilada una sola vez para la cabecera Content-Disposition
fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // El grupo captura el filename que manda el navegador
        Regex::new(r#"Content-Disposition.*name="file"; filename="(.+)""#)
            .unwrap_or_else(|e| panic!("regex de Content-Disposition inválida: {}", e))
    })
}

/// Busca una subsecuencia de bytes dentro de una línea
fn line_contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Lee una línea (hasta `\n` inclusive) descontándola del presupuesto
///
/// Retorna `None` cuando el presupuesto o el stream se agotaron.
fn read_body_line<R: BufRead>(
    body: &mut R,
    remain: &mut i64,
) -> Result<Option<Vec<u8>>, UploadError> {
    if *remain <= 0 {
        return Ok(None);
    }
    let mut line = Vec::new();
    let n = body.read_until(b'\n', &mut line)?;
    if n == 0 {
        return Ok(None);
    }
    *remain -= n as i64;
    Ok(Some(line))
}

/// Recibe el archivo de un cuerpo multipart y lo escribe en `dest_dir`
///
/// El nombre se toma del `filename` que manda el navegador, reducido a su
/// basename (los navegadores viejos mandan el path completo). Si ya existe
/// un archivo con ese nombre se le agregan `_` al final hasta encontrar uno
/// libre; la creación usa `create_new`, así que dos uploads concurrentes del
/// mismo nombre terminan en archivos distintos en vez de pisarse.
///
/// El contenido se copia byte a byte: el `\r\n` que el protocolo agrega
/// antes del boundary de cierre se recorta, todo lo demás (incluidas líneas
/// que se parecen al boundary sin serlo) se preserva tal cual.
///
/// Retorna el path del archivo escrito. Ante un error a mitad de copia el
/// archivo parcial queda en disco; el mensaje de error se lo muestra al
/// usuario la página de resultado.
pub fn receive_file<R: BufRead>(
    body: &mut R,
    boundary: &str,
    content_length: usize,
    dest_dir: &str,
) -> Result<String, UploadError> {
    let boundary = boundary.as_bytes();
    let mut remain = content_length as i64;

    // Línea 1: boundary de apertura
    let line = read_body_line(body, &mut remain)?.ok_or(UploadError::UnexpectedEof)?;
    if !line_contains(&line, boundary) {
        return Err(UploadError::BadStart);
    }

    // Línea 2: Content-Disposition con el filename
    let line = read_body_line(body, &mut remain)?.ok_or(UploadError::UnexpectedEof)?;
    let filename = match filename_pattern().captures(&line) {
        Some(caps) => String::from_utf8_lossy(&caps[1]).into_owned(),
        None => return Err(UploadError::NoFilename),
    };
    // Basename: algunos navegadores mandan el path completo del cliente
    let filename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename.as_str())
        .to_string();
    if filename.is_empty() {
        return Err(UploadError::NoFilename);
    }

    // Línea 3: Content-Type de la parte. Línea 4: separador en blanco
    read_body_line(body, &mut remain)?.ok_or(UploadError::UnexpectedEof)?;
    read_body_line(body, &mut remain)?.ok_or(UploadError::UnexpectedEof)?;

    let mut out = open_unique(dest_dir, &filename).map_err(UploadError::CreateFailed)?;

    // Copia con una línea de retraso: la línea anterior solo se escribe
    // cuando se sabe que la actual no es el boundary de cierre. Así el
    // \r\n final del protocolo se puede recortar de la última línea real.
    let mut preline = read_body_line(body, &mut remain)?.ok_or(UploadError::UnexpectedEof)?;
    loop {
        let line = match read_body_line(body, &mut remain)? {
            Some(line) => line,
            None => return Err(UploadError::UnexpectedEof),
        };

        if line_contains(&line, boundary) {
            // Recortar el \r\n que antecede al boundary, si está
            if preline.last() == Some(&b'\n') {
                preline.pop();
                if preline.last() == Some(&b'\r') {
                    preline.pop();
                }
            }
            out.file.write_all(&preline)?;
            return Ok(out.path);
        }

        out.file.write_all(&preline)?;
        preline = line;
    }
}

struct OpenUpload {
    file: std::fs::File,
    path: String,
}

/// Crea el archivo destino sin pisar uno existente
///
/// `create_new` hace la verificación y la creación en una sola syscall;
/// ante colisión se agrega `_` al final del nombre y se reintenta.
fn open_unique(dest_dir: &str, filename: &str) -> io::Result<OpenUpload> {
    let mut name = filename.to_string();
    loop {
        let path = Path::new(dest_dir).join(&name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                return Ok(OpenUpload {
                    file,
                    path: path.to_string_lossy().into_owned(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                name.push('_');
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    const BOUNDARY: &str = "----limite1234";

    /// Arma un cuerpo multipart como lo mandaría un navegador
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
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn receive(body: &[u8], dest: &str) -> Result<String, UploadError> {
        let mut cursor = Cursor::new(body.to_vec());
        receive_file(&mut cursor, BOUNDARY, body.len(), dest)
    }

    // ==================== Boundary ====================

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=\"con comillas\"")
                .as_deref(),
            Some("con comillas")
        );
        assert_eq!(boundary_from_content_type("text/plain"), None);
        assert_eq!(boundary_from_content_type("multipart/form-data; boundary="), None);
    }

    // ==================== Recepción ====================

    #[test]
    fn test_receive_simple_text_file() {
        let dir = tempdir().unwrap();
        let body = multipart_body("hola.txt", b"hola mundo\n");

        let path = receive(&body, &dir.path().to_string_lossy()).unwrap();

        assert!(path.ends_with("hola.txt"));
        assert_eq!(fs::read(&path).unwrap(), b"hola mundo\n");
    }

    #[test]
    fn test_receive_preserves_binary_content() {
        let dir = tempdir().unwrap();
        // Contenido con \r\n internos, bytes nulos y líneas parecidas
        // al boundary (sin serlo): todo debe sobrevivir byte a byte
        let mut content = Vec::new();
        content.extend_from_slice(b"linea 1\r\n");
        content.extend_from_slice(b"--casi-el-limite1234 pero no\r\n");
        content.extend_from_slice(&[0u8, 1, 2, 255, 254, b'\n']);
        content.extend_from_slice(b"sin salto final");
        let body = multipart_body("datos.bin", &content);

        let path = receive(&body, &dir.path().to_string_lossy()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), content);
    }

    #[test]
    fn test_receive_empty_file() {
        let dir = tempdir().unwrap();
        let body = multipart_body("vacio.txt", b"");

        let path = receive(&body, &dir.path().to_string_lossy()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn test_receive_strips_client_path() {
        let dir = tempdir().unwrap();
        let body = multipart_body("C:\\Users\\alguien\\foto.png", b"png");

        let path = receive(&body, &dir.path().to_string_lossy()).unwrap();
        assert!(path.ends_with("foto.png"));
        assert!(!path.contains("Users"));
    }

    #[test]
    fn test_receive_collision_appends_suffix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"original").unwrap();

        let body = multipart_body("a.txt", b"nuevo");
        let path = receive(&body, &dir.path().to_string_lossy()).unwrap();

        assert!(path.ends_with("a.txt_"));
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"original");
        assert_eq!(fs::read(&path).unwrap(), b"nuevo");
    }

    #[test]
    fn test_receive_double_collision() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"uno").unwrap();
        fs::write(dir.path().join("a.txt_"), b"dos").unwrap();

        let body = multipart_body("a.txt", b"tres");
        let path = receive(&body, &dir.path().to_string_lossy()).unwrap();

        assert!(path.ends_with("a.txt__"));
        assert_eq!(fs::read(&path).unwrap(), b"tres");
    }

    // ==================== Errores ====================

    #[test]
    fn test_receive_bad_start() {
        let dir = tempdir().unwrap();
        let body = b"esto no es multipart\r\n".to_vec();

        let err = receive(&body, &dir.path().to_string_lossy()).unwrap_err();
        assert!(matches!(err, UploadError::BadStart));
    }

    #[test]
    fn test_receive_no_filename() {
        let dir = tempdir().unwrap();
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        // Campo de formulario que no es un archivo
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"otro\"\r\n");
        body.extend_from_slice(b"\r\nvalor\r\n");
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let err = receive(&body, &dir.path().to_string_lossy()).unwrap_err();
        assert!(matches!(err, UploadError::NoFilename));
    }

    #[test]
    fn test_receive_truncated_body() {
        let dir = tempdir().unwrap();
        // Cuerpo sin boundary de cierre
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"x.txt\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
        body.extend_from_slice(b"datos truncados\r\n");

        let err = receive(&body, &dir.path().to_string_lossy()).unwrap_err();
        assert!(matches!(err, UploadError::UnexpectedEof));
    }

    #[test]
    fn test_receive_respects_content_length_budget() {
        let dir = tempdir().unwrap();
        let body = multipart_body("x.txt", b"contenido");

        // El presupuesto declara menos bytes de los que hay: el parser
        // se detiene sin llegar al boundary de cierre
        let mut cursor = Cursor::new(body.clone());
        let err = receive_file(&mut cursor, BOUNDARY, body.len() / 2, &dir.path().to_string_lossy())
            .unwrap_err();
        assert!(matches!(err, UploadError::UnexpectedEof));
    }

    #[test]
    fn test_receive_create_failed_on_bad_dir() {
        let body = multipart_body("x.txt", b"datos");
        let err = receive(&body, "/directorio/inexistente").unwrap_err();
        assert!(matches!(err, UploadError::CreateFailed(_)));
    }
}
