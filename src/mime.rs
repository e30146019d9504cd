//! # Tabla de MIME Types
//! src/mime.rs
//!
//! Mapea extensiones de archivo a Content-Type. La tabla cubre las
//! extensiones más comunes; todo lo demás se sirve como
//! `application/octet-stream` para que el navegador lo descargue.

/// Content-Type por defecto para extensiones desconocidas
pub const DEFAULT_TYPE: &str = "application/octet-stream";

/// Adivina el Content-Type de un archivo por su extensión
///
/// La comparación es case-insensitive (`.TXT` == `.txt`).
///
/// # Ejemplo
/// ```
/// use file_server::mime::guess_type;
/// assert_eq!(guess_type("index.html"), "text/html");
/// assert_eq!(guess_type("foo.BIN"), "application/octet-stream");
/// ```
pub fn guess_type(path: &str) -> &'static str {
    // Solo cuenta el nombre del archivo: un punto en un directorio del
    // path ("/v1.2/README") no es una extensión
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = match name.rsplit_once('.') {
        // Nombre sin punto, o punto inicial (".gitignore"): sin extensión
        Some(("", _)) | None => return DEFAULT_TYPE,
        Some((_, ext)) => ext.to_ascii_lowercase(),
    };

    match ext.as_str() {
        "html" | "htm" => "text/html",
        // Código fuente y texto plano
        "txt" | "c" | "h" | "sh" | "py" | "lua" | "rs" | "md" | "log" | "toml" => "text/plain",
        "json" => "application/json",
        "js" => "application/javascript",
        "css" => "text/css",
        "xml" => "text/xml",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "wav" => "audio/x-wav",
        _ => DEFAULT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(guess_type("index.html"), "text/html");
        assert_eq!(guess_type("page.htm"), "text/html");
        assert_eq!(guess_type("data.json"), "application/json");
        assert_eq!(guess_type("photo.jpeg"), "image/jpeg");
    }

    #[test]
    fn test_source_files_are_plain_text() {
        assert_eq!(guess_type("main.c"), "text/plain");
        assert_eq!(guess_type("script.py"), "text/plain");
        assert_eq!(guess_type("run.sh"), "text/plain");
        assert_eq!(guess_type("init.lua"), "text/plain");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(guess_type("README.TXT"), "text/plain");
        assert_eq!(guess_type("Photo.JPG"), "image/jpeg");
    }

    #[test]
    fn test_unknown_extension_defaults() {
        assert_eq!(guess_type("firmware.bin"), DEFAULT_TYPE);
        assert_eq!(guess_type("archivo.xyz"), DEFAULT_TYPE);
    }

    #[test]
    fn test_no_extension_defaults() {
        assert_eq!(guess_type("Makefile"), DEFAULT_TYPE);
        assert_eq!(guess_type(""), DEFAULT_TYPE);
    }

    #[test]
    fn test_path_with_directories() {
        assert_eq!(guess_type("/srv/files/docs/manual.pdf"), "application/pdf");
    }

    #[test]
    fn test_dot_in_directory_is_not_extension() {
        assert_eq!(guess_type("/srv/v1.2/README"), DEFAULT_TYPE);
        assert_eq!(guess_type("/srv/v1.2/leeme.txt"), "text/plain");
    }

    #[test]
    fn test_leading_dot_is_not_extension() {
        assert_eq!(guess_type(".gitignore"), DEFAULT_TYPE);
        assert_eq!(guess_type("/srv/.hidden"), DEFAULT_TYPE);
    }
}
