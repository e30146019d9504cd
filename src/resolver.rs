//! # Resolución de Paths
//! src/resolver.rs
//!
//! Traduce el path de un request HTTP a un path local del filesystem,
//! siempre contenido bajo el directorio raíz configurado (sandboxing por
//! reconstrucción: el path se reconstruye segmento a segmento bajo el root,
//! así que `..` nunca puede escapar).

use percent_encoding::percent_decode_str;
use std::path::PathBuf;

/// Decodifica un valor URL-encoded de query string o formulario
///
/// Convierte `+` en espacio y resuelve las secuencias `%XX`.
///
/// # Ejemplo
/// ```
/// use file_server::resolver::url_decode;
/// assert_eq!(url_decode("hello+world%21"), "hello world!");
/// ```
pub fn url_decode(s: &str) -> String {
    let with_spaces = s.replace('+', " ");
    percent_decode_str(&with_spaces).decode_utf8_lossy().into_owned()
}

/// Traduce un path de request a un path local bajo `root`
///
/// Pasos, en orden:
/// 1. descartar query string (`?`) y fragmento (`#`)
/// 2. decodificar `%XX`
/// 3. normalizar: `.` se descarta, `..` retrocede un segmento (y se descarta
///    en silencio si ya no hay a dónde retroceder)
/// 4. descartar prefijos de unidad (`C:`) y cabeceras con backslash que
///    pudiera mandar un cliente Windows
/// 5. reconstruir el path uniendo cada segmento restante bajo `root`
///
/// El slash final del request se preserva: el handler lo usa para decidir
/// la redirección de directorios y el guard del delete.
///
/// Nunca falla; con input malformado degrada al directorio raíz.
///
/// # Ejemplo
/// ```
/// use file_server::resolver::resolve;
/// assert_eq!(resolve("/a/b.txt", "/srv"), "/srv/a/b.txt");
/// assert_eq!(resolve("/../../etc/passwd", "/srv"), "/srv/etc/passwd");
/// ```
pub fn resolve(request_path: &str, root: &str) -> String {
    // 1. Descartar query y fragmento
    let path = request_path.split('?').next().unwrap_or("");
    let path = path.split('#').next().unwrap_or("");

    let trailing_slash = path.trim_end().ends_with('/');

    // 2. Decodificar %XX
    let decoded = percent_decode_str(path).decode_utf8_lossy();

    // 3. Normalizar con una pila de segmentos
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Retrocede dentro del path; nunca sale del root
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    // 4 y 5. Limpiar cada segmento y reconstruir bajo el root
    let mut resolved = PathBuf::from(root);
    for segment in segments {
        // Descartar prefijo de unidad ("C:archivo") y cabecera con backslash
        let segment = segment.rsplit(':').next().unwrap_or(segment);
        let segment = segment.rsplit('\\').next().unwrap_or(segment);
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        resolved.push(segment);
    }

    let mut result = resolved.to_string_lossy().into_owned();
    if trailing_slash && !result.ends_with('/') {
        result.push('/');
    }
    result
}
