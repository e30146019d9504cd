//! # Renderizado HTML
//! src/pages.rs
//!
//! Genera las páginas que ve el navegador: el listado de directorios (con
//! formularios de upload y delete) y la página de resultado de un POST.
//! Es formateo puro; aquí no hay I/O ni estado.

/// Hoja de estilos embebida en cada página
const HTML_CSS: &str = "
body {
    background:  white;
    color:       black;
    font-family: Helvetica, Arial, sans-serif;
}
h1 { margin: .5em 0 0 0; }
h2 { margin: .8em 0 .3em 0; }
h3 { margin: .5em 0 .3em 0; }
table {
    font-size: .8em;
    margin: .5em 0;
    border-collapse: collapse;
    border-bottom: 1px #DED solid;
    width: 100%;
}
thead th {
    font-size: 1em;
    background: #DED;
    padding: .1em .3em;
    border: .2em solid #FFF;
}
tbody tr.odd { background: #F5F5F5; }
tbody th { text-align: left; }
tbody td { height: 1.2em; text-align: right; }
";

/// Una fila del listado de directorio, ya formateada por el handler
#[derive(Debug, Clone)]
pub struct ListingRow {
    /// Href del link (URL-encoded, con `/` final si es directorio)
    pub link: String,
    /// Nombre a mostrar (con marcador `/` o `@`)
    pub display: String,
    /// Tamaño en bytes como string ("" si aún no se calculó)
    pub size: String,
    /// Hash SHA1 en hex ("" si aún no se calculó)
    pub sha1sum: String,
}

/// Escapa texto para incrustarlo en HTML
///
/// # Ejemplo
/// ```
/// use file_server::pages::escape_html;
/// assert_eq!(escape_html("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
/// ```
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renderiza el listado de un directorio
///
/// `display_path` es el path del request ya decodificado (se escapa aquí).
/// Las filas vienen ordenadas; las impares llevan fondo alternado.
pub fn listing_page(display_path: &str, rows: &[ListingRow]) -> String {
    let display_path = escape_html(display_path);

    let mut f = String::new();
    f.push_str("<!DOCTYPE html>");
    f.push_str(&format!(
        "<html>\n<title>Directory listing for {}</title>\n",
        display_path
    ));
    f.push_str(&format!(
        "<head>\n<meta charset=\"utf-8\">\n<style>\n{}\n</style>\n</head>\n",
        HTML_CSS
    ));
    f.push_str(&format!(
        "<body>\n<h2>Directory listing for {}</h2>\n",
        display_path
    ));

    // Formulario de subida: postea multipart al mismo URL del listado
    f.push_str(
        "<div>\n  <hr>\n  <form enctype=\"multipart/form-data\" method=\"post\">\n    \
         Upload File: <input name=\"file\" type=\"file\"/>\n    \
         <input type=\"submit\" value=\"Upload\"/>\n  </form>\n  <hr>\n</div>\n",
    );

    // Formulario de borrado: postea el nombre a /delete
    f.push_str(
        "<div>\n  <form action=\"/delete\" method=\"post\">\n    \
         Delete File: <input type=\"text\" name=\"filename\">\n    \
         <input type=\"submit\" value=\"Submit\">\n  </form>\n  <hr>\n</div>\n",
    );

    f.push_str("<div>\n<table>\n");
    f.push_str(
        "<thead>\n  <tr>\n    <th rowspan=\"2\">NAME</th>\n    <th colspan=\"2\">INFO</th>\n  </tr>\n  \
         <tr>\n    <th>SIZE</th>\n    <th>SHA1SUM</th>\n  </tr>\n</thead>\n",
    );

    f.push_str("<tbody>\n");
    for (i, row) in rows.iter().enumerate() {
        let tr = if i % 2 == 0 { "<tr class=\"odd\">" } else { "<tr>" };
        f.push_str(&format!(
            "  {}\n    <th><a href=\"{}\">{}</a></th>\n    <td>{}</td>\n    <td>{}</td>\n  </tr>\n",
            tr,
            row.link,
            escape_html(&row.display),
            escape_html(&row.size),
            escape_html(&row.sha1sum),
        ));
    }
    f.push_str("</tbody>\n</table>\n</div>\n</body>\n</html>\n");
    f
}

/// Renderiza la página de resultado de un POST (upload o delete)
///
/// Siempre se sirve con 200; el éxito o fallo va en el contenido, con un
/// link de regreso a la página desde la que se envió el formulario.
pub fn result_page(ok: bool, message: &str, referer: &str) -> String {
    let mut f = String::new();
    f.push_str("<!DOCTYPE html>");
    f.push_str("<html>\n<title>Result Page</title>\n");
    f.push_str(&format!(
        "<head>\n<meta charset=\"utf-8\">\n<style>\n{}\n</style></head>\n",
        HTML_CSS
    ));
    f.push_str("<body>\n<h2>Result:</h2>\n<hr>\n");
    if ok {
        f.push_str("<strong>Success: </strong>");
    } else {
        f.push_str("<strong>Failed: </strong>");
    }
    f.push_str(&escape_html(message));
    f.push_str(&format!(
        "<hr><br><a href=\"{}\">Go Back</a>",
        escape_html(referer)
    ));
    f.push_str("</body>\n</html>\n");
    f
}
