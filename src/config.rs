//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor de archivos con soporte
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./file_server 8000 /srv/files --host 0.0.0.0
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8000 SERVE_ROOT=/srv/files ./file_server
//! ```

use clap::Parser;
use std::path::Path;

/// Configuración del servidor HTTP/1.0 de archivos
#[derive(Debug, Clone, Parser)]
#[command(name = "file_server")]
#[command(about = "Servidor HTTP/1.0 concurrente con gestión de archivos (upload/delete)")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(default_value = "8000", env = "HTTP_PORT")]
    pub port: u16,

    /// Directorio raíz que se sirve
    #[arg(default_value = ".", env = "SERVE_ROOT")]
    pub root: String,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Archivo de metadatos (relativo al directorio raíz)
    #[arg(long = "info-file", default_value = "__FILE_INFO.json", env = "INFO_FILE")]
    pub info_file: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use file_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8000");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ruta completa del archivo de metadatos.
    ///
    /// Si `info_file` es relativo se resuelve bajo el directorio raíz, de
    /// modo que el archivo viva junto a los datos que describe.
    pub fn info_path(&self) -> String {
        Path::new(&self.root)
            .join(&self.info_file)
            .to_string_lossy()
            .into_owned()
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port must be >= 1".to_string());
        }

        if self.info_file.trim().is_empty() {
            return Err("Info file name must not be empty".to_string());
        }

        if !Path::new(&self.root).is_dir() {
            return Err(format!("Root directory does not exist: {}", self.root));
        }

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("⚙️  Configuración:");
        println!("   Address:    {}", self.address());
        println!("   Root dir:   {}", self.root);
        println!("   Info file:  {}", self.info_path());
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8000,
            root: ".".to_string(),
            host: "0.0.0.0".to_string(),
            info_file: "__FILE_INFO.json".to_string(),
        }
    }
}
