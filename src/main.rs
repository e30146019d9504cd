//! # HTTP File Server - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor HTTP/1.0 con gestión de archivos.

use file_server::config::Config;
use file_server::server::Server;

fn main() {
    println!("=================================");
    println!("  HTTP/1.0 File Server");
    println!("  Principios de Sistemas Operativos");
    println!("=================================\n");

    // Crear configuración desde CLI / env
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(1);
    }

    config.print_summary();

    // Crear el servidor
    let server = Server::new(config);

    // Iniciar el servidor (esto bloqueará el thread)
    if let Err(e) = server.run() {
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
}
