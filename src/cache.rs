//! # Cache de Metadatos de Archivos
//! src/cache.rs
//!
//! Mantiene, por archivo servido, su tamaño, mtime y hash SHA1. El mapa
//! vive en memoria y se persiste como JSON en `__FILE_INFO.json` para
//! sobrevivir reinicios.
//!
//! ## Modelo de consistencia
//!
//! - Una entrada es válida solo si su `mtime` guardado coincide con el
//!   mtime actual del archivo; si no, está obsoleta.
//! - `get()` nunca bloquea calculando hashes: ante una entrada obsoleta o
//!   ausente dispara el recálculo en un thread de fondo y retorna un
//!   placeholder vacío. Los callers toleran metadatos eventualmente
//!   consistentes (el listado muestra celdas en blanco hasta el próximo
//!   request).
//! - El recálculo es single-flight por path: un set de paths en vuelo bajo
//!   el mismo mutex evita lanzar dos threads para el mismo archivo. La
//!   lectura del archivo no se sincroniza; si dos recálculos del mismo path
//!   llegaran a solaparse gana el último en insertar.
//! - Hay una única instancia de cache por proceso; clonar comparte estado
//!   vía `Arc`, así que el archivo persistido tiene un solo camino de
//!   escritura, serializado por el mutex interno.
//!
//! Los errores de I/O de metadatos se loguean, se cuentan y se tragan:
//! nunca llegan al cliente HTTP.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

/// Tamaño de bloque para el hash en streaming (64 KiB)
const HASH_BLOCK_SIZE: usize = 64 * 1024;

/// Metadatos de un archivo
///
/// Todos los campos son strings: así se serializan en el JSON persistido
/// (`size` y `mtime` incluidos) y así se incrustan en el HTML del listado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Hash SHA1 del contenido, en hex
    pub sha1sum: String,

    /// Tamaño en bytes
    pub size: String,

    /// Momento de última modificación, "{segundos}.{nanos}" desde epoch
    pub mtime: String,
}

impl FileInfo {
    /// Entrada vacía que se retorna mientras el recálculo está en vuelo
    pub fn placeholder() -> Self {
        Self {
            sha1sum: String::new(),
            size: String::new(),
            mtime: String::new(),
        }
    }
}

/// Estado interno protegido por el mutex del cache
struct CacheState {
    /// Mapa path → metadatos
    info: HashMap<String, FileInfo>,

    /// Claves presentes en el último flush exitoso (checkpoint)
    flushed_keys: HashSet<String>,

    /// Paths con recálculo en vuelo (single-flight)
    in_flight: HashSet<String>,
}

/// Cache de metadatos thread-safe con imagen persistida en disco
pub struct FileInfoCache {
    /// Ruta del archivo JSON persistido
    info_path: String,

    /// Estado compartido
    state: Arc<Mutex<CacheState>>,

    /// Errores de I/O tragados (carga, hash, flush), observable para tests
    io_errors: Arc<AtomicU64>,
}

impl FileInfoCache {
    /// Crea el cache cargando la imagen persistida si existe
    ///
    /// Un archivo ausente arranca con el mapa vacío; un archivo corrupto
    /// también, dejando constancia en el log y el contador de errores.
    pub fn new(info_path: &str) -> Self {
        let mut io_errors = 0u64;
        let info = if Path::new(info_path).exists() {
            match Self::load_from_file(info_path) {
                Ok(info) => info,
                Err(e) => {
                    eprintln!("   ⚠️  Archivo de metadatos ilegible ({}): {}", info_path, e);
                    io_errors += 1;
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        let flushed_keys = info.keys().cloned().collect();

        Self {
            info_path: info_path.to_string(),
            state: Arc::new(Mutex::new(CacheState {
                info,
                flushed_keys,
                in_flight: HashSet::new(),
            })),
            io_errors: Arc::new(AtomicU64::new(io_errors)),
        }
    }

    /// Carga el mapa desde el archivo persistido
    fn load_from_file(path: &str) -> std::io::Result<HashMap<String, FileInfo>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Obtiene los metadatos de un archivo
    ///
    /// Si la entrada existe y su mtime coincide con el del filesystem, se
    /// retorna tal cual. Si está obsoleta o ausente y el archivo existe,
    /// se dispara el recálculo en fondo y se retorna un placeholder vacío:
    /// un request posterior verá la entrada ya calculada.
    pub fn get(&self, path: &str) -> FileInfo {
        let mut state = self.state.lock().unwrap();

        if let Some(entry) = state.info.get(path) {
            if mtime_string(path).as_deref() == Some(entry.mtime.as_str()) {
                return entry.clone();
            }
        }

        if Path::new(path).is_file() {
            self.spawn_recompute(path.to_string(), &mut state);
        }

        FileInfo::placeholder()
    }

    /// Lanza el recálculo en fondo si no hay ya uno en vuelo para el path
    fn spawn_recompute(&self, path: String, state: &mut CacheState) {
        if !state.in_flight.insert(path.clone()) {
            // Ya hay un thread calculando este path
            return;
        }

        let cache = self.clone();
        thread::spawn(move || {
            cache.recompute(&path);
            let mut state = cache.state.lock().unwrap();
            state.in_flight.remove(&path);
        });
    }

    /// Recalcula los metadatos de un archivo, de forma síncrona
    ///
    /// La lectura y el hash se hacen fuera del mutex; solo la inserción en
    /// el mapa y el flush van serializados. Ante un error de I/O el mapa
    /// queda intacto para ese path, pero la imagen se persiste igual.
    pub fn recompute(&self, path: &str) {
        match Self::generate_info(path) {
            Ok(info) => {
                let mut state = self.state.lock().unwrap();
                state.info.insert(path.to_string(), info);
                self.write_locked(&mut state);
            }
            Err(e) => {
                eprintln!("   ⚠️  Error al calcular metadatos de {}: {}", path, e);
                self.io_errors.fetch_add(1, Ordering::Relaxed);
                let mut state = self.state.lock().unwrap();
                self.write_locked(&mut state);
            }
        }
    }

    /// Calcula tamaño, mtime y hash SHA1 en streaming (bloques de 64 KiB)
    fn generate_info(path: &str) -> std::io::Result<FileInfo> {
        let metadata = fs::metadata(path)?;
        let size = metadata.len().to_string();
        let mtime = format_mtime(metadata.modified()?);

        let mut file = File::open(path)?;
        let mut hasher = Sha1::new();
        let mut buffer = vec![0u8; HASH_BLOCK_SIZE];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(FileInfo {
            sha1sum: format!("{:x}", hasher.finalize()),
            size,
            mtime,
        })
    }

    /// Elimina la entrada de un path y persiste
    ///
    /// Una entrada ausente no es un error.
    pub fn delete(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        state.info.remove(path);
        self.write_locked(&mut state);
    }

    /// Indica si el set de claves cambió desde el último flush exitoso
    ///
    /// El listado de directorios lo usa para evitar reescrituras
    /// redundantes del archivo persistido.
    pub fn needs_flush(&self) -> bool {
        let state = self.state.lock().unwrap();
        let keys: HashSet<&String> = state.info.keys().collect();
        let flushed: HashSet<&String> = state.flushed_keys.iter().collect();
        keys != flushed
    }

    /// Serializa el mapa completo al archivo persistido
    ///
    /// Best-effort: un fallo se loguea y se cuenta, nunca se propaga.
    pub fn flush(&self) {
        let mut state = self.state.lock().unwrap();
        self.write_locked(&mut state);
    }

    /// Escribe la imagen con el mutex ya tomado
    ///
    /// Escritura atómica: archivo temporal + rename. Solo un flush exitoso
    /// actualiza el checkpoint de claves.
    fn write_locked(&self, state: &mut CacheState) {
        match self.write_file(&state.info) {
            Ok(()) => {
                state.flushed_keys = state.info.keys().cloned().collect();
            }
            Err(e) => {
                eprintln!("   ⚠️  Error al persistir metadatos en {}: {}", self.info_path, e);
                self.io_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn write_file(&self, info: &HashMap<String, FileInfo>) -> std::io::Result<()> {
        // Crear archivo temporal primero (atomic write)
        let temp_path = format!("{}.tmp", self.info_path);
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, info)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        writer.flush()?;

        // Renombrar (atómico en sistemas Unix)
        fs::rename(&temp_path, &self.info_path)?;

        Ok(())
    }

    /// Indica si hay entrada (fresca u obsoleta) para un path
    pub fn contains(&self, path: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.info.contains_key(path)
    }

    /// Número de entradas en el mapa
    pub fn count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.info.len()
    }

    /// Errores de I/O de metadatos tragados hasta ahora
    pub fn io_error_count(&self) -> u64 {
        self.io_errors.load(Ordering::Relaxed)
    }
}

impl Clone for FileInfoCache {
    fn clone(&self) -> Self {
        Self {
            info_path: self.info_path.clone(),
            state: Arc::clone(&self.state),
            io_errors: Arc::clone(&self.io_errors),
        }
    }
}

/// Mtime actual de un path como string, `None` si no se puede leer
fn mtime_string(path: &str) -> Option<String> {
    let metadata = fs::metadata(path).ok()?;
    Some(format_mtime(metadata.modified().ok()?))
}

/// Formatea un mtime de forma determinista: "{segundos}.{nanos:09}"
fn format_mtime(mtime: SystemTime) -> String {
    match mtime.duration_since(UNIX_EPOCH) {
        Ok(d) => format!("{}.{:09}", d.as_secs(), d.subsec_nanos()),
        // mtime anterior a epoch: raro pero posible
        Err(_) => "0.000000000".to_string(),
    }
}
