//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Agrega contadores del servidor en tiempo real: requests totales,
//! respuestas por código de estado, bytes servidos y conexiones activas.
//! El servidor loguea un resumen por request; el snapshot lo usan los
//! tests y el log periódico.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

/// Datos internos de métricas
struct MetricsData {
    /// Contador total de requests atendidos
    total_requests: u64,

    /// Respuestas por código de estado
    status_codes: HashMap<u16, u64>,

    /// Bytes de body escritos al socket (páginas y archivos)
    bytes_sent: u64,

    /// Suma de latencias, para el promedio
    latency_sum: Duration,

    /// Conexiones abiertas en este momento
    active_connections: u64,
}

impl MetricsCollector {
    /// Crea un nuevo collector de métricas
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                total_requests: 0,
                status_codes: HashMap::new(),
                bytes_sent: 0,
                latency_sum: Duration::ZERO,
                active_connections: 0,
            })),
            start_time: Instant::now(),
        }
    }

    /// Registra un request atendido
    pub fn record_request(&self, status_code: u16, bytes_sent: u64, latency: Duration) {
        let mut data = self.inner.lock().unwrap();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;
        data.bytes_sent += bytes_sent;
        data.latency_sum += latency;
    }

    /// Marca una conexión aceptada
    pub fn connection_opened(&self) {
        let mut data = self.inner.lock().unwrap();
        data.active_connections += 1;
    }

    /// Marca una conexión cerrada
    pub fn connection_closed(&self) {
        let mut data = self.inner.lock().unwrap();
        if data.active_connections > 0 {
            data.active_connections -= 1;
        }
    }

    /// Conexiones abiertas en este momento
    pub fn active_connections(&self) -> u64 {
        let data = self.inner.lock().unwrap();
        data.active_connections
    }

    /// Obtiene un snapshot de las métricas
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let data = self.inner.lock().unwrap();

        let latency_avg_us = if data.total_requests > 0 {
            data.latency_sum.as_micros() as u64 / data.total_requests
        } else {
            0
        };

        MetricsSnapshot {
            total_requests: data.total_requests,
            status_codes: data.status_codes.clone(),
            bytes_sent: data.bytes_sent,
            active_connections: data.active_connections,
            uptime_secs: self.start_time.elapsed().as_secs(),
            latency_avg_us,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub status_codes: HashMap<u16, u64>,
    pub bytes_sent: u64,
    pub active_connections: u64,
    pub uptime_secs: u64,
    pub latency_avg_us: u64,
}

impl MetricsSnapshot {
    /// Respuestas registradas con un código dado
    pub fn count_for(&self, status_code: u16) -> u64 {
        self.status_codes.get(&status_code).copied().unwrap_or(0)
    }
}
