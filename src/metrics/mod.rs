//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Este módulo implementa la recolección de métricas del servidor:
//! - Contadores de requests y de respuestas por código de estado
//! - Bytes servidos
//! - Conexiones activas

pub mod collector;

pub use collector::MetricsCollector;
