//! # Logging
//! src/logging.rs
//!
//! Inicializa `tracing-subscriber` con un filtro tipo `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Instala el subscriber global. Falla si el filtro es inválido o si ya
/// había un subscriber instalado.
pub fn init_logging(filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
}
