//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables
//! de entorno (los argumentos tienen prioridad).
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./noggin --host 127.0.0.1 --port 8080 --backlog 4 --read-timeout-ms 5000
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! NOGGIN_PORT=8080 NOGGIN_LOG=debug ./noggin
//! ```

use std::time::Duration;

use clap::Parser;
use tracing::info;

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "noggin")]
#[command(about = "Servidor HTTP/1.1 mínimo con routing por expresiones regulares")]
#[command(version)]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "NOGGIN_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor (0 = puerto efímero)
    #[arg(short, long, default_value = "8080", env = "NOGGIN_PORT")]
    pub port: u16,

    /// Conexiones pendientes que acepta `listen`
    #[arg(long, default_value = "1", env = "NOGGIN_BACKLOG")]
    pub backlog: u32,

    /// Timeout de lectura por conexión en milisegundos (0 = sin timeout)
    #[arg(long = "read-timeout-ms", default_value = "0", env = "NOGGIN_READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    /// Filtro de logs, con la sintaxis de `RUST_LOG` (ej: `noggin=debug`)
    #[arg(long = "log", default_value = "info", env = "NOGGIN_LOG")]
    pub log_filter: String,
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
    /// use noggin::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout de lectura, `None` si está desactivado
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }
        if self.backlog == 0 {
            return Err("Backlog must be >= 1".to_string());
        }
        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            backlog = self.backlog,
            read_timeout_ms = self.read_timeout_ms,
            log = %self.log_filter,
            "configuration"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backlog: 1,
            read_timeout_ms: 0,
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.backlog, 1);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_address() {
        let config = Config::default();
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_validate_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ephemeral_port() {
        let mut config = Config::default();
        config.port = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_backlog() {
        let mut config = Config::default();
        config.backlog = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Backlog"));
    }

    #[test]
    fn test_validate_empty_host() {
        let mut config = Config::default();
        config.host = "  ".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().contains("Host"));
    }

    // ==================== Read Timeout ====================

    #[test]
    fn test_read_timeout_disabled() {
        let config = Config::default();
        assert_eq!(config.read_timeout(), None);
    }

    #[test]
    fn test_read_timeout_enabled() {
        let mut config = Config::default();
        config.read_timeout_ms = 1500;
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(1500)));
    }

    // ==================== CLI Parsing ====================

    #[test]
    fn test_parse_cli_args() {
        let config = Config::try_parse_from([
            "noggin",
            "--host",
            "127.0.0.1",
            "-p",
            "9000",
            "--backlog",
            "8",
            "--read-timeout-ms",
            "250",
            "--log",
            "noggin=debug",
        ])
        .unwrap();

        assert_eq!(config.address(), "127.0.0.1:9000");
        assert_eq!(config.backlog, 8);
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.log_filter, "noggin=debug");
    }

    #[test]
    fn test_parse_rejects_bad_port() {
        let result = Config::try_parse_from(["noggin", "--port", "70000"]);
        assert!(result.is_err());
    }
}
