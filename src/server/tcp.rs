//! # Servidor TCP
//! src/server/tcp.rs
//!
//! Servidor bloqueante de un solo thread: acepta una conexión, la atiende
//! completa con [`handle_connection`] y recién entonces acepta la
//! siguiente. Un error en una conexión se registra y el loop continúa.
//!
//! El socket se crea con `socket2` para poder activar `SO_REUSEADDR` y
//! fijar el backlog de `listen` desde la configuración.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::connection::handle_connection;
use crate::config::Config;
use crate::http::TcpConnection;
use crate::router::Router;

/// Pausa inicial tras un `accept` fallido
const ACCEPT_BACKOFF_START: Duration = Duration::from_millis(10);

/// Pausa máxima entre `accept` fallidos consecutivos
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pausa antes de reintentar `accept` tras `consecutive_failures` fallos seguidos.
///
/// Se duplica con cada fallo hasta [`ACCEPT_BACKOFF_MAX`].
fn accept_backoff(consecutive_failures: u32) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_START
        .saturating_mul(1 << exponent)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Errores fatales del servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("server I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Servidor HTTP/1.1 secuencial
pub struct Server {
    config: Config,
    router: Router,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    pub fn new(config: Config, router: Router) -> Self {
        Self {
            config,
            router,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abre el socket de escucha sin empezar a aceptar conexiones.
    ///
    /// Retorna la dirección real (útil con puerto 0).
    pub fn bind(&mut self) -> Result<SocketAddr, ServerError> {
        self.config.validate().map_err(ServerError::Config)?;

        let address = self.config.address();
        let listener = open_listener(&address, self.config.backlog).map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
        let local = listener.local_addr()?;

        info!(address = %local, backlog = self.config.backlog, "listening");
        self.listener = Some(listener);
        Ok(local)
    }

    /// Dirección de escucha, si el servidor ya hizo bind
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Handle para detener el servidor desde otro thread. Requiere haber
    /// hecho [`Server::bind`] antes.
    pub fn shutdown_handle(&self) -> Option<ShutdownHandle> {
        self.local_addr().map(|addr| ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            addr,
        })
    }

    /// Acepta y atiende conexiones hasta que se pida el shutdown.
    ///
    /// Hace bind si todavía no se hizo. Al terminar libera el socket.
    pub fn run(&mut self) -> Result<(), ServerError> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };
        let read_timeout = self.config.read_timeout();
        let mut accept_failures: u32 = 0;

        for stream in listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("shutdown requested");
                break;
            }

            let stream = match stream {
                Ok(stream) => {
                    accept_failures = 0;
                    stream
                }
                Err(e) => {
                    accept_failures = accept_failures.saturating_add(1);
                    let pause = accept_backoff(accept_failures);
                    warn!(error = %e, failures = accept_failures, pause_ms = pause.as_millis() as u64, "accept failed");
                    thread::sleep(pause);
                    continue;
                }
            };

            let mut conn = TcpConnection::new(stream);
            let peer = conn
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            debug!(peer = %peer, "connection accepted");

            if let Err(e) = conn.set_read_timeout(read_timeout) {
                warn!(peer = %peer, error = %e, "cannot set read timeout");
            }

            if let Err(e) = handle_connection(&mut conn, &self.router) {
                warn!(peer = %peer, error = %e, "connection failed");
            }
        }

        info!("server stopped");
        Ok(())
    }
}

/// Detiene un [`Server`] que está bloqueado en `accept`
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Marca el shutdown y despierta al servidor con una conexión vacía.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);

        let mut target = self.addr;
        if target.ip().is_unspecified() {
            target.set_ip(match target.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            });
        }
        if let Err(e) = TcpStream::connect(target) {
            debug!(error = %e, "wake-up connection failed");
        }
    }
}

fn open_listener(address: &str, backlog: u32) -> io::Result<TcpListener> {
    let addr = address
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing"))?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;
    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;
    use crate::router::{Captures, HandlerOutcome};
    use std::io::{Read, Write};

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Config::default()
        }
    }

    fn test_router() -> Router {
        let mut router = Router::new();
        router
            .route("/hello", |_req: &mut Request<'_>, _c: &Captures| Ok("hello".into()))
            .unwrap();
        router
            .route("/user/([0-9]+)", |_req: &mut Request<'_>, c: &Captures| {
                HandlerOutcome::json(&serde_json::json!({"id": c.get(0)}))
            })
            .unwrap();
        router
    }

    fn exchange(addr: SocketAddr, raw: &str) -> String {
        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(raw.as_bytes()).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let mut server = Server::new(test_config(), Router::new());
        assert!(server.local_addr().is_none());
        assert!(server.shutdown_handle().is_none());

        let addr = server.bind().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));
    }

    #[test]
    fn test_bind_rejects_invalid_config() {
        let mut config = test_config();
        config.backlog = 0;
        let mut server = Server::new(config, Router::new());
        assert!(matches!(server.bind(), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_serves_sequential_connections() {
        let mut server = Server::new(test_config(), test_router());
        let addr = server.bind().unwrap();
        let handle = server.shutdown_handle().unwrap();

        let t = thread::spawn(move || server.run());

        let first = exchange(addr, "GET /hello HTTP/1.1\r\n\r\n");
        assert_eq!(first, "HTTP/1.1 200 Okay\r\nContent-length: 5\r\n\r\nhello");

        let second = exchange(addr, "GET /user/42 HTTP/1.1\r\n\r\n");
        assert!(second.ends_with(r#"{"id": "42"}"#));

        let missing = exchange(addr, "GET /user/abc HTTP/1.1\r\n\r\n");
        assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"));

        handle.shutdown();
        assert!(t.join().unwrap().is_ok());
    }

    #[test]
    fn test_bad_connection_does_not_stop_server() {
        let mut server = Server::new(test_config(), test_router());
        let addr = server.bind().unwrap();
        let handle = server.shutdown_handle().unwrap();

        let t = thread::spawn(move || server.run());

        // Cliente que conecta y cierra sin mandar nada
        drop(TcpStream::connect(addr).unwrap());

        let garbage = exchange(addr, "NONSENSE\r\n");
        assert!(garbage.is_empty());

        let unknown = exchange(addr, "PROPFIND /hello HTTP/1.1\r\n\r\n");
        assert!(unknown.starts_with("HTTP/1.1 404 Not Found\r\n"));

        let ok = exchange(addr, "GET /hello HTTP/1.0\r\n\r\n");
        assert!(ok.ends_with("hello"));

        handle.shutdown();
        assert!(t.join().unwrap().is_ok());
    }

    #[test]
    fn test_accept_backoff_grows_and_caps() {
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(4), Duration::from_millis(80));
        assert_eq!(accept_backoff(8), Duration::from_secs(1));
        assert_eq!(accept_backoff(u32::MAX), Duration::from_secs(1));
    }
}
