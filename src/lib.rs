//! # Noggin
//! src/lib.rs
//!
//! Servidor HTTP/1.1 mínimo y síncrono, pensado para dispositivos con
//! poca memoria: atiende una conexión a la vez, un request por conexión,
//! y nunca carga un body completo si el handler no lo pide.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: transporte, parsing del request, decodificación del body y
//!   serialización de la respuesta
//! - `router`: rutas por expresión regular + método, y los resultados que
//!   pueden producir los handlers
//! - `server`: loop de aceptación y manejo de cada conexión
//! - `config`: configuración por CLI y variables de entorno
//! - `logging`: inicialización de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use noggin::config::Config;
//! use noggin::http::Request;
//! use noggin::router::{Captures, Router};
//! use noggin::server::Server;
//!
//! let mut router = Router::new();
//! router
//!     .route("/", |_req: &mut Request<'_>, _c: &Captures| Ok("hola".into()))
//!     .unwrap();
//!
//! let mut server = Server::new(Config::default(), router);
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;

pub use config::Config;
pub use router::{Captures, HandlerOutcome, HandlerResult, Router};
pub use server::Server;
