//! # Módulo HTTP
//!
//! Este módulo implementa el subconjunto de HTTP/1.1 que necesita el
//! servidor, sin usar librerías de alto nivel. Incluye:
//!
//! - Transporte abstracto (`ByteStream`) sobre TCP o memoria
//! - Parsing de la request line y headers
//! - Decodificación del body (Content-Length y chunked, con 100-continue)
//! - Construcción y serialización de responses, incluyendo streaming
//! - Tabla de status codes
//!
//! ## Limitaciones
//!
//! - Un request por conexión: no hay keep-alive ni pipelining
//! - Las respuestas en streaming no usan chunked encoding; el final del
//!   body se marca cerrando la conexión
//!
//! ### Formato de Request
//!
//! ```text
//! PUT /echo HTTP/1.1\r\n
//! Transfer-Encoding: chunked\r\n
//! \r\n
//! 5\r\nhello\r\n0\r\n\r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 Okay\r\n
//! Content-type: application/json\r\n
//! Content-length: 12\r\n
//! \r\n
//! {"ok": true}
//! ```

pub mod body;      // Decodificación del body
pub mod error;     // Taxonomía de errores
pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP
pub mod stream;    // Transporte de bytes
pub mod writer;    // Serialización de responses

// Re-exportamos los tipos principales para facilitar su uso
pub use body::{BodyChunks, BodyDecoder};
pub use error::{ConnectionError, HandlerError, HttpError, ProtocolError, TransportError};
pub use request::{Method, Request};
pub use response::{Body, ChunkSource, Response};
pub use status::StatusCode;
pub use stream::{ByteStream, MemoryStream, TcpConnection};
