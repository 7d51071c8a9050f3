//! # Errores del Protocolo
//! src/http/error.rs
//!
//! Taxonomía de errores del motor HTTP:
//!
//! - [`ProtocolError`]: request line o headers malformados. La conexión se
//!   aborta sin respuesta (no hay un request válido al que responder).
//! - [`TransportError`]: fallo de I/O o framing inválido del body. Se reporta
//!   como 500 si ocurre después de parsear los headers.
//! - [`HttpError`]: error HTTP explícito levantado por un handler; su código,
//!   texto y contenido se envían tal cual.
//! - [`HandlerError`]: lo que un handler retorna en `Err`.
//! - [`ConnectionError`]: lo que el Connection Handler reporta al Server Loop.

use std::fmt;
use std::io;

use thiserror::Error;

use super::response::Body;
use super::status;

/// Errores que pueden ocurrir durante el parsing de la request line y los headers
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// El cliente cerró la conexión sin enviar nada
    #[error("empty request")]
    EmptyRequest,

    /// Request line sin método o sin path, o con bytes no ASCII
    #[error("invalid request line: {line:?}")]
    InvalidRequestLine { line: String },

    /// Método con caracteres que no forman un token HTTP
    #[error("invalid HTTP method token: {method:?}")]
    InvalidMethod { method: String },

    /// Línea de header sin el separador `": "`
    #[error("invalid header: {line:?}")]
    InvalidHeader { line: String },

    #[error("io error while reading request head: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Fallos de transporte: I/O o framing del body que no se puede recuperar
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// La línea de tamaño de un chunk no es un entero hexadecimal
    #[error("invalid chunk size line: {line:?}")]
    InvalidChunkSize { line: String },

    /// El stream terminó antes de entregar todo el body declarado
    #[error("connection closed with {missing} body bytes outstanding")]
    UnexpectedEof { missing: u64 },
}

impl TransportError {
    /// Copia del error. Un `Io` conserva su kind y su mensaje.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            TransportError::Io { source } => TransportError::Io {
                source: io::Error::new(source.kind(), source.to_string()),
            },
            TransportError::InvalidChunkSize { line } => TransportError::InvalidChunkSize { line: line.clone() },
            TransportError::UnexpectedEof { missing } => TransportError::UnexpectedEof { missing: *missing },
        }
    }
}

/// Error HTTP explícito levantado por un handler.
///
/// Si no se da `status_text`, se toma de la tabla de [`status`].
///
/// # Ejemplo
/// ```
/// use noggin::http::HttpError;
///
/// let err = HttpError::new(418);
/// assert_eq!(err.status_code(), 418);
/// assert_eq!(err.status_text(), "I'm a teapot");
/// ```
pub struct HttpError {
    status_code: u16,
    status_text: String,
    content: Body,
}

impl HttpError {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            status_text: status::default_reason(status_code).to_string(),
            content: Body::Empty,
        }
    }

    /// Reemplaza el texto de estado por defecto
    pub fn with_status_text(mut self, status_text: &str) -> Self {
        self.status_text = status_text.to_string();
        self
    }

    /// Agrega contenido al error (se envía como body)
    pub fn with_content(mut self, content: impl Into<Body>) -> Self {
        self.content = content.into();
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn content(&self) -> &Body {
        &self.content
    }

    /// Descompone el error en (código, texto, contenido)
    pub fn into_parts(self) -> (u16, String, Body) {
        (self.status_code, self.status_text, self.content)
    }
}

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpError")
            .field("status_code", &self.status_code)
            .field("status_text", &self.status_text)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} {}", self.status_code, self.status_text)
    }
}

impl std::error::Error for HttpError {}

/// Lo que un handler puede retornar en `Err`.
///
/// Las conversiones `From` permiten usar `?` dentro de los handlers:
/// un [`HttpError`] se envía tal cual, cualquier otro error termina en un 500.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Failure(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Crea un fallo genérico a partir de un mensaje
    pub fn failure(message: impl Into<String>) -> Self {
        let message: String = message.into();
        HandlerError::Failure(message.into())
    }
}

impl From<io::Error> for HandlerError {
    fn from(err: io::Error) -> Self {
        HandlerError::Failure(Box::new(err))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Failure(Box::new(err))
    }
}

/// Error reportado por el Connection Handler al Server Loop.
///
/// Nunca termina el Server Loop: solo se registra en el log.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("handler failed: {0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}
