//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Una [`Response`] tiene código, texto de estado, content-type opcional,
//! headers en el orden en que se agregaron y un [`Body`]:
//!
//! - `Empty`: sin contenido
//! - `Bytes` / `Text`: contenido en memoria, se declara `Content-length`
//! - `Stream`: secuencia perezosa de pedazos ([`ChunkSource`]), largo
//!   desconocido; el cliente detecta el final cuando se cierra la conexión
//!
//! ## Ejemplo de uso
//!
//! ```
//! use noggin::http::Response;
//!
//! let response = Response::new(200)
//!     .with_content_type("text/html")
//!     .with_header("X-Powered-By", "noggin")
//!     .with_body("<h1>hola</h1>");
//!
//! assert_eq!(response.status_text(), "OK");
//! ```

use std::fmt;
use std::io::{self, Read};

use serde::Serialize;

use super::body::BODY_BUFFER_SIZE;
use super::error::TransportError;
use super::status;
use super::stream::ByteStream;
use super::writer;

/// Productor de pedazos de un body en streaming.
///
/// Recibe la conexión en cada llamada para que el body de un request pueda
/// leerse y reenviarse por el mismo socket sin cargarlo en memoria.
pub trait ChunkSource {
    /// Siguiente pedazo, o `None` cuando la secuencia terminó.
    fn next_chunk(&mut self, conn: &mut dyn ByteStream) -> Result<Option<&[u8]>, TransportError>;

    /// Se llama una vez antes de escribir la status line de la respuesta
    /// que lleva este body. Puede escribir respuestas intermedias.
    fn before_response(&mut self, _conn: &mut dyn ByteStream) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Adapta un iterador de `io::Result<Vec<u8>>` a [`ChunkSource`]
pub struct IterChunks<I> {
    iter: I,
    current: Vec<u8>,
}

impl<I> IterChunks<I>
where
    I: Iterator<Item = io::Result<Vec<u8>>>,
{
    pub fn new(iter: I) -> Self {
        Self {
            iter,
            current: Vec::new(),
        }
    }
}

impl<I> ChunkSource for IterChunks<I>
where
    I: Iterator<Item = io::Result<Vec<u8>>>,
{
    fn next_chunk(&mut self, _conn: &mut dyn ByteStream) -> Result<Option<&[u8]>, TransportError> {
        match self.iter.next() {
            None => Ok(None),
            Some(chunk) => {
                self.current = chunk?;
                Ok(Some(&self.current))
            }
        }
    }
}

/// Lee cualquier `Read` (por ejemplo un archivo abierto) en pedazos de
/// [`BODY_BUFFER_SIZE`] bytes.
pub struct ReaderChunks<R> {
    reader: R,
    buf: [u8; BODY_BUFFER_SIZE],
}

impl<R: Read> ReaderChunks<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: [0; BODY_BUFFER_SIZE],
        }
    }
}

impl<R: Read> ChunkSource for ReaderChunks<R> {
    fn next_chunk(&mut self, _conn: &mut dyn ByteStream) -> Result<Option<&[u8]>, TransportError> {
        let n = self.reader.read(&mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(&self.buf[..n]))
    }
}

/// Contenido de una respuesta
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Text(String),
    Stream(Box<dyn ChunkSource>),
}

impl Body {
    /// Body en streaming a partir de cualquier [`ChunkSource`]
    pub fn stream(source: impl ChunkSource + 'static) -> Self {
        Body::Stream(Box::new(source))
    }

    /// Body en streaming a partir de un iterador de pedazos
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = io::Result<Vec<u8>>>,
        I::IntoIter: 'static,
    {
        Body::stream(IterChunks::new(chunks.into_iter()))
    }

    /// Largo en bytes si se conoce de antemano (`None` para streams)
    pub fn known_length(&self) -> Option<usize> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(bytes) => Some(bytes.len()),
            Body::Text(text) => Some(text.len()),
            Body::Stream(_) => None,
        }
    }

    /// `true` si no hay nada que enviar. Un stream nunca se considera vacío.
    pub fn is_empty(&self) -> bool {
        self.known_length() == Some(0)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Body::Bytes(bytes.to_vec())
    }
}

/// Respuesta HTTP completa, consumida una sola vez por el writer
#[derive(Debug)]
pub struct Response {
    status_code: u16,
    status_text: String,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    body: Body,
}

impl Response {
    /// Crea una respuesta sin headers ni body; el texto de estado sale de la
    /// tabla de códigos.
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            status_text: status::default_reason(status_code).to_string(),
            content_type: None,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn with_status_text(mut self, status_text: &str) -> Self {
        self.status_text = status_text.to_string();
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Agrega un header; se envían en el orden en que se agregaron
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Respuesta 200 con el valor serializado como JSON
    ///
    /// # Ejemplo
    /// ```
    /// use noggin::http::Response;
    ///
    /// let response = Response::json(&serde_json::json!({"a": 1})).unwrap();
    /// assert_eq!(response.content_type(), Some("application/json"));
    /// ```
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(200)
            .with_content_type("application/json")
            .with_body(encode_json(value)?))
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Serializa la respuesta completa en la conexión
    pub fn write_to(self, conn: &mut dyn ByteStream) -> Result<(), TransportError> {
        writer::send_response(
            conn,
            self.status_code,
            &self.status_text,
            self.body,
            self.content_type.as_deref(),
            &self.headers,
        )
    }
}

/// Separadores `", "` y `": "`, el formato clásico de `{"a": 1, "b": [1, 2]}`
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serializa a JSON conservando el orden de las claves
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}
