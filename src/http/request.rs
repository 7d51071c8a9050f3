//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! El request se lee directamente de la conexión, línea por línea. Solo se
//! parsean la request line y los headers; el body queda en el stream y se
//! decodifica bajo demanda con [`BodyDecoder`].
//!
//! ## Formato de un Request
//!
//! ```text
//! PUT /echo HTTP/1.1\r\n
//! Content-Length: 5\r\n
//! Expect: 100-continue\r\n
//! \r\n
//! hello
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path VERSION` (si falta la versión se asume `HTTP/1.0`)
//! 2. **Headers**: pares `Name: Value`; el nombre se guarda en minúscula
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: se lee solo si el handler lo pide

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::body::{BodyChunks, BodyDecoder};
use super::error::{HandlerError, ProtocolError, TransportError};
use super::response::ChunkSource;
use super::stream::ByteStream;

/// Versión asumida cuando el cliente no la envía
pub const DEFAULT_VERSION: &str = "HTTP/1.0";

/// Métodos HTTP
///
/// Los nueve métodos estándar tienen variante propia; cualquier otro token
/// válido (`PROPFIND`, `BREW`, ...) queda en [`Method::Other`] y el router
/// simplemente no lo encuentra.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    PATCH,
    OPTIONS,
    CONNECT,
    TRACE,
    Other(String),
}

impl Method {
    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::OPTIONS => "OPTIONS",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
            Method::Other(token) => token,
        }
    }
}

impl FromStr for Method {
    type Err = ProtocolError;

    /// Parsea un método HTTP (sensible a mayúsculas, como exige el RFC).
    /// Solo falla si el token tiene caracteres no permitidos.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "PATCH" => Ok(Method::PATCH),
            "OPTIONS" => Ok(Method::OPTIONS),
            "CONNECT" => Ok(Method::CONNECT),
            "TRACE" => Ok(Method::TRACE),
            _ if !s.is_empty() && s.bytes().all(is_token_byte) => Ok(Method::Other(s.to_string())),
            _ => Err(ProtocolError::InvalidMethod {
                method: s.to_string(),
            }),
        }
    }
}

/// `tchar` de RFC 9110
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request HTTP ligado a la conexión de la que se leyó.
///
/// El body se cachea la primera vez que se pide completo con
/// [`content`](Request::content); después ya no se vuelve a leer el stream.
/// Si esa lectura falla, se cachea el error.
pub struct Request<'c> {
    method: Method,
    path: String,
    version: String,
    headers: HashMap<String, String>,
    conn: &'c mut dyn ByteStream,
    body: BodyDecoder,
    cached: Option<Result<Vec<u8>, TransportError>>,
}

impl<'c> Request<'c> {
    /// Lee la request line y los headers de la conexión.
    ///
    /// # Errores
    ///
    /// Retorna [`ProtocolError`] si la conexión se cerró sin datos, si la
    /// request line o algún header están malformados, o si falla la lectura.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use noggin::http::Request;
    /// use noggin::http::stream::MemoryStream;
    ///
    /// let mut conn = MemoryStream::new("GET /device/led HTTP/1.1\r\nHost: esp32\r\n\r\n");
    /// let request = Request::read_from(&mut conn).unwrap();
    ///
    /// assert_eq!(request.path(), "/device/led");
    /// assert_eq!(request.header("Host"), Some("esp32"));
    /// ```
    pub fn read_from(conn: &'c mut dyn ByteStream) -> Result<Self, ProtocolError> {
        let line = conn.read_line()?;
        if line.iter().all(u8::is_ascii_whitespace) {
            return Err(ProtocolError::EmptyRequest);
        }
        let (method, path, version) = parse_request_line(&line)?;

        let mut headers = HashMap::new();
        loop {
            let line = conn.read_line()?;
            if line.is_empty() || line == b"\r\n" || line == b"\n" {
                break;
            }
            let (name, value) = parse_header_line(&line)?;
            headers.insert(name, value);
        }

        let body = BodyDecoder::from_headers(&headers);

        Ok(Self {
            method,
            path,
            version,
            headers,
            conn,
            body,
            cached: None,
        })
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Todos los headers, con nombres en minúscula
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header (el nombre no distingue mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Itera el body en pedazos de a lo más 256 bytes, leyendo del stream
    /// a medida que se consume.
    pub fn iter_content(&mut self) -> BodyChunks<'_> {
        self.body.iter(&mut *self.conn)
    }

    /// Body completo. La primera llamada lo lee del stream y guarda el
    /// resultado; las siguientes retornan la copia guardada, o el mismo
    /// error si la lectura falló.
    pub fn content(&mut self) -> Result<&[u8], TransportError> {
        let Self { body, conn, cached, .. } = self;
        match cached.get_or_insert_with(|| read_all(body, &mut **conn)) {
            Ok(content) => Ok(content.as_slice()),
            Err(e) => Err(e.duplicate()),
        }
    }

    /// Body completo como texto UTF-8
    pub fn text(&mut self) -> Result<&str, HandlerError> {
        let content = self.content()?;
        std::str::from_utf8(content).map_err(|e| HandlerError::Failure(Box::new(e)))
    }

    /// Entrega el decodificador del body sin leerlo, para reenviarlo como
    /// body de la respuesta. El request queda con el body vacío.
    pub fn take_body(&mut self) -> BodyDecoder {
        std::mem::replace(&mut self.body, BodyDecoder::empty())
    }

    /// Conexión subyacente, para escribir la respuesta
    pub(crate) fn connection(&mut self) -> &mut dyn ByteStream {
        &mut *self.conn
    }
}

fn read_all(body: &mut BodyDecoder, conn: &mut dyn ByteStream) -> Result<Vec<u8>, TransportError> {
    let mut content = Vec::new();
    while let Some(chunk) = body.next_chunk(conn)? {
        content.extend_from_slice(chunk);
    }
    Ok(content)
}

impl fmt::Display for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.method, self.path)
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// Parsea la request line
///
/// Formato: `GET /path HTTP/1.1`; tokens extra se ignoran.
fn parse_request_line(line: &[u8]) -> Result<(Method, String, String), ProtocolError> {
    let invalid = || ProtocolError::InvalidRequestLine {
        line: String::from_utf8_lossy(line).trim_end().to_string(),
    };

    let text = std::str::from_utf8(line).map_err(|_| invalid())?;
    let mut parts = text.split_whitespace();

    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let version = parts.next().unwrap_or(DEFAULT_VERSION);

    Ok((method.parse()?, path.to_string(), version.to_string()))
}

/// Parsea un header `Name: Value`, separando en el primer `": "`
fn parse_header_line(line: &[u8]) -> Result<(String, String), ProtocolError> {
    let invalid = || ProtocolError::InvalidHeader {
        line: String::from_utf8_lossy(line).trim_end().to_string(),
    };

    let text = std::str::from_utf8(line).map_err(|_| invalid())?.trim();
    let (name, value) = text.split_once(": ").ok_or_else(invalid)?;
    Ok((name.to_ascii_lowercase(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stream::MemoryStream;

    #[test]
    fn test_parse_simple_get() {
        let mut conn = MemoryStream::new("GET / HTTP/1.1\r\n\r\n");
        let request = Request::read_from(&mut conn).unwrap();

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/");
        assert_eq!(request.version(), "HTTP/1.1");
        assert!(request.headers().is_empty());
        assert_eq!(request.to_string(), "<GET />");
    }

    #[test]
    fn test_missing_version_defaults() {
        let mut conn = MemoryStream::new("DELETE /file/a.txt\r\n\r\n");
        let request = Request::read_from(&mut conn).unwrap();

        assert_eq!(request.method(), &Method::DELETE);
        assert_eq!(request.version(), "HTTP/1.0");
    }

    #[test]
    fn test_headers_are_lowercased() {
        let mut conn = MemoryStream::new("GET / HTTP/1.1\r\nContent-Type: text/plain\r\nX-Ratio: 1: 2\r\n\r\n");
        let request = Request::read_from(&mut conn).unwrap();

        assert_eq!(request.headers().get("content-type").map(String::as_str), Some("text/plain"));
        assert_eq!(request.header("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(request.header("x-ratio"), Some("1: 2"));
    }

    #[test]
    fn test_headers_end_at_eof() {
        let mut conn = MemoryStream::new("GET / HTTP/1.1\r\nHost: x\r\n");
        let request = Request::read_from(&mut conn).unwrap();
        assert_eq!(request.header("host"), Some("x"));
    }

    #[test]
    fn test_empty_request() {
        let mut conn = MemoryStream::new("");
        assert!(matches!(Request::read_from(&mut conn), Err(ProtocolError::EmptyRequest)));

        let mut conn = MemoryStream::new("\r\n");
        assert!(matches!(Request::read_from(&mut conn), Err(ProtocolError::EmptyRequest)));
    }

    #[test]
    fn test_invalid_request_line() {
        let mut conn = MemoryStream::new("GET\r\n\r\n");
        assert!(matches!(
            Request::read_from(&mut conn),
            Err(ProtocolError::InvalidRequestLine { .. })
        ));
    }

    #[test]
    fn test_extension_method() {
        let mut conn = MemoryStream::new("BREW /pot HTTP/1.1\r\n\r\n");
        let request = Request::read_from(&mut conn).unwrap();

        assert_eq!(request.method(), &Method::Other("BREW".to_string()));
        assert_eq!(request.to_string(), "<BREW /pot>");
    }

    #[test]
    fn test_invalid_method_token() {
        let mut conn = MemoryStream::new("GE(T / HTTP/1.1\r\n\r\n");
        assert!(matches!(
            Request::read_from(&mut conn),
            Err(ProtocolError::InvalidMethod { ref method }) if method == "GE(T"
        ));
    }

    #[test]
    fn test_method_names() {
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::PATCH);
        assert_eq!("get".parse::<Method>().unwrap(), Method::Other("get".to_string()));
        assert_eq!(Method::Other("PROPFIND".to_string()).as_str(), "PROPFIND");
    }

    #[test]
    fn test_malformed_header() {
        let mut conn = MemoryStream::new("GET / HTTP/1.1\r\nNoSeparator\r\n\r\n");
        assert!(matches!(
            Request::read_from(&mut conn),
            Err(ProtocolError::InvalidHeader { ref line }) if line == "NoSeparator"
        ));
    }

    #[test]
    fn test_content_is_cached() {
        let mut conn = MemoryStream::new("PUT /echo HTTP/1.1\r\nContent-length: 15\r\n\r\nfifteen bytes!!");
        let mut request = Request::read_from(&mut conn).unwrap();

        assert_eq!(request.content().unwrap(), b"fifteen bytes!!");
        assert_eq!(request.content().unwrap(), b"fifteen bytes!!");
        assert_eq!(request.text().unwrap(), "fifteen bytes!!");
    }

    #[test]
    fn test_content_error_is_repeated() {
        let mut conn = MemoryStream::new("PUT /echo HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc");
        let mut request = Request::read_from(&mut conn).unwrap();

        assert!(matches!(
            request.content(),
            Err(TransportError::UnexpectedEof { missing: 7 })
        ));
        assert!(matches!(
            request.content(),
            Err(TransportError::UnexpectedEof { missing: 7 })
        ));
        assert!(request.text().is_err());
    }

    fn reads_after_accesses(accesses: usize) -> usize {
        let mut conn = MemoryStream::new("PUT /echo HTTP/1.1\r\nContent-length: 3\r\n\r\nabc");
        let mut request = Request::read_from(&mut conn).unwrap();
        for _ in 0..accesses {
            assert_eq!(request.content().unwrap(), b"abc");
        }
        drop(request);
        conn.read_calls()
    }

    #[test]
    fn test_content_second_access_does_not_read() {
        assert_eq!(reads_after_accesses(1), reads_after_accesses(3));
    }

    #[test]
    fn test_chunked_content() {
        let mut conn =
            MemoryStream::new("POST /up HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nE\r\nThis is a test\r\n0\r\n\r\n");
        let mut request = Request::read_from(&mut conn).unwrap();

        assert_eq!(request.content().unwrap(), b"This is a test");
        drop(request);
        assert!(conn.remaining().is_empty());
    }

    #[test]
    fn test_iter_content() {
        let mut conn = MemoryStream::new("PUT /f HTTP/1.1\r\ncontent-length: 4\r\n\r\nabcd");
        let mut request = Request::read_from(&mut conn).unwrap();

        let chunks: Result<Vec<Vec<u8>>, _> = request.iter_content().collect();
        assert_eq!(chunks.unwrap().concat(), b"abcd");
    }

    #[test]
    fn test_text_rejects_invalid_utf8() {
        let mut raw = b"PUT /t HTTP/1.1\r\nContent-Length: 2\r\n\r\n".to_vec();
        raw.extend_from_slice(&[0xff, 0xfe]);
        let mut conn = MemoryStream::new(raw);
        let mut request = Request::read_from(&mut conn).unwrap();

        assert!(matches!(request.text(), Err(HandlerError::Failure(_))));
    }

    #[test]
    fn test_take_body_leaves_request_empty() {
        let mut conn = MemoryStream::new("PUT /e HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi");
        let mut request = Request::read_from(&mut conn).unwrap();

        let decoder = request.take_body();
        assert!(!decoder.is_done());
        assert_eq!(request.content().unwrap(), b"");
    }
}
