//! # Serialización de Respuestas
//! src/http/writer.rs
//!
//! Escribe una respuesta en la conexión, línea por línea:
//!
//! ```text
//! HTTP/1.1 200 Okay\r\n
//! X-Header: valor\r\n          (headers del caller, en orden)
//! Content-type: text/html\r\n  (si hay content-type)
//! Content-length: 14\r\n       (si el largo del body se conoce)
//! \r\n
//! <body>
//! ```
//!
//! Los bodies en streaming no declaran `Content-length` ni usan chunked
//! encoding: el cliente detecta el final cuando se cierra la conexión.
//! Antes de la status line, la fuente del stream puede enviar respuestas
//! intermedias con [`send_status`] (el `100 Continue` de un eco).

use tracing::debug;

use super::error::TransportError;
use super::response::Body;
use super::stream::ByteStream;

/// Envía status line, headers y body.
pub fn send_response(
    conn: &mut dyn ByteStream,
    status_code: u16,
    status_text: &str,
    mut content: Body,
    content_type: Option<&str>,
    headers: &[(String, String)],
) -> Result<(), TransportError> {
    if let Body::Stream(source) = &mut content {
        source.before_response(conn)?;
    }

    debug!(status_code, status_text, "sending response");

    conn.write(format!("HTTP/1.1 {} {}\r\n", status_code, status_text).as_bytes())?;

    for (name, value) in headers {
        conn.write(format!("{}: {}\r\n", name, value).as_bytes())?;
    }

    if let Some(content_type) = content_type {
        conn.write(format!("Content-type: {}\r\n", content_type).as_bytes())?;
    }

    if !content.is_empty() {
        if let Some(length) = content.known_length() {
            conn.write(format!("Content-length: {}\r\n", length).as_bytes())?;
        }
    }

    conn.write(b"\r\n")?;

    match content {
        Body::Empty => {}
        Body::Bytes(bytes) if bytes.is_empty() => {}
        Body::Text(text) if text.is_empty() => {}
        Body::Bytes(bytes) => conn.write(&bytes)?,
        Body::Text(text) => conn.write(text.as_bytes())?,
        Body::Stream(mut source) => {
            let mut total = 0usize;
            while let Some(chunk) = source.next_chunk(conn)? {
                if !chunk.is_empty() {
                    conn.write(chunk)?;
                    total += chunk.len();
                }
            }
            debug!(bytes = total, "streamed body finished");
        }
    }

    Ok(())
}

/// Envía solo la status line y la línea vacía (respuestas intermedias)
pub fn send_status(conn: &mut dyn ByteStream, status_code: u16, status_text: &str) -> Result<(), TransportError> {
    send_response(conn, status_code, status_text, Body::Empty, None, &[])
}
