//! # Decodificación del Body
//! src/http/body.rs
//!
//! Convierte el body del request en una secuencia perezosa de pedazos de
//! bytes, leídos directamente del stream a medida que se piden.
//!
//! ## Framing soportado
//!
//! ```text
//! Content-Length: 15\r\n           Transfer-Encoding: chunked\r\n
//! \r\n                             \r\n
//! <15 bytes>                       E\r\n<14 bytes>\r\n0\r\n\r\n
//! ```
//!
//! Nunca se lee más de [`BODY_BUFFER_SIZE`] bytes por llamada, así que la
//! memoria usada es fija sin importar el tamaño del body. Si el request trae
//! `Expect: 100-continue`, el `100 Continue` se envía una sola vez, justo
//! antes de la primera lectura del body. Si el decodificador se devuelve
//! como body de la respuesta, se envía antes de la status line.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::error::TransportError;
use super::response::ChunkSource;
use super::stream::ByteStream;
use super::writer;

/// Ancho máximo de cada lectura del body
pub const BODY_BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Body con Content-Length: faltan `remaining` bytes
    Fixed { remaining: u64 },
    /// Esperando la línea con el tamaño del siguiente chunk
    ChunkSize,
    /// Dentro de un chunk: faltan `remaining` bytes
    ChunkData { remaining: u64 },
    Done,
}

/// Estado del decodificador del body de un request.
///
/// No guarda referencia al stream: cada llamada a
/// [`next_chunk`](ChunkSource::next_chunk) recibe la conexión. Eso permite
/// devolver el decodificador como body de una respuesta (eco en streaming).
pub struct BodyDecoder {
    state: DecodeState,
    expect_continue: bool,
    buf: [u8; BODY_BUFFER_SIZE],
}

impl BodyDecoder {
    fn new(state: DecodeState, expect_continue: bool) -> Self {
        Self {
            state,
            expect_continue,
            buf: [0; BODY_BUFFER_SIZE],
        }
    }

    /// Elige el framing según los headers (nombres en minúscula).
    ///
    /// `transfer-encoding: chunked` tiene prioridad; si no, se usa
    /// `content-length`, que vale 0 si falta o no es un entero.
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        let expect_continue = headers
            .get("expect")
            .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"));

        let chunked = headers
            .get("transfer-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));

        if chunked {
            debug!(expect_continue, "chunked request body");
            return Self::new(DecodeState::ChunkSize, expect_continue);
        }

        let length = headers
            .get("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        debug!(length, expect_continue, "simple request body");
        Self::new(DecodeState::Fixed { remaining: length }, expect_continue)
    }

    /// Body de largo fijo
    pub fn fixed(length: u64) -> Self {
        Self::new(DecodeState::Fixed { remaining: length }, false)
    }

    /// Body con transfer-encoding chunked
    pub fn chunked() -> Self {
        Self::new(DecodeState::ChunkSize, false)
    }

    /// Decodificador ya agotado
    pub fn empty() -> Self {
        Self::new(DecodeState::Done, false)
    }

    /// `true` cuando ya no quedan bytes del body por leer
    pub fn is_done(&self) -> bool {
        self.state == DecodeState::Done
    }

    /// Iterador sobre los pedazos restantes del body
    pub fn iter<'a>(&'a mut self, conn: &'a mut dyn ByteStream) -> BodyChunks<'a> {
        BodyChunks {
            decoder: self,
            conn,
        }
    }

    /// Avanza la máquina de estados hasta tener bytes en `buf` o terminar.
    fn advance(&mut self, conn: &mut dyn ByteStream) -> Result<Option<usize>, TransportError> {
        self.send_pending_continue(conn)?;

        loop {
            match self.state {
                DecodeState::Done => return Ok(None),

                DecodeState::Fixed { remaining: 0 } => {
                    self.state = DecodeState::Done;
                }
                DecodeState::Fixed { remaining } => {
                    let n = self.read_piece(conn, remaining)?;
                    self.state = DecodeState::Fixed {
                        remaining: remaining - n as u64,
                    };
                    return Ok(Some(n));
                }

                DecodeState::ChunkSize => {
                    let size = read_chunk_size(conn)?;
                    trace!(size, "chunk header");
                    if size == 0 {
                        // CRLF final después del chunk de tamaño 0
                        conn.read_line()?;
                        self.state = DecodeState::Done;
                    } else {
                        self.state = DecodeState::ChunkData { remaining: size };
                    }
                }
                DecodeState::ChunkData { remaining: 0 } => {
                    // CRLF que sigue a los datos del chunk
                    conn.read_line()?;
                    self.state = DecodeState::ChunkSize;
                }
                DecodeState::ChunkData { remaining } => {
                    let n = self.read_piece(conn, remaining)?;
                    self.state = DecodeState::ChunkData {
                        remaining: remaining - n as u64,
                    };
                    return Ok(Some(n));
                }
            }
        }
    }

    /// Envía el `100 Continue` si el cliente lo pidió y todavía no se envió
    fn send_pending_continue(&mut self, conn: &mut dyn ByteStream) -> Result<(), TransportError> {
        if self.expect_continue {
            self.expect_continue = false;
            debug!("sending 100 Continue");
            writer::send_status(conn, 100, "Continue")?;
        }
        Ok(())
    }

    fn read_piece(&mut self, conn: &mut dyn ByteStream, remaining: u64) -> Result<usize, TransportError> {
        let want = usize::try_from(remaining).map_or(BODY_BUFFER_SIZE, |r| r.min(BODY_BUFFER_SIZE));
        let n = conn.read_into(&mut self.buf[..want])?;
        if n == 0 {
            return Err(TransportError::UnexpectedEof { missing: remaining });
        }
        Ok(n)
    }
}

impl ChunkSource for BodyDecoder {
    fn next_chunk(&mut self, conn: &mut dyn ByteStream) -> Result<Option<&[u8]>, TransportError> {
        match self.advance(conn) {
            Ok(Some(n)) => Ok(Some(&self.buf[..n])),
            Ok(None) => Ok(None),
            Err(e) => {
                // el framing ya no es confiable: no se sigue leyendo
                self.state = DecodeState::Done;
                Err(e)
            }
        }
    }

    /// Envía el `100 Continue` pendiente antes de la status line del eco
    fn before_response(&mut self, conn: &mut dyn ByteStream) -> Result<(), TransportError> {
        self.send_pending_continue(conn)
    }
}

impl std::fmt::Debug for BodyDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyDecoder")
            .field("state", &self.state)
            .field("expect_continue", &self.expect_continue)
            .finish_non_exhaustive()
    }
}

/// Lee y parsea la línea `<hex-size>[;extensiones]\r\n`
fn read_chunk_size(conn: &mut dyn ByteStream) -> Result<u64, TransportError> {
    let line = conn.read_line()?;
    if line.is_empty() {
        return Err(TransportError::UnexpectedEof { missing: 0 });
    }
    parse_chunk_size(&line)
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, TransportError> {
    let invalid = || TransportError::InvalidChunkSize {
        line: String::from_utf8_lossy(line).trim_end().to_string(),
    };

    let text = std::str::from_utf8(line).map_err(|_| invalid())?;
    let size = text.split_once(';').map_or(text, |(size, _)| size).trim();
    // from_str_radix acepta un `+` inicial; el tamaño son solo dígitos hex
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    u64::from_str_radix(size, 16).map_err(|_| invalid())
}

/// Iterador sobre los pedazos del body, cada uno como un `Vec<u8>` propio.
///
/// Después del primer error el iterador termina.
pub struct BodyChunks<'a> {
    decoder: &'a mut BodyDecoder,
    conn: &'a mut dyn ByteStream,
}

impl Iterator for BodyChunks<'_> {
    type Item = Result<Vec<u8>, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder
            .next_chunk(&mut *self.conn)
            .map(|chunk| chunk.map(<[u8]>::to_vec))
            .transpose()
    }
}
