//! # Transporte de Bytes
//! src/http/stream.rs
//!
//! El motor HTTP no depende de `TcpStream` directamente: solo necesita
//! tres operaciones sobre un stream duplex de bytes, definidas en
//! [`ByteStream`]:
//!
//! - `read_line`: leer una línea terminada en `\n`
//! - `read_into`: leer hasta N bytes en un buffer del caller
//! - `write`: escribir bytes
//!
//! Implementaciones incluidas:
//!
//! - [`TcpConnection`]: socket TCP con lectura bufferizada
//! - [`MemoryStream`]: stream en memoria para pruebas, registra cada escritura

use std::io::{self, BufRead, BufReader, Cursor, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

/// Largo máximo de una línea (request line, header o tamaño de chunk)
pub const MAX_LINE_LENGTH: u64 = 8 * 1024;

/// Tamaño del buffer de lectura de [`TcpConnection`]
const READ_BUFFER_SIZE: usize = 1024;

/// Capacidades mínimas que el motor necesita de un transporte.
pub trait ByteStream {
    /// Lee una línea, incluyendo el `\n` final.
    ///
    /// Retorna un vector vacío cuando el stream terminó. Una línea más larga
    /// que [`MAX_LINE_LENGTH`] se entrega truncada.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Lee hasta `buf.len()` bytes. Retorna 0 al final del stream.
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Escribe todos los bytes.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Libera la conexión. Las lecturas y escrituras posteriores fallan.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn read_line_from<R: BufRead>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    reader.take(MAX_LINE_LENGTH).read_until(b'\n', &mut line)?;
    Ok(line)
}

/// Conexión TCP aceptada por el Server Loop
#[derive(Debug)]
pub struct TcpConnection {
    reader: BufReader<TcpStream>,
    peer: Option<SocketAddr>,
}

impl TcpConnection {
    pub fn new(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        Self {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, stream),
            peer,
        }
    }

    /// Dirección del cliente, si el socket todavía la conoce
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Timeout de lectura; `None` bloquea indefinidamente
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)
    }
}

impl ByteStream for TcpConnection {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        read_line_from(&mut self.reader)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(bytes)?;
        stream.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.reader.get_ref().shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

/// Stream en memoria.
///
/// La entrada es un buffer fijo; cada llamada a `write` se guarda por
/// separado para poder verificar la secuencia exacta de escrituras.
///
/// # Ejemplo
/// ```
/// use noggin::http::stream::{ByteStream, MemoryStream};
///
/// let mut stream = MemoryStream::new("hello\nworld\n");
/// assert_eq!(stream.read_line().unwrap(), b"hello\n");
/// stream.write(b"ok").unwrap();
/// assert_eq!(stream.writes(), &[b"ok".to_vec()]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStream {
    input: Cursor<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    read_calls: usize,
    close_calls: usize,
}

impl MemoryStream {
    pub fn new(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: Cursor::new(input.into()),
            ..Self::default()
        }
    }

    /// Cada escritura, en orden
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Todas las escrituras concatenadas
    pub fn written(&self) -> Vec<u8> {
        self.writes.concat()
    }

    /// Lo escrito, como texto (lossy)
    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    /// Número de llamadas a `read_line` y `read_into`
    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    /// Bytes de entrada que nadie ha leído todavía
    pub fn remaining(&self) -> &[u8] {
        let position = usize::try_from(self.input.position()).unwrap_or(usize::MAX);
        let data = self.input.get_ref();
        &data[position.min(data.len())..]
    }
}

impl ByteStream for MemoryStream {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        self.read_calls += 1;
        read_line_from(&mut self.input)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_calls += 1;
        self.input.read(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.close_calls += 1;
        Ok(())
    }
}
