//! # Manejo de una Conexión
//! src/server/connection.rs
//!
//! Procesa exactamente un request por conexión:
//!
//! 1. Parsea request line y headers
//! 2. Busca la ruta (path + método)
//! 3. Invoca el handler y convierte su resultado en respuesta
//! 4. Escribe la respuesta
//! 5. Cierra la conexión, pase lo que pase
//!
//! Si el request no se puede parsear no se envía respuesta; solo se cierra.

use tracing::{debug, error, info};

use crate::http::response::encode_json;
use crate::http::{Body, ByteStream, ConnectionError, HandlerError, Request, TransportError};
use crate::router::{HandlerOutcome, Router};

/// Texto de estado para resultados envueltos por el servidor
const OKAY_TEXT: &str = "Okay";

/// Texto de estado cuando el handler falla
const EXCEPTION_TEXT: &str = "Exception";

/// Atiende una conexión completa y la cierra al final.
pub fn handle_connection(conn: &mut dyn ByteStream, router: &Router) -> Result<(), ConnectionError> {
    let result = serve_request(conn, router);

    if let Err(e) = conn.close() {
        debug!(error = %e, "error closing connection");
    }

    result
}

fn serve_request(conn: &mut dyn ByteStream, router: &Router) -> Result<(), ConnectionError> {
    let mut request = Request::read_from(conn)?;
    info!(method = %request.method(), path = request.path(), "request");

    let path = request.path().to_string();
    let Some((route, captures)) = router.lookup(&path, request.method()) else {
        debug!(path = %path, "no route");
        let body = format!("{}: not found", path);
        send(request.connection(), 404, "Not Found", body.into(), None)?;
        return Ok(());
    };

    match route.handle(&mut request, &captures) {
        Ok(outcome) => send_outcome(request.connection(), outcome),
        Err(HandlerError::Http(err)) => send_outcome(request.connection(), HandlerOutcome::Failed(err)),
        Err(HandlerError::Transport(err)) => {
            report_failure(request.connection(), &path, &err);
            Err(ConnectionError::Transport(err))
        }
        Err(HandlerError::Failure(err)) => {
            report_failure(request.connection(), &path, &err);
            Err(ConnectionError::Handler(err))
        }
    }
}

/// Envía el 500 con la descripción del fallo. Si el fallo vino del
/// transporte esta escritura probablemente también falle.
fn report_failure<E: std::fmt::Display>(conn: &mut dyn ByteStream, path: &str, err: &E) {
    error!(path, error = %err, "handler failed");
    if let Err(send_err) = send(conn, 500, EXCEPTION_TEXT, err.to_string().into(), None) {
        debug!(error = %send_err, "could not report handler failure");
    }
}

fn send_outcome(conn: &mut dyn ByteStream, outcome: HandlerOutcome) -> Result<(), ConnectionError> {
    match outcome {
        HandlerOutcome::Json(value) => {
            let encoded = encode_json(&value).map_err(|e| ConnectionError::Handler(Box::new(e)))?;
            send(conn, 200, OKAY_TEXT, encoded.into(), Some("application/json"))?;
        }
        HandlerOutcome::Raw(bytes) => send(conn, 200, OKAY_TEXT, bytes.into(), None)?,
        HandlerOutcome::Structured(response) => response.write_to(conn)?,
        HandlerOutcome::Streamed(source) => send(conn, 200, OKAY_TEXT, Body::Stream(source), None)?,
        HandlerOutcome::Failed(err) => {
            debug!(status = err.status_code(), "handler returned http error");
            let (status_code, status_text, content) = err.into_parts();
            send(conn, status_code, &status_text, content, None)?;
        }
    }
    Ok(())
}

fn send(
    conn: &mut dyn ByteStream,
    status_code: u16,
    status_text: &str,
    content: Body,
    content_type: Option<&str>,
) -> Result<(), TransportError> {
    crate::http::writer::send_response(conn, status_code, status_text, content, content_type, &[])
}
