//! # Noggin - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor: lee la configuración, instala el logging,
//! registra las rutas de demostración y bloquea atendiendo conexiones.

use noggin::config::Config;
use noggin::http::{HttpError, Method, Request, Response};
use noggin::logging::init_logging;
use noggin::router::{Captures, HandlerOutcome, HandlerResult, Router, RouteError};
use noggin::server::Server;
use serde_json::json;

const HELP_PAGE: &str = "<html><body>\
<h1>noggin</h1>\
<ul>\
<li><code>GET /json</code>: objeto JSON</li>\
<li><code>GET /error</code>: error 418</li>\
<li><code>PUT /echo1</code>: eco del body (en memoria)</li>\
<li><code>PUT /echo2</code>: eco del body (streaming)</li>\
<li><code>GET /device/&lt;id&gt;/&lt;attr&gt;</code>: captura de parámetros</li>\
</ul>\
</body></html>";

fn index(_req: &mut Request<'_>, _captures: &Captures) -> HandlerResult {
    Ok("This is a test".into())
}

fn help(_req: &mut Request<'_>, _captures: &Captures) -> HandlerResult {
    Ok(Response::new(200)
        .with_content_type("text/html")
        .with_body(HELP_PAGE)
        .into())
}

fn json_demo(_req: &mut Request<'_>, _captures: &Captures) -> HandlerResult {
    Ok(json!({"name": "noggin", "version": env!("CARGO_PKG_VERSION"), "ok": true}).into())
}

fn error_demo(_req: &mut Request<'_>, _captures: &Captures) -> HandlerResult {
    Err(HttpError::new(418).with_content("I'm a teapot").into())
}

/// Lee el body completo y lo devuelve tal cual
fn echo_buffered(req: &mut Request<'_>, _captures: &Captures) -> HandlerResult {
    Ok(req.content()?.to_vec().into())
}

/// Devuelve el body mientras lo lee, sin guardarlo en memoria
fn echo_streamed(req: &mut Request<'_>, _captures: &Captures) -> HandlerResult {
    Ok(HandlerOutcome::stream(req.take_body()))
}

fn device(_req: &mut Request<'_>, captures: &Captures) -> HandlerResult {
    HandlerOutcome::json(&json!({
        "device": captures.get(0),
        "attribute": captures.get(1),
    }))
}

fn build_router() -> Result<Router, RouteError> {
    let mut router = Router::new();
    router.route("/", index)?;
    router.route("/help", help)?;
    router.route("/json", json_demo)?;
    router.route("/error", error_demo)?;
    router.register("/echo1", &[Method::PUT, Method::POST], echo_buffered)?;
    router.register("/echo2", &[Method::PUT, Method::POST], echo_streamed)?;
    router.route("/device/([^/]+)/([^/]+)", device)?;
    Ok(router)
}

fn main() {
    let config = Config::new();

    if let Err(e) = init_logging(&config.log_filter) {
        eprintln!("Error configurando logs: {}", e);
        std::process::exit(1);
    }

    config.log_summary();

    let router = match build_router() {
        Ok(router) => router,
        Err(e) => {
            tracing::error!(error = %e, "invalid route table");
            std::process::exit(1);
        }
    };

    let mut server = Server::new(config, router);

    // Bloquea el thread hasta que el servidor termine
    if let Err(e) = server.run() {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}
