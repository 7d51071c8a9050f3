//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo implementa el router que mapea (path, método) a handlers.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler → HandlerOutcome → Response
//! ```
//!
//! Cada ruta es una expresión regular anclada al inicio y al final del path,
//! más el conjunto de métodos permitidos. Las rutas se evalúan en el orden
//! en que se registraron y gana la primera que calza con el path *y* con el
//! método. Una ruta cuyo patrón calza pero cuyo método no está permitido se
//! salta (no genera 405); si ninguna otra calza, el resultado es 404.
//!
//! Los grupos de captura del patrón se entregan al handler en [`Captures`].

use std::fmt;
use std::io;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::http::{ChunkSource, HandlerError, HttpError, Method, Request, Response};
use crate::http::response::IterChunks;

/// Lo que un handler puede producir
pub enum HandlerOutcome {
    /// Se envía como `application/json` con status `200 Okay`
    Json(serde_json::Value),
    /// Bytes o texto, `200 Okay` sin content-type
    Raw(Vec<u8>),
    /// Respuesta armada por el handler, se envía tal cual
    Structured(Response),
    /// Body en streaming con `200 Okay`
    Streamed(Box<dyn ChunkSource>),
    /// Error HTTP: código, texto y contenido se envían tal cual
    Failed(HttpError),
}

impl HandlerOutcome {
    /// Serializa cualquier valor `Serialize` como respuesta JSON
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, HandlerError> {
        Ok(HandlerOutcome::Json(serde_json::to_value(value)?))
    }

    pub fn stream(source: impl ChunkSource + 'static) -> Self {
        HandlerOutcome::Streamed(Box::new(source))
    }

    /// Streaming a partir de un iterador de pedazos
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = io::Result<Vec<u8>>>,
        I::IntoIter: 'static,
    {
        Self::stream(IterChunks::new(chunks.into_iter()))
    }
}

impl fmt::Debug for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerOutcome::Json(value) => f.debug_tuple("Json").field(value).finish(),
            HandlerOutcome::Raw(bytes) => f.debug_tuple("Raw").field(&bytes.len()).finish(),
            HandlerOutcome::Structured(response) => f.debug_tuple("Structured").field(response).finish(),
            HandlerOutcome::Streamed(_) => f.write_str("Streamed(..)"),
            HandlerOutcome::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

impl From<&str> for HandlerOutcome {
    fn from(text: &str) -> Self {
        HandlerOutcome::Raw(text.as_bytes().to_vec())
    }
}

impl From<String> for HandlerOutcome {
    fn from(text: String) -> Self {
        HandlerOutcome::Raw(text.into_bytes())
    }
}

impl From<Vec<u8>> for HandlerOutcome {
    fn from(bytes: Vec<u8>) -> Self {
        HandlerOutcome::Raw(bytes)
    }
}

impl From<&[u8]> for HandlerOutcome {
    fn from(bytes: &[u8]) -> Self {
        HandlerOutcome::Raw(bytes.to_vec())
    }
}

impl From<serde_json::Value> for HandlerOutcome {
    fn from(value: serde_json::Value) -> Self {
        HandlerOutcome::Json(value)
    }
}

impl From<Response> for HandlerOutcome {
    fn from(response: Response) -> Self {
        HandlerOutcome::Structured(response)
    }
}

impl From<HttpError> for HandlerOutcome {
    fn from(err: HttpError) -> Self {
        HandlerOutcome::Failed(err)
    }
}

/// Resultado de invocar un handler
pub type HandlerResult = Result<HandlerOutcome, HandlerError>;

/// Tipo de función handler
///
/// Un handler recibe el Request y los grupos capturados por el patrón.
pub type Handler = Box<dyn Fn(&mut Request<'_>, &Captures) -> HandlerResult + Send + Sync>;

/// Grupos de captura de un patrón, en orden. Un grupo opcional que no
/// participó del match queda como `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(Vec<Option<String>>);

impl Captures {
    fn from_regex(caps: &regex::Captures<'_>) -> Self {
        Captures(
            caps.iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// Grupo `index` (0 es el primer grupo de captura, no el match completo)
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|group| group.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        self.0.iter().map(|group| group.as_deref())
    }
}

/// Errores al registrar rutas
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("route {pattern:?} has no allowed methods")]
    NoMethods { pattern: String },
}

/// Ruta registrada: patrón compilado, métodos permitidos y handler
pub struct Route {
    pattern: Regex,
    methods: Vec<Method>,
    handler: Handler,
}

impl Route {
    /// Patrón compilado (ya anclado)
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Invoca el handler
    pub fn handle(&self, request: &mut Request<'_>, captures: &Captures) -> HandlerResult {
        (self.handler)(request, captures)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Router que mapea paths a handlers
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta con su handler
    ///
    /// El patrón se ancla al inicio y al final del path: `/path2/([^/]+)`
    /// calza con `/path2/foo` pero no con `/path2/foo/bar`.
    ///
    /// # Ejemplo
    /// ```
    /// use noggin::http::{Method, Request};
    /// use noggin::router::{Captures, HandlerResult, Router};
    ///
    /// fn device(_req: &mut Request<'_>, captures: &Captures) -> HandlerResult {
    ///     Ok(serde_json::json!({"id": captures.get(0)}).into())
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register("/device/([^/]+)", &[Method::GET, Method::PUT], device).unwrap();
    ///
    /// let (_, captures) = router.lookup("/device/led", &Method::PUT).unwrap();
    /// assert_eq!(captures.get(0), Some("led"));
    /// ```
    pub fn register<F>(&mut self, pattern: &str, methods: &[Method], handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Request<'_>, &Captures) -> HandlerResult + Send + Sync + 'static,
    {
        if methods.is_empty() {
            return Err(RouteError::NoMethods {
                pattern: pattern.to_string(),
            });
        }

        let compiled = Regex::new(&anchor(pattern)).map_err(|source| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        tracing::debug!(pattern, ?methods, "route registered");
        self.routes.push(Route {
            pattern: compiled,
            methods: methods.to_vec(),
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Registra una ruta solo para GET
    pub fn route<F>(&mut self, pattern: &str, handler: F) -> Result<(), RouteError>
    where
        F: Fn(&mut Request<'_>, &Captures) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(pattern, &[Method::GET], handler)
    }

    /// Busca la primera ruta (en orden de registro) cuyo patrón calza con
    /// `path` y que permite `method`.
    pub fn lookup(&self, path: &str, method: &Method) -> Option<(&Route, Captures)> {
        self.routes.iter().find_map(|route| {
            let caps = route.pattern.captures(path)?;
            route.allows(method).then(|| (route, Captures::from_regex(&caps)))
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Ancla el patrón a todo el path
fn anchor(pattern: &str) -> String {
    format!("^(?:{})$", pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stream::MemoryStream;

    fn ok_handler(_req: &mut Request<'_>, _captures: &Captures) -> HandlerResult {
        Ok("ok".into())
    }

    fn tagged(tag: &'static str) -> impl Fn(&mut Request<'_>, &Captures) -> HandlerResult + Send + Sync {
        move |_req: &mut Request<'_>, _captures: &Captures| -> HandlerResult { Ok(tag.into()) }
    }

    /// Invoca la ruta encontrada y retorna el texto de su HandlerOutcome::Raw
    fn call(router: &Router, path: &str, method: Method) -> Option<String> {
        let (route, captures) = router.lookup(path, &method)?;
        let mut conn = MemoryStream::new(format!("{} {} HTTP/1.1\r\n\r\n", method, path));
        let mut request = Request::read_from(&mut conn).unwrap();
        match route.handle(&mut request, &captures).unwrap() {
            HandlerOutcome::Raw(bytes) => Some(String::from_utf8(bytes).unwrap()),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert!(router.is_empty());
        assert!(router.lookup("/", &Method::GET).is_none());
    }

    #[test]
    fn test_route_simple() {
        let mut router = Router::new();
        router.route("/path1", ok_handler).unwrap();

        assert_eq!(router.len(), 1);
        let (route, captures) = router.lookup("/path1", &Method::GET).unwrap();
        assert_eq!(route.methods(), &[Method::GET]);
        assert!(captures.is_empty());
    }

    #[test]
    fn test_route_params() {
        let mut router = Router::new();
        router.route("/path2/([^/]+)", ok_handler).unwrap();

        let (_, captures) = router.lookup("/path2/foo", &Method::GET).unwrap();
        assert_eq!(captures.get(0), Some("foo"));
        assert_eq!(captures.len(), 1);
    }

    #[test]
    fn test_route_is_end_anchored() {
        let mut router = Router::new();
        router.route("/path2/([^/]+)", ok_handler).unwrap();

        assert!(router.lookup("/path2/foo/bar", &Method::GET).is_none());
    }

    #[test]
    fn test_route_is_start_anchored() {
        let mut router = Router::new();
        router.route("/path", ok_handler).unwrap();

        assert!(router.lookup("/prefix/path", &Method::GET).is_none());
    }

    #[test]
    fn test_explicit_anchor_is_accepted() {
        let mut router = Router::new();
        router.route("^/x$", ok_handler).unwrap();

        assert!(router.lookup("/x", &Method::GET).is_some());
        assert!(router.lookup("/xy", &Method::GET).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let mut router = Router::new();
        router.route("/file/(.*)", tagged("first")).unwrap();
        router.route("/file/special", tagged("second")).unwrap();

        assert_eq!(call(&router, "/file/special", Method::GET).as_deref(), Some("first"));
    }

    #[test]
    fn test_method_mismatch_falls_through() {
        let mut router = Router::new();
        router.register("/file/(.*)", &[Method::GET], tagged("get")).unwrap();
        router.register("/file/(.*)", &[Method::PUT, Method::POST], tagged("put")).unwrap();

        assert_eq!(call(&router, "/file/a", Method::GET).as_deref(), Some("get"));
        assert_eq!(call(&router, "/file/a", Method::POST).as_deref(), Some("put"));
        assert!(router.lookup("/file/a", &Method::DELETE).is_none());
    }

    #[test]
    fn test_optional_groups() {
        let mut router = Router::new();
        router.route("/opt(/([a-z]+))?", ok_handler).unwrap();

        let (_, captures) = router.lookup("/opt", &Method::GET).unwrap();
        assert_eq!(captures.len(), 2);
        assert_eq!(captures.get(0), None);
        assert_eq!(captures.iter().collect::<Vec<_>>(), vec![None, None]);

        let (_, captures) = router.lookup("/opt/abc", &Method::GET).unwrap();
        assert_eq!(captures.get(1), Some("abc"));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut router = Router::new();
        let err = router.route("/broken(", ok_handler).unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }));
        assert!(router.is_empty());
    }

    #[test]
    fn test_empty_methods_rejected() {
        let mut router = Router::new();
        let err = router.register("/x", &[], ok_handler).unwrap_err();
        assert!(matches!(err, RouteError::NoMethods { .. }));
    }

    #[test]
    fn test_outcome_conversions() {
        assert!(matches!(HandlerOutcome::from("x"), HandlerOutcome::Raw(_)));
        assert!(matches!(HandlerOutcome::from(Response::new(204)), HandlerOutcome::Structured(_)));
        assert!(matches!(HandlerOutcome::from(HttpError::new(418)), HandlerOutcome::Failed(_)));

        #[derive(Serialize)]
        struct Reading {
            sensor: &'static str,
            value: u32,
        }
        let outcome = HandlerOutcome::json(&Reading { sensor: "t0", value: 21 }).unwrap();
        match outcome {
            HandlerOutcome::Json(value) => assert_eq!(value["value"], 21),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_extension_method_never_matches() {
        let mut router = Router::new();
        router.route("/(.*)", ok_handler).unwrap();

        assert!(router.lookup("/anything", &Method::Other("PROPFIND".to_string())).is_none());
    }

    #[test]
    fn test_outcome_from_chunks() {
        let outcome = HandlerOutcome::from_chunks(vec![Ok(b"ab".to_vec()), Ok(b"cd".to_vec())]);
        let HandlerOutcome::Streamed(mut source) = outcome else {
            panic!("expected a streamed outcome");
        };

        let mut conn = MemoryStream::default();
        let mut pieces = Vec::new();
        while let Some(chunk) = source.next_chunk(&mut conn).unwrap() {
            pieces.push(chunk.to_vec());
        }
        assert_eq!(pieces, vec![b"ab".to_vec(), b"cd".to_vec()]);
    }
}
