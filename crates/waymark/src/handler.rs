//! Handler references and their resolution into middleware.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use thiserror::Error;

/// Requests carry a fully buffered body.
pub type Request = http::Request<Bytes>;

pub type Response = http::Response<Bytes>;

/// Produces a response for a request.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: Request) -> Response;
}

impl<F> RequestHandler for F
where
    F: Fn(Request) -> Response + Send + Sync,
{
    fn handle(&self, request: Request) -> Response {
        self(request)
    }
}

/// Processes a request, optionally delegating to `next`.
pub trait Middleware: Send + Sync {
    fn process(&self, request: Request, next: &dyn RequestHandler) -> Response;
}

/// What a route points at.
///
/// The router stores this without looking inside; the dispatch middleware
/// turns it into a [`Middleware`] through a [`HandlerResolver`].
#[derive(Clone)]
pub enum HandlerRef {
    /// Looked up by name in the resolver registry.
    Name(String),
    /// A final handler; `next` is never called.
    Callable(Arc<dyn RequestHandler>),
    Instance(Arc<dyn Middleware>),
    /// The first is processed with the second as its `next`.
    Pair(Box<HandlerRef>, Box<HandlerRef>),
}

impl HandlerRef {
    pub fn name(name: impl Into<String>) -> Self {
        HandlerRef::Name(name.into())
    }

    pub fn callable(handler: impl RequestHandler + 'static) -> Self {
        HandlerRef::Callable(Arc::new(handler))
    }

    pub fn instance(middleware: impl Middleware + 'static) -> Self {
        HandlerRef::Instance(Arc::new(middleware))
    }

    pub fn pair(first: HandlerRef, second: HandlerRef) -> Self {
        HandlerRef::Pair(Box::new(first), Box::new(second))
    }

    /// Short description for logs and CLI output.
    pub fn describe(&self) -> String {
        match self {
            HandlerRef::Name(name) => name.clone(),
            HandlerRef::Callable(_) => "<callable>".to_string(),
            HandlerRef::Instance(_) => "<middleware>".to_string(),
            HandlerRef::Pair(first, second) => {
                format!("[{}, {}]", first.describe(), second.describe())
            }
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Name(name) => f.debug_tuple("Name").field(name).finish(),
            HandlerRef::Callable(_) => f.write_str("Callable(..)"),
            HandlerRef::Instance(_) => f.write_str("Instance(..)"),
            HandlerRef::Pair(first, second) => {
                f.debug_tuple("Pair").field(first).field(second).finish()
            }
        }
    }
}

impl From<&str> for HandlerRef {
    fn from(name: &str) -> Self {
        HandlerRef::Name(name.to_string())
    }
}

impl From<String> for HandlerRef {
    fn from(name: String) -> Self {
        HandlerRef::Name(name)
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no handler registered under \"{0}\"")]
    UnknownHandler(String),
}

/// Turns a [`HandlerRef`] into something that can process a request.
pub trait HandlerResolver: Send + Sync {
    fn resolve(&self, handler: &HandlerRef) -> Result<Arc<dyn Middleware>, DispatchError>;
}

/// Default resolver backed by a name registry.
#[derive(Default, Clone)]
pub struct Resolver {
    registry: HashMap<String, Arc<dyn Middleware>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, middleware: impl Middleware + 'static) {
        self.registry.insert(name.into(), Arc::new(middleware));
    }

    /// Register a final handler under `name`.
    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: impl RequestHandler + 'static,
    ) {
        self.registry
            .insert(name.into(), Arc::new(HandlerMiddleware(Arc::new(handler))));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Resolver").field("registry", &names).finish()
    }
}

impl HandlerResolver for Resolver {
    fn resolve(&self, handler: &HandlerRef) -> Result<Arc<dyn Middleware>, DispatchError> {
        match handler {
            HandlerRef::Name(name) => self
                .registry
                .get(name)
                .cloned()
                .ok_or_else(|| DispatchError::UnknownHandler(name.clone())),
            HandlerRef::Callable(handler) => Ok(Arc::new(HandlerMiddleware(Arc::clone(handler)))),
            HandlerRef::Instance(middleware) => Ok(Arc::clone(middleware)),
            HandlerRef::Pair(first, second) => Ok(Arc::new(PairMiddleware {
                first: self.resolve(first)?,
                second: self.resolve(second)?,
            })),
        }
    }
}

/// Adapts a final handler to the middleware interface.
struct HandlerMiddleware(Arc<dyn RequestHandler>);

impl Middleware for HandlerMiddleware {
    fn process(&self, request: Request, _next: &dyn RequestHandler) -> Response {
        self.0.handle(request)
    }
}

struct PairMiddleware {
    first: Arc<dyn Middleware>,
    second: Arc<dyn Middleware>,
}

impl Middleware for PairMiddleware {
    fn process(&self, request: Request, next: &dyn RequestHandler) -> Response {
        let second = Next {
            middleware: self.second.as_ref(),
            next,
        };
        self.first.process(request, &second)
    }
}

/// A middleware bound to the handler it delegates to.
pub(crate) struct Next<'a> {
    pub(crate) middleware: &'a dyn Middleware,
    pub(crate) next: &'a dyn RequestHandler,
}

impl RequestHandler for Next<'_> {
    fn handle(&self, request: Request) -> Response {
        self.middleware.process(request, self.next)
    }
}

/// Build a response with an optional content type.
pub fn response(status: StatusCode, content_type: Option<&str>, body: impl Into<Bytes>) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

pub fn json_response(status: StatusCode, body: &serde_json::Value) -> Response {
    response(status, Some("application/json"), body.to_string())
}
