//! Request pipeline: route matching, handler dispatch and chaining.
//!
//! A typical stack is [`RouteMatchMiddleware`] then
//! [`RouteDispatchMiddleware`] in front of a not-found handler. The match
//! middleware records the route it found as request extensions; the dispatch
//! middleware reads them back and runs the route handler.

mod dispatch;
mod matching;

pub use dispatch::RouteDispatchMiddleware;
pub use matching::{RouteMatchMiddleware, DEFAULT_ALWAYS_ALLOWED};

use std::sync::Arc;

use waymark_router::Params;

use crate::handler::{HandlerRef, Middleware, Next, Request, RequestHandler, Response};

/// The route a request matched, stored as a request extension.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    pub name: String,
    pub pattern: String,
    pub handler: HandlerRef,
    pub params: Params,
}

/// Matched route parameters, stored as a request extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(pub Params);

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter()
    }
}

/// Middlewares run in order in front of a final handler.
#[derive(Clone)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
    fallback: Arc<dyn RequestHandler>,
}

impl Pipeline {
    /// Start a pipeline that ends in `fallback`.
    pub fn new(fallback: impl RequestHandler + 'static) -> Self {
        Self {
            middlewares: Vec::new(),
            fallback: Arc::new(fallback),
        }
    }

    /// Append a middleware; it runs after those already added.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl RequestHandler for Pipeline {
    fn handle(&self, request: Request) -> Response {
        Chain {
            middlewares: &self.middlewares,
            fallback: self.fallback.as_ref(),
        }
        .handle(request)
    }
}

struct Chain<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    fallback: &'a dyn RequestHandler,
}

impl RequestHandler for Chain<'_> {
    fn handle(&self, request: Request) -> Response {
        match self.middlewares.split_first() {
            Some((first, rest)) => {
                let rest = Chain {
                    middlewares: rest,
                    fallback: self.fallback,
                };
                Next {
                    middleware: first.as_ref(),
                    next: &rest,
                }
                .handle(request)
            }
            None => self.fallback.handle(request),
        }
    }
}
