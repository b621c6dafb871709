use std::sync::Arc;

use http::StatusCode;
use serde_json::json;
use waymark_telemetry::log_dispatch_error;

use super::MatchedRoute;
use crate::handler::{json_response, HandlerResolver, Middleware, Request, RequestHandler, Response};

/// Runs the handler of the route recorded by the match middleware.
///
/// Requests without a matched route go straight to `next`.
#[derive(Clone)]
pub struct RouteDispatchMiddleware {
    resolver: Arc<dyn HandlerResolver>,
}

impl RouteDispatchMiddleware {
    pub fn new(resolver: impl HandlerResolver + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    pub fn from_arc(resolver: Arc<dyn HandlerResolver>) -> Self {
        Self { resolver }
    }
}

impl Middleware for RouteDispatchMiddleware {
    fn process(&self, request: Request, next: &dyn RequestHandler) -> Response {
        let Some(matched) = request.extensions().get::<MatchedRoute>() else {
            return next.handle(request);
        };

        match self.resolver.resolve(&matched.handler) {
            Ok(middleware) => middleware.process(request, next),
            Err(e) => {
                log_dispatch_error!(
                    route = %matched.name,
                    handler = %matched.handler.describe(),
                    error = %e
                );
                json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &json!({"error": "internal server error"}),
                )
            }
        }
    }
}
