use std::sync::Arc;

use http::header::{HeaderValue, ALLOW};
use http::StatusCode;
use waymark_router::{RouteCollection, RouteRequest};
use waymark_telemetry::log_method_not_allowed;

use super::{MatchedRoute, RouteParams};
use crate::handler::{response, HandlerRef, Middleware, Request, RequestHandler, Response};

/// Methods accepted on any matched route unless configured otherwise.
pub const DEFAULT_ALWAYS_ALLOWED: &[&str] = &["HEAD"];

/// Finds the route for a request and records it for later middleware.
///
/// A request whose method the matched route does not allow is answered with
/// `405 Method Not Allowed`, unless the method is always allowed.
/// Requests that match no route pass through untouched.
#[derive(Debug, Clone)]
pub struct RouteMatchMiddleware {
    routes: Arc<RouteCollection<HandlerRef>>,
    always_allowed: Vec<String>,
}

impl RouteMatchMiddleware {
    pub fn new(routes: Arc<RouteCollection<HandlerRef>>) -> Self {
        Self::with_always_allowed(routes, DEFAULT_ALWAYS_ALLOWED)
    }

    /// Use a custom always-allowed list.
    ///
    /// Entries are upper-cased; empty strings and invalid method names are
    /// dropped.
    pub fn with_always_allowed<I, S>(routes: Arc<RouteCollection<HandlerRef>>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let always_allowed = methods
            .into_iter()
            .filter_map(|method| {
                let method = method.as_ref().trim();
                if method.is_empty() || http::Method::from_bytes(method.as_bytes()).is_err() {
                    return None;
                }
                Some(method.to_ascii_uppercase())
            })
            .collect();

        Self {
            routes,
            always_allowed,
        }
    }

    pub fn always_allowed(&self) -> &[String] {
        &self.always_allowed
    }

    fn is_always_allowed(&self, method: &str) -> bool {
        self.always_allowed.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    /// `Allow` value: route methods then always-allowed ones, without repeats.
    fn allow_header(&self, route_methods: &[String]) -> String {
        let mut allowed: Vec<&str> = Vec::new();
        for method in route_methods.iter().chain(&self.always_allowed) {
            if !method.is_empty() && !allowed.contains(&method.as_str()) {
                allowed.push(method);
            }
        }
        allowed.join(", ")
    }
}

impl Middleware for RouteMatchMiddleware {
    fn process(&self, mut request: Request, next: &dyn RequestHandler) -> Response {
        let Some(matched) = self
            .routes
            .match_request(&RouteRequest::from_http(&request), false)
        else {
            return next.handle(request);
        };

        let method = request.method().as_str();
        if !self.is_always_allowed(method) && !matched.route.is_allowed_method(method) {
            let allow = self.allow_header(matched.route.methods());
            log_method_not_allowed!(
                route = matched.route.name(),
                method = method,
                path = request.uri().path(),
                allow = %allow
            );

            let mut response = response(StatusCode::METHOD_NOT_ALLOWED, None, "");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
            return response;
        }

        tracing::debug!(
            route = matched.route.name(),
            params = matched.params.len(),
            "route matched"
        );

        request
            .extensions_mut()
            .insert(RouteParams(matched.params.clone()));
        request.extensions_mut().insert(MatchedRoute {
            name: matched.route.name().to_string(),
            pattern: matched.route.pattern().to_string(),
            handler: matched.route.handler().clone(),
            params: matched.params,
        });

        next.handle(request)
    }
}
