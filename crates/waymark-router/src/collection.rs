//! Ordered, name-keyed route registry.

use std::collections::HashMap;

use crate::error::RouteError;
use crate::params::{Parameters, Params};
use crate::request::RouteRequest;
use crate::route::Route;

/// A route that matched a request, with the parameters it captured.
#[derive(Debug)]
pub struct MatchedRoute<'a, H> {
    pub route: &'a Route<H>,
    pub params: Params,
}

/// The result of a route lookup.
#[derive(Debug)]
pub enum RouteMatch<'a, H> {
    /// Matched a host, path and method.
    Found(MatchedRoute<'a, H>),
    /// A route matched the host and path but not the method.
    MethodNotAllowed {
        matched: MatchedRoute<'a, H>,
        allowed: Vec<String>,
    },
    /// No route matched the host and path.
    NotFound,
}

impl<H> RouteMatch<'_, H> {
    pub fn is_found(&self) -> bool {
        matches!(self, RouteMatch::Found(_))
    }
}

/// Routes kept in registration order, which is also the match order.
///
/// Names are unique: registering a name twice is an error rather than an
/// overwrite.
#[derive(Debug, Clone)]
pub struct RouteCollection<H> {
    routes: Vec<Route<H>>,
    index: HashMap<String, usize>,
}

impl<H> Default for RouteCollection<H> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<H> RouteCollection<H> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route after the existing ones.
    pub fn set(&mut self, route: Route<H>) -> Result<(), RouteError> {
        self.insert(route).map(|_| ())
    }

    pub(crate) fn insert(&mut self, route: Route<H>) -> Result<&mut Route<H>, RouteError> {
        if self.index.contains_key(route.name()) {
            return Err(RouteError::RouteAlreadyExists(route.name().to_string()));
        }
        let position = self.routes.len();
        self.index.insert(route.name().to_string(), position);
        self.routes.push(route);
        Ok(&mut self.routes[position])
    }

    pub fn get(&self, name: &str) -> Result<&Route<H>, RouteError> {
        self.index
            .get(name)
            .map(|&position| &self.routes[position])
            .ok_or_else(|| RouteError::RouteNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Route<H>, RouteError> {
        match self.index.get(name) {
            Some(&position) => Ok(&mut self.routes[position]),
            None => Err(RouteError::RouteNotFound(name.to_string())),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Remove a route, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Result<Route<H>, RouteError> {
        let position = self
            .index
            .remove(name)
            .ok_or_else(|| RouteError::RouteNotFound(name.to_string()))?;
        let removed = self.routes.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.routes.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route<H>> {
        self.routes.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(Route::name)
    }

    /// Find the route for a request.
    ///
    /// Routes are tried in registration order. The first route whose host,
    /// path and method all match wins. When `check_allowed_methods` is
    /// false and no route allows the method, the first route that matched
    /// host and path is returned instead.
    pub fn match_request(
        &self,
        request: &RouteRequest<'_>,
        check_allowed_methods: bool,
    ) -> Option<MatchedRoute<'_, H>> {
        match self.lookup(request) {
            RouteMatch::Found(matched) => Some(matched),
            RouteMatch::MethodNotAllowed { matched, .. } if !check_allowed_methods => Some(matched),
            RouteMatch::MethodNotAllowed { .. } | RouteMatch::NotFound => None,
        }
    }

    /// Look up a request, distinguishing "not found" from "wrong method".
    pub fn lookup(&self, request: &RouteRequest<'_>) -> RouteMatch<'_, H> {
        let path = request.decoded_path();
        let mut method_mismatch: Option<MatchedRoute<'_, H>> = None;

        for route in &self.routes {
            let Some(params) = route.match_decoded(request.host(), &path) else {
                continue;
            };

            if route.is_allowed_method(request.method()) {
                tracing::debug!(
                    route = route.name(),
                    method = request.method(),
                    path = %path,
                    "route matched"
                );
                return RouteMatch::Found(MatchedRoute { route, params });
            }

            tracing::trace!(
                route = route.name(),
                method = request.method(),
                "route matched path but not method"
            );
            if method_mismatch.is_none() {
                method_mismatch = Some(MatchedRoute { route, params });
            }
        }

        match method_mismatch {
            Some(matched) => {
                let allowed = matched.route.methods().to_vec();
                RouteMatch::MethodNotAllowed { matched, allowed }
            }
            None => {
                tracing::debug!(method = request.method(), path = %path, "no route matched");
                RouteMatch::NotFound
            }
        }
    }

    /// Generate the path of the named route.
    pub fn path(&self, name: &str, parameters: &Parameters) -> Result<String, RouteError> {
        self.get(name)?.path(parameters)
    }

    /// Generate the URL of the named route.
    ///
    /// See [`Route::url`] for how `host` and `secure` are applied.
    pub fn url(
        &self,
        name: &str,
        parameters: &Parameters,
        host: Option<&str>,
        secure: Option<bool>,
    ) -> Result<String, RouteError> {
        self.get(name)?.url(parameters, host, secure)
    }
}

impl<'a, H> IntoIterator for &'a RouteCollection<H> {
    type Item = &'a Route<H>;
    type IntoIter = std::slice::Iter<'a, Route<H>>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}
