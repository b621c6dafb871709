//! Waymark HTTP layer.
//!
//! Puts the `waymark-router` core behind `http` request/response types:
//! handler references and their resolution, the route match and dispatch
//! middlewares, YAML route manifests, and the hyper server used by the
//! `waymark` binary.

pub mod handler;
pub mod manifest;
pub mod middleware;
pub mod mock;
pub mod server;

pub use handler::{
    DispatchError, HandlerRef, HandlerResolver, Middleware, Request, RequestHandler, Resolver,
    Response,
};
pub use manifest::{load_manifest, Manifest, ManifestError};
pub use middleware::{MatchedRoute, Pipeline, RouteDispatchMiddleware, RouteMatchMiddleware, RouteParams};
pub use server::Server;
