//! Named-route HTTP router.
//!
//! Compiles `{name}` and `{[optional/chain]}` path patterns into anchored
//! regexes, matches requests by host, path and method, and generates paths
//! and URLs back from route names. Handlers are an opaque type parameter.

pub mod collection;
pub mod collector;
pub mod error;
pub mod params;
pub mod pattern;
pub mod request;
pub mod route;

pub use collection::{MatchedRoute, RouteCollection, RouteMatch};
pub use collector::{RouteBuilder, RouteCollector, RouteGroup};
pub use error::{InvalidParameter, RouteError};
pub use params::{Parameters, Params};
pub use request::RouteRequest;
pub use route::Route;
