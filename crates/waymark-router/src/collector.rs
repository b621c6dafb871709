//! Fluent registration of routes into a [`RouteCollection`].

use crate::collection::RouteCollection;
use crate::error::RouteError;
use crate::route::Route;

/// Registration surface shared by the collector and its groups.
///
/// Every method registers a route and returns it so tokens, defaults and a
/// host can be attached in place:
///
/// ```
/// use waymark_router::{RouteBuilder, RouteCollector};
///
/// let mut collector = RouteCollector::new();
/// collector
///     .get("blog.view", "/blog/{slug}", "view")?
///     .set_tokens([("slug", r"[\w-]+")])?;
/// assert_eq!(collector.routes().len(), 1);
/// # Ok::<(), waymark_router::RouteError>(())
/// ```
pub trait RouteBuilder<H> {
    /// Register a route for `methods`; an empty list accepts any method.
    fn add<M: IntoIterator<Item = S>, S: AsRef<str>>(
        &mut self,
        name: &str,
        pattern: &str,
        handler: H,
        methods: M,
    ) -> Result<&mut Route<H>, RouteError>;

    /// Register the routes added by `callback` under a path prefix.
    ///
    /// The prefix is prepended verbatim to every pattern in the group,
    /// nested groups included.
    fn group<F>(&mut self, prefix: &str, callback: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut RouteGroup<'_, H>) -> Result<(), RouteError>;

    fn any(&mut self, name: &str, pattern: &str, handler: H) -> Result<&mut Route<H>, RouteError> {
        self.add(name, pattern, handler, [] as [&str; 0])
    }

    fn get(&mut self, name: &str, pattern: &str, handler: H) -> Result<&mut Route<H>, RouteError> {
        self.add(name, pattern, handler, ["GET"])
    }

    fn post(&mut self, name: &str, pattern: &str, handler: H) -> Result<&mut Route<H>, RouteError> {
        self.add(name, pattern, handler, ["POST"])
    }

    fn put(&mut self, name: &str, pattern: &str, handler: H) -> Result<&mut Route<H>, RouteError> {
        self.add(name, pattern, handler, ["PUT"])
    }

    fn patch(&mut self, name: &str, pattern: &str, handler: H) -> Result<&mut Route<H>, RouteError> {
        self.add(name, pattern, handler, ["PATCH"])
    }

    fn delete(&mut self, name: &str, pattern: &str, handler: H) -> Result<&mut Route<H>, RouteError> {
        self.add(name, pattern, handler, ["DELETE"])
    }

    fn head(&mut self, name: &str, pattern: &str, handler: H) -> Result<&mut Route<H>, RouteError> {
        self.add(name, pattern, handler, ["HEAD"])
    }

    fn options(&mut self, name: &str, pattern: &str, handler: H) -> Result<&mut Route<H>, RouteError> {
        self.add(name, pattern, handler, ["OPTIONS"])
    }
}

/// Builds a route collection.
#[derive(Debug, Clone)]
pub struct RouteCollector<H> {
    routes: RouteCollection<H>,
}

impl<H> Default for RouteCollector<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RouteCollector<H> {
    pub fn new() -> Self {
        Self {
            routes: RouteCollection::new(),
        }
    }

    /// Continue registering into an existing collection.
    pub fn with_routes(routes: RouteCollection<H>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RouteCollection<H> {
        &self.routes
    }

    pub fn routes_mut(&mut self) -> &mut RouteCollection<H> {
        &mut self.routes
    }

    pub fn into_routes(self) -> RouteCollection<H> {
        self.routes
    }
}

impl<H> RouteBuilder<H> for RouteCollector<H> {
    fn add<M: IntoIterator<Item = S>, S: AsRef<str>>(
        &mut self,
        name: &str,
        pattern: &str,
        handler: H,
        methods: M,
    ) -> Result<&mut Route<H>, RouteError> {
        register(&mut self.routes, name, pattern, handler, methods)
    }

    fn group<F>(&mut self, prefix: &str, callback: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut RouteGroup<'_, H>) -> Result<(), RouteError>,
    {
        callback(&mut RouteGroup {
            routes: &mut self.routes,
            prefix: prefix.to_string(),
        })
    }
}

/// A prefix scope handed to [`RouteBuilder::group`] callbacks.
#[derive(Debug)]
pub struct RouteGroup<'a, H> {
    routes: &'a mut RouteCollection<H>,
    prefix: String,
}

impl<H> RouteGroup<'_, H> {
    /// The full prefix applied to patterns in this group.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl<H> RouteBuilder<H> for RouteGroup<'_, H> {
    fn add<M: IntoIterator<Item = S>, S: AsRef<str>>(
        &mut self,
        name: &str,
        pattern: &str,
        handler: H,
        methods: M,
    ) -> Result<&mut Route<H>, RouteError> {
        let pattern = format!("{}{}", self.prefix, pattern);
        register(self.routes, name, &pattern, handler, methods)
    }

    fn group<F>(&mut self, prefix: &str, callback: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut RouteGroup<'_, H>) -> Result<(), RouteError>,
    {
        callback(&mut RouteGroup {
            routes: &mut *self.routes,
            prefix: format!("{}{}", self.prefix, prefix),
        })
    }
}

fn register<'a, H, M, S>(
    routes: &'a mut RouteCollection<H>,
    name: &str,
    pattern: &str,
    handler: H,
    methods: M,
) -> Result<&'a mut Route<H>, RouteError>
where
    M: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let methods: Vec<String> = methods.into_iter().map(|m| m.as_ref().to_string()).collect();
    let route = Route::with_methods(name, pattern, handler, methods)?;
    routes.insert(route)
}
