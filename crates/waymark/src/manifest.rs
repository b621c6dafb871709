//! YAML route manifests.
//!
//! A manifest declares named mock handlers and a route table, optionally
//! nested in prefix groups:
//!
//! ```yaml
//! always_allowed: [HEAD]
//! handlers:
//!   hello: { status: 200, body: "hello" }
//! routes:
//!   - name: home
//!     pattern: /
//!     methods: [GET]
//!     handler: hello
//! groups:
//!   - prefix: /api
//!     routes:
//!       - name: api.user
//!         pattern: /users/{id}
//!         tokens: { id: '\d+' }
//! ```
//!
//! Top-level routes are registered before groups.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use waymark_router::{RouteBuilder, RouteCollection, RouteCollector, RouteError};

use crate::handler::{HandlerRef, Resolver};
use crate::middleware::DEFAULT_ALWAYS_ALLOWED;
use crate::mock::{EchoHandler, MockHandler, ECHO_HANDLER};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("route \"{route}\" uses unknown handler \"{handler}\"")]
    UnknownHandler { route: String, handler: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Methods the match middleware never rejects.
    #[serde(default = "default_always_allowed")]
    pub always_allowed: Vec<String>,

    #[serde(default)]
    pub handlers: BTreeMap<String, MockHandler>,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub name: String,

    pub pattern: String,

    /// Empty accepts any method.
    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default = "default_handler")]
    pub handler: String,

    #[serde(default)]
    pub tokens: BTreeMap<String, Value>,

    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,

    pub host: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub prefix: String,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

fn default_always_allowed() -> Vec<String> {
    DEFAULT_ALWAYS_ALLOWED.iter().map(|m| m.to_string()).collect()
}

fn default_handler() -> String {
    ECHO_HANDLER.to_string()
}

/// Read and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Manifest::parse(&content)
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Compile the route table.
    ///
    /// Every route goes through the collector, so pattern, token, default
    /// and method validation all apply. Handler names must be `echo` or a
    /// declared handler.
    pub fn build(&self) -> Result<RouteCollection<HandlerRef>, ManifestError> {
        self.check_handlers()?;

        let mut collector = RouteCollector::new();
        for route in &self.routes {
            route.register(&mut collector)?;
        }
        for group in &self.groups {
            group.register(&mut collector)?;
        }
        Ok(collector.into_routes())
    }

    /// Resolver with the built-in `echo` handler and every declared one.
    pub fn resolver(&self) -> Resolver {
        let mut resolver = Resolver::new();
        resolver.register_handler(ECHO_HANDLER, EchoHandler);
        for (name, handler) in &self.handlers {
            resolver.register_handler(name.clone(), handler.clone());
        }
        resolver
    }

    /// Every route declaration, with its group prefix applied.
    pub fn routes(&self) -> Vec<(String, &RouteConfig)> {
        let mut out: Vec<(String, &RouteConfig)> =
            self.routes.iter().map(|r| (r.pattern.clone(), r)).collect();
        for group in &self.groups {
            group.collect("", &mut out);
        }
        out
    }

    fn check_handlers(&self) -> Result<(), ManifestError> {
        for (_, route) in self.routes() {
            if route.handler != ECHO_HANDLER && !self.handlers.contains_key(&route.handler) {
                return Err(ManifestError::UnknownHandler {
                    route: route.name.clone(),
                    handler: route.handler.clone(),
                });
            }
        }
        Ok(())
    }
}

impl RouteConfig {
    fn register<B: RouteBuilder<HandlerRef>>(&self, builder: &mut B) -> Result<(), RouteError> {
        let route = builder.add(
            &self.name,
            &self.pattern,
            HandlerRef::name(self.handler.as_str()),
            &self.methods,
        )?;
        route.set_tokens(self.tokens.clone())?;
        route.set_defaults(self.defaults.clone())?;
        if let Some(host) = &self.host {
            route.set_host(host)?;
        }
        Ok(())
    }
}

impl GroupConfig {
    fn register<B: RouteBuilder<HandlerRef>>(&self, builder: &mut B) -> Result<(), RouteError> {
        builder.group(&self.prefix, |group| {
            for route in &self.routes {
                route.register(group)?;
            }
            for nested in &self.groups {
                nested.register(group)?;
            }
            Ok(())
        })
    }

    fn collect<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a RouteConfig)>) {
        let prefix = format!("{prefix}{}", self.prefix);
        for route in &self.routes {
            out.push((format!("{prefix}{}", route.pattern), route));
        }
        for nested in &self.groups {
            nested.collect(&prefix, out);
        }
    }
}
