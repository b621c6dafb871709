//! Waymark route manifest tool.
//!
//! Validates YAML route manifests, matches requests and generates URLs
//! against them, and serves them over HTTP.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};

use waymark_lib::{load_manifest, HandlerRef, Server};
use waymark_router::{Parameters, RouteCollection, RouteMatch, RouteRequest};
use waymark_telemetry::{log_routes_loaded, log_shutdown, log_startup, LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "waymark", about = "Named-route HTTP router", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that a route manifest parses and compiles.
    Validate {
        /// Route manifest (YAML).
        #[arg(short, long)]
        routes: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Find the route a request would match.
    ///
    /// Exits 0 when a route matches, 1 otherwise.
    Match {
        #[arg(short, long)]
        routes: PathBuf,

        /// Request path, percent-encoded as on the wire.
        #[arg(short, long)]
        path: String,

        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request host (without port).
        #[arg(long)]
        host: Option<String>,
    },

    /// Generate the URL of a named route.
    Url {
        #[arg(short, long)]
        routes: PathBuf,

        /// Route name.
        #[arg(short, long)]
        name: String,

        /// Parameter as name=value; repeatable.
        #[arg(short = 'P', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Host to build an absolute URL for.
        #[arg(long)]
        host: Option<String>,

        #[arg(long, value_enum, default_value_t = Scheme::Auto)]
        scheme: Scheme,
    },

    /// Serve a route manifest over HTTP.
    Serve {
        #[arg(short, long)]
        routes: PathBuf,

        /// Listen address.
        #[arg(long, env = "WAYMARK_LISTEN", default_value = "0.0.0.0:8080")]
        listen: String,

        /// Log level filter (overridden by RUST_LOG).
        #[arg(long, env = "WAYMARK_LOG_LEVEL", default_value = "info")]
        log_level: String,

        /// Log format (json or pretty).
        #[arg(long, default_value = "json")]
        log_format: LogFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scheme {
    /// Protocol-relative (`//host/path`).
    Auto,
    Http,
    Https,
}

impl Scheme {
    fn secure(self) -> Option<bool> {
        match self {
            Scheme::Auto => None,
            Scheme::Http => Some(false),
            Scheme::Https => Some(true),
        }
    }
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{s}'")),
    }
}

/// Load and compile a manifest, reporting failures on stderr.
fn load_routes(path: &Path) -> Result<RouteCollection<HandlerRef>, ExitCode> {
    load_manifest(path)
        .and_then(|manifest| manifest.build())
        .map_err(|e| {
            eprintln!("error: {}: {}", path.display(), e);
            ExitCode::from(1)
        })
}

/// Run the validate command.
fn run_validate(path: &Path, format: OutputFormat) -> ExitCode {
    let result = load_manifest(path).and_then(|manifest| manifest.build());

    match format {
        OutputFormat::Json => {
            let output = match &result {
                Ok(routes) => json!({
                    "file": path.display().to_string(),
                    "valid": true,
                    "routes_count": routes.len(),
                    "routes": routes.iter().map(|route| json!({
                        "name": route.name(),
                        "pattern": route.pattern(),
                        "methods": route.methods(),
                        "host": route.host(),
                        "handler": route.handler().describe(),
                    })).collect::<Vec<_>>(),
                }),
                Err(e) => json!({
                    "file": path.display().to_string(),
                    "valid": false,
                    "error": e.to_string(),
                }),
            };
            match serde_json::to_string_pretty(&output) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("error: {e}"),
            }
        }
        OutputFormat::Text => match &result {
            Ok(routes) => {
                for route in routes {
                    let methods = if route.methods().is_empty() {
                        "ANY".to_string()
                    } else {
                        route.methods().join(",")
                    };
                    eprintln!("  {:<24} {:<12} {}", route.name(), methods, route.pattern());
                }
                eprintln!("✓ {} is valid ({} route(s))", path.display(), routes.len());
            }
            Err(e) => eprintln!("✗ {}: {}", path.display(), e),
        },
    }

    if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Run the match command.
fn run_match(path: &Path, request_path: &str, method: &str, host: Option<&str>) -> ExitCode {
    let routes = match load_routes(path) {
        Ok(routes) => routes,
        Err(code) => return code,
    };

    let method = method.to_ascii_uppercase();
    let request = RouteRequest::new(&method, request_path).with_host(host.unwrap_or(""));

    let params_json = |params: &waymark_router::Params| -> Value {
        Value::Object(
            params
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect::<Map<_, _>>(),
        )
    };

    let (output, found) = match routes.lookup(&request) {
        RouteMatch::Found(matched) => (
            json!({
                "result": "found",
                "route": matched.route.name(),
                "pattern": matched.route.pattern(),
                "handler": matched.route.handler().describe(),
                "params": params_json(&matched.params),
            }),
            true,
        ),
        RouteMatch::MethodNotAllowed { matched, allowed } => (
            json!({
                "result": "method_not_allowed",
                "route": matched.route.name(),
                "allowed": allowed,
            }),
            false,
        ),
        RouteMatch::NotFound => (json!({"result": "not_found"}), false),
    };

    println!("{output}");
    if found {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Run the url command.
fn run_url(
    path: &Path,
    name: &str,
    params: Vec<(String, String)>,
    host: Option<&str>,
    scheme: Scheme,
) -> ExitCode {
    let routes = match load_routes(path) {
        Ok(routes) => routes,
        Err(code) => return code,
    };

    let parameters: Parameters = params.into_iter().collect();
    match routes.url(name, &parameters, host, scheme.secure()) {
        Ok(url) => {
            println!("{url}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Run the serve command.
async fn run_serve(path: &Path, listen: &str, log_level: &str, log_format: LogFormat) -> ExitCode {
    let telemetry = TelemetryConfig::new()
        .with_log_level(log_level)
        .with_log_format(log_format);
    let telemetry = match waymark_telemetry::init(telemetry) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    log_startup!(
        service = %telemetry.service_name,
        version = env!("CARGO_PKG_VERSION"),
        routes = %path.display()
    );

    let manifest = match load_manifest(path) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::error!(error = %e, "failed to load route manifest");
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    let server = match Server::from_manifest(&manifest) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            tracing::error!(error = %e, "failed to build routes");
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    log_routes_loaded!(routes_count = server.routes().len());

    let addr: SocketAddr = match listen.parse() {
        Ok(addr) => addr,
        Err(_) => {
            eprintln!("error: invalid listen address: {listen}");
            return ExitCode::from(1);
        }
    };

    tokio::select! {
        result = server.bind(addr) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: failed to bind to {addr}: {e}");
                ExitCode::from(1)
            }
        },
        () = shutdown_signal() => {
            log_shutdown!(reason = "ctrl_c");
            ExitCode::SUCCESS
        }
    }
}

/// Resolve on Ctrl+C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { routes, format } => run_validate(&routes, format),
        Commands::Match {
            routes,
            path,
            method,
            host,
        } => run_match(&routes, &path, &method, host.as_deref()),
        Commands::Url {
            routes,
            name,
            params,
            host,
            scheme,
        } => run_url(&routes, &name, params, host.as_deref(), scheme),
        Commands::Serve {
            routes,
            listen,
            log_level,
            log_format,
        } => run_serve(&routes, &listen, &log_level, log_format).await,
    }
}
