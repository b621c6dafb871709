//! HTTP/1 server running a route manifest.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;
use waymark_router::RouteCollection;
use waymark_telemetry::{log_listening, log_request_completed};

use crate::handler::{json_response, HandlerRef, Request, RequestHandler, Response};
use crate::manifest::{Manifest, ManifestError};
use crate::middleware::{Pipeline, RouteDispatchMiddleware, RouteMatchMiddleware};

/// Reserved path answered before routing.
pub const HEALTH_PATH: &str = "/__waymark/health";

/// Shared server state.
pub struct Server {
    routes: Arc<RouteCollection<HandlerRef>>,
    pipeline: Pipeline,
}

impl Server {
    /// Build the routes and middleware stack described by `manifest`.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ManifestError> {
        let routes = Arc::new(manifest.build()?);
        let pipeline = Pipeline::new(not_found)
            .with(RouteMatchMiddleware::with_always_allowed(
                Arc::clone(&routes),
                &manifest.always_allowed,
            ))
            .with(RouteDispatchMiddleware::new(manifest.resolver()));

        Ok(Self { routes, pipeline })
    }

    pub fn routes(&self) -> &RouteCollection<HandlerRef> {
        &self.routes
    }

    /// Answer a buffered request.
    pub fn handle(&self, request: Request) -> Response {
        if request.uri().path() == HEALTH_PATH {
            return self.health(request.method());
        }
        self.pipeline.handle(request)
    }

    fn health(&self, method: &Method) -> Response {
        if method != Method::GET {
            let mut response = json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &json!({"error": "method not allowed"}),
            );
            response
                .headers_mut()
                .insert(http::header::ALLOW, http::HeaderValue::from_static("GET"));
            return response;
        }
        json_response(
            StatusCode::OK,
            &json!({
                "status": "healthy",
                "routes_count": self.routes.len(),
            }),
        )
    }

    async fn handle_incoming(
        &self,
        request: http::Request<Incoming>,
    ) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let (parts, body) = request.into_parts();
        let response = match body.collect().await {
            Ok(collected) => self.handle(Request::from_parts(parts, collected.to_bytes())),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read request body");
                json_response(
                    StatusCode::BAD_REQUEST,
                    &json!({"error": "failed to read request body"}),
                )
            }
        };

        log_request_completed!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(response.map(Full::new))
    }

    /// Accept connections until the listener fails.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            log_listening!(address = %addr);
        }

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                    continue;
                }
            };

            let server = Arc::clone(&self);
            let io = TokioIo::new(stream);

            tokio::spawn(async move {
                let service = service_fn(move |request| {
                    let server = Arc::clone(&server);
                    async move { server.handle_incoming(request).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::debug!(peer = %peer, error = %e, "connection error");
                }
            });
        }
    }

    /// Bind `addr` and serve.
    pub async fn bind(self: Arc<Self>, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }
}

fn not_found(_request: Request) -> Response {
    json_response(StatusCode::NOT_FOUND, &json!({"error": "not found"}))
}
