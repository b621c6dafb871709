//! The request view the router matches against.

use std::borrow::Cow;

/// Method, path and host of an incoming request.
///
/// The path is the raw (still percent-encoded) request path; routes decode it
/// before matching. An empty host means "unknown" and never satisfies a route
/// that declares a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequest<'a> {
    method: &'a str,
    path: &'a str,
    host: &'a str,
}

impl<'a> RouteRequest<'a> {
    /// Create a request view without a host.
    pub fn new(method: &'a str, path: &'a str) -> Self {
        Self {
            method,
            path,
            host: "",
        }
    }

    pub fn with_host(mut self, host: &'a str) -> Self {
        self.host = host;
        self
    }

    /// Borrow the method, path and host of an `http::Request`.
    ///
    /// The host comes from the URI authority when present (absolute-form
    /// requests, HTTP/2) and from the `Host` header otherwise. Any port is
    /// stripped.
    pub fn from_http<B>(request: &'a http::Request<B>) -> Self {
        let host = request
            .uri()
            .host()
            .or_else(|| {
                request
                    .headers()
                    .get(http::header::HOST)
                    .and_then(|value| value.to_str().ok())
            })
            .map(strip_port)
            .unwrap_or("");

        Self {
            method: request.method().as_str(),
            path: request.uri().path(),
            host,
        }
    }

    pub fn method(&self) -> &'a str {
        self.method
    }

    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn host(&self) -> &'a str {
        self.host
    }

    /// The path with percent-escapes decoded.
    ///
    /// `+` is kept as-is; invalid UTF-8 is replaced lossily.
    pub fn decoded_path(&self) -> Cow<'a, str> {
        decode_path(self.path)
    }
}

/// Percent-decode a request path.
pub fn decode_path(path: &str) -> Cow<'_, str> {
    if !path.contains('%') {
        return Cow::Borrowed(path);
    }
    let bytes = urlencoding::decode_binary(path.as_bytes());
    Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: keep the brackets, drop what follows them.
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}
