//! Built-in handlers used by route manifests.

use http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::handler::{json_response, response, Request, RequestHandler, Response};
use crate::middleware::MatchedRoute;

/// Name under which [`EchoHandler`] is registered.
pub const ECHO_HANDLER: &str = "echo";

/// Fixed response configured in a manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockHandler {
    #[serde(default = "default_status")]
    pub status: u16,

    /// A string is sent as-is; anything else is serialized as JSON.
    #[serde(default)]
    pub body: Value,

    pub content_type: Option<String>,
}

fn default_status() -> u16 {
    200
}

impl MockHandler {
    fn content_type(&self) -> &str {
        match (&self.content_type, &self.body) {
            (Some(content_type), _) => content_type,
            (None, Value::String(_)) => "text/plain; charset=utf-8",
            (None, _) => "application/json",
        }
    }

    fn body(&self) -> String {
        match &self.body {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl RequestHandler for MockHandler {
    fn handle(&self, _request: Request) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        response(status, Some(self.content_type()), self.body())
    }
}

/// Describes the matched route as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl RequestHandler for EchoHandler {
    fn handle(&self, request: Request) -> Response {
        let Some(matched) = request.extensions().get::<MatchedRoute>() else {
            return json_response(StatusCode::NOT_FOUND, &json!({"error": "not found"}));
        };

        let params: Map<String, Value> = matched
            .params
            .iter()
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect();

        json_response(
            StatusCode::OK,
            &json!({
                "route": matched.name,
                "pattern": matched.pattern,
                "method": request.method().as_str(),
                "path": request.uri().path(),
                "params": params,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerRef;
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use waymark_router::Params;

    fn mock(yaml: &str) -> MockHandler {
        serde_yaml::from_str(yaml).expect("valid mock handler")
    }

    #[test]
    fn test_mock_defaults() {
        let handler = mock("{}");
        let response = handler.handle(Request::new(Bytes::new()));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_mock_string_body_is_text() {
        let handler = mock("status: 201\nbody: created");
        let response = handler.handle(Request::new(Bytes::new()));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body(), "created");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn test_mock_structured_body_is_json() {
        let handler = mock("body: {status: ok}\ncontent_type: application/vnd.api+json");
        let response = handler.handle(Request::new(Bytes::new()));
        assert_eq!(response.body(), r#"{"status":"ok"}"#);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/vnd.api+json");
    }

    #[test]
    fn test_mock_rejects_unknown_fields() {
        assert!(serde_yaml::from_str::<MockHandler>("stauts: 200").is_err());
    }

    #[test]
    fn test_mock_invalid_status_falls_back_to_ok() {
        let handler = mock("status: 1000");
        let response = handler.handle(Request::new(Bytes::new()));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_echo_describes_match() {
        let mut request = http::Request::builder()
            .method("PUT")
            .uri("/users/42")
            .body(Bytes::new())
            .expect("valid request");
        request.extensions_mut().insert(MatchedRoute {
            name: "users.update".to_string(),
            pattern: "/users/{id}".to_string(),
            handler: HandlerRef::from(ECHO_HANDLER),
            params: [("id", "42")].into_iter().collect::<Params>(),
        });

        let response = EchoHandler.handle(request);
        let body: Value = serde_json::from_slice(response.body()).expect("json body");
        assert_eq!(
            body,
            json!({
                "route": "users.update",
                "pattern": "/users/{id}",
                "method": "PUT",
                "path": "/users/42",
                "params": {"id": "42"},
            })
        );
    }

    #[test]
    fn test_echo_without_match_is_404() {
        let response = EchoHandler.handle(Request::new(Bytes::new()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
