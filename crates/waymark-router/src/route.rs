//! A single named route.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use crate::error::{InvalidParameter, RouteError};
use crate::params::{scalar_to_string, value_kind, Parameters, Params};
use crate::pattern::CompiledPattern;
use crate::request::{decode_path, RouteRequest};

/// Maps a path pattern, an optional host and a method set to a handler.
///
/// `H` is opaque to the router: it is stored and handed back, never
/// inspected. Matching does not touch the route, so a built route can be
/// shared across threads and matched concurrently.
#[derive(Debug, Clone)]
pub struct Route<H> {
    name: String,
    pattern: String,
    handler: H,
    methods: Vec<String>,
    tokens: BTreeMap<String, Option<String>>,
    defaults: BTreeMap<String, String>,
    host: Option<String>,
    compiled: CompiledPattern,
    host_matcher: Option<Regex>,
}

impl<H> Route<H> {
    /// Create a route that accepts any request method.
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, RouteError> {
        Self::with_methods(name, pattern, handler, Vec::<Value>::new())
    }

    /// Create a route restricted to `methods` (case-insensitive).
    ///
    /// Each method must be a string holding a valid HTTP method token.
    pub fn with_methods<M, V>(
        name: impl Into<String>,
        pattern: impl Into<String>,
        handler: H,
        methods: M,
    ) -> Result<Self, RouteError>
    where
        M: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let name = name.into();
        let pattern = pattern.into();

        let methods = methods
            .into_iter()
            .map(|method| normalize_method(method.into()))
            .collect::<Result<Vec<_>, _>>()?;

        let tokens = BTreeMap::new();
        let compiled = CompiledPattern::compile(&pattern, &tokens).map_err(|source| {
            RouteError::InvalidPattern {
                route: name.clone(),
                source,
            }
        })?;

        Ok(Self {
            name,
            pattern,
            handler,
            methods,
            tokens,
            defaults: BTreeMap::new(),
            host: None,
            compiled,
            host_matcher: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Upper-cased allowed methods; empty means every method.
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn tokens(&self) -> &BTreeMap<String, Option<String>> {
        &self.tokens
    }

    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The regex the path is matched with.
    pub fn path_regex(&self) -> &str {
        self.compiled.as_regex()
    }

    /// Merge parameter tokens into the route.
    ///
    /// A token is a regex fragment the parameter must match. `null` resets a
    /// parameter to the default token. Anything other than `null` or a
    /// non-empty string is rejected and leaves the route unchanged.
    pub fn set_tokens<I, K, V>(&mut self, tokens: I) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut merged = self.tokens.clone();
        for (name, token) in tokens {
            let token = match token.into() {
                Value::Null => None,
                Value::String(s) if !s.is_empty() => Some(s),
                Value::String(_) => {
                    return Err(InvalidParameter::Tokens("empty string".to_string()).into());
                }
                other => return Err(InvalidParameter::Tokens(value_kind(&other).to_string()).into()),
            };
            merged.insert(name.into(), token);
        }

        self.compiled =
            CompiledPattern::compile(&self.pattern, &merged).map_err(|source| {
                RouteError::InvalidPattern {
                    route: self.name.clone(),
                    source,
                }
            })?;
        self.tokens = merged;
        Ok(self)
    }

    /// Merge default parameter values into the route.
    ///
    /// Defaults must be scalars; they are stored as strings.
    pub fn set_defaults<I, K, V>(&mut self, defaults: I) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut staged = Vec::new();
        for (name, default) in defaults {
            let default = default.into();
            let value = scalar_to_string(&default)
                .ok_or_else(|| InvalidParameter::Defaults(value_kind(&default).to_string()))?;
            staged.push((name.into(), value));
        }
        self.defaults.extend(staged);
        Ok(self)
    }

    /// Restrict the route to a hostname or host regex.
    ///
    /// Leading and trailing `/` are trimmed; an empty host removes the
    /// restriction. Dots always match a literal dot.
    pub fn set_host(&mut self, host: &str) -> Result<&mut Self, RouteError> {
        let host = host.trim_matches('/');
        if host.is_empty() {
            self.host = None;
            self.host_matcher = None;
            return Ok(self);
        }

        let matcher = Regex::new(&format!("(?i)^(?:{})$", host.replace('.', r"\."))).map_err(
            |source| RouteError::InvalidPattern {
                route: self.name.clone(),
                source,
            },
        )?;
        self.host = Some(host.to_string());
        self.host_matcher = Some(matcher);
        Ok(self)
    }

    /// Match the request host and path.
    ///
    /// Returns the captured parameters on success. Optional parameters that
    /// did not take part in the match are left out.
    pub fn matches(&self, request: &RouteRequest<'_>) -> Option<Params> {
        self.match_decoded(request.host(), &decode_path(request.path()))
    }

    pub(crate) fn match_decoded(&self, host: &str, path: &str) -> Option<Params> {
        if !self.is_matched_host(host) {
            return None;
        }
        self.compiled.captures(path)
    }

    fn is_matched_host(&self, host: &str) -> bool {
        match &self.host_matcher {
            Some(matcher) => matcher.is_match(host),
            None => true,
        }
    }

    /// Whether `method` (case-insensitive) may be used with this route.
    pub fn is_allowed_method(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    /// Generate the route path from `parameters` and the route defaults.
    pub fn path(&self, parameters: &Parameters) -> Result<String, RouteError> {
        Ok(self.compiled.generate(parameters, &self.defaults)?)
    }

    /// Generate an absolute or protocol-relative URL.
    ///
    /// `host` overrides the route host and must satisfy it when the route
    /// has one. Without an override the stored route host is used as is. The
    /// bare path is returned only when neither is set. `secure` selects
    /// `https` (`Some(true)`), `http` (`Some(false)`) or a protocol-relative
    /// `//` URL (`None`).
    pub fn url(
        &self,
        parameters: &Parameters,
        host: Option<&str>,
        secure: Option<bool>,
    ) -> Result<String, RouteError> {
        let path = self.path(parameters)?;

        let requested = host.map(|h| h.trim_matches('/')).filter(|h| !h.is_empty());
        let host = match requested {
            Some(requested) => {
                if !self.is_matched_host(requested) {
                    return Err(InvalidParameter::NotMatched {
                        name: "host".to_string(),
                        value: requested.to_string(),
                        pattern: self.host.clone().unwrap_or_default(),
                    }
                    .into());
                }
                Some(requested)
            }
            None => self.host.as_deref(),
        };

        let Some(host) = host else {
            return Ok(path);
        };
        let path = if path == "/" { "" } else { path.as_str() };

        Ok(match secure {
            None => format!("//{host}{path}"),
            Some(true) => format!("https://{host}{path}"),
            Some(false) => format!("http://{host}{path}"),
        })
    }
}

impl<H> Route<H> {
    /// Builder-style [`set_tokens`](Self::set_tokens).
    pub fn tokens_from<I, K, V>(mut self, tokens: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.set_tokens(tokens)?;
        Ok(self)
    }

    /// Builder-style [`set_defaults`](Self::set_defaults).
    pub fn defaults_from<I, K, V>(mut self, defaults: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.set_defaults(defaults)?;
        Ok(self)
    }

    /// Builder-style [`set_host`](Self::set_host).
    pub fn host_from(mut self, host: &str) -> Result<Self, RouteError> {
        self.set_host(host)?;
        Ok(self)
    }
}

fn normalize_method(method: Value) -> Result<String, InvalidParameter> {
    match method {
        Value::String(s) => {
            if s.is_empty() || http::Method::from_bytes(s.as_bytes()).is_err() {
                return Err(InvalidParameter::Methods(format!("{s:?}")));
            }
            Ok(s.to_uppercase())
        }
        other => Err(InvalidParameter::Methods(value_kind(&other).to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> Route<&'static str> {
        Route::with_methods("page", "/page/{require}{[optional]}", "page", ["GET", "POST"])
            .and_then(|r| r.tokens_from([("require", r"[\w\-]+"), ("optional", r"\d+")]))
            .expect("valid route")
    }

    fn request(path: &str) -> RouteRequest<'_> {
        RouteRequest::new("GET", path)
    }

    // === Construction ===

    #[test]
    fn methods_are_upper_cased() {
        let route = Route::with_methods("home", "/", (), ["get", "Post"]).expect("valid");
        assert_eq!(route.methods(), ["GET", "POST"]);
    }

    #[test]
    fn non_string_methods_are_rejected() {
        for method in [json!(1), json!(true), json!(null), json!(["GET"])] {
            let err = Route::with_methods("home", "/", (), [method]).expect_err("invalid");
            assert!(matches!(
                err.as_invalid_parameter(),
                Some(InvalidParameter::Methods(_))
            ));
        }
    }

    #[test]
    fn malformed_method_names_are_rejected() {
        for method in ["", "GE T", "GET\n"] {
            assert!(Route::with_methods("home", "/", (), [method]).is_err());
        }
    }

    #[test]
    fn accessors_return_construction_values() {
        let route = Route::new("blog.view", "/blog/{slug}", 7).expect("valid");
        assert_eq!(route.name(), "blog.view");
        assert_eq!(route.pattern(), "/blog/{slug}");
        assert_eq!(*route.handler(), 7);
        assert!(route.methods().is_empty());
        assert!(route.tokens().is_empty());
        assert!(route.defaults().is_empty());
        assert_eq!(route.host(), None);
    }

    // === Tokens and defaults ===

    #[test]
    fn tokens_merge() {
        let mut route = Route::new("post", "/{topic}/{id}", ()).expect("valid");
        route.set_tokens([("topic", r"[\w-]+")]).expect("valid token");
        route.set_tokens([("id", r"\d+")]).expect("valid token");
        assert_eq!(route.tokens().len(), 2);
        assert!(route.matches(&request("/news/12")).is_some());
        assert!(route.matches(&request("/news/twelve")).is_none());
    }

    #[test]
    fn invalid_tokens_are_rejected_without_partial_merge() {
        for token in [json!(false), json!(true), json!(1), json!(1.1), json!([r"\d+"]), json!(""), json!({})] {
            let mut route = Route::new("blog.view", "/blog/{slug}", ()).expect("valid");
            let err = route
                .set_tokens([("other", json!(r"\d+")), ("slug", token)])
                .expect_err("invalid token");
            assert!(matches!(
                err.as_invalid_parameter(),
                Some(InvalidParameter::Tokens(_))
            ));
            assert!(route.tokens().is_empty());
        }
    }

    #[test]
    fn token_with_broken_regex_is_invalid_pattern() {
        let mut route = Route::new("blog.view", "/blog/{slug}", ()).expect("valid");
        let err = route.set_tokens([("slug", "([a-z]")]).expect_err("broken regex");
        assert!(matches!(err, RouteError::InvalidPattern { .. }));
        assert!(route.tokens().is_empty());
    }

    #[test]
    fn defaults_are_coerced_to_strings() {
        for (expected, default) in [("0", json!(0)), ("0.1", json!(0.1)), ("default", json!("default")), ("1", json!(true))] {
            let mut route = Route::new("blog.view", "/blog/{placeholder}", ()).expect("valid");
            route.set_defaults([("placeholder", default)]).expect("scalar default");
            assert_eq!(route.defaults().get("placeholder").map(String::as_str), Some(expected));
            assert!(route.matches(&request(&format!("/blog/{expected}"))).is_some());
        }
    }

    #[test]
    fn non_scalar_defaults_are_rejected() {
        for default in [Value::Null, json!([1]), json!([]), json!({"a": 1})] {
            let mut route = Route::new("blog.list", "/blog/page/{page}", ()).expect("valid");
            let err = route.set_defaults([("page", default)]).expect_err("invalid");
            assert!(matches!(
                err.as_invalid_parameter(),
                Some(InvalidParameter::Defaults(_))
            ));
        }
    }

    // === Matching ===

    #[test]
    fn is_allowed_method() {
        let route = Route::with_methods("home", "/", (), ["GET", "POST"]).expect("valid");
        assert!(route.is_allowed_method("GET"));
        assert!(route.is_allowed_method("post"));
        for method in ["PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"] {
            assert!(!route.is_allowed_method(method));
        }

        let any = Route::new("any", "/", ()).expect("valid");
        for method in ["GET", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "PURGE"] {
            assert!(any.is_allowed_method(method));
        }
    }

    #[test]
    fn match_returns_parameters() {
        let route = page();
        let params = route.matches(&request("/page/require/123")).expect("matches");
        assert_eq!(params.get("require"), Some("require"));
        assert_eq!(params.get("optional"), Some("123"));

        let params = route.matches(&request("/page/require")).expect("matches");
        assert_eq!(params.get("optional"), None);

        assert!(route.matches(&request("/page/require/abc")).is_none());
    }

    #[test]
    fn match_does_not_depend_on_previous_matches() {
        let route = page();
        assert!(route.matches(&request("/page/first/1")).is_some());
        assert!(route.matches(&request("/page/second/abc")).is_none());
        let params = route.matches(&request("/page/third")).expect("matches");
        assert_eq!(params.get("require"), Some("third"));
        assert_eq!(params.get("optional"), None);
    }

    #[test]
    fn match_decodes_path() {
        let route = Route::new("blog.view", "/blog/{slug}", ()).expect("valid");
        let params = route
            .matches(&request("/blog/hello%20world"))
            .expect("matches");
        assert_eq!(params.get("slug"), Some("hello world"));
    }

    #[test]
    fn static_require_with_optional_value() {
        let route = Route::new("test", "/page/{require}{[optional]}", ())
            .and_then(|r| r.tokens_from([("require", json!("static")), ("optional", Value::Null)]))
            .expect("valid");
        let params = route.matches(&request("/page/static/static")).expect("matches");
        assert_eq!(params.get("optional"), Some("static"));
        assert!(route.matches(&request("/page/failure/static")).is_none());
    }

    // === Host ===

    #[test]
    fn host_is_trimmed_and_matched() {
        let route = Route::new("shop", "/", ())
            .and_then(|r| r.host_from("/(?:shop|blog).example.com/"))
            .expect("valid");
        assert_eq!(route.host(), Some("(?:shop|blog).example.com"));

        for host in ["shop.example.com", "blog.example.com", "SHOP.EXAMPLE.COM"] {
            assert!(route.matches(&request("/").with_host(host)).is_some(), "{host}");
        }
        for host in ["forum.example.com", "shopXexample.com", ""] {
            assert!(route.matches(&request("/").with_host(host)).is_none(), "{host}");
        }
    }

    #[test]
    fn host_alternation_is_anchored_at_both_ends() {
        let route = Route::new("shop", "/", ())
            .and_then(|r| r.host_from("shop.example.com|blog.example.com"))
            .expect("valid");

        for host in ["shop.example.com", "blog.example.com"] {
            assert!(route.matches(&request("/").with_host(host)).is_some(), "{host}");
        }
        for host in ["evil-blog.example.com", "shop.example.com.attacker.net"] {
            assert!(route.matches(&request("/").with_host(host)).is_none(), "{host}");
        }
    }

    #[test]
    fn host_mismatch_skips_path_matching() {
        let route = Route::new("home", "/", ()).and_then(|r| r.host_from("example.com")).expect("valid");
        assert!(route.matches(&request("/").with_host("example.org")).is_none());
    }

    #[test]
    fn empty_host_clears_restriction() {
        let mut route = Route::new("home", "/", ()).and_then(|r| r.host_from("example.com")).expect("valid");
        route.set_host("//").expect("valid");
        assert_eq!(route.host(), None);
        assert!(route.matches(&request("/")).is_some());
    }

    // === Generation ===

    #[test]
    fn path_round_trips_through_match() {
        let route = page();
        let path = route
            .path(&Parameters::new().with("require", "slug").with("optional", 42))
            .expect("valid parameters");
        assert_eq!(path, "/page/slug/42");

        let params = route.matches(&request(&path)).expect("matches");
        assert_eq!(params.get("require"), Some("slug"));
        assert_eq!(params.get("optional"), Some("42"));
    }

    #[test]
    fn path_reports_invalid_parameters() {
        let route = page();
        let cases = [
            Parameters::new().with("require", "slug").with("optional", json!([1])),
            Parameters::new().with("optional", 123),
            Parameters::new().with("require", Value::Null).with("optional", 123),
            Parameters::new().with("require", "/slug").with("optional", 123),
            Parameters::new().with("require", "slug").with("optional", "slug"),
        ];
        for parameters in cases {
            let err = route.path(&parameters).expect_err("invalid");
            assert!(err.as_invalid_parameter().is_some(), "{err}");
        }
    }

    #[test]
    fn url_without_any_host_is_path() {
        let route = page();
        let parameters = Parameters::new().with("require", "slug");
        assert_eq!(route.url(&parameters, None, None).expect("valid"), "/page/slug");
        assert_eq!(route.url(&parameters, Some("//"), Some(true)).expect("valid"), "/page/slug");
    }

    #[test]
    fn url_with_caller_host() {
        let route = Route::new("home", "/", ()).expect("valid");
        let none = Parameters::new();
        assert_eq!(route.url(&none, Some("example.com"), None).expect("valid"), "//example.com");
        assert_eq!(route.url(&none, Some("example.com/"), None).expect("valid"), "//example.com");
        assert_eq!(route.url(&none, Some("//example.com"), None).expect("valid"), "//example.com");
        assert_eq!(route.url(&none, Some("////example.com"), Some(false)).expect("valid"), "http://example.com");
        assert_eq!(route.url(&none, Some("example.com"), Some(true)).expect("valid"), "https://example.com");
    }

    #[test]
    fn url_uses_literal_route_host() {
        let route = page().host_from("example.com").expect("valid");
        let parameters = Parameters::new().with("require", "slug").with("optional", 0);
        assert_eq!(
            route.url(&parameters, None, Some(true)).expect("valid"),
            "https://example.com/page/slug/0"
        );
    }

    #[test]
    fn url_with_host_regex_uses_stored_or_matching_caller_host() {
        let route = page().host_from("(?:shop|blog).example.com").expect("valid");
        let parameters = Parameters::new().with("require", "slug");

        assert_eq!(
            route.url(&parameters, None, None).expect("valid"),
            "//(?:shop|blog).example.com/page/slug"
        );
        assert_eq!(
            route.url(&parameters, Some("shop.example.com"), None).expect("valid"),
            "//shop.example.com/page/slug"
        );

        let err = route
            .url(&parameters, Some("forum.example.com"), None)
            .expect_err("host does not match");
        assert!(matches!(
            err.as_invalid_parameter(),
            Some(InvalidParameter::NotMatched { name, .. }) if name == "host"
        ));
    }
}
