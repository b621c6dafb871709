//! Route pattern compiler.
//!
//! A pattern is literal regex text interleaved with placeholders:
//!
//! - `{name}`: a required parameter.
//! - `{[a/b/c]}`: a chain of optional parameters. `b` may only appear when
//!   `a` does, `c` only when `b` does.
//!
//! Names match `[a-zA-Z_][a-zA-Z0-9_-]*`. Each parameter is constrained by
//! its token (a regex fragment), `[^/]+` when none is registered.
//!
//! The same parsed form drives both directions: [`CompiledPattern::captures`]
//! matches a decoded request path and [`CompiledPattern::generate`] rebuilds
//! a path from parameter values.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::InvalidParameter;
use crate::params::{scalar_to_string, value_kind, Parameters, Params};

/// Token used for parameters without a registered one.
pub const DEFAULT_TOKEN: &str = "[^/]+";

/// Matcher used for the `""` and `"/"` patterns.
const ROOT_PATH_PATTERN: &str = "/?";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_-]*|\[[/a-zA-Z_][/a-zA-Z0-9_-]*\])\}")
        .expect("placeholder regex is valid")
});

/// One piece of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal regex text between placeholders.
    Literal(String),
    /// `{name}`
    Required(String),
    /// `{[a/b/c]}`
    Optional(Vec<String>),
}

/// Split a pattern into literal text and placeholders.
///
/// Braces that do not form a valid placeholder stay part of the literal text.
pub fn parse(pattern: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(pattern) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Literal(pattern[last..whole.start()].to_string()));
        }
        let inner = inner.as_str();
        if let Some(chain) = inner.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let names: Vec<String> = chain
                .split('/')
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            segments.push(Segment::Optional(names));
        } else {
            segments.push(Segment::Required(inner.to_string()));
        }
        last = whole.end();
    }

    if last < pattern.len() {
        segments.push(Segment::Literal(pattern[last..].to_string()));
    }
    segments
}

/// Names of every placeholder in the pattern, in order of appearance.
pub fn parameter_names(pattern: &str) -> Vec<String> {
    parse(pattern)
        .into_iter()
        .flat_map(|segment| match segment {
            Segment::Literal(_) => Vec::new(),
            Segment::Required(name) => vec![name],
            Segment::Optional(names) => names,
        })
        .collect()
}

/// Anchored validator for a single parameter.
#[derive(Debug, Clone)]
struct Validator {
    token: String,
    regex: Regex,
}

/// A pattern compiled against a token map.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    segments: Vec<Segment>,
    matcher: Regex,
    /// Capture group name → parameter name, in pattern order.
    groups: Vec<(String, String)>,
    validators: HashMap<String, Validator>,
}

impl CompiledPattern {
    /// Compile `pattern` using `tokens` for parameter constraints.
    ///
    /// Parameter names may contain `-`, which is not allowed in regex group
    /// names, so every capture gets a synthetic group name.
    pub fn compile(
        pattern: &str,
        tokens: &BTreeMap<String, Option<String>>,
    ) -> Result<Self, regex::Error> {
        let segments = parse(pattern);
        let mut groups = Vec::new();
        let mut source = String::from("(?i)^(?:");

        if pattern.is_empty() || pattern == "/" {
            source.push_str(ROOT_PATH_PATTERN);
        } else {
            for segment in &segments {
                match segment {
                    Segment::Literal(text) => source.push_str(text),
                    Segment::Required(name) => {
                        push_capture(&mut source, &mut groups, name, tokens);
                    }
                    Segment::Optional(names) => {
                        for name in names {
                            source.push_str("(?:/");
                            push_capture(&mut source, &mut groups, name, tokens);
                        }
                        for _ in names {
                            source.push_str(")?");
                        }
                    }
                }
            }
        }
        source.push_str(")$");

        let matcher = Regex::new(&source)?;

        let mut validators = HashMap::new();
        for (_, name) in &groups {
            if validators.contains_key(name) {
                continue;
            }
            let token = token_for(name, tokens).to_string();
            let regex = Regex::new(&format!("^(?:{token})$"))?;
            validators.insert(name.clone(), Validator { token, regex });
        }

        Ok(Self {
            segments,
            matcher,
            groups,
            validators,
        })
    }

    /// The compiled matcher source, for diagnostics.
    pub fn as_regex(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match a decoded path, returning the parameters that took part.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.matcher.captures(path)?;
        let mut params = Params::new();
        for (group, name) in &self.groups {
            if let Some(m) = caps.name(group) {
                params.push(name.as_str(), m.as_str());
            }
        }
        Some(params)
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Build a path from parameter values, falling back to `defaults`.
    pub fn generate(
        &self,
        parameters: &Parameters,
        defaults: &BTreeMap<String, String>,
    ) -> Result<String, InvalidParameter> {
        let mut path = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Required(name) => {
                    let value = resolve(name, parameters, defaults)?
                        .ok_or_else(|| InvalidParameter::NotPassed(name.clone()))?;
                    path.push_str(&self.validate(name, value)?);
                }
                Segment::Optional(names) => {
                    for name in names {
                        let Some(value) = resolve(name, parameters, defaults)? else {
                            break;
                        };
                        path.push('/');
                        path.push_str(&self.validate(name, value)?);
                    }
                }
            }
        }

        if path.is_empty() {
            return Ok("/".to_string());
        }
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Ok(path)
    }

    fn validate(&self, name: &str, value: String) -> Result<String, InvalidParameter> {
        let Some(validator) = self.validators.get(name) else {
            return Ok(value);
        };
        if validator.regex.is_match(&value) {
            Ok(value)
        } else {
            Err(InvalidParameter::NotMatched {
                name: name.to_string(),
                value,
                pattern: validator.token.clone(),
            })
        }
    }
}

fn token_for<'t>(name: &str, tokens: &'t BTreeMap<String, Option<String>>) -> &'t str {
    tokens
        .get(name)
        .and_then(|token| token.as_deref())
        .unwrap_or(DEFAULT_TOKEN)
}

fn push_capture(
    source: &mut String,
    groups: &mut Vec<(String, String)>,
    name: &str,
    tokens: &BTreeMap<String, Option<String>>,
) {
    let group = format!("wm_p{}", groups.len());
    source.push_str("(?P<");
    source.push_str(&group);
    source.push('>');
    source.push_str(token_for(name, tokens));
    source.push(')');
    groups.push((group, name.to_string()));
}

/// Look up a parameter value, falling back to its default.
///
/// A null parameter counts as absent.
fn resolve(
    name: &str,
    parameters: &Parameters,
    defaults: &BTreeMap<String, String>,
) -> Result<Option<String>, InvalidParameter> {
    match parameters.get(name) {
        Some(Value::Null) | None => Ok(defaults.get(name).cloned()),
        Some(value) => scalar_to_string(value)
            .map(Some)
            .ok_or_else(|| InvalidParameter::NotNullOrScalar(value_kind(value).to_string())),
    }
}
