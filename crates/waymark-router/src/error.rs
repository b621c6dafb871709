//! Error types for route definition, matching and URL generation.

use thiserror::Error;

/// A route argument failed validation.
///
/// Every variant is a caller error: it is raised synchronously by the
/// operation that received the bad value and is never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParameter {
    /// A route method was not a string naming an HTTP method.
    #[error("The request methods MUST be a string HTTP method name, {0} received.")]
    Methods(String),

    /// A parameter token was neither null nor a non-empty string.
    #[error("Parameter token values MUST be null or non-empty string, {0} received.")]
    Tokens(String),

    /// A default value was not a scalar.
    #[error(
        "The default parameter values MUST be a scalar type (string, integer, float, boolean), {0} received."
    )]
    Defaults(String),

    /// A generation value was neither null nor a scalar.
    #[error(
        "The parameter values MUST be a null or scalar type (string, integer, float, boolean), {0} received."
    )]
    NotNullOrScalar(String),

    /// A required parameter had neither a value nor a default.
    #[error("The value of the required parameter \"{0}\" is not passed or is null.")]
    NotPassed(String),

    /// A parameter value did not satisfy its token.
    #[error("The value \"{value}\" of the \"{name}\" parameter does not match the regexp `{pattern}`.")]
    NotMatched {
        name: String,
        value: String,
        pattern: String,
    },
}

/// Errors produced by routes and route collections.
#[derive(Debug, Clone, Error)]
pub enum RouteError {
    /// An argument failed validation.
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameter),

    /// A token or host turned the route into an invalid regular expression.
    #[error("route \"{route}\" does not compile to a valid regexp: {source}")]
    InvalidPattern {
        route: String,
        #[source]
        source: regex::Error,
    },

    /// A route with the same name is already registered.
    #[error("The route \"{0}\" already exists.")]
    RouteAlreadyExists(String),

    /// No route is registered under the name.
    #[error("The route \"{0}\" was not found.")]
    RouteNotFound(String),
}

impl RouteError {
    /// Returns the validation failure, if this is one.
    pub fn as_invalid_parameter(&self) -> Option<&InvalidParameter> {
        match self {
            RouteError::InvalidParameter(inner) => Some(inner),
            _ => None,
        }
    }
}
