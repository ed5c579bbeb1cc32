//! Error types of the routing core.
//!
//! Errors are split by the phase that raises them:
//!
//! - [`RegistrationError`]: raised while routes are declared or committed. These abort startup.
//! - [`UrlError`]: raised by the reverse lookup and the url builder.
//! - [`HttpError`]: raised while a request is dispatched, always handed to the server's error handler.

use http::Method;
use std::error::Error;
use thiserror::Error;

/// The error type carried through middleware and handlers.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Duplicate route found. \"{method}: {pattern}\" route already exists")]
    DuplicateRoute { method: Method, pattern: String },

    #[error("Duplicate param \"{param}\" found in \"{pattern}\"")]
    DuplicateParam { param: String, pattern: String },

    #[error("Route with duplicate name found. A route with name \"{name}\" already exists")]
    DuplicateRouteName { name: String },

    #[error("Routes inside a group must have names before calling \"as_name\" on the group")]
    MissingRouteName { pattern: String },

    #[error("Wildcard \"*\" must be the last segment of \"{pattern}\"")]
    WildcardNotLast { pattern: String },

    #[error("invalid matcher for param \"{param}\": {source}")]
    InvalidMatcher {
        param: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid resource name \"{name}\"")]
    InvalidResourceName { name: String },

    #[error("Route \"{pattern}\" has no http methods")]
    MissingMethods { pattern: String },

    #[error("Cannot find named middleware \"{name}\"")]
    MissingNamedMiddleware { name: String },

    #[error("Cannot resolve \"{reference}\", make sure it is registered with the resolver")]
    CannotResolve { reference: String },
}

impl RegistrationError {
    pub fn duplicate_route<S: ToString>(method: &Method, pattern: S) -> Self {
        Self::DuplicateRoute { method: method.clone(), pattern: pattern.to_string() }
    }

    pub fn duplicate_param<P: ToString, S: ToString>(param: P, pattern: S) -> Self {
        Self::DuplicateParam { param: param.to_string(), pattern: pattern.to_string() }
    }

    pub fn duplicate_route_name<S: ToString>(name: S) -> Self {
        Self::DuplicateRouteName { name: name.to_string() }
    }

    pub fn missing_route_name<S: ToString>(pattern: S) -> Self {
        Self::MissingRouteName { pattern: pattern.to_string() }
    }

    pub fn wildcard_not_last<S: ToString>(pattern: S) -> Self {
        Self::WildcardNotLast { pattern: pattern.to_string() }
    }

    pub fn invalid_matcher<S: ToString>(param: S, source: regex::Error) -> Self {
        Self::InvalidMatcher { param: param.to_string(), source }
    }

    pub fn invalid_resource_name<S: ToString>(name: S) -> Self {
        Self::InvalidResourceName { name: name.to_string() }
    }

    pub fn missing_methods<S: ToString>(pattern: S) -> Self {
        Self::MissingMethods { pattern: pattern.to_string() }
    }

    pub fn missing_named_middleware<S: ToString>(name: S) -> Self {
        Self::MissingNamedMiddleware { name: name.to_string() }
    }

    pub fn cannot_resolve<S: ToString>(reference: S) -> Self {
        Self::CannotResolve { reference: reference.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum UrlError {
    #[error("Cannot lookup route \"{identifier}\"")]
    CannotLookupRoute { identifier: String },

    #[error("Cannot make URL for \"{pattern}\". Missing value for the \"{param}\" param")]
    CannotMakeUrl { pattern: String, param: String },

    #[error("Cannot make signed URL for \"{identifier}\", no signer has been configured")]
    MissingSigner { identifier: String },

    #[error("invalid query string: {reason}")]
    InvalidQueryString { reason: String },

    #[error("invalid route pattern: {source}")]
    InvalidPattern {
        #[from]
        source: RegistrationError,
    },
}

impl UrlError {
    pub fn cannot_lookup_route<S: ToString>(identifier: S) -> Self {
        Self::CannotLookupRoute { identifier: identifier.to_string() }
    }

    pub fn cannot_make_url<P: ToString, S: ToString>(pattern: P, param: S) -> Self {
        Self::CannotMakeUrl { pattern: pattern.to_string(), param: param.to_string() }
    }

    pub fn missing_signer<S: ToString>(identifier: S) -> Self {
        Self::MissingSigner { identifier: identifier.to_string() }
    }

    pub fn invalid_query_string<S: ToString>(reason: S) -> Self {
        Self::InvalidQueryString { reason: reason.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Cannot {method}:{url}")]
    RouteNotFound { method: Method, url: String },

    #[error("url error: {source}")]
    Url {
        #[from]
        source: UrlError,
    },
}

impl HttpError {
    pub fn route_not_found<S: ToString>(method: &Method, url: S) -> Self {
        Self::RouteNotFound { method: method.clone(), url: url.to_string() }
    }
}
