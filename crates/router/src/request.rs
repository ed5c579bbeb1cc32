//! Request side of the dispatch pipeline.
//!
//! This module contains the types handed to middleware and handlers:
//! - [`HttpRequest`]: the incoming request, with method spoofing applied
//! - [`HttpContext`]: the per request state, owning the request, the response and the matched route
//! - [`RouteParams`]: param values extracted from the url or the hostname

use crate::error::{BoxError, HttpError};
use crate::lookup::url_builder::{UrlBuilder, UrlParams};
use crate::response::HttpResponse;
use crate::router::route::{Domain, RouteDescriptor};
use crate::routes::Routes;
use crate::signature;
use crate::store::MatchResult;
use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Request, StatusCode, Uri, Version, header};
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Iter;
use std::sync::Arc;
use tracing::trace;

/// Query string field carrying the spoofed method of a form submission.
pub const METHOD_SPOOF_FIELD: &str = "_method";

/// Param values keyed by param name.
///
/// Values are strings unless a matcher cast them. The wildcard is stored under `*` as an array of segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams {
    inner: HashMap<String, Value>,
}

impl RouteParams {
    #[inline]
    pub fn empty() -> Self {
        Self { inner: HashMap::new() }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
        self.inner.get(key.as_ref())
    }

    /// Gets a param value that is still a string.
    #[inline]
    pub fn get_str(&self, key: impl AsRef<str>) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        self.inner.contains_key(key.as_ref())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.inner.insert(key.into(), value);
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.inner.iter()
    }
}

impl<'a> IntoIterator for &'a RouteParams {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl FromIterator<(String, Value)> for RouteParams {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self { inner: iter.into_iter().collect() }
    }
}

/// The incoming request.
#[derive(Debug)]
pub struct HttpRequest {
    parts: Parts,
    body: Bytes,
    spoofed_method: Option<Method>,
}

impl HttpRequest {
    /// Wraps `request`. With `allow_method_spoofing`, a `POST` carrying `_method` in its query string
    /// is routed with that method instead.
    pub fn new(request: Request<Bytes>, allow_method_spoofing: bool) -> Self {
        let (parts, body) = request.into_parts();
        let spoofed_method = if allow_method_spoofing { spoofed_method(&parts) } else { None };
        if let Some(method) = &spoofed_method {
            trace!(original = %parts.method, spoofed = %method, "method spoofed");
        }
        Self { parts, body, spoofed_method }
    }

    /// The method used for routing.
    pub fn method(&self) -> &Method {
        self.spoofed_method.as_ref().unwrap_or(&self.parts.method)
    }

    /// The method sent on the wire.
    pub fn intended_method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    pub fn version(&self) -> Version {
        self.parts.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The host the request was sent to, without port.
    pub fn hostname(&self) -> Option<&str> {
        if let Some(host) = self.parts.uri.host() {
            return Some(host);
        }
        let host = self.parts.headers.get(header::HOST)?.to_str().ok()?;
        Some(strip_port(host))
    }
}

fn spoofed_method(parts: &Parts) -> Option<Method> {
    if parts.method != Method::POST {
        return None;
    }
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(parts.uri.query()?).ok()?;
    let (_, value) = pairs.into_iter().find(|(key, _)| key == METHOD_SPOOF_FIELD)?;
    Method::from_bytes(value.to_uppercase().as_bytes()).ok()
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':').map_or(host, |(name, _port)| name)
}

/// Per request state handed to every middleware and to the route handler.
#[derive(Debug)]
pub struct HttpContext {
    request: HttpRequest,
    response: HttpResponse,
    params: RouteParams,
    subdomains: RouteParams,
    route: Option<Arc<RouteDescriptor>>,
    route_key: Option<Arc<str>>,
    routes: Arc<Routes>,
    redirect_status: StatusCode,
}

impl HttpContext {
    pub fn new(request: HttpRequest, routes: Arc<Routes>) -> Self {
        Self {
            request,
            response: HttpResponse::new(),
            params: RouteParams::empty(),
            subdomains: RouteParams::empty(),
            route: None,
            route_key: None,
            routes,
            redirect_status: StatusCode::FOUND,
        }
    }

    /// Sets the status used by redirects that do not name one.
    #[must_use]
    pub fn with_redirect_status(mut self, status: StatusCode) -> Self {
        self.redirect_status = status;
        self
    }

    pub fn redirect_status(&self) -> StatusCode {
        self.redirect_status
    }

    pub(crate) fn set_route(&mut self, matched: MatchResult) {
        self.params = matched.params;
        self.subdomains = matched.subdomains;
        self.route_key = Some(matched.route_key);
        self.route = Some(matched.route);
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut HttpResponse {
        &mut self.response
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn subdomains(&self) -> &RouteParams {
        &self.subdomains
    }

    /// The matched route, `None` when no route matched the request.
    pub fn route(&self) -> Option<&RouteDescriptor> {
        self.route.as_deref()
    }

    pub fn route_key(&self) -> Option<&str> {
        self.route_key.as_deref()
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// A url builder scoped to the domain of the matched route.
    pub fn url_builder(&self) -> UrlBuilder<'_> {
        let domain = self.route.as_ref().map_or(Domain::Root, |route| route.domain().clone());
        self.routes.builder_for_domain(domain)
    }

    /// Redirects to the url of the route named by `identifier`, built with `params` or, when absent,
    /// with the params of the current request.
    ///
    /// # Errors
    ///
    /// Fails when the url cannot be built.
    pub fn redirect_to_route(&mut self, identifier: &str, params: Option<UrlParams>, status: StatusCode) -> Result<(), BoxError> {
        let params = params.unwrap_or_else(|| UrlParams::from(&self.params));
        let url = self.url_builder().params(params).make(identifier).map_err(HttpError::from)?;
        self.response.redirect_to(&url, status)?;
        Ok(())
    }

    /// Returns true when the request url carries a valid `signature` for `purpose`.
    pub fn has_valid_signature(&self, purpose: Option<&str>) -> bool {
        let Some(signer) = self.routes.lookup().signer() else {
            return false;
        };
        signature::verify_signed_url(signer.as_ref(), self.request.path(), self.request.query(), purpose)
    }

    pub fn into_response(self) -> http::Response<crate::body::ResponseBody> {
        self.response.into_http()
    }
}
