//! Url building by replaying the tokens of a route pattern.
//!
//! ```
//! use micro_router::{HttpContext, Router, handler_fn};
//! use micro_router::lookup::url_builder::UrlParams;
//!
//! async fn ok(_ctx: &mut HttpContext) {}
//!
//! let mut router = Router::new();
//! router.get("/posts/:id/:slug?", handler_fn(ok)).as_name("posts.show");
//! let routes = router.commit().unwrap();
//!
//! let url = routes
//!     .builder()
//!     .params(UrlParams::named().with("id", 1))
//!     .query("page", 2)
//!     .prefix_url("https://example.com")
//!     .make("posts.show")
//!     .unwrap();
//! assert_eq!(url, "https://example.com/posts/1?page=2");
//! ```

use crate::error::UrlError;
use crate::lookup::LookupStore;
use crate::request::RouteParams;
use crate::router::route::Domain;
use crate::router::token::{self, Token, TokenKind, WILDCARD_PARAM};
use crate::signature::{self, SIGNATURE_FIELD, SignedUrlOptions};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Param values for a url, by position or by name.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlParams {
    /// Values consumed in the order params appear in the pattern; the wildcard takes the rest.
    Positional(Vec<String>),
    /// Values keyed by param name; the wildcard under `*`.
    Named(HashMap<String, Vec<String>>),
}

impl UrlParams {
    pub fn positional<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        UrlParams::Positional(values.into_iter().map(|value| value.to_string()).collect())
    }

    pub fn named() -> Self {
        UrlParams::Named(HashMap::new())
    }

    /// Sets a named value, turning positional params into named ones.
    #[must_use]
    pub fn with(self, name: &str, value: impl ToString) -> Self {
        self.with_values(name, vec![value.to_string()])
    }

    /// Sets the segments of the wildcard.
    #[must_use]
    pub fn with_wildcard<I, T>(self, segments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.with_values(WILDCARD_PARAM, segments.into_iter().map(|segment| segment.to_string()).collect())
    }

    fn with_values(self, name: &str, values: Vec<String>) -> Self {
        let mut named = match self {
            UrlParams::Named(named) => named,
            UrlParams::Positional(_) => HashMap::new(),
        };
        named.insert(name.to_owned(), values);
        UrlParams::Named(named)
    }

    fn value_at(&self, token: &Token, position: usize) -> Option<&String> {
        match self {
            UrlParams::Positional(values) => values.get(position),
            UrlParams::Named(named) => named.get(token.value()).and_then(|values| values.first()),
        }
    }

    fn wildcard_from(&self, position: usize) -> &[String] {
        match self {
            UrlParams::Positional(values) => values.get(position..).unwrap_or_default(),
            UrlParams::Named(named) => named.get(WILDCARD_PARAM).map(Vec::as_slice).unwrap_or_default(),
        }
    }
}

impl Default for UrlParams {
    fn default() -> Self {
        Self::named()
    }
}

impl<T: ToString, const N: usize> From<[T; N]> for UrlParams {
    fn from(values: [T; N]) -> Self {
        Self::positional(values)
    }
}

impl<T: ToString> From<Vec<T>> for UrlParams {
    fn from(values: Vec<T>) -> Self {
        Self::positional(values)
    }
}

/// Params of a matched request, cast values written back with their display form.
impl From<&RouteParams> for UrlParams {
    fn from(params: &RouteParams) -> Self {
        let named = params
            .iter()
            .filter_map(|(name, value)| {
                let values = match value {
                    Value::Null => return None,
                    Value::String(value) => vec![value.clone()],
                    Value::Array(values) => values.iter().map(display_value).collect(),
                    other => vec![other.to_string()],
                };
                Some((name.clone(), values))
            })
            .collect();
        UrlParams::Named(named)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

/// Builds the url of a route found through the [`LookupStore`].
#[derive(Debug, Clone)]
pub struct UrlBuilder<'s> {
    lookup: &'s LookupStore,
    domain: Domain,
    params: UrlParams,
    query: Vec<(String, String)>,
    base_url: Option<String>,
    lookup_disabled: bool,
}

impl<'s> UrlBuilder<'s> {
    pub(crate) fn new(lookup: &'s LookupStore, domain: Domain) -> Self {
        Self { lookup, domain, params: UrlParams::default(), query: Vec::new(), base_url: None, lookup_disabled: false }
    }

    #[must_use]
    pub fn params(mut self, params: impl Into<UrlParams>) -> Self {
        self.params = params.into();
        self
    }

    #[must_use]
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params = self.params.with(name, value);
        self
    }

    #[must_use]
    pub fn wildcard<I, T>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.params = self.params.with_wildcard(segments);
        self
    }

    /// Appends the fields of `value` to the query string.
    ///
    /// # Errors
    ///
    /// Fails when `value` cannot be serialized as a query string.
    pub fn qs<T: Serialize>(mut self, value: &T) -> Result<Self, UrlError> {
        let encoded = serde_qs::to_string(value).map_err(UrlError::invalid_query_string)?;
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(&encoded).map_err(UrlError::invalid_query_string)?;
        self.query.extend(pairs);
        Ok(self)
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// Prepends `base_url`, such as `https://example.com`, to the built url.
    #[must_use]
    pub fn prefix_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_owned());
        self
    }

    /// Treats the identifier given to [`UrlBuilder::make`] as a pattern instead of looking it up.
    #[must_use]
    pub fn disable_route_lookup(mut self) -> Self {
        self.lookup_disabled = true;
        self
    }

    /// # Errors
    ///
    /// Fails when no route is found, when a required param or the wildcard has no value, or when
    /// the query string cannot be encoded.
    pub fn make(&self, identifier: &str) -> Result<String, UrlError> {
        let path = self.path(identifier)?;
        let url = with_query(path, &self.query)?;
        Ok(self.with_base_url(url))
    }

    /// Builds the url and appends a `signature` of its path and query string.
    ///
    /// # Errors
    ///
    /// Fails like [`UrlBuilder::make`], and when no signer is configured.
    pub fn make_signed(&self, identifier: &str, options: SignedUrlOptions) -> Result<String, UrlError> {
        let signer = self.lookup.signer().ok_or_else(|| UrlError::missing_signer(identifier))?;
        let path = self.path(identifier)?;
        let payload = signature::signed_payload(&path, &self.query)?;
        let signature = signer.sign(&payload, options.expires_in, options.purpose.as_deref());

        let mut query = self.query.clone();
        query.push((SIGNATURE_FIELD.to_owned(), signature));
        let url = with_query(path, &query)?;
        Ok(self.with_base_url(url))
    }

    fn path(&self, identifier: &str) -> Result<String, UrlError> {
        if self.lookup_disabled {
            let tokens = token::parse(identifier)?;
            return self.replay(identifier, &tokens);
        }
        let route = self.lookup.find_or_fail(identifier, &self.domain)?;
        self.replay(route.pattern(), route.tokens())
    }

    fn replay(&self, pattern: &str, tokens: &[Token]) -> Result<String, UrlError> {
        let mut segments = Vec::with_capacity(tokens.len());
        let mut position = 0;

        for token in tokens {
            match token.kind() {
                TokenKind::Static => segments.push(token.value().to_owned()),
                TokenKind::Wildcard => {
                    let values = self.params.wildcard_from(position);
                    if values.is_empty() {
                        return Err(UrlError::cannot_make_url(pattern, WILDCARD_PARAM));
                    }
                    let encoded = values.iter().map(|value| token::encode_segment(value)).collect::<Vec<_>>();
                    segments.push(encoded.join("/"));
                    break;
                }
                TokenKind::Param | TokenKind::OptionalParam => {
                    let value = self.params.value_at(token, position).filter(|value| !value.is_empty());
                    position += 1;
                    match value {
                        Some(value) => segments.push(format!("{}{}", token::encode_segment(value), token.suffix())),
                        None if token.kind() == TokenKind::OptionalParam => {}
                        None => return Err(UrlError::cannot_make_url(pattern, token.value())),
                    }
                }
            }
        }

        Ok(format!("/{}", segments.join("/")))
    }

    fn with_base_url(&self, url: String) -> String {
        match &self.base_url {
            Some(base_url) => format!("{base_url}{url}"),
            None => url,
        }
    }
}

fn with_query(path: String, query: &[(String, String)]) -> Result<String, UrlError> {
    if query.is_empty() {
        return Ok(path);
    }
    let encoded = serde_urlencoded::to_string(query).map_err(UrlError::invalid_query_string)?;
    Ok(format!("{path}?{encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::request::HttpContext;
    use crate::router::Router;
    use crate::routes::Routes;

    async fn ok(_ctx: &mut HttpContext) {}

    fn routes() -> Routes {
        let mut router = Router::new();
        router.get("/posts/:id/:slug?", handler_fn(ok)).as_name("posts.show");
        router.get("/docs/:version/*", handler_fn(ok)).as_name("docs");
        router.get("/reports/:id.json", handler_fn(ok)).as_name("reports.show");
        router.get("/", handler_fn(ok)).domain(":tenant.example.com").as_name("tenant.home");
        router.commit().unwrap()
    }

    #[test]
    fn test_positional_and_named() {
        let routes = routes();
        assert_eq!(routes.builder().params([1]).make("posts.show").unwrap(), "/posts/1");
        assert_eq!(routes.builder().params([1, 2]).make("posts.show").unwrap(), "/posts/1/2");
        assert_eq!(routes.builder().param("slug", "hello").param("id", 3).make("posts.show").unwrap(), "/posts/3/hello");
    }

    #[test]
    fn test_missing_required_param() {
        let routes = routes();
        let error = routes.builder().make("posts.show").unwrap_err();
        assert!(matches!(error, UrlError::CannotMakeUrl { ref pattern, ref param }
            if pattern == "/posts/:id/:slug?" && param == "id"));
    }

    #[test]
    fn test_wildcard() {
        let routes = routes();
        assert_eq!(routes.builder().params(["v6", "http", "context"]).make("docs").unwrap(), "/docs/v6/http/context");
        assert_eq!(
            routes.builder().param("version", "v6").wildcard(["http", "context"]).make("docs").unwrap(),
            "/docs/v6/http/context"
        );

        let error = routes.builder().params(["v6"]).make("docs").unwrap_err();
        assert!(matches!(error, UrlError::CannotMakeUrl { ref param, .. } if param == "*"));
    }

    #[test]
    fn test_suffix_is_kept() {
        let routes = routes();
        assert_eq!(routes.builder().params([7]).make("reports.show").unwrap(), "/reports/7.json");
    }

    #[test]
    fn test_query_string() {
        #[derive(Serialize)]
        struct Filters {
            page: u32,
            tags: Vec<&'static str>,
        }

        let routes = routes();
        let url = routes
            .builder()
            .params([1])
            .qs(&Filters { page: 2, tags: vec!["rust"] })
            .unwrap()
            .query("sort", "desc")
            .make("posts.show")
            .unwrap();
        assert_eq!(url, "/posts/1?page=2&tags%5B0%5D=rust&sort=desc");
    }

    #[test]
    fn test_values_are_encoded_and_match_back() {
        let mut router = Router::new();
        router.get("/posts/:title", handler_fn(ok)).as_name("posts.by_title");
        router.get("/files/*", handler_fn(ok)).as_name("files");
        let routes = router.commit().unwrap();

        let url = routes.builder().params(["hello world/2"]).make("posts.by_title").unwrap();
        assert_eq!(url, "/posts/hello%20world%2F2");
        assert!(url.parse::<http::Uri>().is_ok());
        let matched = routes.match_route(&url, &http::Method::GET, None).unwrap();
        assert_eq!(matched.params.get_str("title"), Some("hello world/2"));

        let url = routes.builder().wildcard(["a b", "c"]).make("files").unwrap();
        assert_eq!(url, "/files/a%20b/c");
        let matched = routes.match_route(&url, &http::Method::GET, None).unwrap();
        assert_eq!(matched.params.get("*"), Some(&serde_json::json!(["a b", "c"])));
    }

    #[test]
    fn test_disable_route_lookup() {
        let routes = routes();
        let url = routes.builder().params(["acme"]).disable_route_lookup().make("/teams/:team").unwrap();
        assert_eq!(url, "/teams/acme");
    }

    #[test]
    fn test_domain_builder() {
        let routes = routes();
        assert!(matches!(routes.builder().make("tenant.home"), Err(UrlError::CannotLookupRoute { .. })));
        let url = routes.builder_for_domain(":tenant.example.com").prefix_url("https://acme.example.com/").make("tenant.home");
        assert_eq!(url.unwrap(), "https://acme.example.com/");
    }

    #[test]
    fn test_from_route_params() {
        let mut params = RouteParams::empty();
        params.insert("id", Value::from(12));
        params.insert("*", serde_json::json!(["a", "b"]));

        let UrlParams::Named(named) = UrlParams::from(&params) else {
            panic!("expected named params");
        };
        assert_eq!(named["id"], ["12"]);
        assert_eq!(named["*"], ["a", "b"]);
    }
}
