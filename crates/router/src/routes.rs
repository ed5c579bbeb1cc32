use crate::error::{RegistrationError, UrlError};
use crate::lookup::LookupStore;
use crate::lookup::url_builder::{UrlBuilder, UrlParams};
use crate::middleware::{MiddlewareRef, MiddlewareResolver, NamedMiddleware, ResolvedMiddleware};
use crate::resolver::Resolver;
use crate::router::route::{Domain, RouteDescriptor};
use crate::signature::SignedUrlOptions;
use crate::store::{MatchResult, RoutesStore};
use http::Method;
use std::fmt;
use std::sync::Arc;

/// The committed route table, shared by every request.
pub struct Routes {
    store: RoutesStore,
    lookup: LookupStore,
    named_middleware: NamedMiddleware,
    resolver: Option<Arc<dyn Resolver>>,
}

impl Routes {
    pub(crate) fn new(
        store: RoutesStore,
        lookup: LookupStore,
        named_middleware: NamedMiddleware,
        resolver: Option<Arc<dyn Resolver>>,
    ) -> Self {
        Self { store, lookup, named_middleware, resolver }
    }

    pub fn store(&self) -> &RoutesStore {
        &self.store
    }

    pub fn lookup(&self) -> &LookupStore {
        &self.lookup
    }

    /// Matches `url` against the routes of the domain accepting `hostname`, or against root routes
    /// when no domain does.
    pub fn match_route(&self, url: &str, method: &Method, hostname: Option<&str>) -> Option<MatchResult> {
        let domain = hostname.and_then(|hostname| self.store.match_domain(hostname));
        self.store.match_route(url, method, domain.as_ref())
    }

    pub fn route_by_key(&self, route_key: &str) -> Option<&Arc<RouteDescriptor>> {
        self.store.route_by_key(route_key)
    }

    /// A url builder for root routes.
    pub fn builder(&self) -> UrlBuilder<'_> {
        self.lookup.builder()
    }

    pub fn builder_for_domain(&self, domain: impl Into<Domain>) -> UrlBuilder<'_> {
        self.lookup.builder_for_domain(domain)
    }

    /// Builds the url of a root route.
    ///
    /// # Errors
    ///
    /// Fails when no route is found or a required param has no value.
    pub fn make_url(&self, identifier: &str, params: impl Into<UrlParams>) -> Result<String, UrlError> {
        self.builder().params(params).make(identifier)
    }

    /// Builds the signed url of a root route.
    ///
    /// # Errors
    ///
    /// Fails when no route is found, a required param has no value or no signer is configured.
    pub fn make_signed_url(
        &self,
        identifier: &str,
        params: impl Into<UrlParams>,
        options: SignedUrlOptions,
    ) -> Result<String, UrlError> {
        self.builder().params(params).make_signed(identifier, options)
    }

    /// Resolves middleware declared outside the router, such as server middleware, against the
    /// router's named middleware and resolver.
    pub(crate) fn resolve_middleware(&self, middleware: &[MiddlewareRef]) -> Result<Vec<ResolvedMiddleware>, RegistrationError> {
        MiddlewareResolver::new(&self.named_middleware, self.resolver.as_deref()).resolve_all(middleware)
    }
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routes")
            .field("store", &self.store)
            .field("lookup", &self.lookup)
            .field("named_middleware", &self.named_middleware)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::request::HttpContext;
    use crate::router::Router;
    use crate::router::matcher;

    async fn ok(_ctx: &mut HttpContext) {}

    fn check_send_sync<T: Send + Sync>() {}

    #[test]
    fn is_send_and_sync() {
        check_send_sync::<Routes>();
    }

    #[test]
    fn test_post_show_round_trip() {
        let mut router = Router::new();
        router.get("/posts/:id", handler_fn(ok)).as_name("post.show");
        let routes = router.commit().unwrap();

        let url = routes.make_url("post.show", [1]).unwrap();
        assert_eq!(url, "/posts/1");

        let matched = routes.match_route(&url, &Method::GET, None).unwrap();
        assert_eq!(matched.params.get_str("id"), Some("1"));
    }

    #[test]
    fn test_cast_values_round_trip() {
        let mut router = Router::new();
        router.get("/posts/:id/:slug?", handler_fn(ok)).where_param("id", matcher::number()).as_name("posts.show");
        let routes = router.commit().unwrap();

        let params = UrlParams::named().with("id", 42).with("slug", "hello");
        let url = routes.make_url("posts.show", params).unwrap();
        let matched = routes.match_route(&url, &Method::GET, None).unwrap();

        assert_eq!(matched.params.get("id"), Some(&serde_json::json!(42)));
        assert_eq!(matched.params.get_str("slug"), Some("hello"));
    }

    #[test]
    fn test_hostname_selects_domain() {
        let mut router = Router::new();
        router.get("/", handler_fn(ok)).as_name("home");
        router.get("/", handler_fn(ok)).domain("blog.example.com").as_name("blog.home");
        let routes = router.commit().unwrap();

        let matched = routes.match_route("/", &Method::GET, Some("blog.example.com")).unwrap();
        assert_eq!(matched.route.name(), Some("blog.home"));

        let matched = routes.match_route("/", &Method::GET, Some("example.com")).unwrap();
        assert_eq!(matched.route.name(), Some("home"));

        let matched = routes.match_route("/", &Method::GET, None).unwrap();
        assert_eq!(matched.route.name(), Some("home"));
    }
}
