//! Reverse lookup: from a route name, pattern or controller reference back to its url.

pub mod url_builder;

use crate::error::UrlError;
use crate::router::route::{Domain, RouteDescriptor};
use crate::router::token::Token;
use crate::signature::Encryption;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use url_builder::UrlBuilder;

/// What the url builder needs to know about a route.
#[derive(Debug, Clone)]
pub struct LookupEntry {
    name: Option<String>,
    pattern: String,
    handler: Option<String>,
    tokens: Vec<Token>,
}

impl LookupEntry {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// `Controller.action` for controller routes.
    pub fn handler(&self) -> Option<&str> {
        self.handler.as_deref()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

#[derive(Default)]
pub struct LookupStore {
    routes: HashMap<Domain, Vec<LookupEntry>>,
    signer: Option<Arc<dyn Encryption>>,
}

impl LookupStore {
    pub fn new(signer: Option<Arc<dyn Encryption>>) -> Self {
        Self { routes: HashMap::new(), signer }
    }

    pub fn register(&mut self, route: &RouteDescriptor) {
        let entry = LookupEntry {
            name: route.name().map(str::to_owned),
            pattern: route.pattern().to_owned(),
            handler: route.handler_reference().map(str::to_owned),
            tokens: route.tokens().to_vec(),
        };
        self.routes.entry(route.domain().clone()).or_default().push(entry);
    }

    /// Finds a route of `domain` by name, then by pattern, then by controller reference.
    pub fn find(&self, identifier: &str, domain: &Domain) -> Option<&LookupEntry> {
        let routes = self.routes.get(domain)?;
        routes
            .iter()
            .find(|route| route.name() == Some(identifier))
            .or_else(|| routes.iter().find(|route| route.pattern == identifier))
            .or_else(|| routes.iter().find(|route| route.handler() == Some(identifier)))
    }

    /// # Errors
    ///
    /// Fails with [`UrlError::CannotLookupRoute`] when no route is found.
    pub fn find_or_fail(&self, identifier: &str, domain: &Domain) -> Result<&LookupEntry, UrlError> {
        self.find(identifier, domain).ok_or_else(|| UrlError::cannot_lookup_route(identifier))
    }

    pub fn has(&self, identifier: &str, domain: &Domain) -> bool {
        self.find(identifier, domain).is_some()
    }

    pub fn builder(&self) -> UrlBuilder<'_> {
        UrlBuilder::new(self, Domain::Root)
    }

    pub fn builder_for_domain(&self, domain: impl Into<Domain>) -> UrlBuilder<'_> {
        UrlBuilder::new(self, domain.into())
    }

    pub fn signer(&self) -> Option<&Arc<dyn Encryption>> {
        self.signer.as_ref()
    }
}

impl fmt::Debug for LookupStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupStore")
            .field("routes", &self.routes.values().map(Vec::len).sum::<usize>())
            .field("signer", &self.signer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Controller, handler_fn};
    use crate::request::HttpContext;
    use crate::resolver::MapResolver;
    use crate::router::Router;
    use crate::error::BoxError;
    use async_trait::async_trait;

    async fn ok(_ctx: &mut HttpContext) {}

    struct Users;

    #[async_trait]
    impl Controller for Users {
        async fn call(&self, _action: &str, _ctx: &mut HttpContext) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn routes() -> crate::Routes {
        let mut router = Router::new();
        router.resolver(MapResolver::new().with_controller("UsersController", Users));
        router.get("/posts/:id", handler_fn(ok)).as_name("posts.show");
        router.get("/users/:id", "UsersController.show");
        router.get("/", handler_fn(ok)).domain("blog.example.com").as_name("blog.home");
        router.commit().unwrap()
    }

    #[test]
    fn test_find_by_name_pattern_and_handler() {
        let routes = routes();
        let lookup = routes.lookup();

        assert_eq!(lookup.find("posts.show", &Domain::Root).unwrap().pattern(), "/posts/:id");
        assert_eq!(lookup.find("/posts/:id", &Domain::Root).unwrap().name(), Some("posts.show"));
        assert_eq!(lookup.find("UsersController.show", &Domain::Root).unwrap().pattern(), "/users/:id");
    }

    #[test]
    fn test_find_is_scoped_to_domain() {
        let routes = routes();
        let lookup = routes.lookup();

        assert!(!lookup.has("blog.home", &Domain::Root));
        assert!(lookup.has("blog.home", &Domain::from("blog.example.com")));

        let error = lookup.find_or_fail("missing", &Domain::Root).unwrap_err();
        assert!(matches!(error, UrlError::CannotLookupRoute { ref identifier } if identifier == "missing"));
    }
}
