//! Route declaration.
//!
//! Routes are declared on a mutable [`Router`] and committed once into immutable [`Routes`]:
//!
//! ```
//! use micro_router::{HttpContext, Router, handler_fn};
//! use micro_router::router::matcher;
//!
//! async fn show(ctx: &mut HttpContext) -> String {
//!     format!("post {}", ctx.params().get("id").map(ToString::to_string).unwrap_or_default())
//! }
//!
//! let mut router = Router::new();
//! router
//!     .group(|r| {
//!         r.get("/posts/:id", handler_fn(show)).as_name("posts.show");
//!     })
//!     .prefix("/api")
//!     .where_param("id", matcher::number());
//!
//! let routes = router.commit().unwrap();
//! assert_eq!(routes.make_url("posts.show", [1]).unwrap(), "/api/posts/1");
//! ```
//!
//! Builders live in an arena owned by the router. A group remembers which routes were declared in
//! its closure, so changes made on the group afterwards reach every one of them. The middleware of a
//! group is a single stack shared by its routes: adding to it once the group is built is visible to
//! every route.

pub mod brisk;
pub mod group;
pub mod matcher;
pub mod resource;
pub mod route;
pub mod token;

use crate::error::RegistrationError;
use crate::handler::HandlerRef;
use crate::lookup::LookupStore;
use crate::middleware::{MiddlewareRef, MiddlewareResolver, NamedMiddleware, ResolvedMiddleware, compose};
use crate::resolver::Resolver;
use crate::routes::Routes;
use crate::signature::Encryption;
use crate::store::RoutesStore;
use brisk::Brisk;
use group::Group;
use http::Method;
use matcher::{Matchers, ParamMatcher};
use resource::{Resource, ResourceNode};
use route::{Domain, Layer, Route, RouteDescriptor, StackId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Entry {
    Route(usize),
    Group(usize),
    Resource(usize),
}

struct GroupNode {
    children: Vec<Entry>,
    stack: Option<StackId>,
}

/// The mutable route table of an application.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    groups: Vec<GroupNode>,
    resources: Vec<ResourceNode>,
    stacks: Vec<Vec<MiddlewareRef>>,
    entries: Vec<Entry>,
    open_groups: Vec<Vec<Entry>>,
    matchers: Matchers,
    middleware: Vec<MiddlewareRef>,
    named_middleware: NamedMiddleware,
    resolver: Option<Arc<dyn Resolver>>,
    signer: Option<Arc<dyn Encryption>>,
}

macro_rules! method_route {
    ($method:ident, [$($verb:ident),+]) => {
        #[doc = concat!("Registers a route for `", $(stringify!($verb), " ",)+ "`.")]
        pub fn $method(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> &mut Route {
            self.route(pattern, [$(Method::$verb),+], handler)
        }
    };
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route for `methods`.
    pub fn route<I>(&mut self, pattern: &str, methods: I, handler: impl Into<HandlerRef>) -> &mut Route
    where
        I: IntoIterator<Item = Method>,
    {
        let id = self.add_route(Route::new(pattern, methods, Some(handler.into())));
        self.register(Entry::Route(id));
        &mut self.routes[id]
    }

    /// Registers a route for every common method.
    pub fn any(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        let methods = [Method::HEAD, Method::OPTIONS, Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE];
        self.route(pattern, methods, handler)
    }

    method_route!(get, [GET, HEAD]);
    method_route!(post, [POST]);
    method_route!(put, [PUT]);
    method_route!(patch, [PATCH]);
    method_route!(delete, [DELETE]);

    /// Groups the routes declared by `f`.
    pub fn group<F>(&mut self, f: F) -> Group<'_>
    where
        F: FnOnce(&mut Router),
    {
        self.open_groups.push(Vec::new());
        f(self);
        let children = self.open_groups.pop().unwrap_or_default();

        let id = self.groups.len();
        self.groups.push(GroupNode { children, stack: None });
        self.register(Entry::Group(id));
        Group::new(self, id)
    }

    /// Registers the seven conventional routes of `controller`, see [`Resource`].
    ///
    /// # Errors
    ///
    /// Fails when `resource` is empty, `/`, or has an empty dotted part.
    pub fn resource(&mut self, resource: &str, controller: &str) -> Result<Resource<'_>, RegistrationError> {
        Resource::create(self, resource, controller, false)
    }

    /// Like [`Router::resource`], member routes dropping the parent resources.
    ///
    /// # Errors
    ///
    /// Fails when `resource` is empty, `/`, or has an empty dotted part.
    pub fn shallow_resource(&mut self, resource: &str, controller: &str) -> Result<Resource<'_>, RegistrationError> {
        Resource::create(self, resource, controller, true)
    }

    /// Registers a `GET` route whose handler is set on the returned [`Brisk`].
    pub fn on(&mut self, pattern: &str) -> Brisk<'_> {
        let id = self.add_route(Route::new(pattern, [Method::GET, Method::HEAD], None));
        self.register(Entry::Route(id));
        Brisk::new(&mut self.routes[id])
    }

    /// Declares a matcher for `param` on every route. Matchers declared on a route win.
    pub fn where_param(&mut self, param: &str, matcher: impl Into<ParamMatcher>) -> &mut Self {
        self.matchers.insert(param.to_owned(), matcher.into());
        self
    }

    /// Adds middleware running for every route, before group and route middleware.
    pub fn middleware(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        self.middleware.push(middleware.into());
        self
    }

    pub fn named_middleware(&mut self, named: NamedMiddleware) -> &mut Self {
        self.named_middleware = named;
        self
    }

    pub fn resolver(&mut self, resolver: impl Resolver + 'static) -> &mut Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn signer(&mut self, signer: impl Encryption + 'static) -> &mut Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    pub(crate) fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Freezes the declared routes.
    ///
    /// Patterns and matchers are compiled, handlers and middleware resolved, and every route is
    /// indexed for matching and for url building. Deleted resource routes and brisk routes without
    /// a handler are left out.
    ///
    /// # Errors
    ///
    /// Fails on the first route that cannot be registered: duplicate route, duplicate name within a
    /// domain, invalid pattern or matcher, unresolvable handler or middleware.
    pub fn commit(self) -> Result<Routes, RegistrationError> {
        let mut ordered = Vec::with_capacity(self.routes.len());
        for entry in &self.entries {
            self.collect_routes(*entry, &mut ordered);
        }

        let Router { routes, stacks, matchers, middleware, named_middleware, resolver, signer, .. } = self;
        let composer = MiddlewareResolver::new(&named_middleware, resolver.as_deref());
        let router_middleware = composer.resolve_all(&middleware)?;
        let stacks = stacks
            .iter()
            .map(|stack| composer.resolve_all(stack))
            .collect::<Result<Vec<Vec<ResolvedMiddleware>>, RegistrationError>>()?;

        let mut store = RoutesStore::new();
        let mut lookup = LookupStore::new(signer);
        let mut names: HashMap<Domain, HashSet<String>> = HashMap::new();
        let mut routes: Vec<Option<Route>> = routes.into_iter().map(Some).collect();

        for id in ordered {
            let Some(route) = routes[id].take() else { continue };
            if route.is_deleted() || route.handler().is_none() {
                continue;
            }
            if route.methods().is_empty() {
                return Err(RegistrationError::missing_methods(route.pattern()));
            }

            let mut chain = Vec::new();
            for layer in route.layers() {
                match layer {
                    Layer::Shared(stack) => chain.extend_from_slice(&stacks[stack.0]),
                    Layer::Own(own) => chain.extend(composer.resolve_all(own)?),
                }
            }

            let parts = route.into_parts();
            if let Some(name) = &parts.name {
                if !names.entry(parts.domain.clone()).or_default().insert(name.clone()) {
                    return Err(RegistrationError::duplicate_route_name(name));
                }
            }

            let mut route_matchers = matchers.clone();
            route_matchers.extend(parts.matchers);
            let tokens = token::compile(&parts.pattern, &route_matchers)?;
            let handler = parts.handler.as_ref().map(|handler| handler.resolve(resolver.as_deref()));
            let Some(handler) = handler.transpose()? else { continue };

            let descriptor = RouteDescriptor {
                index: store.len(),
                pattern: parts.pattern,
                tokens,
                methods: parts.methods,
                domain: parts.domain,
                name: parts.name,
                handler,
                handler_reference: parts.handler.as_ref().and_then(HandlerRef::reference),
                middleware: compose(&router_middleware, &chain),
                meta: parts.meta,
            };
            let descriptor = store.add(descriptor)?;
            lookup.register(&descriptor);
            debug!(
                pattern = descriptor.pattern(),
                methods = ?descriptor.methods(),
                domain = %descriptor.domain(),
                name = descriptor.name(),
                "route registered"
            );
        }

        debug!(routes = store.len(), domains = store.uses_domains(), "routes committed");
        Ok(Routes::new(store, lookup, named_middleware, resolver))
    }

    pub(crate) fn add_route(&mut self, route: Route) -> usize {
        self.routes.push(route);
        self.routes.len() - 1
    }

    pub(crate) fn register(&mut self, entry: Entry) {
        match self.open_groups.last_mut() {
            Some(children) => children.push(entry),
            None => self.entries.push(entry),
        }
    }

    pub(crate) fn route_ref(&self, id: usize) -> &Route {
        &self.routes[id]
    }

    pub(crate) fn route_mut(&mut self, id: usize) -> &mut Route {
        &mut self.routes[id]
    }

    /// Concrete routes of a group, nested groups and resources included.
    pub(crate) fn group_routes(&self, group: usize) -> Vec<usize> {
        let mut routes = Vec::new();
        self.collect_routes(Entry::Group(group), &mut routes);
        routes
    }

    /// The shared middleware stack of a group, leading the layers of its routes once created.
    pub(crate) fn group_stack(&mut self, group: usize) -> StackId {
        if let Some(stack) = self.groups[group].stack {
            return stack;
        }
        let stack = StackId(self.stacks.len());
        self.stacks.push(Vec::new());
        self.groups[group].stack = Some(stack);
        for route in self.group_routes(group) {
            self.routes[route].share_stack(stack);
        }
        stack
    }

    pub(crate) fn stack_mut(&mut self, stack: StackId) -> &mut Vec<MiddlewareRef> {
        &mut self.stacks[stack.0]
    }

    fn collect_routes(&self, entry: Entry, out: &mut Vec<usize>) {
        match entry {
            Entry::Route(id) => out.push(id),
            Entry::Resource(id) => out.extend(self.resources[id].routes.iter().map(|(_, route)| *route)),
            Entry::Group(id) => {
                for child in &self.groups[id].children {
                    self.collect_routes(*child, out);
                }
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("groups", &self.groups.len())
            .field("resources", &self.resources.len())
            .field("middleware", &self.middleware)
            .field("named_middleware", &self.named_middleware)
            .field("resolver", &self.resolver.is_some())
            .field("signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::handler::handler_fn;
    use crate::middleware::{Middleware, Next};
    use crate::request::HttpContext;
    use crate::resolver::MapResolver;
    use async_trait::async_trait;

    async fn ok(_ctx: &mut HttpContext) {}

    struct Noop;

    #[async_trait]
    impl Middleware for Noop {
        async fn handle(&self, ctx: &mut HttpContext, next: Next<'_>, _args: &[String]) -> Result<(), BoxError> {
            next.run(ctx).await
        }
    }

    fn named() -> NamedMiddleware {
        ["router", "g1", "g1_late", "g2", "route", "auth"]
            .into_iter()
            .fold(NamedMiddleware::builder(), |builder, name| builder.add(name, MiddlewareRef::function(Noop)))
            .build()
    }

    fn chain_names(routes: &Routes, name: &str) -> Vec<String> {
        let entry = routes.lookup().find(name, &Domain::Root).unwrap();
        let route = routes.store().routes().iter().find(|route| route.pattern() == entry.pattern()).unwrap();
        route.middleware().iter().map(|m| m.name().unwrap_or_default().to_owned()).collect()
    }

    #[test]
    fn test_method_shortcuts() {
        let mut router = Router::new();
        assert_eq!(router.get("/", handler_fn(ok)).methods(), [Method::GET, Method::HEAD]);
        assert_eq!(router.delete("/", handler_fn(ok)).methods(), [Method::DELETE]);
        assert_eq!(router.any("/any", handler_fn(ok)).methods().len(), 7);
    }

    #[test]
    fn test_repeated_methods_register_once() {
        let mut router = Router::new();
        let route = router.route("/x", [Method::GET, Method::POST, Method::GET], handler_fn(ok));
        assert_eq!(route.methods(), [Method::GET, Method::POST]);

        let routes = router.commit().unwrap();
        assert_eq!(routes.store().len(), 1);
        assert!(routes.match_route("/x", &Method::GET, None).is_some());
    }

    #[test]
    fn test_nested_group_middleware_order() {
        let mut router = Router::new();
        router.named_middleware(named()).middleware("router");
        router
            .group(|r| {
                r.group(|r| {
                    r.get("/users", handler_fn(ok)).middleware("route").as_name("users");
                })
                .middleware("g2");
            })
            .middleware("g1")
            .middleware("g1_late");

        let routes = router.commit().unwrap();
        assert_eq!(chain_names(&routes, "users"), ["router", "g1", "g1_late", "g2", "route"]);
    }

    #[test]
    fn test_duplicate_route() {
        let mut router = Router::new();
        router.get("/posts", handler_fn(ok));
        router.get("posts/", handler_fn(ok));
        let error = router.commit().unwrap_err();
        assert!(matches!(error, RegistrationError::DuplicateRoute { ref method, ref pattern }
            if *method == Method::GET && pattern == "/posts"));
    }

    #[test]
    fn test_same_pattern_on_other_domain() {
        let mut router = Router::new();
        router.get("/", handler_fn(ok));
        router.get("/", handler_fn(ok)).domain("blog.example.com");
        assert!(router.commit().is_ok());
    }

    #[test]
    fn test_duplicate_name_per_domain() {
        let mut router = Router::new();
        router.get("/a", handler_fn(ok)).as_name("home");
        router.get("/a", handler_fn(ok)).domain("blog.example.com").as_name("home");
        assert!(router.commit().is_ok());

        let mut router = Router::new();
        router.get("/a", handler_fn(ok)).as_name("home");
        router.get("/b", handler_fn(ok)).as_name("home");
        assert!(matches!(router.commit().unwrap_err(), RegistrationError::DuplicateRouteName { .. }));
    }

    #[test]
    fn test_missing_methods() {
        let mut router = Router::new();
        router.route("/nothing", [], handler_fn(ok));
        assert!(matches!(router.commit().unwrap_err(), RegistrationError::MissingMethods { .. }));
    }

    #[test]
    fn test_unknown_named_middleware_is_fatal() {
        let mut router = Router::new();
        router.get("/", handler_fn(ok)).middleware("missing");
        assert!(matches!(router.commit().unwrap_err(), RegistrationError::MissingNamedMiddleware { .. }));
    }

    #[test]
    fn test_invalid_matcher_fails_at_commit() {
        let mut router = Router::new();
        router.get("/posts/:id", handler_fn(ok)).where_param("id", "([0-9]+");
        assert!(matches!(router.commit().unwrap_err(), RegistrationError::InvalidMatcher { .. }));
    }

    #[test]
    fn test_controller_routes_resolve() {
        struct Posts;

        #[async_trait]
        impl crate::handler::Controller for Posts {
            async fn call(&self, _action: &str, _ctx: &mut HttpContext) -> Result<(), BoxError> {
                Ok(())
            }
        }

        let mut router = Router::new();
        router.resolver(MapResolver::new().with_controller("PostsController", Posts));
        let _ = router.resource("posts", "PostsController").unwrap().api_only();
        let routes = router.commit().unwrap();

        assert_eq!(routes.store().len(), 5);
        assert!(routes.lookup().has("PostsController.show", &Domain::Root));
        assert_eq!(routes.store().routes()[2].handler_reference(), Some("PostsController.show"));
    }

    #[test]
    fn test_unresolved_controller_is_fatal() {
        let mut router = Router::new();
        router.get("/", "HomeController.index");
        assert!(matches!(router.commit().unwrap_err(), RegistrationError::CannotResolve { .. }));
    }
}
