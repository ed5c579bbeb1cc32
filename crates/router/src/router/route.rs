use crate::error::RegistrationError;
use crate::handler::{HandlerRef, RequestHandler};
use crate::middleware::{MiddlewareRef, ResolvedMiddleware};
use crate::router::matcher::{Matchers, ParamMatcher};
use crate::router::token::Token;
use http::Method;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// The domain a route is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Domain {
    /// Matches any host that no domain pattern claims.
    #[default]
    Root,
    /// A hostname pattern such as `blog.example.com` or `:tenant.example.com`.
    Named(String),
}

impl Domain {
    pub fn as_str(&self) -> &str {
        match self {
            Domain::Root => "root",
            Domain::Named(pattern) => pattern,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Domain::Root)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Domain {
    fn from(pattern: &str) -> Self {
        Domain::Named(pattern.to_owned())
    }
}

impl From<String> for Domain {
    fn from(pattern: String) -> Self {
        Domain::Named(pattern)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StackId(pub(crate) usize);

/// One layer of a route's middleware, outermost first.
#[derive(Debug, Clone)]
pub(crate) enum Layer {
    /// Middleware shared with every route of a group, filled after the route was created.
    Shared(StackId),
    Own(Vec<MiddlewareRef>),
}

/// A route being declared.
///
/// Every setter returns `&mut Self` so calls chain off the router:
///
/// ```
/// use micro_router::Router;
/// use micro_router::router::matcher;
///
/// let mut router = Router::new();
/// router
///     .get("/posts/:id", "PostsController.show")
///     .where_param("id", matcher::number())
///     .middleware("auth")
///     .as_name("posts.show");
/// ```
#[derive(Debug)]
pub struct Route {
    pattern: String,
    prefixes: Vec<String>,
    methods: Vec<Method>,
    handler: Option<HandlerRef>,
    name: Option<String>,
    domain: Domain,
    matchers: Matchers,
    layers: Vec<Layer>,
    meta: Map<String, Value>,
    deleted: bool,
}

impl Route {
    pub(crate) fn new<I>(pattern: &str, methods: I, handler: Option<HandlerRef>) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        let mut unique: Vec<Method> = Vec::new();
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }

        Self {
            pattern: pattern.to_owned(),
            prefixes: Vec::new(),
            methods: unique,
            handler,
            name: None,
            domain: Domain::Root,
            matchers: Matchers::new(),
            layers: Vec::new(),
            meta: Map::new(),
            deleted: false,
        }
    }

    /// Declares a matcher for `param`. The first matcher declared for a param is kept, so a matcher
    /// set on the route wins over one set later by an enclosing group or resource.
    pub fn where_param(&mut self, param: &str, matcher: impl Into<ParamMatcher>) -> &mut Self {
        self.matchers.entry(param.to_owned()).or_insert_with(|| matcher.into());
        self
    }

    /// Adds a prefix. Prefixes added later end up further to the left.
    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        self.prefixes.push(prefix.to_owned());
        self
    }

    /// Sets the domain unless one was set already.
    pub fn domain(&mut self, domain: &str) -> &mut Self {
        if self.domain.is_root() {
            self.domain = Domain::from(domain);
        }
        self
    }

    pub fn domain_overwrite(&mut self, domain: &str) -> &mut Self {
        self.domain = Domain::from(domain);
        self
    }

    /// Appends a middleware, running after the middleware already declared.
    pub fn middleware(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        match self.layers.last_mut() {
            Some(Layer::Own(own)) => own.push(middleware.into()),
            _ => self.layers.push(Layer::Own(vec![middleware.into()])),
        }
        self
    }

    pub fn middlewares<I, M>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        for item in middleware {
            self.middleware(item);
        }
        self
    }

    pub fn as_name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Prepends `prefix.` to the route name.
    ///
    /// # Errors
    ///
    /// Fails when the route has no name yet.
    pub fn prepend_name(&mut self, prefix: &str) -> Result<&mut Self, RegistrationError> {
        let name = self.name.as_ref().ok_or_else(|| RegistrationError::missing_route_name(self.pattern()))?;
        self.name = Some(format!("{prefix}.{name}"));
        Ok(self)
    }

    pub fn meta(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.meta.insert(key.to_owned(), value.into());
        self
    }

    /// The pattern with every prefix applied.
    pub fn pattern(&self) -> String {
        let prefix: String = self.prefixes.iter().rev().map(|prefix| drop_slash(prefix)).collect();
        let pattern = drop_slash(&self.pattern);
        match (prefix.is_empty(), pattern.is_empty()) {
            (true, true) => "/".to_owned(),
            (_, true) => prefix,
            _ => prefix + &pattern,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn domain_pattern(&self) -> &Domain {
        &self.domain
    }

    pub fn handler(&self) -> Option<&HandlerRef> {
        self.handler.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn raw_pattern(&self) -> &str {
        &self.pattern
    }

    pub(crate) fn set_raw_pattern(&mut self, pattern: String) {
        self.pattern = pattern;
    }

    pub(crate) fn set_handler(&mut self, handler: HandlerRef) {
        self.handler = Some(handler);
    }

    pub(crate) fn mark_as_deleted(&mut self) {
        self.deleted = true;
    }

    pub(crate) fn share_stack(&mut self, stack: StackId) {
        self.layers.insert(0, Layer::Shared(stack));
    }

    pub(crate) fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn into_parts(self) -> RouteParts {
        let pattern = self.pattern();
        RouteParts {
            pattern,
            methods: self.methods,
            handler: self.handler,
            name: self.name,
            domain: self.domain,
            matchers: self.matchers,
            meta: self.meta,
        }
    }
}

pub(crate) struct RouteParts {
    pub(crate) pattern: String,
    pub(crate) methods: Vec<Method>,
    pub(crate) handler: Option<HandlerRef>,
    pub(crate) name: Option<String>,
    pub(crate) domain: Domain,
    pub(crate) matchers: Matchers,
    pub(crate) meta: Map<String, Value>,
}

/// `/posts/` and `posts` both become `/posts`, `/` becomes empty.
fn drop_slash(input: &str) -> String {
    let trimmed = input.strip_prefix('/').unwrap_or(input);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() { String::new() } else { format!("/{trimmed}") }
}

/// An immutable route, produced when the router is committed.
pub struct RouteDescriptor {
    pub(crate) index: usize,
    pub(crate) pattern: String,
    pub(crate) tokens: Vec<Token>,
    pub(crate) methods: Vec<Method>,
    pub(crate) domain: Domain,
    pub(crate) name: Option<String>,
    pub(crate) handler: Arc<dyn RequestHandler>,
    pub(crate) handler_reference: Option<String>,
    pub(crate) middleware: Arc<[ResolvedMiddleware]>,
    pub(crate) meta: Map<String, Value>,
}

impl RouteDescriptor {
    /// Registration order, unique per committed router.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }

    /// `Controller.action` for controller routes.
    pub fn handler_reference(&self) -> Option<&str> {
        self.handler_reference.as_deref()
    }

    /// Router and route middleware, in execution order.
    pub fn middleware(&self) -> &[ResolvedMiddleware] {
        &self.middleware
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// Names of the params declared by the pattern.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter(|token| token.is_param()).map(Token::value)
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("pattern", &self.pattern)
            .field("methods", &self.methods)
            .field("domain", &self.domain)
            .field("name", &self.name)
            .field("handler", &self.handler_reference)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}
