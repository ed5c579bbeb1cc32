//! Middleware and the onion-style pipeline running them.
//!
//! Every middleware receives the context and a [`Next`] continuation. Calling [`Next::run`] hands
//! control to the rest of the chain, which ends with the route handler; returning without calling
//! it stops the request there, and code placed after the call runs once the downstream work is done.
//!
//! Middleware is declared through a [`MiddlewareRef`] and turned into [`ResolvedMiddleware`] when
//! routes are committed.

mod lazy;
mod named;

pub use lazy::LazyMiddleware;
pub use named::{NamedMiddleware, NamedMiddlewareBuilder};

use crate::error::{BoxError, RegistrationError};
use crate::handler::RequestHandler;
use crate::request::HttpContext;
use crate::resolver::Resolver;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut HttpContext, next: Next<'_>, args: &[String]) -> Result<(), BoxError>;
}

/// The remaining middleware of a chain followed by the final handler.
pub struct Next<'chain> {
    chain: &'chain [ResolvedMiddleware],
    handler: &'chain dyn RequestHandler,
}

impl<'chain> Next<'chain> {
    pub fn new(chain: &'chain [ResolvedMiddleware], handler: &'chain dyn RequestHandler) -> Self {
        Self { chain, handler }
    }

    /// Runs the next middleware, or the handler once the chain is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised downstream.
    pub async fn run(self, ctx: &mut HttpContext) -> Result<(), BoxError> {
        match self.chain.split_first() {
            Some((current, rest)) => {
                let next = Next { chain: rest, handler: self.handler };
                current.middleware.handle(ctx, next, &current.args).await
            }
            None => self.handler.invoke(ctx).await,
        }
    }

    /// Number of middleware left before the handler.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("remaining", &self.chain.len()).finish()
    }
}

/// a closure holder which represents a middleware
pub struct FnMiddleware<F> {
    f: F,
}

pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut HttpContext, Next<'a>, &'a [String]) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    FnMiddleware { f }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnMiddleware")
    }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut HttpContext, Next<'a>, &'a [String]) -> BoxFuture<'a, Result<(), BoxError>>
        + Send
        + Sync
        + 'static,
{
    async fn handle(&self, ctx: &mut HttpContext, next: Next<'_>, args: &[String]) -> Result<(), BoxError> {
        (self.f)(ctx, next, args).await
    }
}

/// A middleware as declared on the router, a group or a route.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// A middleware instance.
    Function(Arc<dyn Middleware>),
    /// A reference resolved through the [`Resolver`].
    Class(String),
    /// A middleware constructed on first use.
    Lazy(Arc<LazyMiddleware>),
    /// A reference to the named middleware registry, with its arguments.
    Named { name: String, args: Vec<String> },
}

impl MiddlewareRef {
    pub fn function(middleware: impl Middleware + 'static) -> Self {
        Self::Function(Arc::new(middleware))
    }

    pub fn class(reference: impl Into<String>) -> Self {
        Self::Class(reference.into())
    }

    pub fn lazy<L>(loader: L) -> Self
    where
        L: Fn() -> Arc<dyn Middleware> + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(LazyMiddleware::new(loader)))
    }

    /// Parses `name` or `name:arg1,arg2`.
    pub fn named(reference: &str) -> Self {
        match reference.split_once(':') {
            Some((name, args)) => Self::Named {
                name: name.trim().to_owned(),
                args: args.split(',').map(str::trim).filter(|arg| !arg.is_empty()).map(str::to_owned).collect(),
            },
            None => Self::Named { name: reference.trim().to_owned(), args: Vec::new() },
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("MiddlewareRef::Function"),
            Self::Class(reference) => f.debug_tuple("MiddlewareRef::Class").field(reference).finish(),
            Self::Lazy(_) => f.write_str("MiddlewareRef::Lazy"),
            Self::Named { name, args } => {
                f.debug_struct("MiddlewareRef::Named").field("name", name).field("args", args).finish()
            }
        }
    }
}

/// Strings refer to the named middleware registry.
impl From<&str> for MiddlewareRef {
    fn from(reference: &str) -> Self {
        Self::named(reference)
    }
}

impl From<String> for MiddlewareRef {
    fn from(reference: String) -> Self {
        Self::named(&reference)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareRef {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        Self::Function(middleware)
    }
}

impl<F> From<FnMiddleware<F>> for MiddlewareRef
where
    FnMiddleware<F>: Middleware + 'static,
{
    fn from(middleware: FnMiddleware<F>) -> Self {
        Self::function(middleware)
    }
}

/// A middleware ready to run, with the arguments it was referenced with.
#[derive(Clone)]
pub struct ResolvedMiddleware {
    name: Option<Arc<str>>,
    middleware: Arc<dyn Middleware>,
    args: Arc<[String]>,
}

impl ResolvedMiddleware {
    pub fn new(middleware: Arc<dyn Middleware>) -> Self {
        Self { name: None, middleware, args: Arc::from(Vec::new()) }
    }

    /// The registry name, for named middleware.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Debug for ResolvedMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedMiddleware").field("name", &self.name).field("args", &self.args).finish()
    }
}

/// Turns [`MiddlewareRef`]s into [`ResolvedMiddleware`].
#[derive(Clone, Copy)]
pub(crate) struct MiddlewareResolver<'a> {
    named: &'a NamedMiddleware,
    resolver: Option<&'a dyn Resolver>,
}

impl<'a> MiddlewareResolver<'a> {
    pub(crate) fn new(named: &'a NamedMiddleware, resolver: Option<&'a dyn Resolver>) -> Self {
        Self { named, resolver }
    }

    pub(crate) fn resolve(&self, middleware: &MiddlewareRef) -> Result<ResolvedMiddleware, RegistrationError> {
        match middleware {
            MiddlewareRef::Named { name, args } => {
                let target = self.named.get(name).ok_or_else(|| RegistrationError::missing_named_middleware(name))?;
                if matches!(target, MiddlewareRef::Named { .. }) {
                    return Err(RegistrationError::missing_named_middleware(name));
                }
                let mut resolved = self.resolve(target)?;
                resolved.name = Some(Arc::from(name.as_str()));
                resolved.args = Arc::from(args.clone());
                Ok(resolved)
            }
            MiddlewareRef::Function(middleware) => Ok(ResolvedMiddleware::new(Arc::clone(middleware))),
            MiddlewareRef::Lazy(lazy) => {
                let middleware: Arc<dyn Middleware> = Arc::<LazyMiddleware>::clone(lazy);
                Ok(ResolvedMiddleware::new(middleware))
            }
            MiddlewareRef::Class(reference) => self
                .resolver
                .and_then(|resolver| resolver.middleware(reference))
                .map(ResolvedMiddleware::new)
                .ok_or_else(|| RegistrationError::cannot_resolve(reference)),
        }
    }

    pub(crate) fn resolve_all<'m, I>(&self, middleware: I) -> Result<Vec<ResolvedMiddleware>, RegistrationError>
    where
        I: IntoIterator<Item = &'m MiddlewareRef>,
    {
        middleware.into_iter().map(|middleware| self.resolve(middleware)).collect()
    }
}

/// Concatenates two chains, `outer` running first.
pub(crate) fn compose(outer: &[ResolvedMiddleware], inner: &[ResolvedMiddleware]) -> Arc<[ResolvedMiddleware]> {
    outer.iter().chain(inner).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::request::HttpRequest;
    use crate::resolver::MapResolver;
    use crate::router::Router;
    use bytes::Bytes;
    use http::{Request, StatusCode};
    use std::sync::Mutex;

    fn context() -> HttpContext {
        let routes = Arc::new(Router::new().commit().unwrap());
        let request = Request::builder().uri("/").body(Bytes::new()).unwrap();
        HttpContext::new(HttpRequest::new(request, false), routes)
    }

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn handle(&self, ctx: &mut HttpContext, next: Next<'_>, args: &[String]) -> Result<(), BoxError> {
            self.log.lock().unwrap().push(format!("{} before {}", self.label, args.join(",")));
            next.run(ctx).await?;
            self.log.lock().unwrap().push(format!("{} after", self.label));
            Ok(())
        }
    }

    async fn handler(ctx: &mut HttpContext) -> &'static str {
        ctx.response_mut().set_status(StatusCode::OK);
        "handled"
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_onion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![
            ResolvedMiddleware::new(Arc::new(Recorder { label: "outer", log: Arc::clone(&log) })),
            ResolvedMiddleware::new(Arc::new(Recorder { label: "inner", log: Arc::clone(&log) })),
        ];
        let handler = handler_fn(handler);

        let mut ctx = context();
        Next::new(&chain, &handler).run(&mut ctx).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["outer before ", "inner before ", "inner after", "outer after"]);
        assert_eq!(ctx.response().body().as_bytes(), Some(&Bytes::from("handled")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_short_circuit() {
        let deny = middleware_fn(|ctx, _next, _args| {
            Box::pin(async move {
                ctx.response_mut().set_status(StatusCode::UNAUTHORIZED).text("denied");
                Ok(())
            })
        });
        let chain = vec![ResolvedMiddleware::new(Arc::new(deny))];
        let handler = handler_fn(handler);

        let mut ctx = context();
        Next::new(&chain, &handler).run(&mut ctx).await.unwrap();

        assert_eq!(ctx.response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ctx.response().body().as_bytes(), Some(&Bytes::from("denied")));
    }

    #[test]
    fn test_parse_named_reference() {
        let MiddlewareRef::Named { name, args } = MiddlewareRef::from("auth:web, api") else {
            panic!("expected a named reference");
        };
        assert_eq!(name, "auth");
        assert_eq!(args, vec!["web", "api"]);

        let MiddlewareRef::Named { name, args } = MiddlewareRef::from("throttle") else {
            panic!("expected a named reference");
        };
        assert_eq!(name, "throttle");
        assert!(args.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_resolve_named_with_args() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let named = NamedMiddleware::builder()
            .add("auth", MiddlewareRef::function(Recorder { label: "auth", log: Arc::clone(&log) }))
            .build();
        let resolver = MiddlewareResolver::new(&named, None);

        let resolved = resolver.resolve(&MiddlewareRef::from("auth:web,api")).unwrap();
        assert_eq!(resolved.name(), Some("auth"));
        assert_eq!(resolved.args(), ["web", "api"]);

        let chain = vec![resolved];
        let handler = handler_fn(handler);
        Next::new(&chain, &handler).run(&mut context()).await.unwrap();
        assert_eq!(log.lock().unwrap()[0], "auth before web,api");

        let error = resolver.resolve(&MiddlewareRef::from("missing")).err().unwrap();
        assert!(matches!(error, RegistrationError::MissingNamedMiddleware { ref name } if name == "missing"));
    }

    #[test]
    fn test_class_reference_needs_resolver() {
        let named = NamedMiddleware::default();
        let error = MiddlewareResolver::new(&named, None).resolve(&MiddlewareRef::class("LogRequests")).err().unwrap();
        assert!(matches!(error, RegistrationError::CannotResolve { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_class_reference_through_resolver() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let container = MapResolver::new().with_middleware("LogRequests", Recorder { label: "class", log: Arc::clone(&log) });
        let named = NamedMiddleware::default();

        let resolved = MiddlewareResolver::new(&named, Some(&container)).resolve(&MiddlewareRef::class("LogRequests")).unwrap();
        assert_eq!(resolved.name(), None);

        let chain = vec![resolved];
        let handler = handler_fn(handler);
        let mut ctx = context();
        Next::new(&chain, &handler).run(&mut ctx).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["class before ", "class after"]);
        assert_eq!(ctx.response().body().as_bytes(), Some(&Bytes::from("handled")));
    }

    #[test]
    fn test_compose_keeps_outer_first() {
        let outer = vec![ResolvedMiddleware::new(Arc::new(middleware_fn(|ctx, next, _| Box::pin(next.run(ctx)))))];
        let mut inner = vec![ResolvedMiddleware::new(Arc::new(middleware_fn(|ctx, next, _| Box::pin(next.run(ctx)))))];
        inner[0].name = Some(Arc::from("inner"));

        let chain = compose(&outer, &inner);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name(), None);
        assert_eq!(chain[1].name(), Some("inner"));
    }
}
