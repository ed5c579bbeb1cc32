use crate::error::{BoxError, RegistrationError};
use crate::fn_trait::ContextFn;
use crate::request::HttpContext;
use crate::resolver::Resolver;
use crate::responder::Responder;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Action invoked when a controller reference names no method.
pub const DEFAULT_ACTION: &str = "handle";

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: &mut HttpContext) -> Result<(), BoxError>;
}

#[async_trait]
impl<T: RequestHandler + ?Sized> RequestHandler for Arc<T> {
    async fn invoke(&self, ctx: &mut HttpContext) -> Result<(), BoxError> {
        (**self).invoke(ctx).await
    }
}

/// a `ContextFn` holder which represents any async fn taking the context
pub struct FnHandler<F, O> {
    f: F,
    _phantom: PhantomData<fn() -> O>,
}

impl<F, O> FnHandler<F, O>
where
    F: for<'a> ContextFn<'a, Output = O>,
{
    fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

pub fn handler_fn<F, O>(f: F) -> FnHandler<F, O>
where
    F: for<'a> ContextFn<'a, Output = O>,
{
    FnHandler::new(f)
}

impl<F, O> fmt::Debug for FnHandler<F, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

#[async_trait]
impl<F, O> RequestHandler for FnHandler<F, O>
where
    F: for<'a> ContextFn<'a, Output = O>,
    O: Responder,
{
    async fn invoke(&self, ctx: &mut HttpContext) -> Result<(), BoxError> {
        let responder = self.f.call(ctx).await;
        if ctx.response().is_finalized() {
            // the handler wrote the response itself, only surface a failure
            return responder.respond_to(&mut HttpResponse::new());
        }
        responder.respond_to(ctx.response_mut())
    }
}

/// A named group of actions, resolved through a [`Resolver`].
#[async_trait]
pub trait Controller: Send + Sync {
    async fn call(&self, action: &str, ctx: &mut HttpContext) -> Result<(), BoxError>;
}

pub(crate) struct ControllerAction {
    controller: Arc<dyn Controller>,
    action: String,
}

#[async_trait]
impl RequestHandler for ControllerAction {
    async fn invoke(&self, ctx: &mut HttpContext) -> Result<(), BoxError> {
        self.controller.call(&self.action, ctx).await
    }
}

/// What a route invokes once it matched: a function, or a `Controller.action` reference.
#[derive(Clone)]
pub enum HandlerRef {
    Function(Arc<dyn RequestHandler>),
    Controller { controller: String, action: String },
}

impl HandlerRef {
    pub fn function(handler: impl RequestHandler + 'static) -> Self {
        Self::Function(Arc::new(handler))
    }

    pub fn controller(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Controller { controller: controller.into(), action: action.into() }
    }

    /// The `Controller.action` string of a controller reference.
    pub fn reference(&self) -> Option<String> {
        match self {
            Self::Function(_) => None,
            Self::Controller { controller, action } => Some(format!("{controller}.{action}")),
        }
    }

    pub(crate) fn resolve(&self, resolver: Option<&dyn Resolver>) -> Result<Arc<dyn RequestHandler>, RegistrationError> {
        match self {
            Self::Function(handler) => Ok(Arc::clone(handler)),
            Self::Controller { controller, action } => {
                let resolved = resolver
                    .and_then(|resolver| resolver.controller(controller))
                    .ok_or_else(|| RegistrationError::cannot_resolve(controller))?;
                Ok(Arc::new(ControllerAction { controller: resolved, action: action.clone() }))
            }
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("HandlerRef::Function"),
            Self::Controller { controller, action } => write!(f, "HandlerRef::Controller({controller}.{action})"),
        }
    }
}

/// Parses `Controller.action`, the action defaults to `handle`.
impl From<&str> for HandlerRef {
    fn from(reference: &str) -> Self {
        match reference.rsplit_once('.') {
            Some((controller, action)) => Self::controller(controller, action),
            None => Self::controller(reference, DEFAULT_ACTION),
        }
    }
}

impl From<String> for HandlerRef {
    fn from(reference: String) -> Self {
        Self::from(reference.as_str())
    }
}

impl From<Arc<dyn RequestHandler>> for HandlerRef {
    fn from(handler: Arc<dyn RequestHandler>) -> Self {
        Self::Function(handler)
    }
}

impl<F, O> From<FnHandler<F, O>> for HandlerRef
where
    FnHandler<F, O>: RequestHandler + 'static,
{
    fn from(handler: FnHandler<F, O>) -> Self {
        Self::function(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MapResolver;
    use crate::router::Router;
    use bytes::Bytes;
    use http::{Request, StatusCode};
    use std::io;

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    fn context() -> HttpContext {
        let routes = Arc::new(Router::new().commit().unwrap());
        let request = Request::builder().uri("/").body(Bytes::new()).unwrap();
        HttpContext::new(crate::HttpRequest::new(request, false), routes)
    }

    async fn hello(_ctx: &mut HttpContext) -> &'static str {
        "hello"
    }

    async fn writes_itself(ctx: &mut HttpContext) -> &'static str {
        ctx.response_mut().set_status(StatusCode::ACCEPTED).text("from ctx");
        "ignored"
    }

    async fn fails(_ctx: &mut HttpContext) -> Result<String, io::Error> {
        Err(io::Error::other("boom"))
    }

    #[test]
    fn assert_fn_is_request_handler() {
        assert_is_handler(&handler_fn(hello));
        assert_is_handler(&handler_fn(fails));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_fn_handler_writes_output() {
        let mut ctx = context();
        handler_fn(hello).invoke(&mut ctx).await.unwrap();
        assert_eq!(ctx.response().body().as_bytes(), Some(&Bytes::from("hello")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_finalized_response_wins() {
        let mut ctx = context();
        handler_fn(writes_itself).invoke(&mut ctx).await.unwrap();
        assert_eq!(ctx.response().status(), StatusCode::ACCEPTED);
        assert_eq!(ctx.response().body().as_bytes(), Some(&Bytes::from("from ctx")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_fn_handler_raises_err() {
        let mut ctx = context();
        let error = handler_fn(fails).invoke(&mut ctx).await.unwrap_err();
        assert_eq!(error.to_string(), "boom");
    }

    #[test]
    fn test_parse_controller_reference() {
        let reference = HandlerRef::from("PostsController.index");
        assert_eq!(reference.reference().as_deref(), Some("PostsController.index"));

        let reference = HandlerRef::from("admin.PostsController.show");
        assert!(matches!(reference, HandlerRef::Controller { ref controller, ref action }
            if controller == "admin.PostsController" && action == "show"));

        let reference = HandlerRef::from("HealthController");
        assert_eq!(reference.reference().as_deref(), Some("HealthController.handle"));
    }

    struct Posts;

    #[async_trait]
    impl Controller for Posts {
        async fn call(&self, action: &str, ctx: &mut HttpContext) -> Result<(), BoxError> {
            ctx.response_mut().text(format!("posts.{action}"));
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_resolve_controller() {
        let resolver = MapResolver::new().with_controller("PostsController", Posts);
        let handler = HandlerRef::from("PostsController.show").resolve(Some(&resolver)).unwrap();

        let mut ctx = context();
        handler.invoke(&mut ctx).await.unwrap();
        assert_eq!(ctx.response().body().as_bytes(), Some(&Bytes::from("posts.show")));

        let error = HandlerRef::from("UsersController.show").resolve(Some(&resolver)).err().unwrap();
        assert!(matches!(error, RegistrationError::CannotResolve { ref reference } if reference == "UsersController"));
    }
}
