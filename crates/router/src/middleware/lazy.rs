use crate::error::BoxError;
use crate::middleware::{Middleware, Next};
use crate::request::HttpContext;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type Loader = Box<dyn Fn() -> Arc<dyn Middleware> + Send + Sync>;

/// A middleware built by its loader the first time a request reaches it, then reused.
pub struct LazyMiddleware {
    loader: Loader,
    instance: OnceCell<Arc<dyn Middleware>>,
}

impl LazyMiddleware {
    pub fn new<L>(loader: L) -> Self
    where
        L: Fn() -> Arc<dyn Middleware> + Send + Sync + 'static,
    {
        Self { loader: Box::new(loader), instance: OnceCell::new() }
    }

    pub fn is_loaded(&self) -> bool {
        self.instance.get().is_some()
    }

    fn instance(&self) -> &Arc<dyn Middleware> {
        self.instance.get_or_init(|| {
            debug!("loading lazy middleware");
            (self.loader)()
        })
    }
}

impl fmt::Debug for LazyMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyMiddleware").field("loaded", &self.is_loaded()).finish()
    }
}

#[async_trait]
impl Middleware for LazyMiddleware {
    async fn handle(&self, ctx: &mut HttpContext, next: Next<'_>, args: &[String]) -> Result<(), BoxError> {
        self.instance().handle(ctx, next, args).await
    }
}
