use crate::request::HttpContext;
use std::future::Future;

/// Represents an async function borrowing the request context
///
/// the returned future may hold the borrow of the context, while its output must not:
/// ```no_run
/// use micro_router::HttpContext;
///
/// async fn show(ctx: &mut HttpContext) -> String {
///     format!("post {}", ctx.params().get_str("id").unwrap_or_default())
/// }
/// ```
pub trait ContextFn<'a>: Send + Sync {
    type Output;
    type Future: Future<Output = Self::Output> + Send + 'a;

    fn call(&self, ctx: &'a mut HttpContext) -> Self::Future;
}

impl<'a, Func, Fut> ContextFn<'a> for Func
where
    Func: Fn(&'a mut HttpContext) -> Fut + Send + Sync,
    Fut: Future + Send + 'a,
{
    type Output = Fut::Output;
    type Future = Fut;

    #[inline]
    fn call(&self, ctx: &'a mut HttpContext) -> Self::Future {
        (self)(ctx)
    }
}
