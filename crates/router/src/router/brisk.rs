use crate::error::BoxError;
use crate::handler::{HandlerRef, RequestHandler};
use crate::lookup::url_builder::UrlParams;
use crate::request::HttpContext;
use crate::router::route::Route;
use async_trait::async_trait;
use http::StatusCode;

/// A `GET` route declared by its pattern alone, its handler being set afterwards.
///
/// ```
/// use micro_router::Router;
///
/// let mut router = Router::new();
/// router.on("/blog").redirect_to_path("https://blog.example.com");
/// router.on("/articles/:id").redirect("posts.show", None);
/// ```
///
/// A brisk route whose handler is never set is left out of the committed routes.
#[derive(Debug)]
pub struct Brisk<'r> {
    route: &'r mut Route,
}

impl<'r> Brisk<'r> {
    pub(crate) fn new(route: &'r mut Route) -> Self {
        Self { route }
    }

    pub fn set_handler(self, handler: impl Into<HandlerRef>) -> &'r mut Route {
        self.route.set_handler(handler.into());
        self.route
    }

    /// Redirects to the url of another route, built with `params` or with the params of the
    /// incoming request.
    pub fn redirect(self, identifier: &str, params: Option<UrlParams>) -> &'r mut Route {
        self.set_handler(HandlerRef::function(RedirectToRoute {
            identifier: identifier.to_owned(),
            params,
            status: None,
        }))
    }

    pub fn redirect_with_status(self, identifier: &str, params: Option<UrlParams>, status: StatusCode) -> &'r mut Route {
        self.set_handler(HandlerRef::function(RedirectToRoute {
            identifier: identifier.to_owned(),
            params,
            status: Some(status),
        }))
    }

    pub fn redirect_to_path(self, url: &str) -> &'r mut Route {
        self.set_handler(HandlerRef::function(RedirectToPath { url: url.to_owned() }))
    }
}

struct RedirectToRoute {
    identifier: String,
    params: Option<UrlParams>,
    status: Option<StatusCode>,
}

#[async_trait]
impl RequestHandler for RedirectToRoute {
    async fn invoke(&self, ctx: &mut HttpContext) -> Result<(), BoxError> {
        let status = self.status.unwrap_or(ctx.redirect_status());
        ctx.redirect_to_route(&self.identifier, self.params.clone(), status)
    }
}

struct RedirectToPath {
    url: String,
}

#[async_trait]
impl RequestHandler for RedirectToPath {
    async fn invoke(&self, ctx: &mut HttpContext) -> Result<(), BoxError> {
        let status = ctx.redirect_status();
        ctx.response_mut().redirect_to(&self.url, status)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::handler::handler_fn;
    use crate::lookup::url_builder::UrlParams;
    use crate::request::{HttpContext, HttpRequest};
    use crate::router::Router;
    use bytes::Bytes;
    use http::{Method, Request, StatusCode, header};
    use std::sync::Arc;

    async fn show(_ctx: &mut HttpContext) -> &'static str {
        "post"
    }

    async fn dispatch(routes: &Arc<crate::Routes>, uri: &str) -> http::Response<crate::ResponseBody> {
        let request = HttpRequest::new(Request::builder().uri(uri).body(Bytes::new()).unwrap(), false);
        let matched = routes.match_route(request.path(), request.method(), None).unwrap();
        let route = Arc::clone(&matched.route);
        let mut ctx = HttpContext::new(request, Arc::clone(routes));
        ctx.set_route(matched);
        route.handler().invoke(&mut ctx).await.unwrap();
        ctx.into_response()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_redirect_forwards_params() {
        let mut router = Router::new();
        router.get("/posts/:id", handler_fn(show)).as_name("posts.show");
        router.on("/articles/:id").redirect("posts.show", None);
        router.on("/latest").redirect("posts.show", Some(UrlParams::positional([42])));
        router.on("/home").redirect_to_path("/").as_name("home");
        let routes = Arc::new(router.commit().unwrap());

        let response = dispatch(&routes, "/articles/7").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/posts/7");

        let response = dispatch(&routes, "/latest").await;
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/posts/42");

        let response = dispatch(&routes, "/home").await;
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[test]
    fn test_brisk_without_handler_is_skipped() {
        let mut router = Router::new();
        let _ = router.on("/pending");
        let routes = router.commit().unwrap();

        assert!(routes.match_route("/pending", &Method::GET, None).is_none());
        assert!(routes.store().is_empty());
    }
}
