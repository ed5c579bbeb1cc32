//! Request routing and middleware dispatch.
//!
//! Routes are declared on a [`Router`], alone or through groups, resources and brisk routes, then
//! committed into an immutable [`Routes`] table. A [`Server`] matches requests against that table,
//! runs the middleware chain of the matched route and its handler, and builds the response.
//!
//! ```
//! use micro_router::{HttpContext, Router, Server, handler_fn};
//!
//! async fn show(ctx: &mut HttpContext) -> String {
//!     format!("post {}", ctx.params().get_str("id").unwrap_or_default())
//! }
//!
//! let mut router = Router::new();
//! router.get("/posts/:id", handler_fn(show)).as_name("posts.show");
//!
//! let server = Server::builder().router(router).build().unwrap();
//! assert_eq!(server.routes().make_url("posts.show", [1]).unwrap(), "/posts/1");
//! ```

mod body;
mod config;
mod error;
mod fn_trait;
mod handler;
mod request;
mod resolver;
mod responder;
mod response;
mod routes;
mod server;
mod signature;
mod store;

pub mod lookup;
pub mod middleware;
pub mod router;

pub use body::ResponseBody;
pub use config::ServerConfig;
pub use error::{BoxError, HttpError, RegistrationError, UrlError};
pub use fn_trait::ContextFn;
pub use handler::{Controller, DEFAULT_ACTION, FnHandler, HandlerRef, RequestHandler, handler_fn};
pub use lookup::url_builder::{UrlBuilder, UrlParams};
pub use lookup::{LookupEntry, LookupStore};
pub use middleware::{Middleware, MiddlewareRef, NamedMiddleware, Next, middleware_fn};
pub use request::{HttpContext, HttpRequest, METHOD_SPOOF_FIELD, RouteParams};
pub use resolver::{MapResolver, Resolver};
pub use responder::{Json, Responder};
pub use response::HttpResponse;
pub use router::Router;
pub use router::route::{Domain, Route, RouteDescriptor};
pub use routes::Routes;
pub use server::{DefaultErrorHandler, ErrorHandler, Server, ServerBuildError, ServerBuilder};
pub use signature::{Encryption, MessageVerifier, SIGNATURE_FIELD, SignedUrlOptions};
pub use store::{DomainMatch, MatchResult, RoutesStore};
