//! The request dispatcher.
//!
//! [`Server::handle`] matches a request against the committed routes, runs the server middleware,
//! the route middleware and the route handler as one chain, and hands any error to the
//! [`ErrorHandler`]. Requests matching no route still run the server middleware before failing
//! with [`HttpError::RouteNotFound`].

use crate::body::ResponseBody;
use crate::config::ServerConfig;
use crate::error::{BoxError, HttpError, RegistrationError};
use crate::handler::RequestHandler;
use crate::middleware::{MiddlewareRef, Next, ResolvedMiddleware, compose};
use crate::request::{HttpContext, HttpRequest};
use crate::router::Router;
use crate::routes::Routes;
use crate::signature::MessageVerifier;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Turns an error raised while handling a request into a response.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle(&self, error: BoxError, ctx: &mut HttpContext);
}

/// Answers `404 Not Found` for unmatched routes and `500 Internal Server Error` otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorHandler;

#[async_trait]
impl ErrorHandler for DefaultErrorHandler {
    async fn handle(&self, error: BoxError, ctx: &mut HttpContext) {
        let status = match error.downcast_ref::<HttpError>() {
            Some(HttpError::RouteNotFound { .. }) => {
                warn!(cause = %error, "route not found");
                StatusCode::NOT_FOUND
            }
            _ => {
                error!(cause = %error, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = if status == StatusCode::NOT_FOUND {
            error.to_string()
        } else {
            status.canonical_reason().unwrap_or_default().to_owned()
        };
        ctx.response_mut().reset().set_status(status).text(message);
    }
}

/// Final handler of requests that matched no route.
struct RouteNotFound;

#[async_trait]
impl RequestHandler for RouteNotFound {
    async fn invoke(&self, ctx: &mut HttpContext) -> Result<(), BoxError> {
        let request = ctx.request();
        Err(HttpError::route_not_found(request.method(), request.path()).into())
    }
}

pub struct ServerBuilder {
    router: Option<Router>,
    middleware: Vec<MiddlewareRef>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    config: ServerConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, middleware: Vec::new(), error_handler: None, config: ServerConfig::default() }
    }

    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Adds server middleware, which runs for every request, matched or not.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    #[must_use]
    pub fn error_handler(mut self, error_handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(error_handler));
        self
    }

    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Commits the router and prepares the middleware chain of every route.
    ///
    /// # Errors
    ///
    /// Fails when no router was set, when the app key cannot build a signer, or when the routes
    /// or the server middleware cannot be committed.
    pub fn build(self) -> Result<Server, ServerBuildError> {
        let mut router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        if let Some(app_key) = &self.config.app_key {
            if !router.has_signer() {
                router.signer(MessageVerifier::new(app_key).map_err(|_| ServerBuildError::InvalidAppKey)?);
            }
        }

        let routes = Arc::new(router.commit()?);
        let global: Arc<[ResolvedMiddleware]> = routes.resolve_middleware(&self.middleware)?.into();
        let chains = routes
            .store()
            .routes()
            .iter()
            .map(|route| (route.index(), compose(&global, route.middleware())))
            .collect::<HashMap<_, _>>();

        info!(routes = routes.store().len(), server_middleware = global.len(), "server ready");
        Ok(Server {
            routes,
            global,
            chains,
            error_handler: self.error_handler.unwrap_or_else(|| Arc::new(DefaultErrorHandler)),
            redirect_status: self.config.redirect_status(),
            config: self.config,
        })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("router", &self.router)
            .field("middleware", &self.middleware.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("app key cannot sign urls")]
    InvalidAppKey,
    #[error("cannot commit routes: {source}")]
    Registration {
        #[from]
        source: RegistrationError,
    },
}

pub struct Server {
    routes: Arc<Routes>,
    global: Arc<[ResolvedMiddleware]>,
    chains: HashMap<usize, Arc<[ResolvedMiddleware]>>,
    error_handler: Arc<dyn ErrorHandler>,
    redirect_status: StatusCode,
    config: ServerConfig,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Installs a `tracing` subscriber printing events up to `level`.
    pub fn init_tracing(level: Level) {
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            warn!(cause = %e, "tracing subscriber already installed");
        }
    }

    pub fn routes(&self) -> &Arc<Routes> {
        &self.routes
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn handle(&self, request: Request<Bytes>) -> Response<ResponseBody> {
        let request = HttpRequest::new(request, self.config.allow_method_spoofing);
        let matched = self.routes.match_route(request.path(), request.method(), request.hostname());
        let mut ctx = HttpContext::new(request, Arc::clone(&self.routes)).with_redirect_status(self.redirect_status);

        let result = match matched {
            Some(matched) => {
                let route = Arc::clone(&matched.route);
                let chain = self.chains.get(&route.index()).map_or_else(|| Arc::clone(&self.global), Arc::clone);
                ctx.set_route(matched);
                debug!(route_key = ctx.route_key(), middleware = chain.len(), "dispatching");
                Next::new(&chain, route.handler()).run(&mut ctx).await
            }
            None => Next::new(&self.global, &RouteNotFound).run(&mut ctx).await,
        };

        if let Err(error) = result {
            self.error_handler.handle(error, &mut ctx).await;
        }
        ctx.into_response()
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("routes", &self.routes)
            .field("server_middleware", &self.global.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
