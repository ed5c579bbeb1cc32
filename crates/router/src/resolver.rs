//! Resolution of string references into controllers and middleware.

use crate::handler::Controller;
use crate::middleware::Middleware;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolves controller and middleware references when routes are committed.
#[cfg_attr(test, mockall::automock)]
pub trait Resolver: Send + Sync {
    fn controller(&self, reference: &str) -> Option<Arc<dyn Controller>>;

    fn middleware(&self, reference: &str) -> Option<Arc<dyn Middleware>>;
}

/// A [`Resolver`] backed by two maps.
#[derive(Default, Clone)]
pub struct MapResolver {
    controllers: HashMap<String, Arc<dyn Controller>>,
    middleware: HashMap<String, Arc<dyn Middleware>>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_controller(mut self, reference: impl Into<String>, controller: impl Controller + 'static) -> Self {
        self.controllers.insert(reference.into(), Arc::new(controller));
        self
    }

    #[must_use]
    pub fn with_middleware(mut self, reference: impl Into<String>, middleware: impl Middleware + 'static) -> Self {
        self.middleware.insert(reference.into(), Arc::new(middleware));
        self
    }
}

impl Resolver for MapResolver {
    fn controller(&self, reference: &str) -> Option<Arc<dyn Controller>> {
        self.controllers.get(reference).map(Arc::clone)
    }

    fn middleware(&self, reference: &str) -> Option<Arc<dyn Middleware>> {
        self.middleware.get(reference).map(Arc::clone)
    }
}

impl fmt::Debug for MapResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapResolver")
            .field("controllers", &self.controllers.keys().collect::<Vec<_>>())
            .field("middleware", &self.middleware.keys().collect::<Vec<_>>())
            .finish()
    }
}
