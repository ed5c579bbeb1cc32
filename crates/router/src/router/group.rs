use crate::error::RegistrationError;
use crate::middleware::MiddlewareRef;
use crate::router::Router;
use crate::router::matcher::ParamMatcher;

/// A group of routes sharing a prefix, a domain, param matchers, a name prefix or middleware.
///
/// Settings apply to every route declared inside the group's closure, nested groups and resources
/// included. Groups compose outward: the prefix of an outer group ends up left of an inner one, and
/// middleware of an outer group runs before middleware of an inner one.
#[derive(Debug)]
pub struct Group<'r> {
    router: &'r mut Router,
    id: usize,
}

impl<'r> Group<'r> {
    pub(crate) fn new(router: &'r mut Router, id: usize) -> Self {
        Self { router, id }
    }

    #[must_use]
    pub fn prefix(mut self, prefix: &str) -> Self {
        for route in self.router.group_routes(self.id) {
            self.router.route_mut(route).prefix(prefix);
        }
        self
    }

    /// Sets the domain of every route that has none yet.
    #[must_use]
    pub fn domain(mut self, domain: &str) -> Self {
        for route in self.router.group_routes(self.id) {
            self.router.route_mut(route).domain(domain);
        }
        self
    }

    #[must_use]
    pub fn where_param(mut self, param: &str, matcher: impl Into<ParamMatcher>) -> Self {
        let matcher = matcher.into();
        for route in self.router.group_routes(self.id) {
            self.router.route_mut(route).where_param(param, matcher.clone());
        }
        self
    }

    /// Prepends `name.` to the name of every route.
    ///
    /// # Errors
    ///
    /// Fails, leaving every name untouched, when a route of the group has no name.
    pub fn as_name(mut self, name: &str) -> Result<Self, RegistrationError> {
        let routes = self.router.group_routes(self.id);
        let unnamed = routes.iter().map(|route| self.router.route_ref(*route)).find(|route| route.name().is_none());
        if let Some(route) = unnamed {
            return Err(RegistrationError::missing_route_name(route.pattern()));
        }
        for route in routes {
            self.router.route_mut(route).prepend_name(name)?;
        }
        Ok(self)
    }

    /// Adds middleware running before the middleware of the routes, and after the middleware of
    /// any enclosing group.
    #[must_use]
    pub fn middleware(self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middlewares([middleware])
    }

    #[must_use]
    pub fn middlewares<I, M>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        let stack = self.router.group_stack(self.id);
        self.router.stack_mut(stack).extend(middleware.into_iter().map(Into::into));
        self
    }
}
