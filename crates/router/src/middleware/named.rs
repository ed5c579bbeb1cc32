use crate::middleware::MiddlewareRef;
use std::collections::HashMap;

/// Registry of middleware referenced by name, as in `route.middleware("auth:web")`.
#[derive(Debug, Clone, Default)]
pub struct NamedMiddleware {
    inner: HashMap<String, MiddlewareRef>,
}

impl NamedMiddleware {
    pub fn builder() -> NamedMiddlewareBuilder {
        NamedMiddlewareBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&MiddlewareRef> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }
}

#[derive(Debug)]
pub struct NamedMiddlewareBuilder {
    inner: HashMap<String, MiddlewareRef>,
}

impl NamedMiddlewareBuilder {
    fn new() -> Self {
        Self { inner: HashMap::new() }
    }

    /// Registers `middleware` under `name`, replacing any previous registration.
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, middleware: impl Into<MiddlewareRef>) -> Self {
        self.inner.insert(name.into(), middleware.into());
        self
    }

    pub fn build(self) -> NamedMiddleware {
        NamedMiddleware { inner: self.inner }
    }
}
