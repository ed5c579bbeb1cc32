//! The match engine.
//!
//! Routes are indexed by domain, then by method. Each method keeps its routes in registration order,
//! which is the order they are tried in: the first route whose tokens accept the url wins.

use crate::error::RegistrationError;
use crate::request::RouteParams;
use crate::router::route::{Domain, RouteDescriptor};
use crate::router::token::{self, Token};
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Default)]
struct MethodNode {
    entries: Vec<MethodEntry>,
    patterns: HashMap<String, usize>,
}

#[derive(Debug)]
struct MethodEntry {
    route: usize,
    route_key: Arc<str>,
}

#[derive(Debug)]
struct DomainPattern {
    domain: Domain,
    tokens: Vec<Token>,
}

/// A hostname accepted by a registered domain pattern.
#[derive(Debug, Clone)]
pub struct DomainMatch<'s> {
    domain: &'s Domain,
    subdomains: RouteParams,
}

impl DomainMatch<'_> {
    pub fn domain(&self) -> &Domain {
        self.domain
    }

    pub fn subdomains(&self) -> &RouteParams {
        &self.subdomains
    }
}

/// A route accepting a url.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub route: Arc<RouteDescriptor>,
    pub route_key: Arc<str>,
    pub params: RouteParams,
    pub subdomains: RouteParams,
}

#[derive(Debug, Default)]
pub struct RoutesStore {
    using_domains: bool,
    domain_patterns: Vec<DomainPattern>,
    domains: HashMap<Domain, HashMap<Method, MethodNode>>,
    routes: Vec<Arc<RouteDescriptor>>,
    route_keys: HashMap<Arc<str>, usize>,
}

impl RoutesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `route` under its domain and every one of its methods.
    ///
    /// # Errors
    ///
    /// Fails, registering nothing, when the domain pattern is invalid or when one of the route's
    /// methods already has a route with the same pattern on that domain.
    pub fn add(&mut self, route: RouteDescriptor) -> Result<Arc<RouteDescriptor>, RegistrationError> {
        if let Some(methods) = self.domains.get(&route.domain) {
            let taken = route
                .methods
                .iter()
                .find(|method| methods.get(*method).is_some_and(|node| node.patterns.contains_key(&route.pattern)));
            if let Some(method) = taken {
                return Err(RegistrationError::duplicate_route(method, &route.pattern));
            }
        }

        if let Domain::Named(pattern) = &route.domain {
            if !self.domains.contains_key(&route.domain) {
                let tokens = token::parse(pattern)?;
                self.domain_patterns.push(DomainPattern { domain: route.domain.clone(), tokens });
                self.using_domains = true;
            }
        }

        let index = self.routes.len();
        let route = Arc::new(route);
        let methods = self.domains.entry(route.domain.clone()).or_default();
        for method in &route.methods {
            let route_key: Arc<str> = match &route.domain {
                Domain::Root => format!("{method}-{}", route.pattern).into(),
                Domain::Named(domain) => format!("{domain}-{method}-{}", route.pattern).into(),
            };
            let node = methods.entry(method.clone()).or_default();
            node.patterns.insert(route.pattern.clone(), index);
            node.entries.push(MethodEntry { route: index, route_key: Arc::clone(&route_key) });
            self.route_keys.insert(route_key, index);
        }

        self.routes.push(Arc::clone(&route));
        Ok(route)
    }

    /// The first registered domain pattern accepting `hostname`.
    ///
    /// Returns `None` without any work when only root routes were registered.
    pub fn match_domain(&self, hostname: &str) -> Option<DomainMatch<'_>> {
        if !self.using_domains {
            return None;
        }

        // a hostname has no `/`, the whole of it is matched as one segment
        let segments = token::split_path(hostname);
        self.domain_patterns.iter().find(|pattern| token::matches(&segments, &pattern.tokens)).map(|pattern| {
            DomainMatch { domain: &pattern.domain, subdomains: token::extract(&segments, &pattern.tokens) }
        })
    }

    /// The first route of the domain registered for `method` whose pattern accepts `url`.
    pub fn match_route(&self, url: &str, method: &Method, domain: Option<&DomainMatch<'_>>) -> Option<MatchResult> {
        let domain_key = domain.map_or(&Domain::Root, DomainMatch::domain);
        let node = self.domains.get(domain_key)?.get(method)?;
        let segments = token::split_path(url);

        let entry = node.entries.iter().find(|entry| token::matches(&segments, &self.routes[entry.route].tokens))?;
        let route = Arc::clone(&self.routes[entry.route]);
        trace!(url, %method, route_key = &*entry.route_key, "route matched");

        Some(MatchResult {
            params: token::extract(&segments, &route.tokens),
            subdomains: domain.map(|domain| domain.subdomains.clone()).unwrap_or_default(),
            route_key: Arc::clone(&entry.route_key),
            route,
        })
    }

    pub fn route_by_key(&self, route_key: &str) -> Option<&Arc<RouteDescriptor>> {
        self.route_keys.get(route_key).map(|index| &self.routes[*index])
    }

    /// Committed routes, in registration order.
    pub fn routes(&self) -> &[Arc<RouteDescriptor>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn uses_domains(&self) -> bool {
        self.using_domains
    }
}
