use crate::error::RegistrationError;
use crate::handler::HandlerRef;
use crate::middleware::MiddlewareRef;
use crate::router::matcher::ParamMatcher;
use crate::router::route::Route;
use crate::router::{Entry, Router};
use convert_case::{Case, Casing};
use http::Method;

/// Actions of a resource, in registration order.
pub const RESOURCE_ACTIONS: [&str; 7] = ["index", "create", "store", "show", "edit", "update", "destroy"];

pub(crate) struct ResourceNode {
    pub(crate) routes: Vec<(&'static str, usize)>,
    base_name: String,
    // resource segment and the param following it
    params: Vec<(String, String)>,
}

/// The seven conventional routes of a controller.
///
/// `router.resource("magazines.ads", "AdsController")` registers:
///
/// | name | methods | pattern |
/// |---|---|---|
/// | `magazines.ads.index` | GET, HEAD | `/magazines/:magazine_id/ads` |
/// | `magazines.ads.create` | GET, HEAD | `/magazines/:magazine_id/ads/create` |
/// | `magazines.ads.store` | POST | `/magazines/:magazine_id/ads` |
/// | `magazines.ads.show` | GET, HEAD | `/magazines/:magazine_id/ads/:id` |
/// | `magazines.ads.edit` | GET, HEAD | `/magazines/:magazine_id/ads/:id/edit` |
/// | `magazines.ads.update` | PUT, PATCH | `/magazines/:magazine_id/ads/:id` |
/// | `magazines.ads.destroy` | DELETE | `/magazines/:magazine_id/ads/:id` |
///
/// A shallow resource registers its member routes (`show`, `edit`, `update`, `destroy`) without
/// the parents, as `/ads/:id`.
#[derive(Debug)]
pub struct Resource<'r> {
    router: &'r mut Router,
    id: usize,
}

impl<'r> Resource<'r> {
    pub(crate) fn create(
        router: &'r mut Router,
        resource: &str,
        controller: &str,
        shallow: bool,
    ) -> Result<Self, RegistrationError> {
        let resource = resource.trim_matches('/');
        let mut names: Vec<&str> = resource.split('.').collect();
        if resource.is_empty() || names.iter().any(|name| name.is_empty() || name.contains('/')) {
            return Err(RegistrationError::invalid_resource_name(resource));
        }

        let main = names.pop().unwrap_or(resource);
        let mut params = Vec::with_capacity(names.len() + 1);
        let mut full = String::new();
        for parent in &names {
            let param = format!("{}_id", singular(&parent.to_case(Case::Snake)));
            full.push_str(&format!("{parent}/:{param}/"));
            params.push(((*parent).to_owned(), param));
        }
        full.push_str(main);
        params.push((main.to_owned(), "id".to_owned()));

        let member = if shallow { main.to_owned() } else { full.clone() };
        let base_name = resource.split('.').map(|name| name.to_case(Case::Snake)).collect::<Vec<_>>().join(".");

        let definitions: [(&'static str, String, &[Method]); 7] = [
            ("index", format!("/{full}"), &[Method::GET, Method::HEAD]),
            ("create", format!("/{full}/create"), &[Method::GET, Method::HEAD]),
            ("store", format!("/{full}"), &[Method::POST]),
            ("show", format!("/{member}/:id"), &[Method::GET, Method::HEAD]),
            ("edit", format!("/{member}/:id/edit"), &[Method::GET, Method::HEAD]),
            ("update", format!("/{member}/:id"), &[Method::PUT, Method::PATCH]),
            ("destroy", format!("/{member}/:id"), &[Method::DELETE]),
        ];

        let mut routes = Vec::with_capacity(definitions.len());
        for (action, pattern, methods) in definitions {
            let mut route =
                Route::new(&pattern, methods.iter().cloned(), Some(HandlerRef::controller(controller, action)));
            route.as_name(&format!("{base_name}.{action}"));
            routes.push((action, router.add_route(route)));
        }

        let id = router.resources.len();
        router.resources.push(ResourceNode { routes, base_name, params });
        router.register(Entry::Resource(id));
        Ok(Self { router, id })
    }

    fn route_ids(&self) -> Vec<(&'static str, usize)> {
        self.router.resources[self.id].routes.clone()
    }

    fn each_route<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(&'static str, &mut Route),
    {
        for (action, route) in self.route_ids() {
            f(action, self.router.route_mut(route));
        }
        self
    }

    /// Keeps only the routes of `actions`.
    #[must_use]
    pub fn only(self, actions: &[&str]) -> Self {
        self.each_route(|action, route| {
            if !actions.contains(&action) {
                route.mark_as_deleted();
            }
        })
    }

    #[must_use]
    pub fn except(self, actions: &[&str]) -> Self {
        self.each_route(|action, route| {
            if actions.contains(&action) {
                route.mark_as_deleted();
            }
        })
    }

    /// Drops the `create` and `edit` routes, which only render forms.
    #[must_use]
    pub fn api_only(self) -> Self {
        self.except(&["create", "edit"])
    }

    /// Renames the param following `resource`, as in `.params(&[("posts", "post")])` turning
    /// `/posts/:id` into `/posts/:post`.
    #[must_use]
    pub fn params(mut self, params: &[(&str, &str)]) -> Self {
        let mut renames = Vec::new();
        let node = &mut self.router.resources[self.id];
        for (resource, param) in params {
            if let Some(entry) = node.params.iter_mut().find(|(name, _)| name == resource) {
                renames.push((*resource, std::mem::replace(&mut entry.1, (*param).to_owned()), *param));
            }
        }

        self.each_route(|_, route| {
            for (resource, from, to) in &renames {
                let pattern = rename_param(route.raw_pattern(), resource, from, to);
                route.set_raw_pattern(pattern);
            }
        })
    }

    #[must_use]
    pub fn where_param(self, param: &str, matcher: impl Into<ParamMatcher>) -> Self {
        let matcher = matcher.into();
        self.each_route(|_, route| {
            route.where_param(param, matcher.clone());
        })
    }

    /// Adds middleware to the routes of `actions`, `*` targeting every action.
    #[must_use]
    pub fn middleware_for(self, actions: &[&str], middleware: impl Into<MiddlewareRef>) -> Self {
        let middleware = middleware.into();
        let all = actions.contains(&"*");
        self.each_route(|action, route| {
            if all || actions.contains(&action) {
                route.middleware(middleware.clone());
            }
        })
    }

    /// Replaces the base of every route name, `photos.index` becoming `{name}.index`.
    #[must_use]
    pub fn as_name(mut self, name: &str) -> Self {
        let base_name = name.split('.').map(|part| part.to_case(Case::Snake)).collect::<Vec<_>>().join(".");
        let previous = std::mem::replace(&mut self.router.resources[self.id].base_name, base_name.clone());
        self.each_route(|_, route| {
            let renamed = route.name().and_then(|current| current.strip_prefix(previous.as_str())).map(str::to_owned);
            if let Some(action) = renamed {
                route.as_name(&format!("{base_name}{action}"));
            }
        })
    }

    #[must_use]
    pub fn prefix(self, prefix: &str) -> Self {
        self.each_route(|_, route| {
            route.prefix(prefix);
        })
    }

    #[must_use]
    pub fn domain(self, domain: &str) -> Self {
        self.each_route(|_, route| {
            route.domain(domain);
        })
    }

    /// Gives access to the routes of `actions` for anything the resource itself does not cover.
    #[must_use]
    pub fn tap<F>(self, actions: &[&str], mut f: F) -> Self
    where
        F: FnMut(&mut Route),
    {
        self.each_route(|action, route| {
            if actions.contains(&action) {
                f(route);
            }
        })
    }
}

fn rename_param(pattern: &str, resource: &str, from: &str, to: &str) -> String {
    let mut segments: Vec<String> = pattern.split('/').map(str::to_owned).collect();
    for index in 1..segments.len() {
        if segments[index - 1] == resource && segments[index].strip_prefix(':') == Some(from) {
            segments[index] = format!(":{to}");
        }
    }
    segments.join("/")
}

fn singular(word: &str) -> String {
    const IRREGULAR: [(&str, &str); 8] = [
        ("people", "person"),
        ("women", "woman"),
        ("men", "man"),
        ("children", "child"),
        ("mice", "mouse"),
        ("geese", "goose"),
        ("feet", "foot"),
        ("teeth", "tooth"),
    ];

    for (plural, single) in IRREGULAR {
        if let Some(stem) = word.strip_suffix(plural) {
            return format!("{stem}{single}");
        }
    }
    if let Some(stem) = word.strip_suffix("ies").filter(|stem| !stem.is_empty()) {
        return format!("{stem}y");
    }
    if ["sses", "shes", "ches", "xes", "zes"].iter().any(|suffix| word.ends_with(suffix)) {
        return word.strip_suffix("es").unwrap_or(word).to_owned();
    }
    if ["ss", "us", "is"].iter().any(|suffix| word.ends_with(suffix)) {
        return word.to_owned();
    }
    word.strip_suffix('s').unwrap_or(word).to_owned()
}
