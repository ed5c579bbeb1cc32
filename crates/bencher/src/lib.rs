/// A request to route, with the group it is reported under.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    probe: Probe,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, probe: Probe) -> Self {
        Self { name, group, probe }
    }

    pub fn static_route(name: &'static str, probe: Probe) -> Self {
        Self::new(name, TestGroup::Static, probe)
    }

    pub fn dynamic_route(name: &'static str, probe: Probe) -> Self {
        Self::new(name, TestGroup::Dynamic, probe)
    }

    pub fn domain_route(name: &'static str, probe: Probe) -> Self {
        Self::new(name, TestGroup::Domain, probe)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Probe {
    url: &'static str,
    hostname: Option<&'static str>,
}

impl Probe {
    pub const fn new(url: &'static str) -> Self {
        Self { url, hostname: None }
    }

    pub const fn with_hostname(url: &'static str, hostname: &'static str) -> Self {
        Self { url, hostname: Some(hostname) }
    }

    pub fn url(&self) -> &'static str {
        self.url
    }

    pub fn hostname(&self) -> Option<&'static str> {
        self.hostname
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Static,
    Dynamic,
    Domain,
}

impl TestGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestGroup::Static => "static",
            TestGroup::Dynamic => "dynamic",
            TestGroup::Domain => "domain",
        }
    }
}

/// Resource names registered by the benchmark route tables.
pub const RESOURCES: &[&str] = &[
    "posts", "comments", "users", "teams", "projects", "invoices", "orders", "products", "categories", "tags",
];
