use async_trait::async_trait;
use bencher::{Probe, RESOURCES, TestCase};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use http::Method;
use micro_router::router::matcher;
use micro_router::{BoxError, Controller, HttpContext, MapResolver, Router, Routes, handler_fn};
use std::hint::black_box;

async fn ok(_ctx: &mut HttpContext) {}

struct ResourceController;

#[async_trait]
impl Controller for ResourceController {
    async fn call(&self, _action: &str, _ctx: &mut HttpContext) -> Result<(), BoxError> {
        Ok(())
    }
}

fn create_routes() -> Routes {
    let mut router = Router::new();
    router.resolver(MapResolver::new().with_controller("ResourceController", ResourceController));
    router.get("/", handler_fn(ok));
    router.get("/about", handler_fn(ok));
    for resource in RESOURCES {
        router.resource(resource, "ResourceController").expect("resource names are valid");
    }
    router.get("/docs/:version/*", handler_fn(ok)).where_param("version", matcher::slug());
    router.get("/", handler_fn(ok)).domain(":tenant.example.com");
    router.get("/dashboard", handler_fn(ok)).domain(":tenant.example.com");
    router.commit().expect("benchmark routes should commit")
}

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::static_route("root", Probe::new("/")),
        TestCase::static_route("last_resource_index", Probe::new("/tags")),
        TestCase::dynamic_route("first_resource_show", Probe::new("/posts/1")),
        TestCase::dynamic_route("last_resource_edit", Probe::new("/tags/1/edit")),
        TestCase::dynamic_route("wildcard", Probe::new("/docs/v6/http/context")),
        TestCase::domain_route("tenant_dashboard", Probe::with_hostname("/dashboard", "acme.example.com")),
        TestCase::domain_route("unknown_host", Probe::with_hostname("/about", "example.org")),
    ]
}

fn benchmark_match_route(criterion: &mut Criterion) {
    let routes = create_routes();
    let mut group = criterion.benchmark_group("match_route");

    for case in create_test_cases() {
        let id = BenchmarkId::new(case.group().as_str(), case.name());
        group.bench_with_input(id, &case, |b, case| {
            let probe = case.probe();
            b.iter(|| {
                let matched = routes.match_route(black_box(probe.url()), &Method::GET, probe.hostname());
                black_box(matched.expect("probe should match a route"));
            });
        });
    }

    group.finish();
}

criterion_group!(routing, benchmark_match_route);
criterion_main!(routing);
