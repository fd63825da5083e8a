use hyper::Method;
use serde_json::Value;
use tracing::debug;

use crate::{
    fixtures::FixtureFactory,
    schema::{Link, LinkRel, ResourceSchema},
    stub::StubRoute,
};

/// Token the transport router treats as a single path parameter.
pub const PARAM_TOKEN: &str = ":param";

/// Rewrites every `{...}` placeholder in `href` into [`PARAM_TOKEN`].
///
/// A placeholder runs to the last `}` before the next `/`.
pub fn rewrite_href(href: &str) -> String {
    let mut rewritten = String::with_capacity(href.len());
    let mut rest = href;
    while let Some(start) = rest.find('{') {
        let (before, candidate) = rest.split_at(start);
        rewritten.push_str(before);
        let segment_end = candidate.find('/').unwrap_or(candidate.len());
        match candidate[..segment_end].rfind('}') {
            Some(end) if end > 1 => {
                rewritten.push_str(PARAM_TOKEN);
                rest = &candidate[end + 1..];
            }
            _ => {
                rewritten.push('{');
                rest = &candidate[1..];
            }
        }
    }
    rewritten.push_str(rest);
    rewritten
}

/// Walks a schema and produces the default stub for every supported link.
pub struct RouteDeriver<'a> {
    schema: &'a ResourceSchema,
    prefix: Option<&'a str>,
}

impl<'a> RouteDeriver<'a> {
    pub fn new(schema: &'a ResourceSchema, prefix: Option<&'a str>) -> Self {
        Self { schema, prefix }
    }

    pub fn derive(&self, factory: &dyn FixtureFactory) -> Vec<StubRoute> {
        self.schema
            .definitions()
            .flat_map(|(resource_type, definition)| {
                definition
                    .links
                    .iter()
                    .filter_map(move |link| self.route_for(resource_type, link, factory))
            })
            .collect()
    }

    fn route_for(
        &self,
        resource_type: &str,
        link: &Link,
        factory: &dyn FixtureFactory,
    ) -> Option<StubRoute> {
        let path = match self.prefix {
            Some(prefix) => format!("{}{}", prefix, rewrite_href(&link.href)),
            None => rewrite_href(&link.href),
        };

        let route = match &link.rel {
            LinkRel::Instances => {
                let fixture = factory.fixture(resource_type);
                StubRoute::new(Method::GET, &path, Some(&Value::Array(vec![fixture])), 200)
            }
            LinkRel::SelfRel => {
                StubRoute::new(Method::GET, &path, Some(&factory.fixture(resource_type)), 200)
            }
            LinkRel::Create => {
                StubRoute::new(Method::POST, &path, Some(&factory.fixture(resource_type)), 201)
            }
            LinkRel::Update => {
                StubRoute::new(Method::PATCH, &path, Some(&factory.fixture(resource_type)), 200)
            }
            LinkRel::Destroy => StubRoute::new(Method::DELETE, &path, None, 204),
            LinkRel::Other(rel) => {
                debug!(resource_type, rel = %rel, href = %link.href, "skipping unsupported link");
                return None;
            }
        };
        debug!(
            resource_type,
            method = %route.method,
            path = %route.path_pattern,
            status = route.status_code,
            "derived route"
        );
        Some(route)
    }
}
