use std::sync::Arc;

use hyper::Method;
use serde_json::Value;

use crate::transport::{Handler, InterceptedRequest, StubResponse, Transport};

/// A canned response for one method and path pattern. The body is serialized
/// once, when the route is built, so every request sees the same payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubRoute {
    pub method: Method,
    pub path_pattern: String,
    pub status_code: u16,
    pub response_body: String,
}

impl StubRoute {
    pub fn new(method: Method, path_pattern: &str, body: Option<&Value>, status_code: u16) -> Self {
        Self {
            method,
            path_pattern: path_pattern.to_string(),
            status_code,
            response_body: body.map(Value::to_string).unwrap_or_default(),
        }
    }
}

impl Handler for StubRoute {
    fn respond(&self, _: &InterceptedRequest) -> StubResponse {
        StubResponse {
            status: self.status_code,
            headers: vec![(
                String::from("Content-Type"),
                String::from("application/json"),
            )],
            body: self.response_body.clone(),
        }
    }
}

/// Installs stub routes on a transport.
pub struct StubRegistry;

impl StubRegistry {
    pub fn install(transport: &mut Transport, route: StubRoute) {
        let method = route.method.clone();
        let pattern = route.path_pattern.clone();
        transport.register(method, &pattern, Arc::new(route));
    }

    pub fn create_stub(
        transport: &mut Transport,
        method: Method,
        path_pattern: &str,
        body: Option<&Value>,
        status_code: u16,
    ) {
        Self::install(
            transport,
            StubRoute::new(method, path_pattern, body, status_code),
        );
    }
}
