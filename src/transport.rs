use std::{fmt, sync::Arc};

use hyper::Method;
use tracing::{debug, warn};

/// A request seen by a transport, as recorded in its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    pub method: Method,
    /// Path and query, exactly as requested.
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// `None` when the request carried no body.
    pub body: Option<String>,
}

impl InterceptedRequest {
    pub fn path(&self) -> &str {
        self.url
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&self.url)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StubResponse {
    fn not_found() -> Self {
        Self {
            status: 404,
            headers: vec![],
            body: String::from("Not Found"),
        }
    }
}

pub trait Handler: Send + Sync {
    fn respond(&self, request: &InterceptedRequest) -> StubResponse;
}

/// A route path where `:name` segments match any single non-empty segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

impl RoutePattern {
    /// Parses `pattern`, dropping any query string: routing only looks at paths.
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(pattern);
        let segments = pattern
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(_) => Segment::Param,
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut parts = path.split('/');
        for segment in &self.segments {
            match (segment, parts.next()) {
                (Segment::Literal(expected), Some(part)) if expected == part => {}
                (Segment::Param, Some(part)) if !part.is_empty() => {}
                _ => return false,
            }
        }
        parts.next().is_none()
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Literal(_)))
            .count()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

struct Route {
    method: Method,
    pattern: RoutePattern,
    handler: Arc<dyn Handler>,
}

/// Route table plus the append-only log of every request dispatched to it.
pub struct Transport {
    id: uuid7::Uuid,
    routes: Vec<Route>,
    handled: Vec<InterceptedRequest>,
    unhandled: Vec<InterceptedRequest>,
}

impl Transport {
    pub fn new() -> Self {
        let id = uuid7::uuid7();
        debug!(transport = %id, "transport created");
        Self {
            id,
            routes: vec![],
            handled: vec![],
            unhandled: vec![],
        }
    }

    pub fn id(&self) -> String {
        self.id.to_string()
    }

    /// Registers `handler` for `method` and `pattern`, replacing any handler
    /// already registered for the same pair.
    pub fn register(&mut self, method: Method, pattern: &str, handler: Arc<dyn Handler>) {
        let pattern = RoutePattern::parse(pattern);
        debug!(transport = %self.id, %method, %pattern, "registering route");
        match self
            .routes
            .iter_mut()
            .find(|route| route.method == method && route.pattern == pattern)
        {
            Some(route) => route.handler = handler,
            None => self.routes.push(Route {
                method,
                pattern,
                handler,
            }),
        }
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn handle(&mut self, request: InterceptedRequest) -> StubResponse {
        let path = request.path();
        let route = self
            .routes
            .iter()
            .filter(|route| route.method == request.method && route.pattern.matches(path))
            .fold(None::<&Route>, |best, route| match best {
                Some(best) if best.pattern.literal_count() >= route.pattern.literal_count() => {
                    Some(best)
                }
                _ => Some(route),
            });

        match route {
            Some(route) => {
                let response = route.handler.respond(&request);
                debug!(
                    transport = %self.id,
                    method = %request.method,
                    url = %request.url,
                    status = response.status,
                    "handled request"
                );
                self.handled.push(request);
                response
            }
            None => {
                warn!(
                    transport = %self.id,
                    method = %request.method,
                    url = %request.url,
                    "no route for request"
                );
                self.unhandled.push(request);
                StubResponse::not_found()
            }
        }
    }

    pub fn handled_requests(&self) -> &[InterceptedRequest] {
        &self.handled
    }

    pub fn unhandled_requests(&self) -> &[InterceptedRequest] {
        &self.unhandled
    }

    pub fn teardown(&mut self) {
        debug!(transport = %self.id, routes = self.routes.len(), "tearing down transport");
        self.routes.clear();
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
