use std::fmt;

use hyper::Method;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    stub::StubRegistry,
    transport::{InterceptedRequest, Transport},
};

/// Hook run with the matching request once an expectation is fulfilled.
pub type Callback = Box<dyn FnMut(&InterceptedRequest) + Send>;

/// Header and body constraints for an expectation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMatch {
    headers: Option<Vec<(String, String)>>,
    body: Option<String>,
    data: Option<Vec<(String, String)>>,
}

impl RequestMatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header constraint, replacing an earlier one with the same name.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        insert_header(self.headers.get_or_insert_with(Vec::new), name, value);
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut expected = vec![];
        for (name, value) in headers {
            insert_header(&mut expected, name, value);
        }
        self.headers = Some(expected);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Form data, compared against the request body in its url-encoded form.
    pub fn data<I, K, V>(mut self, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.data = Some(
            data.into_iter()
                .map(|(name, value)| (name.as_ref().to_string(), value.as_ref().to_string()))
                .collect(),
        );
        self
    }

    // A non-empty body wins over form data; an empty result constrains nothing.
    fn expected_body(&self) -> Option<String> {
        self.body
            .clone()
            .filter(|body| !body.is_empty())
            .or_else(|| {
                self.data.as_ref().map(|data| {
                    form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(data)
                        .finish()
                })
            })
            .filter(|body| !body.is_empty())
    }
}

fn insert_header(headers: &mut Vec<(String, String)>, name: impl AsRef<str>, value: impl AsRef<str>) {
    let name = name.as_ref();
    let value = value.as_ref().to_string();
    match headers.iter_mut().find(|(existing, _)| existing == name) {
        Some((_, existing)) => *existing = value,
        None => headers.push((name.to_string(), value)),
    }
}

/// What `Expectation::with` accepts: request constraints or a fulfillment hook.
pub enum Predicate {
    Match(RequestMatch),
    Callback(Callback),
}

impl From<RequestMatch> for Predicate {
    fn from(request_match: RequestMatch) -> Self {
        Predicate::Match(request_match)
    }
}

impl<F> From<F> for Predicate
where
    F: FnMut(&InterceptedRequest) + Send + 'static,
{
    fn from(callback: F) -> Self {
        Predicate::Callback(Box::new(callback))
    }
}

/// A request that must be seen before the next checkpoint.
pub struct Expectation {
    method: Method,
    pathname: String,
    headers: Option<Vec<(String, String)>>,
    body: Option<String>,
    callback: Option<Callback>,
    matched_request: Option<InterceptedRequest>,
}

impl Expectation {
    pub fn new(method: Method, pathname: impl Into<String>) -> Self {
        Self {
            method,
            pathname: pathname.into(),
            headers: None,
            body: None,
            callback: None,
            matched_request: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn headers(&self) -> Option<&[(String, String)]> {
        self.headers.as_deref()
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn matched_request(&self) -> Option<&InterceptedRequest> {
        self.matched_request.as_ref()
    }

    /// Refines the expectation. Request constraints replace any previous
    /// header and body constraints; a callback replaces the previous callback.
    pub fn with(&mut self, predicate: impl Into<Predicate>) -> &mut Self {
        match predicate.into() {
            Predicate::Match(request_match) => {
                self.body = request_match.expected_body();
                self.headers = request_match.headers;
            }
            Predicate::Callback(callback) => self.callback = Some(callback),
        }
        self
    }

    pub fn with_callback<F>(&mut self, request_match: RequestMatch, callback: F) -> &mut Self
    where
        F: FnMut(&InterceptedRequest) + Send + 'static,
    {
        self.with(request_match).with(callback)
    }

    pub fn matches(&self, request: &InterceptedRequest) -> bool {
        request.url == self.pathname
            && request.method == self.method
            && self.headers_match(request)
            && self
                .body
                .as_ref()
                .map_or(true, |body| request.body.as_ref() == Some(body))
    }

    /// Checks `request` and remembers it when it satisfies the expectation.
    pub fn is_fulfilled_by(&mut self, request: &InterceptedRequest) -> bool {
        let fulfilled = self.matches(request);
        if fulfilled {
            self.matched_request = Some(request.clone());
        }
        fulfilled
    }

    // Expected values are looked up among all actual header values, whatever
    // their name.
    fn headers_match(&self, request: &InterceptedRequest) -> bool {
        let Some(expected) = &self.headers else {
            return true;
        };
        expected.iter().all(|(_, expected_value)| {
            request
                .headers
                .iter()
                .any(|(_, actual_value)| actual_value == expected_value)
        })
    }

    pub fn description(&self) -> String {
        let mut description = format!("{} {}", self.method, self.pathname);
        if self.headers.is_some() || self.body.is_some() {
            description.push_str(" with");
        }
        if let Some(headers) = &self.headers {
            let json = serde_json::to_string(&OrderedHeaders(headers)).unwrap_or_default();
            description.push_str(" headers: ");
            description.push_str(&json);
        }
        if let Some(body) = &self.body {
            description.push_str(" body: ");
            description.push_str(body);
        }
        description
    }

    fn fire(&mut self) {
        if let (Some(callback), Some(request)) = (self.callback.as_mut(), &self.matched_request) {
            callback(request);
        }
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("method", &self.method)
            .field("pathname", &self.pathname)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("callback", &self.callback.is_some())
            .field("matched_request", &self.matched_request)
            .finish()
    }
}

struct OrderedHeaders<'a>(&'a [(String, String)]);

impl Serialize for OrderedHeaders<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, value)| (name, value)))
    }
}

/// Raised by a checkpoint when declared requests never arrived.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Expected {} to have been requested.", .descriptions.join(", "))]
pub struct UnmetExpectations {
    pub descriptions: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Reconciliation {
    pub fulfilled: Vec<Expectation>,
    pub failed: Vec<Expectation>,
}

impl Reconciliation {
    pub fn into_result(self) -> Result<(), UnmetExpectations> {
        if self.failed.is_empty() {
            return Ok(());
        }
        Err(UnmetExpectations {
            descriptions: self.failed.iter().map(Expectation::description).collect(),
        })
    }
}

/// Expectations declared since the last checkpoint, in declaration order.
#[derive(Debug, Default)]
pub struct ExpectationLedger {
    entries: Vec<Expectation>,
}

impl ExpectationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an expectation and stubs a response for it on `transport`.
    pub fn declare(
        &mut self,
        transport: &mut Transport,
        method: Method,
        pathname: &str,
        body: Option<&Value>,
        status_code: u16,
    ) -> &mut Expectation {
        debug!(%method, pathname, status_code, "declaring expectation");
        StubRegistry::create_stub(transport, method.clone(), pathname, body, status_code);
        self.entries.push(Expectation::new(method, pathname));
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Expectation> {
        std::mem::take(&mut self.entries)
    }

    /// Matches every entry against `log`, fires the callbacks of fulfilled
    /// entries and empties the ledger.
    pub fn reconcile(&mut self, log: &[InterceptedRequest]) -> Reconciliation {
        let mut reconciliation = Reconciliation::default();
        for mut expectation in self.drain() {
            if log.iter().any(|request| expectation.is_fulfilled_by(request)) {
                expectation.fire();
                reconciliation.fulfilled.push(expectation);
            } else {
                reconciliation.failed.push(expectation);
            }
        }
        info!(
            fulfilled = reconciliation.fulfilled.len(),
            failed = reconciliation.failed.len(),
            requests = log.len(),
            "reconciled expectations"
        );
        reconciliation
    }
}
