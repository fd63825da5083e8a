//! The mock server tests drive: default routes from a schema, stubs,
//! expectations and checkpoints.

use std::sync::{Arc, Mutex};

use hyper::Method;
use serde_derive::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    client::{lock_slot, Client, TransportSlot},
    expectation::{Expectation, ExpectationLedger, UnmetExpectations},
    fixtures::{FixtureFactory, SchemaFixtures},
    routes::RouteDeriver,
    schema::ResourceSchema,
    stub::StubRegistry,
    transport::{InterceptedRequest, Transport},
};

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MockOptions {
    /// Prepended to every path derived from the schema.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl MockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Fakes an API described by a [`ResourceSchema`] for client-side tests.
///
/// Default routes are only installed by [`MockServer::reset`]; a fresh server
/// answers nothing but what is explicitly stubbed or expected.
///
/// ```
/// use pantalone::{hyper::{Method, Request}, MockServer, RequestExt, ResourceSchema};
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut server = MockServer::new(ResourceSchema::default());
/// server.expect(Method::GET, "/foo");
///
/// let client = server.client();
/// let request = Request::get("/foo").empty().unwrap();
/// client.send(request).await.unwrap();
///
/// assert!(server.checkpoint().is_ok());
/// # }
/// ```
pub struct MockServer {
    schema: ResourceSchema,
    options: MockOptions,
    factory: Box<dyn FixtureFactory>,
    transport: TransportSlot,
    ledger: ExpectationLedger,
}

impl MockServer {
    pub fn new(schema: ResourceSchema) -> Self {
        Self::with_options(schema, MockOptions::default())
    }

    pub fn with_options(schema: ResourceSchema, options: MockOptions) -> Self {
        let factory = SchemaFixtures::new(schema.clone());
        Self::with_factory(schema, options, factory)
    }

    pub fn with_factory(
        schema: ResourceSchema,
        options: MockOptions,
        factory: impl FixtureFactory + 'static,
    ) -> Self {
        Self {
            schema,
            options,
            factory: Box::new(factory),
            transport: Arc::new(Mutex::new(Some(Transport::new()))),
            ledger: ExpectationLedger::new(),
        }
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    pub fn options(&self) -> &MockOptions {
        &self.options
    }

    pub fn client(&self) -> Client {
        Client::new(self.transport.clone())
    }

    fn with_transport<R>(&self, f: impl FnOnce(&mut Transport) -> R) -> R {
        let mut slot = lock_slot(&self.transport);
        f(slot.get_or_insert_with(Transport::new))
    }

    /// Replaces the transport with a fresh one carrying the schema's default
    /// routes. Declared expectations are kept.
    pub fn reset(&mut self) {
        let mut transport = Transport::new();
        let routes = RouteDeriver::new(&self.schema, self.options.prefix.as_deref())
            .derive(self.factory.as_ref());
        info!(
            transport = %transport.id(),
            routes = routes.len(),
            "installing default routes"
        );
        for route in routes {
            StubRegistry::install(&mut transport, route);
        }
        *lock_slot(&self.transport) = Some(transport);
    }

    /// Stubs `method pathname` with a 200 response.
    pub fn create_stub(&mut self, method: Method, pathname: &str, body: Option<Value>) {
        self.create_stub_with_status(method, pathname, body, 200);
    }

    pub fn create_stub_with_status(
        &mut self,
        method: Method,
        pathname: &str,
        body: Option<Value>,
        status_code: u16,
    ) {
        self.with_transport(|transport| {
            StubRegistry::create_stub(transport, method, pathname, body.as_ref(), status_code)
        });
    }

    /// Expects `method pathname` before the next checkpoint and stubs an
    /// empty 200 response for it.
    pub fn expect(&mut self, method: Method, pathname: &str) -> &mut Expectation {
        self.expect_responding(method, pathname, None, 200)
    }

    pub fn expect_responding(
        &mut self,
        method: Method,
        pathname: &str,
        body: Option<Value>,
        status_code: u16,
    ) -> &mut Expectation {
        let mut slot = lock_slot(&self.transport);
        let transport = slot.get_or_insert_with(Transport::new);
        self.ledger
            .declare(transport, method, pathname, body.as_ref(), status_code)
    }

    pub fn pending_expectations(&self) -> usize {
        self.ledger.len()
    }

    pub fn handled_requests(&self) -> Vec<InterceptedRequest> {
        self.with_transport(|transport| transport.handled_requests().to_vec())
    }

    pub fn unhandled_requests(&self) -> Vec<InterceptedRequest> {
        self.with_transport(|transport| transport.unhandled_requests().to_vec())
    }

    /// Reconciles the request log with every declared expectation. The ledger
    /// is emptied whether or not all expectations were met.
    pub fn checkpoint(&mut self) -> Result<(), UnmetExpectations> {
        let log = self.handled_requests();
        self.ledger.reconcile(&log).into_result()
    }

    /// Stops intercepting requests, then runs a final checkpoint.
    pub fn shutdown(mut self) -> Result<(), UnmetExpectations> {
        let transport = lock_slot(&self.transport).take();
        let log = match transport {
            Some(mut transport) => {
                transport.teardown();
                transport.handled_requests().to_vec()
            }
            None => vec![],
        };
        debug!(requests = log.len(), "mock server shut down");
        self.ledger.reconcile(&log).into_result()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if !self.ledger.is_empty() && !std::thread::panicking() {
            warn!(
                pending = self.ledger.len(),
                "mock server dropped with unchecked expectations"
            );
        }
    }
}
