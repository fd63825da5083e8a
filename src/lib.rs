//! In-process HTTP mocking for client-side tests.
//!
//! A [`MockServer`] derives default stubs from a hyper-schema style
//! [`ResourceSchema`], answers requests sent through its [`Client`], and
//! checks at a checkpoint that every declared [`Expectation`] was requested.

pub mod client;
pub mod expectation;
pub mod fixtures;
pub mod hyper_helpers;
pub mod mock_server;
pub mod routes;
pub mod schema;
pub mod server;
pub mod stub;
pub mod transport;

pub use hyper;

pub use client::{Client, ClientError};
pub use expectation::{
    Callback, Expectation, ExpectationLedger, Predicate, Reconciliation, RequestMatch,
    UnmetExpectations,
};
pub use fixtures::{FixtureFactory, SchemaFixtures};
pub use hyper_helpers::{RequestError, RequestExt, ResponseError, ResponseExt};
pub use mock_server::{MockOptions, MockServer};
pub use routes::{rewrite_href, RouteDeriver, PARAM_TOKEN};
pub use schema::{Definition, Link, LinkRel, ResourceSchema, SchemaError};
pub use stub::{StubRegistry, StubRoute};
pub use transport::{Handler, InterceptedRequest, RoutePattern, StubResponse, Transport};
