use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Body, Bytes},
    Request, Response,
};
use thiserror::Error;

use crate::transport::{InterceptedRequest, Transport};

/// The transport a mock server currently owns; empty once it has shut down.
pub(crate) type TransportSlot = Arc<Mutex<Option<Transport>>>;

pub(crate) fn lock_slot(slot: &TransportSlot) -> MutexGuard<'_, Option<Transport>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends requests to the mock server in-process.
///
/// A client follows its server across resets and stops working once the
/// server shuts down.
#[derive(Clone)]
pub struct Client {
    slot: TransportSlot,
}

impl Client {
    pub(crate) fn new(slot: TransportSlot) -> Self {
        Self { slot }
    }

    pub async fn send<B>(&self, request: Request<B>) -> Result<Response<Full<Bytes>>, ClientError>
    where
        B: Body,
    {
        let (parts, body) = request.into_parts();
        let bytes = body
            .collect()
            .await
            .map_err(|_| ClientError::CannotReadBody)?
            .to_bytes();

        let intercepted = InterceptedRequest {
            method: parts.method,
            url: parts
                .uri
                .path_and_query()
                .map(|path| path.as_str().to_string())
                .unwrap_or_else(|| String::from("/")),
            headers: parts
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: if bytes.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&bytes).into_owned())
            },
        };

        let stub = {
            let mut slot = lock_slot(&self.slot);
            let transport = slot.as_mut().ok_or(ClientError::InterceptionDisabled)?;
            transport.handle(intercepted)
        };

        let builder = Response::builder().status(stub.status);
        let builder = stub
            .headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));
        builder
            .body(Full::new(Bytes::from(stub.body)))
            .map_err(|_| ClientError::InvalidStubResponse)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ClientError {
    #[error("Mock server has been shut down")]
    InterceptionDisabled,
    #[error("Cannot read request body")]
    CannotReadBody,
    #[error("Stub produced an invalid response")]
    InvalidStubResponse,
}
