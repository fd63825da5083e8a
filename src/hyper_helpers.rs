use async_trait::async_trait;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{
    body::{Body, Bytes},
    Request, Response,
};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RequestError {
    #[error("Cannot build request")]
    InvalidRequest,
    #[error("Cannot serialize body")]
    CannotSerializeBody,
}

#[derive(Error, Debug, PartialEq)]
pub enum ResponseError {
    #[error("Cannot fetch body")]
    CannotFetchBody,
    #[error("Body is not UTF-8")]
    NotText,
    #[error("Cannot deserialize body")]
    DeserializeError,
}

/// Body helpers for `hyper::Request` builders.
pub trait RequestExt {
    fn empty(self) -> Result<Request<Empty<Bytes>>, RequestError>;

    fn json<T>(self, body: T) -> Result<Request<Full<Bytes>>, RequestError>
    where
        T: serde::Serialize;

    /// Url-encodes `pairs` the same way form expectations encode their data.
    fn form<I, K, V>(self, pairs: I) -> Result<Request<Full<Bytes>>, RequestError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>;
}

impl RequestExt for hyper::http::request::Builder {
    fn empty(self) -> Result<Request<Empty<Bytes>>, RequestError> {
        self.body(Empty::new())
            .map_err(|_| RequestError::InvalidRequest)
    }

    fn json<T>(self, body: T) -> Result<Request<Full<Bytes>>, RequestError>
    where
        T: serde::Serialize,
    {
        let message =
            serde_json::to_string(&body).map_err(|_| RequestError::CannotSerializeBody)?;

        self.header("content-type", "application/json")
            .body(Full::new(Bytes::from(message)))
            .map_err(|_| RequestError::InvalidRequest)
    }

    fn form<I, K, V>(self, pairs: I) -> Result<Request<Full<Bytes>>, RequestError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let message = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();

        self.header("content-type", "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from(message)))
            .map_err(|_| RequestError::InvalidRequest)
    }
}

#[async_trait]
pub trait ResponseExt {
    async fn bytes(self) -> Result<Bytes, ResponseError>;
    async fn text(self) -> Result<String, ResponseError>;
    async fn json<T>(self) -> Result<T, ResponseError>
    where
        T: DeserializeOwned;
}

#[async_trait]
impl<B> ResponseExt for Response<B>
where
    B: Body + Send + 'static,
    B::Data: Send,
{
    async fn bytes(self) -> Result<Bytes, ResponseError> {
        let bytes = self
            .into_body()
            .collect()
            .await
            .map_err(|_| ResponseError::CannotFetchBody)?
            .to_bytes();
        Ok(bytes)
    }

    async fn text(self) -> Result<String, ResponseError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ResponseError::NotText)
    }

    async fn json<T>(self) -> Result<T, ResponseError>
    where
        T: DeserializeOwned,
    {
        let bytes = self.bytes().await?;
        let json = serde_json::from_slice(&bytes).map_err(|_| ResponseError::DeserializeError)?;
        Ok(json)
    }
}
