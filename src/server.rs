//! Serves a mock server over a local socket for code that needs a real URL.

use std::{convert::Infallible, net::SocketAddr};

use http_body_util::Full;
use hyper::{
    body::{Bytes, Incoming},
    server::conn::http1,
    Request, Response, StatusCode,
};
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::client::Client;

pub struct Binding {
    pub port: u16,
    pub listener: TcpListener,
}

pub async fn bind_socket(
    addr: SocketAddr,
) -> Result<Binding, Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    let port = listener.local_addr()?.port();
    Ok(Binding { port, listener })
}

async fn handler(
    req: Request<Incoming>,
    client: Client,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match client.send(req).await {
        Ok(response) => Ok(response),
        Err(err) => {
            let mut response = Response::new(Full::new(Bytes::from(err.to_string())));
            *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
            Ok(response)
        }
    }
}

/// Accepts connections until the listener fails, routing every request
/// through `client`.
pub async fn run(
    listener: TcpListener,
    client: Client,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let client = client.clone();
        let service = ServiceBuilder::new()
            .layer(CorsLayer::permissive())
            .service_fn(move |req| handler(req, client.clone()));

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, TowerToHyperService::new(service))
                .await
            {
                warn!("Error serving connection: {:?}", err);
            }
        });
    }
}
