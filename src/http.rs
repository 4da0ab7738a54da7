//! HTTP API for the shape catalog
//!
//! ## Endpoints
//! - `GET /blocks` - All shapes as a JSON array
//! - `GET /blocks?block={name}` - One shape by case-insensitive name
//! - `POST /blocks` - Add a shape (JSON, URL-encoded or multipart body)
//! - `OPTIONS *` - Preflight, always 204
//! - `GET /health` - Health check
//!
//! `/blocks.php` is accepted as an alias of `/blocks` for the browser client.
//!
//! ## Example Usage
//!
//! ```bash
//! # List all shapes
//! curl http://localhost:8090/blocks
//!
//! # Fetch one
//! curl 'http://localhost:8090/blocks?block=L'
//!
//! # Add a shape
//! curl -X POST -H "Content-Type: application/json" \
//!      -d '{"name":"X","color":"#123456","description":"test","image":"images/x.svg",
//!           "matrix":[[0,0,0,0],[1,1,1,1],[0,0,0,0],[0,0,0,0]]}' \
//!      http://localhost:8090/blocks
//!
//! # Add a shape with an uploaded image
//! curl -X POST -F name=Y -F color=#654321 -F description=upload \
//!      -F 'matrix=[[1,1,0,0],[1,1,0,0],[0,0,0,0],[0,0,0,0]]' \
//!      -F image_file=@shape.png \
//!      http://localhost:8090/blocks
//! ```

use crate::api::CatalogApi;
use crate::error::CatalogError;
use crate::payload::ShapePayload;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Default cap on request bodies (8 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Query string of `GET /blocks`
#[derive(Debug, Default, Deserialize)]
struct BlocksQuery {
    block: Option<String>,
}

/// HTTP server state
pub struct HttpServer {
    api: Arc<CatalogApi>,
    bind_addr: SocketAddr,
    max_body_bytes: usize,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(api: Arc<CatalogApi>, bind_addr: SocketAddr) -> Self {
        Self {
            api,
            bind_addr,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Set the request body limit
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), CatalogError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .await
                {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    /// Route a request and attach the fixed CORS headers
    pub async fn handle_request<B>(
        &self,
        req: Request<B>,
    ) -> Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);
        let method = req.method().clone();

        debug!(method = %method, path = %path, "Incoming request");

        let mut response = match (&method, path.as_str()) {
            (&Method::OPTIONS, _) => no_content(),
            (&Method::GET, "/health") => self.handle_health().await,
            (&Method::GET, "/blocks" | "/blocks.php") => self.handle_get(query.as_deref()).await,
            (&Method::POST, "/blocks" | "/blocks.php") => self.handle_post(req).await,
            (_, "/blocks" | "/blocks.php") => error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed",
            ),
            _ => error_response(StatusCode::NOT_FOUND, "Not found"),
        };

        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );

        Ok(response)
    }

    /// Health check endpoint
    async fn handle_health(&self) -> Response<Full<Bytes>> {
        match self.api.list().await {
            Ok(shapes) => json_response(
                StatusCode::OK,
                &serde_json::json!({ "status": "ok", "shapes": shapes.len() }),
            ),
            Err(e) => {
                error!(error = %e, "Health check could not read catalog");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not load data")
            }
        }
    }

    /// GET /blocks and GET /blocks?block={name}
    async fn handle_get(&self, query: Option<&str>) -> Response<Full<Bytes>> {
        let query: BlocksQuery = serde_urlencoded::from_str(query.unwrap_or("")).unwrap_or_default();

        let result = match query.block.filter(|b| !b.is_empty()) {
            Some(name) => self.api.get(&name).await.map(|found| match found {
                Some(shape) => json_response(StatusCode::OK, &shape),
                None => error_response(StatusCode::NOT_FOUND, "Block not found"),
            }),
            None => self
                .api
                .list()
                .await
                .map(|shapes| json_response(StatusCode::OK, &shapes)),
        };

        result.unwrap_or_else(|e| {
            error!(error = %e, "Could not read catalog");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not load data")
        })
    }

    /// POST /blocks - Add a shape
    async fn handle_post<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match Limited::new(req.into_body(), self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<http_body_util::LengthLimitError>() => {
                return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
            Err(e) => {
                warn!(error = %e, "Failed to read request body");
                return error_response(StatusCode::BAD_REQUEST, "Could not read request body");
            }
        };

        let payload = match ShapePayload::parse(content_type.as_deref(), body).await {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = ?e, "Rejected request body");
                return error_response(StatusCode::BAD_REQUEST, &e.to_string());
            }
        };

        match self.api.create(payload).await {
            Ok(shape) => json_response(StatusCode::CREATED, &shape),
            Err(e) => {
                debug!(error = %e, status = %e.status(), "Create rejected");
                error_response(e.status(), &e.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

/// Build a `{"error": message}` response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &ErrorBody { error: message })
}

/// Build an empty response with 204 No Content status
pub fn no_content() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}
