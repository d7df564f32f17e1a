use std::time::Duration;

use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result, describe_chain};
use crate::types::{QueryReply, QueryRequest};

/// Default location of the answering service's query endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/query/";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that can answer a query.
///
/// The answering service is opaque to the conversation core.  Implementations
/// are shared across concurrently outstanding dispatches.
#[async_trait::async_trait]
pub trait AnsweringService: Send + Sync {
    /// Send one query and decode the reply.
    async fn answer(&self, request: &QueryRequest) -> Result<QueryReply>;
}

/// Answering service reached over HTTP.
///
/// Each query is a `POST` of a multipart form to a single endpoint.
#[derive(Debug, Clone)]
pub struct HttpAnsweringService {
    client: ReqwestClient,
    endpoint: Url,
    timeout: Duration,
}

impl HttpAnsweringService {
    /// Create a new service client for the given endpoint.
    pub fn new(endpoint: Url) -> Result<Self> {
        Self::with_options(endpoint, None)
    }

    /// Create a new service client with a custom timeout.
    pub fn with_options(endpoint: Url, timeout: Option<Duration>) -> Result<Self> {
        match endpoint.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(Error::validation(
                    format!("unsupported endpoint scheme {scheme:?}"),
                    Some("endpoint".to_string()),
                ));
            }
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// The endpoint queries are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_transport_error(&self, e: reqwest::Error) -> Error {
        let message = describe_chain(&e);
        if e.is_timeout() {
            Error::timeout(message, Some(self.timeout.as_secs_f64()))
        } else if e.is_connect() {
            Error::connection(message, Some(Box::new(e)))
        } else {
            Error::http_client(message, Some(Box::new(e)))
        }
    }

    /// Process a non-success response and convert it to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        // FastAPI reports `detail`; the query route itself reports `error`.
        #[derive(Deserialize)]
        struct ErrorResponse {
            detail: Option<serde_json::Value>,
            error: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", describe_chain(&e)),
                    Some(Box::new(e)),
                );
            }
        };

        let error_message = match serde_json::from_str::<ErrorResponse>(&error_body) {
            Ok(ErrorResponse {
                error: Some(error), ..
            }) => error,
            Ok(ErrorResponse {
                detail: Some(serde_json::Value::String(detail)),
                ..
            }) => detail,
            Ok(ErrorResponse {
                detail: Some(detail),
                ..
            }) => detail.to_string(),
            _ if error_body.trim().is_empty() => format!("HTTP status {status_code}"),
            _ => error_body.trim().to_string(),
        };

        match status_code {
            408 => Error::timeout(error_message, None),
            500 => Error::internal_server(error_message),
            502..=504 => Error::service_unavailable(error_message),
            _ => Error::api(status_code, error_message),
        }
    }
}

#[async_trait::async_trait]
impl AnsweringService for HttpAnsweringService {
    async fn answer(&self, request: &QueryRequest) -> Result<QueryReply> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(request.to_form())
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        QueryReply::from_slice(&body)
    }
}
