//! Delivery backend client.
//!
//! [`DeliveryBackend`] is the seam the flow talks through; [`HttpBackend`]
//! implements it over `reqwest` with credentials attached to every request
//! (session cookies plus an optional bearer token).

use std::future::Future;
use std::sync::Arc;

use doorstep_core::{
    Coordinate, NewAddress, OrderConfirmation, OrderSubmission, SavedAddress, SessionStatus,
};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ApiConfig;

/// Errors that can occur when talking to the delivery backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// The backend writes the checkout flow depends on.
///
/// Implementations must be cheap to clone; the flow controller and the
/// checkout orchestrator each hold their own handle.
pub trait DeliveryBackend: Clone + Send + Sync + 'static {
    /// `POST /address`. Succeeds only on `201 Created`.
    fn create_address(
        &self,
        address: &NewAddress,
    ) -> impl Future<Output = Result<SavedAddress, ApiError>> + Send;

    /// `POST /coordinates`.
    fn create_coordinates(
        &self,
        coordinate: Coordinate,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST /order`.
    fn create_order(
        &self,
        order: &OrderSubmission,
    ) -> impl Future<Output = Result<OrderConfirmation, ApiError>> + Send;
}

/// `reqwest`-backed [`DeliveryBackend`].
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ApiError::Parse(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Resolve `path` under the base URL, keeping any base path prefix.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut base = self.inner.base_url.clone();
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Parse(format!("Invalid endpoint {path}: {e}")))
    }

    /// Check the current session (`GET /`).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not a session status.
    #[instrument(skip(self))]
    pub async fn fetch_session(&self) -> Result<SessionStatus, ApiError> {
        let url = self.endpoint("/")?;
        let response = self.inner.client.get(url).send().await?;
        let response = error_for_status(response, None).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let response = self.inner.client.post(url).json(body).send().await?;
        debug!(status = %response.status(), path, "Response");
        Ok(response)
    }
}

/// Turn a non-success response into `ApiError::Api`.
///
/// With `expected`, only that exact status counts as success.
async fn error_for_status(
    response: reqwest::Response,
    expected: Option<StatusCode>,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    let ok = expected.map_or_else(|| status.is_success(), |want| status == want);
    if ok {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ApiError::Api {
        status: status.as_u16(),
        message,
    })
}

impl DeliveryBackend for HttpBackend {
    #[instrument(skip(self, address), fields(city = %address.city))]
    async fn create_address(&self, address: &NewAddress) -> Result<SavedAddress, ApiError> {
        let response = self.post("/address", address).await?;
        let response = error_for_status(response, Some(StatusCode::CREATED)).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    #[instrument(skip(self), fields(lat = coordinate.lat, lng = coordinate.lng))]
    async fn create_coordinates(&self, coordinate: Coordinate) -> Result<(), ApiError> {
        let response = self.post("/coordinates", &coordinate).await?;
        error_for_status(response, None).await?;
        Ok(())
    }

    #[instrument(skip(self, order), fields(items = order.cart.orders_count))]
    async fn create_order(&self, order: &OrderSubmission) -> Result<OrderConfirmation, ApiError> {
        let response = self.post("/order", order).await?;
        let response = error_for_status(response, None).await?;

        // The order exists once the backend said 2xx; an unreadable body must
        // not turn into a retryable failure.
        let body = response.bytes().await.unwrap_or_default();
        if body.is_empty() {
            return Ok(OrderConfirmation::default());
        }
        Ok(serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable order confirmation body");
            OrderConfirmation::default()
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_endpoint_joins_base_url() {
        let backend = HttpBackend::new(&ApiConfig::new(
            Url::parse("http://localhost:3000").unwrap(),
        ))
        .unwrap();
        assert_eq!(
            backend.endpoint("/address").unwrap().as_str(),
            "http://localhost:3000/address"
        );

        let prefixed = HttpBackend::new(&ApiConfig::new(
            Url::parse("https://shop.test/api").unwrap(),
        ))
        .unwrap();
        assert_eq!(
            prefixed.endpoint("/order").unwrap().as_str(),
            "https://shop.test/api/order"
        );
        assert_eq!(
            prefixed.endpoint("/").unwrap().as_str(),
            "https://shop.test/api/"
        );
    }

    #[test]
    fn test_rejects_token_with_newline() {
        let mut config = ApiConfig::new(Url::parse("http://localhost:3000").unwrap());
        config.token = Some(SecretString::from("abc\ndef"));
        assert!(matches!(HttpBackend::new(&config), Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Api {
            status: 422,
            message: "city missing".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 422 - city missing");
    }
}
