//! Integration tests for Doorstep.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p doorstep-integration-tests
//! ```
//!
//! Every test stands up its own `wiremock` server in place of the delivery
//! backend, so no external services are needed.
//!
//! # Test Categories
//!
//! - `http_backend` - Wire format and status handling of `HttpBackend`
//! - `checkout_flow` - Location selection through order placement over HTTP
//!
//! This library holds the fixtures those tests share.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)]

use doorstep_checkout::config::ApiConfig;
use doorstep_checkout::HttpBackend;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::MockServer;

/// Bearer token the test backend client sends.
pub const TEST_TOKEN: &str = "test-token";

/// Backend settings pointing at `server`.
///
/// # Panics
///
/// Panics if the mock server URI is not a valid URL.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn api_config(server: &MockServer) -> ApiConfig {
    let mut config = ApiConfig::new(Url::parse(&server.uri()).unwrap());
    config.token = Some(SecretString::from(TEST_TOKEN));
    config
}

/// A backend client talking to `server`.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(&api_config(server)).unwrap()
}

/// Create-address response echoing the Metropolis fixture.
#[must_use]
pub fn saved_address_json(id: &str) -> Value {
    json!({
        "_id": id,
        "addressLine1": "123 Main St",
        "addressLine2": "Apt 4",
        "landmark": "",
        "city": "Metropolis",
        "state": "NY",
        "postalCode": "10001",
        "country": "US",
        "userId": "user_1"
    })
}

/// Session response for a signed-in user.
#[must_use]
pub fn session_json() -> Value {
    json!({
        "status": true,
        "userInfo": {
            "_id": "user_1",
            "username": "lois",
            "email": "lois@dailyplanet.test",
            "role": "customer"
        }
    })
}
