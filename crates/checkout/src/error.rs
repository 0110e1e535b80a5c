//! Unified error handling with Sentry integration.
//!
//! Every failure in the flow falls into one of four families:
//!
//! - [`SensorFailure`] - the location sensor refused or failed
//! - [`AddressValidation`] - a required form field is empty; never reaches the network
//! - [`PersistenceFailure`] - an address, coordinate or order create call failed
//! - [`PreconditionFailure`] - a stage was entered without the data it needs
//!
//! Components catch these at their own boundary and surface them through the
//! notifier; [`FlowError::user_message`] provides the text.

use core::fmt;

use doorstep_core::AddressValidation;
use thiserror::Error;

use crate::backend::ApiError;
use crate::carrier::CarrierError;
use crate::flow::FlowStage;
use crate::geolocation::SensorFailure;
use crate::map::MapError;

/// The backend write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOperation {
    Address,
    Coordinates,
    Order,
}

impl fmt::Display for PersistOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Address => "address create",
            Self::Coordinates => "coordinates create",
            Self::Order => "order create",
        })
    }
}

/// A backend create call failed (network or server-side rejection).
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct PersistenceFailure {
    pub operation: PersistOperation,
    #[source]
    pub source: ApiError,
}

impl PersistenceFailure {
    /// Wrap an API error for `operation`.
    #[must_use]
    pub const fn new(operation: PersistOperation, source: ApiError) -> Self {
        Self { operation, source }
    }

    /// Text shown to the user for this failure.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self.operation {
            PersistOperation::Address => "Failed to save delivery location",
            PersistOperation::Coordinates => "Error saving location. Please try again.",
            PersistOperation::Order => "Error placing order. Please try again.",
        }
    }
}

/// A stage was reached without the data it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreconditionFailure {
    /// Checkout was entered with nothing in the carried-selection slot.
    #[error("no carried delivery selection")]
    MissingSelection,
    /// Proceed was requested before an address was saved.
    #[error("no delivery location selected")]
    NoSelection,
}

/// Errors returned by the location flow controller.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Location error: {0}")]
    Sensor(#[from] SensorFailure),

    #[error("Validation error: {0}")]
    Validation(#[from] AddressValidation),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceFailure),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionFailure),

    #[error("Map error: {0}")]
    Map(#[from] MapError),

    #[error("Session storage error: {0}")]
    Carrier(#[from] CarrierError),

    /// The action is not available in the current stage.
    #[error("{action} is not available during {stage:?}")]
    UnexpectedStage {
        action: &'static str,
        stage: FlowStage,
    },
}

impl FlowError {
    /// Human-readable text suitable for a toast or inline message.
    ///
    /// Internal details are not exposed; validation errors are reported per
    /// field by the form instead.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Sensor(failure) => failure.user_message().to_string(),
            Self::Validation(_) => "Please fill in the required fields".to_string(),
            Self::Persistence(failure) => failure.user_message().to_string(),
            Self::Precondition(_) => "Please select or add a delivery location".to_string(),
            Self::Map(MapError::NotReady) => "The map is still loading".to_string(),
            Self::Map(MapError::Load(_)) => "The map could not be loaded".to_string(),
            Self::Map(MapError::Sensor(failure)) => failure.user_message().to_string(),
            Self::Carrier(_) => "Could not remember your delivery location".to_string(),
            Self::UnexpectedStage { .. } => "That action is not available right now".to_string(),
        }
    }
}

/// Result type alias for `FlowError`.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Capture a persistence failure to Sentry and log it with the event id.
pub fn report_persistence_failure(failure: &PersistenceFailure) {
    let event_id = sentry::capture_error(failure);
    tracing::error!(
        error = %failure,
        operation = %failure.operation,
        sentry_event_id = %event_id,
        "Backend write failed"
    );
}

/// Add a breadcrumb for a flow step.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of steps
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("flow", "Map confirmed", Some(&[("lat", "12.34")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
