//! Doorstep Checkout - Delivery-location and checkout orchestration.
//!
//! The flow runs in two stages joined by a session-scoped hand-off:
//!
//! 1. Location selection ([`flow::LocationFlowController`]): permission
//!    prompt, map confirmation, address form.
//! 2. Checkout ([`checkout::CheckoutOrchestrator`]): order summary and
//!    guarded order placement.
//!
//! The [`carrier::SelectionCarrier`] moves the saved
//! [`DeliverySelection`](doorstep_core::DeliverySelection) from the first
//! stage to the second.
//!
//! # Collaborators
//!
//! Everything outside the flow is injected:
//! - [`backend::DeliveryBackend`] - address, coordinate and order writes
//! - [`geolocation::LocationSensor`] - the device location sensor
//! - [`map::MapSurfaceLoader`] - the map library
//! - [`services::Services`] - session, router, cart store, notifications
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`error`] - Error types and Sentry reporting
//! - [`testing`] - Deterministic doubles (`test-support` feature)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address_form;
pub mod backend;
pub mod carrier;
pub mod checkout;
pub mod config;
pub mod error;
pub mod flow;
pub mod geolocation;
pub mod map;
pub mod services;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use address_form::AddressForm;
pub use backend::{ApiError, DeliveryBackend, HttpBackend};
pub use carrier::{MemorySessionStorage, SelectionCarrier, SessionStorage};
pub use checkout::{CheckoutError, CheckoutOrchestrator, OrderPlaced, OrderSummary};
pub use config::ClientConfig;
pub use error::FlowError;
pub use flow::{FlowStage, LocationFlowController, MapConfirmed};
pub use geolocation::{
    GeolocationAcquirer, LocationSensor, Position, PositionOptions, SensorFailure,
};
pub use map::{MapConfirmation, MapError, MapEvent, MapSurface, MapSurfaceLoader};
pub use services::Services;
