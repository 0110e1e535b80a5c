//! Doorstep Core - Shared types library.
//!
//! This crate provides the types shared by every Doorstep component:
//! - `checkout` - Delivery-location and checkout orchestration
//! - `cli` - Headless driver for the checkout flow
//!
//! # Architecture
//!
//! The core crate contains only types and pure validation - no I/O, no HTTP
//! clients, no timers. This keeps it lightweight and allows it to be used
//! anywhere, including by the backend that receives these payloads.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, coordinates, addresses, cart and order payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
