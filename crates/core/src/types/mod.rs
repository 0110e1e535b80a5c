//! Core types for Doorstep.
//!
//! This module provides type-safe wrappers for the delivery and checkout
//! domain.

pub mod address;
pub mod cart;
pub mod coordinate;
pub mod id;
pub mod order;
pub mod price;
pub mod user;

pub use address::{
    AddressField, AddressInput, AddressValidation, DeliverySelection, NewAddress, SavedAddress,
};
pub use cart::{CartLine, CartState};
pub use coordinate::{Coordinate, CoordinateError};
pub use id::*;
pub use order::{OrderConfirmation, OrderSubmission};
pub use price::Price;
pub use user::{SessionStatus, UserInfo};
