//! CLI command implementations.

pub mod checkout;
pub mod whoami;
