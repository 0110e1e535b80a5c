//! Address entry and persistence.

use std::collections::{BTreeMap, BTreeSet};

use doorstep_core::{AddressField, AddressInput, Coordinate, DeliverySelection};
use tracing::{debug, info, instrument, warn};

use crate::backend::{ApiError, DeliveryBackend};
use crate::error::{
    FlowError, PersistOperation, PersistenceFailure, Result, add_breadcrumb,
    report_persistence_failure,
};
use crate::services::Notifier;

/// Controlled address form.
///
/// Errors are computed for the whole form on submit and re-computed per field
/// on blur once a field has been touched.
#[derive(Debug, Default)]
pub struct AddressForm {
    input: AddressInput,
    touched: BTreeSet<AddressField>,
    errors: BTreeMap<AddressField, &'static str>,
}

impl AddressForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current values.
    #[must_use]
    pub const fn values(&self) -> &AddressInput {
        &self.input
    }

    /// Update a field.
    ///
    /// A shown error for this field is cleared as soon as the value becomes
    /// acceptable.
    pub fn set_field(&mut self, field: AddressField, value: impl Into<String>) {
        self.input.set(field, value);
        if self.errors.contains_key(&field) && self.input.field_error(field).is_none() {
            self.errors.remove(&field);
        }
    }

    /// Replace every value at once.
    pub fn fill(&mut self, input: AddressInput) {
        for field in AddressField::ALL {
            self.set_field(field, input.get(field));
        }
    }

    /// The field lost focus: mark it touched and re-validate it.
    pub fn blur(&mut self, field: AddressField) {
        self.touched.insert(field);
        self.revalidate(field);
    }

    /// The error shown under `field`, if any.
    #[must_use]
    pub fn error(&self, field: AddressField) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    /// Returns `true` if any field currently shows an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` when every required field has a value.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.input.validate().is_ok()
    }

    fn revalidate(&mut self, field: AddressField) {
        if !self.touched.contains(&field) {
            return;
        }
        match self.input.field_error(field) {
            Some(message) => {
                self.errors.insert(field, message);
            }
            None => {
                self.errors.remove(&field);
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Validate, persist the address and merge it with `coordinates`.
    ///
    /// On success the form is cleared. On failure the entered values are
    /// kept so the user can retry.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Validation`] if a required field is empty; no request
    ///   is made
    /// - [`FlowError::Persistence`] if the create call fails or returns an
    ///   incomplete address
    #[instrument(skip_all, fields(has_coordinates = coordinates.is_some()))]
    pub async fn submit<B: DeliveryBackend>(
        &mut self,
        backend: &B,
        notifier: &dyn Notifier,
        coordinates: Option<Coordinate>,
    ) -> Result<DeliverySelection> {
        if let Err(validation) = self.input.validate() {
            self.touched.extend(AddressField::ALL);
            self.errors = validation
                .fields()
                .filter_map(|field| validation.message(field).map(|msg| (field, msg)))
                .collect();
            warn!(missing = %validation, "Address form incomplete");
            return Err(validation.into());
        }

        let body = self.input.to_new_address();
        let created = backend.create_address(&body).await.and_then(|saved| {
            if saved.is_complete() {
                Ok(saved)
            } else {
                Err(ApiError::Parse("incomplete address in response".to_string()))
            }
        });
        let saved = match created {
            Ok(saved) => saved,
            Err(e) => return Err(address_save_failed(notifier, e)),
        };

        info!(address_id = %saved.id, "Delivery address saved");
        if !saved.matches_input(&self.input) {
            debug!(address_id = %saved.id, "Backend normalized the saved address");
        }
        add_breadcrumb(
            "address",
            "Address saved",
            Some(&[("address_id", saved.id.as_str())]),
        );

        self.reset();
        notifier.success("Delivery location saved successfully!");
        Ok(DeliverySelection::new(saved, coordinates))
    }
}

fn address_save_failed(notifier: &dyn Notifier, error: ApiError) -> FlowError {
    let failure = PersistenceFailure::new(PersistOperation::Address, error);
    report_persistence_failure(&failure);
    notifier.error(failure.user_message());
    failure.into()
}
