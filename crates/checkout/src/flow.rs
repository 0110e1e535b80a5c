//! Location-selection state machine.
//!
//! ```text
//! PermissionPrompt --accept--> MapConfirm --confirm/dismiss--> FormEntry
//!        |                                                       |
//!        +----------------------decline--------------------------+
//!
//! FormEntry --address saved--> ReadyToProceed --proceed--> CheckoutEntry
//! ```
//!
//! Every transition takes `&mut self`, so a sensor, map or network completion
//! can only land on the controller that started it, in the stage that
//! started it. Dropping a pending call discards its result.

use std::sync::Arc;

use doorstep_core::{Coordinate, DeliverySelection};
use tracing::{info, instrument, warn};

use crate::address_form::AddressForm;
use crate::backend::DeliveryBackend;
use crate::carrier::SelectionCarrier;
use crate::error::{
    FlowError, PersistOperation, PersistenceFailure, PreconditionFailure, Result, add_breadcrumb,
    report_persistence_failure,
};
use crate::geolocation::{GeolocationAcquirer, LocationSensor};
use crate::map::{MapConfirmation, MapError, MapSurfaceLoader};
use crate::services::{Services, routes};

/// Stage of the location flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    PermissionPrompt,
    MapConfirm,
    FormEntry,
    ReadyToProceed,
    CheckoutEntry,
}

/// Outcome of confirming a map position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfirmed {
    pub coordinate: Coordinate,
    /// Whether the coordinates endpoint accepted it. The coordinate is kept
    /// for the address merge either way.
    pub persisted: bool,
}

/// Drives location selection from the permission prompt to checkout entry.
pub struct LocationFlowController<B, S, L: MapSurfaceLoader> {
    backend: B,
    services: Services,
    carrier: SelectionCarrier,
    acquirer: Arc<GeolocationAcquirer<S>>,
    loader: Arc<L>,
    default_position: Coordinate,
    stage: FlowStage,
    map: Option<MapConfirmation<S, L>>,
    form: AddressForm,
    last_coordinate: Option<Coordinate>,
    selection: Option<DeliverySelection>,
}

impl<B, S, L> LocationFlowController<B, S, L>
where
    B: DeliveryBackend,
    S: LocationSensor,
    L: MapSurfaceLoader,
{
    /// Start at the permission prompt.
    ///
    /// `default_position` seeds the map when no coordinate has been
    /// confirmed yet.
    pub fn new(
        backend: B,
        services: Services,
        carrier: SelectionCarrier,
        acquirer: Arc<GeolocationAcquirer<S>>,
        loader: Arc<L>,
        default_position: Coordinate,
    ) -> Self {
        Self {
            backend,
            services,
            carrier,
            acquirer,
            loader,
            default_position,
            stage: FlowStage::PermissionPrompt,
            map: None,
            form: AddressForm::new(),
            last_coordinate: None,
            selection: None,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> FlowStage {
        self.stage
    }

    /// Most recently confirmed map coordinate.
    #[must_use]
    pub const fn last_coordinate(&self) -> Option<Coordinate> {
        self.last_coordinate
    }

    /// The saved selection, once an address has been persisted.
    #[must_use]
    pub const fn selection(&self) -> Option<&DeliverySelection> {
        self.selection.as_ref()
    }

    #[must_use]
    pub const fn form(&self) -> &AddressForm {
        &self.form
    }

    pub const fn form_mut(&mut self) -> &mut AddressForm {
        &mut self.form
    }

    /// The open map modal, during [`FlowStage::MapConfirm`].
    pub const fn map_mut(&mut self) -> Option<&mut MapConfirmation<S, L>> {
        self.map.as_mut()
    }

    fn expect_stage(&self, action: &'static str, allowed: &[FlowStage]) -> Result<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(FlowError::UnexpectedStage {
                action,
                stage: self.stage,
            })
        }
    }

    fn transition(&mut self, to: FlowStage) {
        info!(from = ?self.stage, to = ?to, "Location flow transition");
        add_breadcrumb("flow", &format!("{:?} -> {to:?}", self.stage), None);
        self.stage = to;
    }

    /// The user agreed to share their location: open the map.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnexpectedStage`] outside the permission prompt.
    pub fn accept_location_prompt(&mut self) -> Result<()> {
        self.expect_stage("accept location prompt", &[FlowStage::PermissionPrompt])?;
        self.map = Some(MapConfirmation::open(
            Arc::clone(&self.acquirer),
            Arc::clone(&self.loader),
            Arc::clone(&self.services.notifier),
            self.last_coordinate,
            self.default_position,
        ));
        self.transition(FlowStage::MapConfirm);
        Ok(())
    }

    /// The user declined: go straight to the form with no coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnexpectedStage`] outside the permission prompt.
    pub fn decline_location_prompt(&mut self) -> Result<()> {
        self.expect_stage("decline location prompt", &[FlowStage::PermissionPrompt])?;
        self.transition(FlowStage::FormEntry);
        Ok(())
    }

    /// Close the map without confirming.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnexpectedStage`] unless the map is open.
    pub fn dismiss_map(&mut self) -> Result<()> {
        self.expect_stage("dismiss map", &[FlowStage::MapConfirm])?;
        self.map = None;
        self.transition(FlowStage::FormEntry);
        Ok(())
    }

    /// Confirm the map marker, close the map and persist the coordinate.
    ///
    /// The coordinate is recorded for the address merge before the
    /// coordinates request is sent; a failed request is reported to the user
    /// but does not undo the transition.
    ///
    /// # Errors
    ///
    /// - [`FlowError::UnexpectedStage`] unless the map is open
    /// - [`FlowError::Map`] while the map is still loading; the flow stays
    ///   on the map
    #[instrument(skip(self))]
    pub async fn confirm_map(&mut self) -> Result<MapConfirmed> {
        self.expect_stage("confirm map", &[FlowStage::MapConfirm])?;
        let coordinate = match &self.map {
            Some(map) => map.confirm()?,
            None => return Err(MapError::NotReady.into()),
        };

        self.last_coordinate = Some(coordinate);
        self.map = None;
        self.transition(FlowStage::FormEntry);

        let persisted = match self.backend.create_coordinates(coordinate).await {
            Ok(()) => {
                info!(%coordinate, "Coordinates saved");
                self.services
                    .notifier
                    .success("Location selected! Please fill in address details.");
                true
            }
            Err(e) => {
                let failure = PersistenceFailure::new(PersistOperation::Coordinates, e);
                report_persistence_failure(&failure);
                self.services.notifier.error(failure.user_message());
                false
            }
        };

        Ok(MapConfirmed {
            coordinate,
            persisted,
        })
    }

    /// Submit the address form, merging the last confirmed coordinate.
    ///
    /// May be repeated from [`FlowStage::ReadyToProceed`]; the newest save
    /// replaces the selection.
    ///
    /// # Errors
    ///
    /// - [`FlowError::UnexpectedStage`] before the form is shown
    /// - [`FlowError::Validation`] or [`FlowError::Persistence`] from the form
    pub async fn submit_address(&mut self) -> Result<&DeliverySelection> {
        self.expect_stage(
            "submit address",
            &[FlowStage::FormEntry, FlowStage::ReadyToProceed],
        )?;
        let selection = self
            .form
            .submit(
                &self.backend,
                self.services.notifier.as_ref(),
                self.last_coordinate,
            )
            .await?;

        if self.stage == FlowStage::FormEntry {
            self.transition(FlowStage::ReadyToProceed);
        }
        Ok(self.selection.insert(selection))
    }

    /// Returns `true` once there is a selection to proceed with.
    #[must_use]
    pub const fn can_proceed(&self) -> bool {
        self.selection.is_some()
    }

    /// Text of the proceed banner.
    #[must_use]
    pub fn delivery_banner(&self) -> String {
        self.selection.as_ref().map_or_else(
            || "Please select a delivery location".to_string(),
            |selection| format!("Delivering to: {}", selection.address.short_line()),
        )
    }

    /// Carry the selection to checkout and navigate there.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Precondition`] with no saved selection; the user is told
    ///   to pick one and the stage is unchanged
    /// - [`FlowError::Carrier`] if the selection cannot be stored
    #[instrument(skip(self))]
    pub fn proceed_to_checkout(&mut self) -> Result<()> {
        let Some(selection) = &self.selection else {
            warn!(stage = ?self.stage, "Proceed requested without a selection");
            self.services
                .notifier
                .error("Please select or add a delivery location");
            return Err(PreconditionFailure::NoSelection.into());
        };
        self.expect_stage("proceed to checkout", &[FlowStage::ReadyToProceed])?;

        self.carrier.save(selection)?;
        self.services
            .navigator
            .navigate(routes::CHECKOUT_CONFIRMATION);
        self.transition(FlowStage::CheckoutEntry);
        Ok(())
    }
}
