//! Single-marker map confirmation.
//!
//! The map surface itself (tiles, rendering, gestures) lives behind
//! [`MapSurfaceLoader`] and [`MapSurface`]; this module owns the marker
//! position and the modal's rules:
//!
//! - the surface is loaded at most once per [`MapConfirmation`]
//! - until it is ready, every control is inert
//! - a failed load is logged and leaves the modal loading forever, so the
//!   user can never confirm a position they did not see

use std::future::Future;
use std::sync::Arc;

use doorstep_core::Coordinate;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::error::add_breadcrumb;
use crate::geolocation::{GeolocationAcquirer, LocationSensor, Position, SensorFailure};
use crate::services::Notifier;

/// Zoom used when the map first opens.
pub const INITIAL_ZOOM: u8 = 15;

/// Zoom used after "locate me" re-centres the map.
pub const LOCATE_ZOOM: u8 = 16;

/// Errors from the map modal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The surface has not finished loading (or never will).
    #[error("map is not ready")]
    NotReady,
    /// The map library failed to load.
    #[error("map failed to load: {0}")]
    Load(String),
    /// "Locate me" could not get a position.
    #[error(transparent)]
    Sensor(#[from] SensorFailure),
}

/// A loaded, interactive map showing one draggable marker.
pub trait MapSurface: Send {
    /// Centre the view.
    fn set_view(&mut self, center: Coordinate, zoom: u8);

    /// Move the marker.
    fn set_marker(&mut self, position: Coordinate);
}

/// Loads the map library and creates a surface.
pub trait MapSurfaceLoader: Send + Sync + 'static {
    type Surface: MapSurface;

    /// Load the library and create a surface centred on `center` with the
    /// marker placed there.
    fn load_surface(
        &self,
        center: Coordinate,
        zoom: u8,
    ) -> impl Future<Output = Result<Self::Surface, MapError>> + Send;
}

/// User interaction reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// The marker was dropped at a new position.
    MarkerDragEnd(Coordinate),
    /// The map was clicked; the marker jumps there.
    Click(Coordinate),
}

enum SurfaceState<T> {
    Unloaded,
    Ready(T),
    Failed,
}

/// The map confirmation modal.
pub struct MapConfirmation<S, L: MapSurfaceLoader> {
    acquirer: Arc<GeolocationAcquirer<S>>,
    loader: Arc<L>,
    notifier: Arc<dyn Notifier>,
    initial_position: Option<Coordinate>,
    marker: Coordinate,
    interacted: bool,
    surface: SurfaceState<L::Surface>,
}

impl<S: LocationSensor, L: MapSurfaceLoader> MapConfirmation<S, L> {
    /// Open the modal.
    ///
    /// The marker starts at `initial_position`, or at `fallback` when there
    /// is none. Call [`MapConfirmation::ensure_loaded`] to bring up the
    /// surface.
    pub fn open(
        acquirer: Arc<GeolocationAcquirer<S>>,
        loader: Arc<L>,
        notifier: Arc<dyn Notifier>,
        initial_position: Option<Coordinate>,
        fallback: Coordinate,
    ) -> Self {
        Self {
            acquirer,
            loader,
            notifier,
            initial_position,
            marker: initial_position.unwrap_or(fallback),
            interacted: false,
            surface: SurfaceState::Unloaded,
        }
    }

    /// Load the surface if this modal has not tried yet.
    ///
    /// Once a load has settled, later calls are no-ops whatever the outcome
    /// was. A load whose future is dropped before it settles does not count,
    /// and the next call starts over.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NotReady`] if the surface is not ready after
    /// this call, including when an earlier load failed.
    #[instrument(skip(self), fields(center = %self.marker))]
    pub async fn ensure_loaded(&mut self) -> Result<(), MapError> {
        if matches!(self.surface, SurfaceState::Unloaded) {
            debug!("Loading map surface");
            match self.loader.load_surface(self.marker, INITIAL_ZOOM).await {
                Ok(surface) => {
                    debug!("Map surface ready");
                    self.surface = SurfaceState::Ready(surface);
                }
                Err(e) => {
                    error!(error = %e, "Map loading error");
                    self.surface = SurfaceState::Failed;
                }
            }
        }

        if self.is_loading() {
            Err(MapError::NotReady)
        } else {
            Ok(())
        }
    }

    /// `true` until the surface is ready; stays `true` after a failed load.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        !matches!(self.surface, SurfaceState::Ready(_))
    }

    /// Where the marker currently is.
    #[must_use]
    pub const fn marker_position(&self) -> Coordinate {
        self.marker
    }

    /// The position the modal was opened with.
    #[must_use]
    pub const fn initial_position(&self) -> Option<Coordinate> {
        self.initial_position
    }

    /// Apply a drag or click. Ignored while loading or when the position is
    /// out of range.
    ///
    /// Returns `true` if the marker moved.
    pub fn handle_event(&mut self, event: MapEvent) -> bool {
        let SurfaceState::Ready(surface) = &mut self.surface else {
            return false;
        };

        let position = match event {
            MapEvent::MarkerDragEnd(position) | MapEvent::Click(position) => position,
        };

        if !position.is_valid() {
            debug!(?event, "Ignoring out-of-range map event");
            if matches!(event, MapEvent::MarkerDragEnd(_)) {
                // The surface already drew the drop; put it back.
                surface.set_marker(self.marker);
            }
            return false;
        }

        if matches!(event, MapEvent::Click(_)) {
            surface.set_marker(position);
        }

        self.marker = position;
        self.interacted = true;
        true
    }

    /// Centre on the device's position and move the marker there.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NotReady`] while loading, or
    /// [`MapError::Sensor`] when no position could be acquired; the marker is
    /// left where it was and the user is notified.
    #[instrument(skip(self))]
    pub async fn locate_me(&mut self) -> Result<Position, MapError> {
        if self.is_loading() {
            return Err(MapError::NotReady);
        }

        let result = self.acquirer.acquire().await;

        match result {
            Ok(position) => {
                if let SurfaceState::Ready(surface) = &mut self.surface {
                    surface.set_view(position.coordinate, LOCATE_ZOOM);
                    surface.set_marker(position.coordinate);
                }
                self.marker = position.coordinate;
                self.interacted = true;

                let message = position.accuracy.map_or_else(
                    || "GPS location detected!".to_string(),
                    |accuracy| format!("GPS location detected! Accuracy: {accuracy:.0}m"),
                );
                self.notifier.success(&message);
                Ok(position)
            }
            Err(failure) => {
                self.notifier.error(failure.user_message());
                Err(failure.into())
            }
        }
    }

    /// Confirm the marker's position.
    ///
    /// Without any interaction this is the position the modal opened with,
    /// or the fallback default.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NotReady`] while the surface is loading.
    pub fn confirm(&self) -> Result<Coordinate, MapError> {
        if self.is_loading() {
            return Err(MapError::NotReady);
        }
        if !self.interacted {
            debug!(position = %self.marker, "Confirming untouched marker");
        }
        info!(position = %self.marker, "Map location confirmed");
        let (lat, lng) = (self.marker.lat.to_string(), self.marker.lng.to_string());
        add_breadcrumb(
            "map",
            "Location confirmed",
            Some(&[("lat", lat.as_str()), ("lng", lng.as_str())]),
        );
        Ok(self.marker)
    }
}
