//! Device location acquisition.
//!
//! [`GeolocationAcquirer`] wraps a [`LocationSensor`] and turns every
//! outcome into either a [`Position`] or a classified [`SensorFailure`]:
//!
//! - an unsupported sensor fails immediately, without being polled
//! - the configured timeout is enforced here, not left to the sensor
//! - a fix younger than `maximum_age` is reused instead of polling again
//! - an insecure origin produces a logged advisory, never a failure

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use doorstep_core::Coordinate;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::{Host, Url};

/// Options for a single acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Prefer GPS-grade fixes over network-based ones.
    pub enable_high_accuracy: bool,
    /// Give up after this long.
    pub timeout: Duration,
    /// Accept a previous fix up to this old.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(30),
            maximum_age: Duration::from_secs(60),
        }
    }
}

/// A location fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coordinate: Coordinate,
    /// Accuracy radius in metres, when the sensor reports one.
    pub accuracy: Option<f64>,
}

impl Position {
    /// A fix with no accuracy information.
    #[must_use]
    pub const fn at(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            accuracy: None,
        }
    }
}

/// Why a location could not be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SensorFailure {
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("unknown location error")]
    Unknown,
}

impl SensorFailure {
    /// Classify a W3C `GeolocationPositionError` code.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            _ => Self::Unknown,
        }
    }

    /// The W3C error code, where one exists.
    #[must_use]
    pub const fn code(self) -> Option<u16> {
        match self {
            Self::PermissionDenied => Some(1),
            Self::PositionUnavailable => Some(2),
            Self::Timeout => Some(3),
            Self::Unsupported | Self::Unknown => None,
        }
    }

    /// Text shown to the user.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::Unsupported => "Geolocation is not supported by your browser.",
            Self::PermissionDenied => {
                "Location access denied. Please enable location permissions in your browser settings."
            }
            Self::PositionUnavailable => {
                "Location information is unavailable. Please check your device GPS."
            }
            Self::Timeout => "Location request timed out. Please try again.",
            Self::Unknown => "An unknown error occurred while getting location.",
        }
    }
}

/// The device location sensor.
pub trait LocationSensor: Send + Sync + 'static {
    /// Whether the device exposes a location capability at all.
    fn is_supported(&self) -> bool;

    /// Request one fix.
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<Position, SensorFailure>> + Send;
}

/// Non-fatal warning that the origin may be refused location access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{origin} is not a secure context; some browsers refuse geolocation over plain HTTP"
)]
pub struct InsecureContextAdvisory {
    pub origin: String,
}

/// Check whether `origin` is a secure context.
///
/// HTTPS origins are secure, and so are loopback hosts, which browsers treat
/// as a local-development exception.
#[must_use]
pub fn secure_context_advisory(origin: &Url) -> Option<InsecureContextAdvisory> {
    let local = match origin.host() {
        Some(Host::Domain(domain)) => domain == "localhost" || domain.ends_with(".localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };

    if origin.scheme() == "https" || local {
        None
    } else {
        Some(InsecureContextAdvisory {
            origin: origin.origin().ascii_serialization(),
        })
    }
}

/// Acquires positions from a [`LocationSensor`].
pub struct GeolocationAcquirer<S> {
    sensor: S,
    options: PositionOptions,
    advisory: Option<InsecureContextAdvisory>,
    last_fix: Mutex<Option<(Instant, Position)>>,
}

impl<S: LocationSensor> GeolocationAcquirer<S> {
    /// Create an acquirer for a client served from `origin`.
    pub fn new(sensor: S, options: PositionOptions, origin: &Url) -> Self {
        Self {
            sensor,
            options,
            advisory: secure_context_advisory(origin),
            last_fix: Mutex::new(None),
        }
    }

    /// The default options used by [`GeolocationAcquirer::acquire`].
    #[must_use]
    pub const fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// The insecure-context advisory, if the origin triggered one.
    #[must_use]
    pub const fn advisory(&self) -> Option<&InsecureContextAdvisory> {
        self.advisory.as_ref()
    }

    /// The wrapped sensor.
    pub const fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Acquire a position with the default options.
    ///
    /// # Errors
    ///
    /// See [`GeolocationAcquirer::acquire_with`].
    pub async fn acquire(&self) -> Result<Position, SensorFailure> {
        let options = self.options;
        self.acquire_with(&options).await
    }

    /// Acquire a position.
    ///
    /// # Errors
    ///
    /// Returns [`SensorFailure::Unsupported`] without polling when the sensor
    /// is absent, [`SensorFailure::Timeout`] when `options.timeout` elapses,
    /// or whatever failure the sensor reports.
    #[instrument(skip(self), fields(high_accuracy = options.enable_high_accuracy))]
    pub async fn acquire_with(&self, options: &PositionOptions) -> Result<Position, SensorFailure> {
        if !self.sensor.is_supported() {
            warn!("Geolocation not supported");
            return Err(SensorFailure::Unsupported);
        }

        if let Some(advisory) = &self.advisory {
            warn!(%advisory, "Location may be refused outside a secure context");
        }

        if let Some(position) = self.cached_fix(options.maximum_age) {
            debug!(coordinate = %position.coordinate, "Reusing cached fix");
            return Ok(position);
        }

        let result =
            match tokio::time::timeout(options.timeout, self.sensor.current_position(options))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(SensorFailure::Timeout),
            };

        match &result {
            Ok(position) => {
                info!(
                    coordinate = %position.coordinate,
                    accuracy = position.accuracy,
                    "Location acquired"
                );
                if let Ok(mut last_fix) = self.last_fix.lock() {
                    *last_fix = Some((Instant::now(), *position));
                }
            }
            Err(failure) => warn!(%failure, code = failure.code(), "Location acquisition failed"),
        }

        result
    }

    fn cached_fix(&self, maximum_age: Duration) -> Option<Position> {
        let last_fix = self.last_fix.lock().ok()?;
        let (taken_at, position) = (*last_fix)?;
        (!maximum_age.is_zero() && taken_at.elapsed() <= maximum_age).then_some(position)
    }
}
