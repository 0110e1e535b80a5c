//! Sensor and map adapters for running the flow without a device or a
//! screen.

use doorstep_checkout::geolocation::{LocationSensor, Position, PositionOptions, SensorFailure};
use doorstep_checkout::map::{MapError, MapSurface, MapSurfaceLoader};
use doorstep_core::Coordinate;
use tracing::debug;

/// A sensor that reports a position given on the command line.
///
/// Without one it behaves like a device with no location capability.
#[derive(Debug, Clone, Copy)]
pub struct FixedSensor {
    fix: Option<Coordinate>,
}

impl FixedSensor {
    pub const fn new(fix: Option<Coordinate>) -> Self {
        Self { fix }
    }
}

impl LocationSensor for FixedSensor {
    fn is_supported(&self) -> bool {
        self.fix.is_some()
    }

    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, SensorFailure> {
        self.fix
            .map(Position::at)
            .ok_or(SensorFailure::PositionUnavailable)
    }
}

/// Map "library" that only logs what would be drawn.
#[derive(Debug, Default)]
pub struct LoggingMapLoader;

#[derive(Debug)]
pub struct LoggingSurface;

impl MapSurface for LoggingSurface {
    fn set_view(&mut self, center: Coordinate, zoom: u8) {
        debug!(%center, zoom, "Map view");
    }

    fn set_marker(&mut self, position: Coordinate) {
        debug!(%position, "Map marker");
    }
}

impl MapSurfaceLoader for LoggingMapLoader {
    type Surface = LoggingSurface;

    async fn load_surface(&self, center: Coordinate, zoom: u8) -> Result<LoggingSurface, MapError> {
        debug!(%center, zoom, "Map loaded");
        Ok(LoggingSurface)
    }
}
