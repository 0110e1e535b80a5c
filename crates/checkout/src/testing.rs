//! In-process doubles for the flow's collaborators.
//!
//! Available to this crate's tests and, with the `test-support` feature, to
//! downstream crates. Every double is cheap to clone and shares its state
//! between clones, so a test can keep a handle for assertions after handing
//! one to the code under test.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use doorstep_core::{
    AddressId, AddressInput, CartLine, Coordinate, NewAddress, OrderConfirmation, OrderId,
    OrderSubmission, Price, ProductId, SavedAddress,
};

use crate::backend::{ApiError, DeliveryBackend};
use crate::geolocation::{LocationSensor, Position, PositionOptions, SensorFailure};
use crate::map::{MapError, MapSurface, MapSurfaceLoader};
use crate::services::Notifier;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Location sensor
// =============================================================================

/// Sensor that replays queued results in order.
///
/// An empty queue answers [`SensorFailure::PositionUnavailable`].
#[derive(Clone)]
pub struct ScriptedSensor {
    supported: bool,
    delay: Duration,
    script: Arc<SensorScript>,
}

#[derive(Default)]
struct SensorScript {
    queue: Mutex<VecDeque<Result<Position, SensorFailure>>>,
    calls: AtomicUsize,
}

impl ScriptedSensor {
    /// A supported sensor with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            supported: true,
            delay: Duration::ZERO,
            script: Arc::default(),
        }
    }

    /// A device without location capability.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Wait `delay` before answering each request.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a result.
    pub fn push(&self, result: Result<Position, SensorFailure>) {
        lock(&self.script.queue).push_back(result);
    }

    /// Queue a fix with no accuracy estimate.
    pub fn push_fix(&self, coordinate: Coordinate) {
        self.push(Ok(Position::at(coordinate)));
    }

    /// Queue a failure.
    pub fn push_failure(&self, failure: SensorFailure) {
        self.push(Err(failure));
    }

    /// How many times the sensor was polled.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSensor for ScriptedSensor {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, SensorFailure> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        lock(&self.script.queue)
            .pop_front()
            .unwrap_or(Err(SensorFailure::PositionUnavailable))
    }
}

// =============================================================================
// Map surface
// =============================================================================

#[derive(Default)]
struct MapLog {
    loads: AtomicUsize,
    delay: Mutex<Duration>,
    pending_failure: Mutex<Option<String>>,
    views: Mutex<Vec<(Coordinate, u8)>>,
    markers: Mutex<Vec<Coordinate>>,
}

/// Map loader that records what the modal asks the surface to do.
#[derive(Clone, Default)]
pub struct ScriptedMapLoader {
    log: Arc<MapLog>,
}

impl ScriptedMapLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `delay` to finish each load.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *lock(&self.log.delay) = delay;
        self
    }

    /// Make the next load fail with `message`.
    pub fn fail_next_load(&self, message: &str) {
        *lock(&self.log.pending_failure) = Some(message.to_string());
    }

    /// How many loads were attempted.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.log.loads.load(Ordering::SeqCst)
    }

    /// Every `(center, zoom)` the surface was shown at, starting with the
    /// load itself.
    #[must_use]
    pub fn surface_log(&self) -> Vec<(Coordinate, u8)> {
        lock(&self.log.views).clone()
    }

    /// Every explicit marker move.
    #[must_use]
    pub fn marker_moves(&self) -> Vec<Coordinate> {
        lock(&self.log.markers).clone()
    }
}

/// Surface handed out by [`ScriptedMapLoader`].
pub struct ScriptedSurface {
    log: Arc<MapLog>,
}

impl MapSurface for ScriptedSurface {
    fn set_view(&mut self, center: Coordinate, zoom: u8) {
        lock(&self.log.views).push((center, zoom));
    }

    fn set_marker(&mut self, position: Coordinate) {
        lock(&self.log.markers).push(position);
    }
}

impl MapSurfaceLoader for ScriptedMapLoader {
    type Surface = ScriptedSurface;

    async fn load_surface(&self, center: Coordinate, zoom: u8) -> Result<ScriptedSurface, MapError> {
        self.log.loads.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.log.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = lock(&self.log.pending_failure).take() {
            return Err(MapError::Load(message));
        }
        lock(&self.log.views).push((center, zoom));
        Ok(ScriptedSurface {
            log: Arc::clone(&self.log),
        })
    }
}

// =============================================================================
// Backend
// =============================================================================

#[derive(Default)]
struct BackendState {
    latency: Mutex<Duration>,
    fail_address: AtomicBool,
    fail_coordinates: AtomicBool,
    fail_orders: AtomicBool,
    address_calls: AtomicUsize,
    coordinate_calls: AtomicUsize,
    order_calls: AtomicUsize,
    addresses: Mutex<Vec<NewAddress>>,
    coordinates: Mutex<Vec<Coordinate>>,
    orders: Mutex<Vec<OrderSubmission>>,
}

/// In-memory [`DeliveryBackend`] with failure switches and call counters.
///
/// Saved addresses echo the request with a generated id; calls are counted
/// whether or not they fail.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<BackendState>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *lock(&self.state.latency) = latency;
        self
    }

    pub fn fail_address(&self, fail: bool) {
        self.state.fail_address.store(fail, Ordering::SeqCst);
    }

    pub fn fail_coordinates(&self, fail: bool) {
        self.state.fail_coordinates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_orders(&self, fail: bool) {
        self.state.fail_orders.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn address_calls(&self) -> usize {
        self.state.address_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn coordinate_calls(&self) -> usize {
        self.state.coordinate_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn order_calls(&self) -> usize {
        self.state.order_calls.load(Ordering::SeqCst)
    }

    /// Address bodies received.
    #[must_use]
    pub fn addresses(&self) -> Vec<NewAddress> {
        lock(&self.state.addresses).clone()
    }

    /// Coordinates received.
    #[must_use]
    pub fn coordinates(&self) -> Vec<Coordinate> {
        lock(&self.state.coordinates).clone()
    }

    /// Order bodies received.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderSubmission> {
        lock(&self.state.orders).clone()
    }

    async fn simulate_latency(&self) {
        let latency = *lock(&self.state.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn rejected() -> ApiError {
    ApiError::Api {
        status: 500,
        message: "simulated failure".to_string(),
    }
}

impl DeliveryBackend for FakeBackend {
    async fn create_address(&self, address: &NewAddress) -> Result<SavedAddress, ApiError> {
        let n = self.state.address_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_latency().await;
        lock(&self.state.addresses).push(address.clone());
        if self.state.fail_address.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        Ok(SavedAddress {
            id: AddressId::new(format!("addr_{n}")),
            address_line1: address.address_line1.clone(),
            address_line2: address.address_line2.clone(),
            landmark: address.landmark.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            user_id: None,
        })
    }

    async fn create_coordinates(&self, coordinate: Coordinate) -> Result<(), ApiError> {
        self.state.coordinate_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        lock(&self.state.coordinates).push(coordinate);
        if self.state.fail_coordinates.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        Ok(())
    }

    async fn create_order(&self, order: &OrderSubmission) -> Result<OrderConfirmation, ApiError> {
        let n = self.state.order_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_latency().await;
        lock(&self.state.orders).push(order.clone());
        if self.state.fail_orders.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        Ok(OrderConfirmation {
            id: Some(OrderId::new(format!("order_{n}"))),
            message: Some("Order created".to_string()),
        })
    }
}

// =============================================================================
// Notifier
// =============================================================================

/// A toast as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toast {
    Success(String),
    Error(String),
}

/// Notifier that keeps every toast.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    /// Every toast, oldest first.
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        lock(&self.toasts).clone()
    }

    /// The most recent toast.
    #[must_use]
    pub fn last(&self) -> Option<Toast> {
        lock(&self.toasts).last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        lock(&self.toasts).push(Toast::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        lock(&self.toasts).push(Toast::Error(message.to_string()));
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A fully filled address form.
#[must_use]
pub fn metropolis_input() -> AddressInput {
    AddressInput {
        street_address: "123 Main St".to_string(),
        apartment: "Apt 4".to_string(),
        landmark: String::new(),
        city: "Metropolis".to_string(),
        state: "NY".to_string(),
        postal_code: "10001".to_string(),
        country: "US".to_string(),
    }
}

/// The same street address with only the required fields filled in.
#[must_use]
pub fn main_street_input() -> AddressInput {
    AddressInput {
        apartment: String::new(),
        ..metropolis_input()
    }
}

/// Two cart lines: two pineapples at $5 and one mango at $3.50.
#[must_use]
pub fn sample_lines() -> Vec<CartLine> {
    vec![
        CartLine {
            id: ProductId::new("p1"),
            title: "Pineapple".to_string(),
            price: Price::from_cents(500),
            quantity: 2,
        },
        CartLine {
            id: ProductId::new("p2"),
            title: "Mango".to_string(),
            price: Price::from_cents(350),
            quantity: 1,
        },
    ]
}
