//! Order summary and placement.
//!
//! # Submission guard
//!
//! [`CheckoutOrchestrator::place_order`] takes `&self` so a host can call it
//! from several handlers at once. A flag is set before the order request is
//! sent and cleared when the request settles, whichever way it settles
//! (success, failure, or the future being dropped). Calls made while the
//! flag is set return [`CheckoutError::InFlight`] without touching the
//! network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use doorstep_core::{
    CartState, Coordinate, DeliverySelection, OrderConfirmation, OrderSubmission, Price,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::backend::DeliveryBackend;
use crate::carrier::SelectionCarrier;
use crate::error::{
    PersistOperation, PersistenceFailure, PreconditionFailure, add_breadcrumb,
    report_persistence_failure,
};
use crate::services::{Services, routes};

/// Why an order was not placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Another placement is still waiting for the backend.
    #[error("an order is already being placed")]
    InFlight,

    /// This checkout already produced an order.
    #[error("the order was already placed")]
    AlreadyPlaced,

    #[error("the cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Persistence(#[from] PersistenceFailure),
}

/// One line of the order summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub title: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub extended_price: Price,
}

/// What the user is about to order, and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub lines: Vec<SummaryLine>,
    pub total_price: Price,
    pub item_count: u32,
    pub address_lines: Vec<String>,
    pub coordinates: Option<Coordinate>,
}

/// A successfully placed order.
#[derive(Debug)]
pub struct OrderPlaced {
    pub confirmation: OrderConfirmation,
    pub placed_at: DateTime<Utc>,
    /// Completes once the post-order navigation home has happened.
    pub redirect: JoinHandle<()>,
}

struct SubmissionGuard<'a>(&'a AtomicBool);

impl<'a> SubmissionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The checkout confirmation stage.
pub struct CheckoutOrchestrator<B> {
    backend: B,
    services: Services,
    carrier: SelectionCarrier,
    redirect_delay: Duration,
    selection: DeliverySelection,
    cart: CartState,
    submitting: AtomicBool,
    placed: AtomicBool,
}

impl<B: DeliveryBackend> CheckoutOrchestrator<B> {
    /// Enter checkout: read the carried selection and snapshot the cart.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionFailure::MissingSelection`] after navigating to
    /// location selection when nothing was carried.
    #[instrument(skip_all)]
    pub fn enter(
        backend: B,
        services: Services,
        carrier: SelectionCarrier,
        redirect_delay: Duration,
    ) -> Result<Self, PreconditionFailure> {
        let Some(selection) = carrier.load() else {
            warn!("Checkout entered without a delivery selection");
            services.navigator.navigate(routes::DELIVERY_LOCATION);
            return Err(PreconditionFailure::MissingSelection);
        };

        let cart = services.cart.snapshot();
        info!(
            address_id = %selection.address.id,
            items = cart.orders_count,
            total = %cart.total_price,
            "Checkout entered"
        );

        Ok(Self {
            backend,
            services,
            carrier,
            redirect_delay,
            selection,
            cart,
            submitting: AtomicBool::new(false),
            placed: AtomicBool::new(false),
        })
    }

    /// The selection being delivered to.
    #[must_use]
    pub const fn selection(&self) -> &DeliverySelection {
        &self.selection
    }

    /// Summary shown before placement.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            lines: self
                .cart
                .added_products
                .iter()
                .map(|line| SummaryLine {
                    title: line.title.clone(),
                    quantity: line.quantity,
                    unit_price: line.price,
                    extended_price: line.extended_price(),
                })
                .collect(),
            total_price: self.cart.total_price,
            item_count: self.cart.orders_count,
            address_lines: self.selection.address.display_lines(),
            coordinates: self.selection.coordinates,
        }
    }

    /// Returns `true` while an order request is outstanding.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Returns `true` if the place-order control should be enabled.
    #[must_use]
    pub fn can_place_order(&self) -> bool {
        !self.cart.is_empty() && !self.is_submitting() && !self.placed.load(Ordering::Acquire)
    }

    /// Submit the order.
    ///
    /// On success the cart and the carried selection are cleared and
    /// navigation home is scheduled after the configured delay. On failure
    /// nothing is cleared and the user can retry.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::InFlight`] while another call is pending
    /// - [`CheckoutError::AlreadyPlaced`] after a successful placement
    /// - [`CheckoutError::EmptyCart`] when there is nothing to order
    /// - [`CheckoutError::Persistence`] when the order request fails
    #[instrument(skip(self), fields(address_id = %self.selection.address.id))]
    pub async fn place_order(&self) -> Result<OrderPlaced, CheckoutError> {
        if self.placed.load(Ordering::Acquire) {
            debug!("Order already placed; ignoring");
            return Err(CheckoutError::AlreadyPlaced);
        }
        if self.cart.is_empty() {
            warn!("Refusing to place an order for an empty cart");
            return Err(CheckoutError::EmptyCart);
        }
        let Some(_guard) = SubmissionGuard::acquire(&self.submitting) else {
            debug!("Order placement already in flight; ignoring");
            return Err(CheckoutError::InFlight);
        };

        let submission = OrderSubmission {
            cart: self.cart.clone(),
            user_info: self.services.session.current_user(),
            delivery_location: self.selection.clone(),
        };
        if submission.user_info.is_none() {
            warn!("Placing order without a signed-in user");
        }

        match self.backend.create_order(&submission).await {
            Ok(confirmation) => {
                self.placed.store(true, Ordering::Release);
                self.services.cart.clear();
                self.carrier.clear();

                info!(
                    order_id = confirmation.id.as_ref().map(|id| id.as_str()),
                    total = %self.cart.total_price,
                    "Order placed"
                );
                add_breadcrumb("checkout", "Order placed", None);
                self.services
                    .notifier
                    .success("Order placed successfully! Redirecting to home...");

                Ok(OrderPlaced {
                    confirmation,
                    placed_at: Utc::now(),
                    redirect: self.schedule_redirect(),
                })
            }
            Err(e) => {
                let failure = PersistenceFailure::new(PersistOperation::Order, e);
                report_persistence_failure(&failure);
                self.services.notifier.error(failure.user_message());
                Err(failure.into())
            }
        }
    }

    fn schedule_redirect(&self) -> JoinHandle<()> {
        let navigator = self.services.navigator.clone();
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(routes::HOME);
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::carrier::MemorySessionStorage;
    use crate::services::{CartStore, HistoryNavigator, InMemoryCart, Navigator, StaticSession};
    use crate::testing::{FakeBackend, RecordingNotifier, Toast, metropolis_input, sample_lines};
    use doorstep_core::{AddressId, SavedAddress, UserInfo};

    const DELAY: Duration = Duration::from_millis(2000);

    struct Fixture {
        backend: FakeBackend,
        navigator: Arc<HistoryNavigator>,
        cart: Arc<InMemoryCart>,
        notifier: Arc<RecordingNotifier>,
        carrier: SelectionCarrier,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                backend: FakeBackend::new(),
                navigator: Arc::new(HistoryNavigator::starting_at(
                    routes::CHECKOUT_CONFIRMATION,
                )),
                cart: Arc::new(InMemoryCart::with_lines(sample_lines())),
                notifier: Arc::new(RecordingNotifier::default()),
                carrier: SelectionCarrier::new(Arc::new(MemorySessionStorage::new())),
            }
        }

        fn with_latency(mut self, latency: Duration) -> Self {
            self.backend = self.backend.with_latency(latency);
            self
        }

        fn carry(&self, coordinates: Option<Coordinate>) -> DeliverySelection {
            let input = metropolis_input();
            let body = input.to_new_address();
            let selection = DeliverySelection::new(
                SavedAddress {
                    id: AddressId::new("addr_1"),
                    address_line1: body.address_line1,
                    address_line2: body.address_line2,
                    landmark: body.landmark,
                    city: body.city,
                    state: body.state,
                    postal_code: body.postal_code,
                    country: body.country,
                    user_id: None,
                },
                coordinates,
            );
            self.carrier.save(&selection).unwrap();
            selection
        }

        fn services(&self) -> Services {
            Services::new(
                Arc::new(StaticSession::signed_in(UserInfo::new("user_1"))),
                self.navigator.clone(),
                self.cart.clone(),
                self.notifier.clone(),
            )
        }

        fn enter(&self) -> Result<CheckoutOrchestrator<FakeBackend>, PreconditionFailure> {
            CheckoutOrchestrator::enter(
                self.backend.clone(),
                self.services(),
                self.carrier.clone(),
                DELAY,
            )
        }
    }

    #[test]
    fn test_missing_selection_redirects() {
        let fx = Fixture::new();

        let err = fx.enter().err().unwrap();
        assert_eq!(err, PreconditionFailure::MissingSelection);
        assert_eq!(fx.navigator.current_path(), routes::DELIVERY_LOCATION);
    }

    #[test]
    fn test_summary_lines_and_totals() {
        let fx = Fixture::new();
        fx.carry(None);
        let checkout = fx.enter().unwrap();

        let summary = checkout.summary();
        assert_eq!(summary.lines.len(), 2);
        assert_eq!(summary.lines[0].unit_price, Price::from_cents(500));
        assert_eq!(summary.lines[0].extended_price, Price::from_cents(1000));
        assert_eq!(summary.total_price, Price::from_cents(1350));
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.address_lines[0], "123 Main St");
        assert_eq!(summary.coordinates, None);
        assert!(checkout.can_place_order());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_cart_and_selection_then_goes_home() {
        let fx = Fixture::new();
        let selection = fx.carry(Some(Coordinate::new(12.34, 56.78)));
        let checkout = fx.enter().unwrap();

        let placed = checkout.place_order().await.unwrap();
        assert_eq!(placed.confirmation.id.unwrap().as_str(), "order_1");
        assert!(fx.cart.snapshot().is_empty());
        assert!(fx.carrier.load().is_none());
        assert_eq!(
            fx.notifier.last(),
            Some(Toast::Success(
                "Order placed successfully! Redirecting to home...".to_string()
            ))
        );

        let order = &fx.backend.orders()[0];
        assert_eq!(order.delivery_location, selection);
        assert_eq!(order.cart.orders_count, 3);
        assert_eq!(order.user_info.as_ref().unwrap().id.as_str(), "user_1");

        assert_eq!(fx.navigator.current_path(), routes::CHECKOUT_CONFIRMATION);
        placed.redirect.await.unwrap();
        assert_eq!(fx.navigator.current_path(), routes::HOME);
        assert!(!checkout.can_place_order());
        assert!(matches!(
            checkout.place_order().await,
            Err(CheckoutError::AlreadyPlaced)
        ));
        assert_eq!(fx.backend.order_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_waits_for_delay() {
        let fx = Fixture::new();
        fx.carry(None);
        let checkout = fx.enter().unwrap();

        let placed = checkout.place_order().await.unwrap();
        tokio::time::sleep(DELAY - Duration::from_millis(1)).await;
        assert_eq!(fx.navigator.current_path(), routes::CHECKOUT_CONFIRMATION);
        placed.redirect.await.unwrap();
        assert_eq!(fx.navigator.current_path(), routes::HOME);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_place_order_sends_one_request() {
        let fx = Fixture::new().with_latency(Duration::from_millis(500));
        fx.carry(None);
        let checkout = fx.enter().unwrap();

        let (first, second) = tokio::join!(checkout.place_order(), checkout.place_order());

        assert!(first.is_ok());
        assert!(matches!(second, Err(CheckoutError::InFlight)));
        assert_eq!(fx.backend.order_calls(), 1);
        assert!(!checkout.is_submitting());
    }

    #[tokio::test]
    async fn test_failure_keeps_state_and_releases_guard() {
        let fx = Fixture::new();
        fx.backend.fail_orders(true);
        let selection = fx.carry(None);
        let checkout = fx.enter().unwrap();

        let err = checkout.place_order().await.unwrap_err();
        assert!(matches!(err, CheckoutError::Persistence(_)));
        assert!(!checkout.is_submitting());
        assert!(checkout.can_place_order());
        assert_eq!(fx.cart.snapshot().orders_count, 3);
        assert_eq!(fx.carrier.load(), Some(selection));
        assert_eq!(
            fx.notifier.last(),
            Some(Toast::Error(
                "Error placing order. Please try again.".to_string()
            ))
        );

        fx.backend.fail_orders(false);
        assert!(checkout.place_order().await.is_ok());
        assert_eq!(fx.backend.order_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_submission_releases_guard() {
        let fx = Fixture::new().with_latency(Duration::from_secs(60));
        fx.carry(None);
        let checkout = fx.enter().unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(10), checkout.place_order());
        assert!(pending.await.is_err());
        assert!(!checkout.is_submitting());
        assert!(fx.carrier.load().is_some());
    }

    #[tokio::test]
    async fn test_empty_cart_blocks_placement() {
        let fx = Fixture::new();
        fx.cart.clear();
        fx.carry(None);
        let checkout = fx.enter().unwrap();

        assert!(!checkout.can_place_order());
        assert!(matches!(
            checkout.place_order().await,
            Err(CheckoutError::EmptyCart)
        ));
        assert_eq!(fx.backend.order_calls(), 0);
    }
}
