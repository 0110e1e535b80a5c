//! End-to-end checkout: location selection, address save, order placement.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use doorstep_checkout::carrier::MemorySessionStorage;
use doorstep_checkout::services::{
    HistoryNavigator, InMemoryCart, StaticSession, TracingNotifier, routes,
};
use doorstep_checkout::{
    ApiError, CheckoutOrchestrator, ClientConfig, GeolocationAcquirer, HttpBackend, LocationFlowController,
    SelectionCarrier, Services,
};
use doorstep_core::{AddressInput, CartLine, Coordinate, SessionStatus};
use thiserror::Error;
use tracing::{info, warn};

use crate::headless::{FixedSensor, LoggingMapLoader};

/// Errors reading the cart file.
#[derive(Debug, Error)]
pub enum CartFileError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("{0} contains no items")]
    Empty(String),
}

/// Arguments for `doorstep checkout`.
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Cart file (YAML or JSON list of `{id, title, price, quantity}`)
    #[arg(long)]
    pub cart: PathBuf,

    /// Street address
    #[arg(long)]
    pub street: String,

    /// Apartment, suite, unit
    #[arg(long, default_value = "")]
    pub apartment: String,

    /// Nearby landmark
    #[arg(long, default_value = "")]
    pub landmark: String,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub state: String,

    #[arg(long)]
    pub postal_code: String,

    #[arg(long)]
    pub country: String,

    /// Latitude of the delivery point; confirms it on the map
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the delivery point
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,
}

impl CheckoutArgs {
    fn address(&self) -> AddressInput {
        AddressInput {
            street_address: self.street.clone(),
            apartment: self.apartment.clone(),
            landmark: self.landmark.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
    }

    fn fix(&self) -> Result<Option<Coordinate>, Box<dyn std::error::Error>> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Ok(Some(Coordinate::try_new(lat, lng)?)),
            _ => Ok(None),
        }
    }
}

/// Load cart lines from a YAML (or JSON) file.
///
/// # Errors
///
/// Returns [`CartFileError`] if the file is unreadable, malformed or empty.
pub async fn load_cart(path: &Path) -> Result<Vec<CartLine>, CartFileError> {
    let display = path.display().to_string();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CartFileError::Read {
            path: display.clone(),
            source,
        })?;
    let lines: Vec<CartLine> =
        serde_yaml::from_str(&content).map_err(|source| CartFileError::Parse {
            path: display.clone(),
            source,
        })?;
    if lines.is_empty() {
        return Err(CartFileError::Empty(display));
    }
    Ok(lines)
}

/// Build the cart, merging lines that repeat a product.
fn cart_from_lines(lines: Vec<CartLine>) -> InMemoryCart {
    let cart = InMemoryCart::default();
    for line in lines {
        cart.add(line);
    }
    cart
}

/// Who the order is placed for. A failed session check counts as signed out.
fn session_from(result: Result<SessionStatus, ApiError>) -> StaticSession {
    let user = match result {
        Ok(session) => session.user_info.filter(|_| session.status),
        Err(e) => {
            warn!(error = %e, "Session check failed");
            None
        }
    };
    if user.is_none() {
        warn!("Not signed in; the order will carry no user");
    }
    user.map_or_else(StaticSession::anonymous, StaticSession::signed_in)
}

/// Run the whole flow against the configured backend.
///
/// # Errors
///
/// Returns an error from whichever step fails first; earlier steps are not
/// rolled back (a saved address stays saved).
pub async fn run(config: &ClientConfig, args: CheckoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let lines = load_cart(&args.cart).await?;
    info!(items = lines.len(), "Cart loaded");

    let backend = HttpBackend::new(&config.api)?;
    let session = session_from(backend.fetch_session().await);

    let services = Services::new(
        Arc::new(session),
        Arc::new(HistoryNavigator::starting_at(routes::DELIVERY_LOCATION)),
        Arc::new(cart_from_lines(lines)),
        Arc::new(TracingNotifier),
    );
    let carrier = SelectionCarrier::new(Arc::new(MemorySessionStorage::new()));

    let fix = args.fix()?;
    let acquirer = GeolocationAcquirer::new(FixedSensor::new(fix), config.geolocation, &config.origin);
    let mut flow = LocationFlowController::new(
        backend.clone(),
        services.clone(),
        carrier.clone(),
        Arc::new(acquirer),
        Arc::new(LoggingMapLoader),
        config.default_position,
    );

    if fix.is_some() {
        flow.accept_location_prompt()?;
        if let Some(map) = flow.map_mut() {
            map.ensure_loaded().await?;
            map.locate_me().await?;
        }
        flow.confirm_map().await?;
    } else {
        flow.decline_location_prompt()?;
    }

    flow.form_mut().fill(args.address());
    flow.submit_address().await?;
    info!("{}", flow.delivery_banner());
    flow.proceed_to_checkout()?;

    let checkout = CheckoutOrchestrator::enter(backend, services, carrier, config.redirect_delay)?;
    let summary = checkout.summary();
    for line in &summary.lines {
        info!(
            title = %line.title,
            quantity = line.quantity,
            unit_price = %line.unit_price,
            extended_price = %line.extended_price,
            "Line item"
        );
    }
    info!(
        items = summary.item_count,
        total = %summary.total_price,
        address = %summary.address_lines.join(" / "),
        "Order summary"
    );

    let placed = checkout.place_order().await?;
    info!(
        order_id = placed
            .confirmation
            .id
            .as_ref()
            .map_or("-", |id| id.as_str()),
        placed_at = %placed.placed_at.to_rfc3339(),
        "Order confirmed"
    );
    placed.redirect.await?;
    Ok(())
}
