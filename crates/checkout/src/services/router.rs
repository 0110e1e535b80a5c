//! Client-side navigation.

use std::sync::Mutex;

/// Route paths used by the flow.
pub mod routes {
    /// Landing page, reached after a successful order.
    pub const HOME: &str = "/";
    /// Location selection (permission prompt, map, address form).
    pub const DELIVERY_LOCATION: &str = "/delivery-location";
    /// Order summary and placement.
    pub const CHECKOUT_CONFIRMATION: &str = "/checkout-confirmation";
}

/// Navigate-by-path capability of the router.
pub trait Navigator: Send + Sync {
    /// Move to `path`.
    fn navigate(&self, path: &str);

    /// The path currently shown.
    fn current_path(&self) -> String;
}

/// In-memory navigator that keeps the full history.
///
/// Used by headless hosts such as the CLI, and by tests.
#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    /// Start at `path`.
    #[must_use]
    pub fn starting_at(path: &str) -> Self {
        Self {
            history: Mutex::new(vec![path.to_string()]),
        }
    }

    /// Every path visited, oldest first, including the starting path.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::starting_at(routes::HOME)
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "Navigate");
        if let Ok(mut history) = self.history.lock() {
            history.push(path.to_string());
        }
    }

    fn current_path(&self) -> String {
        self.history
            .lock()
            .ok()
            .and_then(|history| history.last().cloned())
            .unwrap_or_else(|| routes::HOME.to_string())
    }
}
