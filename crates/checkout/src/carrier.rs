//! Carries the delivery selection across the navigation boundary.
//!
//! The selection is stored as JSON under a single session-scoped key. Each
//! save overwrites it; checkout reads it on entry and clears it once the
//! order is placed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use doorstep_core::DeliverySelection;
use thiserror::Error;
use tracing::{debug, warn};

/// Session storage key holding the carried selection.
pub const SELECTION_KEY: &str = "selectedDeliveryLocation";

/// Errors from writing the carried selection.
#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("failed to serialize selection: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("session storage rejected write: {0}")]
    Storage(String),
}

/// Session-scoped key/value storage.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns [`CarrierError::Storage`] if the write is rejected.
    fn set_item(&self, key: &str, value: String) -> Result<(), CarrierError>;

    fn remove_item(&self, key: &str);
}

/// Session storage held in memory for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), CarrierError> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| CarrierError::Storage(e.to_string()))?;
        items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.remove(key);
        }
    }
}

/// Owner of the carried-selection slot.
#[derive(Clone)]
pub struct SelectionCarrier {
    storage: Arc<dyn SessionStorage>,
}

impl SelectionCarrier {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Overwrite the slot with `selection`.
    ///
    /// # Errors
    ///
    /// Returns error if the selection cannot be serialized or stored.
    pub fn save(&self, selection: &DeliverySelection) -> Result<(), CarrierError> {
        let json = serde_json::to_string(selection)?;
        self.storage.set_item(SELECTION_KEY, json)?;
        debug!(address_id = %selection.address.id, "Carried selection saved");
        Ok(())
    }

    /// Read the slot.
    ///
    /// Unparseable or incomplete contents are removed and reported as
    /// absent, so checkout falls back to location selection.
    #[must_use]
    pub fn load(&self) -> Option<DeliverySelection> {
        let raw = self.storage.get_item(SELECTION_KEY)?;
        match serde_json::from_str::<DeliverySelection>(&raw) {
            Ok(selection) if selection.is_complete() => Some(selection),
            Ok(_) => {
                warn!("Discarding incomplete carried selection");
                self.clear();
                None
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable carried selection");
                self.clear();
                None
            }
        }
    }

    /// Empty the slot.
    pub fn clear(&self) {
        self.storage.remove_item(SELECTION_KEY);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use doorstep_core::{AddressId, Coordinate, SavedAddress};

    fn selection(coordinates: Option<Coordinate>) -> DeliverySelection {
        DeliverySelection::new(
            SavedAddress {
                id: AddressId::new("addr_1"),
                address_line1: "123 Main St".to_string(),
                address_line2: String::new(),
                landmark: String::new(),
                city: "Metropolis".to_string(),
                state: "NY".to_string(),
                postal_code: "10001".to_string(),
                country: "US".to_string(),
                user_id: None,
            },
            coordinates,
        )
    }

    fn carrier() -> (SelectionCarrier, MemorySessionStorage) {
        let storage = MemorySessionStorage::new();
        (SelectionCarrier::new(Arc::new(storage.clone())), storage)
    }

    #[test]
    fn test_round_trip_keeps_null_coordinate() {
        let (carrier, storage) = carrier();
        let original = selection(None);
        carrier.save(&original).unwrap();

        assert_eq!(carrier.load(), Some(original));
        let raw = storage.get_item(SELECTION_KEY).unwrap();
        assert!(raw.contains("\"coordinates\":null"));
    }

    #[test]
    fn test_save_overwrites() {
        let (carrier, _) = carrier();
        carrier.save(&selection(None)).unwrap();
        let second = selection(Some(Coordinate::new(1.5, 2.5)));
        carrier.save(&second).unwrap();

        assert_eq!(carrier.load(), Some(second));
    }

    #[test]
    fn test_clear_removes_slot() {
        let (carrier, storage) = carrier();
        carrier.save(&selection(None)).unwrap();
        carrier.clear();

        assert!(carrier.load().is_none());
        assert!(storage.get_item(SELECTION_KEY).is_none());
    }

    #[test]
    fn test_corrupt_slot_is_discarded() {
        let (carrier, storage) = carrier();
        storage
            .set_item(SELECTION_KEY, "{not json".to_string())
            .unwrap();

        assert!(carrier.load().is_none());
        assert!(storage.get_item(SELECTION_KEY).is_none());
    }

    #[test]
    fn test_incomplete_slot_is_discarded() {
        let (carrier, storage) = carrier();
        let mut partial = selection(None);
        partial.address.city = String::new();
        storage
            .set_item(SELECTION_KEY, serde_json::to_string(&partial).unwrap())
            .unwrap();

        assert!(carrier.load().is_none());
        assert!(storage.get_item(SELECTION_KEY).is_none());
    }
}
