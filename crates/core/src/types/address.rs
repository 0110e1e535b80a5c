//! Delivery address types.
//!
//! Three shapes of the same address exist along the flow:
//!
//! - [`AddressInput`] - what the user types, keyed by form field
//! - [`NewAddress`] - the create-address request body (normalized names)
//! - [`SavedAddress`] - the backend's persisted copy, with its id
//!
//! A [`DeliverySelection`] merges a [`SavedAddress`] with the most recently
//! confirmed map coordinate, if any.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;
use super::id::{AddressId, UserId};

/// A field of the address form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddressField {
    StreetAddress,
    Apartment,
    Landmark,
    City,
    State,
    PostalCode,
    Country,
}

impl AddressField {
    /// Every field in form order.
    pub const ALL: [Self; 7] = [
        Self::StreetAddress,
        Self::Apartment,
        Self::Landmark,
        Self::City,
        Self::State,
        Self::PostalCode,
        Self::Country,
    ];

    /// Returns `true` for fields that must be non-empty before submission.
    #[must_use]
    pub const fn is_required(self) -> bool {
        !matches!(self, Self::Apartment | Self::Landmark)
    }

    /// The form field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StreetAddress => "streetAddress",
            Self::Apartment => "apartment",
            Self::Landmark => "landmark",
            Self::City => "city",
            Self::State => "state",
            Self::PostalCode => "postalCode",
            Self::Country => "country",
        }
    }

    /// Message shown under a required field left empty.
    #[must_use]
    pub const fn required_message(self) -> &'static str {
        match self {
            Self::StreetAddress => "Street address is required",
            Self::City => "City is required",
            Self::State => "State is required",
            Self::PostalCode => "Postal code is required",
            Self::Country => "Country is required",
            Self::Apartment | Self::Landmark => "",
        }
    }
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-field validation failures for an [`AddressInput`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("missing required fields: {}", self.field_names())]
pub struct AddressValidation {
    errors: BTreeMap<AddressField, &'static str>,
}

impl AddressValidation {
    /// The message for a single field, if that field failed.
    #[must_use]
    pub fn message(&self, field: AddressField) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    /// Fields that failed, in form order.
    pub fn fields(&self) -> impl Iterator<Item = AddressField> + '_ {
        self.errors.keys().copied()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` when no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn field_names(&self) -> String {
        self.fields()
            .map(AddressField::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Address as entered in the form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub street_address: String,
    #[serde(default)]
    pub apartment: String,
    #[serde(default)]
    pub landmark: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl AddressInput {
    /// Read a field value.
    #[must_use]
    pub fn get(&self, field: AddressField) -> &str {
        match field {
            AddressField::StreetAddress => &self.street_address,
            AddressField::Apartment => &self.apartment,
            AddressField::Landmark => &self.landmark,
            AddressField::City => &self.city,
            AddressField::State => &self.state,
            AddressField::PostalCode => &self.postal_code,
            AddressField::Country => &self.country,
        }
    }

    /// Overwrite a field value.
    pub fn set(&mut self, field: AddressField, value: impl Into<String>) {
        let slot = match field {
            AddressField::StreetAddress => &mut self.street_address,
            AddressField::Apartment => &mut self.apartment,
            AddressField::Landmark => &mut self.landmark,
            AddressField::City => &mut self.city,
            AddressField::State => &mut self.state,
            AddressField::PostalCode => &mut self.postal_code,
            AddressField::Country => &mut self.country,
        };
        *slot = value.into();
    }

    /// Validation message for one field, or `None` if it is acceptable.
    ///
    /// A whitespace-only value counts as empty.
    #[must_use]
    pub fn field_error(&self, field: AddressField) -> Option<&'static str> {
        (field.is_required() && self.get(field).trim().is_empty())
            .then(|| field.required_message())
    }

    /// Check every required field.
    ///
    /// # Errors
    ///
    /// Returns [`AddressValidation`] listing each empty required field.
    pub fn validate(&self) -> Result<(), AddressValidation> {
        let errors: BTreeMap<_, _> = AddressField::ALL
            .into_iter()
            .filter_map(|field| self.field_error(field).map(|msg| (field, msg)))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AddressValidation { errors })
        }
    }

    /// Build the create-address request body.
    #[must_use]
    pub fn to_new_address(&self) -> NewAddress {
        NewAddress {
            address_line1: self.street_address.clone(),
            address_line2: self.apartment.clone(),
            landmark: self.landmark.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
    }
}

/// Body of the create-address request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub address_line1: String,
    pub address_line2: String,
    pub landmark: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// An address persisted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    /// Server-issued identifier.
    #[serde(rename = "_id")]
    pub id: AddressId,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub landmark: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    /// Owner, when the backend echoes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl SavedAddress {
    /// Returns `true` if the id and every required field are non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            self.id.as_str(),
            self.address_line1.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .iter()
        .all(|value| !value.trim().is_empty())
    }

    /// Returns `true` if the address fields equal what was entered.
    #[must_use]
    pub fn matches_input(&self, input: &AddressInput) -> bool {
        self.address_line1 == input.street_address
            && self.address_line2 == input.apartment
            && self.landmark == input.landmark
            && self.city == input.city
            && self.state == input.state
            && self.postal_code == input.postal_code
            && self.country == input.country
    }

    /// Short form used on the proceed banner: `"street, city"`.
    #[must_use]
    pub fn short_line(&self) -> String {
        format!("{}, {}", self.address_line1, self.city)
    }

    /// Full address as display lines, skipping empty optional parts.
    #[must_use]
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines = vec![self.address_line1.clone()];
        if !self.address_line2.is_empty() {
            lines.push(self.address_line2.clone());
        }
        if !self.landmark.is_empty() {
            lines.push(format!("Landmark: {}", self.landmark));
        }
        lines.push(format!("{}, {} {}", self.city, self.state, self.postal_code));
        lines.push(self.country.clone());
        lines
    }
}

/// The single active delivery target carried from location selection to
/// checkout.
///
/// `coordinates` is `None` when no map location was confirmed; it is always
/// serialized (as `null`) so the order backend sees the absence explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverySelection {
    #[serde(flatten)]
    pub address: SavedAddress,
    pub coordinates: Option<Coordinate>,
}

impl DeliverySelection {
    /// Merge a saved address with the last confirmed coordinate.
    #[must_use]
    pub const fn new(address: SavedAddress, coordinates: Option<Coordinate>) -> Self {
        Self {
            address,
            coordinates,
        }
    }

    /// Returns `true` if every required address field is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.address.is_complete()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn metropolis() -> AddressInput {
        AddressInput {
            street_address: "123 Main St".to_string(),
            city: "Metropolis".to_string(),
            state: "NY".to_string(),
            postal_code: "10001".to_string(),
            country: "US".to_string(),
            ..AddressInput::default()
        }
    }

    fn saved(input: &AddressInput) -> SavedAddress {
        let body = input.to_new_address();
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
        }
    }

    #[test]
    fn test_validate_complete_input() {
        assert!(metropolis().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_each_missing_field() {
        let mut input = metropolis();
        input.city.clear();
        input.country = "   ".to_string();

        let err = input.validate().unwrap_err();
        assert_eq!(err.len(), 2);
        assert_eq!(err.message(AddressField::City), Some("City is required"));
        assert_eq!(
            err.message(AddressField::Country),
            Some("Country is required")
        );
        assert_eq!(err.message(AddressField::StreetAddress), None);
        assert_eq!(err.to_string(), "missing required fields: city, country");
    }

    #[test]
    fn test_optional_fields_never_fail() {
        let input = metropolis();
        assert!(input.apartment.is_empty());
        assert_eq!(input.field_error(AddressField::Apartment), None);
        assert_eq!(input.field_error(AddressField::Landmark), None);
    }

    #[test]
    fn test_set_and_get_round_trip_every_field() {
        let mut input = AddressInput::default();
        for field in AddressField::ALL {
            input.set(field, field.name());
        }
        for field in AddressField::ALL {
            assert_eq!(input.get(field), field.name());
        }
    }

    #[test]
    fn test_new_address_wire_names() {
        let json = serde_json::to_value(metropolis().to_new_address()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "addressLine1": "123 Main St",
                "addressLine2": "",
                "landmark": "",
                "city": "Metropolis",
                "state": "NY",
                "postalCode": "10001",
                "country": "US"
            })
        );
    }

    #[test]
    fn test_selection_serializes_null_coordinates() {
        let selection = DeliverySelection::new(saved(&metropolis()), None);
        let json = serde_json::to_value(&selection).unwrap();

        assert_eq!(json["_id"], "addr_1");
        assert_eq!(json["addressLine1"], "123 Main St");
        assert!(json.get("coordinates").unwrap().is_null());
    }

    #[test]
    fn test_selection_round_trip_with_coordinates() {
        let selection =
            DeliverySelection::new(saved(&metropolis()), Some(Coordinate::new(12.34, 56.78)));
        let json = serde_json::to_string(&selection).unwrap();
        let back: DeliverySelection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, selection);
    }

    #[test]
    fn test_saved_address_matches_input() {
        let input = metropolis();
        let address = saved(&input);
        assert!(address.matches_input(&input));
        assert!(address.is_complete());
        assert_eq!(address.short_line(), "123 Main St, Metropolis");
    }

    #[test]
    fn test_display_lines_skip_empty_optionals() {
        let mut input = metropolis();
        assert_eq!(
            saved(&input).display_lines(),
            vec!["123 Main St", "Metropolis, NY 10001", "US"]
        );

        input.apartment = "Apt 4B".to_string();
        input.landmark = "Near City Mall".to_string();
        assert_eq!(
            saved(&input).display_lines(),
            vec![
                "123 Main St",
                "Apt 4B",
                "Landmark: Near City Mall",
                "Metropolis, NY 10001",
                "US"
            ]
        );
    }
}
