//! Order submission types.

use serde::{Deserialize, Serialize};

use super::address::DeliverySelection;
use super::cart::CartState;
use super::id::OrderId;
use super::user::UserInfo;

/// Body of the order-create request.
///
/// The cart snapshot is flattened into the top level, next to `userInfo`
/// and `deliveryLocation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    #[serde(flatten)]
    pub cart: CartState,
    pub user_info: Option<UserInfo>,
    pub delivery_location: DeliverySelection,
}

/// What the backend returns for a created order.
///
/// Every field is optional: the backend acknowledges with whatever it has.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderConfirmation {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
