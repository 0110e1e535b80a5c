//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// The signed-in user as reported by the session endpoint.
///
/// Fields the client does not model are kept in `extra` so the identity can
/// be echoed back to the order backend unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserInfo {
    /// Create an identity with no optional fields.
    #[must_use]
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            username: None,
            email: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Body returned by the session check endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Whether the request carried a valid session.
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}
