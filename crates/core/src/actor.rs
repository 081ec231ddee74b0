//! The staff member on whose behalf an operation runs.

use serde::{Deserialize, Serialize};
use tuition_shared::types::{LocationId, UserId};

/// Who is acting, and from which location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// Acting user.
    pub user_id: UserId,
    /// Location the user is working at.
    pub location_id: LocationId,
    /// Display name for audit messages.
    pub name: Option<String>,
}

impl ActorContext {
    /// Creates an actor context.
    #[must_use]
    pub const fn new(user_id: UserId, location_id: LocationId) -> Self {
        Self {
            user_id,
            location_id,
            name: None,
        }
    }

    /// Name to show in audit messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("user {}", self.user_id))
    }
}
