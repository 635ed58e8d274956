use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Session context for a single engine call.
///
/// Immutable and passed explicitly into every mutating operation; the acting
/// user is stamped onto usage-log entries and movement events.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    user_id: UserId,
}

impl SessionContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
