//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// User id stamped on movements written by scheduled jobs
pub const SYSTEM_USER_ID: &str = "sistema";

/// Display name stamped on movements written by the shelf-life job
pub const SYSTEM_USER_NAME: &str = "Sistema (Vida Útil)";

/// Number of ledger entries returned when the caller does not ask for a limit
pub const DEFAULT_MOVEMENT_LIMIT: usize = 50;

/// Upper bound accepted for ledger queries
pub const MAX_MOVEMENT_LIMIT: usize = 200;

/// Who performed a change, as recorded on ledger entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub user_name: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }

    /// The actor used by the shelf-life consumption job
    pub fn system() -> Self {
        Self::new(SYSTEM_USER_ID, SYSTEM_USER_NAME)
    }

    pub fn is_system(&self) -> bool {
        self.user_id == SYSTEM_USER_ID
    }
}

/// Clamp a requested ledger page size into the supported range
pub fn clamp_movement_limit(limit: Option<usize>) -> usize {
    match limit {
        None | Some(0) => DEFAULT_MOVEMENT_LIMIT,
        Some(n) => n.min(MAX_MOVEMENT_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_actor() {
        let actor = Actor::system();
        assert!(actor.is_system());
        assert_eq!(actor.user_name, "Sistema (Vida Útil)");
    }

    #[test]
    fn test_clamp_movement_limit() {
        assert_eq!(clamp_movement_limit(None), 50);
        assert_eq!(clamp_movement_limit(Some(0)), 50);
        assert_eq!(clamp_movement_limit(Some(10)), 10);
        assert_eq!(clamp_movement_limit(Some(10_000)), 200);
    }
}
