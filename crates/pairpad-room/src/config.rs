//! Session budgets and limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed budgets for every room.
///
/// These are design constants rather than runtime tunables; `Default`
/// is the production configuration, and tests shrink the durations to
/// drive expiry paths deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Absolute session length, measured from room creation.
    pub room_lifetime: Duration,

    /// How long each member holds the turn before it rotates.
    pub turn_duration: Duration,

    /// Maximum members per room. Turn rotation only runs at capacity.
    pub max_members: usize,

    /// Length of generated room codes (alphanumeric alphabet).
    pub id_length: usize,

    /// Cadence of the background sweep that reclaims rooms whose
    /// per-room timers were missed.
    pub sweep_interval: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            room_lifetime: Duration::from_secs(30 * 60),
            turn_duration: Duration::from_secs(5 * 60),
            max_members: 2,
            id_length: 6,
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = RoomConfig::default();
        assert_eq!(config.room_lifetime, Duration::from_secs(1800));
        assert_eq!(config.turn_duration, Duration::from_secs(300));
        assert_eq!(config.max_members, 2);
        assert_eq!(config.id_length, 6);
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
    }
}
