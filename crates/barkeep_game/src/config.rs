//! Game configuration.
//!
//! Every field has a default, so a JSON file only needs the keys it wants to
//! override:
//!
//! ```json
//! { "day_length": 30.0, "customers_first_night": 2 }
//! ```

use std::path::Path;

use barkeep_math::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Balance and layout knobs for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seconds of planning (day) per round.
    pub day_length: f32,
    /// Seconds the bar is open (night) per round.
    pub night_length: f32,
    /// Days between rent payments.
    pub rent_days: i32,
    /// First rent payment.
    pub rent_initial: i32,
    /// Amount rent grows by after each payment.
    pub rent_increase: i32,
    /// Coins in the bank at the start of a run.
    pub starting_balance: i32,
    /// Customers spawned on the first night.
    pub customers_first_night: i32,
    /// Additional customers per day survived.
    pub extra_customers_per_day: i32,
    /// Seconds between customer spawns.
    pub spawn_time_between: f32,
    /// Customer walking speed in tiles per second.
    pub ai_speed: f32,
    /// Number of items offered in the store each day.
    pub store_option_count: usize,
    /// Where store items are laid out, along +X.
    pub store_origin: Vec2,
    /// Where leaving customers walk to.
    pub exit_position: Vec2,
    /// Upper bound on cells a single pathfinding search may visit.
    pub pathfinding_max_nodes: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            day_length: 60.0,
            night_length: 90.0,
            rent_days: 5,
            rent_initial: 75,
            rent_increase: 25,
            starting_balance: 100,
            customers_first_night: 1,
            extra_customers_per_day: 1,
            spawn_time_between: 2.0,
            ai_speed: 3.0,
            store_option_count: 3,
            store_origin: Vec2::new(10.0, -10.0),
            exit_position: Vec2::new(-12.0, 0.0),
            pathfinding_max_nodes: 10_000,
        }
    }
}

impl GameConfig {
    /// Parses a config from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] if the JSON is malformed or a field
    /// has the wrong type.
    pub fn from_json_str(json: &str) -> Result<Self, GameError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigIo`] if the file cannot be read and
    /// [`GameError::ConfigParse`] if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| GameError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), "loaded game config");
        Ok(config)
    }

    /// Customers the spawner should produce on the given day.
    #[must_use]
    pub fn customers_for_day(&self, day: i32) -> i32 {
        self.customers_first_night + self.extra_customers_per_day * day.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GameConfig::from_json_str(r#"{ "day_length": 5.0, "rent_days": 2 }"#).unwrap();
        assert!((config.day_length - 5.0).abs() < f32::EPSILON);
        assert_eq!(config.rent_days, 2);
        assert_eq!(config.rent_initial, GameConfig::default().rent_initial);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = GameConfig::from_json_str(r#"{ "day_length": "long" }"#).unwrap_err();
        assert!(matches!(err, GameError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = GameConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, GameError::ConfigIo { .. }));
    }

    #[test]
    fn test_customers_for_day() {
        let config = GameConfig::default();
        assert_eq!(config.customers_for_day(0), 1);
        assert_eq!(config.customers_for_day(3), 4);
    }
}
