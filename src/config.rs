//! Game Configuration
//!
//! Tunable race and economy constants. Every field has a default, so a
//! config file only needs to name what it overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Serialize, Deserialize};

use crate::{
    BASE_REWARD, MIN_RACE_DURATION, MAX_RACE_DURATION, GUARANTEED_OPPONENT_MIN_DURATION,
};

/// Race timing and reward configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Fastest possible race duration (seconds).
    pub min_duration: f64,
    /// Slowest possible race duration (seconds).
    pub max_duration: f64,
    /// Lower bound for the opponent when a guaranteed win is applied.
    pub guaranteed_opponent_min: f64,
    /// Points awarded for a win before multipliers.
    pub base_reward: i64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            min_duration: MIN_RACE_DURATION,
            max_duration: MAX_RACE_DURATION,
            guaranteed_opponent_min: GUARANTEED_OPPONENT_MIN_DURATION,
            base_reward: BASE_REWARD,
        }
    }
}

/// Starting balances and shop prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Points substituted when the stored balance is absent or zero.
    pub starting_points: i64,
    /// x2 boosters substituted when the stored count is absent or zero.
    pub starting_x2_boosters: i64,
    /// Guaranteed-win boosters substituted when the stored count is absent or zero.
    pub starting_guaranteed_boosters: i64,
    /// Price of one x2 booster.
    pub x2_booster_price: i64,
    /// Price of one guaranteed-win booster.
    pub guaranteed_booster_price: i64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_points: 50,
            starting_x2_boosters: 1,
            starting_guaranteed_boosters: 1,
            x2_booster_price: 50,
            guaranteed_booster_price: 40,
        }
    }
}

/// Complete game configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Race settings.
    pub race: RaceConfig,
    /// Economy settings.
    pub economy: EconomyConfig,
}

impl GameConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GameConfig = serde_json::from_str(json).context("Invalid config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the race ranges and starting floors are usable.
    pub fn validate(&self) -> Result<()> {
        let race = &self.race;
        if !(race.min_duration > 0.0 && race.min_duration < race.max_duration) {
            anyhow::bail!(
                "race duration range must satisfy 0 < min < max (got {}..{})",
                race.min_duration,
                race.max_duration
            );
        }
        if !(race.guaranteed_opponent_min > race.min_duration
            && race.guaranteed_opponent_min < race.max_duration)
        {
            anyhow::bail!(
                "guaranteed_opponent_min {} must lie strictly inside {}..{}",
                race.guaranteed_opponent_min,
                race.min_duration,
                race.max_duration
            );
        }
        if race.base_reward <= 0 {
            anyhow::bail!("base_reward must be positive (got {})", race.base_reward);
        }
        let economy = &self.economy;
        if economy.x2_booster_price <= 0 || economy.guaranteed_booster_price <= 0 {
            anyhow::bail!("booster prices must be positive");
        }
        if economy.starting_points <= 0
            || economy.starting_x2_boosters <= 0
            || economy.starting_guaranteed_boosters <= 0
        {
            anyhow::bail!(
                "starting points and boosters must be positive (got {}, {}, {})",
                economy.starting_points,
                economy.starting_x2_boosters,
                economy.starting_guaranteed_boosters
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GameConfig::default();
        assert_eq!(config.race.min_duration, 3.0);
        assert_eq!(config.race.max_duration, 20.0);
        assert_eq!(config.race.guaranteed_opponent_min, 4.0);
        assert_eq!(config.race.base_reward, 50);
        assert_eq!(config.economy.starting_points, 50);
        assert_eq!(config.economy.x2_booster_price, 50);
        assert_eq!(config.economy.guaranteed_booster_price, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = GameConfig::from_json(r#"{ "race": { "base_reward": 75 } }"#).unwrap();
        assert_eq!(config.race.base_reward, 75);
        assert_eq!(config.race.max_duration, 20.0);
        assert_eq!(config.economy, EconomyConfig::default());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let json = r#"{ "race": { "min_duration": 20.0, "max_duration": 3.0 } }"#;
        assert!(GameConfig::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_guaranteed_floor_outside_range() {
        let json = r#"{ "race": { "guaranteed_opponent_min": 2.0 } }"#;
        assert!(GameConfig::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_non_positive_starting_floors() {
        for json in [
            r#"{ "economy": { "starting_points": 0 } }"#,
            r#"{ "economy": { "starting_points": -10 } }"#,
            r#"{ "economy": { "starting_x2_boosters": 0 } }"#,
            r#"{ "economy": { "starting_guaranteed_boosters": -1 } }"#,
        ] {
            assert!(GameConfig::from_json(json).is_err(), "accepted {json}");
        }

        let config = GameConfig::from_json(r#"{ "economy": { "starting_points": 5 } }"#).unwrap();
        assert_eq!(config.economy.starting_points, 5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = GameConfig::load(Path::new("/nonexistent/chicken.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
