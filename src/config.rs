// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Configuration shared by client and server.

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

/// Towers are capped at this height. Sentinels stand one above it.
pub const MAX_TOWER_HEIGHT: u8 = 16;

/// Largest usable cap: the sentinels still need a level above it.
pub const TOWER_HEIGHT_LIMIT: u8 = u8::MAX - 1;

/// Height of the sentinel towers for a given cap. Caps past
/// `TOWER_HEIGHT_LIMIT` are clamped to it.
pub fn sentinel_height(max_tower_height: u8) -> u8 {
    return max_tower_height.min(TOWER_HEIGHT_LIMIT) + 1;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Must equal the server's value, or no proof will validate.
    pub max_tower_height: u8,
    /// Adopt the first proof's basis when nothing is trusted yet.
    pub trust_on_first_use: bool,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        return Ok(config);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tower_height > TOWER_HEIGHT_LIMIT {
            return Err(ConfigError::TowerHeight(self.max_tower_height));
        }
        return Ok(());
    }
}

impl Default for Config {
    fn default() -> Self {
        return Config {
            max_tower_height: MAX_TOWER_HEIGHT,
            trust_on_first_use: true,
        };
    }
}
