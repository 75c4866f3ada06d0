//! Rule-set configuration and per-turn context construction.
//!
//! A [`RuleSet`] holds the static parameters of a game variant (pool size, tile
//! numbers and worm values, steal bonus). At the start of each turn the game
//! loop describes the table with a [`TableState`] and asks
//! [`RuleSet::context_for`] for the immutable [`TurnContext`] the solver runs
//! under.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_NUM_DICE, DEFAULT_TILE_MIN, DEFAULT_TILE_VALUES};
use crate::error::ConfigError;
use crate::reward::{RewardPolicy, Steal, TurnContext};

/// Static parameters of a game variant. Missing JSON fields take the
/// standard-game defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Dice in the pool at the start of a turn.
    pub num_dice: u8,
    /// Number of the lowest tile.
    pub tile_min: u32,
    /// Worm value of tiles `tile_min, tile_min + 1, ...`.
    pub tile_values: Vec<f64>,
    /// Value of a failed turn when the player holds no tile.
    pub failure_penalty: f64,
    /// A stolen tile is worth `steal_factor` times its worm value.
    pub steal_factor: f64,
    /// Scores only count if the wild face was banked.
    pub wild_required: bool,
    pub policy: RewardPolicy,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            num_dice: DEFAULT_NUM_DICE,
            tile_min: DEFAULT_TILE_MIN,
            tile_values: DEFAULT_TILE_VALUES.to_vec(),
            failure_penalty: 0.0,
            steal_factor: 1.0,
            wild_required: false,
            policy: RewardPolicy::Standard,
        }
    }
}

impl RuleSet {
    /// Reduced game: 4 dice, tiles 11..=18.
    pub fn small() -> Self {
        Self {
            num_dice: 4,
            tile_min: 11,
            tile_values: vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0],
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let rules: RuleSet = serde_json::from_str(s)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_dice == 0 {
            return Err(ConfigError::Invalid("num_dice must be at least 1".into()));
        }
        if self.tile_values.is_empty() {
            return Err(ConfigError::Invalid("tile_values is empty".into()));
        }
        if self.tile_values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::Invalid(
                "tile values must be finite and non-negative".into(),
            ));
        }
        if !self.failure_penalty.is_finite() || self.failure_penalty > 0.0 {
            return Err(ConfigError::Invalid(format!(
                "failure_penalty must be finite and <= 0, got {}",
                self.failure_penalty
            )));
        }
        if !self.steal_factor.is_finite() || self.steal_factor < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "steal_factor must be finite and >= 0, got {}",
                self.steal_factor
            )));
        }
        Ok(())
    }

    pub fn tile_max(&self) -> u32 {
        self.tile_min + self.tile_values.len() as u32 - 1
    }

    /// Worm value of tile `tile`, if it exists in this variant.
    pub fn tile_value(&self, tile: u32) -> Option<f64> {
        if tile < self.tile_min {
            return None;
        }
        self.tile_values.get((tile - self.tile_min) as usize).copied()
    }

    /// Build the reward context for a turn starting at `table`.
    ///
    /// - Tiles no longer on the grill are unavailable.
    /// - A failed turn costs the player's own top tile, if any.
    /// - The opponent's top tile is a steal target worth `steal_factor` times
    ///   its value.
    pub fn context_for(&self, table: &TableState) -> Result<TurnContext, ConfigError> {
        if table.available.len() != self.tile_values.len() {
            return Err(ConfigError::Invalid(format!(
                "table has {} tile slots, rules define {}",
                table.available.len(),
                self.tile_values.len()
            )));
        }
        let tiles: Vec<Option<f64>> = self
            .tile_values
            .iter()
            .zip(&table.available)
            .map(|(&v, &available)| available.then_some(v))
            .collect();

        let failure_penalty = match table.own_top {
            Some(tile) => -self.owned_tile_value(tile)?,
            None => self.failure_penalty,
        };

        let ctx = TurnContext::new(self.tile_min, tiles, failure_penalty)?
            .with_policy(self.policy)
            .with_wild_required(self.wild_required);

        match table.opponent_top {
            Some(tile) => ctx.with_steal(Steal {
                score: tile,
                value: self.steal_factor * self.owned_tile_value(tile)?,
            }),
            None => Ok(ctx),
        }
    }

    fn owned_tile_value(&self, tile: u32) -> Result<f64, ConfigError> {
        self.tile_value(tile)
            .ok_or_else(|| ConfigError::Invalid(format!("tile {tile} does not exist")))
    }
}

/// What the game loop knows at the start of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    /// available[k]: tile `tile_min + k` is still on the grill.
    pub available: Vec<bool>,
    /// Top of the current player's stack.
    pub own_top: Option<u32>,
    /// Top of the opponent's stack.
    pub opponent_top: Option<u32>,
}

impl TableState {
    /// Start of a game: every tile on the grill, empty stacks.
    pub fn fresh(rules: &RuleSet) -> Self {
        Self {
            available: vec![true; rules.tile_values.len()],
            own_top: None,
            opponent_top: None,
        }
    }

    /// Mark tile `tile` as taken from the grill.
    pub fn take(&mut self, rules: &RuleSet, tile: u32) {
        if tile >= rules.tile_min {
            if let Some(slot) = self.available.get_mut((tile - rules.tile_min) as usize) {
                *slot = false;
            }
        }
    }
}
