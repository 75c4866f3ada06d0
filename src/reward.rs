//! Terminal reward: what a banked score is worth when the turn ends.
//!
//! The reward is path-independent: it depends only on the final score, the
//! chosen-faces mask and the per-turn [`TurnContext`]. The context is an
//! immutable value rebuilt each turn from the table state (see
//! [`crate::rules::RuleSet::context_for`]); solver caches are scoped to one
//! context.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{is_face_chosen, WILD_FACE};
use crate::error::ConfigError;

/// How a banked score maps to a value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPolicy {
    /// Best available tile numbered at or below the score; exact steal wins.
    #[default]
    Standard,
    /// With a steal target on the table, only the steal score pays.
    AlwaysSteal,
    /// Only the tile numbered exactly the score pays; exact steal wins.
    ExactScoreOnly,
}

impl FromStr for RewardPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(RewardPolicy::Standard),
            "always-steal" | "always_steal" => Ok(RewardPolicy::AlwaysSteal),
            "exact-score" | "exact_score_only" => Ok(RewardPolicy::ExactScoreOnly),
            other => Err(ConfigError::Invalid(format!("unknown reward policy: {other}"))),
        }
    }
}

/// Opponent's top tile, claimable by banking exactly `score`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Steal {
    pub score: u32,
    pub value: f64,
}

/// Per-turn reward parameters.
///
/// `tiles[k]` is the value of tile `tile_min + k`, `None` if that tile is no
/// longer on the grill.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnContext {
    tile_min: u32,
    tiles: Vec<Option<f64>>,
    /// best_at_or_below[k] = max of tiles[0..=k] over available tiles.
    best_at_or_below: Vec<Option<f64>>,
    failure_penalty: f64,
    steal: Option<Steal>,
    policy: RewardPolicy,
    wild_required: bool,
}

impl TurnContext {
    pub fn new(
        tile_min: u32,
        tiles: Vec<Option<f64>>,
        failure_penalty: f64,
    ) -> Result<Self, ConfigError> {
        if tiles.is_empty() {
            return Err(ConfigError::Invalid("tile table is empty".into()));
        }
        if let Some(v) = tiles.iter().flatten().find(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!("tile value {v} is not finite")));
        }
        if !failure_penalty.is_finite() || failure_penalty > 0.0 {
            return Err(ConfigError::Invalid(format!(
                "failure penalty must be finite and <= 0, got {failure_penalty}"
            )));
        }

        let mut best_at_or_below = Vec::with_capacity(tiles.len());
        let mut best: Option<f64> = None;
        for tile in &tiles {
            best = match (best, *tile) {
                (Some(b), Some(t)) => Some(b.max(t)),
                (b, t) => b.or(t),
            };
            best_at_or_below.push(best);
        }

        Ok(Self {
            tile_min,
            tiles,
            best_at_or_below,
            failure_penalty,
            steal: None,
            policy: RewardPolicy::Standard,
            wild_required: false,
        })
    }

    /// Add a steal target. Its score must be a tile number of this table.
    pub fn with_steal(mut self, steal: Steal) -> Result<Self, ConfigError> {
        if steal.score < self.tile_min || steal.score > self.tile_max() {
            return Err(ConfigError::Invalid(format!(
                "steal score {} outside tile range {}..={}",
                steal.score,
                self.tile_min,
                self.tile_max()
            )));
        }
        if !steal.value.is_finite() {
            return Err(ConfigError::Invalid("steal value is not finite".into()));
        }
        self.steal = Some(steal);
        Ok(self)
    }

    pub fn with_policy(mut self, policy: RewardPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Require the wild face among the banked faces for any score to count.
    pub fn with_wild_required(mut self, wild_required: bool) -> Self {
        self.wild_required = wild_required;
        self
    }

    pub fn tile_min(&self) -> u32 {
        self.tile_min
    }

    pub fn tile_max(&self) -> u32 {
        self.tile_min + self.tiles.len() as u32 - 1
    }

    pub fn tiles(&self) -> &[Option<f64>] {
        &self.tiles
    }

    pub fn failure_penalty(&self) -> f64 {
        self.failure_penalty
    }

    pub fn steal(&self) -> Option<Steal> {
        self.steal
    }

    pub fn policy(&self) -> RewardPolicy {
        self.policy
    }

    pub fn wild_required(&self) -> bool {
        self.wild_required
    }

    /// Table offset for `score`, clamped to the top tile. `None` below the range.
    #[inline]
    fn offset(&self, score: u32) -> Option<usize> {
        if score < self.tile_min {
            return None;
        }
        Some(((score - self.tile_min) as usize).min(self.tiles.len() - 1))
    }

    fn best_tile_at_or_below(&self, score: u32) -> f64 {
        self.offset(score)
            .and_then(|k| self.best_at_or_below[k])
            .unwrap_or(self.failure_penalty)
    }

    fn exact_tile(&self, score: u32) -> f64 {
        self.offset(score)
            .and_then(|k| self.tiles[k])
            .unwrap_or(self.failure_penalty)
    }
}

/// Value of ending the turn with `score` banked from faces `chosen`.
pub fn reward(score: u32, chosen: u8, ctx: &TurnContext) -> f64 {
    if chosen == 0 || (ctx.wild_required && !is_face_chosen(chosen, WILD_FACE)) {
        return ctx.failure_penalty;
    }
    if let Some(steal) = ctx.steal {
        if score == steal.score {
            return steal.value;
        }
    }
    match ctx.policy {
        RewardPolicy::Standard => ctx.best_tile_at_or_below(score),
        RewardPolicy::AlwaysSteal => {
            if ctx.steal.is_some() {
                ctx.failure_penalty
            } else {
                ctx.best_tile_at_or_below(score)
            }
        }
        RewardPolicy::ExactScoreOnly => ctx.exact_tile(score),
    }
}
