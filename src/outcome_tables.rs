//! Precomputed outcome and probability tables.
//!
//! For every pool size `n` in `0..=max_dice`, stores the enumerated outcomes of
//! rolling `n` dice together with their multinomial probabilities. The tables
//! are built once per rule set and then shared read-only (`Arc<OutcomeTables>`)
//! across sessions and rayon workers.

use std::time::Instant;

use log::debug;

use crate::dice_mechanics::{enumerate_outcomes, multinomial_probability, outcome_dice, FaceCounts};
use crate::error::SolverError;

/// One reachable roll and its probability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedOutcome {
    pub outcome: FaceCounts,
    pub probability: f64,
}

/// Outcome lists and probabilities for every pool size up to `max_dice`.
pub struct OutcomeTables {
    max_dice: u8,
    /// by_dice[n] = every outcome of rolling n dice, lexicographic order.
    by_dice: Vec<Vec<WeightedOutcome>>,
}

impl OutcomeTables {
    pub fn new(max_dice: u8) -> Self {
        let start = Instant::now();
        let by_dice: Vec<Vec<WeightedOutcome>> = (0..=max_dice)
            .map(|n| {
                enumerate_outcomes(n)
                    .into_iter()
                    .map(|outcome| WeightedOutcome {
                        outcome,
                        probability: multinomial_probability(&outcome, n),
                    })
                    .collect()
            })
            .collect();
        debug!(
            "outcome tables for 0..={} dice: {} entries in {:.2?}",
            max_dice,
            by_dice.iter().map(Vec::len).sum::<usize>(),
            start.elapsed()
        );
        Self { max_dice, by_dice }
    }

    /// Largest pool size covered.
    #[inline]
    pub fn max_dice(&self) -> u8 {
        self.max_dice
    }

    /// All outcomes of rolling `n` dice with their probabilities.
    ///
    /// `n` must not exceed [`Self::max_dice`]; the solver checks this at its boundary.
    #[inline]
    pub fn outcomes(&self, n: u8) -> &[WeightedOutcome] {
        debug_assert!(n <= self.max_dice, "n={} > max_dice={}", n, self.max_dice);
        &self.by_dice[n as usize]
    }

    /// Cached P(outcome | n).
    pub fn probability(&self, outcome: &FaceCounts, n: u8) -> Result<f64, SolverError> {
        let actual = outcome_dice(outcome);
        if actual != n as u32 {
            return Err(SolverError::InvalidOutcome {
                expected: n,
                actual,
            });
        }
        if n > self.max_dice {
            return Err(SolverError::TooManyDice {
                requested: n,
                max: self.max_dice,
            });
        }
        let entries = &self.by_dice[n as usize];
        // Lexicographic order makes the list binary-searchable by outcome.
        match entries.binary_search_by(|w| w.outcome.cmp(outcome)) {
            Ok(idx) => Ok(entries[idx].probability),
            Err(_) => Ok(multinomial_probability(outcome, n)),
        }
    }
}
