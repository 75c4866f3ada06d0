//! Turn simulation: plays turns with random dice under the optimal policy.
//!
//! At every roll the solver is asked for the decision; the action is applied
//! and the turn continues until the policy stops or the turn fails. Averaged
//! over many turns, the realized value converges to
//! [`crate::policy_solver::turn_start_value`].

use std::time::{Duration, Instant};

use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use crate::constants::{face_value, with_face_chosen, N_FACES};
use crate::dice_mechanics::FaceCounts;
use crate::error::SolverError;
use crate::memo::{MemoStore, SharedMemoTable};
use crate::outcome_tables::OutcomeTables;
use crate::policy_solver::solve_state;
use crate::reward::{reward, TurnContext};
use crate::types::{Action, Decision, SolverState};

/// Turns per rayon task; each task owns one RNG seeded from the base seed.
const TURNS_PER_CHUNK: usize = 1024;

/// Roll `n` fair dice (faces 0..6) and count them.
#[inline(always)]
pub fn roll_outcome<R: Rng + ?Sized>(rng: &mut R, n: u8) -> FaceCounts {
    let mut counts = [0u8; N_FACES];
    for _ in 0..n {
        counts[rng.random_range(0..N_FACES)] += 1;
    }
    counts
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RollRecord {
    pub outcome: FaceCounts,
    pub decision: Decision,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The policy stopped and claimed `value`.
    Stopped { score: u32, chosen: u8, value: f64 },
    /// Bust, or nothing worth banking.
    Failed { score: u32, value: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnRecord {
    pub rolls: Vec<RollRecord>,
    pub outcome: TurnOutcome,
}

impl TurnRecord {
    pub fn value(&self) -> f64 {
        match self.outcome {
            TurnOutcome::Stopped { value, .. } | TurnOutcome::Failed { value, .. } => value,
        }
    }

    pub fn failed(&self) -> bool {
        matches!(self.outcome, TurnOutcome::Failed { .. })
    }
}

/// Play one turn with `pool` dice under the optimal policy.
pub fn play_turn<R: Rng + ?Sized, S: MemoStore>(
    rng: &mut R,
    pool: u8,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    store: &S,
) -> Result<TurnRecord, SolverError> {
    if pool > tables.max_dice() {
        return Err(SolverError::TooManyDice {
            requested: pool,
            max: tables.max_dice(),
        });
    }
    Ok(play_turn_unchecked(rng, pool, ctx, tables, store))
}

fn play_turn_unchecked<R: Rng + ?Sized, S: MemoStore>(
    rng: &mut R,
    pool: u8,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    store: &S,
) -> TurnRecord {
    let mut chosen = 0u8;
    let mut remaining = pool;
    let mut score = 0u32;
    let mut rolls = Vec::new();

    loop {
        let outcome = roll_outcome(rng, remaining);
        let state = SolverState::new(outcome, chosen, remaining, score);
        let decision = solve_state(&state, ctx, tables, store);
        rolls.push(RollRecord { outcome, decision });

        match decision.action {
            Action::NoAction => {
                return TurnRecord {
                    rolls,
                    outcome: TurnOutcome::Failed {
                        score,
                        value: ctx.failure_penalty(),
                    },
                };
            }
            Action::Bank {
                face,
                continue_rolling,
            } => {
                let face = face as usize;
                let banked = outcome[face];
                chosen = with_face_chosen(chosen, face);
                score += face_value(face) * banked as u32;
                remaining -= banked;
                if !continue_rolling {
                    return TurnRecord {
                        rolls,
                        outcome: TurnOutcome::Stopped {
                            score,
                            chosen,
                            value: reward(score, chosen, ctx),
                        },
                    };
                }
            }
        }
    }
}

/// Results of a batch simulation.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationResult {
    pub num_turns: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub failure_rate: f64,
    pub elapsed: Duration,
}

/// Play `num_turns` independent turns in parallel.
///
/// Each chunk of turns uses its own `SmallRng` seeded with `seed + chunk`, so
/// results are reproducible regardless of the thread count. All workers share
/// one solver cache.
pub fn simulate_turns(
    pool: u8,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    num_turns: usize,
    seed: u64,
) -> Result<SimulationResult, SolverError> {
    if pool > tables.max_dice() {
        return Err(SolverError::TooManyDice {
            requested: pool,
            max: tables.max_dice(),
        });
    }
    let start = Instant::now();
    let store = SharedMemoTable::new();
    let num_chunks = num_turns.div_ceil(TURNS_PER_CHUNK);

    let chunks: Vec<(Vec<f64>, usize)> = (0..num_chunks)
        .into_par_iter()
        .map(|c| {
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(c as u64));
            let n = TURNS_PER_CHUNK.min(num_turns - c * TURNS_PER_CHUNK);
            let mut values = Vec::with_capacity(n);
            let mut failures = 0usize;
            for _ in 0..n {
                let turn = play_turn_unchecked(&mut rng, pool, ctx, tables, &store);
                if turn.failed() {
                    failures += 1;
                }
                values.push(turn.value());
            }
            (values, failures)
        })
        .collect();

    let failures: usize = chunks.iter().map(|(_, f)| f).sum();
    let values: Vec<f64> = chunks.into_iter().flat_map(|(v, _)| v).collect();
    let result = summarize(&values, failures, start.elapsed());

    info!(
        "simulated {} turns in {:.2?}: mean {:.4} (sd {:.4}), {:.1}% failed, {} cached states",
        result.num_turns,
        result.elapsed,
        result.mean,
        result.std_dev,
        result.failure_rate * 100.0,
        store.len()
    );
    Ok(result)
}

fn summarize(values: &[f64], failures: usize, elapsed: Duration) -> SimulationResult {
    let n = values.len();
    if n == 0 {
        return SimulationResult {
            num_turns: 0,
            mean: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            failure_rate: 0.0,
            elapsed,
        };
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    SimulationResult {
        num_turns: n,
        mean,
        std_dev: variance.sqrt(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        failure_rate: failures as f64 / n as f64,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::is_face_chosen;
    use crate::dice_mechanics::outcome_dice;
    use crate::memo::MemoTable;
    use crate::policy_solver::turn_start_value;
    use crate::rules::{RuleSet, TableState};

    #[test]
    fn test_roll_outcome_sums() {
        let mut rng = SmallRng::seed_from_u64(7);
        for n in 0..=8u8 {
            assert_eq!(outcome_dice(&roll_outcome(&mut rng, n)), n as u32);
        }
    }

    #[test]
    fn test_play_turn_is_consistent() {
        let rules = RuleSet::default();
        let ctx = rules.context_for(&TableState::fresh(&rules)).unwrap();
        let tables = OutcomeTables::new(rules.num_dice);
        let store = MemoTable::new();
        let mut rng = SmallRng::seed_from_u64(42);

        for _ in 0..200 {
            let turn = play_turn(&mut rng, rules.num_dice, &ctx, &tables, &store).unwrap();
            assert!(!turn.rolls.is_empty());

            let mut chosen = 0u8;
            let mut score = 0u32;
            let mut remaining = rules.num_dice;
            for roll in &turn.rolls {
                assert_eq!(outcome_dice(&roll.outcome), remaining as u32);
                if let Some(face) = roll.decision.action.face() {
                    assert!(!is_face_chosen(chosen, face));
                    assert!(roll.outcome[face] > 0);
                    chosen = with_face_chosen(chosen, face);
                    score += face_value(face) * roll.outcome[face] as u32;
                    remaining -= roll.outcome[face];
                }
            }
            match turn.outcome {
                TurnOutcome::Stopped { score: s, chosen: c, value } => {
                    assert_eq!(s, score);
                    assert_eq!(c, chosen);
                    assert_eq!(value, reward(s, c, &ctx));
                }
                TurnOutcome::Failed { value, .. } => assert_eq!(value, ctx.failure_penalty()),
            }
        }
    }

    #[test]
    fn test_play_turn_rejects_large_pool() {
        let tables = OutcomeTables::new(4);
        let rules = RuleSet::small();
        let ctx = rules.context_for(&TableState::fresh(&rules)).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(play_turn(&mut rng, 5, &ctx, &tables, &MemoTable::new()).is_err());
    }

    #[test]
    fn test_simulated_mean_matches_solver() {
        for rules in [RuleSet::small(), RuleSet::default()] {
            let ctx = rules.context_for(&TableState::fresh(&rules)).unwrap();
            let tables = OutcomeTables::new(rules.num_dice);
            let expected =
                turn_start_value(rules.num_dice, &ctx, &tables, &MemoTable::new()).unwrap();
            let result = simulate_turns(rules.num_dice, &ctx, &tables, 40_000, 2024).unwrap();
            assert_eq!(result.num_turns, 40_000);
            assert!(
                (result.mean - expected).abs() < 0.06,
                "dice={} mean={} expected={}",
                rules.num_dice,
                result.mean,
                expected
            );
        }
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let rules = RuleSet::small();
        let ctx = rules.context_for(&TableState::fresh(&rules)).unwrap();
        let tables = OutcomeTables::new(rules.num_dice);
        let a = simulate_turns(rules.num_dice, &ctx, &tables, 3000, 9).unwrap();
        let b = simulate_turns(rules.num_dice, &ctx, &tables, 3000, 9).unwrap();
        assert_eq!(a.mean.to_bits(), b.mean.to_bits());
        assert_eq!(a.failure_rate, b.failure_rate);
    }

    #[test]
    fn test_summarize_empty() {
        let r = summarize(&[], 0, Duration::ZERO);
        assert_eq!(r.num_turns, 0);
        assert_eq!(r.mean, 0.0);
    }
}
