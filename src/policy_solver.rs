//! Backward induction over one turn: the optimal banking policy.
//!
//! For a state S = (o, C, n, s), with roll `o` of `n` dice, chosen faces `C`
//! and banked score `s`, the legal actions are the faces `i` with `o[i] > 0` and
//! `i ∉ C`. Banking face `i` moves to
//!
//! ```text
//! C' = C | 1<<i,   s' = s + value(i) * o[i],   n' = n - o[i]
//! ```
//!
//! and the action is worth
//!
//! ```text
//! V(i) = max( R(s', C'),  Σ_{o'} P(o' | n') · V*(o', C', n', s') )
//! ```
//!
//! where the second term (re-roll) exists only for `n' > 0`. The state value
//! V*(S) is the best V(i), starting from the failure baseline. Every action
//! banks at least one die, so `n` strictly decreases along any path and the
//! recursion depth is bounded by the pool size.
//!
//! ## Tie-breaks
//!
//! - Re-roll only when strictly better than stopping.
//! - An action replaces the incumbent only on strict improvement; faces are
//!   scanned in ascending order and the incumbent starts as
//!   `(NoAction, failure_penalty)`.
//!
//! ## Terminal states
//!
//! - No legal face with dice exhausted (`n = 0`): the banked score stands,
//!   `R(s, C)`.
//! - No legal face after a real roll (`n > 0`): bust, `failure_penalty`.

use rayon::prelude::*;

use crate::constants::{face_value, is_face_chosen, with_face_chosen, ALL_FACES_MASK, N_FACES};
use crate::dice_mechanics::{outcome_dice, FaceCounts};
use crate::error::SolverError;
use crate::memo::MemoStore;
use crate::outcome_tables::OutcomeTables;
use crate::reward::{reward, TurnContext};
use crate::types::{Action, ActionEvaluation, Decision, RollKey, SolverState};

/// Check a caller-supplied state against the solver contract.
pub fn check_state(state: &SolverState, tables: &OutcomeTables) -> Result<(), SolverError> {
    if state.chosen & !ALL_FACES_MASK != 0 {
        return Err(SolverError::InvalidChosenMask { mask: state.chosen });
    }
    if state.dice_remaining > tables.max_dice() {
        return Err(SolverError::TooManyDice {
            requested: state.dice_remaining,
            max: tables.max_dice(),
        });
    }
    let actual = outcome_dice(&state.outcome);
    if actual != state.dice_remaining as u32 {
        return Err(SolverError::InvalidOutcome {
            expected: state.dice_remaining,
            actual,
        });
    }
    Ok(())
}

/// Optimal action and expected value for a rolled outcome.
///
/// This is the entry point for the game loop: validate, then recurse through
/// `store`.
pub fn solve<S: MemoStore>(
    outcome: FaceCounts,
    chosen: u8,
    dice_remaining: u8,
    score: u32,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    store: &S,
) -> Result<Decision, SolverError> {
    let state = SolverState::new(outcome, chosen, dice_remaining, score);
    check_state(&state, tables)?;
    Ok(solve_state(&state, ctx, tables, store))
}

/// Unchecked recursion. `state` must satisfy [`check_state`].
pub fn solve_state<S: MemoStore>(
    state: &SolverState,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    store: &S,
) -> Decision {
    store.get_or_compute(state, || {
        compute_decision(state, ctx, |key| {
            expected_roll_value(key, ctx, tables, store)
        })
    })
}

/// E[V*] over every outcome of rolling `key.dice_remaining` dice.
pub fn expected_roll_value<S: MemoStore>(
    key: RollKey,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    store: &S,
) -> f64 {
    if let Some(v) = store.get_expectation(&key) {
        return v;
    }
    let mut ev = 0.0;
    for w in tables.outcomes(key.dice_remaining) {
        let next = SolverState::new(w.outcome, key.chosen, key.dice_remaining, key.score);
        ev += w.probability * solve_state(&next, ctx, tables, store).value;
    }
    store.insert_expectation(key, ev);
    ev
}

/// Same contract and result as [`solve`], with the sibling outcomes of each
/// top-level action evaluated on the rayon pool.
///
/// Per-outcome values are collected in order and summed sequentially, so the
/// result is bitwise identical to [`solve`].
pub fn solve_parallel<S: MemoStore + Sync>(
    outcome: FaceCounts,
    chosen: u8,
    dice_remaining: u8,
    score: u32,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    store: &S,
) -> Result<Decision, SolverError> {
    let state = SolverState::new(outcome, chosen, dice_remaining, score);
    check_state(&state, tables)?;
    Ok(store.get_or_compute(&state, || {
        compute_decision(&state, ctx, |key| {
            expected_roll_value_parallel(key, ctx, tables, store)
        })
    }))
}

fn expected_roll_value_parallel<S: MemoStore + Sync>(
    key: RollKey,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    store: &S,
) -> f64 {
    if let Some(v) = store.get_expectation(&key) {
        return v;
    }
    let terms: Vec<f64> = tables
        .outcomes(key.dice_remaining)
        .par_iter()
        .map(|w| {
            let next = SolverState::new(w.outcome, key.chosen, key.dice_remaining, key.score);
            w.probability * solve_state(&next, ctx, tables, store).value
        })
        .collect();
    let mut ev = 0.0;
    for t in terms {
        ev += t;
    }
    store.insert_expectation(key, ev);
    ev
}

/// Per-face breakdown of every legal action at a state, ascending by face.
pub fn evaluate_actions<S: MemoStore>(
    outcome: FaceCounts,
    chosen: u8,
    dice_remaining: u8,
    score: u32,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    store: &S,
) -> Result<Vec<ActionEvaluation>, SolverError> {
    let state = SolverState::new(outcome, chosen, dice_remaining, score);
    check_state(&state, tables)?;
    let mut expect = |key: RollKey| expected_roll_value(key, ctx, tables, store);
    Ok(legal_faces(&state)
        .map(|face| evaluate_action(&state, face, ctx, &mut expect))
        .collect())
}

/// Expected value of a fresh turn with `pool` dice: nothing banked, score 0.
pub fn turn_start_value<S: MemoStore>(
    pool: u8,
    ctx: &TurnContext,
    tables: &OutcomeTables,
    store: &S,
) -> Result<f64, SolverError> {
    if pool > tables.max_dice() {
        return Err(SolverError::TooManyDice {
            requested: pool,
            max: tables.max_dice(),
        });
    }
    let key = RollKey {
        chosen: 0,
        dice_remaining: pool,
        score: 0,
    };
    Ok(expected_roll_value(key, ctx, tables, store))
}

/// Faces that may be banked: showing on the dice and not yet chosen.
pub fn legal_faces(state: &SolverState) -> impl Iterator<Item = usize> + '_ {
    (0..N_FACES).filter(move |&f| state.outcome[f] > 0 && !is_face_chosen(state.chosen, f))
}

fn evaluate_action<E>(
    state: &SolverState,
    face: usize,
    ctx: &TurnContext,
    expect: &mut E,
) -> ActionEvaluation
where
    E: FnMut(RollKey) -> f64,
{
    let banked = state.outcome[face];
    debug_assert!(banked > 0 && banked <= state.dice_remaining);
    let new_chosen = with_face_chosen(state.chosen, face);
    let new_score = state.score + face_value(face) * banked as u32;
    let new_remaining = state.dice_remaining - banked;

    let stop_value = reward(new_score, new_chosen, ctx);
    let continue_value = if new_remaining > 0 {
        Some(expect(RollKey {
            chosen: new_chosen,
            dice_remaining: new_remaining,
            score: new_score,
        }))
    } else {
        None
    };
    let (continue_rolling, value) = match continue_value {
        Some(c) if c > stop_value => (true, c),
        _ => (false, stop_value),
    };

    ActionEvaluation {
        face: face as u8,
        dice_banked: banked,
        new_score,
        stop_value,
        continue_value,
        continue_rolling,
        value,
    }
}

fn compute_decision<E>(state: &SolverState, ctx: &TurnContext, mut expect: E) -> Decision
where
    E: FnMut(RollKey) -> f64,
{
    let mut best = Decision {
        action: Action::NoAction,
        value: ctx.failure_penalty(),
    };
    let mut any_legal = false;

    for face in legal_faces(state) {
        any_legal = true;
        let eval = evaluate_action(state, face, ctx, &mut expect);
        if eval.value > best.value {
            best = Decision {
                action: eval.action(),
                value: eval.value,
            };
        }
    }

    if !any_legal && state.dice_remaining == 0 {
        best.value = reward(state.score, state.chosen, ctx);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_TILE_MIN, DEFAULT_TILE_VALUES};
    use crate::memo::{MemoTable, SharedMemoTable};

    fn standard_ctx(penalty: f64) -> TurnContext {
        TurnContext::new(
            DEFAULT_TILE_MIN,
            DEFAULT_TILE_VALUES.iter().map(|&v| Some(v)).collect(),
            penalty,
        )
        .unwrap()
    }

    #[test]
    fn test_exhausted_without_banking_fails() {
        let tables = OutcomeTables::new(8);
        let ctx = standard_ctx(-3.0);
        let store = MemoTable::new();
        let d = solve([0; 6], 0, 0, 0, &ctx, &tables, &store).unwrap();
        assert_eq!(d.action, Action::NoAction);
        assert_eq!(d.value, -3.0);
    }

    #[test]
    fn test_exhausted_score_stands() {
        let tables = OutcomeTables::new(8);
        let ctx = standard_ctx(-3.0);
        let store = MemoTable::new();
        let d = solve([0; 6], 0b100001, 0, 30, &ctx, &tables, &store).unwrap();
        assert_eq!(d.action, Action::NoAction);
        assert_eq!(d.value, reward(30, 0b100001, &ctx));
        assert_eq!(d.value, 3.0);
    }

    #[test]
    fn test_bust_when_all_faces_taken() {
        let tables = OutcomeTables::new(8);
        let ctx = standard_ctx(-1.0);
        let store = MemoTable::new();
        let d = solve([0, 2, 0, 0, 0, 1], 0b100010, 3, 25, &ctx, &tables, &store).unwrap();
        assert_eq!(d.action, Action::NoAction);
        assert_eq!(d.value, -1.0);
    }

    #[test]
    fn test_last_die_stops() {
        let tables = OutcomeTables::new(8);
        let ctx = standard_ctx(0.0);
        let store = MemoTable::new();
        let d = solve([0, 0, 0, 0, 0, 1], 0b000001, 1, 20, &ctx, &tables, &store).unwrap();
        assert_eq!(
            d.action,
            Action::Bank {
                face: 5,
                continue_rolling: false
            }
        );
        assert_eq!(d.value, 2.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let tables = OutcomeTables::new(8);
        let ctx = standard_ctx(0.0);
        let store = MemoTable::new();
        assert_eq!(
            solve([1, 1, 0, 0, 0, 0], 0, 3, 0, &ctx, &tables, &store),
            Err(SolverError::InvalidOutcome {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            solve([9, 0, 0, 0, 0, 0], 0, 9, 0, &ctx, &tables, &store),
            Err(SolverError::TooManyDice {
                requested: 9,
                max: 8
            })
        );
        assert_eq!(
            solve([1, 0, 0, 0, 0, 0], 0b1000000, 1, 0, &ctx, &tables, &store),
            Err(SolverError::InvalidChosenMask { mask: 0b1000000 })
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_ties_prefer_lowest_face_and_stopping() {
        // Every score 1..=40 pays 1: banking anything and stopping is optimal.
        let tables = OutcomeTables::new(2);
        let ctx = TurnContext::new(1, vec![Some(1.0); 40], 0.0).unwrap();
        let store = MemoTable::new();
        let d = solve([0, 1, 0, 0, 0, 1], 0, 2, 0, &ctx, &tables, &store).unwrap();
        assert_eq!(
            d.action,
            Action::Bank {
                face: 1,
                continue_rolling: false
            }
        );
        assert_eq!(d.value, 1.0);
    }

    #[test]
    fn test_nothing_beats_failure_gives_no_action() {
        // Unreachable tiles: every path is worth the (zero) penalty.
        let tables = OutcomeTables::new(2);
        let ctx = TurnContext::new(21, vec![Some(1.0); 4], 0.0).unwrap();
        let store = MemoTable::new();
        let d = solve([0, 1, 1, 0, 0, 0], 0, 2, 0, &ctx, &tables, &store).unwrap();
        assert_eq!(d.action, Action::NoAction);
        assert_eq!(d.value, 0.0);
    }

    #[test]
    fn test_continue_when_stop_is_worthless() {
        // Score 5 pays nothing, but re-rolling the last die can reach 10.
        let tables = OutcomeTables::new(2);
        let ctx = TurnContext::new(10, vec![Some(6.0)], 0.0).unwrap();
        let store = MemoTable::new();
        let d = solve([1, 1, 0, 0, 0, 0], 0, 2, 0, &ctx, &tables, &store).unwrap();
        // Bank the wild (5 points) and re-roll one die: a second wild busts,
        // and 5 + face >= 10 needs a 5 (probability 1/6), so EV = 1.0.
        assert_eq!(
            d.action,
            Action::Bank {
                face: 0,
                continue_rolling: true
            }
        );
        assert!((d.value - 1.0).abs() < 1e-12, "value={}", d.value);
    }

    #[test]
    fn test_evaluate_actions_matches_solve() {
        let tables = OutcomeTables::new(8);
        let ctx = standard_ctx(0.0);
        let store = MemoTable::new();
        let outcome = [1, 1, 0, 3, 2, 1];
        let evals = evaluate_actions(outcome, 0, 8, 0, &ctx, &tables, &store).unwrap();
        assert_eq!(evals.len(), 5);
        let faces: Vec<u8> = evals.iter().map(|e| e.face).collect();
        assert_eq!(faces, vec![0, 1, 3, 4, 5]);

        let d = solve(outcome, 0, 8, 0, &ctx, &tables, &store).unwrap();
        let best = evals
            .iter()
            .fold(f64::NEG_INFINITY, |acc, e| acc.max(e.value));
        assert_eq!(d.value, best);
        for e in &evals {
            assert!(e.value >= e.stop_value);
            assert_eq!(e.new_score, face_value(e.face as usize) * e.dice_banked as u32);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let tables = OutcomeTables::new(8);
        let ctx = standard_ctx(-1.0);
        let seq = MemoTable::new();
        let par = SharedMemoTable::new();
        for outcome in [[1, 1, 0, 3, 2, 1], [0, 1, 0, 0, 0, 7], [2, 2, 2, 2, 0, 0]] {
            let a = solve(outcome, 0, 8, 0, &ctx, &tables, &seq).unwrap();
            let b = solve_parallel(outcome, 0, 8, 0, &ctx, &tables, &par).unwrap();
            assert_eq!(a.action, b.action);
            assert_eq!(a.value.to_bits(), b.value.to_bits());
        }
    }

    #[test]
    fn test_turn_start_value_bounds() {
        let tables = OutcomeTables::new(8);
        let ctx = standard_ctx(0.0);
        let store = MemoTable::new();
        let v = turn_start_value(8, &ctx, &tables, &store).unwrap();
        assert!(v > 0.0 && v < 4.0, "v={v}");
        assert_eq!(turn_start_value(0, &ctx, &tables, &store).unwrap(), 0.0);
        assert!(turn_start_value(9, &ctx, &tables, &store).is_err());
    }
}
