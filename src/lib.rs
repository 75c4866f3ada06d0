//! # Pickomino: Optimal Single-Turn Solver
//!
//! Computes the expected-value-maximizing banking policy for one turn of the
//! push-your-luck dice game Pickomino, by **backward induction** over the
//! states of a turn.
//!
//! ## Turn structure
//!
//! A turn starts with a pool of dice (8 in the standard game). Each roll, the
//! player must bank every die showing one face not banked earlier this turn,
//! then either stop or re-roll the remaining dice. Rolling no bankable face
//! fails the turn. On stopping, the banked score claims a tile from the grill
//! (or steals the opponent's top tile on an exact match).
//!
//! ## Modules
//!
//! | Concern | Rust module | Description |
//! |---------|-------------|-------------|
//! | Outcome model | [`dice_mechanics`] | Face-count vectors, enumeration of the C(n+5,5) outcomes of n dice |
//! | Probability oracle | [`dice_mechanics`], [`outcome_tables`] | Multinomial probabilities, tabulated once per pool size |
//! | Reward | [`reward`] | Value of a final score under the turn's tile table, steal target and failure penalty |
//! | Policy solver | [`policy_solver`] | Memoized Bellman recursion: bank face i, then stop or re-roll |
//! | Memo store | [`memo`] | State → decision caches, single-threaded and rayon-shared |
//! | Rules | [`rules`] | Game variants and per-turn context construction |
//! | Session | [`session`] | Tables, context and cache bundled for a game loop |
//! | Simulation | [`simulation`] | Monte Carlo turns under the optimal policy |
//!
//! ## State representation
//!
//! A solver state S = (o, C, n, s) where:
//! - `o`: face counts of the current roll (face 0 is the wild, worth 5)
//! - `C`: 6-bit mask of faces banked this turn
//! - `n`: dice rolled to produce `o`
//! - `s`: points banked so far
//!
//! Every action banks at least one die, so `n` strictly decreases and the
//! recursion depth is bounded by the pool size. Values are memoized per state
//! and, one level up, per post-bank (C, n, s) expectation.

#![allow(clippy::needless_range_loop)]

pub mod constants;
pub mod dice_mechanics;
pub mod env_config;
pub mod error;
pub mod memo;
pub mod outcome_tables;
pub mod policy_solver;
pub mod reward;
pub mod rules;
pub mod session;
pub mod simulation;
pub mod types;

pub use error::{ConfigError, SolverError};
pub use memo::{MemoStore, MemoTable, SharedMemoTable};
pub use outcome_tables::OutcomeTables;
pub use policy_solver::{evaluate_actions, solve, solve_parallel, turn_start_value};
pub use reward::{reward, RewardPolicy, Steal, TurnContext};
pub use rules::{RuleSet, TableState};
pub use session::SolveSession;
pub use types::{Action, ActionEvaluation, Decision};
