//! Solver state, actions and results.

use serde::Serialize;

use crate::constants::FACE_LABELS;
use crate::dice_mechanics::FaceCounts;

/// Memoization key: everything the optimal decision depends on within a turn.
///
/// - `outcome`: the roll currently on the table
/// - `chosen`: 6-bit mask of faces already banked this turn
/// - `dice_remaining`: dice that were rolled to produce `outcome`
/// - `score`: points banked so far
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SolverState {
    pub outcome: FaceCounts,
    pub chosen: u8,
    pub dice_remaining: u8,
    pub score: u32,
}

impl SolverState {
    pub fn new(outcome: FaceCounts, chosen: u8, dice_remaining: u8, score: u32) -> Self {
        Self {
            outcome,
            chosen,
            dice_remaining,
            score,
        }
    }
}

/// Key of the roll-expectation cache: the state right after banking, before
/// the next roll. The expectation over the next roll does not depend on which
/// outcome led here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RollKey {
    pub chosen: u8,
    pub dice_remaining: u8,
    pub score: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Bank every die showing `face`, then re-roll the rest or stop.
    Bank { face: u8, continue_rolling: bool },
    /// No legal face to bank (or nothing beats failing): the turn fails.
    NoAction,
}

impl Action {
    /// Banked face, if any.
    pub fn face(&self) -> Option<usize> {
        match self {
            Action::Bank { face, .. } => Some(*face as usize),
            Action::NoAction => None,
        }
    }

    pub fn continues(&self) -> bool {
        matches!(
            self,
            Action::Bank {
                continue_rolling: true,
                ..
            }
        )
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Bank {
                face,
                continue_rolling,
            } => write!(
                f,
                "bank {} and {}",
                FACE_LABELS[*face as usize],
                if *continue_rolling { "roll again" } else { "stop" }
            ),
            Action::NoAction => write!(f, "no action (turn fails)"),
        }
    }
}

/// Optimal action at a state and its expected value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub value: f64,
}

/// Breakdown of one legal banking choice.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ActionEvaluation {
    pub face: u8,
    pub dice_banked: u8,
    pub new_score: u32,
    pub stop_value: f64,
    /// Expected value of re-rolling; `None` when no dice would remain.
    pub continue_value: Option<f64>,
    pub continue_rolling: bool,
    pub value: f64,
}

impl ActionEvaluation {
    pub fn action(&self) -> Action {
        Action::Bank {
            face: self.face,
            continue_rolling: self.continue_rolling,
        }
    }
}
