//! A solving session: outcome tables, one turn context, and its cache.
//!
//! The session is the convenient face of the solver for a game loop: build it
//! once per rule set, call [`SolveSession::set_context`] at the start of each
//! turn, then [`SolveSession::decide`] after every roll. The cache survives
//! as long as the context does not change.

use std::sync::Arc;

use log::debug;

use crate::dice_mechanics::FaceCounts;
use crate::error::{ConfigError, SolverError};
use crate::memo::{MemoStats, MemoStore, MemoTable};
use crate::outcome_tables::OutcomeTables;
use crate::policy_solver::{evaluate_actions, solve, turn_start_value};
use crate::reward::TurnContext;
use crate::rules::{RuleSet, TableState};
use crate::types::{ActionEvaluation, Decision};

pub struct SolveSession {
    tables: Arc<OutcomeTables>,
    pool: u8,
    context: TurnContext,
    store: MemoTable,
}

impl SolveSession {
    pub fn new(tables: Arc<OutcomeTables>, pool: u8, context: TurnContext) -> Self {
        Self {
            tables,
            pool,
            context,
            store: MemoTable::new(),
        }
    }

    /// Session for a rule set, starting from a fresh table.
    pub fn for_rules(rules: &RuleSet) -> Result<Self, ConfigError> {
        rules.validate()?;
        let context = rules.context_for(&TableState::fresh(rules))?;
        let tables = Arc::new(OutcomeTables::new(rules.num_dice));
        Ok(Self::new(tables, rules.num_dice, context))
    }

    pub fn context(&self) -> &TurnContext {
        &self.context
    }

    pub fn tables(&self) -> &Arc<OutcomeTables> {
        &self.tables
    }

    pub fn pool(&self) -> u8 {
        self.pool
    }

    /// Replace the reward context. Cached values are dropped if it differs.
    pub fn set_context(&mut self, context: TurnContext) {
        if context == self.context {
            return;
        }
        debug!(
            "turn context changed, dropping {} cached decisions",
            self.store.len()
        );
        self.context = context;
        self.store.invalidate();
    }

    /// Drop every cached value without changing the context.
    pub fn invalidate(&mut self) {
        self.store.invalidate();
    }

    pub fn decide(
        &self,
        outcome: FaceCounts,
        chosen: u8,
        dice_remaining: u8,
        score: u32,
    ) -> Result<Decision, SolverError> {
        solve(
            outcome,
            chosen,
            dice_remaining,
            score,
            &self.context,
            &self.tables,
            &self.store,
        )
    }

    pub fn evaluate(
        &self,
        outcome: FaceCounts,
        chosen: u8,
        dice_remaining: u8,
        score: u32,
    ) -> Result<Vec<ActionEvaluation>, SolverError> {
        evaluate_actions(
            outcome,
            chosen,
            dice_remaining,
            score,
            &self.context,
            &self.tables,
            &self.store,
        )
    }

    /// Expected value of a fresh turn with the full pool.
    pub fn turn_start_value(&self) -> Result<f64, SolverError> {
        turn_start_value(self.pool, &self.context, &self.tables, &self.store)
    }

    pub fn stats(&self) -> MemoStats {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;

    #[test]
    fn test_session_caches_and_invalidates() {
        let rules = RuleSet::default();
        let mut session = SolveSession::for_rules(&rules).unwrap();
        let outcome = [1, 3, 0, 1, 2, 1];

        let first = session.decide(outcome, 0, 8, 0).unwrap();
        let filled = session.stats().decisions;
        assert!(filled > 0);

        // Same context: cache kept.
        let same = rules.context_for(&TableState::fresh(&rules)).unwrap();
        session.set_context(same);
        assert_eq!(session.stats().decisions, filled);
        assert_eq!(session.decide(outcome, 0, 8, 0).unwrap(), first);

        // Top tiles gone: cache dropped and the value cannot go up.
        let mut table = TableState::fresh(&rules);
        for tile in 29..=36 {
            table.take(&rules, tile);
        }
        session.set_context(rules.context_for(&table).unwrap());
        assert_eq!(session.stats().decisions, 0);
        let after = session.decide(outcome, 0, 8, 0).unwrap();
        assert!(after.value <= first.value);
        assert!(session.stats().decisions > 0);
    }

    #[test]
    fn test_invalidate_then_recompute_is_bitwise_identical() {
        let mut session = SolveSession::for_rules(&RuleSet::small()).unwrap();
        let start = session.turn_start_value().unwrap();
        let d = session.decide([1, 1, 1, 1, 0, 0], 0, 4, 0).unwrap();
        session.invalidate();
        assert!(session.stats().decisions == 0);
        assert_eq!(session.turn_start_value().unwrap().to_bits(), start.to_bits());
        let again = session.decide([1, 1, 1, 1, 0, 0], 0, 4, 0).unwrap();
        assert_eq!(again.action, d.action);
        assert_eq!(again.value.to_bits(), d.value.to_bits());
    }

    #[test]
    fn test_decide_reports_contract_errors() {
        let session = SolveSession::for_rules(&RuleSet::small()).unwrap();
        assert!(matches!(
            session.decide([0, 0, 0, 0, 0, 8], 0, 8, 0),
            Err(SolverError::TooManyDice { .. })
        ));
        let d = session.decide([0, 0, 0, 0, 0, 0], 0, 0, 0).unwrap();
        assert_eq!(d.action, Action::NoAction);
    }
}
