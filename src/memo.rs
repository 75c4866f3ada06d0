//! Memoization stores for the policy solver.
//!
//! The solver takes its store as an explicit parameter, so cache lifetime and
//! invalidation belong to the caller. Entries are keyed only on the solver
//! state, not on the reward parameters: a store must be invalidated whenever
//! the [`crate::reward::TurnContext`] it was filled under changes.
//!
//! Two stores are provided:
//! - [`MemoTable`]: single-threaded, `RefCell<FxHashMap>`.
//! - [`SharedMemoTable`]: `DashMap`-backed, shared across rayon workers. Two
//!   workers may compute the same key concurrently; both write the same pure
//!   value, so last-write-wins is harmless.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rustc_hash::FxHashMap;

use crate::types::{Decision, RollKey, SolverState};

/// Cache occupancy and hit counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub decisions: usize,
    pub expectations: usize,
    pub hits: u64,
    pub misses: u64,
}

/// State → decision cache, plus the roll-expectation cache.
///
/// Methods take `&self` so the store can be threaded through the recursion
/// alongside other shared borrows.
pub trait MemoStore {
    fn get(&self, state: &SolverState) -> Option<Decision>;
    fn insert(&self, state: SolverState, decision: Decision);
    fn get_expectation(&self, key: &RollKey) -> Option<f64>;
    fn insert_expectation(&self, key: RollKey, value: f64);
    /// Drop every entry and reset the counters.
    fn invalidate(&mut self);
    fn stats(&self) -> MemoStats;

    /// Number of cached decisions.
    fn len(&self) -> usize {
        self.stats().decisions
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached decision for `state`, computing and storing it on a miss.
    fn get_or_compute<F>(&self, state: &SolverState, compute: F) -> Decision
    where
        F: FnOnce() -> Decision,
    {
        if let Some(decision) = self.get(state) {
            return decision;
        }
        let decision = compute();
        self.insert(*state, decision);
        decision
    }
}

/// Single-threaded store for one solving session.
#[derive(Default)]
pub struct MemoTable {
    decisions: RefCell<FxHashMap<SolverState, Decision>>,
    expectations: RefCell<FxHashMap<RollKey, f64>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl MemoTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoStore for MemoTable {
    fn get(&self, state: &SolverState) -> Option<Decision> {
        let found = self.decisions.borrow().get(state).copied();
        if found.is_some() {
            self.hits.set(self.hits.get() + 1);
        } else {
            self.misses.set(self.misses.get() + 1);
        }
        found
    }

    fn insert(&self, state: SolverState, decision: Decision) {
        self.decisions.borrow_mut().insert(state, decision);
    }

    fn get_expectation(&self, key: &RollKey) -> Option<f64> {
        self.expectations.borrow().get(key).copied()
    }

    fn insert_expectation(&self, key: RollKey, value: f64) {
        self.expectations.borrow_mut().insert(key, value);
    }

    fn invalidate(&mut self) {
        self.decisions.get_mut().clear();
        self.expectations.get_mut().clear();
        self.hits.set(0);
        self.misses.set(0);
    }

    fn stats(&self) -> MemoStats {
        MemoStats {
            decisions: self.decisions.borrow().len(),
            expectations: self.expectations.borrow().len(),
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }
}

/// Concurrent store shared by rayon workers.
#[derive(Default)]
pub struct SharedMemoTable {
    decisions: DashMap<SolverState, Decision>,
    expectations: DashMap<RollKey, f64>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SharedMemoTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoStore for SharedMemoTable {
    fn get(&self, state: &SolverState) -> Option<Decision> {
        let found = self.decisions.get(state).map(|entry| *entry);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    fn insert(&self, state: SolverState, decision: Decision) {
        self.decisions.insert(state, decision);
    }

    fn get_expectation(&self, key: &RollKey) -> Option<f64> {
        self.expectations.get(key).map(|entry| *entry)
    }

    fn insert_expectation(&self, key: RollKey, value: f64) {
        self.expectations.insert(key, value);
    }

    fn invalidate(&mut self) {
        self.decisions.clear();
        self.expectations.clear();
        *self.hits.get_mut() = 0;
        *self.misses.get_mut() = 0;
    }

    fn stats(&self) -> MemoStats {
        MemoStats {
            decisions: self.decisions.len(),
            expectations: self.expectations.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
