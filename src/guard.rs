//! Recursion Guard
//!
//! Identity-keyed memo used while walking a single schema tree. Nodes are
//! keyed by address, which within one parse call is exactly object identity:
//! the tree is owned and unmoved, and re-entry only happens when an internal
//! reference resolves back into a subtree that is already being parsed.
//!
//! State is scoped to one top-level parse invocation and must be discarded
//! afterward; it is not a cross-call cache.

use std::collections::HashMap;

/// What the caller should do for a node it is about to parse
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome<T> {
    /// First visit, or re-entry within budget: parse normally
    Proceed,
    /// The node was fully parsed before: reuse the memoized result
    Cached(T),
    /// Re-entry with the expansion budget exhausted: substitute the
    /// unconstrained fallback instead of recursing further
    Fallback,
}

#[derive(Debug)]
struct GuardState<T> {
    expansions: u32,
    cached: Option<T>,
}

/// Per-parse recursion guard with a bounded expansion counter
#[derive(Debug)]
pub struct RecursionGuard<T> {
    states: HashMap<usize, GuardState<T>>,
    max_expansions: Option<u32>,
}

impl<T: Clone> RecursionGuard<T> {
    pub fn new(max_expansions: Option<u32>) -> Self {
        Self {
            states: HashMap::new(),
            max_expansions,
        }
    }

    fn key(node: &serde_json::Value) -> usize {
        node as *const serde_json::Value as usize
    }

    /// Look up a node before parsing it.
    ///
    /// Unseen nodes are registered and parsed normally. A node with a
    /// memoized result short-circuits (this also covers diamond-shaped
    /// sharing, not just cycles). A node that is still being parsed higher up
    /// the stack consumes one unit of the expansion budget, or signals
    /// fallback once the budget is spent.
    pub fn enter(&mut self, node: &serde_json::Value) -> GuardOutcome<T> {
        let key = Self::key(node);

        match self.states.get_mut(&key) {
            None => {
                self.states.insert(
                    key,
                    GuardState {
                        expansions: 0,
                        cached: None,
                    },
                );
                GuardOutcome::Proceed
            }
            Some(state) => {
                if let Some(cached) = &state.cached {
                    return GuardOutcome::Cached(cached.clone());
                }

                if let Some(max) = self.max_expansions {
                    if state.expansions >= max {
                        return GuardOutcome::Fallback;
                    }
                }

                state.expansions += 1;
                GuardOutcome::Proceed
            }
        }
    }

    /// Record the parsed result so later visits reuse it
    pub fn complete(&mut self, node: &serde_json::Value, result: T) {
        let key = Self::key(node);
        let state = self.states.entry(key).or_insert(GuardState {
            expansions: 0,
            cached: None,
        });
        state.cached = Some(result);
    }
}
