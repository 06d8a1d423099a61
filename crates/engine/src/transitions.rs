//! Transition policy
//!
//! [`Transitions`] maps a state name to a weighted [`Distribution`] over next
//! states. The policy is a pure lookup: it never observes the system under
//! test. At build time it is compiled into a [`TransitionTable`] indexed by
//! state position, with one `WeightedIndex` sampler per reachable state.

use rand::distributions::{Distribution as _, WeightedIndex};
use rand::Rng;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use fsmload_core::{Error, Result};

/// Weighted distribution over next-state names.
///
/// Weights are relative; they need not sum to 1. Entries keep insertion order,
/// which fixes the sampling order for a given seed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    entries: Vec<(String, f64)>,
}

impl Distribution {
    /// Empty distribution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight of `state`, replacing any earlier weight for it.
    pub fn weight(mut self, state: impl Into<String>, weight: f64) -> Self {
        let state = state.into();
        match self.entries.iter_mut().find(|(name, _)| *name == state) {
            Some(entry) => entry.1 = weight,
            None => self.entries.push((state, weight)),
        }
        self
    }

    /// Equal weight on every name.
    pub fn uniform<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        states
            .into_iter()
            .fold(Distribution::new(), |dist, state| dist.weight(state, 1.0))
    }

    /// Sum of weights
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Entries as probabilities summing to 1.
    ///
    /// Returns an empty vector when the total is not positive.
    pub fn normalized(&self) -> Vec<(String, f64)> {
        let total = self.total();
        if !(total > 0.0 && total.is_finite()) {
            return Vec::new();
        }
        self.entries
            .iter()
            .map(|(name, w)| (name.clone(), w / total))
            .collect()
    }

    /// Raw `(state, weight)` entries in insertion order
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State name → next-state distribution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transitions {
    table: FxHashMap<String, Distribution>,
}

impl Transitions {
    /// Empty policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distribution for `state`, builder style.
    pub fn with_state(mut self, state: impl Into<String>, distribution: Distribution) -> Self {
        self.insert(state, distribution);
        self
    }

    /// Set the distribution for `state`.
    pub fn insert(&mut self, state: impl Into<String>, distribution: Distribution) {
        self.table.insert(state.into(), distribution);
    }

    /// Every state moves to every state, itself included, with equal weight.
    pub fn uniform<S: AsRef<str>>(states: &[S]) -> Self {
        let names: Vec<&str> = states.iter().map(AsRef::as_ref).collect();
        Self::from_fn(&names, |_| Distribution::uniform(names.iter().copied()))
    }

    /// Build a policy by calling `f` once per state.
    pub fn from_fn<S, F>(states: &[S], mut f: F) -> Self
    where
        S: AsRef<str>,
        F: FnMut(&str) -> Distribution,
    {
        let table = states
            .iter()
            .map(|s| (s.as_ref().to_string(), f(s.as_ref())))
            .collect();
        Transitions { table }
    }

    /// Distribution for `state`, if one is defined.
    pub fn get(&self, state: &str) -> Option<&Distribution> {
        self.table.get(state)
    }

    /// Number of states with a distribution
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if no distributions are defined
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Sampler for one state: target indices plus their weights.
#[derive(Debug, Clone)]
struct Edges {
    targets: Vec<usize>,
    probabilities: Vec<f64>,
    sampler: WeightedIndex<f64>,
}

/// Index-based transition policy, validated and read-only.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    names: Vec<String>,
    edges: Vec<Option<Edges>>,
}

impl TransitionTable {
    /// Validate `transitions` against the registered `names` and compile it.
    ///
    /// Every state reachable from `start` over positive-weight edges must have
    /// a distribution whose weights are finite, non-negative, sum to a positive
    /// total, and name only registered states. Unreachable states are not
    /// checked and get no sampler.
    pub fn compile(names: &[String], start: usize, transitions: &Transitions) -> Result<Self> {
        let index: FxHashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut edges: Vec<Option<Edges>> = vec![None; names.len()];
        let mut visited = vec![false; names.len()];
        let mut queue = VecDeque::from([start]);
        visited[start] = true;

        while let Some(current) = queue.pop_front() {
            let name = &names[current];
            let dist = transitions.get(name).ok_or_else(|| {
                Error::configuration(format!(
                    "state '{name}' is reachable but has no transition distribution"
                ))
            })?;

            if dist.is_empty() {
                return Err(Error::configuration(format!(
                    "transition distribution for state '{name}' is empty"
                )));
            }

            let mut targets = Vec::with_capacity(dist.entries().len());
            let mut weights = Vec::with_capacity(dist.entries().len());
            for (target, weight) in dist.entries() {
                let &target_idx = index.get(target.as_str()).ok_or_else(|| {
                    Error::configuration(format!(
                        "state '{name}' transitions to unregistered state '{target}'"
                    ))
                })?;
                if !weight.is_finite() || *weight < 0.0 {
                    return Err(Error::configuration(format!(
                        "transition '{name}' -> '{target}' has invalid weight {weight}"
                    )));
                }
                targets.push(target_idx);
                weights.push(*weight);
            }

            let total: f64 = weights.iter().sum();
            if !(total > 0.0 && total.is_finite()) {
                return Err(Error::configuration(format!(
                    "transition weights for state '{name}' must sum to a positive total, got {total}"
                )));
            }

            for (&target_idx, &weight) in targets.iter().zip(&weights) {
                if weight > 0.0 && !visited[target_idx] {
                    visited[target_idx] = true;
                    queue.push_back(target_idx);
                }
            }

            let sampler = WeightedIndex::new(&weights).map_err(|e| {
                Error::configuration(format!("transition weights for state '{name}': {e}"))
            })?;
            let probabilities = weights.iter().map(|w| w / total).collect();
            edges[current] = Some(Edges {
                targets,
                probabilities,
                sampler,
            });
        }

        Ok(TransitionTable {
            names: names.to_vec(),
            edges,
        })
    }

    /// Sample the next state index after `current`.
    ///
    /// Returns `None` only for states that were unreachable at compile time,
    /// which a worker can never be in.
    pub fn next<R: Rng + ?Sized>(&self, current: usize, rng: &mut R) -> Option<usize> {
        let edges = self.edges.get(current)?.as_ref()?;
        Some(edges.targets[edges.sampler.sample(rng)])
    }

    /// Normalized `(next state, probability)` pairs for `state`.
    ///
    /// `None` if the state is unknown or unreachable.
    pub fn probabilities(&self, state: &str) -> Option<Vec<(&str, f64)>> {
        let current = self.names.iter().position(|n| n == state)?;
        let edges = self.edges[current].as_ref()?;
        Some(
            edges
                .targets
                .iter()
                .zip(&edges.probabilities)
                .map(|(&t, &p)| (self.names[t].as_str(), p))
                .collect(),
        )
    }

    /// True if `state` can be reached from the start state
    pub fn is_reachable(&self, state: usize) -> bool {
        matches!(self.edges.get(state), Some(Some(_)))
    }
}
