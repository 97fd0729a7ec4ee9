//! Signal book
//!
//! Owns every signal the pipeline has produced and enforces the status
//! lifecycle on their behalf. Retention is bounded per symbol; only signals
//! in a terminal status are ever evicted.

use std::collections::{HashMap, VecDeque};

use meridian_core::{Signal, SignalId, SignalStatus, Symbol};

use crate::error::{Result, SignalError};

#[derive(Debug)]
pub struct SignalBook {
    signals: HashMap<SignalId, Signal>,
    /// Insertion order, oldest first
    order: VecDeque<SignalId>,
    per_symbol: HashMap<Symbol, usize>,
    limit_per_symbol: usize,
}

impl SignalBook {
    pub fn new(limit_per_symbol: usize) -> Self {
        Self {
            signals: HashMap::new(),
            order: VecDeque::new(),
            per_symbol: HashMap::new(),
            limit_per_symbol: limit_per_symbol.max(1),
        }
    }

    pub fn insert(&mut self, signal: Signal) {
        let symbol = signal.symbol.clone();
        let id = signal.id;
        if self.signals.insert(id, signal).is_none() {
            self.order.push_back(id);
            *self.per_symbol.entry(symbol.clone()).or_default() += 1;
        }
        self.evict(&symbol);
    }

    pub fn get(&self, id: &SignalId) -> Option<&Signal> {
        self.signals.get(id)
    }

    /// Move a signal along its lifecycle and return the updated copy
    pub fn transition(&mut self, id: &SignalId, to: SignalStatus) -> Result<Signal> {
        let signal = self
            .signals
            .get_mut(id)
            .ok_or(SignalError::NotFound(*id))?;
        signal.transition(to)?;
        Ok(signal.clone())
    }

    /// Every retained signal, newest first
    pub fn newest_first(&self) -> Vec<Signal> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.signals.get(id))
            .cloned()
            .collect()
    }

    pub fn for_symbol(&self, symbol: &str) -> Vec<Signal> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.signals.get(id))
            .filter(|s| s.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn with_status(&self, status: SignalStatus) -> Vec<&Signal> {
        self.order
            .iter()
            .filter_map(|id| self.signals.get(id))
            .filter(|s| s.status == status)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn clear(&mut self) {
        self.signals.clear();
        self.order.clear();
        self.per_symbol.clear();
    }

    fn evict(&mut self, symbol: &str) {
        while self.per_symbol.get(symbol).copied().unwrap_or(0) > self.limit_per_symbol {
            let oldest_terminal = self.order.iter().position(|id| {
                self.signals
                    .get(id)
                    .is_some_and(|s| s.symbol == symbol && s.status.is_terminal())
            });
            let Some(index) = oldest_terminal else {
                break;
            };
            if let Some(id) = self.order.remove(index) {
                self.signals.remove(&id);
                if let Some(count) = self.per_symbol.get_mut(symbol) {
                    *count -= 1;
                }
            }
        }
    }
}
