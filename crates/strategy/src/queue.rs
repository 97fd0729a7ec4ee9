//! Per-symbol FIFO with a single in-flight guard
//!
//! ```text
//! push(BTC, a) push(BTC, b) push(ETH, c)
//!   begin(BTC) -> a     begin(BTC) -> None (a in flight)
//!   finish(BTC)         begin(BTC) -> b
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use meridian_core::Symbol;

#[derive(Debug)]
pub struct SymbolQueue<T> {
    pending: HashMap<Symbol, VecDeque<T>>,
    in_flight: HashSet<Symbol>,
}

impl<T> Default for SymbolQueue<T> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            in_flight: HashSet::new(),
        }
    }
}

impl<T> SymbolQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: impl Into<Symbol>, item: T) {
        self.pending.entry(symbol.into()).or_default().push_back(item);
    }

    /// Take the next item for `symbol`, unless one is already in flight
    pub fn begin(&mut self, symbol: &str) -> Option<T> {
        if self.in_flight.contains(symbol) {
            return None;
        }
        let item = self.pending.get_mut(symbol)?.pop_front()?;
        self.in_flight.insert(symbol.to_string());
        Some(item)
    }

    /// Release the in-flight guard for `symbol`
    pub fn finish(&mut self, symbol: &str) {
        self.in_flight.remove(symbol);
        if self.pending.get(symbol).is_some_and(|q| q.is_empty()) {
            self.pending.remove(symbol);
        }
    }

    pub fn is_in_flight(&self, symbol: &str) -> bool {
        self.in_flight.contains(symbol)
    }

    /// Symbols with queued items and nothing in flight
    pub fn ready_symbols(&self) -> Vec<Symbol> {
        let mut ready: Vec<Symbol> = self
            .pending
            .iter()
            .filter(|(symbol, queue)| !queue.is_empty() && !self.in_flight.contains(*symbol))
            .map(|(symbol, _)| symbol.clone())
            .collect();
        ready.sort();
        ready
    }

    pub fn len(&self) -> usize {
        self.pending.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued item and release all guards
    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_flight.clear();
    }
}
