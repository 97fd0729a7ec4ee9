//! Seeded random-walk source for demos and tests
//!
//! Prices follow `price * (1 + volatility * u)` with `u` uniform in [-1, 1].
//! Tests can script exact prices per symbol and make symbols fail on demand.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use meridian_core::{Price, values::pct_change};
use meridian_ports::{MarketDataSource, PortError, PortResult, TickerQuote};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Configuration for the simulated source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedSourceConfig {
    /// Starting price (also the 24h reference) per symbol
    #[serde(default = "default_initial_prices")]
    pub initial_prices: HashMap<String, Decimal>,
    /// Maximum fractional move per fetch (0.005 = 0.5%)
    #[serde(default = "default_volatility")]
    pub volatility: Decimal,
    /// 24h volume reported for every symbol (base units)
    #[serde(default = "default_volume")]
    pub volume_24h: Decimal,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimulatedSourceConfig {
    fn default() -> Self {
        Self {
            initial_prices: default_initial_prices(),
            volatility: default_volatility(),
            volume_24h: default_volume(),
            seed: default_seed(),
        }
    }
}

fn default_initial_prices() -> HashMap<String, Decimal> {
    let mut prices = HashMap::new();
    prices.insert("BTC".to_string(), dec!(45000));
    prices.insert("ETH".to_string(), dec!(3000));
    prices.insert("SOL".to_string(), dec!(100));
    prices
}

fn default_volatility() -> Decimal {
    dec!(0.005)
}

fn default_volume() -> Decimal {
    dec!(10000)
}

fn default_seed() -> u64 {
    42
}

#[derive(Debug)]
struct SimState {
    rng: StdRng,
    prices: HashMap<String, Price>,
    scripted: HashMap<String, VecDeque<Price>>,
    failing: HashSet<String>,
    fetches: u64,
}

/// In-process `MarketDataSource` backed by a seeded random walk
pub struct SimulatedSource {
    config: SimulatedSourceConfig,
    state: Mutex<SimState>,
}

impl SimulatedSource {
    pub fn new(config: SimulatedSourceConfig) -> Self {
        let state = SimState {
            rng: StdRng::seed_from_u64(config.seed),
            prices: config.initial_prices.clone(),
            scripted: HashMap::new(),
            failing: HashSet::new(),
            fetches: 0,
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Queue exact prices for `symbol`; they are served before the walk resumes
    pub fn script(&self, symbol: &str, prices: impl IntoIterator<Item = Price>) {
        let mut state = self.state.lock();
        state
            .scripted
            .entry(symbol.to_string())
            .or_default()
            .extend(prices);
    }

    /// Make every fetch for `symbol` fail (or stop failing)
    pub fn set_failing(&self, symbol: &str, failing: bool) {
        let mut state = self.state.lock();
        if failing {
            state.failing.insert(symbol.to_string());
        } else {
            state.failing.remove(symbol);
        }
    }

    /// Number of fetches served, failures included
    pub fn fetch_count(&self) -> u64 {
        self.state.lock().fetches
    }

    fn reference_price(&self, symbol: &str) -> Option<Price> {
        self.config.initial_prices.get(symbol).copied()
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(SimulatedSourceConfig::default())
    }
}

#[async_trait]
impl MarketDataSource for SimulatedSource {
    async fn fetch_ticker(&self, symbol: &str) -> PortResult<TickerQuote> {
        let mut state = self.state.lock();
        state.fetches += 1;

        if state.failing.contains(symbol) {
            return Err(PortError::Unavailable(format!(
                "simulated outage for {}",
                symbol
            )));
        }

        let current = state
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| PortError::UnknownSymbol(symbol.to_string()))?;

        let scripted = state.scripted.get_mut(symbol).and_then(VecDeque::pop_front);
        let next = match scripted {
            Some(price) => price,
            None => {
                let u = Decimal::new(state.rng.gen_range(-10_000..=10_000), 4);
                (current * (Decimal::ONE + self.config.volatility * u)).round_dp(8)
            }
        };
        state.prices.insert(symbol.to_string(), next);

        let reference = self.reference_price(symbol).unwrap_or(current);
        Ok(TickerQuote {
            price: next,
            change_24h_pct: pct_change(reference, next).round_dp(4),
            volume_24h: self.config.volume_24h,
            last_updated: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(seed: u64) -> SimulatedSource {
        SimulatedSource::new(SimulatedSourceConfig {
            seed,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_same_seed_same_walk() {
        let a = source(7);
        let b = source(7);
        for _ in 0..5 {
            let qa = a.fetch_ticker("BTC").await.unwrap();
            let qb = b.fetch_ticker("BTC").await.unwrap();
            assert_eq!(qa.price, qb.price);
        }
    }

    #[tokio::test]
    async fn test_walk_stays_within_volatility() {
        let src = source(1);
        let mut last = dec!(45000);
        for _ in 0..20 {
            let quote = src.fetch_ticker("BTC").await.unwrap();
            let bound = last * dec!(0.005);
            assert!((quote.price - last).abs() <= bound + dec!(0.00000001));
            last = quote.price;
        }
    }

    #[tokio::test]
    async fn test_scripted_prices_and_change() {
        let src = source(1);
        src.script("ETH", [dec!(3090), dec!(2970)]);

        let q1 = src.fetch_ticker("ETH").await.unwrap();
        assert_eq!(q1.price, dec!(3090));
        assert_eq!(q1.change_24h_pct, dec!(3));

        let q2 = src.fetch_ticker("ETH").await.unwrap();
        assert_eq!(q2.change_24h_pct, dec!(-1));
    }

    #[tokio::test]
    async fn test_failures() {
        let src = source(1);
        src.set_failing("BTC", true);
        assert!(matches!(
            src.fetch_ticker("BTC").await,
            Err(PortError::Unavailable(_))
        ));
        assert!(src.fetch_ticker("ETH").await.is_ok());
        assert!(matches!(
            src.fetch_ticker("XYZ").await,
            Err(PortError::UnknownSymbol(_))
        ));

        src.set_failing("BTC", false);
        assert!(src.fetch_ticker("BTC").await.is_ok());
        assert_eq!(src.fetch_count(), 4);
    }
}
