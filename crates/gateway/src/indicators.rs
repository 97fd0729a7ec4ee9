//! Incremental indicator synthesis
//!
//! Every indicator is a pure `(previous, input) -> updated` step. Nothing is
//! recomputed from raw history; the only state carried between ticks is the
//! previous `IndicatorState` for the symbol. The first observation seeds all
//! state from the price.

use std::collections::HashMap;

use meridian_core::{Bollinger, EmaPair, Indicators, Macd, Price, Symbol};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Indicator periods and bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: u32,
    /// Largest RSI move allowed in a single tick
    #[serde(default = "default_rsi_max_step")]
    pub rsi_max_step: Decimal,
    #[serde(default = "default_ema_fast")]
    pub ema_fast: u32,
    #[serde(default = "default_ema_slow")]
    pub ema_slow: u32,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: u32,
    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: u32,
    /// Band width in standard deviations
    #[serde(default = "default_bollinger_k")]
    pub bollinger_k: Decimal,
    #[serde(default = "default_volume_period")]
    pub volume_period: u32,
    #[serde(default = "default_momentum_period")]
    pub momentum_period: u32,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            rsi_max_step: default_rsi_max_step(),
            ema_fast: default_ema_fast(),
            ema_slow: default_ema_slow(),
            macd_signal: default_macd_signal(),
            bollinger_period: default_bollinger_period(),
            bollinger_k: default_bollinger_k(),
            volume_period: default_volume_period(),
            momentum_period: default_momentum_period(),
        }
    }
}

fn default_rsi_period() -> u32 {
    14
}

fn default_rsi_max_step() -> Decimal {
    dec!(10)
}

fn default_ema_fast() -> u32 {
    12
}

fn default_ema_slow() -> u32 {
    26
}

fn default_macd_signal() -> u32 {
    9
}

fn default_bollinger_period() -> u32 {
    20
}

fn default_bollinger_k() -> Decimal {
    dec!(2)
}

fn default_volume_period() -> u32 {
    20
}

fn default_momentum_period() -> u32 {
    10
}

/// `α = 2 / (n + 1)`
pub fn smoothing_factor(period: u32) -> Decimal {
    Decimal::TWO / Decimal::from(period.max(1) + 1)
}

/// One EMA step
pub fn ema_step(previous: Decimal, input: Decimal, period: u32) -> Decimal {
    previous + smoothing_factor(period) * (input - previous)
}

/// Wilder-smoothed gains/losses plus the bounded RSI value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiState {
    pub avg_gain: Decimal,
    pub avg_loss: Decimal,
    pub value: Decimal,
}

impl Default for RsiState {
    fn default() -> Self {
        Self {
            avg_gain: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            value: dec!(50),
        }
    }
}

/// One RSI step from a price move
///
/// The reported value moves toward the Wilder RSI by at most `max_step` and
/// always stays within [0, 100].
pub fn rsi_step(previous: RsiState, price_move: Decimal, period: u32, max_step: Decimal) -> RsiState {
    let alpha = Decimal::ONE / Decimal::from(period.max(1));
    let gain = price_move.max(Decimal::ZERO);
    let loss = (-price_move).max(Decimal::ZERO);
    let avg_gain = previous.avg_gain + alpha * (gain - previous.avg_gain);
    let avg_loss = previous.avg_loss + alpha * (loss - previous.avg_loss);

    let target = if avg_loss.is_zero() {
        if avg_gain.is_zero() {
            dec!(50)
        } else {
            Decimal::ONE_HUNDRED
        }
    } else {
        Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + avg_gain / avg_loss)
    };

    let step = (target - previous.value).clamp(-max_step, max_step);
    RsiState {
        avg_gain,
        avg_loss,
        value: (previous.value + step).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED),
    }
}

/// MACD from the current EMA pair and the previous signal line
pub fn macd_step(previous: Macd, ema: EmaPair, signal_period: u32) -> Macd {
    let macd = ema.ema12 - ema.ema26;
    let signal = ema_step(previous.signal, macd, signal_period);
    Macd {
        macd,
        signal,
        histogram: macd - signal,
    }
}

/// Exponentially weighted mean and variance behind the Bollinger bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandState {
    pub mean: Decimal,
    pub variance: Decimal,
}

impl BandState {
    pub fn seeded(price: Price) -> Self {
        Self {
            mean: price,
            variance: Decimal::ZERO,
        }
    }

    pub fn bands(&self, k: Decimal) -> Bollinger {
        let width = k * self.variance.sqrt().unwrap_or_default();
        Bollinger {
            upper: self.mean + width,
            middle: self.mean,
            lower: self.mean - width,
        }
    }
}

/// One Bollinger step
pub fn band_step(previous: BandState, price: Price, period: u32) -> BandState {
    let alpha = smoothing_factor(period);
    let diff = price - previous.mean;
    BandState {
        mean: previous.mean + alpha * diff,
        variance: (Decimal::ONE - alpha) * (previous.variance + alpha * diff * diff),
    }
}

/// Smoothed volume and the ratio of current volume to it
pub fn volume_step(previous_avg: Decimal, volume: Decimal, period: u32) -> (Decimal, Decimal) {
    let avg = ema_step(previous_avg, volume, period);
    let ratio = if avg.is_zero() {
        Decimal::ONE
    } else {
        volume / avg
    };
    (avg, ratio)
}

/// Smoothed 24h change
pub fn momentum_step(previous: Decimal, change_24h: Decimal, period: u32) -> Decimal {
    ema_step(previous, change_24h, period)
}

/// One market reading fed to the synthesizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub price: Price,
    pub volume_24h: Decimal,
    pub change_24h: Decimal,
}

/// Everything carried from one tick to the next for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorState {
    pub last_price: Price,
    pub ema: EmaPair,
    pub macd: Macd,
    pub rsi: RsiState,
    pub band: BandState,
    pub avg_volume: Decimal,
    pub volume_ratio: Decimal,
    pub momentum: Decimal,
}

impl IndicatorState {
    /// Seed all state from a first observation
    pub fn seed(obs: &Observation) -> Self {
        Self {
            last_price: obs.price,
            ema: EmaPair {
                ema12: obs.price,
                ema26: obs.price,
            },
            macd: Macd::default(),
            rsi: RsiState::default(),
            band: BandState::seeded(obs.price),
            avg_volume: obs.volume_24h,
            volume_ratio: Decimal::ONE,
            momentum: obs.change_24h,
        }
    }

    /// Pure update from the previous state
    pub fn next(&self, obs: &Observation, config: &IndicatorConfig) -> Self {
        let ema = EmaPair {
            ema12: ema_step(self.ema.ema12, obs.price, config.ema_fast),
            ema26: ema_step(self.ema.ema26, obs.price, config.ema_slow),
        };
        let (avg_volume, volume_ratio) =
            volume_step(self.avg_volume, obs.volume_24h, config.volume_period);

        Self {
            last_price: obs.price,
            ema,
            macd: macd_step(self.macd, ema, config.macd_signal),
            rsi: rsi_step(
                self.rsi,
                obs.price - self.last_price,
                config.rsi_period,
                config.rsi_max_step,
            ),
            band: band_step(self.band, obs.price, config.bollinger_period),
            avg_volume,
            volume_ratio,
            momentum: momentum_step(self.momentum, obs.change_24h, config.momentum_period),
        }
    }

    pub fn indicators(&self, config: &IndicatorConfig) -> Indicators {
        Indicators {
            rsi: self.rsi.value,
            macd: self.macd,
            bollinger: self.band.bands(config.bollinger_k),
            ema: self.ema,
            volume_ratio: self.volume_ratio,
            momentum: self.momentum,
        }
    }
}

/// Per-symbol indicator state
#[derive(Debug, Default)]
pub struct IndicatorSynthesizer {
    config: IndicatorConfig,
    states: HashMap<Symbol, IndicatorState>,
}

impl IndicatorSynthesizer {
    pub fn new(config: IndicatorConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// Fold an observation into the symbol's state and return its indicators
    pub fn observe(&mut self, symbol: &str, obs: Observation) -> Indicators {
        let next = match self.states.get(symbol) {
            Some(previous) => previous.next(&obs, &self.config),
            None => IndicatorState::seed(&obs),
        };
        let indicators = next.indicators(&self.config);
        self.states.insert(symbol.to_string(), next);
        indicators
    }

    pub fn state(&self, symbol: &str) -> Option<&IndicatorState> {
        self.states.get(symbol)
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(price: Decimal) -> Observation {
        Observation {
            price,
            volume_24h: dec!(1000),
            change_24h: Decimal::ZERO,
        }
    }

    #[test]
    fn test_smoothing_factor() {
        assert_eq!(smoothing_factor(1), Decimal::ONE);
        assert_eq!(smoothing_factor(9), dec!(0.2));
    }

    #[test]
    fn test_ema_step() {
        // α = 0.2
        assert_eq!(ema_step(dec!(100), dec!(110), 9), dec!(102));
    }

    #[test]
    fn test_rsi_step_is_bounded() {
        let mut state = RsiState::default();
        for _ in 0..3 {
            let next = rsi_step(state, dec!(500), 14, dec!(10));
            assert!(next.value - state.value <= dec!(10));
            state = next;
        }
        assert_eq!(state.value, dec!(80));

        // A run of strong gains saturates at 100, never above
        for _ in 0..10 {
            state = rsi_step(state, dec!(500), 14, dec!(10));
        }
        assert_eq!(state.value, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_rsi_falls_on_losses() {
        let state = rsi_step(RsiState::default(), dec!(-20), 14, dec!(5));
        assert_eq!(state.value, dec!(45));
        assert!(state.avg_loss > Decimal::ZERO);
    }

    #[test]
    fn test_first_observation_seeds_from_price() {
        let mut synth = IndicatorSynthesizer::new(IndicatorConfig::default());
        let ind = synth.observe("BTC", obs(dec!(45000)));

        assert_eq!(ind.rsi, dec!(50));
        assert_eq!(ind.ema.ema12, dec!(45000));
        assert_eq!(ind.bollinger.upper, dec!(45000));
        assert_eq!(ind.macd, Macd::default());
        assert_eq!(ind.volume_ratio, Decimal::ONE);
    }

    #[test]
    fn test_rally_turns_macd_bullish() {
        let mut synth = IndicatorSynthesizer::new(IndicatorConfig::default());
        let mut price = dec!(100);
        synth.observe("ETH", obs(price));
        let mut ind = synth.observe("ETH", obs(price));
        for _ in 0..5 {
            price += dec!(2);
            ind = synth.observe("ETH", obs(price));
        }

        assert!(ind.ema.ema12 > ind.ema.ema26);
        assert!(ind.macd.is_bullish());
        assert!(ind.macd.histogram > Decimal::ZERO);
        assert!(ind.rsi > dec!(50));
        assert!(ind.bollinger.upper > ind.bollinger.lower);
    }

    #[test]
    fn test_symbols_are_independent() {
        let mut synth = IndicatorSynthesizer::new(IndicatorConfig::default());
        synth.observe("BTC", obs(dec!(100)));
        synth.observe("BTC", obs(dec!(120)));
        let eth = synth.observe("ETH", obs(dec!(50)));

        assert_eq!(eth.ema.ema12, dec!(50));
        assert_eq!(synth.state("BTC").map(|s| s.last_price), Some(dec!(120)));
    }

    #[test]
    fn test_volume_ratio() {
        let (avg, ratio) = volume_step(dec!(100), dec!(200), 9);
        assert_eq!(avg, dec!(120));
        assert_eq!(ratio, dec!(200) / dec!(120));
    }
}
