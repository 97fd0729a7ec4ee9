//! Synthetic sentiment from momentum and RSI
//!
//! There is no external sentiment provider; a reading is derived from the same
//! indicator state the snapshot carries, plus an optional jitter term.

use meridian_core::Sentiment;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Momentum (percent) at which the momentum component saturates
const MOMENTUM_SCALE: Decimal = dec!(5);

/// Derive a sentiment reading
///
/// `jitter` is added to the score before clamping; pass zero for deterministic output.
pub fn synthesize(momentum: Decimal, rsi: Decimal, jitter: Decimal) -> Sentiment {
    let momentum_component = (momentum / MOMENTUM_SCALE).clamp(Decimal::NEGATIVE_ONE, Decimal::ONE);
    let rsi_component = ((rsi - dec!(50)) / dec!(50)).clamp(Decimal::NEGATIVE_ONE, Decimal::ONE);
    let score = dec!(0.6) * momentum_component + dec!(0.4) * rsi_component + jitter;

    // Agreement between the two components raises confidence
    let agreement = if momentum_component.is_sign_negative() == rsi_component.is_sign_negative() {
        dec!(0.2)
    } else {
        Decimal::ZERO
    };
    let confidence = dec!(0.3) + dec!(0.5) * score.abs().min(Decimal::ONE) + agreement;

    let mut tags = Vec::new();
    if momentum > dec!(2) {
        tags.push("bullish_momentum".to_string());
    } else if momentum < dec!(-2) {
        tags.push("bearish_momentum".to_string());
    }
    if rsi < dec!(30) {
        tags.push("oversold".to_string());
    } else if rsi > dec!(70) {
        tags.push("overbought".to_string());
    }
    if tags.is_empty() {
        tags.push("neutral".to_string());
    }

    Sentiment::new(score, confidence, tags)
}
