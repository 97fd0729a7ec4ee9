//! Pre-trade Risk Gate
//!
//! Scores a pending signal against the current portfolio:
//! - Hard limits (position size, daily loss, open positions) always reject
//! - Soft checks (volatility, correlation, liquidity) add to the score
//! - Approval needs no hard violation and a score under the threshold
//!
//! Sizing happens here when the signal carries no explicit quantity.

use log::{info, warn};
use meridian_core::{Direction, MarketSnapshot, Portfolio, Price, Quantity, Signal, SignalId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::Result;
use crate::parameters::RiskParameters;

const POSITION_SIZE_POINTS: Decimal = dec!(30);
const DAILY_LOSS_POINTS: Decimal = dec!(40);
const OPEN_POSITIONS_POINTS: Decimal = dec!(25);
const VOLATILITY_POINTS: Decimal = dec!(15);
const CORRELATION_POINTS: Decimal = dec!(15);
const LIQUIDITY_POINTS: Decimal = dec!(10);
const SIGNAL_RISK_WEIGHT: Decimal = dec!(10);

/// Decimal places kept on sized quantities
const QUANTITY_DP: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub signal_id: SignalId,
    pub approved: bool,
    /// Composite 0-100
    pub risk_score: Decimal,
    pub reasons: Vec<String>,
    /// Any check that rejects regardless of score
    pub hard_violation: bool,
    pub quantity: Quantity,
    pub notional: Decimal,
    pub stop_loss: Price,
    pub take_profit: Price,
}

impl RiskAssessment {
    pub fn reason_summary(&self) -> String {
        if self.reasons.is_empty() {
            return "no risk flags".to_string();
        }
        self.reasons.join("; ")
    }
}

pub struct RiskGate {
    params: RiskParameters,
}

impl RiskGate {
    pub fn new(params: RiskParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &RiskParameters {
        &self.params
    }

    /// Replace parameters after validation; the old ones stay on error
    pub fn update_parameters(&mut self, params: RiskParameters) -> Result<()> {
        params.validate()?;
        info!(
            "[RISK] Parameters updated: max positions {}, max daily loss {}, approval < {}",
            params.max_open_positions, params.max_daily_loss, params.approval_threshold
        );
        self.params = params;
        Ok(())
    }

    /// Quantity for a signal: its own request, or sized from the risk budget
    ///
    /// `notional = total_value * risk_per_trade / stop_loss * confidence`,
    /// capped at the maximum position size.
    pub fn size(&self, signal: &Signal, portfolio: &Portfolio) -> Quantity {
        if let Some(quantity) = signal.quantity {
            return quantity;
        }
        if signal.entry_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let p = &self.params;
        let budget = portfolio.total_value * p.risk_per_trade_pct / p.stop_loss_pct * signal.confidence;
        let cap = portfolio.total_value * p.max_position_size_pct / Decimal::ONE_HUNDRED;
        (budget.min(cap).max(Decimal::ZERO) / signal.entry_price).round_dp(QUANTITY_DP)
    }

    pub fn evaluate(
        &self,
        signal: &Signal,
        snapshot: &MarketSnapshot,
        portfolio: &Portfolio,
    ) -> RiskAssessment {
        let p = &self.params;
        let quantity = self.size(signal, portfolio);
        let notional = quantity * signal.entry_price;

        let mut score = Decimal::ZERO;
        let mut reasons = Vec::new();
        let mut hard = false;

        // Position size
        let max_size = portfolio.total_value * p.max_position_size_pct / Decimal::ONE_HUNDRED;
        if notional > max_size {
            score += POSITION_SIZE_POINTS;
            hard = true;
            reasons.push(format!(
                "Position size {} exceeds maximum {} ({}% of portfolio)",
                notional.round_dp(2),
                max_size.round_dp(2),
                p.max_position_size_pct
            ));
        }

        // Daily loss
        if portfolio.daily_pnl <= -p.max_daily_loss {
            score += DAILY_LOSS_POINTS;
            hard = true;
            reasons.push(format!(
                "Daily loss limit reached ({} <= -{})",
                portfolio.daily_pnl.round_dp(2),
                p.max_daily_loss
            ));
        }

        // Open positions
        let open = portfolio.open_position_count();
        if open >= p.max_open_positions {
            score += OPEN_POSITIONS_POINTS;
            hard = true;
            reasons.push(format!(
                "Maximum open positions reached ({}/{})",
                open, p.max_open_positions
            ));
        }

        // Volatility
        if snapshot.change_24h.abs() > p.volatility_threshold_pct {
            score += VOLATILITY_POINTS;
            reasons.push(format!(
                "High market volatility ({}% in 24h)",
                snapshot.change_24h.round_dp(2)
            ));
        }

        // Correlation
        if let Some(share) = self.class_share(&signal.symbol, notional, portfolio) {
            if share > p.max_correlation {
                score += CORRELATION_POINTS;
                reasons.push(format!(
                    "High correlation with existing positions ({}% in {})",
                    (share * Decimal::ONE_HUNDRED).round_dp(1),
                    p.asset_class(&signal.symbol)
                ));
            }
        }

        // Liquidity
        let spread_pct = snapshot.spread_fraction() * Decimal::ONE_HUNDRED;
        let volume_value = snapshot.volume_value();
        let wide_spread = spread_pct > p.max_spread_pct;
        let thin_volume =
            volume_value > Decimal::ZERO && notional > volume_value * p.max_volume_participation;
        if wide_spread || thin_volume {
            score += LIQUIDITY_POINTS;
            reasons.push(format!(
                "Insufficient liquidity (spread {}%, notional {} vs 24h volume {})",
                spread_pct.round_dp(3),
                notional.round_dp(2),
                volume_value.round_dp(0)
            ));
        }

        score += signal.risk_score * SIGNAL_RISK_WEIGHT;
        let risk_score = score.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

        let actionable = signal.direction.is_actionable();
        if !actionable {
            reasons.push("HOLD signals are not executable".to_string());
        }
        if quantity <= Decimal::ZERO && actionable {
            hard = true;
            reasons.push("Sized quantity is zero".to_string());
        }

        let approved = actionable && !hard && risk_score < p.approval_threshold;
        let (stop_loss, take_profit) = if approved {
            self.levels(signal.direction, signal.entry_price)
        } else {
            (signal.stop_loss, signal.take_profit)
        };

        let assessment = RiskAssessment {
            signal_id: signal.id,
            approved,
            risk_score,
            reasons,
            hard_violation: hard,
            quantity,
            notional,
            stop_loss,
            take_profit,
        };

        if approved {
            info!(
                "[RISK] Approved {} {} qty {} (score {}): {}",
                signal.direction,
                signal.symbol,
                quantity,
                risk_score.round_dp(1),
                assessment.reason_summary()
            );
        } else {
            warn!(
                "[RISK] Rejected {} {} (score {}): {}",
                signal.direction,
                signal.symbol,
                risk_score.round_dp(1),
                assessment.reason_summary()
            );
        }
        assessment
    }

    /// Stop-loss and take-profit from the configured percentages
    pub fn levels(&self, direction: Direction, entry: Price) -> (Price, Price) {
        let sl = self.params.stop_loss_pct / Decimal::ONE_HUNDRED;
        let tp = self.params.take_profit_pct / Decimal::ONE_HUNDRED;
        match direction {
            Direction::Sell => (entry * (Decimal::ONE + sl), entry * (Decimal::ONE - tp)),
            Direction::Buy | Direction::Hold => {
                (entry * (Decimal::ONE - sl), entry * (Decimal::ONE + tp))
            }
        }
    }

    /// Share of open notional in the signal's asset class after adding it
    ///
    /// `None` when no existing position shares the class.
    fn class_share(&self, symbol: &str, notional: Decimal, portfolio: &Portfolio) -> Option<Decimal> {
        let class = self.params.asset_class(symbol);
        let same_class: Vec<_> = portfolio
            .positions
            .iter()
            .filter(|pos| self.params.asset_class(&pos.symbol) == class)
            .collect();
        if same_class.is_empty() {
            return None;
        }

        let class_notional: Decimal = same_class.iter().map(|pos| pos.notional()).sum();
        let total: Decimal = portfolio.positions.iter().map(|pos| pos.notional()).sum::<Decimal>() + notional;
        if total.is_zero() {
            return None;
        }
        Some((class_notional + notional) / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::{Position, PositionSide, PositionStatus};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn portfolio(total: Decimal, daily_pnl: Decimal, positions: Vec<Position>) -> Portfolio {
        Portfolio {
            id: Uuid::new_v4(),
            available_cash: total - positions.iter().map(|p| p.market_value()).sum::<Decimal>(),
            total_value: total,
            total_pnl: Decimal::ZERO,
            daily_pnl,
            allocation: BTreeMap::new(),
            positions,
            updated_at: Utc::now(),
        }
    }

    fn open_position(symbol: &str, qty: Decimal, price: Decimal) -> Position {
        let mut pos = Position::new(
            symbol,
            PositionSide::Long,
            qty,
            price,
            price * dec!(0.9),
            price * dec!(1.1),
            None,
            Utc::now(),
        );
        pos.status = PositionStatus::Open;
        pos
    }

    fn snapshot(symbol: &str, price: Decimal) -> MarketSnapshot {
        MarketSnapshot::at_price(symbol, price, "test", Utc::now())
            .with_volume(dec!(100000))
            .with_quote(price - dec!(0.05), price + dec!(0.05))
    }

    fn buy(symbol: &str, price: Decimal) -> Signal {
        Signal::new(symbol, Direction::Buy, price, Utc::now())
            .with_confidence(dec!(0.8))
            .with_risk_score(dec!(0.3))
    }

    fn gate() -> RiskGate {
        RiskGate::new(RiskParameters::default()).unwrap()
    }

    #[test]
    fn test_sizing_from_budget() {
        let gate = gate();
        let pf = portfolio(dec!(10000), Decimal::ZERO, vec![]);
        // 10000 * 1 / 5 * 0.8 = 1600 notional at 100
        assert_eq!(gate.size(&buy("BTC", dec!(100)), &pf), dec!(16));
        // Explicit quantity wins
        let explicit = buy("BTC", dec!(100)).with_quantity(dec!(3));
        assert_eq!(gate.size(&explicit, &pf), dec!(3));
    }

    #[test]
    fn test_sizing_capped_at_max_position() {
        let gate = gate();
        let pf = portfolio(dec!(10000), Decimal::ZERO, vec![]);
        let confident = buy("BTC", dec!(100)).with_confidence(Decimal::ONE);
        let params = RiskParameters {
            risk_per_trade_pct: dec!(5),
            ..Default::default()
        };
        let aggressive = RiskGate::new(params).unwrap();
        // 10000 * 5 / 5 = 10000, capped at 25% = 2500
        assert_eq!(aggressive.size(&confident, &pf), dec!(25));
        assert_eq!(gate.size(&confident, &pf), dec!(20));
    }

    #[test]
    fn test_clean_signal_approved_with_configured_levels() {
        let gate = gate();
        let pf = portfolio(dec!(10000), Decimal::ZERO, vec![]);
        let assessment = gate.evaluate(&buy("BTC", dec!(100)), &snapshot("BTC", dec!(100)), &pf);

        assert!(assessment.approved);
        assert!(!assessment.hard_violation);
        assert_eq!(assessment.risk_score, dec!(3));
        assert_eq!(assessment.stop_loss, dec!(95));
        assert_eq!(assessment.take_profit, dec!(110));
        assert!(assessment.reasons.is_empty());
    }

    #[test]
    fn test_daily_loss_rejects() {
        let gate = gate();
        let pf = portfolio(dec!(10000), dec!(-2100), vec![]);
        let assessment = gate.evaluate(&buy("BTC", dec!(100)), &snapshot("BTC", dec!(100)), &pf);

        assert!(!assessment.approved);
        assert!(assessment.hard_violation);
        assert!(assessment.reasons.iter().any(|r| r.contains("Daily loss limit reached")));
    }

    #[test]
    fn test_max_open_positions_rejects() {
        let gate = gate();
        let positions = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|s| open_position(s, dec!(1), dec!(100)))
            .collect();
        let pf = portfolio(dec!(10000), Decimal::ZERO, positions);
        let assessment = gate.evaluate(&buy("F", dec!(100)), &snapshot("F", dec!(100)), &pf);

        assert!(!assessment.approved);
        assert!(assessment.reasons.iter().any(|r| r.contains("Maximum open positions reached")));
    }

    #[test]
    fn test_oversized_request_rejects() {
        let gate = gate();
        let pf = portfolio(dec!(10000), Decimal::ZERO, vec![]);
        let signal = buy("BTC", dec!(100)).with_quantity(dec!(30));
        let assessment = gate.evaluate(&signal, &snapshot("BTC", dec!(100)), &pf);

        assert!(!assessment.approved);
        assert_eq!(assessment.notional, dec!(3000));
        assert!(assessment.reasons[0].starts_with("Position size"));
        // Rejected signals keep their own levels
        assert_eq!(assessment.stop_loss, signal.stop_loss);
    }

    #[test]
    fn test_soft_checks_accumulate() {
        let gate = gate();
        let pf = portfolio(dec!(10000), Decimal::ZERO, vec![open_position("ETH", dec!(1), dec!(1000))]);
        let snap = MarketSnapshot::at_price("SOL", dec!(100), "test", Utc::now())
            .with_change(dec!(-9))
            .with_volume(dec!(100))
            .with_quote(dec!(99), dec!(101));
        let signal = buy("SOL", dec!(100)).with_risk_score(Decimal::ONE);
        let assessment = gate.evaluate(&signal, &snap, &pf);

        // Volatility 15 + correlation 15 + liquidity 10 + signal risk 10
        assert_eq!(assessment.risk_score, dec!(50));
        assert!(assessment.approved);
        assert_eq!(assessment.reasons.len(), 3);
        assert!(assessment.reasons[1].contains("High correlation"));
    }

    #[test]
    fn test_threshold_rejects_without_hard_violation() {
        let params = RiskParameters {
            approval_threshold: dec!(40),
            ..Default::default()
        };
        let gate = RiskGate::new(params).unwrap();
        let pf = portfolio(dec!(10000), Decimal::ZERO, vec![]);
        let snap = snapshot("BTC", dec!(100)).with_change(dec!(12));
        let signal = buy("BTC", dec!(100)).with_risk_score(Decimal::ONE);
        let assessment = gate.evaluate(&signal, &snap, &pf);

        // 15 + 10 = 25, under 40
        assert!(assessment.approved);

        let strict = RiskGate::new(RiskParameters {
            approval_threshold: dec!(25),
            ..Default::default()
        })
        .unwrap();
        let assessment = strict.evaluate(&signal, &snap, &pf);
        assert!(!assessment.approved);
        assert!(!assessment.hard_violation);
    }

    #[test]
    fn test_hold_never_approved() {
        let gate = gate();
        let pf = portfolio(dec!(10000), Decimal::ZERO, vec![]);
        let hold = Signal::new("BTC", Direction::Hold, dec!(100), Utc::now());
        let assessment = gate.evaluate(&hold, &snapshot("BTC", dec!(100)), &pf);
        assert!(!assessment.approved);
        assert!(assessment.reasons.iter().any(|r| r == "HOLD signals are not executable"));
    }

    #[test]
    fn test_sell_levels_mirrored() {
        let gate = gate();
        assert_eq!(gate.levels(Direction::Sell, dec!(200)), (dec!(210), dec!(180)));
    }

    #[test]
    fn test_invalid_update_keeps_old_parameters() {
        let mut gate = gate();
        let bad = RiskParameters {
            stop_loss_pct: Decimal::ZERO,
            ..Default::default()
        };
        assert!(gate.update_parameters(bad).is_err());
        assert_eq!(gate.parameters().stop_loss_pct, dec!(5));
    }
}
