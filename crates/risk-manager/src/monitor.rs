//! Portfolio Risk Monitor
//!
//! Runs on the monitoring cadence, independent of signal flow:
//! - Recomputes exposure, concentration, correlation, drawdown and daily PnL
//! - Raises and resolves `risk:*` alerts through the alert bus
//! - Nominates the worst open position for closure when auto-close is on
//!   and the composite score is critical

use std::collections::HashMap;

use meridian_core::{AlertKey, Portfolio, PortfolioRisk, Position, PositionId, Timestamp};
use meridian_monitor::{AlertBus, AlertTransition, ThresholdMode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::parameters::RiskParameters;

// Composite score weights (sum to 100)
const EXPOSURE_WEIGHT: Decimal = dec!(30);
const CONCENTRATION_WEIGHT: Decimal = dec!(20);
const CORRELATION_WEIGHT: Decimal = dec!(15);
const DRAWDOWN_WEIGHT: Decimal = dec!(20);
const DAILY_LOSS_WEIGHT: Decimal = dec!(15);

/// Result of one monitoring pass
#[derive(Debug, Clone)]
pub struct RiskCheck {
    pub risk: PortfolioRisk,
    /// Raised or resolved alerts only
    pub transitions: Vec<AlertTransition>,
    pub auto_close: Option<PositionId>,
}

#[derive(Debug, Default)]
pub struct PortfolioRiskMonitor {
    peak_value: Option<Decimal>,
    latest: PortfolioRisk,
}

impl PortfolioRiskMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest computed figures
    pub fn latest(&self) -> &PortfolioRisk {
        &self.latest
    }

    pub fn peak_value(&self) -> Option<Decimal> {
        self.peak_value
    }

    /// Recompute risk figures; tracks the total-value peak for drawdown
    pub fn assess(&mut self, portfolio: &Portfolio, params: &RiskParameters) -> PortfolioRisk {
        let total_value = portfolio.total_value;
        let peak = self
            .peak_value
            .map_or(total_value, |peak| peak.max(total_value));
        self.peak_value = Some(peak);

        let total_exposure: Decimal = portfolio.positions.iter().map(Position::notional).sum();
        let largest = portfolio
            .positions
            .iter()
            .map(Position::notional)
            .max()
            .unwrap_or(Decimal::ZERO);

        let exposure_ratio = fraction_of(total_exposure, total_value);
        let concentration = fraction_of(largest, total_value);
        let correlation = class_concentration(&portfolio.positions, params);
        let drawdown = if peak > Decimal::ZERO {
            ((peak - total_value) / peak).max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };
        let daily_loss = (-portfolio.daily_pnl).max(Decimal::ZERO);

        let risk_score = (EXPOSURE_WEIGHT * saturate(exposure_ratio, params.max_exposure)
            + CONCENTRATION_WEIGHT * saturate(concentration, params.max_concentration)
            + CORRELATION_WEIGHT * saturate(correlation, params.max_correlation)
            + DRAWDOWN_WEIGHT * saturate(drawdown, params.max_drawdown)
            + DAILY_LOSS_WEIGHT * saturate(daily_loss, params.max_daily_loss))
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

        self.latest = PortfolioRisk {
            total_exposure,
            exposure_ratio,
            concentration,
            correlation,
            drawdown,
            daily_pnl: portfolio.daily_pnl,
            open_positions: portfolio.open_position_count(),
            risk_score,
        };
        self.latest.clone()
    }

    /// Assess, feed the alert bus and pick an auto-close candidate
    pub fn check(
        &mut self,
        portfolio: &Portfolio,
        params: &RiskParameters,
        bus: &mut AlertBus,
        now: Timestamp,
    ) -> RiskCheck {
        let risk = self.assess(portfolio, params);

        let observations = [
            ("exposure", risk.exposure_ratio, params.max_exposure),
            ("concentration", risk.concentration, params.max_concentration),
            ("correlation", risk.correlation, params.max_correlation),
            ("drawdown", risk.drawdown, params.max_drawdown),
            (
                "daily_loss",
                (-risk.daily_pnl).max(Decimal::ZERO),
                params.max_daily_loss,
            ),
        ];
        let mut transitions: Vec<AlertTransition> = observations
            .into_iter()
            .map(|(metric, value, threshold)| {
                bus.observe(
                    AlertKey::risk(metric),
                    value,
                    threshold,
                    ThresholdMode::Normal,
                    now,
                )
            })
            .collect();
        transitions.retain(AlertTransition::is_change);

        let auto_close = if params.auto_close_enabled && risk.risk_score >= params.critical_risk_score {
            let candidate = highest_risk_position(&portfolio.positions);
            if let Some(position) = candidate {
                log::warn!(
                    "[RISK] Portfolio risk {} >= {}: nominating {} {} for closure (unrealized {})",
                    risk.risk_score.round_dp(1),
                    params.critical_risk_score,
                    position.symbol,
                    position.id,
                    position.unrealized_pnl().round_dp(2)
                );
            }
            candidate.map(|p| p.id)
        } else {
            None
        };

        RiskCheck {
            risk,
            transitions,
            auto_close,
        }
    }
}

/// Largest unrealized loss first, then largest notional
pub fn highest_risk_position(positions: &[Position]) -> Option<&Position> {
    positions.iter().max_by(|a, b| {
        b.unrealized_pnl()
            .cmp(&a.unrealized_pnl())
            .then_with(|| a.notional().cmp(&b.notional()))
    })
}

/// Largest asset-class share of open notional (0 with fewer than two positions)
fn class_concentration(positions: &[Position], params: &RiskParameters) -> Decimal {
    if positions.len() < 2 {
        return Decimal::ZERO;
    }
    let mut by_class: HashMap<&str, Decimal> = HashMap::new();
    for position in positions {
        *by_class
            .entry(params.asset_class(&position.symbol))
            .or_default() += position.notional();
    }
    let total: Decimal = by_class.values().copied().sum();
    let largest = by_class.values().copied().max().unwrap_or(Decimal::ZERO);
    fraction_of(largest, total)
}

fn fraction_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part / whole
}

/// `value / limit`, capped at 1
fn saturate(value: Decimal, limit: Decimal) -> Decimal {
    if limit <= Decimal::ZERO {
        return Decimal::ONE;
    }
    (value / limit).clamp(Decimal::ZERO, Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::{PositionSide, PositionStatus};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn position(symbol: &str, qty: Decimal, entry: Decimal, current: Decimal) -> Position {
        let mut pos = Position::new(
            symbol,
            PositionSide::Long,
            qty,
            entry,
            entry * dec!(0.5),
            entry * dec!(2),
            None,
            Utc::now(),
        );
        pos.status = PositionStatus::Open;
        pos.current_price = current;
        pos
    }

    fn portfolio(cash: Decimal, daily_pnl: Decimal, positions: Vec<Position>) -> Portfolio {
        let total = cash + positions.iter().map(|p| p.market_value()).sum::<Decimal>();
        Portfolio {
            id: Uuid::new_v4(),
            available_cash: cash,
            total_value: total,
            total_pnl: Decimal::ZERO,
            daily_pnl,
            allocation: BTreeMap::new(),
            positions,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_portfolio_is_calm() {
        let mut monitor = PortfolioRiskMonitor::new();
        let risk = monitor.assess(&portfolio(dec!(10000), Decimal::ZERO, vec![]), &RiskParameters::default());
        assert_eq!(risk.exposure_ratio, Decimal::ZERO);
        assert_eq!(risk.risk_score, Decimal::ZERO);
        assert_eq!(monitor.peak_value(), Some(dec!(10000)));
    }

    #[test]
    fn test_figures() {
        let mut monitor = PortfolioRiskMonitor::new();
        let pf = portfolio(
            dec!(5000),
            Decimal::ZERO,
            vec![
                position("ETH", dec!(1), dec!(3000), dec!(3000)),
                position("SOL", dec!(20), dec!(100), dec!(100)),
            ],
        );
        let risk = monitor.assess(&pf, &RiskParameters::default());

        assert_eq!(risk.total_exposure, dec!(5000));
        assert_eq!(risk.exposure_ratio, dec!(0.5));
        assert_eq!(risk.concentration, dec!(0.3));
        // Both smart_contract
        assert_eq!(risk.correlation, Decimal::ONE);
        assert_eq!(risk.open_positions, 2);
    }

    #[test]
    fn test_drawdown_from_peak() {
        let mut monitor = PortfolioRiskMonitor::new();
        let params = RiskParameters::default();
        monitor.assess(&portfolio(dec!(10000), Decimal::ZERO, vec![]), &params);
        let risk = monitor.assess(&portfolio(dec!(8000), Decimal::ZERO, vec![]), &params);
        assert_eq!(risk.drawdown, dec!(0.2));
        assert_eq!(monitor.peak_value(), Some(dec!(10000)));
    }

    #[test]
    fn test_alerts_raised_once_and_resolved() {
        let mut monitor = PortfolioRiskMonitor::new();
        let mut bus = AlertBus::default();
        let params = RiskParameters::default();
        let heavy = portfolio(
            dec!(1000),
            Decimal::ZERO,
            vec![position("BTC", dec!(0.2), dec!(45000), dec!(45000))],
        );

        let first = monitor.check(&heavy, &params, &mut bus, Utc::now());
        let raised: Vec<_> = first
            .transitions
            .iter()
            .filter_map(|t| match t {
                AlertTransition::Raised(a) => Some(a.key.metric_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(raised, vec!["exposure".to_string(), "concentration".to_string()]);

        let second = monitor.check(&heavy, &params, &mut bus, Utc::now());
        assert!(second.transitions.is_empty());

        // Cash only at the same value: both clear
        let calm = portfolio(heavy.total_value, Decimal::ZERO, vec![]);
        let third = monitor.check(&calm, &params, &mut bus, Utc::now());
        assert_eq!(third.transitions.len(), 2);
        assert!(third.transitions.iter().all(|t| matches!(t, AlertTransition::Resolved(_))));
    }

    #[test]
    fn test_auto_close_nominates_worst_loser() {
        let mut monitor = PortfolioRiskMonitor::new();
        let mut bus = AlertBus::default();
        let params = RiskParameters {
            auto_close_enabled: true,
            critical_risk_score: dec!(50),
            ..Default::default()
        };
        let loser = position("ETH", dec!(2), dec!(3000), dec!(2500));
        let winner = position("BTC", dec!(0.1), dec!(40000), dec!(45000));
        let loser_id = loser.id;
        let pf = portfolio(dec!(500), dec!(-2500), vec![winner, loser]);

        let check = monitor.check(&pf, &params, &mut bus, Utc::now());
        assert!(check.risk.risk_score >= dec!(50));
        assert_eq!(check.auto_close, Some(loser_id));

        let disabled = RiskParameters {
            critical_risk_score: dec!(50),
            ..Default::default()
        };
        assert_eq!(monitor.check(&pf, &disabled, &mut bus, Utc::now()).auto_close, None);
    }

    #[test]
    fn test_ties_broken_by_notional() {
        let small = position("A", dec!(1), dec!(100), dec!(100));
        let large = position("B", dec!(10), dec!(100), dec!(100));
        let large_id = large.id;
        let positions = vec![small, large];
        assert_eq!(highest_risk_position(&positions).map(|p| p.id), Some(large_id));
    }
}
