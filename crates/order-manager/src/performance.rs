//! Trade-history performance statistics
//!
//! Everything is derived from the full trade list: each position with a
//! closing leg contributes one round trip, net of both legs' fees.

use std::collections::HashMap;

use meridian_core::{PerformanceMetrics, PositionId, Trade, TradeLeg};
use rust_decimal::{Decimal, MathematicalOps};

/// One completed position
#[derive(Debug, Clone, Copy, PartialEq)]
struct RoundTrip {
    net_pnl: Decimal,
    fees: Decimal,
    /// Net PnL over opening value
    return_fraction: Decimal,
}

fn round_trips(trades: &[Trade]) -> Vec<RoundTrip> {
    let mut opens: HashMap<PositionId, (Decimal, Decimal)> = HashMap::new();
    for trade in trades.iter().filter(|t| t.leg == TradeLeg::Open) {
        opens.insert(trade.position_id, (trade.value, trade.fees));
    }

    trades
        .iter()
        .filter(|t| t.is_closing())
        .map(|close| {
            let (open_value, open_fees) = opens
                .get(&close.position_id)
                .copied()
                .unwrap_or((Decimal::ZERO, Decimal::ZERO));
            let fees = open_fees + close.fees;
            let net_pnl = close.realized_pnl.unwrap_or(Decimal::ZERO) - fees;
            let return_fraction = if open_value.is_zero() {
                Decimal::ZERO
            } else {
                net_pnl / open_value
            };
            RoundTrip {
                net_pnl,
                fees,
                return_fraction,
            }
        })
        .collect()
}

/// Recompute performance from every trade, starting from `initial_equity`
pub fn compute(trades: &[Trade], initial_equity: Decimal) -> PerformanceMetrics {
    let trips = round_trips(trades);
    let total_fees: Decimal = trades.iter().map(|t| t.fees).sum();
    if trips.is_empty() {
        return PerformanceMetrics {
            total_fees,
            ..Default::default()
        };
    }

    let wins: Vec<Decimal> = trips
        .iter()
        .map(|t| t.net_pnl)
        .filter(|p| *p > Decimal::ZERO)
        .collect();
    let losses: Vec<Decimal> = trips
        .iter()
        .map(|t| t.net_pnl)
        .filter(|p| *p < Decimal::ZERO)
        .collect();

    let gross_profit: Decimal = wins.iter().sum();
    let gross_loss: Decimal = losses.iter().map(|l| l.abs()).sum();
    let total = trips.len();

    PerformanceMetrics {
        total_trades: total,
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate: Decimal::from(wins.len()) / Decimal::from(total),
        average_win: mean_of(gross_profit, wins.len()),
        average_loss: mean_of(gross_loss, losses.len()),
        profit_factor: if gross_loss.is_zero() {
            Decimal::ZERO
        } else {
            gross_profit / gross_loss
        },
        max_drawdown: max_drawdown(&trips, initial_equity),
        sharpe_ratio: sharpe(&trips),
        net_realized_pnl: trips.iter().map(|t| t.net_pnl).sum(),
        total_fees,
    }
}

fn mean_of(sum: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    sum / Decimal::from(count)
}

/// Largest peak-to-trough decline of the realized equity curve
fn max_drawdown(trips: &[RoundTrip], initial_equity: Decimal) -> Decimal {
    let mut equity = initial_equity;
    let mut peak = initial_equity;
    let mut worst = Decimal::ZERO;
    for trip in trips {
        equity += trip.net_pnl;
        peak = peak.max(equity);
        if peak > Decimal::ZERO {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst
}

/// Mean per-trade return over its sample standard deviation
fn sharpe(trips: &[RoundTrip]) -> Decimal {
    if trips.len() < 2 {
        return Decimal::ZERO;
    }
    let n = Decimal::from(trips.len());
    let mean = trips.iter().map(|t| t.return_fraction).sum::<Decimal>() / n;
    let variance = trips
        .iter()
        .map(|t| (t.return_fraction - mean) * (t.return_fraction - mean))
        .sum::<Decimal>()
        / (n - Decimal::ONE);
    match variance.sqrt() {
        Some(std_dev) if !std_dev.is_zero() => mean / std_dev,
        _ => Decimal::ZERO,
    }
}
