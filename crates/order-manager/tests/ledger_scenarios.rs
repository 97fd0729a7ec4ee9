//! End-to-end ledger scenarios
//!
//! Run with: cargo test -p meridian-order-manager --test ledger_scenarios

use chrono::{Duration, Utc};
use meridian_core::{CloseReason, Direction, PositionSide, Signal, SignalStatus};
use meridian_order_manager::{LedgerConfig, LedgerError, OpenRequest, PortfolioLedger};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn stop_loss_closes_long_at_snapshot_price() {
    init_logging();
    let start = Utc::now();
    let mut ledger = PortfolioLedger::new(LedgerConfig::default(), start);

    let mut signal = Signal::new("BTC", Direction::Buy, dec!(45000), start)
        .with_levels(dec!(43000), dec!(49500));
    signal.transition(SignalStatus::Active).unwrap();

    let position = ledger
        .execute_signal(&signal, dec!(0.1), dec!(43000), dec!(49500), start)
        .unwrap();
    assert_eq!(position.side, PositionSide::Long);
    assert_eq!(ledger.cash(), dec!(10000) - dec!(4500) - dec!(4.5));

    // Above the stop: nothing happens
    let closed = ledger.update_price("BTC", dec!(43500), start + Duration::minutes(1));
    assert!(closed.is_empty());

    let closed = ledger.update_price("BTC", dec!(42900), start + Duration::minutes(2));
    assert_eq!(closed.len(), 1);

    let exit = &closed[0];
    assert_eq!(exit.realized_pnl, dec!(-210));
    assert_eq!(exit.close_reason, Some(CloseReason::StopLoss));
    assert_eq!(exit.close_reason.map(|r| r.to_string()).as_deref(), Some("Stop Loss"));
    assert_eq!(exit.exit_price, Some(dec!(42900)));

    // Both legs' fees come off the daily figure
    assert_eq!(ledger.daily_pnl(), dec!(-210) - dec!(4.5) - dec!(4.29));
    assert_eq!(ledger.cash(), dec!(10000) - dec!(210) - dec!(4.5) - dec!(4.29));
    assert!(ledger.open_positions().is_empty());

    let perf = ledger.performance();
    assert_eq!(perf.total_trades, 1);
    assert_eq!(perf.losing_trades, 1);
    assert_eq!(perf.win_rate, Decimal::ZERO);
}

#[test]
fn short_take_profit_pays_out_gain() {
    init_logging();
    let now = Utc::now();
    let mut ledger = PortfolioLedger::new(
        LedgerConfig {
            fee_rate: Decimal::ZERO,
            ..Default::default()
        },
        now,
    );

    let mut signal = Signal::new("ETH", Direction::Sell, dec!(3000), now);
    signal.transition(SignalStatus::Active).unwrap();
    ledger
        .execute_signal(&signal, dec!(1), dec!(3150), dec!(2700), now)
        .unwrap();

    let closed = ledger.update_price("ETH", dec!(2650), now);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].close_reason, Some(CloseReason::TakeProfit));
    assert_eq!(closed[0].realized_pnl, dec!(350));
    assert_eq!(ledger.total_value(), dec!(10350));
    assert_eq!(ledger.total_pnl(), dec!(350));
}

#[test]
fn insufficient_funds_leaves_state_untouched() {
    init_logging();
    let now = Utc::now();
    let mut ledger = PortfolioLedger::new(LedgerConfig::default(), now);

    let err = ledger
        .open_position(
            OpenRequest {
                symbol: "BTC".to_string(),
                side: PositionSide::Long,
                quantity: dec!(1),
                price: dec!(45000),
                stop_loss: dec!(43000),
                take_profit: dec!(49500),
                signal_id: None,
            },
            now,
        )
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_eq!(ledger.cash(), dec!(10000));
    assert_eq!(ledger.total_value(), dec!(10000));
    assert!(ledger.trades().is_empty());
}

#[test]
fn total_value_invariant_holds_under_random_activity() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(7);
    let start = Utc::now();
    let mut ledger = PortfolioLedger::new(
        LedgerConfig {
            initial_cash: dec!(100000),
            ..Default::default()
        },
        start,
    );
    let symbols = ["BTC", "ETH", "SOL"];
    let mut prices = [dec!(45000), dec!(3000), dec!(150)];

    for step in 0..500 {
        let now = start + Duration::seconds(step);
        let i = rng.gen_range(0..symbols.len());

        match rng.gen_range(0..10) {
            0..=2 => {
                let side = if rng.gen_bool(0.5) {
                    PositionSide::Long
                } else {
                    PositionSide::Short
                };
                let price = prices[i];
                let (stop_loss, take_profit) = match side {
                    PositionSide::Long => (price * dec!(0.95), price * dec!(1.10)),
                    PositionSide::Short => (price * dec!(1.05), price * dec!(0.90)),
                };
                let quantity = Decimal::new(rng.gen_range(1..100), 2);
                let result = ledger.open_position(
                    OpenRequest {
                        symbol: symbols[i].to_string(),
                        side,
                        quantity,
                        price,
                        stop_loss,
                        take_profit,
                        signal_id: None,
                    },
                    now,
                );
                if let Err(e) = result {
                    assert!(matches!(e, LedgerError::InsufficientFunds { .. }));
                }
            }
            3 => {
                let target = ledger
                    .open_positions()
                    .first()
                    .map(|p| (p.id, p.current_price));
                if let Some((id, price)) = target {
                    ledger
                        .close_position(&id, price, CloseReason::Manual, now)
                        .unwrap();
                }
            }
            _ => {
                let move_bps = Decimal::new(rng.gen_range(-150..=150), 4);
                prices[i] = (prices[i] * (Decimal::ONE + move_bps)).round_dp(2);
                ledger.update_price(symbols[i], prices[i], now);
            }
        }

        assert!(ledger.verify_invariant(Decimal::ZERO), "invariant broken at step {step}");
        assert!(ledger.cash() >= Decimal::ZERO);
        assert!(ledger.portfolio().invariant_gap().is_zero());
    }
}

#[test]
fn closed_history_is_bounded() {
    init_logging();
    let now = Utc::now();
    let mut ledger = PortfolioLedger::new(
        LedgerConfig {
            fee_rate: Decimal::ZERO,
            closed_history_limit: 3,
            ..Default::default()
        },
        now,
    );

    for n in 0..5 {
        let position = ledger
            .open_position(
                OpenRequest {
                    symbol: "SOL".to_string(),
                    side: PositionSide::Long,
                    quantity: dec!(1),
                    price: dec!(100),
                    stop_loss: dec!(90),
                    take_profit: dec!(120),
                    signal_id: None,
                },
                now + Duration::seconds(n),
            )
            .unwrap();
        ledger
            .close_position(&position.id, dec!(101), CloseReason::Manual, now + Duration::seconds(n))
            .unwrap();
    }

    assert_eq!(ledger.closed_positions().len(), 3);
    // Full trade history is kept for performance
    assert_eq!(ledger.trades().len(), 10);
    assert_eq!(ledger.performance().total_trades, 5);
    assert_eq!(ledger.cash(), dec!(10005));
}
