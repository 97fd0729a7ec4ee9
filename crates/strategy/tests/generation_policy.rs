//! Cooldown and force-generation behaviour over a stream of snapshots

use chrono::{Duration, Utc};
use meridian_core::{Direction, MarketSnapshot, Sentiment, SignalStatus, Timestamp};
use meridian_strategy::{Decision, SignalBook, SignalConfig, SignalGenerator, SymbolQueue};
use rust_decimal_macros::dec;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quiet(symbol: &str, at: Timestamp) -> MarketSnapshot {
    MarketSnapshot::at_price(symbol, dec!(45000), "test", at)
}

#[test]
fn test_quiet_market_forces_exactly_one_signal() {
    init_logger();
    let start = Utc::now();
    let config = SignalConfig {
        min_conditions: 2,
        ..Default::default()
    };
    let mut generator = SignalGenerator::new(config).unwrap();

    // First signal at start, then a quiet market past the force threshold
    assert!(generator.evaluate(&quiet("BTC", start), start).signal().is_some());

    let mut emitted = Vec::new();
    for minute in 1..=16 {
        let now = start + Duration::minutes(minute);
        if let Decision::Generated { signal, forced } = generator.evaluate(&quiet("BTC", now), now) {
            emitted.push((minute, forced, signal));
        }
    }

    assert_eq!(emitted.len(), 1);
    let (minute, forced, signal) = &emitted[0];
    assert_eq!(*minute, 15);
    assert!(forced);
    assert_eq!(signal.status, SignalStatus::Pending);
}

#[test]
fn test_no_two_signals_within_cooldown() {
    init_logger();
    let start = Utc::now();
    let mut generator = SignalGenerator::new(SignalConfig::default()).unwrap();
    let mut book = SignalBook::new(100);

    // A strongly bullish snapshot every 30 seconds for an hour
    for step in 0..120 {
        let now = start + Duration::seconds(step * 30);
        let snapshot = quiet("BTC", now)
            .with_change(dec!(6))
            .with_sentiment(Sentiment::new(dec!(0.8), dec!(0.9), vec![]));
        if let Some(signal) = generator.evaluate(&snapshot, now).into_signal() {
            book.insert(signal);
        }
    }

    // Every 5.5 minutes: 5 minutes must be exceeded, not just reached
    let signals = book.newest_first();
    assert_eq!(signals.len(), 11);
    for pair in signals.windows(2) {
        assert_eq!(pair[0].timestamp - pair[1].timestamp, Duration::seconds(330));
    }
    assert!(signals.iter().all(|s| s.direction == Direction::Buy));
}

#[test]
fn test_queue_feeds_generator_in_arrival_order() {
    init_logger();
    let start = Utc::now();
    let mut generator = SignalGenerator::new(SignalConfig::default()).unwrap();
    let mut queue = SymbolQueue::new();

    for i in 0..3 {
        let at = start + Duration::seconds(i);
        queue.push("BTC", quiet("BTC", at));
        queue.push("ETH", quiet("ETH", at));
    }

    let mut seen = Vec::new();
    while !queue.is_empty() {
        for symbol in queue.ready_symbols() {
            if let Some(snapshot) = queue.begin(&symbol) {
                let decision = generator.evaluate(&snapshot, snapshot.timestamp);
                seen.push((symbol.clone(), snapshot.timestamp, decision.signal().is_some()));
                queue.finish(&symbol);
            }
        }
    }

    let btc: Vec<_> = seen.iter().filter(|(s, _, _)| s == "BTC").collect();
    assert_eq!(btc.len(), 3);
    assert!(btc.windows(2).all(|w| w[0].1 < w[1].1));
    // Only the first snapshot per symbol clears the cooldown
    assert_eq!(seen.iter().filter(|(_, _, generated)| *generated).count(), 2);
}
