//! Market data feed
//!
//! Pulls tickers from a `MarketDataSource` (or accepts venue stream ticks),
//! folds them through the indicator and sentiment synthesizers, and fans the
//! resulting immutable snapshots out on the topic bus.
//!
//! Polling is driven by the owner's scheduler: `start` registers one repeating
//! `poll:<SYMBOL>` task per symbol, the owner calls `poll` when a task fires.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use chrono::Duration;
use log::{debug, info, warn};
use meridian_clock::Scheduler;
use meridian_core::{MarketSnapshot, Price, Symbol, Timestamp};
use meridian_ports::MarketDataSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::connection::ReconnectPolicy;
use crate::error::{FeedError, Result};
use crate::indicators::{IndicatorConfig, IndicatorSynthesizer, Observation};
use crate::sentiment;
use crate::transport::{Callback, Subjects, Subscription, TopicBus};
use crate::venues::{VenueId, VenueTick};

const POLL_PREFIX: &str = "poll:";

/// Feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<Symbol>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,
    /// Spread (percent of price) assumed when the source has no bid/ask
    #[serde(default = "default_synthetic_spread")]
    pub synthetic_spread_pct: Decimal,
    /// Amplitude of the random term added to synthesized sentiment scores
    #[serde(default)]
    pub sentiment_jitter: Decimal,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
    /// Venues to stream from in addition to polling
    #[serde(default)]
    pub venues: Vec<VenueId>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            poll_interval_ms: default_poll_interval(),
            fetch_timeout_ms: default_fetch_timeout(),
            synthetic_spread_pct: default_synthetic_spread(),
            sentiment_jitter: Decimal::ZERO,
            seed: default_seed(),
            indicators: IndicatorConfig::default(),
            reconnect: ReconnectPolicy::default(),
            venues: Vec::new(),
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::milliseconds(self.poll_interval_ms as i64)
    }

    pub fn fetch_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.fetch_timeout_ms)
    }
}

fn default_symbols() -> Vec<Symbol> {
    vec!["BTC".to_string(), "ETH".to_string()]
}

fn default_poll_interval() -> u64 {
    10_000
}

fn default_fetch_timeout() -> u64 {
    5_000
}

fn default_synthetic_spread() -> Decimal {
    dec!(0.05)
}

fn default_seed() -> u64 {
    42
}

/// Cloneable switch that stops a feed from outside its owner
///
/// Results of fetches that complete after the switch is flipped are discarded.
#[derive(Debug, Clone)]
pub struct FeedStopHandle {
    running: Arc<AtomicBool>,
}

impl FeedStopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Name of the scheduler task polling `symbol`
pub fn poll_task_name(symbol: &str) -> String {
    format!("{}{}", POLL_PREFIX, symbol)
}

/// Symbol polled by a scheduler task, if the task is a poll task
pub fn poll_task_symbol(task: &str) -> Option<&str> {
    task.strip_prefix(POLL_PREFIX)
}

pub struct MarketDataFeed {
    config: FeedConfig,
    source: Arc<dyn MarketDataSource>,
    synthesizer: IndicatorSynthesizer,
    bus: TopicBus<MarketSnapshot>,
    /// Observed (high, low) per symbol since the last rollover
    ranges: HashMap<Symbol, (Price, Price)>,
    running: Arc<AtomicBool>,
    rng: StdRng,
    errors: u64,
}

impl MarketDataFeed {
    pub fn new(config: FeedConfig, source: Arc<dyn MarketDataSource>) -> Self {
        let synthesizer = IndicatorSynthesizer::new(config.indicators.clone());
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            source,
            synthesizer,
            bus: TopicBus::new(),
            ranges: HashMap::new(),
            running: Arc::new(AtomicBool::new(false)),
            rng,
            errors: 0,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.config.symbols
    }

    /// Register a listener for `symbol`; the cached snapshot, if any, is replayed
    pub fn subscribe(&mut self, symbol: &str, callback: Callback<MarketSnapshot>) -> Subscription {
        self.bus.subscribe(&Subjects::market_data(symbol), callback)
    }

    pub fn unsubscribe(&mut self, subscription: &Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    /// Register one repeating poll task per symbol, first due at `now`
    pub fn start(&mut self, scheduler: &mut Scheduler, now: Timestamp) {
        self.running.store(true, Ordering::SeqCst);
        for symbol in &self.config.symbols {
            scheduler.schedule_repeating(poll_task_name(symbol), self.config.poll_interval(), now);
        }
        info!(
            "[FEED] Started polling {} symbol(s) every {}ms from {}",
            self.config.symbols.len(),
            self.config.poll_interval_ms,
            self.source.name()
        );
    }

    /// Cancel poll tasks and set the stop flag
    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        self.running.store(false, Ordering::SeqCst);
        for symbol in &self.config.symbols {
            scheduler.cancel(&poll_task_name(symbol));
        }
        info!("[FEED] Stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> FeedStopHandle {
        FeedStopHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Fetch, synthesize and publish one snapshot for `symbol`
    ///
    /// Errors are counted and returned; they never affect other symbols.
    pub async fn poll(&mut self, symbol: &str, now: Timestamp) -> Result<MarketSnapshot> {
        if !self.is_running() {
            return Err(FeedError::Stopped);
        }

        let timeout = self.config.fetch_timeout();
        let fetched = tokio::time::timeout(timeout, self.source.fetch_ticker(symbol)).await;
        let quote = match fetched {
            Ok(Ok(quote)) => quote,
            Ok(Err(e)) => return Err(self.record_error(symbol, e.into())),
            Err(_) => return Err(self.record_error(symbol, FeedError::Timeout(timeout))),
        };

        if !self.is_running() {
            debug!("[FEED] Discarding {} quote fetched after stop", symbol);
            return Err(FeedError::Stopped);
        }

        let source = self.source.name().to_string();
        Ok(self.build_snapshot(
            symbol,
            Observation {
                price: quote.price,
                volume_24h: quote.volume_24h,
                change_24h: quote.change_24h_pct,
            },
            None,
            &source,
            now,
        ))
    }

    /// Fold a venue stream tick into a snapshot
    pub fn ingest_tick(&mut self, tick: &VenueTick, now: Timestamp) -> Result<MarketSnapshot> {
        if !self.is_running() {
            return Err(FeedError::Stopped);
        }
        let quote = match (tick.bid, tick.ask) {
            (Some(bid), Some(ask)) if bid <= ask => Some((bid, ask)),
            _ => None,
        };
        Ok(self.build_snapshot(
            &tick.symbol,
            Observation {
                price: tick.price,
                volume_24h: tick.volume_24h,
                change_24h: tick.change_24h_pct,
            },
            quote,
            tick.venue.as_str(),
            tick.timestamp.unwrap_or(now),
        ))
    }

    fn record_error(&mut self, symbol: &str, error: FeedError) -> FeedError {
        self.errors += 1;
        warn!("[FEED] Fetch failed for {}: {}", symbol, error);
        error
    }

    fn build_snapshot(
        &mut self,
        symbol: &str,
        obs: Observation,
        quote: Option<(Price, Price)>,
        source: &str,
        timestamp: Timestamp,
    ) -> MarketSnapshot {
        let indicators = self.synthesizer.observe(symbol, obs);

        let jitter = if self.config.sentiment_jitter.is_zero() {
            Decimal::ZERO
        } else {
            Decimal::new(self.rng.gen_range(-1000..=1000), 3) * self.config.sentiment_jitter
        };
        let sentiment = sentiment::synthesize(indicators.momentum, indicators.rsi, jitter);

        let (high, low) = self
            .ranges
            .entry(symbol.to_string())
            .and_modify(|(high, low)| {
                *high = (*high).max(obs.price);
                *low = (*low).min(obs.price);
            })
            .or_insert((obs.price, obs.price));
        let (high, low) = (*high, *low);

        let (bid, ask) = quote.unwrap_or_else(|| {
            let half = obs.price * self.config.synthetic_spread_pct / dec!(200);
            (obs.price - half, obs.price + half)
        });

        let snapshot = MarketSnapshot {
            symbol: symbol.to_string(),
            price: obs.price,
            change_24h: obs.change_24h,
            high_24h: high,
            low_24h: low,
            volume_24h: obs.volume_24h,
            bid,
            ask,
            spread: ask - bid,
            indicators,
            sentiment,
            source: source.to_string(),
            timestamp,
        };

        let delivery = self
            .bus
            .publish(&Subjects::market_data(symbol), snapshot.clone());
        if delivery.failed > 0 {
            warn!(
                "[FEED] {} of {} subscriber(s) failed on {}",
                delivery.failed,
                delivery.failed + delivery.delivered,
                symbol
            );
        }
        debug!("[FEED] {} @ {} (rsi {})", symbol, snapshot.price, snapshot.indicators.rsi.round_dp(2));
        snapshot
    }

    /// Latest snapshot for `symbol`
    pub fn latest(&self, symbol: &str) -> Option<&MarketSnapshot> {
        self.bus.last(&Subjects::market_data(symbol))
    }

    /// Latest snapshot of every configured symbol that has one
    pub fn snapshots(&self) -> Vec<MarketSnapshot> {
        self.config
            .symbols
            .iter()
            .filter_map(|s| self.latest(s).cloned())
            .collect()
    }

    /// Fetch/parse/timeout errors since creation
    pub fn error_count(&self) -> u64 {
        self.errors
    }

    /// Reset the observed daily ranges
    pub fn roll_day(&mut self) {
        self.ranges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SimulatedSource;
    use async_trait::async_trait;
    use chrono::Utc;
    use meridian_ports::{PortResult, TickerQuote};
    use std::sync::Mutex;

    fn feed_with(source: Arc<dyn MarketDataSource>) -> MarketDataFeed {
        let config = FeedConfig {
            symbols: vec!["BTC".into(), "ETH".into()],
            fetch_timeout_ms: 50,
            ..Default::default()
        };
        MarketDataFeed::new(config, source)
    }

    fn started(source: Arc<dyn MarketDataSource>) -> (MarketDataFeed, Scheduler) {
        let mut feed = feed_with(source);
        let mut scheduler = Scheduler::new();
        feed.start(&mut scheduler, Utc::now());
        (feed, scheduler)
    }

    #[test]
    fn test_start_and_stop_manage_poll_tasks() {
        let (mut feed, mut scheduler) = started(Arc::new(SimulatedSource::default()));
        assert!(feed.is_running());
        assert_eq!(scheduler.task_names(), vec!["poll:BTC", "poll:ETH"]);
        assert_eq!(poll_task_symbol("poll:ETH"), Some("ETH"));

        feed.stop(&mut scheduler);
        assert!(!feed.is_running());
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_poll_builds_and_caches_snapshot() {
        let source = Arc::new(SimulatedSource::default());
        source.script("BTC", [dec!(45900)]);
        let (mut feed, _scheduler) = started(source);

        let now = Utc::now();
        let snap = feed.poll("BTC", now).await.unwrap();
        assert_eq!(snap.price, dec!(45900));
        assert_eq!(snap.change_24h, dec!(2));
        assert_eq!(snap.source, "simulated");
        assert_eq!(snap.timestamp, now);
        // 0.05% synthetic spread
        assert_eq!(snap.spread, dec!(22.95));
        assert_eq!(feed.latest("BTC"), Some(&snap));
        assert!(feed.latest("ETH").is_none());
    }

    #[tokio::test]
    async fn test_subscribe_replays_cached_snapshot() {
        let (mut feed, _scheduler) = started(Arc::new(SimulatedSource::default()));
        feed.poll("ETH", Utc::now()).await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = feed.subscribe(
            "ETH",
            Box::new(move |s: &MarketSnapshot| sink.lock().unwrap().push(s.price)),
        );
        assert_eq!(seen.lock().unwrap().len(), 1);

        feed.poll("ETH", Utc::now()).await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);

        assert!(feed.unsubscribe(&sub));
        feed.poll("ETH", Utc::now()).await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_symbol() {
        let source = Arc::new(SimulatedSource::default());
        source.set_failing("BTC", true);
        let (mut feed, _scheduler) = started(source);

        assert!(matches!(
            feed.poll("BTC", Utc::now()).await,
            Err(FeedError::Transport(_))
        ));
        assert!(feed.poll("ETH", Utc::now()).await.is_ok());
        assert_eq!(feed.error_count(), 1);
        assert!(feed.is_running());
    }

    struct SlowSource;

    #[async_trait]
    impl MarketDataSource for SlowSource {
        async fn fetch_ticker(&self, _symbol: &str) -> PortResult<TickerQuote> {
            tokio::time::sleep(StdDuration::from_secs(60)).await;
            unreachable!("the feed times out first")
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout() {
        let (mut feed, _scheduler) = started(Arc::new(SlowSource));
        let err = feed.poll("BTC", Utc::now()).await.unwrap_err();
        assert_eq!(err, FeedError::Timeout(StdDuration::from_millis(50)));
        assert_eq!(feed.error_count(), 1);
    }

    /// Flips the feed's stop switch while a fetch is in flight
    struct StoppingSource {
        inner: SimulatedSource,
        handle: Mutex<Option<FeedStopHandle>>,
    }

    #[async_trait]
    impl MarketDataSource for StoppingSource {
        async fn fetch_ticker(&self, symbol: &str) -> PortResult<TickerQuote> {
            if let Some(handle) = self.handle.lock().unwrap().as_ref() {
                handle.stop();
            }
            self.inner.fetch_ticker(symbol).await
        }

        fn name(&self) -> &str {
            "stopping"
        }
    }

    #[tokio::test]
    async fn test_result_discarded_after_stop() {
        let source = Arc::new(StoppingSource {
            inner: SimulatedSource::default(),
            handle: Mutex::new(None),
        });
        let (mut feed, _scheduler) = started(source.clone());
        *source.handle.lock().unwrap() = Some(feed.stop_handle());

        assert_eq!(feed.poll("BTC", Utc::now()).await, Err(FeedError::Stopped));
        assert!(feed.latest("BTC").is_none());
        assert_eq!(feed.poll("BTC", Utc::now()).await, Err(FeedError::Stopped));
    }

    #[tokio::test]
    async fn test_ingest_venue_tick() {
        let (mut feed, _scheduler) = started(Arc::new(SimulatedSource::default()));
        let tick = VenueTick {
            venue: VenueId::Kraken,
            symbol: "BTC".into(),
            price: dec!(44000),
            bid: Some(dec!(43999)),
            ask: Some(dec!(44001)),
            volume_24h: dec!(2500),
            change_24h_pct: dec!(-1.5),
            timestamp: None,
        };
        let now = Utc::now();
        let snap = feed.ingest_tick(&tick, now).unwrap();
        assert_eq!(snap.source, "kraken");
        assert_eq!(snap.spread, dec!(2));
        assert_eq!(snap.timestamp, now);
        assert_eq!(snap.high_24h, dec!(44000));
    }
}
