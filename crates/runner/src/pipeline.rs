//! Trading pipeline - single owner of every component
//!
//! ```text
//!  poll:<SYM> ──► MarketDataFeed ──┐
//!  venue streams ──► ingest_tick ──┴──► SymbolQueue ──► process_snapshot
//!                                                         │
//!            PortfolioLedger.update_price ◄───────────────┤  SL/TP closes ──► POSITION alerts
//!            SignalGenerator.evaluate ◄───────────────────┤
//!            VisionCorroborator (optional) ◄──────────────┤
//!            RiskGate.evaluate ◄──────────────────────────┤
//!            PortfolioLedger.execute_signal ◄─────────────┘  (auto_execute)
//!
//!  risk:monitor ──────► PortfolioRiskMonitor ──► AlertBus
//!  metrics:recompute ─► MetricsAggregator ──► PerformanceMonitor ──► AlertBus
//! ```
//!
//! Everything is mutated through `&mut self` from one task. `tick` fires due
//! scheduler tasks against the injected clock, then drains the per-symbol
//! queues one item at a time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use meridian_clock::Scheduler;
use meridian_core::{
    Alert, AlertId, AlertKey, AlertSeverity, CloseReason, InvalidTransition, MarketSnapshot,
    PerformanceMetrics, PipelineMetrics, Portfolio, PortfolioRisk, Position, PositionId, Signal,
    SignalId, SignalStatus, Symbol, Timestamp, Trade,
};
use meridian_gateway::{
    ConnectionState, FeedError, HttpTickerSource, MarketDataFeed, SimulatedSource, StreamEvent,
    StreamSettings, VenueId, WsVenueStream, poll_task_symbol,
};
use meridian_monitor::{AlertBus, AlertTransition, MetricsAggregator, PerformanceMonitor};
use meridian_order_manager::{LedgerError, PortfolioLedger};
use meridian_ports::{ChartCapture, ChartVisionAnalyzer, Clock, MarketDataSource};
use meridian_risk_manager::{PortfolioRiskMonitor, RiskAssessment, RiskGate, RiskParameters};
use meridian_strategy::{Decision, SignalBook, SignalError, SignalGenerator, SymbolQueue, VisionCorroborator};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{broadcast, mpsc, watch};

use crate::config::{PipelineConfig, SourceConfig};
use crate::error::{PipelineError, Result};
use crate::events::{PipelineEvent, PipelineEventKind};

const RISK_TASK: &str = "risk:monitor";
const METRICS_TASK: &str = "metrics:recompute";
const STREAM_CHANNEL_CAPACITY: usize = 1024;

/// Connection state of one streaming venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VenueStatus {
    pub venue: VenueId,
    pub state: ConnectionState,
    pub attempts: u32,
}

impl VenueStatus {
    fn new(venue: VenueId) -> Self {
        Self {
            venue,
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }
}

fn venue_alert_key(venue: VenueId) -> AlertKey {
    AlertKey::system(format!("feed:{}", venue.as_str()))
}

pub struct TradingPipeline {
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler,
    feed: MarketDataFeed,
    queue: SymbolQueue<MarketSnapshot>,
    generator: SignalGenerator,
    vision: Option<VisionCorroborator>,
    book: SignalBook,
    /// Latest gate verdict per signal still in the book
    assessments: HashMap<SignalId, RiskAssessment>,
    /// Last processed snapshot per symbol, used to re-check manual fills
    latest: HashMap<Symbol, MarketSnapshot>,
    gate: RiskGate,
    risk_monitor: PortfolioRiskMonitor,
    ledger: PortfolioLedger,
    alerts: AlertBus,
    metrics: MetricsAggregator,
    performance: PerformanceMonitor,
    venues: BTreeMap<VenueId, VenueStatus>,
    streams: HashMap<VenueId, WsVenueStream>,
    stream_tx: mpsc::Sender<StreamEvent>,
    stream_rx: mpsc::Receiver<StreamEvent>,
    events: broadcast::Sender<PipelineEvent>,
    running: bool,
}

impl TradingPipeline {
    /// Build a pipeline polling `source`
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn MarketDataSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let now = clock.now();

        let generator = SignalGenerator::new(config.signals.clone())?;
        let gate = RiskGate::new(config.risk.clone())?;
        let feed = MarketDataFeed::new(config.feed.clone(), source);
        let venues = config
            .feed
            .venues
            .iter()
            .map(|&venue| (venue, VenueStatus::new(venue)))
            .collect();
        let (stream_tx, stream_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(config.event_capacity);

        Ok(Self {
            scheduler: Scheduler::new(),
            feed,
            queue: SymbolQueue::new(),
            generator,
            vision: None,
            book: SignalBook::new(config.signals.history_limit),
            assessments: HashMap::new(),
            latest: HashMap::new(),
            gate,
            risk_monitor: PortfolioRiskMonitor::new(),
            ledger: PortfolioLedger::new(config.ledger.clone(), now),
            alerts: AlertBus::new(config.alert_history_limit),
            metrics: MetricsAggregator::new(now),
            performance: PerformanceMonitor::new(config.performance.clone()),
            venues,
            streams: HashMap::new(),
            stream_tx,
            stream_rx,
            events,
            running: false,
            clock,
            config,
        })
    }

    /// Build a pipeline with the source named in the configuration
    pub fn from_config(config: PipelineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let source: Arc<dyn MarketDataSource> = match &config.source {
            SourceConfig::Simulated(sim) => Arc::new(SimulatedSource::new(sim.clone())),
            SourceConfig::Http(http) => {
                Arc::new(HttpTickerSource::new(http.clone()).map_err(FeedError::from)?)
            }
        };
        Self::new(config, source, clock)
    }

    /// Builder: Corroborate new signals with chart-vision analysis
    pub fn with_vision(
        mut self,
        capture: Arc<dyn ChartCapture>,
        analyzer: Arc<dyn ChartVisionAnalyzer>,
    ) -> Self {
        let corroborator =
            VisionCorroborator::new(capture, analyzer).with_timeout(self.config.vision_timeout());
        self.vision = Some(corroborator);
        self
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Schedule polling and monitoring, and connect configured venue streams
    ///
    /// Must be called inside a tokio runtime when venues are configured.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        let now = self.clock.now();
        self.running = true;

        self.feed.start(&mut self.scheduler, now);
        let risk_interval = self.config.risk_check_interval();
        let metrics_interval = self.config.metrics_interval();
        self.scheduler
            .schedule_repeating(RISK_TASK, risk_interval, now + risk_interval);
        self.scheduler
            .schedule_repeating(METRICS_TASK, metrics_interval, now + metrics_interval);

        let venues: Vec<VenueId> = self.venues.keys().copied().collect();
        for venue in venues {
            self.spawn_stream(venue);
        }

        info!(
            "[PIPELINE] Started: {} symbol(s), {} venue stream(s), auto-execute {}",
            self.config.feed.symbols.len(),
            self.streams.len(),
            self.config.auto_execute
        );
        self.emit(PipelineEvent::new(
            PipelineEventKind::StatusUpdate,
            now,
            json!({ "status": "started", "symbols": self.config.feed.symbols }),
        ));
    }

    /// Cancel all scheduled work, drop queued snapshots and disconnect venues
    pub async fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.feed.stop(&mut self.scheduler);
        self.scheduler.clear();
        self.queue.clear();

        for (_, stream) in self.streams.drain() {
            stream.shutdown().await;
        }
        while self.stream_rx.try_recv().is_ok() {}
        for status in self.venues.values_mut() {
            if status.state != ConnectionState::Failed {
                status.state = ConnectionState::Disconnected;
            }
        }

        let now = self.clock.now();
        info!("[PIPELINE] Stopped");
        self.emit(PipelineEvent::new(
            PipelineEventKind::StatusUpdate,
            now,
            json!({ "status": "stopped" }),
        ));
    }

    /// Re-check an approved (`Active`) signal against the current portfolio and fill it
    ///
    /// The gate runs again at the latest marked price for the symbol, so open
    /// position, daily loss and sizing limits hold for fills made after other
    /// signals executed. A signal that no longer passes is cancelled and
    /// `Rejected` is returned.
    pub fn execute_signal(&mut self, id: &SignalId) -> Result<Position> {
        let now = self.clock.now();
        let mut signal = self
            .book
            .get(id)
            .cloned()
            .ok_or(SignalError::NotFound(*id))?;
        if !signal.status.can_transition_to(SignalStatus::Executed) {
            return Err(SignalError::from(InvalidTransition {
                id: *id,
                from: signal.status,
                to: SignalStatus::Executed,
            })
            .into());
        }

        let snapshot = match self.latest.get(&signal.symbol) {
            Some(snapshot) => snapshot.clone(),
            None => MarketSnapshot::at_price(signal.symbol.clone(), signal.entry_price, "signal", now),
        };
        signal.entry_price = snapshot.price;

        let assessment = self
            .gate
            .evaluate(&signal, &snapshot, &self.ledger.portfolio());
        if !assessment.approved {
            let reasons = assessment.reason_summary();
            self.assessments.insert(*id, assessment);
            self.metrics.record_signal_rejected();
            let cancelled = self.book.transition(id, SignalStatus::Cancelled)?;
            self.emit(PipelineEvent::new(
                PipelineEventKind::StatusUpdate,
                now,
                json!({ "signal_id": id, "status": cancelled.status, "reasons": reasons }),
            ));
            return Err(PipelineError::Rejected { id: *id, reasons });
        }

        self.assessments.insert(*id, assessment.clone());
        self.fill(&signal, &assessment, now)
    }

    /// Cancel a pending or approved signal
    pub fn cancel_signal(&mut self, id: &SignalId) -> Result<Signal> {
        let signal = self.book.transition(id, SignalStatus::Cancelled)?;
        info!("[PIPELINE] Cancelled signal {} ({})", id, signal.symbol);
        self.emit(PipelineEvent::new(
            PipelineEventKind::StatusUpdate,
            self.clock.now(),
            json!({ "signal_id": id, "status": signal.status }),
        ));
        Ok(signal)
    }

    pub fn acknowledge_alert(&mut self, id: &AlertId) -> Result<Alert> {
        let now = self.clock.now();
        Ok(self.alerts.acknowledge(id, now)?)
    }

    /// Validate and swap the risk parameters used by the gate and the monitor
    pub fn update_risk_parameters(&mut self, params: RiskParameters) -> Result<()> {
        self.gate.update_parameters(params.clone())?;
        self.config.risk = params;
        self.emit(PipelineEvent::with(
            PipelineEventKind::StatusUpdate,
            self.clock.now(),
            &self.config.risk,
        ));
        Ok(())
    }

    /// Close one open position at its last marked price
    pub fn close_position(&mut self, id: &PositionId) -> Result<Position> {
        let now = self.clock.now();
        let price = self
            .ledger
            .position(id)
            .map(|p| p.current_price)
            .ok_or(LedgerError::PositionNotFound(*id))?;
        let position = self
            .ledger
            .close_position(id, price, CloseReason::Manual, now)?;
        self.on_position_closed(&position, now);
        Ok(position)
    }

    /// Close every open position at its last marked price
    pub fn close_all(&mut self, reason: CloseReason) -> Vec<Position> {
        let now = self.clock.now();
        let closed = self.ledger.close_all(reason, now);
        for position in &closed {
            self.on_position_closed(position, now);
        }
        closed
    }

    /// Take a venue out of `FAILED` and reconnect it with a fresh attempt budget
    pub async fn restart_venue(&mut self, venue: VenueId) -> Result<()> {
        let status = self
            .venues
            .get_mut(&venue)
            .ok_or(PipelineError::UnknownVenue(venue))?;
        let failed = status.state == ConnectionState::Failed;
        *status = VenueStatus::new(venue);
        self.alerts.resolve(&venue_alert_key(venue), self.clock.now());
        info!("[PIPELINE] Restarting {} stream", venue);

        // A failed stream restarts its own tracker; anything else is respawned
        let restarted = failed
            && self
                .streams
                .get(&venue)
                .is_some_and(|stream| stream.restart());
        if restarted {
            return Ok(());
        }
        if let Some(stream) = self.streams.remove(&venue) {
            stream.shutdown().await;
        }
        if self.running {
            self.spawn_stream(venue);
        }
        Ok(())
    }

    /// Start a new trading day: daily PnL, metric counters and 24h ranges reset
    pub fn roll_day(&mut self) {
        let now = self.clock.now();
        self.ledger.roll_day(now);
        self.metrics.roll_day(now);
        self.feed.roll_day();
        self.emit(PipelineEvent::new(
            PipelineEventKind::StatusUpdate,
            now,
            json!({ "status": "day_rolled" }),
        ));
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Run until `shutdown` flips to true (or its sender is dropped)
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        self.start();
        let mut interval = tokio::time::interval(self.config.tick_interval());
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.stop().await;
    }

    /// Fire every task due at the clock's current time, then drain the queues
    ///
    /// Returns the number of snapshots processed.
    pub async fn tick(&mut self) -> usize {
        let now = self.clock.now();
        while let Ok(event) = self.stream_rx.try_recv() {
            self.handle_stream_event(event);
        }

        for task in self.scheduler.due(now) {
            if let Some(symbol) = poll_task_symbol(&task) {
                let symbol = symbol.to_string();
                self.poll_symbol(&symbol, now).await;
            } else if task == RISK_TASK {
                self.check_portfolio_risk();
            } else if task == METRICS_TASK {
                self.recompute_metrics();
            } else {
                debug!("[PIPELINE] Ignoring unknown task '{}'", task);
            }
        }

        self.drain_queues().await
    }

    /// Queue a snapshot from an external producer
    pub fn submit_snapshot(&mut self, snapshot: MarketSnapshot) {
        self.queue.push(snapshot.symbol.clone(), snapshot);
    }

    /// Apply a venue stream event
    pub fn handle_stream_event(&mut self, event: StreamEvent) {
        let now = self.clock.now();
        match event {
            StreamEvent::Tick(tick) => match self.feed.ingest_tick(&tick, now) {
                Ok(snapshot) => self.submit_snapshot(snapshot),
                Err(FeedError::Stopped) => {}
                Err(e) => self.report_error(&format!("ingest {} tick", tick.venue), &e, now),
            },
            StreamEvent::StateChanged {
                venue,
                state,
                attempts,
            } => {
                let status = self
                    .venues
                    .entry(venue)
                    .or_insert_with(|| VenueStatus::new(venue));
                status.state = state;
                status.attempts = attempts;
                debug!("[PIPELINE] {} is {} (attempt {})", venue, state, attempts);
                if state == ConnectionState::Connected {
                    self.alerts.resolve(&venue_alert_key(venue), now);
                }
            }
            StreamEvent::Exhausted { venue, attempts } => {
                let status = self
                    .venues
                    .entry(venue)
                    .or_insert_with(|| VenueStatus::new(venue));
                status.state = ConnectionState::Failed;
                status.attempts = attempts;

                let message = format!(
                    "{} feed failed after {} reconnect attempts",
                    venue, attempts
                );
                error!("[PIPELINE] {}", message);
                self.alerts
                    .notify(venue_alert_key(venue), AlertSeverity::Critical, &message, now);
                self.metrics.record_error();
                self.emit(PipelineEvent::new(
                    PipelineEventKind::Error,
                    now,
                    json!({ "venue": venue, "state": ConnectionState::Failed, "error": message }),
                ));
            }
        }
    }

    /// Mark positions, evaluate a signal and run it through the gate
    ///
    /// Returns the generated signal in its final state, if one was generated.
    pub async fn process_snapshot(&mut self, snapshot: MarketSnapshot) -> Result<Option<Signal>> {
        let started = Instant::now();
        let now = self.clock.now();
        self.latest.insert(snapshot.symbol.clone(), snapshot.clone());

        for position in self.ledger.update_price(&snapshot.symbol, snapshot.price, now) {
            self.on_position_closed(&position, now);
        }

        let outcome = match self.generator.evaluate(&snapshot, now) {
            Decision::Generated { signal, .. } => {
                self.handle_signal(signal, &snapshot, now).await.map(Some)
            }
            Decision::Skipped { reason } => {
                debug!("[PIPELINE] {}: {}", snapshot.symbol, reason);
                Ok(None)
            }
        };

        self.metrics.record_snapshot(started.elapsed());
        outcome
    }

    /// Recompute portfolio risk, feed risk alerts and apply any auto-close
    pub fn check_portfolio_risk(&mut self) -> PortfolioRisk {
        let now = self.clock.now();
        let portfolio = self.ledger.portfolio();
        let check = self.risk_monitor.check(
            &portfolio,
            self.gate.parameters(),
            &mut self.alerts,
            now,
        );
        for transition in &check.transitions {
            self.emit_transition(transition, now);
        }

        if let Some(id) = check.auto_close {
            let price = self.ledger.position(&id).map(|p| p.current_price);
            if let Some(price) = price {
                match self
                    .ledger
                    .close_position(&id, price, CloseReason::RiskLimit, now)
                {
                    Ok(position) => self.on_position_closed(&position, now),
                    Err(e) => self.report_error("risk auto-close", &e, now),
                }
            }
        }

        self.emit(PipelineEvent::with(
            PipelineEventKind::StatusUpdate,
            now,
            &check.risk,
        ));
        check.risk
    }

    /// Recompute derived metrics and feed performance alerts
    pub fn recompute_metrics(&mut self) -> PipelineMetrics {
        let now = self.clock.now();
        let metrics = self.metrics.recompute(now).clone();
        let transitions =
            self.performance
                .check(&mut self.alerts, &metrics, self.ledger.performance(), now);
        for transition in &transitions {
            self.emit_transition(transition, now);
        }
        self.emit(PipelineEvent::with(
            PipelineEventKind::StatusUpdate,
            now,
            &metrics,
        ));
        metrics
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn snapshot(&self, symbol: &str) -> Option<&MarketSnapshot> {
        self.feed.latest(symbol)
    }

    pub fn snapshots(&self) -> Vec<MarketSnapshot> {
        self.feed.snapshots()
    }

    /// All retained signals, newest first
    pub fn signals(&self) -> Vec<Signal> {
        self.book.newest_first()
    }

    pub fn signal(&self, id: &SignalId) -> Option<&Signal> {
        self.book.get(id)
    }

    pub fn assessment(&self, id: &SignalId) -> Option<&RiskAssessment> {
        self.assessments.get(id)
    }

    pub fn portfolio(&self) -> Portfolio {
        self.ledger.portfolio()
    }

    pub fn open_positions(&self) -> &[Position] {
        self.ledger.open_positions()
    }

    pub fn closed_positions(&self) -> Vec<Position> {
        self.ledger.closed_positions()
    }

    pub fn trades(&self) -> &[Trade] {
        self.ledger.trades()
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts.active_alerts()
    }

    pub fn alert_history(&self) -> Vec<Alert> {
        self.alerts.history()
    }

    /// Metrics as of the last recompute
    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.metrics()
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        self.ledger.performance()
    }

    pub fn portfolio_risk(&self) -> &PortfolioRisk {
        self.risk_monitor.latest()
    }

    pub fn venue_states(&self) -> Vec<VenueStatus> {
        self.venues.values().copied().collect()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn poll_symbol(&mut self, symbol: &str, now: Timestamp) {
        match self.feed.poll(symbol, now).await {
            Ok(snapshot) => self.submit_snapshot(snapshot),
            Err(FeedError::Stopped) => {}
            Err(e) => self.report_error(&format!("poll {}", symbol), &e, now),
        }
    }

    async fn drain_queues(&mut self) -> usize {
        let delay = self.config.item_delay();
        let mut processed = 0;

        loop {
            let ready = self.queue.ready_symbols();
            if ready.is_empty() {
                break;
            }
            for symbol in ready {
                let Some(snapshot) = self.queue.begin(&symbol) else {
                    continue;
                };
                if processed > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if let Err(e) = self.process_snapshot(snapshot).await {
                    let now = self.clock.now();
                    self.report_error(&format!("process {}", symbol), &e, now);
                }
                self.queue.finish(&symbol);
                processed += 1;
            }
        }
        processed
    }

    async fn handle_signal(
        &mut self,
        mut signal: Signal,
        snapshot: &MarketSnapshot,
        now: Timestamp,
    ) -> Result<Signal> {
        self.metrics.record_signal_generated();
        if let Some(vision) = &self.vision {
            vision.corroborate(&mut signal).await;
        }

        let id = signal.id;
        self.book.insert(signal.clone());
        self.emit(PipelineEvent::with(
            PipelineEventKind::SignalGenerated,
            now,
            &signal,
        ));

        let assessment = self
            .gate
            .evaluate(&signal, snapshot, &self.ledger.portfolio());
        let approved = assessment.approved;
        let reasons = assessment.reasons.clone();
        self.assessments.insert(id, assessment.clone());
        self.prune_assessments();

        if !approved {
            self.metrics.record_signal_rejected();
            let signal = self.book.transition(&id, SignalStatus::Cancelled)?;
            self.emit(PipelineEvent::new(
                PipelineEventKind::StatusUpdate,
                now,
                json!({ "signal_id": id, "status": signal.status, "reasons": reasons }),
            ));
            return Ok(signal);
        }

        let signal = self.book.transition(&id, SignalStatus::Active)?;
        if !self.config.auto_execute {
            return Ok(signal);
        }

        if let Err(e) = self.fill(&signal, &assessment, now) {
            self.report_error(&format!("execute {} {}", signal.symbol, id), &e, now);
            self.metrics.record_signal_rejected();
            return Ok(self.book.transition(&id, SignalStatus::Cancelled)?);
        }
        Ok(self
            .book
            .get(&id)
            .cloned()
            .ok_or(SignalError::NotFound(id))?)
    }

    /// Open the position for an approved assessment and mark the signal executed
    fn fill(
        &mut self,
        signal: &Signal,
        assessment: &RiskAssessment,
        now: Timestamp,
    ) -> Result<Position> {
        let position = self.ledger.execute_signal(
            signal,
            assessment.quantity,
            assessment.stop_loss,
            assessment.take_profit,
            now,
        )?;
        self.book.transition(&signal.id, SignalStatus::Executed)?;
        self.metrics.record_signal_executed();

        info!(
            "[PIPELINE] Executed {} {} -> position {}",
            signal.direction, signal.symbol, position.id
        );
        self.emit(PipelineEvent::with(
            PipelineEventKind::SignalExecuted,
            now,
            &position,
        ));
        Ok(position)
    }

    fn on_position_closed(&mut self, position: &Position, now: Timestamp) {
        self.metrics.record_position_closed();

        let reason = position.close_reason.unwrap_or(CloseReason::Manual);
        let severity = match reason {
            CloseReason::StopLoss | CloseReason::RiskLimit => AlertSeverity::Warning,
            CloseReason::TakeProfit | CloseReason::Manual => AlertSeverity::Info,
        };
        let message = format!(
            "{} {:?} closed at {}: {} (realized {})",
            position.symbol,
            position.side,
            position.exit_price.unwrap_or(position.current_price),
            reason,
            position.realized_pnl.round_dp(2)
        );
        self.alerts.notify(
            AlertKey::position(format!("close:{}", position.id)),
            severity,
            message,
            now,
        );
        self.emit(PipelineEvent::with(
            PipelineEventKind::StatusUpdate,
            now,
            position,
        ));
    }

    fn spawn_stream(&mut self, venue: VenueId) {
        let settings = StreamSettings::new(
            venue,
            self.config.feed.symbols.clone(),
            self.config.feed.reconnect.clone(),
        );
        let stream = WsVenueStream::spawn(settings, self.stream_tx.clone());
        self.streams.insert(venue, stream);
    }

    fn prune_assessments(&mut self) {
        if self.assessments.len() > self.book.len() {
            let book = &self.book;
            self.assessments.retain(|id, _| book.get(id).is_some());
        }
    }

    fn report_error(&mut self, context: &str, err: &dyn std::fmt::Display, now: Timestamp) {
        warn!("[PIPELINE] {} failed: {}", context, err);
        self.metrics.record_error();
        self.emit(PipelineEvent::new(
            PipelineEventKind::Error,
            now,
            json!({ "context": context, "error": err.to_string() }),
        ));
    }

    fn emit_transition(&self, transition: &AlertTransition, now: Timestamp) {
        match transition {
            AlertTransition::Raised(alert) | AlertTransition::Resolved(alert) => {
                self.emit(PipelineEvent::with(
                    PipelineEventKind::StatusUpdate,
                    now,
                    alert,
                ));
            }
            AlertTransition::Persisting(_) | AlertTransition::Clear => {}
        }
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
