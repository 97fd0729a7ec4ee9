//! Alert Bus
//!
//! Keyed alert lifecycle. A threshold metric observed through [`AlertBus::observe`]
//! owns at most one active alert per `(category, metric_id)`:
//!
//! ```text
//!            value crosses             value stays over
//!   Clear ───────────────► Raised ───────────────────► Persisting
//!     ▲                                                   │
//!     └──────────── Resolved ◄────────────────────────────┘
//!                         value back under threshold
//! ```
//!
//! One-shot events (position closes, venue failures) go through
//! [`AlertBus::notify`] and stay active until acknowledged or resolved. Once the
//! history limit is reached, the oldest unacknowledged events expire.

use std::collections::{HashMap, HashSet, VecDeque};

use meridian_core::{Alert, AlertId, AlertKey, AlertSeverity, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::error::{MonitorError, Result};

/// Alerts retained once resolved
const DEFAULT_HISTORY_LIMIT: usize = 500;

/// Which side of the threshold is bad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdMode {
    /// High is bad: alert when `value > threshold`
    Normal,
    /// Low is bad: alert when `value < threshold` (win rate, ...)
    Reverse,
}

impl ThresholdMode {
    pub fn breached(&self, value: Decimal, threshold: Decimal) -> bool {
        match self {
            ThresholdMode::Normal => value > threshold,
            ThresholdMode::Reverse => value < threshold,
        }
    }

    /// How far past the threshold the value is (1.0 = at threshold)
    pub fn ratio(&self, value: Decimal, threshold: Decimal) -> Option<Decimal> {
        let (num, den) = match self {
            ThresholdMode::Normal => (value, threshold),
            ThresholdMode::Reverse => (threshold, value),
        };
        if den.is_zero() {
            return None;
        }
        Some((num / den).abs())
    }
}

/// Severity from the breach ratio: >=2 critical, >=1.5 error, else warning
pub fn severity_for(value: Decimal, threshold: Decimal, mode: ThresholdMode) -> AlertSeverity {
    match mode.ratio(value, threshold) {
        None => AlertSeverity::Critical,
        Some(r) if r >= dec!(2) => AlertSeverity::Critical,
        Some(r) if r >= dec!(1.5) => AlertSeverity::Error,
        Some(_) => AlertSeverity::Warning,
    }
}

/// Operator hint for well-known metrics
pub fn suggested_action(key: &AlertKey) -> &'static str {
    match key.metric_id.as_str() {
        "exposure" => "Reduce overall position sizes",
        "concentration" => "Rebalance away from the largest position",
        "correlation" => "Diversify across asset classes",
        "drawdown" => "Pause new entries and review open positions",
        "daily_loss" => "Stop trading for the rest of the day",
        "error_rate" => "Check market data sources and connectivity",
        "latency" => "Check pipeline load and source response times",
        "win_rate" => "Review signal thresholds",
        _ => "Review",
    }
}

/// Outcome of one observation
#[derive(Debug, Clone)]
pub enum AlertTransition {
    /// Threshold newly crossed; a new alert is active
    Raised(Alert),
    /// Still over threshold; the existing alert is untouched
    Persisting(AlertId),
    /// Back under threshold; the alert is now resolved
    Resolved(Alert),
    /// Under threshold with nothing active
    Clear,
}

impl AlertTransition {
    pub fn is_change(&self) -> bool {
        matches!(self, AlertTransition::Raised(_) | AlertTransition::Resolved(_))
    }
}

pub struct AlertBus {
    alerts: HashMap<AlertId, Alert>,
    /// Creation order, oldest first
    order: VecDeque<AlertId>,
    active: HashMap<AlertKey, AlertId>,
    events: HashSet<AlertId>,
    history_limit: usize,
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl AlertBus {
    pub fn new(history_limit: usize) -> Self {
        Self {
            alerts: HashMap::new(),
            order: VecDeque::new(),
            active: HashMap::new(),
            events: HashSet::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Feed one reading of a threshold metric
    pub fn observe(
        &mut self,
        key: AlertKey,
        value: Decimal,
        threshold: Decimal,
        mode: ThresholdMode,
        now: Timestamp,
    ) -> AlertTransition {
        let breached = mode.breached(value, threshold);

        match (self.active.get(&key).copied(), breached) {
            (Some(id), true) => AlertTransition::Persisting(id),
            (Some(_), false) => match self.resolve(&key, now) {
                Some(alert) => AlertTransition::Resolved(alert),
                None => AlertTransition::Clear,
            },
            (None, false) => AlertTransition::Clear,
            (None, true) => {
                let severity = severity_for(value, threshold, mode);
                let comparison = match mode {
                    ThresholdMode::Normal => "above",
                    ThresholdMode::Reverse => "below",
                };
                let message = format!(
                    "{} {} {} threshold {}",
                    key.metric_id,
                    value.round_dp(4),
                    comparison,
                    threshold.round_dp(4)
                );
                let action = suggested_action(&key).to_string();
                let alert = self.raise(key, severity, message, value, threshold, action, now);
                AlertTransition::Raised(alert)
            }
        }
    }

    /// Raise a one-shot event alert
    ///
    /// Idempotent per key while the previous event for that key is active.
    pub fn notify(
        &mut self,
        key: AlertKey,
        severity: AlertSeverity,
        message: impl Into<String>,
        now: Timestamp,
    ) -> Alert {
        if let Some(existing) = self.active.get(&key).and_then(|id| self.alerts.get(id)) {
            return existing.clone();
        }
        let action = suggested_action(&key).to_string();
        let alert = self.raise(
            key,
            severity,
            message.into(),
            Decimal::ZERO,
            Decimal::ZERO,
            action,
            now,
        );
        self.events.insert(alert.id);
        alert
    }

    /// Resolve whatever alert is active for `key`
    pub fn resolve(&mut self, key: &AlertKey, now: Timestamp) -> Option<Alert> {
        let id = self.active.remove(key)?;
        let alert = self.alerts.get_mut(&id)?;
        alert.resolved = true;
        alert.resolved_at = Some(now);
        log::info!("[ALERT] Resolved {} ({})", alert.key, alert.message);
        let resolved = alert.clone();
        self.trim();
        Some(resolved)
    }

    /// Mark an alert as seen; event alerts are resolved by acknowledgement
    pub fn acknowledge(&mut self, id: &AlertId, now: Timestamp) -> Result<Alert> {
        let alert = self
            .alerts
            .get_mut(id)
            .ok_or(MonitorError::AlertNotFound(*id))?;
        alert.acknowledged = true;
        let key = alert.key.clone();
        let snapshot = alert.clone();

        if self.events.contains(id) && self.active.get(&key) == Some(id) {
            if let Some(resolved) = self.resolve(&key, now) {
                return Ok(resolved);
            }
        }
        Ok(snapshot)
    }

    pub fn get(&self, id: &AlertId) -> Option<&Alert> {
        self.alerts.get(id)
    }

    pub fn active_for(&self, key: &AlertKey) -> Option<&Alert> {
        self.active.get(key).and_then(|id| self.alerts.get(id))
    }

    /// Active alerts, most severe first then oldest first
    pub fn active_alerts(&self) -> Vec<Alert> {
        let mut active: Vec<Alert> = self
            .order
            .iter()
            .filter_map(|id| self.alerts.get(id))
            .filter(|a| a.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.severity.cmp(&a.severity));
        active
    }

    /// Every retained alert, newest first
    pub fn history(&self) -> Vec<Alert> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.alerts.get(id))
            .cloned()
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[allow(clippy::too_many_arguments)]
    fn raise(
        &mut self,
        key: AlertKey,
        severity: AlertSeverity,
        message: String,
        value: Decimal,
        threshold: Decimal,
        action: String,
        now: Timestamp,
    ) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4(),
            key: key.clone(),
            severity,
            message,
            value,
            threshold,
            action,
            resolved: false,
            acknowledged: false,
            created_at: now,
            resolved_at: None,
        };

        match severity {
            AlertSeverity::Critical | AlertSeverity::Error => {
                log::error!("[ALERT] {:?} {}: {}", severity, key, alert.message)
            }
            AlertSeverity::Warning => log::warn!("[ALERT] {:?} {}: {}", severity, key, alert.message),
            AlertSeverity::Info => log::info!("[ALERT] {:?} {}: {}", severity, key, alert.message),
        }

        self.active.insert(key, alert.id);
        self.order.push_back(alert.id);
        self.alerts.insert(alert.id, alert.clone());
        self.trim();
        alert
    }

    /// Drop the oldest alerts beyond the history limit
    ///
    /// Resolved alerts go first. When none are left, the oldest one-shot event
    /// alerts expire even if nobody acknowledged them. Threshold alerts that
    /// are still breached are never dropped.
    fn trim(&mut self) {
        while self.order.len() > self.history_limit {
            let resolved = self
                .order
                .iter()
                .position(|id| self.alerts.get(id).is_some_and(|a| a.resolved));
            let index = match resolved {
                Some(index) => index,
                None => match self.order.iter().position(|id| self.events.contains(id)) {
                    Some(index) => index,
                    None => break,
                },
            };
            let Some(id) = self.order.remove(index) else {
                break;
            };
            if let Some(alert) = self.alerts.remove(&id) {
                if self.active.get(&alert.key) == Some(&id) {
                    self.active.remove(&alert.key);
                    log::debug!("[ALERT] Expired unacknowledged {} ({})", alert.key, alert.message);
                }
            }
            self.events.remove(&id);
        }
    }
}
