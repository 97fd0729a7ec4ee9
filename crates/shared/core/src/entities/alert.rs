use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an alert
pub type AlertId = Uuid;

/// Area an alert belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertCategory {
    Risk,
    Performance,
    Position,
    System,
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertCategory::Risk => "RISK",
            AlertCategory::Performance => "PERFORMANCE",
            AlertCategory::Position => "POSITION",
            AlertCategory::System => "SYSTEM",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Identity of a monitored condition: at most one active alert per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertKey {
    pub category: AlertCategory,
    pub metric_id: String,
}

impl AlertKey {
    pub fn new(category: AlertCategory, metric_id: impl Into<String>) -> Self {
        Self {
            category,
            metric_id: metric_id.into(),
        }
    }

    pub fn risk(metric_id: impl Into<String>) -> Self {
        Self::new(AlertCategory::Risk, metric_id)
    }

    pub fn performance(metric_id: impl Into<String>) -> Self {
        Self::new(AlertCategory::Performance, metric_id)
    }

    pub fn position(metric_id: impl Into<String>) -> Self {
        Self::new(AlertCategory::Position, metric_id)
    }

    pub fn system(metric_id: impl Into<String>) -> Self {
        Self::new(AlertCategory::System, metric_id)
    }
}

impl std::fmt::Display for AlertKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.category, self.metric_id)
    }
}

/// A standing notification tied to a threshold-crossing condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub key: AlertKey,
    pub severity: AlertSeverity,
    pub message: String,
    pub value: Decimal,
    pub threshold: Decimal,
    /// Suggested operator action
    pub action: String,
    pub resolved: bool,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn category(&self) -> AlertCategory {
        self.key.category
    }

    pub fn is_active(&self) -> bool {
        !self.resolved
    }
}
