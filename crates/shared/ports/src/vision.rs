use std::collections::BTreeMap;

use async_trait::async_trait;
use meridian_core::{Direction, Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PortResult;

/// Result of a chart-vision analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionAnalysis {
    pub direction: Direction,
    pub entry: Price,
    pub stop_loss: Price,
    pub take_profit: Price,
    /// 0.0 - 1.0
    pub confidence: Decimal,
    pub reasoning: String,
    pub timestamp: Timestamp,
}

/// Captured chart image plus whatever numeric readouts the capture found
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedChart {
    pub image: Vec<u8>,
    pub readouts: BTreeMap<String, String>,
}

/// Port for an external chart-vision analysis service
#[async_trait]
pub trait ChartVisionAnalyzer: Send + Sync {
    async fn analyze(&self, image: &[u8], symbol: &str) -> PortResult<VisionAnalysis>;
}

/// Port for an external chart capture service
///
/// `handle` identifies the chart to capture (window title, URL, ...).
#[async_trait]
pub trait ChartCapture: Send + Sync {
    async fn capture(&self, handle: &str) -> PortResult<CapturedChart>;
}
