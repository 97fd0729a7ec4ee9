//! Chart-vision corroboration
//!
//! Optional second opinion from an external chart-vision service. The
//! outcome only nudges confidence; a missing or failing service is logged
//! and the signal goes ahead unchanged.

use std::sync::Arc;
use std::time::Duration;

use meridian_core::{Direction, Signal};
use meridian_ports::{ChartCapture, ChartVisionAnalyzer, VisionAnalysis};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Confidence adjustment per agreement or disagreement
pub const CONFIDENCE_NUDGE: Decimal = dec!(0.05);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corroboration {
    Agreed,
    Disagreed,
    /// One side is HOLD; confidence unchanged
    Neutral,
}

/// Apply a vision analysis to a signal's confidence
pub fn corroborate(signal: &mut Signal, analysis: &VisionAnalysis) -> Corroboration {
    let outcome = match (signal.direction, analysis.direction) {
        (Direction::Hold, _) | (_, Direction::Hold) => Corroboration::Neutral,
        (ours, theirs) if ours == theirs => Corroboration::Agreed,
        _ => Corroboration::Disagreed,
    };

    let nudge = match outcome {
        Corroboration::Agreed => CONFIDENCE_NUDGE,
        Corroboration::Disagreed => -CONFIDENCE_NUDGE,
        Corroboration::Neutral => Decimal::ZERO,
    };
    if !nudge.is_zero() {
        signal.confidence = (signal.confidence + nudge).clamp(Decimal::ZERO, Decimal::ONE);
        signal.reasoning.push_str(&format!(
            " Vision {} ({} at {}).",
            if nudge > Decimal::ZERO { "agrees" } else { "disagrees" },
            analysis.direction,
            analysis.confidence.round_dp(2)
        ));
    }
    outcome
}

/// Capture + analyze pipeline for one symbol's chart
pub struct VisionCorroborator {
    capture: Arc<dyn ChartCapture>,
    analyzer: Arc<dyn ChartVisionAnalyzer>,
    /// Chart handle pattern; `{symbol}` is substituted
    handle_pattern: String,
    timeout: Duration,
}

impl VisionCorroborator {
    pub fn new(capture: Arc<dyn ChartCapture>, analyzer: Arc<dyn ChartVisionAnalyzer>) -> Self {
        Self {
            capture,
            analyzer,
            handle_pattern: "{symbol}".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_handle_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.handle_pattern = pattern.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn handle_for(&self, symbol: &str) -> String {
        self.handle_pattern.replace("{symbol}", symbol)
    }

    /// Ask the vision service about `signal`'s chart and adjust its confidence
    ///
    /// Returns `None` when capture or analysis failed or timed out.
    pub async fn corroborate(&self, signal: &mut Signal) -> Option<Corroboration> {
        let handle = self.handle_for(&signal.symbol);
        let analysis = tokio::time::timeout(self.timeout, async {
            let chart = self.capture.capture(&handle).await?;
            self.analyzer.analyze(&chart.image, &signal.symbol).await
        })
        .await;

        match analysis {
            Ok(Ok(analysis)) => {
                let outcome = corroborate(signal, &analysis);
                log::info!(
                    "[SIGNAL] Vision {:?} for {} {} (confidence now {})",
                    outcome,
                    signal.symbol,
                    signal.direction,
                    signal.confidence.round_dp(2)
                );
                Some(outcome)
            }
            Ok(Err(e)) => {
                log::warn!("[SIGNAL] Vision analysis failed for {}: {}", signal.symbol, e);
                None
            }
            Err(_) => {
                log::warn!(
                    "[SIGNAL] Vision analysis timed out for {} after {:?}",
                    signal.symbol,
                    self.timeout
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use meridian_ports::{CapturedChart, PortError, PortResult};

    struct StaticCapture;

    #[async_trait]
    impl ChartCapture for StaticCapture {
        async fn capture(&self, _handle: &str) -> PortResult<CapturedChart> {
            Ok(CapturedChart {
                image: vec![1, 2, 3],
                readouts: Default::default(),
            })
        }
    }

    struct FixedAnalyzer(Option<Direction>);

    #[async_trait]
    impl ChartVisionAnalyzer for FixedAnalyzer {
        async fn analyze(&self, image: &[u8], _symbol: &str) -> PortResult<VisionAnalysis> {
            assert_eq!(image, &[1, 2, 3]);
            let direction = self
                .0
                .ok_or_else(|| PortError::Unavailable("vision offline".to_string()))?;
            Ok(analysis(direction))
        }
    }

    fn analysis(direction: Direction) -> VisionAnalysis {
        VisionAnalysis {
            direction,
            entry: dec!(100),
            stop_loss: dec!(98),
            take_profit: dec!(104),
            confidence: dec!(0.7),
            reasoning: "higher lows".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn buy() -> Signal {
        Signal::new("BTC", Direction::Buy, dec!(100), Utc::now()).with_confidence(dec!(0.6))
    }

    #[test]
    fn test_agreement_raises_confidence() {
        let mut signal = buy();
        assert_eq!(corroborate(&mut signal, &analysis(Direction::Buy)), Corroboration::Agreed);
        assert_eq!(signal.confidence, dec!(0.65));
        assert!(signal.reasoning.contains("Vision agrees"));
    }

    #[test]
    fn test_disagreement_and_hold() {
        let mut signal = buy();
        assert_eq!(
            corroborate(&mut signal, &analysis(Direction::Sell)),
            Corroboration::Disagreed
        );
        assert_eq!(signal.confidence, dec!(0.55));

        assert_eq!(
            corroborate(&mut signal, &analysis(Direction::Hold)),
            Corroboration::Neutral
        );
        assert_eq!(signal.confidence, dec!(0.55));
    }

    #[test]
    fn test_confidence_stays_in_unit_interval() {
        let mut signal = buy().with_confidence(dec!(0.98));
        corroborate(&mut signal, &analysis(Direction::Buy));
        assert_eq!(signal.confidence, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_corroborator_end_to_end() {
        let vision = VisionCorroborator::new(
            Arc::new(StaticCapture),
            Arc::new(FixedAnalyzer(Some(Direction::Buy))),
        )
        .with_handle_pattern("chart-{symbol}-1h");
        assert_eq!(vision.handle_for("BTC"), "chart-BTC-1h");

        let mut signal = buy();
        assert_eq!(vision.corroborate(&mut signal).await, Some(Corroboration::Agreed));
        assert_eq!(signal.confidence, dec!(0.65));
    }

    #[tokio::test]
    async fn test_corroborator_failure_leaves_signal() {
        let vision = VisionCorroborator::new(Arc::new(StaticCapture), Arc::new(FixedAnalyzer(None)));
        let mut signal = buy();
        assert_eq!(vision.corroborate(&mut signal).await, None);
        assert_eq!(signal.confidence, dec!(0.6));
    }
}
