//! Topic naming

/// Logical topic names used on the in-process bus
pub struct Subjects;

impl Subjects {
    /// Snapshots for a specific symbol: `md.BTC`
    pub fn market_data(symbol: &str) -> String {
        format!("md.{}", symbol.to_uppercase())
    }

    /// Symbol back out of a market data topic
    pub fn symbol_of(topic: &str) -> Option<&str> {
        topic.strip_prefix("md.")
    }
}
