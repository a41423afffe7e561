//! Fundamental types for the strategy framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::trader::constant::{Direction, Offset};

/// Prefix used by stop order identifiers, e.g. "STOP.3"
pub const STOPORDER_PREFIX: &str = "STOP";

/// Kind of engine a strategy is running inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineType {
    /// Live trading
    Live,
    /// Historical replay
    Backtesting,
}

/// Stop order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopOrderStatus {
    /// Waiting to be triggered
    Waiting,
    /// Triggered and converted into a filled order
    Triggered,
    /// Cancelled before triggering
    Cancelled,
}

/// Resting price condition that synthesizes an immediately-filled order
/// once the market trades through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopOrder {
    pub vt_symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: f64,
    pub volume: f64,
    pub stop_orderid: String,
    pub strategy_name: String,
    pub lock: bool,
    /// Order ids synthesized when this stop triggered
    pub vt_orderids: Vec<String>,
    pub status: StopOrderStatus,
    pub datetime: Option<DateTime<Utc>>,
}

/// Fault raised by a strategy callback; aborts the running backtest.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StrategyError(pub String);

impl StrategyError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_order_id_prefix() {
        let stop_orderid = format!("{}.{}", STOPORDER_PREFIX, 7);
        assert_eq!(stop_orderid, "STOP.7");
        assert!(stop_orderid.starts_with(STOPORDER_PREFIX));
    }

    #[test]
    fn test_strategy_error_display() {
        let err = StrategyError::new("indicator window too short");
        assert_eq!(err.to_string(), "indicator window too short");
    }
}
