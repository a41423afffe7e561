//! General constant enums used across the backtesting platform.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of order/trade/position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Long position
    Long,
    /// Short position
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "Long"),
            Direction::Short => write!(f, "Short"),
        }
    }
}

/// Offset of order/trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Offset {
    #[default]
    None,
    /// Open a new position
    Open,
    /// Close an existing position
    Close,
    /// Close today's position
    CloseToday,
}

impl Offset {
    /// Whether the offset opens new exposure.
    pub fn is_open(&self) -> bool {
        matches!(self, Offset::Open)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::None => write!(f, ""),
            Offset::Open => write!(f, "Open"),
            Offset::Close => write!(f, "Close"),
            Offset::CloseToday => write!(f, "CloseToday"),
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    /// Submitted, not yet acknowledged
    #[default]
    Submitting,
    /// Acknowledged, resting in the book
    NotTraded,
    /// Partially filled
    PartTraded,
    /// Fully filled
    AllTraded,
    /// Cancelled
    Cancelled,
    /// Rejected
    Rejected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Submitting => write!(f, "Submitting"),
            Status::NotTraded => write!(f, "NotTraded"),
            Status::PartTraded => write!(f, "PartTraded"),
            Status::AllTraded => write!(f, "AllTraded"),
            Status::Cancelled => write!(f, "Cancelled"),
            Status::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderType {
    /// Limit order
    #[default]
    Limit,
    /// Market order
    Market,
    /// Stop order
    Stop,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "Limit"),
            OrderType::Market => write!(f, "Market"),
            OrderType::Stop => write!(f, "Stop"),
        }
    }
}

/// Commission charging mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RateType {
    /// Fixed amount per contract
    #[default]
    Fixed,
    /// Percentage of turnover
    Float,
}

impl fmt::Display for RateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateType::Fixed => write!(f, "Fixed"),
            RateType::Float => write!(f, "Float"),
        }
    }
}

/// Exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// China Financial Futures Exchange
    Cffex,
    /// Shanghai Futures Exchange
    Shfe,
    /// Zhengzhou Commodity Exchange
    Czce,
    /// Dalian Commodity Exchange
    Dce,
    /// Shanghai International Energy Exchange
    Ine,
    /// Shanghai Stock Exchange
    Sse,
    /// Shenzhen Stock Exchange
    Szse,
    /// Chicago Mercantile Exchange
    Cme,
    /// New York Mercantile Exchange
    Nymex,
    /// COMEX of CME
    Comex,
    /// Binance Spot
    Binance,
    /// Binance USD-M Futures
    BinanceUsdm,
    /// Binance Coin-M Futures
    BinanceCoinm,
    /// For locally generated data
    Local,
    /// For exchanges not supported yet
    Global,
}

impl Exchange {
    /// Get the exchange value string
    pub fn value(&self) -> &'static str {
        match self {
            Exchange::Cffex => "CFFEX",
            Exchange::Shfe => "SHFE",
            Exchange::Czce => "CZCE",
            Exchange::Dce => "DCE",
            Exchange::Ine => "INE",
            Exchange::Sse => "SSE",
            Exchange::Szse => "SZSE",
            Exchange::Cme => "CME",
            Exchange::Nymex => "NYMEX",
            Exchange::Comex => "COMEX",
            Exchange::Binance => "BINANCE",
            Exchange::BinanceUsdm => "BINANCE_USDM",
            Exchange::BinanceCoinm => "BINANCE_COINM",
            Exchange::Local => "LOCAL",
            Exchange::Global => "GLOBAL",
        }
    }

    /// Parse an exchange from its value string
    pub fn from_value(value: &str) -> Option<Exchange> {
        match value {
            "CFFEX" => Some(Exchange::Cffex),
            "SHFE" => Some(Exchange::Shfe),
            "CZCE" => Some(Exchange::Czce),
            "DCE" => Some(Exchange::Dce),
            "INE" => Some(Exchange::Ine),
            "SSE" => Some(Exchange::Sse),
            "SZSE" => Some(Exchange::Szse),
            "CME" => Some(Exchange::Cme),
            "NYMEX" => Some(Exchange::Nymex),
            "COMEX" => Some(Exchange::Comex),
            "BINANCE" => Some(Exchange::Binance),
            "BINANCE_USDM" => Some(Exchange::BinanceUsdm),
            "BINANCE_COINM" => Some(Exchange::BinanceCoinm),
            "LOCAL" => Some(Exchange::Local),
            "GLOBAL" => Some(Exchange::Global),
            _ => None,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Interval of bar data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 1 minute
    Minute,
    /// 1 hour
    Hour,
    /// Daily
    Daily,
    /// Weekly
    Weekly,
}

impl Interval {
    /// Get interval value string
    pub fn value(&self) -> &'static str {
        match self {
            Interval::Minute => "1m",
            Interval::Hour => "1h",
            Interval::Daily => "d",
            Interval::Weekly => "w",
        }
    }

    /// Time step between two consecutive data points of this interval.
    pub fn delta(&self) -> Duration {
        match self {
            Interval::Minute => Duration::minutes(1),
            Interval::Hour => Duration::hours(1),
            Interval::Daily => Duration::days(1),
            Interval::Weekly => Duration::weeks(1),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_display() {
        assert_eq!(format!("{}", Direction::Long), "Long");
        assert_eq!(format!("{}", Direction::Short), "Short");
    }

    #[test]
    fn test_exchange_value_roundtrip() {
        for exchange in [Exchange::Binance, Exchange::Shfe, Exchange::Local] {
            assert_eq!(Exchange::from_value(exchange.value()), Some(exchange));
        }
        assert_eq!(Exchange::from_value("NOPE"), None);
    }

    #[test]
    fn test_interval_delta() {
        assert_eq!(Interval::Minute.delta(), Duration::minutes(1));
        assert_eq!(Interval::Weekly.delta(), Duration::weeks(1));
        assert_eq!(Interval::Daily.value(), "d");
    }
}
