//! Basic data structures describing market data, orders and fills.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::constant::{Direction, Exchange, Interval, Offset, OrderType, Status};

/// Statuses in which an order is still working in the book.
pub fn is_active_status(status: Status) -> bool {
    matches!(
        status,
        Status::Submitting | Status::NotTraded | Status::PartTraded
    )
}

/// Single market update with the last trade and top-of-book quotes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickData {
    pub gateway_name: String,
    pub symbol: String,
    pub exchange: Exchange,
    pub datetime: DateTime<Utc>,

    pub name: String,
    pub volume: f64,
    pub turnover: f64,
    pub open_interest: f64,
    pub last_price: f64,
    pub last_volume: f64,

    pub bid_price_1: f64,
    pub bid_volume_1: f64,
    pub ask_price_1: f64,
    pub ask_volume_1: f64,

    pub localtime: Option<DateTime<Utc>>,
}

impl TickData {
    pub fn new(
        gateway_name: String,
        symbol: String,
        exchange: Exchange,
        datetime: DateTime<Utc>,
    ) -> Self {
        Self {
            gateway_name,
            symbol,
            exchange,
            datetime,
            name: String::new(),
            volume: 0.0,
            turnover: 0.0,
            open_interest: 0.0,
            last_price: 0.0,
            last_volume: 0.0,
            bid_price_1: 0.0,
            bid_volume_1: 0.0,
            ask_price_1: 0.0,
            ask_volume_1: 0.0,
            localtime: None,
        }
    }

    /// Get vt_symbol (symbol.exchange)
    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange.value())
    }
}

/// Candlestick bar data of a certain trading period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarData {
    pub gateway_name: String,
    pub symbol: String,
    pub exchange: Exchange,
    pub datetime: DateTime<Utc>,

    pub interval: Option<Interval>,
    pub volume: f64,
    pub turnover: f64,
    pub open_interest: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
}

impl BarData {
    pub fn new(
        gateway_name: String,
        symbol: String,
        exchange: Exchange,
        datetime: DateTime<Utc>,
    ) -> Self {
        Self {
            gateway_name,
            symbol,
            exchange,
            datetime,
            interval: None,
            volume: 0.0,
            turnover: 0.0,
            open_interest: 0.0,
            open_price: 0.0,
            high_price: 0.0,
            low_price: 0.0,
            close_price: 0.0,
        }
    }

    /// Get vt_symbol (symbol.exchange)
    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange.value())
    }
}

/// Order data tracks the latest state of a specific order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderData {
    pub gateway_name: String,
    pub symbol: String,
    pub exchange: Exchange,
    pub orderid: String,

    pub order_type: OrderType,
    pub direction: Direction,
    pub offset: Offset,
    pub price: f64,
    pub volume: f64,
    pub traded: f64,
    pub status: Status,
    pub datetime: Option<DateTime<Utc>>,
    pub reference: String,
}

impl OrderData {
    /// Get vt_symbol (symbol.exchange)
    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange.value())
    }

    /// Get vt_orderid (gateway_name.orderid)
    pub fn vt_orderid(&self) -> String {
        format!("{}.{}", self.gateway_name, self.orderid)
    }

    /// Check if the order is still working
    pub fn is_active(&self) -> bool {
        is_active_status(self.status)
    }
}

/// Trade data records one fill of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeData {
    pub gateway_name: String,
    pub symbol: String,
    pub exchange: Exchange,
    pub orderid: String,
    pub tradeid: String,
    pub direction: Direction,

    pub offset: Offset,
    pub price: f64,
    pub volume: f64,
    pub datetime: DateTime<Utc>,
}

impl TradeData {
    /// Get vt_symbol (symbol.exchange)
    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange.value())
    }

    /// Get vt_orderid (gateway_name.orderid)
    pub fn vt_orderid(&self) -> String {
        format!("{}.{}", self.gateway_name, self.orderid)
    }

    /// Get vt_tradeid (gateway_name.tradeid)
    pub fn vt_tradeid(&self) -> String {
        format!("{}.{}", self.gateway_name, self.tradeid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_data_vt_symbol() {
        let tick = TickData::new(
            "BACKTESTING".to_string(),
            "BTCUSDT".to_string(),
            Exchange::Binance,
            Utc::now(),
        );
        assert_eq!(tick.vt_symbol(), "BTCUSDT.BINANCE");
    }

    #[test]
    fn test_order_data_is_active() {
        let mut order = OrderData {
            gateway_name: "BACKTESTING".to_string(),
            symbol: "IF2401".to_string(),
            exchange: Exchange::Cffex,
            orderid: "1".to_string(),
            order_type: OrderType::Limit,
            direction: Direction::Long,
            offset: Offset::Open,
            price: 3500.0,
            volume: 1.0,
            traded: 0.0,
            status: Status::Submitting,
            datetime: None,
            reference: String::new(),
        };

        assert!(order.is_active());
        assert_eq!(order.vt_orderid(), "BACKTESTING.1");

        order.status = Status::AllTraded;
        assert!(!order.is_active());

        order.status = Status::Cancelled;
        assert!(!order.is_active());
    }
}
