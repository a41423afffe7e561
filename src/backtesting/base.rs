//! Base types for the backtesting engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::base::StrategyError;
use crate::trader::constant::{Direction, RateType};
use crate::trader::object::TradeData;

/// Backtesting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BacktestingMode {
    /// Bar-by-bar replay over OHLCV data
    #[default]
    Bar,
    /// Tick-by-tick replay
    Tick,
}

/// Errors reported by the backtesting engine and the search drivers.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("start date must be earlier than end date")]
    InvalidWindow,

    #[error("no strategy has been added to the engine")]
    MissingStrategy,

    #[error("strategy fault: {0}")]
    Strategy(#[from] StrategyError),

    #[error("optimization parameter space is empty")]
    EmptyParameterSpace,

    #[error("optimization target is not set")]
    TargetUnset,

    #[error("invalid optimization parameter: {0}")]
    InvalidParameter(String),

    #[error("data source error: {0}")]
    DataSource(String),
}

/// Mark-to-market accumulator for a single trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyResult {
    pub date: NaiveDate,
    pub close_price: f64,
    pub pre_close: f64,

    pub trades: Vec<TradeData>,
    pub trade_count: usize,

    pub start_pos: f64,
    pub end_pos: f64,

    pub turnover: f64,
    pub commission: f64,
    pub slippage: f64,

    pub trading_pnl: f64,
    pub holding_pnl: f64,
    pub total_pnl: f64,
    pub net_pnl: f64,
}

impl DailyResult {
    pub fn new(date: NaiveDate, close_price: f64) -> Self {
        Self {
            date,
            close_price,
            pre_close: 0.0,
            trades: Vec::new(),
            trade_count: 0,
            start_pos: 0.0,
            end_pos: 0.0,
            turnover: 0.0,
            commission: 0.0,
            slippage: 0.0,
            trading_pnl: 0.0,
            holding_pnl: 0.0,
            total_pnl: 0.0,
            net_pnl: 0.0,
        }
    }

    /// Register a trade executed on this day.
    pub fn add_trade(&mut self, trade: TradeData) {
        self.trades.push(trade);
    }

    /// Compute the day's mark-to-market PnL.
    ///
    /// Holding PnL marks the overnight position from `pre_close` to
    /// `close_price`; trading PnL marks each intraday fill to
    /// `close_price`. Inverse contracts settle in base currency, so
    /// their formulas run on reciprocal prices.
    #[allow(clippy::too_many_arguments)]
    pub fn calculate_pnl(
        &mut self,
        pre_close: f64,
        start_pos: f64,
        size: f64,
        rate_type: RateType,
        rate: f64,
        slippage: f64,
        inverse: bool,
    ) {
        // No pre-close exists on day one; 1.0 keeps the reciprocal
        // formulas away from division by zero.
        self.pre_close = if pre_close != 0.0 { pre_close } else { 1.0 };

        self.start_pos = start_pos;
        self.end_pos = start_pos;

        if !inverse {
            self.holding_pnl = self.start_pos * (self.close_price - self.pre_close) * size;
        } else {
            self.holding_pnl =
                self.start_pos * (1.0 / self.pre_close - 1.0 / self.close_price) * size;
        }

        self.trade_count = self.trades.len();
        self.trading_pnl = 0.0;
        self.turnover = 0.0;
        self.commission = 0.0;
        self.slippage = 0.0;

        for trade in &self.trades {
            let pos_change = match trade.direction {
                Direction::Long => trade.volume,
                Direction::Short => -trade.volume,
            };
            self.end_pos += pos_change;

            let turnover = if !inverse {
                self.trading_pnl += pos_change * (self.close_price - trade.price) * size;
                self.slippage += trade.volume * size * slippage;
                trade.volume * size * trade.price
            } else {
                self.trading_pnl +=
                    pos_change * (1.0 / trade.price - 1.0 / self.close_price) * size;
                self.slippage += trade.volume * size * slippage / (trade.price * trade.price);
                trade.volume * size / trade.price
            };

            self.turnover += turnover;
            match rate_type {
                RateType::Fixed => self.commission += trade.volume * rate,
                RateType::Float => self.commission += turnover * rate,
            }
        }

        self.total_pnl = self.trading_pnl + self.holding_pnl;
        self.net_pnl = self.total_pnl - self.commission - self.slippage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trader::constant::{Exchange, Offset};
    use chrono::{TimeZone, Utc};

    fn trade(direction: Direction, offset: Offset, price: f64, volume: f64) -> TradeData {
        TradeData {
            gateway_name: "BACKTESTING".to_string(),
            symbol: "IF2401".to_string(),
            exchange: Exchange::Cffex,
            orderid: "1".to_string(),
            tradeid: "1".to_string(),
            direction,
            offset,
            price,
            volume,
            datetime: Utc.with_ymd_and_hms(2024, 1, 2, 14, 59, 0).unwrap(),
        }
    }

    #[test]
    fn test_trading_day_pnl() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut result = DailyResult::new(date, 102.0);
        result.add_trade(trade(Direction::Long, Offset::Open, 100.0, 1.0));

        result.calculate_pnl(0.0, 0.0, 10.0, RateType::Fixed, 0.0, 0.0, false);

        assert_eq!(result.turnover, 1000.0);
        assert_eq!(result.trading_pnl, 20.0);
        assert_eq!(result.holding_pnl, 0.0);
        assert_eq!(result.net_pnl, 20.0);
        assert_eq!(result.end_pos, 1.0);
    }

    #[test]
    fn test_holding_day_pnl() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let mut result = DailyResult::new(date, 101.0);

        result.calculate_pnl(102.0, 1.0, 10.0, RateType::Fixed, 0.0, 0.0, false);

        assert_eq!(result.holding_pnl, -10.0);
        assert_eq!(result.trading_pnl, 0.0);
        assert_eq!(result.total_pnl, -10.0);
    }

    #[test]
    fn test_float_commission_on_turnover() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut result = DailyResult::new(date, 102.0);
        result.add_trade(trade(Direction::Long, Offset::Open, 100.0, 2.0));

        result.calculate_pnl(0.0, 0.0, 10.0, RateType::Float, 0.001, 0.0, false);

        // turnover 2 * 10 * 100 = 2000, commission 2000 * 0.001
        assert_eq!(result.turnover, 2000.0);
        assert!((result.commission - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_contract_pnl() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let mut result = DailyResult::new(date, 50000.0);
        result.add_trade(trade(Direction::Long, Offset::Open, 40000.0, 1.0));

        result.calculate_pnl(45000.0, 1.0, 100.0, RateType::Fixed, 0.0, 2.0, true);

        let expected_holding = 1.0 * (1.0 / 45000.0 - 1.0 / 50000.0) * 100.0;
        let expected_trading = 1.0 * (1.0 / 40000.0 - 1.0 / 50000.0) * 100.0;
        let expected_slippage = 1.0 * 100.0 * 2.0 / (40000.0_f64 * 40000.0);

        assert!((result.holding_pnl - expected_holding).abs() < 1e-12);
        assert!((result.trading_pnl - expected_trading).abs() < 1e-12);
        assert!((result.slippage - expected_slippage).abs() < 1e-15);
        assert!((result.turnover - 100.0 / 40000.0).abs() < 1e-12);
    }

    #[test]
    fn test_pre_close_zero_guard() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut result = DailyResult::new(date, 2.0);

        result.calculate_pnl(0.0, 1.0, 1.0, RateType::Fixed, 0.0, 0.0, true);

        assert_eq!(result.pre_close, 1.0);
        assert!((result.holding_pnl - (1.0 / 1.0 - 1.0 / 2.0)).abs() < 1e-12);
    }
}
