//! Performance statistics: daily series aggregation, drawdown, Sharpe,
//! and round-trip trade reconstruction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::trader::constant::{Direction, RateType};
use crate::trader::object::TradeData;

use super::base::DailyResult;

/// Trading days per year used by the annualization conventions.
pub const ANNUAL_DAYS: f64 = 240.0;

/// Daily ledger enriched with balance, log-return and drawdown series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyFrame {
    pub results: Vec<DailyResult>,
    pub balance: Vec<f64>,
    pub returns: Vec<f64>,
    pub highlevel: Vec<f64>,
    pub drawdown: Vec<f64>,
    pub ddpercent: Vec<f64>,
}

impl DailyFrame {
    /// Build the derived series from per-day results sorted by date.
    pub fn new(results: Vec<DailyResult>, capital: f64) -> Self {
        let len = results.len();
        let mut balance = Vec::with_capacity(len);
        let mut returns = Vec::with_capacity(len);
        let mut highlevel = Vec::with_capacity(len);
        let mut drawdown = Vec::with_capacity(len);
        let mut ddpercent = Vec::with_capacity(len);

        let mut running = capital;
        let mut high = f64::MIN;

        for (i, result) in results.iter().enumerate() {
            let previous = running;
            running += result.net_pnl;
            balance.push(running);

            // First day carries no return
            if i == 0 {
                returns.push(0.0);
            } else {
                returns.push((running / previous).ln());
            }

            high = high.max(running);
            highlevel.push(high);
            drawdown.push(running - high);
            ddpercent.push((running - high) / high * 100.0);
        }

        Self {
            results,
            balance,
            returns,
            highlevel,
            drawdown,
            ddpercent,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Close price of the final trading day.
    pub fn last_close_price(&self) -> f64 {
        self.results.last().map(|r| r.close_price).unwrap_or(0.0)
    }
}

/// One maximal net-flat-to-net-flat sequence of trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundTrip {
    pub number: usize,
    pub profit: f64,
    pub commission: f64,
    pub slippage: f64,
    pub final_profit: f64,
    pub cum_profit: f64,
    pub cum_commission: f64,
    pub cum_slippage: f64,
    pub cum_final: f64,
    pub final_balance: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Round-trip view of the trade ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResultFrame {
    pub rounds: Vec<RoundTrip>,
}

/// Reconstruct round trips from the trade ledger in time order.
///
/// Each trade contributes a cash flow (opens pay out, closes receive).
/// If the run ends with a dangling open position, the trailing open
/// trades are rewritten as if marked to the final close: profit against
/// the last close price, doubled fixed commission (float commission on
/// the way in and out), doubled slippage.
#[allow(clippy::too_many_arguments)]
pub fn calculate_trade_result(
    trades: &[TradeData],
    frame: &DailyFrame,
    size: f64,
    rate_type: RateType,
    rate: f64,
    slippage: f64,
    capital: f64,
) -> Option<TradeResultFrame> {
    if trades.is_empty() {
        return None;
    }

    let n = trades.len();
    let mut numbers = Vec::with_capacity(n);
    let mut profits = Vec::with_capacity(n);
    let mut commissions = Vec::with_capacity(n);
    let mut slippages = Vec::with_capacity(n);

    let mut volume_count = 0.0;
    let mut round_number = 1usize;

    for trade in trades {
        numbers.push(round_number);

        let sign = match trade.direction {
            Direction::Long => -1.0,
            Direction::Short => 1.0,
        };
        profits.push(size * trade.price * trade.volume * sign);
        commissions.push(match rate_type {
            RateType::Fixed => trade.volume * rate,
            RateType::Float => size * trade.price * trade.volume * rate,
        });
        slippages.push(size * slippage);

        if trade.offset.is_open() {
            volume_count += trade.volume;
        } else {
            volume_count -= trade.volume;
        }
        if volume_count == 0.0 {
            round_number += 1;
        }
    }

    // Trailing opens that never flattened are marked to the last close.
    let tail = trades
        .iter()
        .rev()
        .take_while(|trade| trade.offset.is_open())
        .count();

    if volume_count != 0.0 && tail > 0 {
        let last_close = frame.last_close_price();

        for i in (n - tail)..n {
            let trade = &trades[i];
            profits[i] = match trade.direction {
                Direction::Long => size * (last_close - trade.price) * trade.volume,
                Direction::Short => size * (trade.price - last_close) * trade.volume,
            };
            commissions[i] = match rate_type {
                RateType::Fixed => 2.0 * trade.volume * rate,
                RateType::Float => size * (last_close + trade.price) * trade.volume * rate,
            };
            slippages[i] = 2.0 * size * slippage;
        }
    }

    // Group per round and accumulate.
    let mut rounds: Vec<RoundTrip> = Vec::new();

    for i in 0..n {
        if rounds.last().map(|r| r.number) != Some(numbers[i]) {
            rounds.push(RoundTrip {
                number: numbers[i],
                profit: 0.0,
                commission: 0.0,
                slippage: 0.0,
                final_profit: 0.0,
                cum_profit: 0.0,
                cum_commission: 0.0,
                cum_slippage: 0.0,
                cum_final: 0.0,
                final_balance: 0.0,
                start_time: trades[i].datetime,
                end_time: trades[i].datetime,
            });
        }
        if let Some(round) = rounds.last_mut() {
            round.profit += profits[i];
            round.commission += commissions[i];
            round.slippage += slippages[i];
            round.end_time = trades[i].datetime;
        }
    }

    let mut cum_profit = 0.0;
    let mut cum_commission = 0.0;
    let mut cum_slippage = 0.0;
    let mut cum_final = 0.0;

    for round in &mut rounds {
        round.final_profit = round.profit - round.commission - round.slippage;

        cum_profit += round.profit;
        cum_commission += round.commission;
        cum_slippage += round.slippage;
        cum_final += round.final_profit;

        round.cum_profit = cum_profit;
        round.cum_commission = cum_commission;
        round.cum_slippage = cum_slippage;
        round.cum_final = cum_final;
        round.final_balance = capital + cum_final;
    }

    Some(TradeResultFrame { rounds })
}

/// Summary statistics with a fixed key set. Every value is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BacktestStatistics {
    pub start_date: String,
    pub end_date: String,
    pub total_days: usize,
    pub profit_days: usize,
    pub loss_days: usize,

    pub capital: f64,
    pub end_balance: f64,
    pub max_drawdown: f64,
    pub max_ddpercent: f64,
    pub max_drawdown_duration: i64,

    pub total_net_pnl: f64,
    pub daily_net_pnl: f64,
    pub total_commission: f64,
    pub daily_commission: f64,
    pub total_slippage: f64,
    pub daily_slippage: f64,
    pub total_turnover: f64,
    pub daily_turnover: f64,
    pub total_trade_count: usize,
    pub daily_trade_count: f64,

    pub total_return: f64,
    pub annual_return: f64,
    pub daily_return: f64,
    pub return_std: f64,
    pub sharpe_ratio: f64,
    pub return_drawdown_ratio: f64,

    pub total_trade: usize,
    pub max_profit: f64,
    pub max_loss: f64,
    pub profit_times: usize,
    pub loss_times: usize,
    pub rate_of_win: f64,
    pub total_profit: f64,
    pub total_loss: f64,
    pub profit_loss_ratio: f64,
    pub trade_profit: f64,
    pub trade_commission: f64,
    pub trade_slippage: f64,
    pub final_profit: f64,
    pub final_balance: f64,
}

impl BacktestStatistics {
    /// Numeric statistics map with the fixed key set.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        let entries: [(&str, f64); 38] = [
            ("total_days", self.total_days as f64),
            ("profit_days", self.profit_days as f64),
            ("loss_days", self.loss_days as f64),
            ("capital", self.capital),
            ("end_balance", self.end_balance),
            ("max_drawdown", self.max_drawdown),
            ("max_ddpercent", self.max_ddpercent),
            ("max_drawdown_duration", self.max_drawdown_duration as f64),
            ("total_net_pnl", self.total_net_pnl),
            ("daily_net_pnl", self.daily_net_pnl),
            ("total_commission", self.total_commission),
            ("daily_commission", self.daily_commission),
            ("total_slippage", self.total_slippage),
            ("daily_slippage", self.daily_slippage),
            ("total_turnover", self.total_turnover),
            ("daily_turnover", self.daily_turnover),
            ("total_trade_count", self.total_trade_count as f64),
            ("daily_trade_count", self.daily_trade_count),
            ("total_return", self.total_return),
            ("annual_return", self.annual_return),
            ("daily_return", self.daily_return),
            ("return_std", self.return_std),
            ("sharpe_ratio", self.sharpe_ratio),
            ("return_drawdown_ratio", self.return_drawdown_ratio),
            ("total_trade", self.total_trade as f64),
            ("max_profit", self.max_profit),
            ("max_loss", self.max_loss),
            ("profit_times", self.profit_times as f64),
            ("loss_times", self.loss_times as f64),
            ("rate_of_win", self.rate_of_win),
            ("total_profit", self.total_profit),
            ("total_loss", self.total_loss),
            ("profit_loss_ratio", self.profit_loss_ratio),
            ("trade_profit", self.trade_profit),
            ("trade_commission", self.trade_commission),
            ("trade_slippage", self.trade_slippage),
            ("final_profit", self.final_profit),
            ("final_balance", self.final_balance),
        ];
        for (key, value) in entries {
            map.insert(key.to_string(), value);
        }
        map
    }

    /// Look up a statistic by its map key, e.g. an optimization target.
    pub fn target(&self, name: &str) -> Option<f64> {
        self.to_map().get(name).copied()
    }

    /// Coerce every non-finite value to 0.
    fn sanitize(&mut self) {
        for value in [
            &mut self.capital,
            &mut self.end_balance,
            &mut self.max_drawdown,
            &mut self.max_ddpercent,
            &mut self.total_net_pnl,
            &mut self.daily_net_pnl,
            &mut self.total_commission,
            &mut self.daily_commission,
            &mut self.total_slippage,
            &mut self.daily_slippage,
            &mut self.total_turnover,
            &mut self.daily_turnover,
            &mut self.daily_trade_count,
            &mut self.total_return,
            &mut self.annual_return,
            &mut self.daily_return,
            &mut self.return_std,
            &mut self.sharpe_ratio,
            &mut self.return_drawdown_ratio,
            &mut self.max_profit,
            &mut self.max_loss,
            &mut self.rate_of_win,
            &mut self.total_profit,
            &mut self.total_loss,
            &mut self.profit_loss_ratio,
            &mut self.trade_profit,
            &mut self.trade_commission,
            &mut self.trade_slippage,
            &mut self.final_profit,
            &mut self.final_balance,
        ] {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
    }
}

/// Compute summary statistics over a daily frame and its round trips.
/// A missing frame (no trades) yields the all-zero statistics.
pub fn calculate_statistics(
    frame: Option<&DailyFrame>,
    capital: f64,
    trade_result: Option<&TradeResultFrame>,
) -> BacktestStatistics {
    let mut stats = BacktestStatistics::default();

    let Some(frame) = frame else {
        return stats;
    };
    if frame.is_empty() {
        return stats;
    }

    let total_days = frame.len();

    stats.start_date = frame.results[0].date.format("%Y-%m-%d").to_string();
    stats.end_date = frame.results[total_days - 1]
        .date
        .format("%Y-%m-%d")
        .to_string();
    stats.total_days = total_days;
    stats.profit_days = frame.results.iter().filter(|r| r.net_pnl > 0.0).count();
    stats.loss_days = frame.results.iter().filter(|r| r.net_pnl < 0.0).count();

    stats.capital = capital;
    stats.end_balance = frame.balance[total_days - 1];

    let (dd_end, max_drawdown) = frame
        .drawdown
        .iter()
        .enumerate()
        .fold((0, f64::MAX), |acc, (i, &value)| {
            if value < acc.1 {
                (i, value)
            } else {
                acc
            }
        });
    stats.max_drawdown = max_drawdown;
    stats.max_ddpercent = frame.ddpercent.iter().cloned().fold(f64::MAX, f64::min);

    // Duration from the balance peak preceding the trough to the trough.
    let (dd_start, _) =
        frame.balance[..=dd_end]
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, &value)| {
                if value > acc.1 {
                    (i, value)
                } else {
                    acc
                }
            });
    stats.max_drawdown_duration = (frame.results[dd_end].date - frame.results[dd_start].date)
        .num_days();

    stats.total_net_pnl = frame.results.iter().map(|r| r.net_pnl).sum();
    stats.daily_net_pnl = stats.total_net_pnl / total_days as f64;

    stats.total_commission = frame.results.iter().map(|r| r.commission).sum();
    stats.daily_commission = stats.total_commission / total_days as f64;

    stats.total_slippage = frame.results.iter().map(|r| r.slippage).sum();
    stats.daily_slippage = stats.total_slippage / total_days as f64;

    stats.total_turnover = frame.results.iter().map(|r| r.turnover).sum();
    stats.daily_turnover = stats.total_turnover / total_days as f64;

    stats.total_trade_count = frame.results.iter().map(|r| r.trade_count).sum();
    stats.daily_trade_count = stats.total_trade_count as f64 / total_days as f64;

    stats.total_return = (stats.end_balance / capital - 1.0) * 100.0;
    stats.annual_return = stats.total_return / total_days as f64 * ANNUAL_DAYS;

    let mean = frame.returns.iter().sum::<f64>() / frame.returns.len() as f64;
    stats.daily_return = mean * 100.0;

    let return_std = if frame.returns.len() > 1 {
        let variance = frame
            .returns
            .iter()
            .map(|r| (r - mean) * (r - mean))
            .sum::<f64>()
            / (frame.returns.len() - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };
    stats.return_std = return_std * 100.0;

    if stats.return_std != 0.0 {
        stats.sharpe_ratio = stats.daily_return / stats.return_std * ANNUAL_DAYS.sqrt();
    }

    stats.return_drawdown_ratio = -stats.total_return / stats.max_ddpercent;

    if let Some(trade_result) = trade_result {
        let rounds = &trade_result.rounds;
        if let Some(last) = rounds.last() {
            stats.total_trade = rounds.len();
            stats.max_profit = rounds
                .iter()
                .map(|r| r.final_profit)
                .fold(f64::MIN, f64::max);
            stats.max_loss = rounds
                .iter()
                .map(|r| r.final_profit)
                .fold(f64::MAX, f64::min);
            stats.profit_times = rounds.iter().filter(|r| r.final_profit >= 0.0).count();
            stats.loss_times = rounds.iter().filter(|r| r.final_profit < 0.0).count();
            stats.rate_of_win =
                stats.profit_times as f64 / (stats.profit_times + stats.loss_times) as f64 * 100.0;
            stats.total_profit = rounds
                .iter()
                .filter(|r| r.final_profit >= 0.0)
                .map(|r| r.final_profit)
                .sum();
            stats.total_loss = rounds
                .iter()
                .filter(|r| r.final_profit < 0.0)
                .map(|r| r.final_profit)
                .sum();
            stats.profit_loss_ratio = (stats.total_profit / stats.profit_times as f64)
                / (stats.total_loss / stats.loss_times as f64).abs();
            stats.trade_profit = last.cum_profit;
            stats.trade_commission = last.cum_commission;
            stats.trade_slippage = last.cum_slippage;
            stats.final_profit = last.cum_final;
            stats.final_balance = last.final_balance;
        }
    }

    stats.sanitize();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trader::constant::{Exchange, Offset};
    use chrono::{NaiveDate, TimeZone};

    fn daily(day: u32, close: f64, net_pnl: f64) -> DailyResult {
        let mut result =
            DailyResult::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), close);
        result.net_pnl = net_pnl;
        result
    }

    fn trade(
        day: u32,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: f64,
    ) -> TradeData {
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
            datetime: Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_daily_frame_series() {
        let frame = DailyFrame::new(
            vec![
                daily(1, 100.0, 100.0),
                daily(2, 100.0, -50.0),
                daily(3, 100.0, 150.0),
            ],
            10_000.0,
        );

        assert_eq!(frame.balance, vec![10_100.0, 10_050.0, 10_200.0]);
        assert_eq!(frame.returns[0], 0.0);
        assert!((frame.returns[1] - (10_050.0_f64 / 10_100.0).ln()).abs() < 1e-12);
        assert_eq!(frame.highlevel, vec![10_100.0, 10_100.0, 10_200.0]);
        assert_eq!(frame.drawdown, vec![0.0, -50.0, 0.0]);
        assert!((frame.ddpercent[1] - (-50.0 / 10_100.0 * 100.0)).abs() < 1e-12);
    }

    #[test]
    fn test_statistics_summary() {
        let frame = DailyFrame::new(
            vec![
                daily(1, 100.0, 100.0),
                daily(2, 100.0, -50.0),
                daily(3, 100.0, 150.0),
            ],
            10_000.0,
        );

        let stats = calculate_statistics(Some(&frame), 10_000.0, None);

        assert_eq!(stats.start_date, "2024-01-01");
        assert_eq!(stats.end_date, "2024-01-03");
        assert_eq!(stats.total_days, 3);
        assert_eq!(stats.profit_days, 2);
        assert_eq!(stats.loss_days, 1);
        assert_eq!(stats.end_balance, 10_200.0);
        assert_eq!(stats.max_drawdown, -50.0);
        // Trough on day 2, peak on day 1
        assert_eq!(stats.max_drawdown_duration, 1);
        assert!((stats.total_return - 2.0).abs() < 1e-12);
        assert!((stats.annual_return - 2.0 / 3.0 * 240.0).abs() < 1e-12);
        assert!(stats.sharpe_ratio.is_finite());
        assert!(stats.return_drawdown_ratio > 0.0);
    }

    #[test]
    fn test_statistics_single_day_has_no_infinities() {
        let frame = DailyFrame::new(vec![daily(1, 100.0, 0.0)], 10_000.0);
        let stats = calculate_statistics(Some(&frame), 10_000.0, None);

        // return_std of one sample is 0, so sharpe collapses to 0;
        // max_ddpercent 0 would make the ratio infinite before coercion
        assert_eq!(stats.sharpe_ratio, 0.0);
        assert_eq!(stats.return_drawdown_ratio, 0.0);
    }

    #[test]
    fn test_statistics_without_frame_is_zero() {
        let stats = calculate_statistics(None, 10_000.0, None);
        assert_eq!(stats, BacktestStatistics::default());
    }

    #[test]
    fn test_round_trip_flat() {
        let trades = vec![
            trade(1, Direction::Long, Offset::Open, 100.0, 1.0),
            trade(2, Direction::Short, Offset::Close, 110.0, 1.0),
        ];
        let frame = DailyFrame::new(vec![daily(1, 100.0, 0.0), daily(2, 110.0, 0.0)], 10_000.0);

        let result =
            calculate_trade_result(&trades, &frame, 1.0, RateType::Fixed, 0.0, 0.0, 10_000.0)
                .unwrap();

        assert_eq!(result.rounds.len(), 1);
        let round = &result.rounds[0];
        assert_eq!(round.profit, 10.0);
        assert_eq!(round.final_profit, 10.0);
        assert_eq!(round.final_balance, 10_010.0);
        assert_eq!(round.start_time, trades[0].datetime);
        assert_eq!(round.end_time, trades[1].datetime);
    }

    #[test]
    fn test_round_trip_numbering() {
        let trades = vec![
            trade(1, Direction::Long, Offset::Open, 100.0, 1.0),
            trade(2, Direction::Short, Offset::Close, 110.0, 1.0),
            trade(3, Direction::Short, Offset::Open, 120.0, 2.0),
            trade(4, Direction::Long, Offset::Close, 115.0, 2.0),
        ];
        let frame = DailyFrame::new(
            (1..=4).map(|d| daily(d, 115.0, 0.0)).collect(),
            10_000.0,
        );

        let result =
            calculate_trade_result(&trades, &frame, 1.0, RateType::Fixed, 0.0, 0.0, 10_000.0)
                .unwrap();

        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.rounds[0].number, 1);
        assert_eq!(result.rounds[1].number, 2);
        // Short round: +120*2 on the way in, -115*2 on the way out
        assert_eq!(result.rounds[1].profit, 10.0);
        assert_eq!(result.rounds[1].cum_final, 20.0);
        assert_eq!(result.rounds[1].final_balance, 10_020.0);
    }

    #[test]
    fn test_round_trip_dangling_open_rewrite() {
        let trades = vec![trade(1, Direction::Long, Offset::Open, 100.0, 1.0)];
        let frame = DailyFrame::new(vec![daily(1, 110.0, 0.0)], 10_000.0);

        let result =
            calculate_trade_result(&trades, &frame, 2.0, RateType::Fixed, 1.0, 0.5, 10_000.0)
                .unwrap();

        assert_eq!(result.rounds.len(), 1);
        let round = &result.rounds[0];
        // Marked to the final close instead of the raw cash flow
        assert_eq!(round.profit, 2.0 * (110.0 - 100.0) * 1.0);
        assert_eq!(round.commission, 2.0 * 1.0 * 1.0);
        assert_eq!(round.slippage, 2.0 * 2.0 * 0.5);
        assert_eq!(round.final_profit, 20.0 - 2.0 - 2.0);
    }

    #[test]
    fn test_round_trip_rewrite_only_touches_tail() {
        let trades = vec![
            trade(1, Direction::Long, Offset::Open, 100.0, 1.0),
            trade(2, Direction::Short, Offset::Close, 105.0, 1.0),
            trade(3, Direction::Short, Offset::Open, 120.0, 1.0),
        ];
        let frame = DailyFrame::new(
            vec![daily(1, 100.0, 0.0), daily(2, 105.0, 0.0), daily(3, 110.0, 0.0)],
            10_000.0,
        );

        let result =
            calculate_trade_result(&trades, &frame, 1.0, RateType::Float, 0.001, 0.0, 10_000.0)
                .unwrap();

        assert_eq!(result.rounds.len(), 2);
        // First round untouched by the rewrite
        assert_eq!(result.rounds[0].profit, 5.0);
        // Dangling short marked against the last close of 110
        let tail = &result.rounds[1];
        assert_eq!(tail.profit, (120.0 - 110.0) * 1.0);
        assert!((tail.commission - (110.0 + 120.0) * 1.0 * 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_trade_result_derived_statistics() {
        let trades = vec![
            trade(1, Direction::Long, Offset::Open, 100.0, 1.0),
            trade(2, Direction::Short, Offset::Close, 110.0, 1.0),
            trade(3, Direction::Long, Offset::Open, 110.0, 1.0),
            trade(4, Direction::Short, Offset::Close, 105.0, 1.0),
        ];
        let frame = DailyFrame::new(
            (1..=4).map(|d| daily(d, 105.0, 0.0)).collect(),
            10_000.0,
        );
        let result =
            calculate_trade_result(&trades, &frame, 1.0, RateType::Fixed, 0.0, 0.0, 10_000.0);

        let stats = calculate_statistics(Some(&frame), 10_000.0, result.as_ref());

        assert_eq!(stats.total_trade, 2);
        assert_eq!(stats.max_profit, 10.0);
        assert_eq!(stats.max_loss, -5.0);
        assert_eq!(stats.profit_times, 1);
        assert_eq!(stats.loss_times, 1);
        assert_eq!(stats.rate_of_win, 50.0);
        assert_eq!(stats.profit_loss_ratio, 2.0);
        assert_eq!(stats.final_profit, 5.0);
        assert_eq!(stats.final_balance, 10_005.0);
    }

    #[test]
    fn test_target_lookup() {
        let mut stats = BacktestStatistics::default();
        stats.sharpe_ratio = 1.5;
        stats.total_return = 12.0;

        assert_eq!(stats.target("sharpe_ratio"), Some(1.5));
        assert_eq!(stats.target("total_return"), Some(12.0));
        assert_eq!(stats.target("unknown_key"), None);
    }
}
