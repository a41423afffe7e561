//! Backtesting engine.
//!
//! Replays a chronological sequence of bars or ticks through a strategy,
//! matches the strategy's orders against synthetic fills, and tracks
//! positions, cash and day-aligned mark-to-market results. A run is
//! strictly single-threaded and deterministic: the same configuration
//! over the same data produces identical results.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use indexmap::IndexMap;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::strategy::base::{EngineType, StopOrder, StopOrderStatus, STOPORDER_PREFIX};
use crate::strategy::template::CtaStrategy;
use crate::trader::constant::{Direction, Exchange, Interval, Offset, OrderType, RateType, Status};
use crate::trader::object::{BarData, OrderData, TickData, TradeData};
use crate::trader::utility::{extract_vt_symbol, round_to};

use super::base::{BacktestError, BacktestingMode, DailyResult};
use super::database::CachedHistoryLoader;
use super::optimize::OptimizeParams;
use super::statistics::{
    calculate_statistics, calculate_trade_result, BacktestStatistics, DailyFrame, TradeResultFrame,
};

/// Gateway sentinel carried by every order and trade of a backtest.
pub const GATEWAY_NAME: &str = "BACKTESTING";

/// Which strategy callback receives warm-up data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupCallback {
    Bar,
    SecondBar,
    Tick,
}

/// Cancel acknowledgement queued while the strategy is the active
/// callback; drained at the next dispatch point.
enum StrategyPush {
    Order(OrderData),
    Stop(StopOrder),
}

pub struct BacktestingEngine {
    vt_symbol: String,
    symbol: String,
    exchange: Exchange,
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    rate_type: RateType,
    rate: f64,
    slippage: f64,
    size: f64,
    pricetick: f64,
    capital: f64,
    mode: BacktestingMode,
    inverse: bool,

    strategy_name: String,
    strategy: Option<Box<dyn CtaStrategy>>,
    inited: bool,
    trading: bool,
    pos: f64,

    bar: Option<BarData>,
    tick: Option<TickData>,
    datetime: Option<DateTime<Utc>>,

    days: usize,
    callback: Option<WarmupCallback>,

    history_data: Vec<BarData>,
    tick_data: Vec<TickData>,

    stop_order_count: u64,
    stop_orders: IndexMap<String, StopOrder>,
    active_stop_orders: IndexMap<String, StopOrder>,

    limit_order_count: u64,
    limit_orders: IndexMap<String, OrderData>,
    active_limit_orders: IndexMap<String, OrderData>,

    trade_count: u64,
    trades: Vec<TradeData>,

    pending_pushes: VecDeque<StrategyPush>,

    logs: Vec<String>,
    daily_results: BTreeMap<NaiveDate, DailyResult>,
    daily_frame: Option<DailyFrame>,
}

impl BacktestingEngine {
    pub fn new() -> Self {
        Self {
            vt_symbol: String::new(),
            symbol: String::new(),
            exchange: Exchange::Local,
            interval: Interval::Minute,
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
            rate_type: RateType::Fixed,
            rate: 0.0,
            slippage: 0.0,
            size: 1.0,
            pricetick: 0.0,
            capital: 1_000_000.0,
            mode: BacktestingMode::Bar,
            inverse: false,
            strategy_name: String::new(),
            strategy: None,
            inited: false,
            trading: false,
            pos: 0.0,
            bar: None,
            tick: None,
            datetime: None,
            days: 0,
            callback: None,
            history_data: Vec::new(),
            tick_data: Vec::new(),
            stop_order_count: 0,
            stop_orders: IndexMap::new(),
            active_stop_orders: IndexMap::new(),
            limit_order_count: 0,
            limit_orders: IndexMap::new(),
            active_limit_orders: IndexMap::new(),
            trade_count: 0,
            trades: Vec::new(),
            pending_pushes: VecDeque::new(),
            logs: Vec::new(),
            daily_results: BTreeMap::new(),
            daily_frame: None,
        }
    }

    /// Clear all data of the last backtesting run.
    ///
    /// Required before the engine is reused after a strategy fault.
    pub fn clear_data(&mut self) {
        self.strategy = None;
        self.inited = false;
        self.trading = false;
        self.pos = 0.0;
        self.bar = None;
        self.tick = None;
        self.datetime = None;

        self.stop_order_count = 0;
        self.stop_orders.clear();
        self.active_stop_orders.clear();

        self.limit_order_count = 0;
        self.limit_orders.clear();
        self.active_limit_orders.clear();

        self.trade_count = 0;
        self.trades.clear();

        self.pending_pushes.clear();
        self.logs.clear();
        self.daily_results.clear();
        self.daily_frame = None;
    }

    /// Set backtesting parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn set_parameters(
        &mut self,
        vt_symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rate_type: RateType,
        rate: f64,
        slippage: f64,
        size: f64,
        pricetick: f64,
        capital: f64,
        mode: BacktestingMode,
        inverse: bool,
    ) -> Result<(), BacktestError> {
        let (symbol, exchange) = extract_vt_symbol(vt_symbol).ok_or_else(|| {
            BacktestError::InvalidParameter(format!("unrecognized vt_symbol: {vt_symbol}"))
        })?;

        self.vt_symbol = vt_symbol.to_string();
        self.symbol = symbol;
        self.exchange = exchange;
        self.interval = interval;
        self.start = start;
        self.end = end;
        self.rate_type = rate_type;
        self.rate = rate;
        self.slippage = slippage;
        self.size = size;
        self.pricetick = pricetick;
        self.capital = capital;
        self.mode = mode;
        self.inverse = inverse;
        Ok(())
    }

    /// Hand the strategy instance to the engine for the coming run.
    pub fn add_strategy(&mut self, strategy: Box<dyn CtaStrategy>, strategy_name: &str) {
        self.strategy = Some(strategy);
        self.strategy_name = strategy_name.to_string();
    }

    /// Inject an already-materialized bar history.
    pub fn set_history_data(&mut self, bars: Vec<BarData>) {
        self.history_data = bars;
    }

    /// Inject an already-materialized tick history.
    pub fn set_tick_data(&mut self, ticks: Vec<TickData>) {
        self.tick_data = ticks;
    }

    /// Load history through a provider in 30-day windows.
    pub fn load_data(&mut self, loader: &CachedHistoryLoader) -> Result<(), BacktestError> {
        self.write_log("Start loading history data");

        if self.start >= self.end {
            return Err(BacktestError::InvalidWindow);
        }

        self.history_data.clear();
        self.tick_data.clear();

        let progress_delta = Duration::days(30);
        let total_delta = self.end - self.start;
        let interval_delta = self.interval.delta();

        let mut start = self.start;
        let mut end = self.start + progress_delta;
        let mut progress: f64 = 0.0;

        while start < self.end {
            // Keep the window inside the configured range; the provider
            // de-duplicates at window boundaries.
            end = end.min(self.end);

            match self.mode {
                BacktestingMode::Bar => {
                    let bars = loader.load_bar_data(
                        &self.symbol,
                        self.exchange,
                        self.interval,
                        start,
                        end,
                    )?;
                    self.history_data.extend(bars);
                }
                BacktestingMode::Tick => {
                    let ticks = loader.load_tick_data(&self.symbol, self.exchange, start, end)?;
                    self.tick_data.extend(ticks);
                }
            }

            progress += progress_delta.num_milliseconds() as f64
                / total_delta.num_milliseconds().max(1) as f64;
            progress = progress.min(1.0);
            self.write_log(&format!("Loading progress: {:.0}%", progress * 100.0));

            start = end + interval_delta;
            end = end + progress_delta + interval_delta;
        }

        let count = match self.mode {
            BacktestingMode::Bar => self.history_data.len(),
            BacktestingMode::Tick => self.tick_data.len(),
        };
        self.write_log(&format!("History data loading finished, count: {count}"));
        Ok(())
    }

    /// Run the warm-up and replay phases.
    ///
    /// A strategy fault aborts the run; partial state stays inspectable
    /// but no statistics are published for it.
    pub fn run_backtesting(&mut self) -> Result<(), BacktestError> {
        let mut strategy = self.strategy.take().ok_or(BacktestError::MissingStrategy)?;

        let result = match self.mode {
            BacktestingMode::Bar => self.run_bar_replay(&mut strategy),
            BacktestingMode::Tick => self.run_tick_replay(&mut strategy),
        };

        self.strategy = Some(strategy);

        if let Err(err) = &result {
            self.write_log("Exception raised, backtesting terminated");
            let msg = err.to_string();
            self.write_log(&msg);
        }
        result
    }

    fn run_bar_replay(
        &mut self,
        strategy: &mut Box<dyn CtaStrategy>,
    ) -> Result<(), BacktestError> {
        strategy.on_init(self)?;

        // Warm-up: feed the head of the history to the strategy's
        // recorded callback until `days` calendar days have passed.
        let bars = self.history_data.clone();
        let mut ix = bars.len();
        let mut day_count = 0;

        for (i, bar) in bars.iter().enumerate() {
            if let Some(datetime) = self.datetime {
                if bar.datetime.date_naive() != datetime.date_naive() {
                    day_count += 1;
                    if day_count >= self.days {
                        ix = i;
                        break;
                    }
                }
            }

            self.datetime = Some(bar.datetime);
            self.warmup_bar(strategy, bar)?;
        }

        self.inited = true;
        self.write_log("Strategy initialization finished");

        strategy.on_start(self)?;
        self.flush_pending(strategy)?;
        self.trading = true;
        self.write_log("Start replaying history data");

        for bar in &bars[ix..] {
            self.new_bar(strategy, bar)?;
        }

        strategy.on_stop(self)?;
        self.flush_pending(strategy)?;
        self.trading = false;

        self.write_log("History data replay finished");
        Ok(())
    }

    fn run_tick_replay(
        &mut self,
        strategy: &mut Box<dyn CtaStrategy>,
    ) -> Result<(), BacktestError> {
        strategy.on_init(self)?;

        let ticks = self.tick_data.clone();
        let mut ix = ticks.len();
        let mut day_count = 0;

        for (i, tick) in ticks.iter().enumerate() {
            if let Some(datetime) = self.datetime {
                if tick.datetime.date_naive() != datetime.date_naive() {
                    day_count += 1;
                    if day_count >= self.days {
                        ix = i;
                        break;
                    }
                }
            }

            self.datetime = Some(tick.datetime);
            self.warmup_tick(strategy, tick)?;
        }

        self.inited = true;
        self.write_log("Strategy initialization finished");

        strategy.on_start(self)?;
        self.flush_pending(strategy)?;
        self.trading = true;
        self.write_log("Start replaying history data");

        for tick in &ticks[ix..] {
            self.new_tick(strategy, tick)?;
        }

        strategy.on_stop(self)?;
        self.flush_pending(strategy)?;
        self.trading = false;

        self.write_log("History data replay finished");
        Ok(())
    }

    fn warmup_bar(
        &mut self,
        strategy: &mut Box<dyn CtaStrategy>,
        bar: &BarData,
    ) -> Result<(), BacktestError> {
        match self.callback {
            Some(WarmupCallback::Bar) => strategy.on_bar(self, bar)?,
            Some(WarmupCallback::SecondBar) => strategy.on_second_bar(self, bar)?,
            Some(WarmupCallback::Tick) | None => {}
        }
        Ok(())
    }

    fn warmup_tick(
        &mut self,
        strategy: &mut Box<dyn CtaStrategy>,
        tick: &TickData,
    ) -> Result<(), BacktestError> {
        if let Some(WarmupCallback::Tick) = self.callback {
            strategy.on_tick(self, tick)?;
        }
        Ok(())
    }

    fn new_bar(
        &mut self,
        strategy: &mut Box<dyn CtaStrategy>,
        bar: &BarData,
    ) -> Result<(), BacktestError> {
        self.bar = Some(bar.clone());
        self.datetime = Some(bar.datetime);

        self.cross_limit_order(strategy)?;
        self.cross_stop_order(strategy)?;

        match strategy.second_window() {
            Some(window) if window < 60 => strategy.on_second_bar(self, bar)?,
            _ => strategy.on_bar(self, bar)?,
        }
        self.flush_pending(strategy)?;

        self.update_daily_close(bar.close_price);
        Ok(())
    }

    fn new_tick(
        &mut self,
        strategy: &mut Box<dyn CtaStrategy>,
        tick: &TickData,
    ) -> Result<(), BacktestError> {
        self.tick = Some(tick.clone());
        self.datetime = Some(tick.datetime);

        self.cross_limit_order(strategy)?;
        self.cross_stop_order(strategy)?;
        strategy.on_tick(self, tick)?;
        self.flush_pending(strategy)?;

        self.update_daily_close(tick.last_price);
        Ok(())
    }

    fn update_daily_close(&mut self, price: f64) {
        let Some(datetime) = self.datetime else {
            return;
        };
        let date = datetime.date_naive();

        match self.daily_results.get_mut(&date) {
            Some(daily_result) => daily_result.close_price = price,
            None => {
                self.daily_results.insert(date, DailyResult::new(date, price));
            }
        }
    }

    /// Cross resting limit orders against the current bar/tick.
    fn cross_limit_order(
        &mut self,
        strategy: &mut Box<dyn CtaStrategy>,
    ) -> Result<(), BacktestError> {
        let Some(datetime) = self.datetime else {
            return Ok(());
        };

        let (long_cross_price, short_cross_price, long_best_price, short_best_price) =
            match self.mode {
                BacktestingMode::Bar => {
                    let Some(bar) = &self.bar else {
                        return Ok(());
                    };
                    (bar.low_price, bar.high_price, bar.open_price, bar.open_price)
                }
                BacktestingMode::Tick => {
                    let Some(tick) = &self.tick else {
                        return Ok(());
                    };
                    (
                        tick.ask_price_1,
                        tick.bid_price_1,
                        tick.ask_price_1,
                        tick.bid_price_1,
                    )
                }
            };

        // Snapshot of ids: orders submitted by callbacks during this
        // pass rest until the next data point.
        let vt_orderids: Vec<String> = self.active_limit_orders.keys().cloned().collect();

        for vt_orderid in vt_orderids {
            let Some(mut order) = self.active_limit_orders.get(&vt_orderid).cloned() else {
                continue;
            };

            // Push order update with status "not traded" (resting).
            if order.status == Status::Submitting {
                order.status = Status::NotTraded;
                self.active_limit_orders.insert(vt_orderid.clone(), order.clone());
                self.limit_orders.insert(vt_orderid.clone(), order.clone());
                strategy.on_order(self, &order)?;
                self.flush_pending(strategy)?;

                if !self.active_limit_orders.contains_key(&vt_orderid) {
                    continue;
                }
            }

            let long_cross = order.direction == Direction::Long
                && order.price >= long_cross_price
                && long_cross_price > 0.0;
            let short_cross = order.direction == Direction::Short
                && order.price <= short_cross_price
                && short_cross_price > 0.0;

            if !long_cross && !short_cross {
                continue;
            }

            // Push order update with status "all traded" (filled).
            order.traded = order.volume;
            order.status = Status::AllTraded;
            self.limit_orders.insert(vt_orderid.clone(), order.clone());
            self.active_limit_orders.shift_remove(&vt_orderid);
            strategy.on_order(self, &order)?;

            // Gapped bars fill at the better of order price and open.
            self.trade_count += 1;
            let (trade_price, pos_change) = if long_cross {
                (order.price.min(long_best_price), order.volume)
            } else {
                (order.price.max(short_best_price), -order.volume)
            };

            let trade = TradeData {
                gateway_name: GATEWAY_NAME.to_string(),
                symbol: order.symbol.clone(),
                exchange: order.exchange,
                orderid: order.orderid.clone(),
                tradeid: self.trade_count.to_string(),
                direction: order.direction,
                offset: order.offset,
                price: trade_price,
                volume: order.volume,
                datetime,
            };

            self.trades.push(trade.clone());
            self.pos += pos_change;
            strategy.on_trade(self, &trade)?;
            self.flush_pending(strategy)?;
        }

        Ok(())
    }

    /// Cross resting stop orders against the current bar/tick.
    fn cross_stop_order(
        &mut self,
        strategy: &mut Box<dyn CtaStrategy>,
    ) -> Result<(), BacktestError> {
        let Some(datetime) = self.datetime else {
            return Ok(());
        };

        let (long_cross_price, short_cross_price, long_best_price, short_best_price) =
            match self.mode {
                BacktestingMode::Bar => {
                    let Some(bar) = &self.bar else {
                        return Ok(());
                    };
                    (bar.high_price, bar.low_price, bar.open_price, bar.open_price)
                }
                BacktestingMode::Tick => {
                    let Some(tick) = &self.tick else {
                        return Ok(());
                    };
                    (
                        tick.last_price,
                        tick.last_price,
                        tick.last_price,
                        tick.last_price,
                    )
                }
            };

        let stop_orderids: Vec<String> = self.active_stop_orders.keys().cloned().collect();

        for stop_orderid in stop_orderids {
            let Some(mut stop_order) = self.active_stop_orders.get(&stop_orderid).cloned() else {
                continue;
            };

            let long_cross =
                stop_order.direction == Direction::Long && stop_order.price <= long_cross_price;
            let short_cross =
                stop_order.direction == Direction::Short && stop_order.price >= short_cross_price;

            if !long_cross && !short_cross {
                continue;
            }

            // Synthesize an immediately-filled limit order.
            self.limit_order_count += 1;

            let order = OrderData {
                gateway_name: GATEWAY_NAME.to_string(),
                symbol: self.symbol.clone(),
                exchange: self.exchange,
                orderid: self.limit_order_count.to_string(),
                order_type: OrderType::Limit,
                direction: stop_order.direction,
                offset: stop_order.offset,
                price: stop_order.price,
                volume: stop_order.volume,
                traded: stop_order.volume,
                status: Status::AllTraded,
                datetime: Some(datetime),
                reference: stop_order.strategy_name.clone(),
            };
            let vt_orderid = order.vt_orderid();
            self.limit_orders.insert(vt_orderid.clone(), order.clone());

            // Stops fill at the worse of stop price and open.
            self.trade_count += 1;
            let (trade_price, pos_change) = if long_cross {
                (stop_order.price.max(long_best_price), order.volume)
            } else {
                (stop_order.price.min(short_best_price), -order.volume)
            };

            let trade = TradeData {
                gateway_name: GATEWAY_NAME.to_string(),
                symbol: order.symbol.clone(),
                exchange: order.exchange,
                orderid: order.orderid.clone(),
                tradeid: self.trade_count.to_string(),
                direction: order.direction,
                offset: order.offset,
                price: trade_price,
                volume: order.volume,
                datetime,
            };
            self.trades.push(trade.clone());

            stop_order.vt_orderids.push(vt_orderid);
            stop_order.status = StopOrderStatus::Triggered;
            self.stop_orders.insert(stop_orderid.clone(), stop_order.clone());
            self.active_stop_orders.shift_remove(&stop_orderid);

            strategy.on_stop_order(self, &stop_order)?;
            strategy.on_order(self, &order)?;

            self.pos += pos_change;
            strategy.on_trade(self, &trade)?;
            self.flush_pending(strategy)?;
        }

        Ok(())
    }

    fn flush_pending(
        &mut self,
        strategy: &mut Box<dyn CtaStrategy>,
    ) -> Result<(), BacktestError> {
        while let Some(push) = self.pending_pushes.pop_front() {
            match push {
                StrategyPush::Order(order) => strategy.on_order(self, &order)?,
                StrategyPush::Stop(stop_order) => strategy.on_stop_order(self, &stop_order)?,
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Order entry exposed to strategies
    // ------------------------------------------------------------------

    /// Send a buy order to open a long position.
    pub fn buy(&mut self, price: f64, volume: f64, stop: bool, lock: bool) -> Vec<String> {
        self.send_order(Direction::Long, Offset::Open, price, volume, stop, lock)
    }

    /// Send a sell order to close a long position.
    pub fn sell(&mut self, price: f64, volume: f64, stop: bool, lock: bool) -> Vec<String> {
        self.send_order(Direction::Short, Offset::Close, price, volume, stop, lock)
    }

    /// Send a short order to open a short position.
    pub fn short(&mut self, price: f64, volume: f64, stop: bool, lock: bool) -> Vec<String> {
        self.send_order(Direction::Short, Offset::Open, price, volume, stop, lock)
    }

    /// Send a cover order to close a short position.
    pub fn cover(&mut self, price: f64, volume: f64, stop: bool, lock: bool) -> Vec<String> {
        self.send_order(Direction::Long, Offset::Close, price, volume, stop, lock)
    }

    /// Send a new order; the price is snapped to the price tick.
    /// Returns an empty list while trading is disabled.
    pub fn send_order(
        &mut self,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: f64,
        stop: bool,
        _lock: bool,
    ) -> Vec<String> {
        if !self.trading {
            return Vec::new();
        }

        let price = round_to(price, self.pricetick);
        let vt_orderid = if stop {
            self.send_stop_order(direction, offset, price, volume)
        } else {
            self.send_limit_order(direction, offset, price, volume)
        };
        vec![vt_orderid]
    }

    fn send_stop_order(
        &mut self,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: f64,
    ) -> String {
        self.stop_order_count += 1;

        let stop_order = StopOrder {
            vt_symbol: self.vt_symbol.clone(),
            direction,
            offset,
            price,
            volume,
            stop_orderid: format!("{}.{}", STOPORDER_PREFIX, self.stop_order_count),
            strategy_name: self.strategy_name.clone(),
            lock: false,
            vt_orderids: Vec::new(),
            status: StopOrderStatus::Waiting,
            datetime: self.datetime,
        };

        self.active_stop_orders
            .insert(stop_order.stop_orderid.clone(), stop_order.clone());
        self.stop_orders
            .insert(stop_order.stop_orderid.clone(), stop_order.clone());

        stop_order.stop_orderid
    }

    fn send_limit_order(
        &mut self,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: f64,
    ) -> String {
        self.limit_order_count += 1;

        let order = OrderData {
            gateway_name: GATEWAY_NAME.to_string(),
            symbol: self.symbol.clone(),
            exchange: self.exchange,
            orderid: self.limit_order_count.to_string(),
            order_type: OrderType::Limit,
            direction,
            offset,
            price,
            volume,
            traded: 0.0,
            status: Status::Submitting,
            datetime: self.datetime,
            reference: self.strategy_name.clone(),
        };
        let vt_orderid = order.vt_orderid();

        self.active_limit_orders.insert(vt_orderid.clone(), order.clone());
        self.limit_orders.insert(vt_orderid.clone(), order);

        vt_orderid
    }

    /// Cancel one order; the id prefix decides whether the limit or the
    /// stop book is addressed. Cancelling a non-active id is a no-op.
    pub fn cancel_order(&mut self, vt_orderid: &str) {
        if !self.trading {
            return;
        }
        if vt_orderid.starts_with(STOPORDER_PREFIX) {
            self.cancel_stop_order(vt_orderid);
        } else {
            self.cancel_limit_order(vt_orderid);
        }
    }

    fn cancel_limit_order(&mut self, vt_orderid: &str) {
        let Some(mut order) = self.active_limit_orders.shift_remove(vt_orderid) else {
            return;
        };
        order.status = Status::Cancelled;
        self.limit_orders.insert(vt_orderid.to_string(), order.clone());
        self.pending_pushes.push_back(StrategyPush::Order(order));
    }

    fn cancel_stop_order(&mut self, vt_orderid: &str) {
        let Some(mut stop_order) = self.active_stop_orders.shift_remove(vt_orderid) else {
            return;
        };
        stop_order.status = StopOrderStatus::Cancelled;
        self.stop_orders
            .insert(vt_orderid.to_string(), stop_order.clone());
        self.pending_pushes.push_back(StrategyPush::Stop(stop_order));
    }

    /// Cancel all active orders, both limit and stop.
    pub fn cancel_all(&mut self) {
        if !self.trading {
            return;
        }

        let vt_orderids: Vec<String> = self.active_limit_orders.keys().cloned().collect();
        for vt_orderid in vt_orderids {
            self.cancel_limit_order(&vt_orderid);
        }

        let stop_orderids: Vec<String> = self.active_stop_orders.keys().cloned().collect();
        for stop_orderid in stop_orderids {
            self.cancel_stop_order(&stop_orderid);
        }
    }

    // ------------------------------------------------------------------
    // Warm-up requests and environment queries
    // ------------------------------------------------------------------

    /// Record the warm-up horizon for a bar strategy. In backtesting the
    /// warm-up data is the head of the already-loaded history.
    pub fn load_bar(
        &mut self,
        days: usize,
        _interval: Interval,
        _frequency: u32,
        callback: Option<WarmupCallback>,
        _use_database: bool,
    ) {
        self.days = days;
        self.callback = Some(callback.unwrap_or(WarmupCallback::Bar));
    }

    /// Record the warm-up horizon for a tick strategy.
    pub fn load_tick(&mut self, days: usize) {
        self.days = days;
        self.callback = Some(WarmupCallback::Tick);
    }

    pub fn get_engine_type(&self) -> EngineType {
        EngineType::Backtesting
    }

    pub fn get_pricetick(&self) -> f64 {
        self.pricetick
    }

    /// No-op in backtesting.
    pub fn send_email(&self, _msg: &str) {}

    /// No-op in backtesting.
    pub fn sync_strategy_data(&self) {}

    /// No-op in backtesting.
    pub fn put_strategy_event(&self) {}

    /// Append a log line to the engine transcript.
    pub fn write_log(&mut self, msg: &str) {
        tracing::info!(target: "backtesting", "{}", msg);
        let line = match self.datetime {
            Some(datetime) => format!("{datetime}\t{msg}"),
            None => format!("-\t{msg}"),
        };
        self.logs.push(line);
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Aggregate trades into the daily ledger and compute per-day PnL.
    /// Returns `None` when the run produced no trades.
    pub fn calculate_result(&mut self) -> Option<DailyFrame> {
        self.write_log("Start calculating daily mark-to-market PnL");

        if self.trades.is_empty() {
            self.write_log("Trade record is empty, unable to calculate");
            return None;
        }

        for daily_result in self.daily_results.values_mut() {
            daily_result.trades.clear();
        }
        for trade in self.trades.clone() {
            let date = trade.datetime.date_naive();
            if let Some(daily_result) = self.daily_results.get_mut(&date) {
                daily_result.add_trade(trade);
            }
        }

        let mut pre_close = 0.0;
        let mut start_pos = 0.0;

        for daily_result in self.daily_results.values_mut() {
            daily_result.calculate_pnl(
                pre_close,
                start_pos,
                self.size,
                self.rate_type,
                self.rate,
                self.slippage,
                self.inverse,
            );

            pre_close = daily_result.close_price;
            start_pos = daily_result.end_pos;
        }

        let frame = DailyFrame::new(self.daily_results.values().cloned().collect(), self.capital);
        self.daily_frame = Some(frame.clone());

        self.write_log("Daily mark-to-market PnL calculation finished");
        Some(frame)
    }

    /// Reconstruct round trips from the trade ledger.
    pub fn calculate_trade_result(&self) -> Option<TradeResultFrame> {
        let frame = self.daily_frame.as_ref()?;
        calculate_trade_result(
            &self.trades,
            frame,
            self.size,
            self.rate_type,
            self.rate,
            self.slippage,
            self.capital,
        )
    }

    /// Compute summary statistics over the daily series and the round
    /// trips. All values are finite; non-finite intermediates become 0.
    pub fn calculate_statistics(&mut self, output: bool) -> BacktestStatistics {
        self.write_log("Start calculating strategy statistics");

        let trade_result = self.calculate_trade_result();
        let statistics = calculate_statistics(
            self.daily_frame.as_ref(),
            self.capital,
            trade_result.as_ref(),
        );

        if output {
            self.output_statistics(&statistics);
        }

        self.write_log("Strategy statistics calculation finished");
        statistics
    }

    fn output_statistics(&mut self, stats: &BacktestStatistics) {
        let lines = [
            "-".repeat(30),
            format!("First trading day:\t{}", stats.start_date),
            format!("Last trading day:\t{}", stats.end_date),
            format!("Total trading days:\t{}", stats.total_days),
            format!("Profit days:\t{}", stats.profit_days),
            format!("Loss days:\t{}", stats.loss_days),
            format!("Start balance:\t{:.2}", stats.capital),
            format!("End balance:\t{:.2}", stats.end_balance),
            format!("Total return:\t{:.2}%", stats.total_return),
            format!("Annual return:\t{:.2}%", stats.annual_return),
            format!("Max drawdown:\t{:.2}", stats.max_drawdown),
            format!("Max ddpercent:\t{:.2}%", stats.max_ddpercent),
            format!("Max drawdown duration:\t{}", stats.max_drawdown_duration),
            format!("Total net pnl:\t{:.2}", stats.total_net_pnl),
            format!("Total commission:\t{:.2}", stats.total_commission),
            format!("Total slippage:\t{:.2}", stats.total_slippage),
            format!("Total turnover:\t{:.2}", stats.total_turnover),
            format!("Total trade count:\t{}", stats.total_trade_count),
            format!("Daily net pnl:\t{:.2}", stats.daily_net_pnl),
            format!("Daily return:\t{:.2}%", stats.daily_return),
            format!("Return std:\t{:.2}%", stats.return_std),
            format!("Sharpe ratio:\t{:.2}", stats.sharpe_ratio),
            format!("Return/drawdown ratio:\t{:.2}", stats.return_drawdown_ratio),
            format!("Round trips:\t{}", stats.total_trade),
            format!("Max round profit:\t{:.2}", stats.max_profit),
            format!("Max round loss:\t{:.2}", stats.max_loss),
            format!("Win rate:\t{:.2}%", stats.rate_of_win),
            format!("Profit/loss ratio:\t{:.2}", stats.profit_loss_ratio),
            format!("Final balance:\t{:.2}", stats.final_balance),
        ];
        for line in lines {
            self.write_log(&line);
        }
    }

    // ------------------------------------------------------------------
    // State accessors
    // ------------------------------------------------------------------

    pub fn vt_symbol(&self) -> &str {
        &self.vt_symbol
    }

    /// Net position held by the strategy.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    pub fn inited(&self) -> bool {
        self.inited
    }

    pub fn trading(&self) -> bool {
        self.trading
    }

    pub fn get_all_trades(&self) -> &[TradeData] {
        &self.trades
    }

    pub fn get_all_orders(&self) -> Vec<OrderData> {
        self.limit_orders.values().cloned().collect()
    }

    pub fn get_all_stop_orders(&self) -> Vec<StopOrder> {
        self.stop_orders.values().cloned().collect()
    }

    pub fn get_all_daily_results(&self) -> Vec<DailyResult> {
        self.daily_results.values().cloned().collect()
    }

    pub fn get_logs(&self) -> &[String] {
        &self.logs
    }

    pub fn daily_frame(&self) -> Option<&DailyFrame> {
        self.daily_frame.as_ref()
    }

    /// Snapshot of the configuration and data a search worker needs to
    /// rerun this backtest as a pure function.
    pub fn optimize_params(&self) -> OptimizeParams {
        OptimizeParams {
            vt_symbol: self.vt_symbol.clone(),
            interval: self.interval,
            start: self.start,
            end: self.end,
            rate_type: self.rate_type,
            rate: self.rate,
            slippage: self.slippage,
            size: self.size,
            pricetick: self.pricetick,
            capital: self.capital,
            mode: self.mode,
            inverse: self.inverse,
            history_data: Arc::new(self.history_data.clone()),
            tick_data: Arc::new(self.tick_data.clone()),
        }
    }
}

impl Default for BacktestingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::database::MemoryHistory;
    use super::*;
    use crate::strategy::base::StrategyError;
    use crate::strategy::template::StrategyResult;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    fn bar(day: u32, minute: u32, open: f64, high: f64, low: f64, close: f64) -> BarData {
        let mut bar = BarData::new(
            GATEWAY_NAME.to_string(),
            "IF2401".to_string(),
            Exchange::Cffex,
            Utc.with_ymd_and_hms(2024, 1, day, 9, minute, 0).unwrap(),
        );
        bar.interval = Some(Interval::Minute);
        bar.open_price = open;
        bar.high_price = high;
        bar.low_price = low;
        bar.close_price = close;
        bar
    }

    fn flat_bar(day: u32, minute: u32, price: f64) -> BarData {
        bar(day, minute, price, price, price, price)
    }

    fn test_engine(mode: BacktestingMode) -> BacktestingEngine {
        let mut engine = BacktestingEngine::new();
        engine
            .set_parameters(
                "IF2401.CFFEX",
                Interval::Minute,
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
                RateType::Fixed,
                0.0,
                0.0,
                1.0,
                0.0,
                1_000_000.0,
                mode,
                false,
            )
            .unwrap();
        engine.strategy_name = "TestStrategy".to_string();
        engine
    }

    #[derive(Clone, Debug)]
    enum Action {
        Buy { price: f64, volume: f64, stop: bool },
        Sell { price: f64, volume: f64, stop: bool },
        CancelAll,
    }

    #[derive(Default)]
    struct RecorderState {
        orders: Vec<OrderData>,
        stop_orders: Vec<StopOrder>,
        trades: Vec<TradeData>,
        pos_change_sum: f64,
        warmup_bars: usize,
        run_bars: usize,
        second_bars: usize,
    }

    /// Scripted strategy: executes actions keyed by run-phase bar index
    /// and records everything pushed back by the engine.
    struct Recorder {
        warmup_days: usize,
        actions: BTreeMap<usize, Vec<Action>>,
        second_window: Option<u32>,
        bar_index: usize,
        state: Arc<Mutex<RecorderState>>,
    }

    impl Recorder {
        fn new(warmup_days: usize, actions: BTreeMap<usize, Vec<Action>>) -> (Self, Arc<Mutex<RecorderState>>) {
            let state = Arc::new(Mutex::new(RecorderState::default()));
            (
                Self {
                    warmup_days,
                    actions,
                    second_window: None,
                    bar_index: 0,
                    state: Arc::clone(&state),
                },
                state,
            )
        }

        fn run_actions(&mut self, engine: &mut BacktestingEngine) {
            if let Some(actions) = self.actions.get(&self.bar_index).cloned() {
                for action in actions {
                    match action {
                        Action::Buy { price, volume, stop } => {
                            engine.buy(price, volume, stop, false);
                        }
                        Action::Sell { price, volume, stop } => {
                            engine.sell(price, volume, stop, false);
                        }
                        Action::CancelAll => engine.cancel_all(),
                    }
                }
            }
            self.bar_index += 1;
        }
    }

    impl CtaStrategy for Recorder {
        fn second_window(&self) -> Option<u32> {
            self.second_window
        }

        fn on_init(&mut self, engine: &mut BacktestingEngine) -> StrategyResult {
            engine.load_bar(self.warmup_days, Interval::Minute, 60, None, false);
            Ok(())
        }

        fn on_bar(&mut self, engine: &mut BacktestingEngine, _bar: &BarData) -> StrategyResult {
            if engine.trading() {
                self.state.lock().unwrap().run_bars += 1;
                self.run_actions(engine);
            } else {
                self.state.lock().unwrap().warmup_bars += 1;
            }
            Ok(())
        }

        fn on_second_bar(
            &mut self,
            engine: &mut BacktestingEngine,
            _bar: &BarData,
        ) -> StrategyResult {
            self.state.lock().unwrap().second_bars += 1;
            if engine.trading() {
                self.run_actions(engine);
            }
            Ok(())
        }

        fn on_trade(&mut self, _engine: &mut BacktestingEngine, trade: &TradeData) -> StrategyResult {
            let mut state = self.state.lock().unwrap();
            state.pos_change_sum += match trade.direction {
                Direction::Long => trade.volume,
                Direction::Short => -trade.volume,
            };
            state.trades.push(trade.clone());
            Ok(())
        }

        fn on_order(&mut self, _engine: &mut BacktestingEngine, order: &OrderData) -> StrategyResult {
            self.state.lock().unwrap().orders.push(order.clone());
            Ok(())
        }

        fn on_stop_order(
            &mut self,
            _engine: &mut BacktestingEngine,
            stop_order: &StopOrder,
        ) -> StrategyResult {
            self.state.lock().unwrap().stop_orders.push(stop_order.clone());
            Ok(())
        }
    }

    fn recorder_box(warmup_days: usize) -> (Box<dyn CtaStrategy>, Arc<Mutex<RecorderState>>) {
        let (recorder, state) = Recorder::new(warmup_days, BTreeMap::new());
        (Box::new(recorder), state)
    }

    #[test]
    fn test_limit_fill_at_order_price() {
        let mut engine = test_engine(BacktestingMode::Bar);
        let (mut strategy, state) = recorder_box(0);

        engine.trading = true;
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap());
        let ids = engine.buy(10.0, 1.0, false, false);
        assert_eq!(ids, vec!["BACKTESTING.1".to_string()]);

        engine.bar = Some(bar(2, 1, 10.0, 12.0, 9.0, 11.0));
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 1, 0).unwrap());
        engine.cross_limit_order(&mut strategy).unwrap();

        assert_eq!(engine.trades.len(), 1);
        assert_eq!(engine.trades[0].price, 10.0);
        assert_eq!(engine.pos, 1.0);
        assert!(engine.active_limit_orders.is_empty());

        let state = state.lock().unwrap();
        // NotTraded ack then AllTraded fill
        assert_eq!(state.orders.len(), 2);
        assert_eq!(state.orders[0].status, Status::NotTraded);
        assert_eq!(state.orders[1].status, Status::AllTraded);
        assert_eq!(state.orders[1].traded, 1.0);
    }

    #[test]
    fn test_limit_fill_improves_on_gap() {
        let mut engine = test_engine(BacktestingMode::Bar);
        let (mut strategy, _state) = recorder_box(0);

        engine.trading = true;
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap());
        engine.buy(10.0, 1.0, false, false);

        // Bar gapped below the limit: fill at the open, not the limit
        engine.bar = Some(bar(2, 1, 8.0, 9.0, 7.0, 8.0));
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 1, 0).unwrap());
        engine.cross_limit_order(&mut strategy).unwrap();

        assert_eq!(engine.trades.len(), 1);
        assert_eq!(engine.trades[0].price, 8.0);
        assert!(engine.trades[0].price <= 10.0);
    }

    #[test]
    fn test_stop_trigger_and_fill_bound() {
        let mut engine = test_engine(BacktestingMode::Bar);
        let (mut strategy, state) = recorder_box(0);

        engine.trading = true;
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap());
        let ids = engine.buy(11.0, 1.0, true, false);
        assert_eq!(ids, vec!["STOP.1".to_string()]);

        // First bar stays below the trigger
        engine.bar = Some(flat_bar(2, 1, 10.0));
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 1, 0).unwrap());
        engine.cross_stop_order(&mut strategy).unwrap();
        assert!(engine.trades.is_empty());
        assert_eq!(engine.active_stop_orders.len(), 1);

        // Second bar trades through it
        engine.bar = Some(bar(2, 2, 11.0, 12.0, 10.0, 11.0));
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 2, 0).unwrap());
        engine.cross_stop_order(&mut strategy).unwrap();

        assert_eq!(engine.trades.len(), 1);
        assert_eq!(engine.trades[0].price, 11.0);
        assert!(engine.trades[0].price >= 11.0);
        assert_eq!(engine.pos, 1.0);
        assert!(engine.active_stop_orders.is_empty());

        let state = state.lock().unwrap();
        assert_eq!(state.stop_orders.len(), 1);
        assert_eq!(state.stop_orders[0].status, StopOrderStatus::Triggered);
        assert_eq!(state.stop_orders[0].vt_orderids.len(), 1);
        // Synthesized order arrives already filled
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.orders[0].status, Status::AllTraded);
        assert_eq!(state.orders[0].traded, state.orders[0].volume);
    }

    #[test]
    fn test_stop_fill_penalized_by_gap() {
        let mut engine = test_engine(BacktestingMode::Bar);
        let (mut strategy, _state) = recorder_box(0);

        engine.trading = true;
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap());
        engine.buy(11.0, 1.0, true, false);

        // Open gapped above the stop: fill at the open
        engine.bar = Some(bar(2, 1, 13.0, 14.0, 12.0, 13.0));
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 1, 0).unwrap());
        engine.cross_stop_order(&mut strategy).unwrap();

        assert_eq!(engine.trades.len(), 1);
        assert_eq!(engine.trades[0].price, 13.0);
    }

    #[test]
    fn test_tick_mode_crossing_prices() {
        let mut engine = test_engine(BacktestingMode::Tick);
        let (mut strategy, _state) = recorder_box(0);

        engine.trading = true;
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap());
        engine.buy(10.0, 1.0, false, false);
        engine.sell(9.0, 1.0, false, false);

        let mut tick = TickData::new(
            GATEWAY_NAME.to_string(),
            "IF2401".to_string(),
            Exchange::Cffex,
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 1).unwrap(),
        );
        tick.last_price = 9.85;
        tick.bid_price_1 = 9.8;
        tick.ask_price_1 = 9.9;
        engine.tick = Some(tick);
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 1).unwrap());

        engine.cross_limit_order(&mut strategy).unwrap();

        assert_eq!(engine.trades.len(), 2);
        // Long fills at the ask, short at the bid
        assert_eq!(engine.trades[0].price, 9.9);
        assert_eq!(engine.trades[1].price, 9.8);
        assert_eq!(engine.pos, 0.0);
    }

    #[test]
    fn test_order_rejected_while_not_trading() {
        let mut engine = test_engine(BacktestingMode::Bar);
        assert!(engine.buy(10.0, 1.0, false, false).is_empty());
        assert!(engine.sell(10.0, 1.0, true, false).is_empty());
        assert!(engine.active_limit_orders.is_empty());
        assert!(engine.active_stop_orders.is_empty());
    }

    #[test]
    fn test_price_snapped_to_pricetick() {
        let mut engine = test_engine(BacktestingMode::Bar);
        engine.pricetick = 0.2;
        engine.trading = true;

        engine.buy(10.31, 1.0, false, false);
        let order = engine.active_limit_orders.values().next().unwrap();
        assert!((order.price - 10.4).abs() < 1e-12);
    }

    #[test]
    fn test_cancel_dispatch_and_single_ack() {
        let mut engine = test_engine(BacktestingMode::Bar);
        let (mut strategy, state) = recorder_box(0);

        engine.trading = true;
        engine.datetime = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap());
        let limit_ids = engine.buy(10.0, 1.0, false, false);
        let stop_ids = engine.sell(9.0, 1.0, true, false);

        engine.cancel_order(&stop_ids[0]);
        engine.cancel_order(&limit_ids[0]);
        // Cancelling a non-active id is a no-op
        engine.cancel_order("BACKTESTING.99");
        engine.cancel_order("STOP.99");

        assert!(engine.active_limit_orders.is_empty());
        assert!(engine.active_stop_orders.is_empty());

        engine.flush_pending(&mut strategy).unwrap();
        engine.flush_pending(&mut strategy).unwrap();

        let state = state.lock().unwrap();
        // Each cancellation acknowledged exactly once
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.orders[0].status, Status::Cancelled);
        assert_eq!(state.stop_orders.len(), 1);
        assert_eq!(state.stop_orders[0].status, StopOrderStatus::Cancelled);
    }

    #[test]
    fn test_second_bar_routing() {
        let mut engine = test_engine(BacktestingMode::Bar);
        let (mut recorder, state) = Recorder::new(0, BTreeMap::new());
        recorder.second_window = Some(15);
        let mut strategy: Box<dyn CtaStrategy> = Box::new(recorder);

        engine.trading = true;
        engine.new_bar(&mut strategy, &flat_bar(2, 0, 10.0)).unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.second_bars, 1);
        assert_eq!(state.run_bars, 0);
    }

    fn two_day_history() -> Vec<BarData> {
        vec![
            // Day 1: warm-up
            flat_bar(2, 0, 100.0),
            flat_bar(2, 1, 101.0),
            flat_bar(2, 2, 102.0),
            // Day 2: run phase
            flat_bar(3, 0, 103.0),
            bar(3, 1, 104.0, 105.0, 103.0, 105.0),
            bar(3, 2, 105.0, 106.0, 104.0, 106.0),
        ]
    }

    fn scripted_run(actions: BTreeMap<usize, Vec<Action>>) -> (BacktestingEngine, Arc<Mutex<RecorderState>>) {
        let mut engine = test_engine(BacktestingMode::Bar);
        engine.set_history_data(two_day_history());

        let (recorder, state) = Recorder::new(1, actions);
        engine.add_strategy(Box::new(recorder), "TestStrategy");
        engine.run_backtesting().unwrap();
        (engine, state)
    }

    #[test]
    fn test_full_run_warmup_and_fill() {
        let mut actions = BTreeMap::new();
        actions.insert(
            0usize,
            vec![Action::Buy {
                price: 200.0,
                volume: 1.0,
                stop: false,
            }],
        );
        let (mut engine, state) = scripted_run(actions);

        {
            let state = state.lock().unwrap();
            // Day 1 consumed by warm-up, day 2 replayed
            assert_eq!(state.warmup_bars, 3);
            assert_eq!(state.run_bars, 3);
            assert_eq!(state.trades.len(), 1);
            // Order placed on the first run bar fills at the next open
            assert_eq!(state.trades[0].price, 104.0);
            // Conservation of position
            assert_eq!(state.pos_change_sum, engine.pos());
        }
        assert_eq!(engine.pos(), 1.0);

        // The daily ledger covers the run phase only
        let frame = engine.calculate_result().unwrap();
        assert_eq!(frame.len(), 1);

        let stats = engine.calculate_statistics(false);
        assert_eq!(stats.total_days, 1);
        assert_eq!(stats.total_trade_count, 1);
        // Daily aggregation identity
        assert!((stats.total_net_pnl - (stats.end_balance - stats.capital)).abs() < 1e-9);
        // Long entry at 104 marked to the final close of 106
        assert!((stats.total_net_pnl - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_run_is_deterministic() {
        let run = || {
            let mut actions = BTreeMap::new();
            actions.insert(
                0usize,
                vec![
                    Action::Buy {
                        price: 200.0,
                        volume: 1.0,
                        stop: false,
                    },
                    Action::Sell {
                        price: 1.0,
                        volume: 1.0,
                        stop: true,
                    },
                ],
            );
            actions.insert(1usize, vec![Action::CancelAll]);
            let (mut engine, _state) = scripted_run(actions);
            engine.calculate_result();
            engine.calculate_statistics(false)
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_empty_history_run_produces_no_statistics() {
        let mut engine = test_engine(BacktestingMode::Bar);
        let (strategy, state) = recorder_box(1);
        engine.add_strategy(strategy, "TestStrategy");

        engine.run_backtesting().unwrap();

        assert!(engine.get_all_trades().is_empty());
        assert!(engine.calculate_result().is_none());
        let stats = engine.calculate_statistics(false);
        assert_eq!(stats.total_days, 0);
        assert_eq!(state.lock().unwrap().run_bars, 0);
    }

    struct FaultyStrategy;

    impl CtaStrategy for FaultyStrategy {
        fn on_init(&mut self, engine: &mut BacktestingEngine) -> StrategyResult {
            engine.load_bar(1, Interval::Minute, 60, None, false);
            Ok(())
        }

        fn on_bar(&mut self, engine: &mut BacktestingEngine, _bar: &BarData) -> StrategyResult {
            if engine.trading() {
                return Err(StrategyError::new("deliberate fault"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_strategy_fault_aborts_run() {
        let mut engine = test_engine(BacktestingMode::Bar);
        engine.set_history_data(two_day_history());
        engine.add_strategy(Box::new(FaultyStrategy), "FaultyStrategy");

        let result = engine.run_backtesting();
        assert!(matches!(result, Err(BacktestError::Strategy(_))));
        // Logs remain inspectable after the abort
        assert!(engine
            .get_logs()
            .iter()
            .any(|line| line.contains("backtesting terminated")));

        engine.clear_data();
        assert!(engine.get_logs().is_empty());
        assert!(engine.get_all_trades().is_empty());
    }

    #[test]
    fn test_run_without_strategy_fails() {
        let mut engine = test_engine(BacktestingMode::Bar);
        assert!(matches!(
            engine.run_backtesting(),
            Err(BacktestError::MissingStrategy)
        ));
    }

    #[test]
    fn test_load_data_chunks_through_cache() {
        let mut history = MemoryHistory::new();
        history.add_bars(two_day_history());
        let loader = CachedHistoryLoader::new(Box::new(history));

        let mut engine = test_engine(BacktestingMode::Bar);
        engine.load_data(&loader).unwrap();
        assert_eq!(engine.history_data.len(), 6);

        // Cached reload returns an equal dataset
        let first: Vec<DateTime<Utc>> = engine.history_data.iter().map(|b| b.datetime).collect();
        engine.load_data(&loader).unwrap();
        let second: Vec<DateTime<Utc>> = engine.history_data.iter().map(|b| b.datetime).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_data_rejects_inverted_window() {
        let mut engine = test_engine(BacktestingMode::Bar);
        engine.start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        engine.end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let loader = CachedHistoryLoader::new(Box::new(MemoryHistory::new()));
        assert!(matches!(
            engine.load_data(&loader),
            Err(BacktestError::InvalidWindow)
        ));
    }
}
