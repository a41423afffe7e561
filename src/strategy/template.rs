//! The contract the backtesting engine exposes to strategies.

use std::collections::BTreeMap;

use crate::backtesting::engine::BacktestingEngine;
use crate::trader::object::{BarData, OrderData, TickData, TradeData};

use super::base::{StopOrder, StrategyError};

/// Outcome of a strategy callback; an error aborts the run.
pub type StrategyResult = Result<(), StrategyError>;

/// Parameter mapping handed to a strategy at construction.
pub type StrategySetting = BTreeMap<String, f64>;

/// Factory building a fresh strategy instance from a setting mapping.
/// Used by the search drivers, which construct one strategy per worker.
pub type StrategyFactory = dyn Fn(&StrategySetting) -> Box<dyn CtaStrategy> + Send + Sync;

/// Callback set every strategy implements.
///
/// The engine owns the strategy instance for the duration of a run and
/// passes itself into every callback; order entry, cancellation, warm-up
/// requests and environment queries are methods on the engine
/// (`buy`/`sell`/`short`/`cover`, `cancel_order`, `cancel_all`,
/// `load_bar`/`load_tick`, `get_pricetick`, `write_log`, ...).
pub trait CtaStrategy: Send {
    /// Strategy author declaration
    fn author(&self) -> &str {
        ""
    }

    /// Names of the tunable parameters
    fn parameters(&self) -> &'static [&'static str] {
        &[]
    }

    /// Names of the runtime variables to surface
    fn variables(&self) -> &'static [&'static str] {
        &[]
    }

    /// Sub-minute bar window in seconds, when the strategy trades on
    /// second bars. `None` routes all bars to `on_bar`.
    fn second_window(&self) -> Option<u32> {
        None
    }

    /// Callback when the strategy is initialized. Warm-up horizons are
    /// requested here via `engine.load_bar` / `engine.load_tick`.
    fn on_init(&mut self, engine: &mut BacktestingEngine) -> StrategyResult;

    /// Callback when trading starts
    fn on_start(&mut self, _engine: &mut BacktestingEngine) -> StrategyResult {
        Ok(())
    }

    /// Callback when trading stops
    fn on_stop(&mut self, _engine: &mut BacktestingEngine) -> StrategyResult {
        Ok(())
    }

    /// Callback of new tick data update
    fn on_tick(&mut self, _engine: &mut BacktestingEngine, _tick: &TickData) -> StrategyResult {
        Ok(())
    }

    /// Callback of new bar data update
    fn on_bar(&mut self, _engine: &mut BacktestingEngine, _bar: &BarData) -> StrategyResult {
        Ok(())
    }

    /// Callback of new second bar data update, only invoked when
    /// `second_window` advertises a sub-minute window.
    fn on_second_bar(&mut self, _engine: &mut BacktestingEngine, _bar: &BarData) -> StrategyResult {
        Ok(())
    }

    /// Callback of new trade data update
    fn on_trade(&mut self, _engine: &mut BacktestingEngine, _trade: &TradeData) -> StrategyResult {
        Ok(())
    }

    /// Callback of new order data update
    fn on_order(&mut self, _engine: &mut BacktestingEngine, _order: &OrderData) -> StrategyResult {
        Ok(())
    }

    /// Callback of stop order update
    fn on_stop_order(
        &mut self,
        _engine: &mut BacktestingEngine,
        _stop_order: &StopOrder,
    ) -> StrategyResult {
        Ok(())
    }
}
