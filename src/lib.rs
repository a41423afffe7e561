//! An event-driven backtesting engine for quantitative trading
//! strategies.
//!
//! The crate provides:
//!
//! - Market data and trading domain objects (ticks, bars, orders, trades)
//! - A deterministic replay engine with limit and stop order matching
//! - Day-aligned mark-to-market accounting and performance statistics
//! - Round-trip trade reconstruction
//! - Grid and genetic parameter search over strategy settings
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use backtest_engine::backtesting::{BacktestingEngine, BacktestingMode};
//! use backtest_engine::trader::{Interval, RateType};
//! use chrono::{TimeZone, Utc};
//!
//! let mut engine = BacktestingEngine::new();
//! engine
//!     .set_parameters(
//!         "IF2401.CFFEX",
//!         Interval::Minute,
//!         Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//!         Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
//!         RateType::Float,
//!         0.000025,
//!         0.2,
//!         300.0,
//!         0.2,
//!         1_000_000.0,
//!         BacktestingMode::Bar,
//!         false,
//!     )
//!     .unwrap();
//! ```

pub mod backtesting;
pub mod strategy;
pub mod trader;

// Re-export commonly used types
pub use backtesting::{
    BacktestError, BacktestStatistics, BacktestingEngine, BacktestingMode, CachedHistoryLoader,
    DailyFrame, DailyResult, GaSetting, HistoryProvider, MemoryHistory, OptimizationResult,
    OptimizationSetting, OptimizeParams, TradeResultFrame, WarmupCallback,
};
pub use strategy::{
    CtaStrategy, EngineType, StopOrder, StopOrderStatus, StrategyError, StrategyResult,
    StrategySetting, STOPORDER_PREFIX,
};
pub use trader::{
    BarData, Direction, Exchange, Interval, Offset, OrderData, OrderType, RateType, Status,
    TickData, TradeData,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
