//! Strategy framework: the callback contract and its supporting types.

pub mod base;
pub mod template;

pub use base::{EngineType, StopOrder, StopOrderStatus, StrategyError, STOPORDER_PREFIX};
pub use template::{CtaStrategy, StrategyFactory, StrategyResult, StrategySetting};
