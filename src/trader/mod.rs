//! Trader module - platform-level building blocks.
//!
//! - **constant**: trading constants like Direction, Exchange, Interval
//! - **object**: data structures for TickData, BarData, OrderData, TradeData
//! - **setting**: global settings management
//! - **utility**: price snapping, vt_symbol helpers, BarGenerator, ArrayManager
//! - **logger**: logging utilities

pub mod constant;
pub mod logger;
pub mod object;
pub mod setting;
pub mod utility;

// Re-exports for convenience
pub use constant::{Direction, Exchange, Interval, Offset, OrderType, RateType, Status};
pub use logger::{init_logger, Logger, CRITICAL, DEBUG, ERROR, INFO, WARNING};
pub use object::{is_active_status, BarData, OrderData, TickData, TradeData};
pub use setting::{SettingValue, Settings, SETTINGS};
pub use utility::{
    ceil_to, extract_vt_symbol, floor_to, generate_vt_symbol, get_file_path, get_folder_path,
    load_json, round_to, save_json, ArrayManager, BarGenerator, TEMP_DIR, TRADER_DIR,
};
