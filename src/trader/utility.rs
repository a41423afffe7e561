//! General utility functions and time-series helpers.

use chrono::Timelike;
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, Maximum, Minimum,
    RelativeStrengthIndex, SimpleMovingAverage, StandardDeviation,
};
use ta::{Close, High, Low, Next, Open, Volume};

use super::constant::{Exchange, Interval};
use super::object::{BarData, TickData};

/// Extract symbol and exchange from vt_symbol
pub fn extract_vt_symbol(vt_symbol: &str) -> Option<(String, Exchange)> {
    let (symbol, exchange_str) = vt_symbol.rsplit_once('.')?;
    let exchange = Exchange::from_value(exchange_str)?;
    Some((symbol.to_string(), exchange))
}

/// Generate vt_symbol from symbol and exchange
pub fn generate_vt_symbol(symbol: &str, exchange: Exchange) -> String {
    format!("{}.{}", symbol, exchange.value())
}

fn get_trader_dir(temp_name: &str) -> (PathBuf, PathBuf) {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let temp_path = cwd.join(temp_name);

    // A .btrader folder in the working directory takes precedence
    if temp_path.exists() {
        return (cwd, temp_path);
    }

    let home_path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let temp_path = home_path.join(temp_name);

    if !temp_path.exists() {
        let _ = fs::create_dir_all(&temp_path);
    }

    (home_path, temp_path)
}

/// Trader directory
pub static TRADER_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    let (trader_dir, _) = get_trader_dir(".btrader");
    trader_dir
});

/// Temp directory
pub static TEMP_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    let (_, temp_dir) = get_trader_dir(".btrader");
    temp_dir
});

/// Get path for temp file with filename
pub fn get_file_path(filename: &str) -> PathBuf {
    TEMP_DIR.join(filename)
}

/// Get path for temp folder with folder name
pub fn get_folder_path(folder_name: &str) -> PathBuf {
    let folder_path = TEMP_DIR.join(folder_name);
    if !folder_path.exists() {
        let _ = fs::create_dir_all(&folder_path);
    }
    folder_path
}

/// Load data from JSON file in temp path
pub fn load_json(filename: &str) -> HashMap<String, serde_json::Value> {
    let filepath = get_file_path(filename);

    if filepath.exists() {
        if let Ok(content) = fs::read_to_string(&filepath) {
            if let Ok(data) = serde_json::from_str(&content) {
                return data;
            }
        }
    }

    save_json(filename, &HashMap::new());
    HashMap::new()
}

/// Save data into JSON file in temp path
pub fn save_json(filename: &str, data: &HashMap<String, serde_json::Value>) {
    let filepath = get_file_path(filename);
    if let Ok(json) = serde_json::to_string_pretty(data) {
        let _ = fs::write(filepath, json);
    }
}

/// Round price to price tick value, midpoints away from zero
pub fn round_to(value: f64, target: f64) -> f64 {
    let decimal_value = Decimal::from_f64(value).unwrap_or_default();
    let decimal_target = Decimal::from_f64(target).unwrap_or(Decimal::ONE);

    if decimal_target.is_zero() {
        return value;
    }

    let result = (decimal_value / decimal_target)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        * decimal_target;
    result.to_f64().unwrap_or(value)
}

/// Floor price to price tick value
pub fn floor_to(value: f64, target: f64) -> f64 {
    let decimal_value = Decimal::from_f64(value).unwrap_or_default();
    let decimal_target = Decimal::from_f64(target).unwrap_or(Decimal::ONE);

    if decimal_target.is_zero() {
        return value;
    }

    let result = (decimal_value / decimal_target).floor() * decimal_target;
    result.to_f64().unwrap_or(value)
}

/// Ceil price to price tick value
pub fn ceil_to(value: f64, target: f64) -> f64 {
    let decimal_value = Decimal::from_f64(value).unwrap_or_default();
    let decimal_target = Decimal::from_f64(target).unwrap_or(Decimal::ONE);

    if decimal_target.is_zero() {
        return value;
    }

    let result = (decimal_value / decimal_target).ceil() * decimal_target;
    result.to_f64().unwrap_or(value)
}

/// Bar generator aggregating tick data into 1-minute bars.
pub struct BarGenerator<F>
where
    F: FnMut(BarData),
{
    bar: Option<BarData>,
    on_bar: F,
    last_tick: Option<TickData>,
}

impl<F> BarGenerator<F>
where
    F: FnMut(BarData),
{
    pub fn new(on_bar: F) -> Self {
        Self {
            bar: None,
            on_bar,
            last_tick: None,
        }
    }

    /// Update new tick data into generator
    pub fn update_tick(&mut self, tick: TickData) {
        // Filter tick data with 0 last price
        if tick.last_price == 0.0 {
            return;
        }

        let new_minute = match &self.bar {
            None => true,
            Some(bar) => {
                bar.datetime.minute() != tick.datetime.minute()
                    || bar.datetime.hour() != tick.datetime.hour()
                    || bar.datetime.date_naive() != tick.datetime.date_naive()
            }
        };

        if new_minute {
            if let Some(finished) = self.bar.take() {
                (self.on_bar)(Self::truncate_to_minute(finished));
            }
            self.bar = Some(BarData {
                gateway_name: tick.gateway_name.clone(),
                symbol: tick.symbol.clone(),
                exchange: tick.exchange,
                datetime: tick.datetime,
                interval: Some(Interval::Minute),
                volume: 0.0,
                turnover: 0.0,
                open_interest: tick.open_interest,
                open_price: tick.last_price,
                high_price: tick.last_price,
                low_price: tick.last_price,
                close_price: tick.last_price,
            });
        } else if let Some(bar) = &mut self.bar {
            bar.high_price = bar.high_price.max(tick.last_price);
            bar.low_price = bar.low_price.min(tick.last_price);
            bar.close_price = tick.last_price;
            bar.open_interest = tick.open_interest;
            bar.datetime = tick.datetime;
        }

        // Cumulative tick volume/turnover deltas feed the bar
        if let (Some(last_tick), Some(bar)) = (&self.last_tick, &mut self.bar) {
            bar.volume += (tick.volume - last_tick.volume).max(0.0);
            bar.turnover += (tick.turnover - last_tick.turnover).max(0.0);
        }

        self.last_tick = Some(tick);
    }

    /// Flush the working bar and call the callback immediately
    pub fn generate(&mut self) -> Option<BarData> {
        let bar = Self::truncate_to_minute(self.bar.take()?);
        (self.on_bar)(bar.clone());
        Some(bar)
    }

    fn truncate_to_minute(mut bar: BarData) -> BarData {
        if let Some(dt) = bar.datetime.with_second(0).and_then(|dt| dt.with_nanosecond(0)) {
            bar.datetime = dt;
        }
        bar
    }
}

/// Rolling time-series container of bar data with indicator helpers.
pub struct ArrayManager {
    count: usize,
    size: usize,
    inited: bool,

    pub open_array: Vec<f64>,
    pub high_array: Vec<f64>,
    pub low_array: Vec<f64>,
    pub close_array: Vec<f64>,
    pub volume_array: Vec<f64>,
}

/// OHLCV adapter for the ta indicator inputs
struct BarDataItem {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Open for BarDataItem {
    fn open(&self) -> f64 {
        self.open
    }
}

impl High for BarDataItem {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for BarDataItem {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for BarDataItem {
    fn close(&self) -> f64 {
        self.close
    }
}

impl Volume for BarDataItem {
    fn volume(&self) -> f64 {
        self.volume
    }
}

impl ArrayManager {
    pub fn new(size: usize) -> Self {
        Self {
            count: 0,
            size,
            inited: false,
            open_array: vec![0.0; size],
            high_array: vec![0.0; size],
            low_array: vec![0.0; size],
            close_array: vec![0.0; size],
            volume_array: vec![0.0; size],
        }
    }

    /// Whether enough bars have been seen to fill the window
    pub fn is_inited(&self) -> bool {
        self.inited
    }

    /// Update new bar data into array manager
    pub fn update_bar(&mut self, bar: &BarData) {
        self.count += 1;
        if !self.inited && self.count >= self.size {
            self.inited = true;
        }

        self.open_array.rotate_left(1);
        self.high_array.rotate_left(1);
        self.low_array.rotate_left(1);
        self.close_array.rotate_left(1);
        self.volume_array.rotate_left(1);

        let last = self.size - 1;
        self.open_array[last] = bar.open_price;
        self.high_array[last] = bar.high_price;
        self.low_array[last] = bar.low_price;
        self.close_array[last] = bar.close_price;
        self.volume_array[last] = bar.volume;
    }

    pub fn close(&self) -> &[f64] {
        &self.close_array
    }

    fn get_data_item(&self, i: usize) -> BarDataItem {
        BarDataItem {
            open: self.open_array[i],
            high: self.high_array[i],
            low: self.low_array[i],
            close: self.close_array[i],
            volume: self.volume_array[i],
        }
    }

    /// Simple Moving Average (SMA)
    pub fn sma(&self, n: usize) -> f64 {
        if n > self.size || n == 0 {
            return 0.0;
        }
        let mut indicator = SimpleMovingAverage::new(n).unwrap();
        let mut result = 0.0;
        for i in (self.size - n)..self.size {
            result = indicator.next(self.close_array[i]);
        }
        result
    }

    /// Exponential Moving Average (EMA)
    pub fn ema(&self, n: usize) -> f64 {
        if n > self.size || n == 0 {
            return 0.0;
        }
        let mut indicator = ExponentialMovingAverage::new(n).unwrap();
        let mut result = 0.0;
        for &close in &self.close_array {
            result = indicator.next(close);
        }
        result
    }

    /// Relative Strength Index (RSI)
    pub fn rsi(&self, n: usize) -> f64 {
        if n > self.size || n == 0 {
            return 0.0;
        }
        let mut indicator = RelativeStrengthIndex::new(n).unwrap();
        let mut result = 0.0;
        for &close in &self.close_array {
            result = indicator.next(close);
        }
        result
    }

    /// Standard Deviation (STDDEV)
    pub fn std(&self, n: usize) -> f64 {
        if n > self.size || n == 0 {
            return 0.0;
        }
        let mut indicator = StandardDeviation::new(n).unwrap();
        let mut result = 0.0;
        for i in (self.size - n)..self.size {
            result = indicator.next(self.close_array[i]);
        }
        result
    }

    /// Average True Range (ATR)
    pub fn atr(&self, n: usize) -> f64 {
        if n > self.size || n == 0 {
            return 0.0;
        }
        let mut indicator = AverageTrueRange::new(n).unwrap();
        let mut result = 0.0;
        for i in 0..self.size {
            result = indicator.next(&self.get_data_item(i));
        }
        result
    }

    /// Bollinger Bands, returns (middle, upper, lower)
    pub fn boll(&self, n: usize, dev: f64) -> (f64, f64, f64) {
        if n > self.size || n == 0 {
            return (0.0, 0.0, 0.0);
        }
        let mut indicator = BollingerBands::new(n, dev).unwrap();
        let mut result = (0.0, 0.0, 0.0);
        for i in (self.size - n)..self.size {
            let out = indicator.next(self.close_array[i]);
            result = (out.average, out.upper, out.lower);
        }
        result
    }

    /// Highest high over the last n bars
    pub fn highest(&self, n: usize) -> f64 {
        if n > self.size || n == 0 {
            return 0.0;
        }
        let mut indicator = Maximum::new(n).unwrap();
        let mut result = 0.0;
        for i in (self.size - n)..self.size {
            result = indicator.next(self.high_array[i]);
        }
        result
    }

    /// Lowest low over the last n bars
    pub fn lowest(&self, n: usize) -> f64 {
        if n > self.size || n == 0 {
            return 0.0;
        }
        let mut indicator = Minimum::new(n).unwrap();
        let mut result = 0.0;
        for i in (self.size - n)..self.size {
            result = indicator.next(self.low_array[i]);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_extract_vt_symbol() {
        let (symbol, exchange) = extract_vt_symbol("IF2401.CFFEX").unwrap();
        assert_eq!(symbol, "IF2401");
        assert_eq!(exchange, Exchange::Cffex);

        assert!(extract_vt_symbol("IF2401").is_none());
        assert!(extract_vt_symbol("IF2401.XXX").is_none());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(10.123, 0.01), 10.12);
        assert_eq!(round_to(10.125, 0.01), 10.13);
        assert_eq!(round_to(10.3, 0.5), 10.5);
        assert_eq!(round_to(10.2, 0.0), 10.2);
    }

    #[test]
    fn test_floor_ceil_to() {
        assert_eq!(floor_to(10.19, 0.05), 10.15);
        assert_eq!(ceil_to(10.11, 0.05), 10.15);
    }

    #[test]
    fn test_array_manager_indicators() {
        let mut am = ArrayManager::new(5);
        for i in 1..=5 {
            let mut bar = BarData::new(
                "BACKTESTING".to_string(),
                "IF2401".to_string(),
                Exchange::Cffex,
                Utc.with_ymd_and_hms(2024, 1, 1, 9, i, 0).unwrap(),
            );
            bar.open_price = i as f64;
            bar.high_price = i as f64 + 1.0;
            bar.low_price = i as f64 - 1.0;
            bar.close_price = i as f64;
            am.update_bar(&bar);
        }

        assert!(am.is_inited());
        assert_eq!(am.sma(5), 3.0);
        assert_eq!(am.highest(5), 6.0);
        assert_eq!(am.lowest(5), 0.0);
        assert!(am.std(5) > 0.0);
    }

    #[test]
    fn test_bar_generator_minute_rollover() {
        let mut bars = Vec::new();
        {
            let mut bg = BarGenerator::new(|bar| bars.push(bar));

            for (minute, second, price) in [(0, 10, 100.0), (0, 40, 101.0), (1, 5, 102.0)] {
                let mut tick = TickData::new(
                    "BACKTESTING".to_string(),
                    "IF2401".to_string(),
                    Exchange::Cffex,
                    Utc.with_ymd_and_hms(2024, 1, 1, 9, minute, second).unwrap(),
                );
                tick.last_price = price;
                bg.update_tick(tick);
            }
        }

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open_price, 100.0);
        assert_eq!(bars[0].close_price, 101.0);
        assert_eq!(bars[0].high_price, 101.0);
        assert_eq!(bars[0].datetime.second(), 0);
    }
}
