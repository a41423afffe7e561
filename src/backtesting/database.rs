//! Historical data access for backtesting.
//!
//! The engine consumes already-materialized chronological sequences; the
//! provider behind this interface is free to read a database, a file, or
//! memory. Loads are memoized so repeated backtests over the same window
//! inside one process hit the cache.

use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::trader::constant::{Exchange, Interval};
use crate::trader::object::{BarData, TickData};

use super::base::BacktestError;

/// Bounded size of each load cache.
const LOADER_CACHE_SIZE: usize = 999;

type BarKey = (String, Exchange, Interval, DateTime<Utc>, DateTime<Utc>);
type TickKey = (String, Exchange, DateTime<Utc>, DateTime<Utc>);

/// Source of historical bar and tick sequences.
///
/// Returned sequences are sorted by datetime and inclusive of both
/// endpoints; an empty result is valid.
pub trait HistoryProvider: Send + Sync {
    fn load_bar_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BarData>, BacktestError>;

    fn load_tick_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TickData>, BacktestError>;
}

/// Memoizing wrapper over a [`HistoryProvider`].
///
/// A cache hit returns a result equal to a miss; the cache only trades
/// memory for repeated provider round trips.
pub struct CachedHistoryLoader {
    provider: Box<dyn HistoryProvider>,
    bar_cache: Mutex<LruCache<BarKey, Vec<BarData>>>,
    tick_cache: Mutex<LruCache<TickKey, Vec<TickData>>>,
}

impl CachedHistoryLoader {
    pub fn new(provider: Box<dyn HistoryProvider>) -> Self {
        let capacity = NonZeroUsize::new(LOADER_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            bar_cache: Mutex::new(LruCache::new(capacity)),
            tick_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn load_bar_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BarData>, BacktestError> {
        let key = (symbol.to_string(), exchange, interval, start, end);

        if let Ok(mut cache) = self.bar_cache.lock() {
            if let Some(bars) = cache.get(&key) {
                return Ok(bars.clone());
            }
        }

        let bars = self
            .provider
            .load_bar_data(symbol, exchange, interval, start, end)?;

        if let Ok(mut cache) = self.bar_cache.lock() {
            cache.put(key, bars.clone());
        }

        Ok(bars)
    }

    pub fn load_tick_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TickData>, BacktestError> {
        let key = (symbol.to_string(), exchange, start, end);

        if let Ok(mut cache) = self.tick_cache.lock() {
            if let Some(ticks) = cache.get(&key) {
                return Ok(ticks.clone());
            }
        }

        let ticks = self.provider.load_tick_data(symbol, exchange, start, end)?;

        if let Ok(mut cache) = self.tick_cache.lock() {
            cache.put(key, ticks.clone());
        }

        Ok(ticks)
    }

    /// Drop all memoized loads.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.bar_cache.lock() {
            cache.clear();
        }
        if let Ok(mut cache) = self.tick_cache.lock() {
            cache.clear();
        }
    }
}

/// In-memory history provider, used by tests and UI-less embedding.
#[derive(Default)]
pub struct MemoryHistory {
    bars: Vec<BarData>,
    ticks: Vec<TickData>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(bars: Vec<BarData>) -> Self {
        Self {
            bars,
            ticks: Vec::new(),
        }
    }

    pub fn with_ticks(ticks: Vec<TickData>) -> Self {
        Self {
            bars: Vec::new(),
            ticks,
        }
    }

    pub fn add_bars(&mut self, bars: Vec<BarData>) {
        self.bars.extend(bars);
    }

    pub fn add_ticks(&mut self, ticks: Vec<TickData>) {
        self.ticks.extend(ticks);
    }
}

impl HistoryProvider for MemoryHistory {
    fn load_bar_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BarData>, BacktestError> {
        Ok(self
            .bars
            .iter()
            .filter(|bar| {
                bar.symbol == symbol
                    && bar.exchange == exchange
                    && bar.interval == Some(interval)
                    && bar.datetime >= start
                    && bar.datetime <= end
            })
            .cloned()
            .collect())
    }

    fn load_tick_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TickData>, BacktestError> {
        Ok(self
            .ticks
            .iter()
            .filter(|tick| {
                tick.symbol == symbol
                    && tick.exchange == exchange
                    && tick.datetime >= start
                    && tick.datetime <= end
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn minute_bar(minute: u32, close: f64) -> BarData {
        let mut bar = BarData::new(
            "BACKTESTING".to_string(),
            "IF2401".to_string(),
            Exchange::Cffex,
            Utc.with_ymd_and_hms(2024, 1, 2, 9, minute, 0).unwrap(),
        );
        bar.interval = Some(Interval::Minute);
        bar.close_price = close;
        bar
    }

    #[test]
    fn test_memory_history_range_filter() {
        let history = MemoryHistory::with_bars(vec![
            minute_bar(0, 100.0),
            minute_bar(1, 101.0),
            minute_bar(2, 102.0),
        ]);

        let bars = history
            .load_bar_data(
                "IF2401",
                Exchange::Cffex,
                Interval::Minute,
                Utc.with_ymd_and_hms(2024, 1, 2, 9, 1, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 2, 9, 2, 0).unwrap(),
            )
            .unwrap();

        // Endpoints are inclusive
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close_price, 101.0);
        assert_eq!(bars[1].close_price, 102.0);
    }

    #[test]
    fn test_cached_loader_transparency() {
        let history =
            MemoryHistory::with_bars(vec![minute_bar(0, 100.0), minute_bar(1, 101.0)]);
        let loader = CachedHistoryLoader::new(Box::new(history));

        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 9, 1, 0).unwrap();

        let miss = loader
            .load_bar_data("IF2401", Exchange::Cffex, Interval::Minute, start, end)
            .unwrap();
        let hit = loader
            .load_bar_data("IF2401", Exchange::Cffex, Interval::Minute, start, end)
            .unwrap();

        assert_eq!(miss.len(), hit.len());
        assert_eq!(miss[0].close_price, hit[0].close_price);
        assert_eq!(miss[1].datetime, hit[1].datetime);

        loader.clear();
        let cleared = loader
            .load_bar_data("IF2401", Exchange::Cffex, Interval::Minute, start, end)
            .unwrap();
        assert_eq!(cleared.len(), miss.len());
    }
}
