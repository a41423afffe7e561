//! Parameter search drivers layered on top of the backtesting core.
//!
//! Both drivers treat a backtest as a pure function of (strategy
//! setting, configuration, data): every evaluation builds a fresh
//! engine from an explicit [`OptimizeParams`] snapshot, so workers
//! share no mutable state and results are reproducible.

use chrono::{DateTime, Utc};
use lru::LruCache;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use crate::strategy::template::{CtaStrategy, StrategySetting};
use crate::trader::constant::{Interval, RateType};
use crate::trader::object::{BarData, TickData};

use super::base::{BacktestError, BacktestingMode};
use super::engine::BacktestingEngine;
use super::statistics::BacktestStatistics;

/// Bounded size of the genetic evaluation cache.
const GA_CACHE_SIZE: usize = 1_000_000;

/// Setting for running optimization.
#[derive(Debug, Clone, Default)]
pub struct OptimizationSetting {
    params: BTreeMap<String, Vec<f64>>,
    target_name: String,
}

impl OptimizationSetting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, either fixed (`start` only) or ranged
    /// (`start..=end` stepped by `step`).
    pub fn add_parameter(
        &mut self,
        name: &str,
        start: f64,
        end: Option<f64>,
        step: Option<f64>,
    ) -> Result<(), BacktestError> {
        let (Some(end), Some(step)) = (end, step) else {
            self.params.insert(name.to_string(), vec![start]);
            return Ok(());
        };

        if start >= end {
            return Err(BacktestError::InvalidParameter(format!(
                "{name}: start must be smaller than end"
            )));
        }
        if step <= 0.0 {
            return Err(BacktestError::InvalidParameter(format!(
                "{name}: step must be positive"
            )));
        }

        let mut value = start;
        let mut values = Vec::new();
        while value <= end {
            values.push(value);
            value += step;
        }

        self.params.insert(name.to_string(), values);
        Ok(())
    }

    /// Name the statistic the search maximizes.
    pub fn set_target(&mut self, target_name: &str) {
        self.target_name = target_name.to_string();
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Cartesian product of all parameter ranges, in parameter-name
    /// order.
    pub fn generate_settings(&self) -> Vec<StrategySetting> {
        if self.params.is_empty() {
            return Vec::new();
        }

        let mut settings = vec![StrategySetting::new()];

        for (name, values) in &self.params {
            let mut expanded = Vec::with_capacity(settings.len() * values.len());
            for setting in &settings {
                for &value in values {
                    let mut next = setting.clone();
                    next.insert(name.clone(), value);
                    expanded.push(next);
                }
            }
            settings = expanded;
        }

        settings
    }

    /// Size of the parameter product set.
    pub fn count_settings(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.values().map(|values| values.len()).product()
    }
}

/// Validate an optimization setting before spawning workers.
pub fn check_optimization_setting(setting: &OptimizationSetting) -> Result<(), BacktestError> {
    if setting.count_settings() == 0 {
        return Err(BacktestError::EmptyParameterSpace);
    }
    if setting.target_name.is_empty() {
        return Err(BacktestError::TargetUnset);
    }
    Ok(())
}

/// Everything a worker needs to rerun a backtest, passed by value.
#[derive(Clone)]
pub struct OptimizeParams {
    pub vt_symbol: String,
    pub interval: Interval,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub rate_type: RateType,
    pub rate: f64,
    pub slippage: f64,
    pub size: f64,
    pub pricetick: f64,
    pub capital: f64,
    pub mode: BacktestingMode,
    pub inverse: bool,
    pub history_data: Arc<Vec<BarData>>,
    pub tick_data: Arc<Vec<TickData>>,
}

/// One evaluated setting.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub setting: StrategySetting,
    pub target_value: f64,
    pub statistics: BacktestStatistics,
}

impl OptimizationResult {
    /// Human-readable setting representation, stable across runs.
    pub fn setting_repr(&self) -> String {
        let fields: Vec<String> = self
            .setting
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        format!("{{{}}}", fields.join(", "))
    }
}

/// Run one backtest for a setting. A strategy fault yields the all-zero
/// statistics, ranking the setting at the bottom.
fn optimize<F>(
    params: &OptimizeParams,
    factory: &F,
    setting: &StrategySetting,
    target_name: &str,
) -> OptimizationResult
where
    F: Fn(&StrategySetting) -> Box<dyn CtaStrategy> + Send + Sync,
{
    let mut engine = BacktestingEngine::new();

    let configured = engine.set_parameters(
        &params.vt_symbol,
        params.interval,
        params.start,
        params.end,
        params.rate_type,
        params.rate,
        params.slippage,
        params.size,
        params.pricetick,
        params.capital,
        params.mode,
        params.inverse,
    );

    if configured.is_ok() {
        match params.mode {
            BacktestingMode::Bar => engine.set_history_data((*params.history_data).clone()),
            BacktestingMode::Tick => engine.set_tick_data((*params.tick_data).clone()),
        }

        engine.add_strategy(factory(setting), "Optimization");
        let _ = engine.run_backtesting();
        engine.calculate_result();
    }

    let statistics = engine.calculate_statistics(false);
    let target_value = statistics.target(target_name).unwrap_or(0.0);

    OptimizationResult {
        setting: setting.clone(),
        target_value,
        statistics,
    }
}

fn sort_descending(results: &mut [OptimizationResult]) {
    results.sort_by(|a, b| {
        b.target_value
            .partial_cmp(&a.target_value)
            .unwrap_or(Ordering::Equal)
    });
}

/// Exhaustive grid search over the parameter product, one worker per
/// core. Results are sorted descending by target value.
pub fn run_grid_search<F>(
    params: &OptimizeParams,
    optimization_setting: &OptimizationSetting,
    factory: F,
) -> Result<Vec<OptimizationResult>, BacktestError>
where
    F: Fn(&StrategySetting) -> Box<dyn CtaStrategy> + Send + Sync,
{
    check_optimization_setting(optimization_setting)?;

    let settings = optimization_setting.generate_settings();
    let target_name = optimization_setting.target_name();

    tracing::info!("Starting grid search, space size: {}", settings.len());
    let started = Instant::now();

    let mut results: Vec<OptimizationResult> = settings
        .par_iter()
        .map(|setting| optimize(params, &factory, setting, target_name))
        .collect();

    sort_descending(&mut results);

    tracing::info!(
        "Grid search finished, cost: {}s",
        started.elapsed().as_secs()
    );
    Ok(results)
}

/// Genetic search configuration.
#[derive(Debug, Clone)]
pub struct GaSetting {
    /// Individuals per generation
    pub pop_size: usize,
    /// Number of generations
    pub ngen: usize,
    /// Probability that an offspring is produced by crossover
    pub cxpb: f64,
    /// Probability that an offspring is produced by mutation
    pub mutpb: f64,
    /// Per-gene replacement probability inside a mutation
    pub indpb: f64,
    /// RNG seed; identical seeds yield identical rankings
    pub seed: u64,
}

impl Default for GaSetting {
    fn default() -> Self {
        Self {
            pop_size: 100,
            ngen: 30,
            cxpb: 0.95,
            mutpb: 0.05,
            indpb: 1.0,
            seed: 1,
        }
    }
}

type Genes = Vec<f64>;

fn genes_key(genes: &Genes) -> Vec<u64> {
    genes.iter().map(|value| value.to_bits()).collect()
}

/// Two-point crossover, keeping the first child.
fn cx_two_point(mut a: Genes, b: &Genes, rng: &mut StdRng) -> Genes {
    let size = a.len().min(b.len());
    if size < 2 {
        return a;
    }

    let mut cx1 = rng.random_range(1..=size);
    let mut cx2 = rng.random_range(1..size);
    if cx2 >= cx1 {
        cx2 += 1;
    } else {
        std::mem::swap(&mut cx1, &mut cx2);
    }

    a[cx1..cx2].copy_from_slice(&b[cx1..cx2]);
    a
}

/// Mutate by borrowing genes from a uniformly random valid individual.
fn mutate(genes: &mut Genes, pool: &[Genes], indpb: f64, rng: &mut StdRng) {
    let replacement = &pool[rng.random_range(0..pool.len())];
    for (gene, donor) in genes.iter_mut().zip(replacement) {
        if rng.random::<f64>() < indpb {
            *gene = *donor;
        }
    }
}

/// Insert an evaluated individual into the single-objective Pareto
/// archive: distinct individuals carrying the best fitness seen so far.
fn update_archive(archive: &mut Vec<(Genes, f64)>, genes: &Genes, fitness: f64) {
    match archive.first() {
        None => archive.push((genes.clone(), fitness)),
        Some((_, best)) => {
            if fitness > *best {
                archive.clear();
                archive.push((genes.clone(), fitness));
            } else if fitness == *best && !archive.iter().any(|(g, _)| g == genes) {
                archive.push((genes.clone(), fitness));
            }
        }
    }
}

/// Genetic search with mu-plus-lambda selection over the same product
/// set as the grid. Evaluation is memoized on the parameter tuple; the
/// archive of best individuals is evaluated into the returned results.
pub fn run_ga_optimization<F>(
    params: &OptimizeParams,
    optimization_setting: &OptimizationSetting,
    factory: F,
    ga: GaSetting,
) -> Result<Vec<OptimizationResult>, BacktestError>
where
    F: Fn(&StrategySetting) -> Box<dyn CtaStrategy> + Send + Sync,
{
    check_optimization_setting(optimization_setting)?;

    let settings = optimization_setting.generate_settings();
    let target_name = optimization_setting.target_name();
    let names: Vec<String> = settings[0].keys().cloned().collect();
    let pool: Vec<Genes> = settings
        .iter()
        .map(|setting| setting.values().copied().collect())
        .collect();

    let pop_size = ga.pop_size.max(1);
    let mu = ((pop_size as f64 * 0.8) as usize).max(1);
    let lambda = pop_size;

    tracing::info!("Starting genetic search");
    tracing::info!("Parameter space size: {}", pool.len());
    tracing::info!("Population per generation: {}", pop_size);
    tracing::info!("Selection count: {}", mu);
    tracing::info!("Generations: {}", ga.ngen);
    tracing::info!("Crossover probability: {:.0}%", ga.cxpb * 100.0);
    tracing::info!("Mutation probability: {:.0}%", ga.mutpb * 100.0);

    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(ga.seed);

    let cache_size = NonZeroUsize::new(GA_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
    let mut cache: LruCache<Vec<u64>, (f64, BacktestStatistics)> = LruCache::new(cache_size);

    let evaluate = |genes: &Genes,
                    cache: &mut LruCache<Vec<u64>, (f64, BacktestStatistics)>|
     -> (f64, BacktestStatistics) {
        let key = genes_key(genes);
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }

        let setting: StrategySetting = names
            .iter()
            .cloned()
            .zip(genes.iter().copied())
            .collect();
        let result = optimize(params, &factory, &setting, target_name);
        let entry = (result.target_value, result.statistics);
        cache.put(key, entry.clone());
        entry
    };

    // Initial population, sampled from the valid product set.
    let mut population: Vec<(Genes, f64)> = (0..pop_size)
        .map(|_| pool[rng.random_range(0..pool.len())].clone())
        .collect::<Vec<_>>()
        .into_iter()
        .map(|genes| {
            let (fitness, _) = evaluate(&genes, &mut cache);
            (genes, fitness)
        })
        .collect();

    let mut archive: Vec<(Genes, f64)> = Vec::new();
    for (genes, fitness) in &population {
        update_archive(&mut archive, genes, *fitness);
    }

    for generation in 0..ga.ngen {
        // Vary: each offspring comes from crossover, mutation or
        // reproduction, never more than one of them.
        let mut offspring: Vec<(Genes, f64)> = Vec::with_capacity(lambda);

        for _ in 0..lambda {
            let roll: f64 = rng.random();
            let genes = if roll < ga.cxpb {
                let first = rng.random_range(0..population.len());
                let mut second = rng.random_range(0..population.len());
                if population.len() > 1 && second == first {
                    second = (second + 1) % population.len();
                }
                cx_two_point(
                    population[first].0.clone(),
                    &population[second].0,
                    &mut rng,
                )
            } else if roll < ga.cxpb + ga.mutpb {
                let parent = rng.random_range(0..population.len());
                let mut genes = population[parent].0.clone();
                mutate(&mut genes, &pool, ga.indpb, &mut rng);
                genes
            } else {
                population[rng.random_range(0..population.len())].0.clone()
            };

            let (fitness, _) = evaluate(&genes, &mut cache);
            update_archive(&mut archive, &genes, fitness);
            offspring.push((genes, fitness));
        }

        // Select mu survivors out of parents plus offspring.
        population.extend(offspring);
        population.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        population.truncate(mu);

        tracing::debug!(
            "Generation {} best fitness: {:.6}",
            generation + 1,
            population.first().map(|(_, f)| *f).unwrap_or(0.0)
        );
    }

    let mut results: Vec<OptimizationResult> = archive
        .iter()
        .map(|(genes, _)| {
            let (target_value, statistics) = evaluate(genes, &mut cache);
            let setting: StrategySetting = names
                .iter()
                .cloned()
                .zip(genes.iter().copied())
                .collect();
            OptimizationResult {
                setting,
                target_value,
                statistics,
            }
        })
        .collect();
    sort_descending(&mut results);

    tracing::info!(
        "Genetic search finished, cost: {}s",
        started.elapsed().as_secs()
    );
    Ok(results)
}
