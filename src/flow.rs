//! Flow-cytometry mode: many independent final-state-only replicates, reduced
//! into per-protein population snapshots.

use log::debug;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::circuit::Circuit;
use crate::gillespie::{gillespie_final_state, rng_for_run};
use crate::kinetics::canonicalize_regulator_name;
use crate::progress::{Progress, StepThrottle};
use crate::rhs::KineticRates;
use crate::{SimError, SimResult, require_positive};

pub const MAX_RUNS: usize = 100_000;

const FLOW_NOTIFICATIONS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowOptions {
    pub runs: usize,
    /// Run `i` is seeded with `seed + i`; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Size of a dedicated worker pool; `None` uses the global rayon pool.
    pub n_threads: Option<usize>,
}

impl FlowOptions {
    pub fn new(runs: usize, seed: Option<u64>) -> Self {
        Self {
            runs,
            seed,
            n_threads: None,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.runs == 0 || self.runs > MAX_RUNS {
            return Err(SimError::InvalidArgument(format!(
                "number of runs must lie in 1..={MAX_RUNS} (got {})",
                self.runs
            )));
        }
        if self.n_threads == Some(0) {
            return Err(SimError::InvalidArgument(
                "n_threads must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Final copy numbers of one protein (summed over every slot expressing it),
/// one value per replicate in run order.
#[derive(Clone, Debug, PartialEq)]
pub struct ProteinDistribution {
    pub key: String,
    pub label: String,
    pub values: Vec<f64>,
}

impl ProteinDistribution {
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn variance(&self) -> f64 {
        if self.values.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (self.values.len() - 1) as f64
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowCytometry {
    pub runs: usize,
    pub proteins: Vec<ProteinDistribution>,
}

impl FlowCytometry {
    pub fn protein(&self, label: &str) -> Option<&ProteinDistribution> {
        let key = canonicalize_regulator_name(label);
        self.proteins.iter().find(|protein| protein.key == key)
    }
}

/// Simulates `options.runs` replicates and returns every terminal state in
/// run order.
pub fn simulate_replicates<P: Progress>(
    circuit: &Circuit,
    rates: &KineticRates,
    t_end: f64,
    initial: &[f64],
    options: &FlowOptions,
    progress: &mut P,
) -> SimResult<Vec<Vec<f64>>> {
    options.validate()?;
    circuit.layout().check_state(initial)?;
    rates.validate()?;
    require_positive(t_end, "T")?;

    let pool = options
        .n_threads
        .map(|n| ThreadPoolBuilder::new().num_threads(n).build())
        .transpose()
        .map_err(|e| SimError::ThreadPool(e.to_string()))?;
    let workers = pool
        .as_ref()
        .map_or_else(rayon::current_num_threads, |pool| pool.current_num_threads());

    let runs = options.runs;
    let throttle = StepThrottle::new(runs, FLOW_NOTIFICATIONS);
    // Batches end on the caller's thread, which is where progress is reported.
    let batch = throttle.interval().max(workers);
    debug!("flow: {runs} replicates to T={t_end} in batches of {batch} on {workers} workers");

    let mut finals = Vec::with_capacity(runs);
    let mut start = 0usize;
    while start < runs {
        let end = (start + batch).min(runs);
        let run_batch = || {
            (start..end)
                .into_par_iter()
                .map(|run| {
                    let mut rng = rng_for_run(options.seed, run as u64);
                    gillespie_final_state(circuit, rates, t_end, initial, &mut rng)
                })
                .collect::<SimResult<Vec<_>>>()
        };
        let states = match &pool {
            Some(pool) => pool.install(run_batch)?,
            None => run_batch()?,
        };
        finals.extend(states);
        progress.report(throttle.fraction(end));
        start = end;
    }
    progress.report(1.0);
    Ok(finals)
}

pub fn reduce_final_states(circuit: &Circuit, finals: &[Vec<f64>]) -> Vec<ProteinDistribution> {
    circuit
        .proteins()
        .entries()
        .iter()
        .map(|entry| ProteinDistribution {
            key: entry.key.clone(),
            label: entry.label.clone(),
            values: finals.iter().map(|state| entry.total(state)).collect(),
        })
        .collect()
}

pub fn run_flow<P: Progress>(
    circuit: &Circuit,
    rates: &KineticRates,
    t_end: f64,
    initial: &[f64],
    options: &FlowOptions,
    progress: &mut P,
) -> SimResult<FlowCytometry> {
    let finals = simulate_replicates(circuit, rates, t_end, initial, options, progress)?;
    Ok(FlowCytometry {
        runs: finals.len(),
        proteins: reduce_final_states(circuit, &finals),
    })
}
