//! Exact stochastic simulation (Gillespie direct method) of the
//! four-reaction-per-gene network.
//!
//! Propensities are rebuilt from scratch before every event: the
//! transcription channels depend on regulator levels anywhere in the circuit
//! and on time-varying inducers, so nothing survives from one event to the
//! next.

use std::cell::RefCell;

use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::circuit::Circuit;
use crate::layout::{TimeGrid, Trajectory};
use crate::progress::{NOTIFICATIONS_PER_RUN, Progress, StepThrottle};
use crate::rhs::KineticRates;
use crate::{SimResult, require_positive};

/// Floor for the uniform draw behind the waiting time, keeps `tau` finite.
const MIN_UNIFORM: f64 = 1e-12;

/// Random stream for replicate `run`: `base_seed + run` when seeded,
/// OS entropy otherwise.
pub fn rng_for_run(base_seed: Option<u64>, run: u64) -> ChaCha8Rng {
    match base_seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(run)),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[derive(Default)]
struct SsaScratch {
    propensities: Vec<f64>,
    tx_rates: Vec<f64>,
    inducer_levels: Vec<f64>,
}

impl SsaScratch {
    fn ensure(&mut self, n_channels: usize, n_transcripts: usize, n_inducers: usize) {
        if self.propensities.len() != n_channels {
            self.propensities.resize(n_channels, 0.0);
        }
        if self.tx_rates.len() != n_transcripts {
            self.tx_rates.resize(n_transcripts, 0.0);
        }
        if self.inducer_levels.len() != n_inducers {
            self.inducer_levels.resize(n_inducers, 0.0);
        }
    }
}

thread_local! {
    static SSA_SCRATCH: RefCell<SsaScratch> = RefCell::new(SsaScratch::default());
}

fn with_scratch<T>(circuit: &Circuit, f: impl FnOnce(&mut SsaScratch) -> T) -> T {
    SSA_SCRATCH.with(|cell| {
        let mut scratch = cell.borrow_mut();
        scratch.ensure(
            circuit.channels().len(),
            circuit.specs().len(),
            circuit.inducers().len(),
        );
        f(&mut scratch)
    })
}

fn recompute_propensities(
    circuit: &Circuit,
    rates: &KineticRates,
    state: &[f64],
    t: f64,
    scratch: &mut SsaScratch,
) -> f64 {
    let SsaScratch {
        propensities,
        tx_rates,
        inducer_levels,
    } = scratch;
    circuit.inducers().concentrations_at(t, inducer_levels);
    let inducer_levels: &[f64] = inducer_levels;
    for (tx, rate) in tx_rates.iter_mut().enumerate() {
        *rate = circuit.transcription_rate(tx, rates, state, inducer_levels);
    }
    let tx_rates: &[f64] = tx_rates;
    let mut total = 0.0;
    for (dst, channel) in propensities.iter_mut().zip(circuit.channels()) {
        let value = channel.propensity(rates, state, tx_rates);
        *dst = value;
        total += value;
    }
    total
}

/// Smallest channel whose running propensity sum reaches `target`.
/// Zero-propensity channels are never chosen; rounding past the end falls
/// back to the last channel that can fire.
#[inline]
fn select_channel(propensities: &[f64], target: f64) -> usize {
    let mut running = 0.0;
    let mut last_positive = propensities.len().saturating_sub(1);
    for (idx, &value) in propensities.iter().enumerate() {
        if value <= 0.0 {
            continue;
        }
        running += value;
        last_positive = idx;
        if running >= target {
            return idx;
        }
    }
    last_positive
}

#[inline]
fn waiting_time(total_propensity: f64, r1: f64) -> f64 {
    (1.0 / r1.max(MIN_UNIFORM)).ln() / total_propensity
}

fn integral_state(initial: &[f64]) -> Vec<f64> {
    initial.iter().map(|value| value.round().max(0.0)).collect()
}

/// Runs one trajectory and samples it on `grid`. Each grid point holds the
/// state in force at that time (the state before the first event after it).
pub fn gillespie_trajectory<P: Progress>(
    circuit: &Circuit,
    rates: &KineticRates,
    grid: &TimeGrid,
    initial: &[f64],
    rng: &mut ChaCha8Rng,
    progress: &mut P,
) -> SimResult<Trajectory> {
    circuit.layout().check_state(initial)?;
    rates.validate()?;

    let steps = grid.steps();
    let t_end = grid.t_end();
    debug!(
        "gillespie: {} channels, sampling {steps} points up to T={t_end}",
        circuit.channels().len()
    );

    let mut state = integral_state(initial);
    let mut trajectory = Trajectory::zeros(grid, circuit.dim());
    trajectory.row_mut(0).copy_from_slice(&state);

    let throttle = StepThrottle::new(steps - 1, NOTIFICATIONS_PER_RUN);
    let mut next_progress = throttle.interval();
    let mut next_sample = 1usize;
    let mut t = 0.0;

    with_scratch(circuit, |scratch| {
        while t < t_end && next_sample < steps {
            let total = recompute_propensities(circuit, rates, &state, t, scratch);
            if total <= 0.0 {
                trace!("gillespie: network exhausted at t={t}");
                break;
            }

            let r1: f64 = rng.r#gen();
            let r2: f64 = rng.r#gen();
            let t_next = t + waiting_time(total, r1);

            while next_sample < steps && grid.time(next_sample) <= t_next {
                trajectory.row_mut(next_sample).copy_from_slice(&state);
                next_sample += 1;
                while next_sample >= next_progress && next_progress <= throttle.total() {
                    progress.report(throttle.fraction(next_progress));
                    next_progress += throttle.interval();
                }
            }

            let chosen = select_channel(&scratch.propensities, r2 * total);
            circuit.channels()[chosen].fire(&mut state);
            t = t_next;
        }
    });

    for k in next_sample..steps {
        trajectory.row_mut(k).copy_from_slice(&state);
    }
    progress.report(1.0);

    Ok(trajectory)
}

/// Runs one trajectory to `t_end` and returns only the terminal state. An
/// event that would land past `t_end` is not applied.
pub fn gillespie_final_state(
    circuit: &Circuit,
    rates: &KineticRates,
    t_end: f64,
    initial: &[f64],
    rng: &mut ChaCha8Rng,
) -> SimResult<Vec<f64>> {
    circuit.layout().check_state(initial)?;
    rates.validate()?;
    require_positive(t_end, "T")?;

    let mut state = integral_state(initial);
    let mut t = 0.0;
    with_scratch(circuit, |scratch| {
        while t < t_end {
            let total = recompute_propensities(circuit, rates, &state, t, scratch);
            if total <= 0.0 {
                break;
            }
            let r1: f64 = rng.r#gen();
            let r2: f64 = rng.r#gen();
            let t_next = t + waiting_time(total, r1);
            if t_next > t_end {
                break;
            }
            let chosen = select_channel(&scratch.propensities, r2 * total);
            circuit.channels()[chosen].fire(&mut state);
            t = t_next;
        }
    });
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_channel_uses_cumulative_sum() {
        let props = [1.0, 3.0, 6.0];
        assert_eq!(select_channel(&props, 0.5), 0);
        assert_eq!(select_channel(&props, 1.0), 0);
        assert_eq!(select_channel(&props, 1.5), 1);
        assert_eq!(select_channel(&props, 4.0), 1);
        assert_eq!(select_channel(&props, 9.9), 2);
    }

    #[test]
    fn select_channel_skips_zero_entries_and_clamps_overflow() {
        let props = [0.0, 2.0, 0.0, 5.0, 0.0];
        assert_eq!(select_channel(&props, 0.0), 1);
        assert_eq!(select_channel(&props, 2.5), 3);
        assert_eq!(select_channel(&props, 7.0 + 1e-9), 3);
    }

    #[test]
    fn waiting_time_is_finite_for_zero_draw() {
        let tau = waiting_time(2.0, 0.0);
        assert!(tau.is_finite());
        assert!((tau - (1e12f64).ln() / 2.0).abs() < 1e-9);
        assert_eq!(waiting_time(4.0, 1.0), 0.0);
    }

    #[test]
    fn seeded_streams_are_offset_by_run_index() {
        let mut a = rng_for_run(Some(41), 1);
        let mut b = rng_for_run(Some(42), 0);
        let x: u64 = a.r#gen();
        let y: u64 = b.r#gen();
        assert_eq!(x, y);
    }

    #[test]
    fn fractional_initial_counts_are_rounded() {
        assert_eq!(integral_state(&[0.4, 2.6, -1.0]), vec![0.0, 3.0, 0.0]);
    }
}
