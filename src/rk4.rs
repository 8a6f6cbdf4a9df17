//! Classical fixed-step Runge-Kutta integration of the circuit ODEs.

use log::debug;

use crate::SimResult;
use crate::circuit::Circuit;
use crate::layout::{TimeGrid, Trajectory};
use crate::progress::{NOTIFICATIONS_PER_RUN, Progress, StepThrottle};
use crate::rhs::{KineticRates, evaluate};

struct Rk4Workspace {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    ytmp: Vec<f64>,
    inducers_start: Vec<f64>,
    inducers_mid: Vec<f64>,
    inducers_end: Vec<f64>,
}

impl Rk4Workspace {
    fn new(dim: usize, n_inducers: usize) -> Self {
        Self {
            k1: vec![0.0; dim],
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            ytmp: vec![0.0; dim],
            inducers_start: vec![0.0; n_inducers],
            inducers_mid: vec![0.0; n_inducers],
            inducers_end: vec![0.0; n_inducers],
        }
    }
}

/// Advances `y` by one step of size `dt` from time `t`, then clamps every
/// component at zero.
fn rk4_step(
    circuit: &Circuit,
    rates: &KineticRates,
    y: &mut [f64],
    t: f64,
    dt: f64,
    ws: &mut Rk4Workspace,
) {
    let n = y.len();
    let schedule = circuit.inducers();
    schedule.concentrations_at(t, &mut ws.inducers_start);
    schedule.concentrations_at(t + 0.5 * dt, &mut ws.inducers_mid);
    schedule.concentrations_at(t + dt, &mut ws.inducers_end);

    evaluate(circuit, rates, y, &ws.inducers_start, &mut ws.k1);

    for i in 0..n {
        ws.ytmp[i] = y[i] + 0.5 * dt * ws.k1[i];
    }
    evaluate(circuit, rates, &ws.ytmp, &ws.inducers_mid, &mut ws.k2);

    for i in 0..n {
        ws.ytmp[i] = y[i] + 0.5 * dt * ws.k2[i];
    }
    evaluate(circuit, rates, &ws.ytmp, &ws.inducers_mid, &mut ws.k3);

    for i in 0..n {
        ws.ytmp[i] = y[i] + dt * ws.k3[i];
    }
    evaluate(circuit, rates, &ws.ytmp, &ws.inducers_end, &mut ws.k4);

    for i in 0..n {
        let next = y[i] + (dt / 6.0) * (ws.k1[i] + 2.0 * ws.k2[i] + 2.0 * ws.k3[i] + ws.k4[i]);
        y[i] = next.max(0.0);
    }
}

/// Integrates from the packed `initial` state over `grid`, returning every
/// grid point. Bit-for-bit deterministic for identical inputs.
pub fn rk4_integrate<P: Progress>(
    circuit: &Circuit,
    rates: &KineticRates,
    grid: &TimeGrid,
    initial: &[f64],
    progress: &mut P,
) -> SimResult<Trajectory> {
    circuit.layout().check_state(initial)?;
    rates.validate()?;

    let dim = circuit.dim();
    let steps = grid.steps();
    let dt = grid.dt();
    debug!("rk4: {steps} steps of dt={dt} over {dim} state slots");

    let mut trajectory = Trajectory::zeros(grid, dim);
    trajectory.row_mut(0).copy_from_slice(initial);
    let mut y = initial.to_vec();
    let mut ws = Rk4Workspace::new(dim, circuit.inducers().len());
    let throttle = StepThrottle::new(steps - 1, NOTIFICATIONS_PER_RUN);

    for k in 1..steps {
        rk4_step(circuit, rates, &mut y, grid.time(k - 1), dt, &mut ws);
        trajectory.row_mut(k).copy_from_slice(&y);
        if throttle.is_due(k) {
            progress.report(throttle.fraction(k));
        }
    }
    progress.report(1.0);

    Ok(trajectory)
}
