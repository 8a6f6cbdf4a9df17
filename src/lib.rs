//! Deterministic (RK4) and stochastic (Gillespie) simulation of synthetic
//! gene-regulatory circuits.

use thiserror::Error;

pub mod circuit;
pub mod config;
pub mod flow;
pub mod gillespie;
pub mod inducer;
pub mod kinetics;
pub mod layout;
pub mod progress;
pub mod rhs;
pub mod rk4;
pub mod simulate;
pub mod transcript;

#[cfg(feature = "python")]
mod python;

pub use circuit::{Circuit, InducerBinding, ProteinIndex, Regulator, UnresolvedReference};
pub use config::{Method, SimulationParams, SimulationRequest};
pub use flow::{FlowCytometry, FlowOptions, ProteinDistribution, run_flow};
pub use gillespie::{gillespie_final_state, gillespie_trajectory, rng_for_run};
pub use inducer::{InducerConfig, Waveform, inducer_concentration};
pub use kinetics::{canonicalize_regulator_name, hill_activation, hill_repression};
pub use layout::{StateLayout, TimeGrid, Trajectory};
pub use progress::{NoProgress, Progress};
pub use rhs::KineticRates;
pub use rk4::rk4_integrate;
pub use simulate::{SimulationOutcome, TimeSeriesReport, run, run_time_series};
pub use transcript::{Cistron, Coupling, TranscriptSpec};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub type SimResult<T> = Result<T, SimError>;

pub(crate) fn require_finite_non_negative(value: f64, name: &str) -> SimResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimError::InvalidArgument(format!(
            "{name} must be a finite non-negative number (got {value})"
        )));
    }
    Ok(())
}

pub(crate) fn require_positive(value: f64, name: &str) -> SimResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimError::InvalidArgument(format!(
            "{name} must be positive (got {value})"
        )));
    }
    Ok(())
}
