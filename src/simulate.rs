//! Request-level entry points that pick an engine from [`Method`], and the
//! named per-transcript view of their trajectories.

use log::debug;

use crate::circuit::Circuit;
use crate::config::{Method, SimulationParams, SimulationRequest};
use crate::flow::{FlowCytometry, run_flow};
use crate::gillespie::{gillespie_trajectory, rng_for_run};
use crate::inducer::inducer_time_series;
use crate::layout::Trajectory;
use crate::progress::Progress;
use crate::rk4::rk4_integrate;
use crate::{SimError, SimResult};

#[derive(Clone, Debug, PartialEq)]
pub enum SimulationOutcome {
    TimeSeries(TimeSeriesReport),
    Flow(FlowCytometry),
}

pub fn run_time_series<P: Progress>(
    circuit: &Circuit,
    params: &SimulationParams,
    method: Method,
    progress: &mut P,
) -> SimResult<Trajectory> {
    params.validate()?;
    let grid = params.grid()?;
    let rates = params.rates();
    let initial = params.initial_state(circuit)?;
    match method {
        Method::Deterministic => rk4_integrate(circuit, &rates, &grid, &initial, progress),
        Method::Stochastic => {
            let mut rng = rng_for_run(params.seed, 0);
            gillespie_trajectory(circuit, &rates, &grid, &initial, &mut rng, progress)
        }
        Method::Flow => Err(SimError::InvalidArgument(
            "flow simulations produce population snapshots, not time series".into(),
        )),
    }
}

pub fn run_flow_snapshot<P: Progress>(
    circuit: &Circuit,
    params: &SimulationParams,
    progress: &mut P,
) -> SimResult<FlowCytometry> {
    params.validate()?;
    let initial = params.initial_state(circuit)?;
    run_flow(
        circuit,
        &params.rates(),
        params.t_end,
        &initial,
        &params.flow_options(),
        progress,
    )
}

pub fn run<P: Progress>(request: &SimulationRequest, progress: &mut P) -> SimResult<SimulationOutcome> {
    let circuit = request.circuit()?;
    let params = &request.params;
    debug!(
        "simulate: {:?} over {} transcripts, T={}",
        params.method,
        circuit.specs().len(),
        params.t_end
    );
    match params.method {
        Method::Flow => run_flow_snapshot(&circuit, params, progress).map(SimulationOutcome::Flow),
        method => {
            let trajectory = run_time_series(&circuit, params, method, progress)?;
            Ok(SimulationOutcome::TimeSeries(TimeSeriesReport::build(
                &circuit,
                &trajectory,
            )))
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedSeries {
    pub id: String,
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptSeries {
    pub transcript_id: String,
    pub promoter_name: String,
    pub terminator_name: Option<String>,
    pub total_mrna: NamedSeries,
    pub mrna: Vec<NamedSeries>,
    pub proteins: Vec<NamedSeries>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRow {
    pub transcript_id: String,
    pub promoter_name: String,
    pub cistron_count: usize,
    pub final_mrna: f64,
    pub final_proteins: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeriesReport {
    pub time: Vec<f64>,
    pub transcripts: Vec<TranscriptSeries>,
    pub summary: Vec<SummaryRow>,
    pub inducers: Vec<NamedSeries>,
}

impl TimeSeriesReport {
    pub fn build(circuit: &Circuit, trajectory: &Trajectory) -> Self {
        let layout = circuit.layout();
        let mut transcripts = Vec::with_capacity(circuit.specs().len());
        let mut summary = Vec::with_capacity(circuit.specs().len());

        for (tx, spec) in circuit.specs().iter().enumerate() {
            let mut total_mrna = vec![0.0; trajectory.n_steps()];
            let mut mrna = Vec::with_capacity(spec.n_cistrons());
            let mut proteins = Vec::with_capacity(spec.n_cistrons());
            for (j, cistron) in spec.cistrons.iter().enumerate() {
                let m_values = trajectory.series(layout.mrna_slot(tx, j));
                for (total, value) in total_mrna.iter_mut().zip(&m_values) {
                    *total += value;
                }
                mrna.push(NamedSeries {
                    id: format!("{}:mRNA", cistron.id),
                    label: format!("{} mRNA", cistron.protein_label),
                    values: m_values,
                });
                proteins.push(NamedSeries {
                    id: cistron.id.clone(),
                    label: cistron.protein_label.clone(),
                    values: trajectory.series(layout.protein_slot(tx, j)),
                });
            }

            let promoter_name = spec.promoter_label().to_string();
            summary.push(SummaryRow {
                transcript_id: spec.transcript_id.clone(),
                promoter_name: promoter_name.clone(),
                cistron_count: spec.n_cistrons(),
                final_mrna: total_mrna.last().copied().unwrap_or(0.0),
                final_proteins: proteins
                    .iter()
                    .map(|series| series.values.last().copied().unwrap_or(0.0))
                    .collect(),
            });
            transcripts.push(TranscriptSeries {
                transcript_id: spec.transcript_id.clone(),
                total_mrna: NamedSeries {
                    id: format!("{}:mRNA", spec.transcript_id),
                    label: format!("{promoter_name} total mRNA"),
                    values: total_mrna,
                },
                promoter_name,
                terminator_name: spec.terminator_name.clone(),
                mrna,
                proteins,
            });
        }

        let inducers = circuit
            .inducers()
            .configs()
            .iter()
            .map(|config| NamedSeries {
                id: config.name.clone(),
                label: config.name.clone(),
                values: inducer_time_series(config, &trajectory.time),
            })
            .collect();

        Self {
            time: trajectory.time.clone(),
            transcripts,
            summary,
            inducers,
        }
    }
}
