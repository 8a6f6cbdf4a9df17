//! Request-level parameters and their defaults.

use std::str::FromStr;

use serde::Deserialize;

use crate::circuit::Circuit;
use crate::flow::{FlowOptions, MAX_RUNS};
use crate::inducer::InducerConfig;
use crate::layout::TimeGrid;
use crate::rhs::KineticRates;
use crate::transcript::TranscriptSpec;
use crate::{SimError, SimResult, require_finite_non_negative};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Method {
    #[default]
    Deterministic,
    Stochastic,
    Flow,
}

impl FromStr for Method {
    type Err = SimError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            m if m.eq_ignore_ascii_case("deterministic") => Ok(Self::Deterministic),
            m if m.eq_ignore_ascii_case("stochastic") => Ok(Self::Stochastic),
            m if m.eq_ignore_ascii_case("flow") => Ok(Self::Flow),
            other => Err(SimError::InvalidArgument(format!(
                "unrecognized method '{other}' (expected deterministic, stochastic or flow)"
            ))),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = SimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    #[serde(rename = "T", alias = "t_end")]
    pub t_end: f64,
    pub dt: f64,
    pub method: Method,
    pub seed: Option<u64>,
    pub runs: usize,
    pub n_threads: Option<usize>,
    pub alpha_m_base: f64,
    pub alpha_p_base: f64,
    pub delta_m: f64,
    pub delta_p: f64,
    /// Initial mRNA count applied to every gene unless `m0_by_gene` is given.
    pub m0: f64,
    pub p0: f64,
    pub m0_by_gene: Option<Vec<f64>>,
    pub p0_by_gene: Option<Vec<f64>>,
    pub inducers: Vec<InducerConfig>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        let rates = KineticRates::default();
        Self {
            t_end: 1000.0,
            dt: 1.0,
            method: Method::Deterministic,
            seed: None,
            runs: 200,
            n_threads: None,
            alpha_m_base: rates.alpha_m_base,
            alpha_p_base: rates.alpha_p_base,
            delta_m: rates.delta_m,
            delta_p: rates.delta_p,
            m0: 0.0,
            p0: 0.0,
            m0_by_gene: None,
            p0_by_gene: None,
            inducers: Vec::new(),
        }
    }
}

impl SimulationParams {
    pub fn rates(&self) -> KineticRates {
        KineticRates {
            alpha_m_base: self.alpha_m_base,
            alpha_p_base: self.alpha_p_base,
            delta_m: self.delta_m,
            delta_p: self.delta_p,
        }
    }

    pub fn grid(&self) -> SimResult<TimeGrid> {
        TimeGrid::new(self.t_end, self.dt)
    }

    pub fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            runs: self.runs,
            seed: self.seed,
            n_threads: self.n_threads,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        self.grid()?;
        self.rates().validate()?;
        require_finite_non_negative(self.m0, "m0")?;
        require_finite_non_negative(self.p0, "p0")?;
        if self.runs == 0 || self.runs > MAX_RUNS {
            return Err(SimError::InvalidArgument(format!(
                "runs must lie in 1..={MAX_RUNS} (got {})",
                self.runs
            )));
        }
        for inducer in &self.inducers {
            inducer.validate()?;
        }
        Ok(())
    }

    /// Per-gene initial counts in request order, from the scalar defaults or
    /// the explicit overrides.
    pub fn initial_by_gene(&self, n_genes: usize) -> SimResult<(Vec<f64>, Vec<f64>)> {
        let expand = |overrides: &Option<Vec<f64>>, scalar: f64, name: &str| match overrides {
            Some(values) if values.len() != n_genes => Err(SimError::Shape(format!(
                "{name} must have length {n_genes}, got {}",
                values.len()
            ))),
            Some(values) => Ok(values.clone()),
            None => Ok(vec![scalar; n_genes]),
        };
        Ok((
            expand(&self.m0_by_gene, self.m0, "m0_by_gene")?,
            expand(&self.p0_by_gene, self.p0, "p0_by_gene")?,
        ))
    }

    pub fn initial_state(&self, circuit: &Circuit) -> SimResult<Vec<f64>> {
        let (m0, p0) = self.initial_by_gene(circuit.layout().n_genes())?;
        circuit.initial_state(&m0, &p0)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SimulationRequest {
    pub transcripts: Vec<TranscriptSpec>,
    #[serde(default)]
    pub params: SimulationParams,
}

impl SimulationRequest {
    pub fn circuit(&self) -> SimResult<Circuit> {
        Circuit::new(self.transcripts.clone(), self.params.inducers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!("Deterministic".parse::<Method>().unwrap(), Method::Deterministic);
        assert_eq!(" FLOW ".parse::<Method>().unwrap(), Method::Flow);
        assert_eq!("stochastic".parse::<Method>().unwrap(), Method::Stochastic);
        assert!(matches!(
            "euler".parse::<Method>(),
            Err(SimError::InvalidArgument(msg)) if msg.contains("euler")
        ));
    }

    #[test]
    fn params_default_when_fields_are_missing() {
        let params: SimulationParams =
            serde_json::from_str(r#"{"T": 50.0, "method": "Stochastic", "seed": 7}"#).unwrap();
        assert_eq!(params.t_end, 50.0);
        assert_eq!(params.dt, 1.0);
        assert_eq!(params.method, Method::Stochastic);
        assert_eq!(params.seed, Some(7));
        assert_eq!(params.runs, 200);
        assert_eq!(params.rates(), KineticRates::default());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn params_reject_bad_values() {
        let zero_dt = SimulationParams {
            dt: 0.0,
            ..SimulationParams::default()
        };
        assert!(zero_dt.validate().is_err());
        let negative_rate = SimulationParams {
            delta_p: -0.1,
            ..SimulationParams::default()
        };
        assert!(matches!(
            negative_rate.validate(),
            Err(SimError::InvalidArgument(msg)) if msg.contains("delta_p")
        ));
        let too_many_runs = SimulationParams {
            runs: MAX_RUNS + 1,
            ..SimulationParams::default()
        };
        assert!(too_many_runs.validate().is_err());
        assert!(serde_json::from_str::<SimulationParams>(r#"{"method": "euler"}"#).is_err());
    }

    #[test]
    fn initial_conditions_expand_or_validate_overrides() {
        let params = SimulationParams {
            m0: 2.0,
            p0_by_gene: Some(vec![1.0, 2.0, 3.0]),
            ..SimulationParams::default()
        };
        let (m0, p0) = params.initial_by_gene(3).unwrap();
        assert_eq!(m0, vec![2.0; 3]);
        assert_eq!(p0, vec![1.0, 2.0, 3.0]);
        let err = params.initial_by_gene(2).unwrap_err();
        assert!(matches!(err, SimError::Shape(msg) if msg.contains("p0_by_gene")));
    }
}
