//! Continuous-state right-hand side shared by the deterministic integrator.

use serde::Deserialize;

use crate::circuit::Circuit;
use crate::{SimResult, require_finite_non_negative};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct KineticRates {
    pub alpha_m_base: f64,
    pub alpha_p_base: f64,
    pub delta_m: f64,
    pub delta_p: f64,
}

impl Default for KineticRates {
    fn default() -> Self {
        Self {
            alpha_m_base: 1.0,
            alpha_p_base: 1.0,
            delta_m: 0.1,
            delta_p: 0.01,
        }
    }
}

impl KineticRates {
    pub fn validate(&self) -> SimResult<()> {
        require_finite_non_negative(self.alpha_m_base, "alpha_m_base")?;
        require_finite_non_negative(self.alpha_p_base, "alpha_p_base")?;
        require_finite_non_negative(self.delta_m, "delta_m")?;
        require_finite_non_negative(self.delta_p, "delta_p")
    }
}

/// Writes `dy/dt` for state `y` into `dy`.
///
/// Per cistron `j` of a transcript with composite transcription rate `a`:
/// `dm_j = a - delta_m * m_j` and `dp_j = alpha_p * rbs_j * m_j - delta_p * p_j`.
pub fn evaluate(
    circuit: &Circuit,
    rates: &KineticRates,
    y: &[f64],
    inducer_levels: &[f64],
    dy: &mut [f64],
) {
    debug_assert_eq!(y.len(), circuit.dim());
    debug_assert_eq!(dy.len(), circuit.dim());
    let layout = circuit.layout();
    for (tx, spec) in circuit.specs().iter().enumerate() {
        let alpha_m = circuit.transcription_rate(tx, rates, y, inducer_levels);
        for (j, cistron) in spec.cistrons.iter().enumerate() {
            let m_slot = layout.mrna_slot(tx, j);
            let p_slot = layout.protein_slot(tx, j);
            let m = y[m_slot];
            dy[m_slot] = alpha_m - rates.delta_m * m;
            dy[p_slot] = rates.alpha_p_base * cistron.rbs_strength * m - rates.delta_p * y[p_slot];
        }
    }
}
