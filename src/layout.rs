//! Packed state-vector layout, output time grid and dense trajectories.
//!
//! The state vector is transcript-major and, inside a transcript,
//! cistron-major: every cistron owns an mRNA slot immediately followed by its
//! protein slot, `[m_0, p_0, m_1, p_1, ...]`.

use crate::transcript::TranscriptSpec;
use crate::{SimError, SimResult, require_positive};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateLayout {
    offsets: Vec<usize>,
    cistron_counts: Vec<usize>,
    dim: usize,
}

impl StateLayout {
    pub fn new(specs: &[TranscriptSpec]) -> Self {
        let mut offsets = Vec::with_capacity(specs.len());
        let mut cistron_counts = Vec::with_capacity(specs.len());
        let mut dim = 0usize;
        for spec in specs {
            offsets.push(dim);
            cistron_counts.push(spec.n_cistrons());
            dim += 2 * spec.n_cistrons();
        }
        Self {
            offsets,
            cistron_counts,
            dim,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn n_transcripts(&self) -> usize {
        self.offsets.len()
    }

    pub fn n_genes(&self) -> usize {
        self.dim / 2
    }

    pub fn n_cistrons(&self, transcript: usize) -> usize {
        self.cistron_counts[transcript]
    }

    #[inline]
    pub fn mrna_slot(&self, transcript: usize, cistron: usize) -> usize {
        self.offsets[transcript] + 2 * cistron
    }

    #[inline]
    pub fn protein_slot(&self, transcript: usize, cistron: usize) -> usize {
        self.offsets[transcript] + 2 * cistron + 1
    }

    /// Interleaves per-gene initial counts (request order: every cistron of
    /// the first transcript, then the second, ...) into a packed state.
    pub fn pack(&self, m0_by_gene: &[f64], p0_by_gene: &[f64]) -> SimResult<Vec<f64>> {
        let n_genes = self.n_genes();
        if m0_by_gene.len() != n_genes || p0_by_gene.len() != n_genes {
            return Err(SimError::Shape(format!(
                "expected m0_by_gene/p0_by_gene length {n_genes}, got {}/{}",
                m0_by_gene.len(),
                p0_by_gene.len()
            )));
        }
        if let Some(bad) = m0_by_gene
            .iter()
            .chain(p0_by_gene)
            .find(|value| !value.is_finite() || **value < 0.0)
        {
            return Err(SimError::InvalidArgument(format!(
                "initial counts must be finite and non-negative (got {bad})"
            )));
        }
        let mut state = Vec::with_capacity(self.dim);
        for (&m0, &p0) in m0_by_gene.iter().zip(p0_by_gene) {
            state.push(m0);
            state.push(p0);
        }
        Ok(state)
    }

    pub(crate) fn check_state(&self, state: &[f64]) -> SimResult<()> {
        if state.len() != self.dim {
            return Err(SimError::Shape(format!(
                "initial state length {} does not match state dimension {}",
                state.len(),
                self.dim
            )));
        }
        Ok(())
    }
}

/// Uniform output grid `t_k = k * dt` for `k in 0..steps`, with
/// `steps = floor(T / dt) + 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeGrid {
    t_end: f64,
    dt: f64,
    steps: usize,
}

impl TimeGrid {
    pub fn new(t_end: f64, dt: f64) -> SimResult<Self> {
        require_positive(t_end, "T")?;
        require_positive(dt, "dt")?;
        let intervals = (t_end / dt).floor();
        let too_many = || {
            SimError::InvalidArgument(format!(
                "T / dt = {intervals} gives more grid points than can be addressed"
            ))
        };
        if !intervals.is_finite() || intervals > usize::MAX as f64 - 1.0 {
            return Err(too_many());
        }
        let steps = (intervals as usize).checked_add(1).ok_or_else(too_many)?;
        Ok(Self { t_end, dt, steps })
    }

    pub fn t_end(&self) -> f64 {
        self.t_end
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    #[inline]
    pub fn time(&self, k: usize) -> f64 {
        k as f64 * self.dt
    }

    pub fn times(&self) -> Vec<f64> {
        (0..self.steps).map(|k| self.time(k)).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub time: Vec<f64>,
    pub states: Vec<f64>,
    pub dim: usize,
}

impl Trajectory {
    pub(crate) fn zeros(grid: &TimeGrid, dim: usize) -> Self {
        Self {
            time: grid.times(),
            states: vec![0.0; grid.steps() * dim],
            dim,
        }
    }

    pub fn n_steps(&self) -> usize {
        self.time.len()
    }

    pub fn row(&self, k: usize) -> &[f64] {
        &self.states[k * self.dim..(k + 1) * self.dim]
    }

    pub(crate) fn row_mut(&mut self, k: usize) -> &mut [f64] {
        &mut self.states[k * self.dim..(k + 1) * self.dim]
    }

    pub fn final_state(&self) -> &[f64] {
        self.row(self.n_steps() - 1)
    }

    pub fn series(&self, slot: usize) -> Vec<f64> {
        self.states
            .chunks_exact(self.dim)
            .map(|row| row[slot])
            .collect()
    }
}
