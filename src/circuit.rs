//! One-time resolution of a circuit: protein aliasing, regulator bindings and
//! the stochastic reaction channels implied by the packed layout.

use std::collections::HashMap;

use log::{debug, warn};

use crate::inducer::{InducerConfig, InducerSchedule};
use crate::kinetics::{canonicalize_regulator_name, hill_activation, hill_repression};
use crate::layout::StateLayout;
use crate::rhs::KineticRates;
use crate::transcript::{Coupling, TranscriptSpec};
use crate::{SimError, SimResult};

#[derive(Clone, Debug, PartialEq)]
pub struct ProteinEntry {
    pub key: String,
    /// Label of the first cistron seen with this key.
    pub label: String,
    pub slots: Vec<usize>,
}

impl ProteinEntry {
    #[inline]
    pub fn total(&self, state: &[f64]) -> f64 {
        self.slots.iter().map(|&slot| state[slot]).sum()
    }
}

/// Canonical regulator key -> protein slots, in first-appearance order.
#[derive(Clone, Debug, Default)]
pub struct ProteinIndex {
    entries: Vec<ProteinEntry>,
    by_key: HashMap<String, usize>,
}

impl ProteinIndex {
    pub fn build(specs: &[TranscriptSpec], layout: &StateLayout) -> Self {
        let mut index = Self::default();
        for (tx, spec) in specs.iter().enumerate() {
            for (j, cistron) in spec.cistrons.iter().enumerate() {
                let key = canonicalize_regulator_name(&cistron.protein_label);
                let slot = layout.protein_slot(tx, j);
                match index.by_key.get(&key) {
                    Some(&pos) => index.entries[pos].slots.push(slot),
                    None => {
                        index.by_key.insert(key.clone(), index.entries.len());
                        index.entries.push(ProteinEntry {
                            key,
                            label: cistron.protein_label.clone(),
                            slots: vec![slot],
                        });
                    }
                }
            }
        }
        index
    }

    pub fn get(&self, key: &str) -> Option<&ProteinEntry> {
        self.by_key.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn entries(&self) -> &[ProteinEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How an activator or repressor reference resolved against the circuit.
#[derive(Clone, Debug, PartialEq)]
pub enum Regulator {
    Absent,
    /// Configured, but no cistron in the circuit expresses it; reads as a
    /// zero concentration.
    Unresolved { name: String },
    Resolved { key: String, slots: Vec<usize> },
}

impl Regulator {
    fn resolve(coupling: Option<&Coupling>, proteins: &ProteinIndex) -> Self {
        let Some(coupling) = coupling else {
            return Self::Absent;
        };
        let key = canonicalize_regulator_name(&coupling.name);
        match proteins.get(&key) {
            Some(entry) => Self::Resolved {
                key,
                slots: entry.slots.clone(),
            },
            None => Self::Unresolved {
                name: coupling.name.clone(),
            },
        }
    }

    #[inline]
    pub fn concentration(&self, state: &[f64]) -> Option<f64> {
        match self {
            Self::Absent => None,
            Self::Unresolved { .. } => Some(0.0),
            Self::Resolved { slots, .. } => Some(slots.iter().map(|&slot| state[slot]).sum()),
        }
    }
}

/// How an inducer reference resolved against the run's inducer schedule.
#[derive(Clone, Debug, PartialEq)]
pub enum InducerBinding {
    Absent,
    /// The run carries no inducer schedule at all; the inducer factor is
    /// skipped and the promoter behaves as uninduced-but-unregulated.
    Unscheduled { name: String },
    /// A schedule exists but has no entry with this name; reads as zero.
    Unresolved { name: String },
    Scheduled { index: usize },
}

impl InducerBinding {
    fn resolve(coupling: Option<&Coupling>, schedule: &InducerSchedule) -> Self {
        let Some(coupling) = coupling else {
            return Self::Absent;
        };
        let name = coupling.name.clone();
        if schedule.is_empty() {
            return Self::Unscheduled { name };
        }
        match schedule.position(&coupling.name) {
            Some(index) => Self::Scheduled { index },
            None => Self::Unresolved { name },
        }
    }

    #[inline]
    pub fn concentration(&self, inducer_levels: &[f64]) -> Option<f64> {
        match self {
            Self::Absent | Self::Unscheduled { .. } => None,
            Self::Unresolved { .. } => Some(0.0),
            Self::Scheduled { index } => Some(inducer_levels[*index]),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bindings {
    pub activator: Regulator,
    pub repressor: Regulator,
    pub inducer: InducerBinding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegulatorRole {
    Activator,
    Repressor,
    Inducer,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub transcript_id: String,
    pub role: RegulatorRole,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    Transcription,
    MrnaDecay,
    Translation,
    ProteinDecay,
}

#[derive(Clone, Debug)]
pub struct ReactionChannel {
    pub kind: ChannelKind,
    pub transcript: usize,
    pub mrna: usize,
    pub protein: usize,
    pub rbs_strength: f64,
}

impl ReactionChannel {
    #[inline]
    pub(crate) fn propensity(&self, rates: &KineticRates, state: &[f64], tx_rates: &[f64]) -> f64 {
        let value = match self.kind {
            ChannelKind::Transcription => tx_rates[self.transcript],
            ChannelKind::MrnaDecay => rates.delta_m * state[self.mrna],
            ChannelKind::Translation => rates.alpha_p_base * self.rbs_strength * state[self.mrna],
            ChannelKind::ProteinDecay => rates.delta_p * state[self.protein],
        };
        value.max(0.0)
    }

    #[inline]
    pub(crate) fn fire(&self, state: &mut [f64]) {
        match self.kind {
            ChannelKind::Transcription => state[self.mrna] += 1.0,
            ChannelKind::MrnaDecay => {
                if state[self.mrna] > 0.0 {
                    state[self.mrna] -= 1.0;
                }
            }
            ChannelKind::Translation => state[self.protein] += 1.0,
            ChannelKind::ProteinDecay => {
                if state[self.protein] > 0.0 {
                    state[self.protein] -= 1.0;
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Circuit {
    specs: Vec<TranscriptSpec>,
    layout: StateLayout,
    proteins: ProteinIndex,
    bindings: Vec<Bindings>,
    inducers: InducerSchedule,
    channels: Vec<ReactionChannel>,
}

impl Circuit {
    pub fn new(specs: Vec<TranscriptSpec>, inducers: Vec<InducerConfig>) -> SimResult<Self> {
        if specs.is_empty() {
            return Err(SimError::InvalidArgument(
                "circuit must contain at least one transcript".into(),
            ));
        }
        for spec in &specs {
            spec.validate()?;
        }
        let inducers = InducerSchedule::new(inducers)?;
        let layout = StateLayout::new(&specs);
        let proteins = ProteinIndex::build(&specs, &layout);
        let bindings: Vec<Bindings> = specs
            .iter()
            .map(|spec| Bindings {
                activator: Regulator::resolve(spec.activator.as_ref(), &proteins),
                repressor: Regulator::resolve(spec.repressor.as_ref(), &proteins),
                inducer: InducerBinding::resolve(spec.inducer.as_ref(), &inducers),
            })
            .collect();
        let channels = build_channels(&specs, &layout);

        let circuit = Self {
            specs,
            layout,
            proteins,
            bindings,
            inducers,
            channels,
        };
        for unresolved in circuit.unresolved_references() {
            warn!(
                "transcript '{}' {:?} '{}' does not resolve; treating its concentration as zero",
                unresolved.transcript_id, unresolved.role, unresolved.name
            );
        }
        debug!(
            "resolved circuit: {} transcripts, {} state slots, {} distinct proteins, {} inducers",
            circuit.specs.len(),
            circuit.layout.dim(),
            circuit.proteins.len(),
            circuit.inducers.len()
        );
        Ok(circuit)
    }

    pub fn specs(&self) -> &[TranscriptSpec] {
        &self.specs
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn dim(&self) -> usize {
        self.layout.dim()
    }

    pub fn proteins(&self) -> &ProteinIndex {
        &self.proteins
    }

    pub fn bindings(&self, transcript: usize) -> &Bindings {
        &self.bindings[transcript]
    }

    pub fn inducers(&self) -> &InducerSchedule {
        &self.inducers
    }

    pub fn channels(&self) -> &[ReactionChannel] {
        &self.channels
    }

    pub fn initial_state(&self, m0_by_gene: &[f64], p0_by_gene: &[f64]) -> SimResult<Vec<f64>> {
        self.layout.pack(m0_by_gene, p0_by_gene)
    }

    /// References that read as zero. Inducers are only listed when a schedule
    /// was supplied, since without one the inducer factor does not apply.
    pub fn unresolved_references(&self) -> Vec<UnresolvedReference> {
        let mut out = Vec::new();
        for (spec, bindings) in self.specs.iter().zip(&self.bindings) {
            let mut push = |role, name: &str| {
                out.push(UnresolvedReference {
                    transcript_id: spec.transcript_id.clone(),
                    role,
                    name: name.to_string(),
                })
            };
            if let Regulator::Unresolved { name } = &bindings.activator {
                push(RegulatorRole::Activator, name);
            }
            if let Regulator::Unresolved { name } = &bindings.repressor {
                push(RegulatorRole::Repressor, name);
            }
            if let InducerBinding::Unresolved { name } = &bindings.inducer {
                push(RegulatorRole::Inducer, name);
            }
        }
        out
    }

    #[inline]
    pub fn regulation_factor(&self, transcript: usize, state: &[f64], inducer_levels: &[f64]) -> f64 {
        let spec = &self.specs[transcript];
        let bindings = &self.bindings[transcript];
        let mut factor = 1.0;
        if let (Some(coupling), Some(level)) =
            (&spec.inducer, bindings.inducer.concentration(inducer_levels))
        {
            factor *= hill_activation(level, coupling.k, coupling.n, spec.leak);
        }
        if let (Some(coupling), Some(level)) =
            (&spec.activator, bindings.activator.concentration(state))
        {
            factor *= hill_activation(level, coupling.k, coupling.n, spec.leak);
        }
        if let (Some(coupling), Some(level)) =
            (&spec.repressor, bindings.repressor.concentration(state))
        {
            factor *= hill_repression(level, coupling.k, coupling.n);
        }
        factor
    }

    #[inline]
    pub fn transcription_rate(
        &self,
        transcript: usize,
        rates: &KineticRates,
        state: &[f64],
        inducer_levels: &[f64],
    ) -> f64 {
        rates.alpha_m_base
            * self.specs[transcript].promoter_strength
            * self.regulation_factor(transcript, state, inducer_levels)
    }
}

fn build_channels(specs: &[TranscriptSpec], layout: &StateLayout) -> Vec<ReactionChannel> {
    let mut channels = Vec::with_capacity(4 * layout.n_genes());
    for (tx, spec) in specs.iter().enumerate() {
        for (j, cistron) in spec.cistrons.iter().enumerate() {
            let mrna = layout.mrna_slot(tx, j);
            let protein = layout.protein_slot(tx, j);
            for kind in [
                ChannelKind::Transcription,
                ChannelKind::MrnaDecay,
                ChannelKind::Translation,
                ChannelKind::ProteinDecay,
            ] {
                channels.push(ReactionChannel {
                    kind,
                    transcript: tx,
                    mrna,
                    protein,
                    rbs_strength: cistron.rbs_strength,
                });
            }
        }
    }
    channels
}
