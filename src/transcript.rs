//! Transcriptional units: a promoter, its regulatory couplings, and the
//! cistrons it drives.

use serde::Deserialize;

use crate::{SimError, SimResult, require_finite_non_negative, require_positive};

pub const DEFAULT_HILL_K: f64 = 10.0;
pub const DEFAULT_HILL_N: f64 = 2.0;

fn default_hill_k() -> f64 {
    DEFAULT_HILL_K
}

fn default_hill_n() -> f64 {
    DEFAULT_HILL_N
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Coupling {
    pub name: String,
    #[serde(default = "default_hill_k")]
    pub k: f64,
    #[serde(default = "default_hill_n")]
    pub n: f64,
}

impl Coupling {
    pub fn new(name: impl Into<String>, k: f64, n: f64) -> Self {
        Self {
            name: name.into(),
            k,
            n,
        }
    }

    fn validate(&self, transcript_id: &str, role: &str) -> SimResult<()> {
        require_positive(self.k, &format!("transcript '{transcript_id}' {role} K"))?;
        require_positive(self.n, &format!("transcript '{transcript_id}' {role} n"))
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Cistron {
    pub id: String,
    /// Name of the expressed protein, matched against regulator references.
    #[serde(alias = "gene_name")]
    pub protein_label: String,
    #[serde(default = "default_rbs_strength")]
    pub rbs_strength: f64,
    #[serde(default, alias = "rbsName")]
    pub rbs_name: Option<String>,
}

fn default_rbs_strength() -> f64 {
    1.0
}

impl Cistron {
    pub fn new(id: impl Into<String>, protein_label: impl Into<String>, rbs_strength: f64) -> Self {
        Self {
            id: id.into(),
            protein_label: protein_label.into(),
            rbs_strength,
            rbs_name: None,
        }
    }

    pub fn with_rbs_name(mut self, name: impl Into<String>) -> Self {
        self.rbs_name = Some(name.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TranscriptSpec {
    pub transcript_id: String,
    /// Display name of the promoter part; empty falls back to the id.
    #[serde(default, alias = "promoterName")]
    pub promoter_name: String,
    pub promoter_strength: f64,
    #[serde(default)]
    pub leak: f64,
    #[serde(default)]
    pub activator: Option<Coupling>,
    #[serde(default, alias = "inhibitor")]
    pub repressor: Option<Coupling>,
    #[serde(default)]
    pub inducer: Option<Coupling>,
    pub cistrons: Vec<Cistron>,
    #[serde(default, alias = "terminatorName")]
    pub terminator_name: Option<String>,
}

impl TranscriptSpec {
    pub fn new(transcript_id: impl Into<String>, promoter_strength: f64) -> Self {
        Self {
            transcript_id: transcript_id.into(),
            promoter_name: String::new(),
            promoter_strength,
            leak: 0.0,
            activator: None,
            repressor: None,
            inducer: None,
            cistrons: Vec::new(),
            terminator_name: None,
        }
    }

    pub fn with_parts(mut self, promoter: impl Into<String>, terminator: Option<&str>) -> Self {
        self.promoter_name = promoter.into();
        self.terminator_name = terminator.map(str::to_string);
        self
    }

    pub fn promoter_label(&self) -> &str {
        if self.promoter_name.is_empty() {
            &self.transcript_id
        } else {
            &self.promoter_name
        }
    }

    pub fn with_leak(mut self, leak: f64) -> Self {
        self.leak = leak;
        self
    }

    pub fn with_activator(mut self, name: impl Into<String>, k: f64, n: f64) -> Self {
        self.activator = Some(Coupling::new(name, k, n));
        self
    }

    pub fn with_repressor(mut self, name: impl Into<String>, k: f64, n: f64) -> Self {
        self.repressor = Some(Coupling::new(name, k, n));
        self
    }

    pub fn with_inducer(mut self, name: impl Into<String>, k: f64, n: f64) -> Self {
        self.inducer = Some(Coupling::new(name, k, n));
        self
    }

    pub fn with_cistron(
        mut self,
        id: impl Into<String>,
        protein_label: impl Into<String>,
        rbs_strength: f64,
    ) -> Self {
        self.cistrons.push(Cistron::new(id, protein_label, rbs_strength));
        self
    }

    pub fn n_cistrons(&self) -> usize {
        self.cistrons.len()
    }

    pub fn validate(&self) -> SimResult<()> {
        let id = &self.transcript_id;
        require_finite_non_negative(
            self.promoter_strength,
            &format!("transcript '{id}' promoter_strength"),
        )?;
        if !(0.0..=1.0).contains(&self.leak) {
            return Err(SimError::InvalidArgument(format!(
                "transcript '{id}' leak must lie in [0, 1] (got {})",
                self.leak
            )));
        }
        if let Some(coupling) = &self.activator {
            coupling.validate(id, "activator")?;
        }
        if let Some(coupling) = &self.repressor {
            coupling.validate(id, "repressor")?;
        }
        if let Some(coupling) = &self.inducer {
            coupling.validate(id, "inducer")?;
        }
        if self.cistrons.is_empty() {
            return Err(SimError::InvalidArgument(format!(
                "transcript '{id}' must contain at least one cistron"
            )));
        }
        for cistron in &self.cistrons {
            require_finite_non_negative(
                cistron.rbs_strength,
                &format!("cistron '{}' rbs_strength", cistron.id),
            )?;
        }
        Ok(())
    }
}
