//! Exogenous inducer signals (IPTG, aTc, ...) as functions of simulation time.

use std::f64::consts::PI;

use serde::Deserialize;

use crate::kinetics::canonicalize_regulator_name;
use crate::{SimError, SimResult, require_finite_non_negative};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Constant,
    Ramp,
    #[serde(alias = "sin", alias = "sine")]
    Sinusoidal,
    Square,
    Pulse,
}

impl Waveform {
    fn is_periodic(self) -> bool {
        matches!(self, Self::Sinusoidal | Self::Square | Self::Pulse)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct InducerConfig {
    pub name: String,
    #[serde(alias = "function")]
    pub waveform: Waveform,
    pub value: f64,
    pub baseline: f64,
    pub amplitude: f64,
    pub period: f64,
    pub duty_cycle: f64,
    pub slope: f64,
    pub delay: f64,
}

impl Default for InducerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            waveform: Waveform::Constant,
            value: 0.0,
            baseline: 0.0,
            amplitude: 1.0,
            period: 100.0,
            duty_cycle: 0.5,
            slope: 0.0,
            delay: 0.0,
        }
    }
}

impl InducerConfig {
    pub fn constant(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            waveform: Waveform::Constant,
            value,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        let label = if self.name.is_empty() {
            "<unnamed>"
        } else {
            self.name.as_str()
        };
        for (field, value) in [
            ("value", self.value),
            ("baseline", self.baseline),
            ("amplitude", self.amplitude),
            ("slope", self.slope),
        ] {
            if !value.is_finite() {
                return Err(SimError::InvalidArgument(format!(
                    "inducer '{label}' {field} must be finite"
                )));
            }
        }
        require_finite_non_negative(self.delay, &format!("inducer '{label}' delay"))?;
        let levels = match self.waveform {
            Waveform::Constant => vec![("value", self.value)],
            Waveform::Ramp => vec![("baseline", self.baseline)],
            _ => vec![
                ("baseline", self.baseline),
                ("baseline + amplitude", self.baseline + self.amplitude),
            ],
        };
        for (field, level) in levels {
            if level < 0.0 {
                return Err(SimError::InvalidArgument(format!(
                    "inducer '{label}' {field} must be non-negative (got {level})"
                )));
            }
        }
        if self.waveform.is_periodic() && !(self.period.is_finite() && self.period > 0.0) {
            return Err(SimError::InvalidArgument(format!(
                "inducer '{label}' period must be positive for {:?} waveforms",
                self.waveform
            )));
        }
        if !(0.0..=1.0).contains(&self.duty_cycle) {
            return Err(SimError::InvalidArgument(format!(
                "inducer '{label}' duty_cycle must lie in [0, 1]"
            )));
        }
        Ok(())
    }
}

/// Inducer level at time `t`, never negative. Pure and cheap: evaluated once
/// per inducer per integration stage.
pub fn inducer_concentration(config: &InducerConfig, t: f64) -> f64 {
    raw_level(config, t).max(0.0)
}

fn raw_level(config: &InducerConfig, t: f64) -> f64 {
    if t < config.delay {
        return match config.waveform {
            Waveform::Constant => 0.0,
            _ => config.baseline,
        };
    }
    let t_eff = t - config.delay;
    let on_level = config.baseline + config.amplitude;
    match config.waveform {
        Waveform::Constant => config.value,
        Waveform::Ramp => config.baseline + config.slope * t_eff,
        Waveform::Sinusoidal => {
            let phase = t_eff.rem_euclid(config.period) / config.period;
            config.baseline + config.amplitude * (0.5 + 0.5 * (2.0 * PI * phase).sin())
        }
        Waveform::Square => {
            let phase = t_eff.rem_euclid(config.period) / config.period;
            if phase < config.duty_cycle {
                on_level
            } else {
                config.baseline
            }
        }
        // single pulse, never repeats
        Waveform::Pulse => {
            if t_eff < config.duty_cycle * config.period {
                on_level
            } else {
                config.baseline
            }
        }
    }
}

pub fn inducer_time_series(config: &InducerConfig, times: &[f64]) -> Vec<f64> {
    times
        .iter()
        .map(|&t| inducer_concentration(config, t))
        .collect()
}

#[derive(Clone, Debug, Default)]
pub struct InducerSchedule {
    configs: Vec<InducerConfig>,
    keys: Vec<String>,
}

impl InducerSchedule {
    pub fn new(configs: Vec<InducerConfig>) -> SimResult<Self> {
        for config in &configs {
            config.validate()?;
        }
        let keys = configs
            .iter()
            .map(|config| canonicalize_regulator_name(&config.name))
            .collect();
        Ok(Self { configs, keys })
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn configs(&self) -> &[InducerConfig] {
        &self.configs
    }

    /// Index of the inducer whose canonical name matches `name`. When a name
    /// appears more than once the last entry wins.
    pub fn position(&self, name: &str) -> Option<usize> {
        let key = canonicalize_regulator_name(name);
        self.keys.iter().rposition(|candidate| *candidate == key)
    }

    pub fn concentrations_at(&self, t: f64, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.configs.len());
        for (dst, config) in out.iter_mut().zip(&self.configs) {
            *dst = inducer_concentration(config, t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_ignores_delay_after_onset_and_is_zero_before() {
        let config = InducerConfig {
            delay: 5.0,
            ..InducerConfig::constant("IPTG", 3.0)
        };
        assert_eq!(inducer_concentration(&config, 0.0), 0.0);
        assert_eq!(inducer_concentration(&config, 5.0), 3.0);
        assert_eq!(inducer_concentration(&config, 1e6), 3.0);

        let undelayed = InducerConfig::constant("IPTG", 3.0);
        for t in [0.0, 0.5, 10.0, 999.0] {
            assert_eq!(inducer_concentration(&undelayed, t), 3.0);
        }
    }

    #[test]
    fn single_pulse_does_not_repeat() {
        let config = InducerConfig {
            name: "aTc".into(),
            waveform: Waveform::Pulse,
            delay: 10.0,
            period: 20.0,
            duty_cycle: 0.5,
            amplitude: 5.0,
            baseline: 1.0,
            ..InducerConfig::default()
        };
        for t in [0.0, 5.0, 9.999] {
            assert_eq!(inducer_concentration(&config, t), 1.0);
        }
        for t in [10.0, 15.0, 19.999] {
            assert_eq!(inducer_concentration(&config, t), 6.0);
        }
        for t in [20.0, 30.0, 35.0, 50.0, 1000.0] {
            assert_eq!(inducer_concentration(&config, t), 1.0);
        }
    }

    #[test]
    fn square_wave_repeats_each_period() {
        let config = InducerConfig {
            name: "ara".into(),
            waveform: Waveform::Square,
            period: 10.0,
            duty_cycle: 0.3,
            amplitude: 2.0,
            baseline: 0.5,
            ..InducerConfig::default()
        };
        assert_eq!(inducer_concentration(&config, 1.0), 2.5);
        assert_eq!(inducer_concentration(&config, 5.0), 0.5);
        assert_eq!(inducer_concentration(&config, 11.0), 2.5);
        assert_eq!(inducer_concentration(&config, 29.9), 0.5);
    }

    #[test]
    fn ramp_is_clamped_at_zero() {
        let config = InducerConfig {
            name: "ahl".into(),
            waveform: Waveform::Ramp,
            baseline: 2.0,
            slope: -0.5,
            delay: 1.0,
            ..InducerConfig::default()
        };
        assert_eq!(inducer_concentration(&config, 0.0), 2.0);
        assert_eq!(inducer_concentration(&config, 3.0), 1.0);
        assert_eq!(inducer_concentration(&config, 100.0), 0.0);
    }

    #[test]
    fn sinusoid_oscillates_between_baseline_and_peak() {
        let config = InducerConfig {
            name: "light".into(),
            waveform: Waveform::Sinusoidal,
            baseline: 1.0,
            amplitude: 4.0,
            period: 8.0,
            ..InducerConfig::default()
        };
        assert!((inducer_concentration(&config, 0.0) - 3.0).abs() < 1e-12);
        assert!((inducer_concentration(&config, 2.0) - 5.0).abs() < 1e-12);
        assert!((inducer_concentration(&config, 6.0) - 1.0).abs() < 1e-12);
        assert!((inducer_concentration(&config, 10.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn schedule_matches_canonical_names_and_last_wins() {
        let schedule = InducerSchedule::new(vec![
            InducerConfig::constant("IPTG", 1.0),
            InducerConfig::constant("aTc", 2.0),
            InducerConfig::constant("iptg", 3.0),
        ])
        .unwrap();
        assert_eq!(schedule.position("IPTG"), Some(2));
        assert_eq!(schedule.position("a-T-c"), Some(1));
        assert_eq!(schedule.position("arabinose"), None);
        let mut out = vec![0.0; schedule.len()];
        schedule.concentrations_at(0.0, &mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn schedule_rejects_invalid_waveforms() {
        let bad_period = InducerConfig {
            name: "x".into(),
            waveform: Waveform::Square,
            period: 0.0,
            ..InducerConfig::default()
        };
        assert!(matches!(
            InducerSchedule::new(vec![bad_period]),
            Err(SimError::InvalidArgument(msg)) if msg.contains("period")
        ));
        let bad_duty = InducerConfig {
            name: "x".into(),
            duty_cycle: 1.5,
            ..InducerConfig::default()
        };
        assert!(InducerSchedule::new(vec![bad_duty]).is_err());
    }

    #[test]
    fn negative_levels_are_rejected_and_never_returned() {
        assert!(matches!(
            InducerConfig::constant("IPTG", -1.0).validate(),
            Err(SimError::InvalidArgument(msg)) if msg.contains("value")
        ));
        let dipping_square = InducerConfig {
            name: "aTc".into(),
            waveform: Waveform::Square,
            baseline: 1.0,
            amplitude: -3.0,
            ..InducerConfig::default()
        };
        assert!(matches!(
            dipping_square.validate(),
            Err(SimError::InvalidArgument(msg)) if msg.contains("baseline + amplitude")
        ));
        assert_eq!(inducer_concentration(&dipping_square, 0.0), 0.0);

        let falling = InducerConfig {
            name: "ara".into(),
            waveform: Waveform::Ramp,
            baseline: 2.0,
            slope: -1.0,
            ..InducerConfig::default()
        };
        assert!(falling.validate().is_ok());
        assert_eq!(inducer_concentration(&falling, 1.0), 1.0);
        assert_eq!(inducer_concentration(&falling, 10.0), 0.0);
        assert_eq!(inducer_concentration(&InducerConfig::constant("x", -4.0), 1.0), 0.0);
    }

    #[test]
    fn config_deserializes_with_defaults_and_aliases() {
        let config: InducerConfig =
            serde_json::from_str(r#"{"name": "IPTG", "function": "sin", "amplitude": 2.0}"#)
                .unwrap();
        assert_eq!(config.waveform, Waveform::Sinusoidal);
        assert_eq!(config.amplitude, 2.0);
        assert_eq!(config.period, 100.0);
        assert_eq!(config.delay, 0.0);
    }
}
