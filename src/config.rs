// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. pulse-synth.yaml file
//! 3. Environment variables (PULSESYNTH_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::f64::consts::PI;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::physics::PhysicalModel;
use crate::propagate::{Propagator, SolverKind};
use crate::pulse::GaussianDragPulse;
use crate::surrogate::{EvolutionConfig, ForestConfig, ObjectiveWeights, ReduceMode, SearchConfig};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Pulse family settings
    #[serde(default)]
    pub pulse: PulseConfig,

    /// Propagation settings
    #[serde(default)]
    pub propagation: PropagationConfig,

    /// Surrogate model settings
    #[serde(default)]
    pub surrogate: SurrogateConfig,

    /// Optimizer settings
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Verification settings
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            for path in &["pulse-synth.yaml", "pulse-synth.yml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// A variable that is set but does not parse is a configuration error.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("PULSESYNTH_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("PULSESYNTH_LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Some(solver) = env_parse("PULSESYNTH_SOLVER")? {
            self.propagation.solver = solver;
        }
        if let Some(seed) = env_parse("PULSESYNTH_NOISE_SEED")? {
            self.propagation.noise_seed = seed;
        }
        if let Some(v) = env_parse("PULSESYNTH_SMOOTH_SIGMA_PTS")? {
            self.pulse.smooth_sigma_pts = v;
        }
        if let Some(n) = env_parse("PULSESYNTH_N_TREES")? {
            self.surrogate.n_trees = n;
        }
        if let Some(mode) = env_parse("PULSESYNTH_OPT_MODE")? {
            self.optimizer.mode = mode;
        }
        if let Some(n) = env_parse("PULSESYNTH_MAX_ITERATIONS")? {
            self.optimizer.max_iterations = n;
        }
        if let Some(n) = env_parse("PULSESYNTH_N_THETA_EVAL")? {
            self.optimizer.n_theta_eval = n;
        }
        if let Some(n) = env_parse("PULSESYNTH_N_THETA_VERIFY")? {
            self.verification.n_theta = n;
        }
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        let p = &self.pulse;
        if !(p.samples_per_second.is_finite() && p.samples_per_second > 0.0) {
            return Err(Error::Config("pulse.samples_per_second must be positive".into()));
        }
        if !(p.amp_headroom.is_finite() && p.amp_headroom > 0.0) {
            return Err(Error::Config("pulse.amp_headroom must be positive".into()));
        }
        if !(p.sigma_min_fraction > 0.0 && p.sigma_min_fraction <= 0.5) {
            return Err(Error::Config(
                "pulse.sigma_min_fraction must lie in (0, 0.5]".into(),
            ));
        }
        if !(p.smooth_sigma_pts >= 0.0 && p.smooth_sigma_pts.is_finite()) {
            return Err(Error::Config("pulse.smooth_sigma_pts cannot be negative".into()));
        }
        if self.propagation.rk4_substeps == 0 {
            return Err(Error::Config("propagation.rk4_substeps must be greater than 0".into()));
        }
        let s = &self.surrogate;
        if s.n_trees == 0 {
            return Err(Error::Config("surrogate.n_trees must be greater than 0".into()));
        }
        if s.min_samples_leaf == 0 {
            return Err(Error::Config(
                "surrogate.min_samples_leaf must be greater than 0".into(),
            ));
        }
        if !(s.test_fraction > 0.0 && s.test_fraction < 1.0) {
            return Err(Error::Config("surrogate.test_fraction must lie in (0, 1)".into()));
        }
        if self.optimizer.n_theta_eval == 0 {
            return Err(Error::Config("optimizer.n_theta_eval must be greater than 0".into()));
        }
        if self.verification.n_theta == 0 {
            return Err(Error::Config("verification.n_theta must be greater than 0".into()));
        }
        self.optimizer.evolution(0).validate()?;
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(Error::Config(format!(
                "logging.format must be json or pretty, got '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Propagator for `model` with the configured solver and noise seed.
    pub fn propagator(&self, model: PhysicalModel) -> Propagator {
        Propagator::new(model)
            .with_solver(self.propagation.solver.build(self.propagation.rk4_substeps))
            .with_noise_seed(self.propagation.noise_seed)
    }

    pub fn forest(&self, seed: u64) -> ForestConfig {
        ForestConfig {
            n_trees: self.surrogate.n_trees,
            min_samples_leaf: self.surrogate.min_samples_leaf,
            max_depth: self.surrogate.max_depth,
            seed,
        }
    }

    pub fn search(&self, seed: u64) -> SearchConfig {
        let o = &self.optimizer;
        SearchConfig {
            mode: o.mode,
            n_theta_eval: o.n_theta_eval,
            weights: ObjectiveWeights {
                out_of_bounds: o.out_of_bounds_penalty,
                area: o.area_weight,
                phase: o.phase_weight,
                leakage: o.leakage_weight,
            },
            seed_calibrated_guess: o.seed_calibrated_guess,
            smooth_sigma_pts: self.pulse.smooth_sigma_pts,
            evolution: o.evolution(seed),
        }
    }
}

/// Pulse family configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Time-grid resolution (samples per second)
    #[serde(default = "default_samples_per_second")]
    pub samples_per_second: f64,

    /// Amplitude ceiling as a multiple of 2π/duration
    #[serde(default = "default_amp_headroom")]
    pub amp_headroom: f64,

    /// Minimum Gaussian width as a fraction of the duration
    #[serde(default = "default_sigma_min_fraction")]
    pub sigma_min_fraction: f64,

    /// Gaussian smoothing width in samples (0 disables)
    #[serde(default)]
    pub smooth_sigma_pts: f64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            samples_per_second: default_samples_per_second(),
            amp_headroom: default_amp_headroom(),
            sigma_min_fraction: default_sigma_min_fraction(),
            smooth_sigma_pts: 0.0,
        }
    }
}

impl PulseConfig {
    /// Pulse family for a gate of the given duration (seconds).
    pub fn family(&self, duration: f64) -> Result<GaussianDragPulse> {
        let n_steps = (duration * self.samples_per_second).round();
        if !(n_steps >= 1.0) {
            return Err(Error::Config(format!(
                "duration {} s gives no samples at {} samples/s",
                duration, self.samples_per_second
            )));
        }
        GaussianDragPulse::new(
            duration,
            n_steps as usize,
            2.0 * PI / duration * self.amp_headroom,
            duration * self.sigma_min_fraction,
        )
    }
}

fn default_samples_per_second() -> f64 {
    20e9
}

fn default_amp_headroom() -> f64 {
    4.0
}

fn default_sigma_min_fraction() -> f64 {
    1.0 / 20.0
}

/// Propagation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Seed for the per-call quasi-static detuning noise draw
    #[serde(default = "default_noise_seed")]
    pub noise_seed: u64,

    /// Open-system solver (exponential, rk4, none)
    #[serde(default)]
    pub solver: SolverKind,

    /// RK4 steps per pulse slice
    #[serde(default = "default_rk4_substeps")]
    pub rk4_substeps: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            noise_seed: default_noise_seed(),
            solver: SolverKind::default(),
            rk4_substeps: default_rk4_substeps(),
        }
    }
}

fn default_noise_seed() -> u64 {
    crate::propagate::DEFAULT_NOISE_SEED
}

fn default_rk4_substeps() -> usize {
    8
}

/// Surrogate model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurrogateConfig {
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// Unlimited when absent
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Held-out fraction
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Held-out R² below this is reported as a warning
    #[serde(default = "default_r2_warning_threshold")]
    pub r2_warning_threshold: f64,
}

impl Default for SurrogateConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            min_samples_leaf: default_min_samples_leaf(),
            max_depth: None,
            test_fraction: default_test_fraction(),
            r2_warning_threshold: default_r2_warning_threshold(),
        }
    }
}

fn default_n_trees() -> usize {
    400
}

fn default_min_samples_leaf() -> usize {
    2
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_r2_warning_threshold() -> f64 {
    0.5
}

/// Optimizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Reduction over θ (worst, mean)
    #[serde(default)]
    pub mode: ReduceMode,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Population size multiplier (× parameter dimension)
    #[serde(default = "default_population_size")]
    pub population_size: usize,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Dither range for the mutation factor
    #[serde(default = "default_mutation")]
    pub mutation: (f64, f64),

    #[serde(default = "default_recombination")]
    pub recombination: f64,

    /// Fresh θ draws the objective is evaluated on
    #[serde(default = "default_n_theta_eval")]
    pub n_theta_eval: usize,

    #[serde(default = "default_out_of_bounds_penalty")]
    pub out_of_bounds_penalty: f64,

    #[serde(default = "default_area_weight")]
    pub area_weight: f64,

    #[serde(default = "default_phase_weight")]
    pub phase_weight: f64,

    #[serde(default = "default_leakage_weight")]
    pub leakage_weight: f64,

    /// Put the calibrated Gaussian into the initial population
    #[serde(default = "default_true")]
    pub seed_calibrated_guess: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            mode: ReduceMode::default(),
            max_iterations: default_max_iterations(),
            population_size: default_population_size(),
            tolerance: default_tolerance(),
            mutation: default_mutation(),
            recombination: default_recombination(),
            n_theta_eval: default_n_theta_eval(),
            out_of_bounds_penalty: default_out_of_bounds_penalty(),
            area_weight: default_area_weight(),
            phase_weight: default_phase_weight(),
            leakage_weight: default_leakage_weight(),
            seed_calibrated_guess: true,
        }
    }
}

impl OptimizerConfig {
    pub fn evolution(&self, seed: u64) -> EvolutionConfig {
        EvolutionConfig {
            max_iterations: self.max_iterations,
            population_size: self.population_size,
            tolerance: self.tolerance,
            atol: 0.0,
            mutation: self.mutation,
            recombination: self.recombination,
            seed,
        }
    }
}

fn default_max_iterations() -> usize {
    120
}

fn default_population_size() -> usize {
    18
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_mutation() -> (f64, f64) {
    (0.5, 1.0)
}

fn default_recombination() -> f64 {
    0.7
}

fn default_n_theta_eval() -> usize {
    64
}

fn default_out_of_bounds_penalty() -> f64 {
    10.0
}

fn default_area_weight() -> f64 {
    2.0
}

fn default_phase_weight() -> f64 {
    5.0
}

fn default_leakage_weight() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// Verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Independent θ draws for full re-simulation
    #[serde(default = "default_n_theta_verify")]
    pub n_theta: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            n_theta: default_n_theta_verify(),
        }
    }
}

fn default_n_theta_verify() -> usize {
    128
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

/// Parse an environment variable, `None` when it is unset.
fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid {} '{}': {}", name, val, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::sync::Mutex;

    /// Serializes tests that touch PULSESYNTH_* variables or call `load`.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pulse.samples_per_second, 20e9);
        assert_eq!(config.propagation.noise_seed, 12345);
        assert_eq!(config.propagation.solver, SolverKind::Exponential);
        assert_eq!(config.surrogate.n_trees, 400);
        assert_eq!(config.optimizer.mode, ReduceMode::Worst);
        assert_eq!(config.verification.n_theta, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pulse_family_from_config() {
        let family = PulseConfig::default().family(40e-9).unwrap();
        assert_eq!(family.n_steps, 800);
        approx::assert_relative_eq!(family.amp_max, 4.0 * 2.0 * PI / 40e-9, max_relative = 1e-12);
        approx::assert_relative_eq!(family.sigma_min, 2e-9, max_relative = 1e-12);
        assert!(PulseConfig::default().family(1e-12).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut bad = Config::default();
        bad.surrogate.test_fraction = 1.0;
        assert!(bad.validate().is_err());

        let mut bad = Config::default();
        bad.optimizer.recombination = 2.0;
        assert!(bad.validate().is_err());

        let mut bad = Config::default();
        bad.logging.format = "xml".into();
        let msg = bad.validate().unwrap_err().to_string();
        assert!(msg.contains("logging.format"));
    }

    #[test]
    fn test_config_load_from_file() {
        let _guard = env_guard();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
propagation:
  solver: rk4
  rk4_substeps: 4
optimizer:
  mode: mean
  mutation: [0.4, 0.9]
surrogate:
  n_trees: 25
"#
        )
        .unwrap();

        let config = Config::load(Some(f.path())).unwrap();
        assert_eq!(config.propagation.solver, SolverKind::Rk4);
        assert_eq!(config.propagation.rk4_substeps, 4);
        assert_eq!(config.optimizer.mode, ReduceMode::Mean);
        assert_eq!(config.optimizer.mutation, (0.4, 0.9));
        assert_eq!(config.surrogate.n_trees, 25);
        // untouched sections keep their defaults
        assert_eq!(config.propagation.noise_seed, 12345);
        assert_eq!(config.verification.n_theta, 128);
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let _guard = env_guard();
        let path = std::path::Path::new("/tmp/does_not_exist_pulse_synth_test.yaml");
        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.surrogate.n_trees, 400);
    }

    #[test]
    fn test_config_load_invalid_yaml() {
        let _guard = env_guard();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{{{not: valid: yaml::::").unwrap();
        assert!(Config::load(Some(f.path())).is_err());
    }

    #[test]
    fn test_env_override_solver() {
        let _guard = env_guard();
        let mut config = Config::default();
        std::env::set_var("PULSESYNTH_SOLVER", "none");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.propagation.solver, SolverKind::None);
        std::env::remove_var("PULSESYNTH_SOLVER");
    }

    #[test]
    fn test_env_override_noise_seed() {
        let _guard = env_guard();
        let mut config = Config::default();
        std::env::set_var("PULSESYNTH_NOISE_SEED", "99");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.propagation.noise_seed, 99);
        std::env::remove_var("PULSESYNTH_NOISE_SEED");
    }

    #[test]
    fn test_env_override_mode() {
        let _guard = env_guard();
        let mut config = Config::default();
        std::env::set_var("PULSESYNTH_OPT_MODE", "mean");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.optimizer.mode, ReduceMode::Mean);
        std::env::remove_var("PULSESYNTH_OPT_MODE");
    }

    #[test]
    fn test_env_override_rejects_bad_values() {
        let _guard = env_guard();
        for (name, bad) in [
            ("PULSESYNTH_OPT_MODE", "median"),
            ("PULSESYNTH_SOLVER", "rk44"),
            ("PULSESYNTH_N_TREES", "-3"),
            ("PULSESYNTH_SMOOTH_SIGMA_PTS", "wide"),
        ] {
            std::env::set_var(name, bad);
            let mut config = Config::default();
            let err = config.apply_env_overrides();
            std::env::remove_var(name);
            match err {
                Err(Error::Config(msg)) => assert!(msg.contains(name), "{}", msg),
                other => panic!("{} = {}: expected config error, got {:?}", name, bad, other),
            }
        }
    }

    #[test]
    fn test_load_fails_on_bad_env_value() {
        let _guard = env_guard();
        std::env::set_var("PULSESYNTH_NOISE_SEED", "seven");
        let result = Config::load(None);
        std::env::remove_var("PULSESYNTH_NOISE_SEED");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_env_override_log_level() {
        let _guard = env_guard();
        let mut config = Config::default();
        std::env::set_var("PULSESYNTH_LOG_LEVEL", "debug");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.logging.level, "debug");
        std::env::remove_var("PULSESYNTH_LOG_LEVEL");
    }

    #[test]
    fn test_search_config_mapping() {
        let config = Config::default();
        let search = config.search(7);
        assert_eq!(search.evolution.seed, 7);
        assert_eq!(search.weights.area, 2.0);
        assert_eq!(search.weights.out_of_bounds, 10.0);
        assert_eq!(config.forest(3).seed, 3);
        let prop = config.propagator(PhysicalModel::closed());
        assert_eq!(prop.solver_name(), Some("exponential"));
        assert_eq!(prop.noise_seed(), 12345);
    }
}
