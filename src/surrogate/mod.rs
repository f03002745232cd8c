// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Surrogate-assisted robust optimization.
//!
//! Phases, always in this order:
//! 1. [`dataset`]: Monte-Carlo (pulse × θ) dataset labelled by full simulation
//! 2. [`forest`]: random-forest surrogate with held-out MAE / R²
//! 3. [`optimize`]: differential evolution ([`evolution`]) on the
//!    worst- or mean-case surrogate objective over fresh θ draws
//! 4. [`optimize::verify`]: full re-simulation on another independent θ batch

pub mod dataset;
pub mod evolution;
pub mod forest;
pub mod optimize;

pub use dataset::{feature_row, simulated_fidelity, RowMeta, SurrogateDataset, ROW_DIM};
pub use evolution::{differential_evolution, EvolutionConfig, EvolutionResult};
pub use forest::{train_surrogate, ForestConfig, RandomForest, SurrogateMetrics, TrainedSurrogate};
pub use optimize::{
    optimize_pulse, verify, ObjectiveWeights, OptimizationResult, Penalties, ReduceMode,
    RobustObjective, SearchConfig, VerificationReport,
};
