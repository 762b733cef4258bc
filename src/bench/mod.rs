//! Benchmark engine module
//!
//! Contains the calibration trial, the concurrent trial runner and the
//! driver that sweeps thread counts.

pub mod calibrate;
pub mod driver;
pub mod trial;

// Re-export commonly used types
pub use calibrate::{calibrated_block_size, Calibration, Calibrator};
pub use driver::{
    run_sweep, BenchmarkDriver, RunState, StopPolicy, StopReason, SweepEvent, SweepOutcome,
    SweepPhase,
};
pub use trial::{aggregate_trial, ThreadFailure, Trial, TrialFailure, TrialRunner};
