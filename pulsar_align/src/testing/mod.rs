//! Testing utilities for pulsar_align.

#![allow(dead_code)]

pub mod fakes;
pub mod synthetic;

pub use fakes::{
    CrossCorrelationPhaseFitter, CrossCorrelationPortraitFitter, MemoryArchiveTools,
    MemoryLoader, ScriptedPortraitFitter,
};

use crate::backend::{
    Backends, FourierShifter, ObservationLoader, PhaseFitter, PortraitFitter,
    SnrWeightedReference,
};

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

static SHIFTER: std::sync::LazyLock<FourierShifter> = std::sync::LazyLock::new(FourierShifter::new);
static REFERENCE: SnrWeightedReference = SnrWeightedReference;

/// Backends with the built-in shifter and reference heuristic.
pub fn backends<'a>(
    loader: &'a dyn ObservationLoader,
    phase_fitter: &'a dyn PhaseFitter,
    portrait_fitter: &'a dyn PortraitFitter,
) -> Backends<'a> {
    Backends {
        loader,
        phase_fitter,
        portrait_fitter,
        shifter: &*SHIFTER,
        reference: &REFERENCE,
    }
}
