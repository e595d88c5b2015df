//! Collaborator interfaces consumed by the alignment core.
//!
//! Loading observations and fitting profiles are provided from outside the
//! crate. The phase-rotation transform and the reference-frequency heuristic
//! have built-in implementations ([`FourierShifter`], [`SnrWeightedReference`]).

mod fourier;
mod reference;


pub use fourier::{DISPERSION_CONSTANT, FourierShifter, dispersion_delay};
pub use reference::SnrWeightedReference;

use std::path::Path;

use crate::config::Float;
use crate::error::BackendError;
use crate::fit::{PhaseFit, PortraitFit};
use crate::observation::{LoadOptions, Observation};
use crate::portrait::Portrait;

/// Loads an observation into memory.
pub trait ObservationLoader: Send + Sync {
    /// Load `path`, applying `options`. Must report per-subintegration and
    /// per-channel validity, frequencies, SNRs, noise levels, period and DM.
    fn load_observation(
        &self,
        path: &Path,
        options: &LoadOptions,
    ) -> Result<Observation, BackendError>;
}

/// Picks the frequency at which phase and DM are referenced in a fit.
pub trait ReferenceFrequency: Send + Sync {
    fn select(&self, freqs: &[Float], snrs: &[Float]) -> Float;
}

/// Phase and dispersion applied by [`ProfileShifter::shift`].
#[derive(Debug, Clone, Copy)]
pub struct DispersiveShift<'a> {
    /// Rotation at `reference_frequency`, in rotations.
    pub phase: Float,
    pub dm: Float,
    /// Rotation period in seconds.
    pub period: Float,
    /// One frequency (MHz) per portrait channel.
    pub freqs: &'a [Float],
    pub reference_frequency: Float,
}

/// Rotates portraits in phase.
///
/// Positive phases move the pulse to earlier phase: `out(t) = in(t + delay)`.
pub trait ProfileShifter: Send + Sync {
    /// Rotate every channel by `phase` plus its dispersive delay relative to
    /// the reference frequency.
    fn shift(&self, portrait: &Portrait, shift: &DispersiveShift<'_>) -> Portrait;

    /// Rotate every channel by the same `phase`.
    fn rotate(&self, portrait: &Portrait, phase: Float) -> Portrait;
}

/// One-dimensional phase-shift estimator.
pub trait PhaseFitter: Send + Sync {
    /// Fit the rotation which, applied to `profile` with
    /// [`ProfileShifter::rotate`], best aligns it with `template`.
    /// `noise` is the profile's noise standard deviation if known.
    fn fit_phase(
        &self,
        profile: &[Float],
        template: &[Float],
        noise: Option<Float>,
    ) -> Result<PhaseFit, BackendError>;
}

/// Inputs of a joint portrait fit.
#[derive(Debug, Clone, Copy)]
pub struct PortraitFitRequest<'a> {
    pub portrait: &'a Portrait,
    pub template: &'a Portrait,
    pub phase_guess: Float,
    pub dm_guess: Float,
    pub period: Float,
    pub freqs: &'a [Float],
    pub reference_frequency: Float,
    /// Per-channel noise standard deviations, used as fit weights.
    pub noise_stds: &'a [Float],
}

/// Joint phase / DM / per-channel amplitude fitter.
pub trait PortraitFitter: Send + Sync {
    /// Fit the portrait. Non-convergence is reported through
    /// [`PortraitFit::status`], not as an error.
    fn fit_portrait(&self, request: &PortraitFitRequest<'_>) -> Result<PortraitFit, BackendError>;
}

/// The set of collaborators an alignment run works with.
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub loader: &'a dyn ObservationLoader,
    pub phase_fitter: &'a dyn PhaseFitter,
    pub portrait_fitter: &'a dyn PortraitFitter,
    pub shifter: &'a dyn ProfileShifter,
    pub reference: &'a dyn ReferenceFrequency,
}

impl std::fmt::Debug for Backends<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
