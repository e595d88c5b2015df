//! Fit results and the per-subintegration fitting policy.

mod policy;


pub use policy::{ChannelFitInput, ChannelFitPolicy};

use strum_macros::Display;

use crate::config::Float;

/// Status code reported for the single-channel fallback. Never produced by a
/// joint fitter.
pub const SINGLE_CHANNEL_STATUS_CODE: i32 = -2;

/// Outcome of a numerical fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// The fitter reports success with this code.
    Converged(i32),
    /// The fitter stopped without converging; the estimate is still used.
    NotConverged(i32),
    /// Phase-only fallback for a subintegration with one valid channel.
    SingleChannel,
}

impl FitStatus {
    /// Numerical status code, [`SINGLE_CHANNEL_STATUS_CODE`] for the fallback.
    pub fn code(&self) -> i32 {
        match self {
            FitStatus::Converged(code) | FitStatus::NotConverged(code) => *code,
            FitStatus::SingleChannel => SINGLE_CHANNEL_STATUS_CODE,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, FitStatus::Converged(_))
    }
}

impl std::fmt::Display for FitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitStatus::Converged(code) => write!(f, "converged ({code})"),
            FitStatus::NotConverged(code) => write!(f, "not converged ({code})"),
            FitStatus::SingleChannel => write!(f, "single channel ({SINGLE_CHANNEL_STATUS_CODE})"),
        }
    }
}

/// Which path produced a [`FitResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FitKind {
    Joint,
    SingleChannel,
}

/// Result of a 1-D phase-shift fit of a profile against a template profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseFit {
    /// Rotation (in rotations) that aligns the profile with the template.
    pub phase: Float,
    pub phase_error: Float,
    /// Amplitude of the profile relative to the template.
    pub scale: Float,
    pub scale_error: Float,
}

/// Result of a joint phase / dispersion / amplitude fit of a portrait.
#[derive(Debug, Clone, PartialEq)]
pub struct PortraitFit {
    /// Phase at `reference_frequency`, in rotations.
    pub phase: Float,
    pub phase_error: Float,
    pub dm: Float,
    pub dm_error: Float,
    /// One amplitude per fitted channel.
    pub scales: Vec<Float>,
    pub scale_errors: Vec<Float>,
    /// Frequency (MHz) at which `phase` is referenced.
    pub reference_frequency: Float,
    /// Phase/DM covariance.
    pub covariance: Float,
    pub status: FitStatus,
    /// Function evaluations or iterations spent by the fitter.
    pub iterations: usize,
}

/// Phase-only estimate for a subintegration with a single valid channel.
///
/// The DM stays at the observation's guess and is not constrained.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleChannelFit {
    pub phase: Float,
    pub phase_error: Float,
    pub dm: Float,
    pub scale: Float,
    pub scale_error: Float,
    /// Frequency of the one channel.
    pub reference_frequency: Float,
}

/// Per-subintegration estimate used to weight and align data.
#[derive(Debug, Clone, PartialEq)]
pub enum FitResult {
    Joint(PortraitFit),
    SingleChannel(SingleChannelFit),
}

impl FitResult {
    pub fn kind(&self) -> FitKind {
        match self {
            FitResult::Joint(_) => FitKind::Joint,
            FitResult::SingleChannel(_) => FitKind::SingleChannel,
        }
    }

    pub fn phase(&self) -> Float {
        match self {
            FitResult::Joint(fit) => fit.phase,
            FitResult::SingleChannel(fit) => fit.phase,
        }
    }

    pub fn phase_error(&self) -> Float {
        match self {
            FitResult::Joint(fit) => fit.phase_error,
            FitResult::SingleChannel(fit) => fit.phase_error,
        }
    }

    pub fn dm(&self) -> Float {
        match self {
            FitResult::Joint(fit) => fit.dm,
            FitResult::SingleChannel(fit) => fit.dm,
        }
    }

    /// Zero for the single-channel path, where the DM is held fixed.
    pub fn dm_error(&self) -> Float {
        match self {
            FitResult::Joint(fit) => fit.dm_error,
            FitResult::SingleChannel(_) => 0.0,
        }
    }

    pub fn scales(&self) -> &[Float] {
        match self {
            FitResult::Joint(fit) => &fit.scales,
            FitResult::SingleChannel(fit) => std::slice::from_ref(&fit.scale),
        }
    }

    pub fn scale_errors(&self) -> &[Float] {
        match self {
            FitResult::Joint(fit) => &fit.scale_errors,
            FitResult::SingleChannel(fit) => std::slice::from_ref(&fit.scale_error),
        }
    }

    pub fn reference_frequency(&self) -> Float {
        match self {
            FitResult::Joint(fit) => fit.reference_frequency,
            FitResult::SingleChannel(fit) => fit.reference_frequency,
        }
    }

    pub fn status(&self) -> FitStatus {
        match self {
            FitResult::Joint(fit) => fit.status,
            FitResult::SingleChannel(_) => FitStatus::SingleChannel,
        }
    }

    /// Phase/DM covariance; `None` when it was not estimated.
    pub fn covariance(&self) -> Option<Float> {
        match self {
            FitResult::Joint(fit) => Some(fit.covariance),
            FitResult::SingleChannel(_) => None,
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            FitResult::Joint(fit) => fit.iterations,
            FitResult::SingleChannel(_) => 0,
        }
    }
}
