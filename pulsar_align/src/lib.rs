//! pulsar_align - iterative alignment and averaging of pulsar portraits.
//!
//! Many observations of the same pulsar, each a set of frequency channels by
//! phase bins, are fitted against a template for phase, dispersion measure
//! and per-channel amplitude. Each is rotated into alignment and averaged
//! with noise-based weights. The average becomes the template for the next
//! round; the final average is a dispersion-free template.
//!
//! Reading archives and the numerical fitters live outside this crate and
//! are plugged in through the traits in [`backend`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pulsar_align::{AlignConfig, AlignmentEngine, Backends};
//!
//! let backends = Backends {
//!     loader: &loader,
//!     phase_fitter: &phase_fitter,
//!     portrait_fitter: &portrait_fitter,
//!     shifter: &FourierShifter::new(),
//!     reference: &SnrWeightedReference,
//! };
//! let engine = AlignmentEngine::new(AlignConfig::default().with_iterations(3), backends)?;
//! let aligned = engine.run(&paths, initial_template)?;
//! ```

pub mod accumulator;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod fit;
pub mod observation;
pub mod pipeline;
pub mod portrait;
pub mod round;

#[cfg(test)]
pub mod testing;

// ============================================================================
// Configuration and errors
// ============================================================================

pub use config::{AlignConfig, DEFAULT_PLACEMENT_WIDTH, Execution, Float};
pub use error::{BackendError, Error};

// ============================================================================
// Data
// ============================================================================

pub use observation::{ChannelSlice, LoadOptions, Observation, Subintegration};
pub use portrait::{Portrait, l2_distance, mean_profile_change};

// ============================================================================
// Collaborators
// ============================================================================

pub use backend::{
    Backends, DISPERSION_CONSTANT, DispersiveShift, FourierShifter, ObservationLoader,
    PhaseFitter, PortraitFitRequest, PortraitFitter, ProfileShifter, ReferenceFrequency,
    SnrWeightedReference, dispersion_delay,
};

// ============================================================================
// Fitting and accumulation
// ============================================================================

pub use accumulator::WeightedAccumulator;
pub use fit::{
    ChannelFitInput, ChannelFitPolicy, FitKind, FitResult, FitStatus, PhaseFit, PortraitFit,
    SINGLE_CHANNEL_STATUS_CODE, SingleChannelFit,
};

// ============================================================================
// Alignment
// ============================================================================

pub use engine::{AlignedTemplate, AlignmentEngine, gaussian_profile};
pub use round::{AlignmentRound, RoundOutput, SubintFit};
pub use pipeline::{AlignmentJob, ArchiveTools, read_metafile, run_job};
