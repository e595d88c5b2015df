//! Alignment configuration.
//!
//! A single `AlignConfig` carries every knob of a run: iteration count,
//! post-processing (rotation or placement), logging verbosity and the
//! execution strategy for a round. It can be built in code or loaded from a
//! YAML/JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Floating-point precision used by every array in the crate.
pub type Float = f64;

/// Default FWHM (in rotations) of the synthetic pulse used for placement.
pub const DEFAULT_PLACEMENT_WIDTH: Float = 0.0001;

/// How a round walks its observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// One observation after another into a single accumulator.
    #[default]
    Sequential,
    /// Observations fitted on the rayon pool, each into its own partial
    /// accumulator; partials are merged in list order.
    Parallel {
        /// Maximum number of observations loaded at the same time.
        max_concurrent: usize,
    },
}

/// Configuration for [`AlignmentEngine`](crate::AlignmentEngine).
///
/// # Examples
///
/// ```ignore
/// use pulsar_align::AlignConfig;
///
/// let config = AlignConfig::default()
///     .with_iterations(3)
///     .with_placement(0.25);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Number of align-and-average rounds. Must be at least 1.
    pub iterations: usize,
    /// Extra rotation (in rotations) applied to the final average.
    /// Ignored when `placement` is set.
    pub rotation_phase: Float,
    /// Phase at which the pulse peak should end up. Overrides `rotation_phase`.
    pub placement: Option<Float>,
    /// FWHM (in rotations) of the synthetic pulse used for placement.
    pub placement_width: Float,
    /// Stop early once the mean-profile change between rounds drops below
    /// this value. `None` runs exactly `iterations` rounds.
    pub convergence_tolerance: Option<Float>,
    /// Demote per-round progress to debug level.
    pub quiet: bool,
    /// Whether observations within a round are processed one by one or in parallel.
    pub execution: Execution,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            rotation_phase: 0.0,
            placement: None,
            placement_width: DEFAULT_PLACEMENT_WIDTH,
            convergence_tolerance: None,
            quiet: false,
            execution: Execution::Sequential,
        }
    }
}

impl AlignConfig {
    /// Load a configuration from a `.yaml`/`.yml`/`.json` file.
    ///
    /// Missing fields take their default values.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let config: Self = common::serde_format::load_file(path).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_rotation(mut self, phase: Float) -> Self {
        self.rotation_phase = phase;
        self
    }

    pub fn with_placement(mut self, phase: Float) -> Self {
        self.placement = Some(phase);
        self
    }

    pub fn with_convergence_tolerance(mut self, tolerance: Float) -> Self {
        self.convergence_tolerance = Some(tolerance);
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), Error> {
        if self.iterations == 0 {
            return Err(Error::InvalidConfig(
                "iterations must be at least 1".to_string(),
            ));
        }
        if !self.rotation_phase.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "rotation_phase must be finite, got {}",
                self.rotation_phase
            )));
        }
        if let Some(place) = self.placement {
            if !place.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "placement must be finite, got {place}"
                )));
            }
        }
        if !(self.placement_width > 0.0 && self.placement_width.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "placement_width must be positive, got {}",
                self.placement_width
            )));
        }
        if let Some(tol) = self.convergence_tolerance {
            if !(tol >= 0.0 && tol.is_finite()) {
                return Err(Error::InvalidConfig(format!(
                    "convergence_tolerance must be non-negative, got {tol}"
                )));
            }
        }
        if let Execution::Parallel { max_concurrent } = self.execution {
            if max_concurrent == 0 {
                return Err(Error::InvalidConfig(
                    "parallel max_concurrent must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}
