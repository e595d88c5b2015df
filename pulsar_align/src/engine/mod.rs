//! Iterative alignment: rounds of fit-and-average, then post-processing.
//!
//! Every round uses the previous round's average as its template. After the
//! last round the template is optionally rotated by a fixed phase, or its
//! pulse is placed at a requested phase (placement wins when both are set).
//! The result always carries a DM of zero.

mod placement;


pub use placement::gaussian_profile;

use std::path::PathBuf;

use crate::backend::Backends;
use crate::config::{AlignConfig, Float};
use crate::error::Error;
use crate::portrait::{Portrait, mean_profile_change};
use crate::round::{AlignmentRound, SubintFit};

/// Final output of an alignment run.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTemplate {
    pub portrait: Portrait,
    /// Total weight per channel from the last round.
    pub channel_weights: Vec<Float>,
    /// Dispersion measure of `portrait`; always zero.
    pub dm: Float,
    pub rounds_completed: usize,
    /// L2 change of the mean profile in each round.
    pub round_changes: Vec<Float>,
    /// Rotation applied after the last round, zero if none.
    pub applied_rotation: Float,
    /// Fit diagnostics of the last round.
    pub last_round_fits: Vec<SubintFit>,
}

impl AlignedTemplate {
    /// Channels that received no weight at all. Their profiles are zero and
    /// should be flagged when the template is written out.
    pub fn zero_weight_channels(&self) -> Vec<usize> {
        self.channels_where(|w| w == 0.0)
    }

    /// Channels whose total weight is negative, from negative fitted scales.
    /// They are zeroed like unweighted channels, so they are flagged too.
    pub fn negative_weight_channels(&self) -> Vec<usize> {
        self.channels_where(|w| w < 0.0)
    }

    fn channels_where(&self, predicate: impl Fn(Float) -> bool) -> Vec<usize> {
        self.channel_weights
            .iter()
            .enumerate()
            .filter(|(_, w)| predicate(**w))
            .map(|(ichan, _)| ichan)
            .collect()
    }
}

/// Runs alignment rounds over a fixed list of observations.
pub struct AlignmentEngine<'a> {
    config: AlignConfig,
    backends: Backends<'a>,
}

impl<'a> AlignmentEngine<'a> {
    /// Create an engine. Fails if `config` does not validate.
    pub fn new(config: AlignConfig, backends: Backends<'a>) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config, backends })
    }

    /// Align and average `paths`, starting from `initial_template`.
    pub fn run(
        &self,
        paths: &[PathBuf],
        initial_template: Portrait,
    ) -> Result<AlignedTemplate, Error> {
        if paths.is_empty() {
            return Err(Error::NoObservations);
        }
        if initial_template.is_empty() {
            return Err(Error::EmptyTemplate);
        }

        let round = AlignmentRound::new(&self.config, self.backends);
        let mut template = initial_template;
        let mut round_changes = Vec::with_capacity(self.config.iterations);
        let mut channel_weights = Vec::new();
        let mut last_round_fits = Vec::new();

        for iround in 0..self.config.iterations {
            let output = round.run(paths, &template, iround)?;
            let change = mean_profile_change(&template, &output.template);
            round_changes.push(change);
            tracing::debug!(round = iround + 1, change, "Template updated");

            template = output.template;
            channel_weights = output.channel_weights;
            last_round_fits = output.fits;

            if let Some(tolerance) = self.config.convergence_tolerance {
                if change < tolerance {
                    tracing::info!(
                        round = iround + 1,
                        change,
                        tolerance,
                        "Template converged, stopping early"
                    );
                    break;
                }
            }
        }

        let (portrait, applied_rotation) = self.post_process(template)?;

        let aligned = AlignedTemplate {
            portrait,
            channel_weights,
            dm: 0.0,
            rounds_completed: round_changes.len(),
            round_changes,
            applied_rotation,
            last_round_fits,
        };
        let zero_weight = aligned.zero_weight_channels();
        if !zero_weight.is_empty() {
            tracing::warn!(
                channels = ?zero_weight,
                "Channels received no weight and are zero in the template"
            );
        }
        let negative_weight = aligned.negative_weight_channels();
        if !negative_weight.is_empty() {
            tracing::warn!(
                channels = ?negative_weight,
                "Channels have negative total weight and are zero in the template"
            );
        }
        Ok(aligned)
    }

    /// Apply placement or rotation to the final template.
    fn post_process(&self, template: Portrait) -> Result<(Portrait, Float), Error> {
        let phase = match self.config.placement {
            Some(location) => {
                let phase = placement::placement_phase(
                    self.backends,
                    &template,
                    location,
                    self.config.placement_width,
                )?;
                tracing::debug!(location, phase, "Placing pulse");
                phase
            }
            None => self.config.rotation_phase,
        };

        if phase == 0.0 {
            return Ok((template, 0.0));
        }
        Ok((self.backends.shifter.rotate(&template, phase), phase))
    }
}
