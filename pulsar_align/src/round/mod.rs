//! One alignment-and-averaging pass over every observation.
//!
//! Each valid subintegration is fitted against the current template, rotated
//! into alignment with the fitted phase and DM, and accumulated with
//! per-channel weights `scale / noise²`. The normalized sum is the next
//! template.


use std::path::{Path, PathBuf};

use crate::accumulator::WeightedAccumulator;
use crate::backend::{Backends, DispersiveShift};
use crate::config::{AlignConfig, Execution, Float};
use crate::error::Error;
use crate::fit::{ChannelFitInput, ChannelFitPolicy, FitKind, FitResult};
use crate::observation::LoadOptions;
use crate::portrait::Portrait;

/// Fit diagnostics of one subintegration.
#[derive(Debug, Clone, PartialEq)]
pub struct SubintFit {
    pub observation: PathBuf,
    pub subint: usize,
    /// Channels that entered the fit, as indices into the full portrait.
    pub channels: Vec<usize>,
    pub fit: FitResult,
}

/// Result of one round.
#[derive(Debug, Clone)]
pub struct RoundOutput {
    /// Weighted average, the next round's template.
    pub template: Portrait,
    /// Total weight per channel.
    pub channel_weights: Vec<Float>,
    /// One entry per fitted subintegration, in processing order.
    pub fits: Vec<SubintFit>,
}

impl RoundOutput {
    pub fn non_converged_count(&self) -> usize {
        self.fits
            .iter()
            .filter(|f| f.fit.kind() == FitKind::Joint && !f.fit.status().is_converged())
            .count()
    }

    pub fn single_channel_count(&self) -> usize {
        self.fits
            .iter()
            .filter(|f| f.fit.kind() == FitKind::SingleChannel)
            .count()
    }
}

/// Partial result for a single observation.
#[derive(Debug)]
struct ObservationPartial {
    accumulator: WeightedAccumulator,
    fits: Vec<SubintFit>,
}

/// Runs one round of fitting and weighted averaging.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentRound<'a> {
    config: &'a AlignConfig,
    backends: Backends<'a>,
}

impl<'a> AlignmentRound<'a> {
    pub fn new(config: &'a AlignConfig, backends: Backends<'a>) -> Self {
        Self { config, backends }
    }

    /// Align every observation in `paths` to `template` and average them.
    /// `round` is zero-based and only used for logging.
    pub fn run(
        &self,
        paths: &[PathBuf],
        template: &Portrait,
        round: usize,
    ) -> Result<RoundOutput, Error> {
        if paths.is_empty() {
            return Err(Error::NoObservations);
        }
        if template.is_empty() {
            return Err(Error::EmptyTemplate);
        }

        if self.config.quiet {
            tracing::debug!(round = round + 1, observations = paths.len(), "Doing iteration");
        } else {
            tracing::info!(round = round + 1, observations = paths.len(), "Doing iteration");
        }

        let (nchan, nbin) = template.shape();
        let (accumulator, fits) = match self.config.execution {
            Execution::Sequential => {
                let mut accumulator = WeightedAccumulator::new(nchan, nbin);
                let mut fits = Vec::new();
                for path in paths {
                    self.accumulate_observation(path, template, &mut accumulator, &mut fits)?;
                }
                (accumulator, fits)
            }
            Execution::Parallel { max_concurrent } => common::parallel::try_par_fold_ordered(
                paths,
                max_concurrent,
                (WeightedAccumulator::new(nchan, nbin), Vec::new()),
                |_, path: &PathBuf| self.process_observation(path, template),
                |(mut accumulator, mut fits), partial: ObservationPartial| {
                    accumulator.merge(&partial.accumulator)?;
                    fits.extend(partial.fits);
                    Ok((accumulator, fits))
                },
            )?,
        };

        let output = RoundOutput {
            template: accumulator.normalize(),
            channel_weights: accumulator.channel_weights(),
            fits,
        };

        let zero_weight = output.channel_weights.iter().filter(|&&w| w == 0.0).count();
        tracing::debug!(
            round = round + 1,
            subints = output.fits.len(),
            non_converged = output.non_converged_count(),
            single_channel = output.single_channel_count(),
            zero_weight_channels = zero_weight,
            "Round complete"
        );

        Ok(output)
    }

    /// Fit one observation into its own accumulator.
    fn process_observation(
        &self,
        path: &Path,
        template: &Portrait,
    ) -> Result<ObservationPartial, Error> {
        let (nchan, nbin) = template.shape();
        let mut accumulator = WeightedAccumulator::new(nchan, nbin);
        let mut fits = Vec::new();
        self.accumulate_observation(path, template, &mut accumulator, &mut fits)?;
        Ok(ObservationPartial { accumulator, fits })
    }

    fn accumulate_observation(
        &self,
        path: &Path,
        template: &Portrait,
        accumulator: &mut WeightedAccumulator,
        fits: &mut Vec<SubintFit>,
    ) -> Result<(), Error> {
        let b = self.backends;
        let observation = b
            .loader
            .load_observation(path, &LoadOptions::per_subint())
            .map_err(|source| Error::Load {
                path: path.to_path_buf(),
                source,
            })?;
        observation.validate()?;

        if observation.subints.is_empty() {
            tracing::warn!(path = %path.display(), "Observation has no subintegrations");
            return Ok(());
        }
        let (nchan, nbin) = observation.shape();
        let (expected_nchan, expected_nbin) = template.shape();
        if (nchan, nbin) != (expected_nchan, expected_nbin) {
            return Err(Error::DimensionMismatch {
                path: path.to_path_buf(),
                expected_nchan,
                expected_nbin,
                actual_nchan: nchan,
                actual_nbin: nbin,
            });
        }

        let policy = ChannelFitPolicy::new(b);
        for (isub, subint) in observation.iter_valid() {
            if subint.valid_channels.is_empty() {
                tracing::debug!(path = %path.display(), subint = isub, "No valid channels, skipping");
                continue;
            }

            let slice = subint.valid_slice();
            let model = template.select_channels(&subint.valid_channels);
            let fit = policy.fit(&ChannelFitInput {
                source: path,
                subint: isub,
                portrait: &slice.portrait,
                template: &model,
                freqs: &slice.freqs,
                snrs: &slice.snrs,
                noise_stds: &slice.noise_stds,
                period: subint.period,
                dm_guess: observation.dm,
            })?;

            tracing::debug!(
                path = %path.display(),
                subint = isub,
                kind = %fit.kind(),
                phase = fit.phase(),
                phase_error = fit.phase_error(),
                dm = fit.dm(),
                dm_error = fit.dm_error(),
                status = %fit.status(),
                "Fitted subintegration"
            );
            if fit.kind() == FitKind::Joint && !fit.status().is_converged() && !self.config.quiet {
                tracing::warn!(
                    path = %path.display(),
                    subint = isub,
                    status = %fit.status(),
                    "Portrait fit did not converge, using its estimate"
                );
            }

            let weights: Vec<Float> = fit
                .scales()
                .iter()
                .zip(&slice.noise_stds)
                .map(|(scale, err)| scale / (err * err))
                .collect();
            let shifted = b.shifter.shift(
                &slice.portrait,
                &DispersiveShift {
                    phase: fit.phase(),
                    dm: fit.dm(),
                    period: subint.period,
                    freqs: &slice.freqs,
                    reference_frequency: fit.reference_frequency(),
                },
            );
            accumulator.add(&subint.valid_channels, &weights, &shifted)?;

            fits.push(SubintFit {
                observation: path.to_path_buf(),
                subint: isub,
                channels: subint.valid_channels.clone(),
                fit,
            });
        }
        Ok(())
    }
}
