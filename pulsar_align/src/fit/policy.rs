//! Per-subintegration fitting: joint phase/DM fit across channels, or a
//! phase-only fit when a single channel is valid.

use std::path::Path;

use crate::backend::{Backends, DispersiveShift, PortraitFitRequest};
use crate::config::Float;
use crate::error::{BackendError, Error};
use crate::fit::{FitResult, SingleChannelFit};
use crate::portrait::Portrait;

/// Data of one subintegration restricted to its valid channels.
#[derive(Debug, Clone, Copy)]
pub struct ChannelFitInput<'a> {
    /// Observation the data came from, for error context.
    pub source: &'a Path,
    pub subint: usize,
    pub portrait: &'a Portrait,
    /// Template rows matching `portrait`'s channels.
    pub template: &'a Portrait,
    pub freqs: &'a [Float],
    pub snrs: &'a [Float],
    pub noise_stds: &'a [Float],
    pub period: Float,
    pub dm_guess: Float,
}

/// Chooses between the joint portrait fit and the single-channel phase fit
/// and produces one [`FitResult`] per subintegration.
#[derive(Debug, Clone, Copy)]
pub struct ChannelFitPolicy<'a> {
    backends: Backends<'a>,
}

impl<'a> ChannelFitPolicy<'a> {
    pub fn new(backends: Backends<'a>) -> Self {
        Self { backends }
    }

    pub fn fit(&self, input: &ChannelFitInput<'_>) -> Result<FitResult, Error> {
        validate_input(input)?;
        let fit_error = |source: BackendError| Error::Fit {
            path: input.source.to_path_buf(),
            subint: input.subint,
            source,
        };
        let b = self.backends;

        let reference_frequency = b.reference.select(input.freqs, input.snrs);

        // Phase guess from the profile dedispersed with the stored DM.
        let working = b.shifter.shift(
            input.portrait,
            &DispersiveShift {
                phase: 0.0,
                dm: input.dm_guess,
                period: input.period,
                freqs: input.freqs,
                reference_frequency,
            },
        );
        let phase_guess = b
            .phase_fitter
            .fit_phase(&working.mean_profile(), &input.template.mean_profile(), None)
            .map_err(fit_error)?
            .phase;

        if input.portrait.nchan() == 1 {
            let fit = b
                .phase_fitter
                .fit_phase(
                    input.portrait.channel(0),
                    input.template.channel(0),
                    Some(input.noise_stds[0]),
                )
                .map_err(fit_error)?;
            return Ok(FitResult::SingleChannel(SingleChannelFit {
                phase: fit.phase,
                phase_error: fit.phase_error,
                dm: input.dm_guess,
                scale: fit.scale,
                scale_error: fit.scale_error,
                reference_frequency: input.freqs[0],
            }));
        }

        let fit = b
            .portrait_fitter
            .fit_portrait(&PortraitFitRequest {
                portrait: input.portrait,
                template: input.template,
                phase_guess,
                dm_guess: input.dm_guess,
                period: input.period,
                freqs: input.freqs,
                reference_frequency,
                noise_stds: input.noise_stds,
            })
            .map_err(fit_error)?;

        if fit.scales.len() != input.portrait.nchan() {
            return Err(Error::LengthMismatch {
                what: "fitted channel scales",
                expected: input.portrait.nchan(),
                actual: fit.scales.len(),
            });
        }
        Ok(FitResult::Joint(fit))
    }
}

fn validate_input(input: &ChannelFitInput<'_>) -> Result<(), Error> {
    let (nchan, nbin) = input.portrait.shape();
    if nchan == 0 {
        return Err(Error::EmptyChannelSet);
    }
    for (what, expected, actual) in [
        ("template channels", nchan, input.template.nchan()),
        ("template phase bins", nbin, input.template.nbin()),
        ("frequencies", nchan, input.freqs.len()),
        ("SNRs", nchan, input.snrs.len()),
        ("noise stds", nchan, input.noise_stds.len()),
    ] {
        if expected != actual {
            return Err(Error::LengthMismatch {
                what,
                expected,
                actual,
            });
        }
    }
    Ok(())
}
