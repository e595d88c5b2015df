//! Post-processing of the final template: fixed rotation or pulse placement.

use crate::backend::Backends;
use crate::config::Float;
use crate::error::Error;
use crate::portrait::Portrait;

/// FWHM to standard deviation.
const FWHM_TO_SIGMA: Float = 0.424_660_900_144_009_5; // 1 / (2 * sqrt(2 ln 2))

/// Gaussian of unit peak on a circular phase axis of `nbin` bins.
///
/// `location` and `fwhm` are in rotations. Bin `i` sits at phase `i / nbin`.
/// The FWHM is clamped to one bin so the profile always has a non-zero bin.
pub fn gaussian_profile(nbin: usize, location: Float, fwhm: Float) -> Vec<Float> {
    if nbin == 0 {
        return Vec::new();
    }
    let n = nbin as Float;
    let sigma = fwhm.max(1.0 / n) * FWHM_TO_SIGMA;

    let mut profile: Vec<Float> = (0..nbin)
        .map(|i| {
            let mut d = i as Float / n - location;
            d -= d.round();
            (-0.5 * (d / sigma).powi(2)).exp()
        })
        .collect();

    let peak = profile.iter().copied().fold(0.0, Float::max);
    if peak > 0.0 {
        profile.iter_mut().for_each(|v| *v /= peak);
    }
    profile
}

/// Phase that moves the pulse of `template` to `location`.
///
/// The mean profile is fitted against a narrow Gaussian scaled to the
/// profile's peak.
pub(crate) fn placement_phase(
    backends: Backends<'_>,
    template: &Portrait,
    location: Float,
    width: Float,
) -> Result<Float, Error> {
    let profile = template.mean_profile();
    let peak = profile.iter().copied().fold(Float::NEG_INFINITY, Float::max);
    let pulse: Vec<Float> = gaussian_profile(profile.len(), location, width)
        .into_iter()
        .map(|v| v * peak)
        .collect();

    let fit = backends
        .phase_fitter
        .fit_phase(&profile, &pulse, None)
        .map_err(Error::Placement)?;
    Ok(fit.phase)
}
