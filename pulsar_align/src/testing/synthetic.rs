//! Synthetic portraits and observations.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::{DispersiveShift, FourierShifter, ProfileShifter};
use crate::config::Float;
use crate::engine::gaussian_profile;
use crate::observation::{Observation, Subintegration};
use crate::portrait::Portrait;

pub const PERIOD: Float = 0.005;
pub const NOISE_STD: Float = 1.0;
pub const SNR: Float = 20.0;

/// Channel frequencies in MHz, 1400 MHz upward in 10 MHz steps.
pub fn frequencies(nchan: usize) -> Vec<Float> {
    (0..nchan).map(|c| 1400.0 + 10.0 * c as Float).collect()
}

/// Every channel holds the same Gaussian pulse.
pub fn gaussian_portrait(
    nchan: usize,
    nbin: usize,
    location: Float,
    fwhm: Float,
    amplitude: Float,
) -> Portrait {
    let profile: Vec<Float> = gaussian_profile(nbin, location, fwhm)
        .into_iter()
        .map(|v| v * amplitude)
        .collect();
    Portrait::from_profile(&profile, nchan)
}

/// Add Gaussian white noise of standard deviation `sigma`.
pub fn add_noise(portrait: &Portrait, sigma: Float, seed: u64) -> Portrait {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = portrait.clone();
    for v in out.values_mut() {
        // Box-Muller
        let u1: Float = rng.random::<Float>().max(Float::MIN_POSITIVE);
        let u2: Float = rng.random();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        *v += sigma * z;
    }
    out
}

/// Delay every channel of `portrait` as a signal with dispersion measure `dm`
/// would arrive, relative to `reference_frequency`. Shifting the result by
/// the same DM recovers `portrait`.
pub fn disperse(
    portrait: &Portrait,
    dm: Float,
    period: Float,
    freqs: &[Float],
    reference_frequency: Float,
) -> Portrait {
    FourierShifter::new().shift(
        portrait,
        &DispersiveShift {
            phase: 0.0,
            dm: -dm,
            period,
            freqs,
            reference_frequency,
        },
    )
}

/// Subintegration with every channel valid and uniform noise/SNR.
pub fn subintegration(portrait: Portrait) -> Subintegration {
    let nchan = portrait.nchan();
    Subintegration {
        portrait,
        freqs: frequencies(nchan),
        snrs: vec![SNR; nchan],
        noise_stds: vec![NOISE_STD; nchan],
        period: PERIOD,
        valid_channels: (0..nchan).collect(),
    }
}

/// Observation with DM 0 and every subintegration valid.
pub fn observation(path: &str, subints: Vec<Subintegration>) -> Observation {
    Observation {
        source: PathBuf::from(path),
        dm: 0.0,
        valid_subints: (0..subints.len()).collect(),
        subints,
    }
}

/// Observation with one subintegration holding `portrait`.
pub fn single_subint_observation(path: &str, portrait: Portrait) -> Observation {
    observation(path, vec![subintegration(portrait)])
}
