//! Fourier-domain phase rotation of portraits.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::backend::{DispersiveShift, ProfileShifter};
use crate::config::Float;
use crate::portrait::Portrait;

/// Dispersion constant in MHz² pc⁻¹ cm³ s (the conventional 1/2.41e-4).
pub const DISPERSION_CONSTANT: Float = 1.0 / 2.41e-4;

/// Dispersive delay in rotations of `freq` relative to `reference_frequency`.
#[inline]
pub fn dispersion_delay(dm: Float, period: Float, freq: Float, reference_frequency: Float) -> Float {
    DISPERSION_CONSTANT * dm / period * (freq.powi(-2) - reference_frequency.powi(-2))
}

struct FftPair {
    forward: Arc<dyn Fft<Float>>,
    inverse: Arc<dyn Fft<Float>>,
}

/// [`ProfileShifter`] that rotates each channel by multiplying its spectrum
/// with a linear phase ramp. Shifts by whole bins are exact up to rounding.
///
/// FFT plans are cached per profile length.
#[derive(Default)]
pub struct FourierShifter {
    plans: Mutex<HashMap<usize, Arc<FftPair>>>,
}

impl std::fmt::Debug for FourierShifter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lengths: Vec<usize> = self.plans.lock().keys().copied().collect();
        lengths.sort_unstable();
        f.debug_struct("FourierShifter")
            .field("cached_lengths", &lengths)
            .finish()
    }
}

impl FourierShifter {
    pub fn new() -> Self {
        Self::default()
    }

    fn plans(&self, nbin: usize) -> Arc<FftPair> {
        let mut plans = self.plans.lock();
        Arc::clone(plans.entry(nbin).or_insert_with(|| {
            let mut planner = FftPlanner::<Float>::new();
            Arc::new(FftPair {
                forward: planner.plan_fft_forward(nbin),
                inverse: planner.plan_fft_inverse(nbin),
            })
        }))
    }

    /// Rotate channel `i` by `delay(i)` rotations.
    fn rotate_channels<D>(&self, portrait: &Portrait, delay: D) -> Portrait
    where
        D: Fn(usize) -> Float,
    {
        let (nchan, nbin) = portrait.shape();
        if nbin == 0 || nchan == 0 {
            return portrait.clone();
        }

        let plans = self.plans(nbin);
        let scratch_len = plans
            .forward
            .get_inplace_scratch_len()
            .max(plans.inverse.get_inplace_scratch_len());
        let zero = Complex::new(0.0, 0.0);
        let mut scratch = vec![zero; scratch_len];
        let mut spectrum = vec![zero; nbin];
        let norm = 1.0 / nbin as Float;

        let mut out = Portrait::zeros(nchan, nbin);
        for (ichan, (src, dst)) in portrait.channels().zip(out.channels_mut()).enumerate() {
            let delay = delay(ichan);
            if delay == 0.0 {
                dst.copy_from_slice(src);
                continue;
            }

            for (s, &v) in spectrum.iter_mut().zip(src) {
                *s = Complex::new(v, 0.0);
            }
            plans.forward.process_with_scratch(&mut spectrum, &mut scratch);

            for (k, s) in spectrum.iter_mut().enumerate() {
                let angle = 2.0 * PI * signed_harmonic(k, nbin) * delay;
                *s *= Complex::from_polar(1.0, angle);
            }

            plans.inverse.process_with_scratch(&mut spectrum, &mut scratch);
            for (d, s) in dst.iter_mut().zip(&spectrum) {
                *d = s.re * norm;
            }
        }
        out
    }
}

impl ProfileShifter for FourierShifter {
    fn shift(&self, portrait: &Portrait, shift: &DispersiveShift<'_>) -> Portrait {
        assert_eq!(
            shift.freqs.len(),
            portrait.nchan(),
            "one frequency per channel required"
        );
        if shift.dm == 0.0 {
            return self.rotate(portrait, shift.phase);
        }
        self.rotate_channels(portrait, |ichan| {
            shift.phase
                + dispersion_delay(
                    shift.dm,
                    shift.period,
                    shift.freqs[ichan],
                    shift.reference_frequency,
                )
        })
    }

    fn rotate(&self, portrait: &Portrait, phase: Float) -> Portrait {
        self.rotate_channels(portrait, |_| phase)
    }
}

/// Harmonic number of DFT bin `k` with negative frequencies folded below zero.
#[inline]
fn signed_harmonic(k: usize, n: usize) -> Float {
    if k <= n / 2 {
        k as Float
    } else {
        k as Float - n as Float
    }
}
