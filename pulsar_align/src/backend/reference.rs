//! Reference-frequency heuristic for the joint fit.

use crate::backend::ReferenceFrequency;
use crate::config::Float;

/// Reference frequency pulled from the band center toward the channels with
/// the highest signal-to-noise: `ν0 + Σ(ν − ν0)·SNR² / Σ SNR²` with
/// `ν0 = (min + max) / 2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnrWeightedReference;

impl ReferenceFrequency for SnrWeightedReference {
    fn select(&self, freqs: &[Float], snrs: &[Float]) -> Float {
        assert_eq!(freqs.len(), snrs.len(), "one SNR per frequency required");
        if freqs.is_empty() {
            return 0.0;
        }

        let (lo, hi) = freqs
            .iter()
            .fold((Float::INFINITY, Float::NEG_INFINITY), |(lo, hi), &f| {
                (lo.min(f), hi.max(f))
            });
        let center = 0.5 * (lo + hi);

        let (num, den) = freqs
            .iter()
            .zip(snrs)
            .fold((0.0, 0.0), |(num, den), (&f, &snr)| {
                let w = snr * snr;
                (num + (f - center) * w, den + w)
            });

        if den > 0.0 {
            center + num / den
        } else {
            center
        }
    }
}
