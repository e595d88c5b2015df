//! Weighted accumulation of aligned portraits.
//!
//! Each round sums `weight × shifted_profile` and `weight` per cell, then
//! divides. Partial accumulators built independently (one per observation in
//! parallel mode) combine with [`WeightedAccumulator::merge`].


use common::Buffer2;

use crate::config::Float;
use crate::error::Error;
use crate::portrait::Portrait;

/// Running weighted sum and weight total over a `(nchan, nbin)` grid.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedAccumulator {
    /// Accumulated weighted profile values.
    data: Buffer2<Float>,
    /// Accumulated weights, broadcast across bins.
    weights: Buffer2<Float>,
}

impl WeightedAccumulator {
    pub fn new(nchan: usize, nbin: usize) -> Self {
        Self {
            data: Buffer2::new_default(nbin, nchan),
            weights: Buffer2::new_default(nbin, nchan),
        }
    }

    /// Returns `(nchan, nbin)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.data.height(), self.data.width())
    }

    /// Add row `i` of `shifted` with weight `weights[i]` into channel
    /// `channels[i]`.
    ///
    /// Rows whose weight is not finite are skipped and counted in the
    /// returned value.
    pub fn add(
        &mut self,
        channels: &[usize],
        weights: &[Float],
        shifted: &Portrait,
    ) -> Result<usize, Error> {
        let (nchan, nbin) = self.shape();
        if weights.len() != channels.len() {
            return Err(Error::LengthMismatch {
                what: "channel weights",
                expected: channels.len(),
                actual: weights.len(),
            });
        }
        if shifted.nchan() != channels.len() {
            return Err(Error::LengthMismatch {
                what: "shifted channels",
                expected: channels.len(),
                actual: shifted.nchan(),
            });
        }
        if shifted.nbin() != nbin {
            return Err(Error::LengthMismatch {
                what: "phase bins",
                expected: nbin,
                actual: shifted.nbin(),
            });
        }
        if let Some(&channel) = channels.iter().find(|&&c| c >= nchan) {
            return Err(Error::ChannelOutOfRange { channel, nchan });
        }

        let mut skipped = 0;
        for (row, (&ichan, &weight)) in channels.iter().zip(weights).enumerate() {
            if !weight.is_finite() {
                tracing::warn!(channel = ichan, weight, "Skipping channel with non-finite weight");
                skipped += 1;
                continue;
            }
            let data_row = self.data.row_mut(ichan);
            for (acc, &v) in data_row.iter_mut().zip(shifted.channel(row)) {
                *acc += weight * v;
            }
            self.weights.row_mut(ichan).iter_mut().for_each(|w| *w += weight);
        }
        Ok(skipped)
    }

    /// Add another accumulator of the same shape cell by cell.
    pub fn merge(&mut self, other: &WeightedAccumulator) -> Result<(), Error> {
        let (nchan, nbin) = self.shape();
        let (other_nchan, other_nbin) = other.shape();
        if nchan != other_nchan {
            return Err(Error::LengthMismatch {
                what: "accumulator channels",
                expected: nchan,
                actual: other_nchan,
            });
        }
        if nbin != other_nbin {
            return Err(Error::LengthMismatch {
                what: "accumulator phase bins",
                expected: nbin,
                actual: other_nbin,
            });
        }

        for (acc, &v) in self.data.values_mut().iter_mut().zip(other.data.values()) {
            *acc += v;
        }
        for (acc, &w) in self
            .weights
            .values_mut()
            .iter_mut()
            .zip(other.weights.values())
        {
            *acc += w;
        }
        Ok(())
    }

    /// Total weight accumulated into channel `ichan`.
    #[inline]
    pub fn channel_weight(&self, ichan: usize) -> Float {
        self.weights.row(ichan).first().copied().unwrap_or(0.0)
    }

    pub fn channel_weights(&self) -> Vec<Float> {
        (0..self.data.height())
            .map(|ichan| self.channel_weight(ichan))
            .collect()
    }

    /// Weighted mean per cell. Cells whose weight is not strictly positive
    /// are zero.
    pub fn normalize(&self) -> Portrait {
        let (nchan, nbin) = self.shape();
        let values = self
            .data
            .values()
            .iter()
            .zip(self.weights.values())
            .map(|(&sum, &weight)| if weight > 0.0 { sum / weight } else { 0.0 })
            .collect();
        Portrait::new(nchan, nbin, values)
    }
}
