//! Channel × phase-bin profile arrays.


use common::Buffer2;

use crate::config::Float;

/// A pulse portrait: one profile of `nbin` phase bins per frequency channel.
///
/// Stored row-major with one row per channel (`Buffer2` width = nbin,
/// height = nchan).
#[derive(Debug, Clone, PartialEq)]
pub struct Portrait {
    data: Buffer2<Float>,
}

impl Portrait {
    /// Create a portrait from row-major values.
    pub fn new(nchan: usize, nbin: usize, values: Vec<Float>) -> Self {
        Self {
            data: Buffer2::new(nbin, nchan, values),
        }
    }

    pub fn zeros(nchan: usize, nbin: usize) -> Self {
        Self {
            data: Buffer2::new_default(nbin, nchan),
        }
    }

    pub fn filled(nchan: usize, nbin: usize, value: Float) -> Self {
        Self {
            data: Buffer2::new_filled(nbin, nchan, value),
        }
    }

    /// Create a portrait from one profile per channel.
    ///
    /// # Panics
    ///
    /// Panics if the profiles differ in length.
    pub fn from_channels(channels: &[Vec<Float>]) -> Self {
        Self {
            data: Buffer2::from_rows(channels),
        }
    }

    /// Build a portrait by repeating one profile across `nchan` channels.
    pub fn from_profile(profile: &[Float], nchan: usize) -> Self {
        let mut values = Vec::with_capacity(profile.len() * nchan);
        for _ in 0..nchan {
            values.extend_from_slice(profile);
        }
        Self::new(nchan, profile.len(), values)
    }

    #[inline]
    pub fn nchan(&self) -> usize {
        self.data.height()
    }

    #[inline]
    pub fn nbin(&self) -> usize {
        self.data.width()
    }

    /// Returns `(nchan, nbin)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nchan(), self.nbin())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nchan() == 0 || self.nbin() == 0
    }

    #[inline]
    pub fn channel(&self, ichan: usize) -> &[Float] {
        self.data.row(ichan)
    }

    #[inline]
    pub fn channel_mut(&mut self, ichan: usize) -> &mut [Float] {
        self.data.row_mut(ichan)
    }

    pub fn channels(&self) -> impl Iterator<Item = &[Float]> {
        self.data.rows()
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [Float]> {
        self.data.rows_mut()
    }

    #[inline]
    pub fn get(&self, ichan: usize, ibin: usize) -> Float {
        self.data[(ibin, ichan)]
    }

    #[inline]
    pub fn values(&self) -> &[Float] {
        self.data.values()
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [Float] {
        self.data.values_mut()
    }

    /// Copy out the given channels, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range. Callers validate indices first.
    pub fn select_channels(&self, indices: &[usize]) -> Portrait {
        let nbin = self.nbin();
        let mut values = Vec::with_capacity(indices.len() * nbin);
        for &ichan in indices {
            values.extend_from_slice(self.channel(ichan));
        }
        Portrait::new(indices.len(), nbin, values)
    }

    /// Zero every channel not listed in `keep`.
    pub fn masked(&self, keep: &[usize]) -> Portrait {
        let mut out = Portrait::zeros(self.nchan(), self.nbin());
        for &ichan in keep {
            out.channel_mut(ichan).copy_from_slice(self.channel(ichan));
        }
        out
    }

    /// Channel-averaged profile.
    pub fn mean_profile(&self) -> Vec<Float> {
        let mut profile = vec![0.0; self.nbin()];
        if self.nchan() == 0 {
            return profile;
        }
        for channel in self.channels() {
            for (acc, &v) in profile.iter_mut().zip(channel) {
                *acc += v;
            }
        }
        let inv = 1.0 / self.nchan() as Float;
        profile.iter_mut().for_each(|v| *v *= inv);
        profile
    }

    /// Largest absolute cell-wise difference to `other`.
    pub fn max_abs_diff(&self, other: &Portrait) -> Float {
        assert_eq!(self.shape(), other.shape(), "portrait shape mismatch");
        self.values()
            .iter()
            .zip(other.values())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, Float::max)
    }
}

/// L2 norm of the difference between two 1-D profiles.
pub fn l2_distance(a: &[Float], b: &[Float]) -> Float {
    assert_eq!(a.len(), b.len(), "profile length mismatch");
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<Float>()
        .sqrt()
}

/// L2 distance between the channel-averaged profiles of two portraits.
pub fn mean_profile_change(previous: &Portrait, current: &Portrait) -> Float {
    l2_distance(&previous.mean_profile(), &current.mean_profile())
}
