//! In-memory observations as handed over by an [`ObservationLoader`].
//!
//! [`ObservationLoader`]: crate::backend::ObservationLoader

use std::path::PathBuf;

use crate::config::Float;
use crate::error::Error;
use crate::portrait::Portrait;

/// Reductions and corrections the loader applies before handing data over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Dedisperse the data with the stored dispersion measure.
    pub dedisperse: bool,
    /// Sum all subintegrations into one.
    pub tscrunch: bool,
    /// Sum polarizations into total intensity.
    pub pscrunch: bool,
    /// Sum all channels into one.
    pub fscrunch: bool,
    /// Subtract the off-pulse baseline.
    pub remove_baseline: bool,
}

impl LoadOptions {
    /// Keeps per-subintegration, per-channel detail; used for every round.
    pub fn per_subint() -> Self {
        Self {
            dedisperse: false,
            tscrunch: false,
            pscrunch: true,
            fscrunch: false,
            remove_baseline: true,
        }
    }

    /// Dedispersed, time-scrunched total intensity; used for the initial template.
    pub fn template() -> Self {
        Self {
            dedisperse: true,
            tscrunch: true,
            pscrunch: true,
            fscrunch: false,
            remove_baseline: true,
        }
    }
}

/// One time slice of an observation.
#[derive(Debug, Clone)]
pub struct Subintegration {
    /// All channels, including the invalid ones.
    pub portrait: Portrait,
    /// Channel center frequencies in MHz.
    pub freqs: Vec<Float>,
    /// Per-channel signal-to-noise ratios.
    pub snrs: Vec<Float>,
    /// Per-channel off-pulse noise standard deviations.
    pub noise_stds: Vec<Float>,
    /// Rotation period in seconds.
    pub period: Float,
    /// Indices of usable channels, ascending.
    pub valid_channels: Vec<usize>,
}

/// The data of a subintegration restricted to a set of channels.
#[derive(Debug, Clone)]
pub struct ChannelSlice {
    pub portrait: Portrait,
    pub freqs: Vec<Float>,
    pub snrs: Vec<Float>,
    pub noise_stds: Vec<Float>,
}

impl Subintegration {
    /// Restrict portrait and per-channel metadata to `channels`.
    pub fn channel_slice(&self, channels: &[usize]) -> ChannelSlice {
        ChannelSlice {
            portrait: self.portrait.select_channels(channels),
            freqs: channels.iter().map(|&c| self.freqs[c]).collect(),
            snrs: channels.iter().map(|&c| self.snrs[c]).collect(),
            noise_stds: channels.iter().map(|&c| self.noise_stds[c]).collect(),
        }
    }

    /// The slice over this subintegration's valid channels.
    pub fn valid_slice(&self) -> ChannelSlice {
        self.channel_slice(&self.valid_channels)
    }
}

/// A loaded observation.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Where the observation was loaded from.
    pub source: PathBuf,
    /// Dispersion measure stored with the observation, used as the fit guess.
    pub dm: Float,
    pub subints: Vec<Subintegration>,
    /// Indices of usable subintegrations, in processing order.
    pub valid_subints: Vec<usize>,
}

impl Observation {
    /// `(nchan, nbin)` of the first subintegration, `(0, 0)` if there is none.
    pub fn shape(&self) -> (usize, usize) {
        self.subints
            .first()
            .map_or((0, 0), |s| s.portrait.shape())
    }

    /// The valid subintegrations with their indices.
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, &Subintegration)> {
        self.valid_subints.iter().map(move |&i| (i, &self.subints[i]))
    }

    /// Portrait of subintegration `isub` with invalid channels zeroed.
    pub fn masked_portrait(&self, isub: usize) -> Portrait {
        let subint = &self.subints[isub];
        subint.portrait.masked(&subint.valid_channels)
    }

    /// Check that shapes, metadata lengths and indices agree with each other.
    pub fn validate(&self) -> Result<(), Error> {
        let (nchan, nbin) = self.shape();
        let invalid = |reason: String| Error::InvalidObservation {
            path: self.source.clone(),
            reason,
        };

        if !self.dm.is_finite() {
            return Err(invalid(format!("dispersion measure is {}", self.dm)));
        }

        for (isub, subint) in self.subints.iter().enumerate() {
            if subint.portrait.shape() != (nchan, nbin) {
                let (c, b) = subint.portrait.shape();
                return Err(invalid(format!(
                    "subintegration {isub} is {c}x{b}, expected {nchan}x{nbin}"
                )));
            }
            for (what, len) in [
                ("frequencies", subint.freqs.len()),
                ("SNRs", subint.snrs.len()),
                ("noise stds", subint.noise_stds.len()),
            ] {
                if len != nchan {
                    return Err(invalid(format!(
                        "subintegration {isub} has {len} {what} for {nchan} channels"
                    )));
                }
            }
            if !(subint.period > 0.0 && subint.period.is_finite()) {
                return Err(invalid(format!(
                    "subintegration {isub} has period {}",
                    subint.period
                )));
            }
            if let Some(&bad) = subint.valid_channels.iter().find(|&&c| c >= nchan) {
                return Err(invalid(format!(
                    "subintegration {isub} lists channel {bad} of {nchan}"
                )));
            }
        }

        if let Some(&bad) = self.valid_subints.iter().find(|&&i| i >= self.subints.len()) {
            return Err(invalid(format!(
                "valid subintegration {bad} of {}",
                self.subints.len()
            )));
        }

        Ok(())
    }
}
