//! Error types for alignment runs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use common::serde_format::SerdeFormatError;

/// Error returned by an external collaborator (loader, fitters, archive tools).
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while aligning and averaging observations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("No observations provided for alignment")]
    NoObservations,

    #[error("Template has no channels or no phase bins")]
    EmptyTemplate,

    #[error(
        "Dimension mismatch for '{path}': expected {expected_nchan}x{expected_nbin} \
         (nchan x nbin), got {actual_nchan}x{actual_nbin}"
    )]
    DimensionMismatch {
        path: PathBuf,
        expected_nchan: usize,
        expected_nbin: usize,
        actual_nchan: usize,
        actual_nbin: usize,
    },

    #[error("Invalid observation '{path}': {reason}")]
    InvalidObservation { path: PathBuf, reason: String },

    #[error("Channel {channel} out of range for {nchan} channels")]
    ChannelOutOfRange { channel: usize, nchan: usize },

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("No valid channels to fit")]
    EmptyChannelSet,

    #[error("Failed to load observation '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    #[error("Fit failed for '{path}' subintegration {subint}: {source}")]
    Fit {
        path: PathBuf,
        subint: usize,
        #[source]
        source: BackendError,
    },

    #[error("Phase fit for pulse placement failed: {0}")]
    Placement(#[source] BackendError),

    #[error("Archive operation '{operation}' failed for '{path}': {source}")]
    Archive {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    #[error("Failed to read metafile '{path}': {source}")]
    ReadMetafile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: SerdeFormatError,
    },
}
