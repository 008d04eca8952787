//! Error types for the calibration pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::geometry::Corner;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The driver's shared memory object is missing or cannot be opened.
    #[error("shared memory segment {name} unavailable: {source}")]
    SegmentUnavailable {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The object was opened but could not be mapped.
    #[error("failed to map shared memory segment {name}: {source}")]
    MapFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("segment {name} has version {found}, expected {expected}")]
    VersionMismatch {
        name: String,
        expected: i32,
        found: i32,
    },

    /// The four targets cannot produce a finite linear mapping.
    #[error("degenerate calibration geometry: {0}")]
    DegenerateGeometry(String),

    #[error("no raw sample for the {corner} target: {reason}")]
    MissingSample { corner: Corner, reason: String },

    #[error("calibration step out of sequence: {0}")]
    OutOfSequence(&'static str),

    #[error("cannot read {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    SinkUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateGeometry(msg.into())
    }

    pub fn missing_sample(corner: Corner, reason: impl Into<String>) -> Self {
        Self::MissingSample {
            corner,
            reason: reason.into(),
        }
    }
}
