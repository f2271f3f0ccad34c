//! Error types for the `reframe` crate.
//!
//! This module defines [`ReframeError`], the unified error type returned by
//! both pipelines. Variants carry the offending path, key, or ordinal so the
//! message shown to the user is enough to fix the problem.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `reframe` operations.
///
/// Every pipeline entry point returns `Result<T, ReframeError>`. The
/// interactive shell shows the [`Display`](std::fmt::Display) form of the
/// first error it receives.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReframeError {
    /// The input video could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`MediaSource::open`](crate::MediaSource::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The frame output directory could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    DirectoryCreate {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },

    /// The destination video cannot be written.
    #[error("Cannot write output video at {path}: {reason}")]
    OutputUnwritable {
        /// Requested destination path.
        path: PathBuf,
        /// Why the destination was rejected.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// `video_metadata.ini` does not exist in the frame directory.
    #[error("Metadata file not found: {0}")]
    MetadataMissing(PathBuf),

    /// The metadata file exists but a section or key is absent or malformed.
    #[error("Invalid metadata ({key}): {reason}")]
    MetadataInvalid {
        /// Key (or section) that failed validation.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No file in the directory matched the frame naming pattern.
    #[error("No frame images found in {0}")]
    NoFrames(PathBuf),

    /// Frame ordinals are not contiguous.
    #[error("Frame sequence has a gap: expected frame {expected}, found frame {found}")]
    FrameGap {
        /// The ordinal that should have come next.
        expected: u64,
        /// The ordinal that was found instead.
        found: u64,
    },

    /// Two files parse to the same ordinal (e.g. `frame_1.png` and `frame_000001.png`).
    #[error("Frame {ordinal} appears more than once ({first} and {second})")]
    DuplicateFrame {
        /// The repeated ordinal.
        ordinal: u64,
        /// First file carrying it.
        first: PathBuf,
        /// Second file carrying it.
        second: PathBuf,
    },

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// Video encoding failed.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// Audio data could not be decoded.
    #[error("Failed to decode audio: {0}")]
    AudioDecodeError(String),

    /// Audio data could not be encoded.
    #[error("Failed to encode audio: {0}")]
    AudioEncodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while reading or writing a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for ReframeError {
    fn from(error: FfmpegError) -> Self {
        ReframeError::FfmpegError(error.to_string())
    }
}

impl ReframeError {
    pub(crate) fn invalid_metadata(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ReframeError::MetadataInvalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
