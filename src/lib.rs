//! # reframe
//!
//! Losslessly convert a video into a directory of PNG frames plus a PCM
//! audio track, and convert such a directory back into a video.
//!
//! Decoding writes `frame_000000.png`, `frame_000001.png`, … in presentation
//! order, `audio.wav` (PCM s16le) when the source has audio, and a
//! `video_metadata.ini` recording frame rate, size, frame count, and
//! duration. Encoding reads that directory back, orders the frames by the
//! number in their names, and produces an H.264 video at CRF 0 in
//! `yuv444p` with the audio muxed in uncompressed. All media work is done by
//! FFmpeg via [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) and by
//! the [`image`](https://crates.io/crates/image) crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reframe::{DecodeOptions, EncodeOptions, ReframeError, decode_video, encode_video};
//!
//! decode_video("input.mp4", "frames", &DecodeOptions::default())?;
//! // ... edit frames/frame_000042.png ...
//! encode_video("frames", "output.mkv", &EncodeOptions::default())?;
//! # Ok::<(), ReframeError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed, and the FFmpeg build
//! needs `libx264` for the lossless encoder.

pub mod audio;
pub mod config;
mod conversion;
pub mod decode;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod frames;
pub mod metadata;
pub mod naming;
pub mod progress;
pub mod shell;
pub mod source;

pub use config::{DecodeOptions, EncodeOptions, EncoderSettings, GapPolicy, PngCompression};
pub use decode::{DecodeSummary, decode_video};
pub use encode::{EncodeSummary, encode_video};
pub use error::ReframeError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frames::FrameReader;
pub use metadata::VideoMetadata;
pub use naming::{FrameFile, discover_frames, frame_file_name, parse_frame_file_name};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use shell::{Job, JobHandle, JobOutcome, Mode, Shell, ShellState, spawn_job};
pub use source::{MediaSource, SourceInfo};
