//! Pipeline configuration.
//!
//! [`DecodeOptions`] and [`EncodeOptions`] are builders that thread progress
//! callbacks and tuning knobs through the pipelines without widening every
//! function signature. Defaults reproduce the fixed lossless behaviour:
//! PNGs at the `image` crate's default compression level, audio extracted,
//! `libx264` at CRF 0 with the `veryslow` preset in `yuv444p`, and gaps in
//! the frame sequence rejected.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reframe::{EncodeOptions, GapPolicy, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} done", info.operation, info.current);
//!     }
//! }
//!
//! let options = EncodeOptions::new()
//!     .with_gap_policy(GapPolicy::Skip)
//!     .with_progress(Arc::new(LogProgress));
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use ffmpeg_next::format::Pixel;
use image::codecs::png::CompressionType;

use crate::progress::{NoOpProgress, ProgressCallback};

/// What the encoder does when frame ordinals are not contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Fail with [`ReframeError::FrameGap`](crate::ReframeError::FrameGap).
    #[default]
    Reject,
    /// Concatenate the frames that exist, in ordinal order.
    Skip,
}

/// PNG compression effort. Every level is lossless; they differ only in
/// file size and speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PngCompression {
    /// Fastest encoding, largest files.
    Fast,
    /// The `image` crate's default trade-off.
    #[default]
    Default,
    /// Smallest files, slowest encoding.
    Best,
}

impl PngCompression {
    pub(crate) fn to_compression_type(self) -> CompressionType {
        match self {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

/// Settings for the decode pipeline.
#[derive(Clone)]
pub struct DecodeOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
    pub(crate) png_compression: PngCompression,
    pub(crate) extract_audio: bool,
}

impl Debug for DecodeOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DecodeOptions")
            .field("batch_size", &self.batch_size)
            .field("png_compression", &self.png_compression)
            .field("extract_audio", &self.extract_audio)
            .finish_non_exhaustive()
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeOptions {
    /// Default decode settings: no progress callback, default PNG
    /// compression, audio extracted when present.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
            png_compression: PngCompression::Default,
            extract_audio: true,
        }
    }

    /// Attach a progress callback, fired every
    /// [`batch_size`](DecodeOptions::with_batch_size) frames.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the PNG compression effort.
    #[must_use]
    pub fn with_png_compression(mut self, compression: PngCompression) -> Self {
        self.png_compression = compression;
        self
    }

    /// Enable or disable writing `audio.wav`.
    #[must_use]
    pub fn with_audio(mut self, extract_audio: bool) -> Self {
        self.extract_audio = extract_audio;
        self
    }
}

/// Video encoder parameters.
///
/// The defaults are the lossless configuration: `libx264`, CRF 0, preset
/// `veryslow`, full-chroma `yuv444p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    /// FFmpeg encoder name. Falls back to the default H.264 encoder when
    /// this one is not compiled in.
    pub codec_name: String,
    /// Constant rate factor. 0 means no quantization loss.
    pub crf: u32,
    /// x264 speed/efficiency preset.
    pub preset: String,
    /// Pixel format frames are converted to before encoding.
    pub pixel_format: Pixel,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            codec_name: "libx264".to_string(),
            crf: 0,
            preset: "veryslow".to_string(),
            pixel_format: Pixel::YUV444P,
        }
    }
}

impl EncoderSettings {
    /// Set the CRF value.
    #[must_use]
    pub fn crf(mut self, crf: u32) -> Self {
        self.crf = crf;
        self
    }

    /// Set the encoder preset.
    #[must_use]
    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Set the encoder by FFmpeg name.
    #[must_use]
    pub fn codec_name(mut self, name: impl Into<String>) -> Self {
        self.codec_name = name.into();
        self
    }
}

/// Settings for the encode pipeline.
#[derive(Clone)]
pub struct EncodeOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
    pub(crate) gap_policy: GapPolicy,
    pub(crate) encoder: EncoderSettings,
}

impl Debug for EncodeOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("EncodeOptions")
            .field("batch_size", &self.batch_size)
            .field("gap_policy", &self.gap_policy)
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeOptions {
    /// Default encode settings: lossless encoder, gaps rejected, no
    /// progress callback.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
            gap_policy: GapPolicy::Reject,
            encoder: EncoderSettings::default(),
        }
    }

    /// Attach a progress callback, fired every
    /// [`batch_size`](EncodeOptions::with_batch_size) frames.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Choose how gaps in the frame ordinals are handled.
    #[must_use]
    pub fn with_gap_policy(mut self, policy: GapPolicy) -> Self {
        self.gap_policy = policy;
        self
    }

    /// Override the video encoder parameters.
    #[must_use]
    pub fn with_encoder(mut self, settings: EncoderSettings) -> Self {
        self.encoder = settings;
        self
    }
}
