//! Opening input videos.
//!
//! [`MediaSource`] wraps an FFmpeg demuxer and records the stream facts the
//! decode pipeline needs: frame rate, dimensions, duration, and which streams
//! carry video and audio.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    media::Type,
};

use crate::{conversion, error::ReframeError};

/// Stream facts read when the source is opened.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct SourceInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second (0.0 if the container does not say).
    pub frames_per_second: f64,
    /// Duration in seconds (0.0 if unknown).
    pub duration: f64,
    /// Video codec name.
    pub video_codec: String,
    /// Pixel format the video decoder produces.
    pub pixel_format: Pixel,
    /// Audio codec name, when an audio stream exists.
    pub audio_codec: Option<String>,
    /// Container format name.
    pub format: String,
}

impl SourceInfo {
    /// Frame count implied by duration and frame rate. Used only for
    /// progress totals; the decoder counts real frames.
    pub fn estimated_frame_count(&self) -> Option<u64> {
        (self.duration > 0.0 && self.frames_per_second > 0.0)
            .then(|| (self.duration * self.frames_per_second).round() as u64)
    }
}

/// An opened input video.
pub struct MediaSource {
    pub(crate) input_context: Input,
    pub(crate) video_stream_index: usize,
    pub(crate) audio_stream_index: Option<usize>,
    pub(crate) info: SourceInfo,
    pub(crate) path: PathBuf,
}

impl Debug for MediaSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaSource")
            .field("path", &self.path)
            .field("video_stream_index", &self.video_stream_index)
            .field("audio_stream_index", &self.audio_stream_index)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl MediaSource {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the container, and picks the
    /// best video and audio streams.
    ///
    /// # Errors
    ///
    /// - [`ReframeError::FileOpen`] if FFmpeg cannot open or probe the file.
    /// - [`ReframeError::NoVideoStream`] if it carries no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReframeError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening media file: {}", path.display());

        ffmpeg_next::init().map_err(|error| ReframeError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| ReframeError::FileOpen {
                path: path.clone(),
                reason: error.to_string(),
            })?;

        let video_stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(ReframeError::NoVideoStream)?;
        let video_stream_index = video_stream.index();

        let decoder_context = CodecContext::from_parameters(video_stream.parameters())
            .map_err(|error| ReframeError::FileOpen {
                path: path.clone(),
                reason: format!("Failed to read video codec parameters: {error}"),
            })?;
        let video_decoder =
            decoder_context
                .decoder()
                .video()
                .map_err(|error| ReframeError::FileOpen {
                    path: path.clone(),
                    reason: format!("Failed to create video decoder: {error}"),
                })?;

        let frames_per_second = match conversion::rational_to_f64(video_stream.avg_frame_rate()) {
            rate if rate > 0.0 => rate,
            _ => conversion::rational_to_f64(video_stream.rate()),
        };

        let container_duration = input_context.duration();
        let duration = if container_duration > 0 {
            container_duration as f64 / f64::from(ffmpeg_sys_next::AV_TIME_BASE)
        } else if video_stream.duration() > 0 {
            conversion::pts_to_seconds(video_stream.duration(), video_stream.time_base())
        } else {
            0.0
        };

        let video_codec = video_decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let audio_stream = input_context.streams().best(Type::Audio);
        let audio_stream_index = audio_stream.as_ref().map(|stream| stream.index());
        let audio_codec = audio_stream.and_then(|stream| {
            CodecContext::from_parameters(stream.parameters())
                .ok()
                .map(|context| context.id().name().to_string())
        });

        let info = SourceInfo {
            width: video_decoder.width(),
            height: video_decoder.height(),
            frames_per_second,
            duration,
            video_codec,
            pixel_format: video_decoder.format(),
            audio_codec,
            format: input_context.format().name().to_string(),
        };

        log::debug!(
            "Opened {}: {}x{} @ {:.3} fps, {:.3}s, audio={}",
            path.display(),
            info.width,
            info.height,
            info.frames_per_second,
            info.duration,
            audio_stream_index.is_some(),
        );

        Ok(Self {
            input_context,
            video_stream_index,
            audio_stream_index,
            info,
            path,
        })
    }

    /// Stream facts captured at open time.
    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Whether the file carries an audio stream.
    pub fn has_audio(&self) -> bool {
        self.audio_stream_index.is_some()
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
