//! Lazy, pull-based frame decoding.
//!
//! [`FrameReader`] implements [`Iterator`] and decodes every frame of the
//! best video stream in presentation order, converting each to packed RGB.
//! Only one decoded frame is held at a time. The sequence is finite and
//! cannot be restarted; open a new [`MediaSource`] to read again.
//!
//! # Example
//!
//! ```no_run
//! use reframe::{FrameReader, MediaSource};
//!
//! let source = MediaSource::open("input.mp4")?;
//! for (index, frame) in FrameReader::new(source)?.enumerate() {
//!     frame?.save(format!("frame_{index}.png"))?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{conversion, error::ReframeError, source::MediaSource};

/// Consecutive unreadable packets tolerated before giving up.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 32;

/// Iterator over every decoded video frame, as RGB images.
pub struct FrameReader {
    source: MediaSource,
    decoder: VideoDecoder,
    scaler: Option<ScalingContext>,
    width: u32,
    height: u32,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
    read_errors: u32,
}

impl FrameReader {
    /// Prepare a decoder for the source's best video stream.
    ///
    /// # Errors
    ///
    /// Returns [`ReframeError::NoVideoStream`] if the stream vanished, or an
    /// FFmpeg error if the decoder cannot be created.
    pub fn new(source: MediaSource) -> Result<Self, ReframeError> {
        let stream = source
            .input_context
            .stream(source.video_stream_index)
            .ok_or(ReframeError::NoVideoStream)?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| ReframeError::VideoDecodeError(error.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();

        Ok(Self {
            source,
            decoder,
            scaler: None,
            width,
            height,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
            read_errors: 0,
        })
    }

    /// Convert the current `decoded_frame` to an [`RgbImage`].
    ///
    /// The scaler is built from the first decoded frame's real pixel format
    /// rather than the stream parameters, which are not always populated.
    fn convert_current_frame(&mut self) -> Result<RgbImage, ReframeError> {
        if self.scaler.is_none() {
            self.scaler = Some(ScalingContext::get(
                self.decoded_frame.format(),
                self.decoded_frame.width(),
                self.decoded_frame.height(),
                Pixel::RGB24,
                self.width,
                self.height,
                ScalingFlags::BICUBIC | ScalingFlags::ACCURATE_RND | ScalingFlags::FULL_CHR_H_INT,
            )?);
        }
        if let Some(scaler) = self.scaler.as_mut() {
            scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;
        }

        let buffer = conversion::frame_to_buffer(&self.rgb_frame, self.width, self.height, 3);
        RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            ReframeError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }

    fn fail(&mut self, error: ReframeError) -> Option<Result<RgbImage, ReframeError>> {
        self.done = true;
        Some(Err(error))
    }
}

impl Iterator for FrameReader {
    type Item = Result<RgbImage, ReframeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                return match self.convert_current_frame() {
                    Ok(image) => Some(Ok(image)),
                    Err(error) => self.fail(error),
                };
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.source.input_context) {
                Ok(()) => {
                    self.read_errors = 0;
                    if packet.stream() == self.source.video_stream_index
                        && let Err(error) = self.decoder.send_packet(&packet)
                    {
                        return self.fail(ReframeError::VideoDecodeError(error.to_string()));
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return self.fail(ReframeError::from(error));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    self.read_errors += 1;
                    if self.read_errors > MAX_CONSECUTIVE_READ_ERRORS {
                        return self.fail(ReframeError::VideoDecodeError(format!(
                            "too many unreadable packets, last error: {error}"
                        )));
                    }
                    log::warn!(
                        "Skipping unreadable packet in {}: {error}",
                        self.source.path().display()
                    );
                }
            }
        }
    }
}
