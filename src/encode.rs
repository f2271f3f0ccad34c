//! Frames → video encode pipeline.
//!
//! [`encode_video`] reads a directory produced by
//! [`decode_video`](crate::decode_video), orders its frames by ordinal, and
//! encodes them at the recorded frame rate with a lossless configuration.
//! When `audio.wav` is present it is muxed in as `pcm_s16le`. The output is
//! constrained to the recorded duration: missing trailing frames are filled
//! by holding the last one, and surplus frames and audio are dropped.
//!
//! # Example
//!
//! ```no_run
//! use reframe::{EncodeOptions, ReframeError, encode_video};
//!
//! let summary = encode_video("frames/", "output.mkv", &EncodeOptions::default())?;
//! println!("Encoded {} frames", summary.frames_encoded);
//! # Ok::<(), ReframeError>(())
//! ```

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Dictionary, Packet, Rational,
    codec::context::Context as CodecContext,
    encoder::Video as VideoEncoder,
    format::{Flags as FormatFlags, Pixel, context::Output},
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    audio::AudioTrack,
    config::{EncodeOptions, EncoderSettings},
    conversion,
    error::ReframeError,
    metadata::VideoMetadata,
    naming::{self, AUDIO_FILE_NAME, FrameFile, METADATA_FILE_NAME},
    progress::{OperationType, ProgressTracker},
};

/// What a successful encode produced.
#[derive(Debug, Clone)]
#[must_use]
pub struct EncodeSummary {
    /// Frame files found in the input directory.
    pub frames_discovered: usize,
    /// Frames sent to the encoder, including held repeats.
    pub frames_encoded: u64,
    /// Whether an audio track was muxed in.
    pub has_audio: bool,
    /// Where the video was written.
    pub output_path: PathBuf,
    /// Duration the output was constrained to, in seconds.
    pub duration: f64,
}

/// Encode the frame directory `input_directory` into the video `output`.
///
/// The container is inferred from the output extension. Frames must all
/// match the width and height recorded in the metadata.
///
/// # Errors
///
/// - [`ReframeError::MetadataMissing`] / [`ReframeError::MetadataInvalid`]
///   if `video_metadata.ini` is absent or malformed.
/// - [`ReframeError::NoFrames`], [`ReframeError::FrameGap`],
///   [`ReframeError::DuplicateFrame`] from frame discovery.
/// - [`ReframeError::OutputUnwritable`] if the destination cannot be created.
/// - [`ReframeError::VideoEncodeError`] / [`ReframeError::AudioEncodeError`]
///   if FFmpeg fails.
pub fn encode_video<P: AsRef<Path>, Q: AsRef<Path>>(
    input_directory: P,
    output: Q,
    options: &EncodeOptions,
) -> Result<EncodeSummary, ReframeError> {
    let input_directory = input_directory.as_ref();
    let output_path = output.as_ref();

    log::info!(
        "Encoding {} into {}",
        input_directory.display(),
        output_path.display()
    );

    let metadata = VideoMetadata::read(input_directory.join(METADATA_FILE_NAME))?;
    let frames = naming::discover_frames(input_directory, options.gap_policy)?;
    if frames.len() as u64 != metadata.frame_count {
        log::warn!(
            "Metadata records {} frames but {} were found",
            metadata.frame_count,
            frames.len()
        );
    }

    check_destination(output_path)?;
    ffmpeg_next::init()?;

    let audio_path = input_directory.join(AUDIO_FILE_NAME);
    let mut audio = if audio_path.is_file() {
        AudioTrack::open(&audio_path)?
    } else {
        None
    };
    if let Some(track) = audio.as_mut() {
        track.limit_to(metadata.duration);
    }

    // Create output context; the container follows the extension.
    let mut output_context =
        ffmpeg_next::format::output(&output_path).map_err(|error| ReframeError::OutputUnwritable {
            path: output_path.to_path_buf(),
            reason: error.to_string(),
        })?;

    let mut video = VideoTrack::new(&mut output_context, &metadata, &options.encoder)?;
    if let Some(track) = audio.as_mut() {
        track.add_stream(&mut output_context)?;
    }

    // Write file header.
    output_context
        .write_header()
        .map_err(|error| ReframeError::VideoEncodeError(format!("cannot write header: {error}")))?;

    let target_frames = metadata.target_frame_count();
    if target_frames > frames.len() as u64 {
        log::debug!(
            "Holding the last frame for {} extra frame(s) to reach {:.3}s",
            target_frames - frames.len() as u64,
            metadata.duration
        );
    } else if target_frames < frames.len() as u64 {
        log::debug!(
            "Dropping {} trailing frame(s) beyond {:.3}s",
            frames.len() as u64 - target_frames,
            metadata.duration
        );
    }

    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::Encoding,
        Some(target_frames),
        options.batch_size,
    );
    let mut loader = FrameLoader::new(&frames, &metadata);

    for index in 0..target_frames {
        let image = loader.load(index)?;
        video.encode(&mut output_context, image, index as i64)?;
        if let Some(track) = audio.as_mut() {
            track.write_until(
                &mut output_context,
                (index + 1) as f64 / metadata.frames_per_second,
            )?;
        }
        tracker.advance();
    }
    tracker.finish();

    // Flush encoders, then the trailer.
    video.flush(&mut output_context)?;
    if let Some(track) = audio.as_mut() {
        track.finish(&mut output_context)?;
    }

    output_context
        .write_trailer()
        .map_err(|error| ReframeError::VideoEncodeError(format!("cannot write trailer: {error}")))?;

    log::info!(
        "Encoded {target_frames} frames from {} files into {}",
        frames.len(),
        output_path.display()
    );

    Ok(EncodeSummary {
        frames_discovered: frames.len(),
        frames_encoded: target_frames,
        has_audio: audio.is_some(),
        output_path: output_path.to_path_buf(),
        duration: metadata.duration,
    })
}

/// Reject destinations whose parent directory does not exist, or that
/// name an existing directory.
fn check_destination(path: &Path) -> Result<(), ReframeError> {
    if path.is_dir() {
        return Err(ReframeError::OutputUnwritable {
            path: path.to_path_buf(),
            reason: "path is a directory".to_string(),
        });
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(ReframeError::OutputUnwritable {
            path: path.to_path_buf(),
            reason: format!("parent directory {} does not exist", parent.display()),
        });
    }
    Ok(())
}

/// Maps output frame indices to frame files, holding the last image once
/// the files run out and re-reading only when the file changes.
struct FrameLoader<'a> {
    frames: &'a [FrameFile],
    width: u32,
    height: u32,
    loaded: Option<(usize, RgbImage)>,
}

impl<'a> FrameLoader<'a> {
    fn new(frames: &'a [FrameFile], metadata: &VideoMetadata) -> Self {
        Self {
            frames,
            width: metadata.width,
            height: metadata.height,
            loaded: None,
        }
    }

    fn load(&mut self, index: u64) -> Result<&RgbImage, ReframeError> {
        let frames = self.frames;
        let position = (index as usize).min(frames.len().saturating_sub(1));
        let frame = &frames[position];

        if self.loaded.as_ref().is_none_or(|(loaded, _)| *loaded != position) {
            let image = image::open(&frame.path)?.to_rgb8();
            if image.width() != self.width || image.height() != self.height {
                return Err(ReframeError::VideoEncodeError(format!(
                    "{} is {}x{}, expected {}x{}",
                    frame.path.display(),
                    image.width(),
                    image.height(),
                    self.width,
                    self.height
                )));
            }
            self.loaded = Some((position, image));
        }

        match &self.loaded {
            Some((_, image)) => Ok(image),
            None => Err(ReframeError::VideoEncodeError(format!(
                "frame {} could not be loaded",
                frame.ordinal
            ))),
        }
    }
}

/// The lossless video stream of the output.
struct VideoTrack {
    encoder: VideoEncoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    width: u32,
    height: u32,
    source_frame: VideoFrame,
    converted_frame: VideoFrame,
}

impl VideoTrack {
    fn new(
        output: &mut Output,
        metadata: &VideoMetadata,
        settings: &EncoderSettings,
    ) -> Result<Self, ReframeError> {
        let frame_rate = conversion::frame_rate_to_rational(metadata.frames_per_second);
        let time_base = frame_rate.invert();
        let (width, height) = (metadata.width, metadata.height);

        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        // Find encoder. No fallback: other H.264 encoders ignore crf and preset.
        let codec = ffmpeg_next::encoder::find_by_name(&settings.codec_name).ok_or_else(|| {
            ReframeError::VideoEncodeError(format!(
                "lossless encoder {} not available in this FFmpeg build",
                settings.codec_name
            ))
        })?;

        // Add video stream.
        let mut stream = output
            .add_stream(codec)
            .map_err(|error| ReframeError::VideoEncodeError(format!("cannot add stream: {error}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .map_err(|error| {
                ReframeError::VideoEncodeError(format!("cannot create codec context: {error}"))
            })?
            .encoder()
            .video()
            .map_err(|error| {
                ReframeError::VideoEncodeError(format!("cannot open video encoder: {error}"))
            })?;

        // Configure encoder.
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(settings.pixel_format);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(frame_rate));

        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        // Open encoder with the rate-control options.
        let mut encoder_options = Dictionary::new();
        encoder_options.set("crf", &settings.crf.to_string());
        encoder_options.set("preset", &settings.preset);

        let encoder = encoder
            .open_as_with(codec, encoder_options)
            .map_err(|error| ReframeError::VideoEncodeError(format!("cannot open encoder: {error}")))?;

        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);

        log::debug!(
            "Video stream {stream_index}: {} {width}x{height} {:?} @ {}/{} (crf={}, preset={})",
            codec.name(),
            settings.pixel_format,
            frame_rate.numerator(),
            frame_rate.denominator(),
            settings.crf,
            settings.preset,
        );

        // RGB24 -> encoder pixel format.
        let scaler = ScalingContext::get(
            Pixel::RGB24,
            width,
            height,
            settings.pixel_format,
            width,
            height,
            ScalingFlags::BICUBIC | ScalingFlags::ACCURATE_RND | ScalingFlags::FULL_CHR_H_INP,
        )
        .map_err(|error| ReframeError::VideoEncodeError(format!("cannot create scaler: {error}")))?;

        Ok(Self {
            encoder,
            scaler,
            stream_index,
            time_base,
            width,
            height,
            source_frame: VideoFrame::new(Pixel::RGB24, width, height),
            converted_frame: VideoFrame::empty(),
        })
    }

    fn encode(
        &mut self,
        output: &mut Output,
        image: &RgbImage,
        pts: i64,
    ) -> Result<(), ReframeError> {
        conversion::buffer_into_frame(
            image.as_raw(),
            &mut self.source_frame,
            self.width,
            self.height,
            3,
        );

        self.scaler
            .run(&self.source_frame, &mut self.converted_frame)
            .map_err(|error| ReframeError::VideoEncodeError(format!("scaling failed: {error}")))?;
        self.converted_frame.set_pts(Some(pts));

        self.encoder
            .send_frame(&self.converted_frame)
            .map_err(|error| ReframeError::VideoEncodeError(format!("send_frame failed: {error}")))?;
        self.write_packets(output)
    }

    fn flush(&mut self, output: &mut Output) -> Result<(), ReframeError> {
        self.encoder
            .send_eof()
            .map_err(|error| ReframeError::VideoEncodeError(format!("send_eof failed: {error}")))?;
        self.write_packets(output)
    }

    fn write_packets(&mut self, output: &mut Output) -> Result<(), ReframeError> {
        let output_time_base = output
            .stream(self.stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| ReframeError::VideoEncodeError("output stream missing".to_string()))?;

        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.time_base, output_time_base);
            packet
                .write_interleaved(output)
                .map_err(|error| ReframeError::VideoEncodeError(format!("write packet failed: {error}")))?;
        }
        Ok(())
    }
}
