//! Video → frames decode pipeline.
//!
//! [`decode_video`] turns one video file into a directory holding
//! `frame_000000.png`, `frame_000001.png`, …, an optional `audio.wav`, and
//! `video_metadata.ini`. Nothing is cleaned up on failure: a run that stops
//! half way leaves the frames written so far.
//!
//! # Example
//!
//! ```no_run
//! use reframe::{DecodeOptions, ReframeError, decode_video};
//!
//! let summary = decode_video("input.mp4", "frames/", &DecodeOptions::default())?;
//! println!("{} frames at {} fps", summary.metadata.frame_count, summary.metadata.frames_per_second);
//! # Ok::<(), ReframeError>(())
//! ```

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use image::{
    RgbImage,
    codecs::png::{FilterType, PngEncoder},
};

use crate::{
    audio,
    config::DecodeOptions,
    error::ReframeError,
    frames::FrameReader,
    metadata::VideoMetadata,
    naming::{self, AUDIO_FILE_NAME, MAX_PADDED_FRAMES, METADATA_FILE_NAME},
    progress::{OperationType, ProgressTracker},
    source::MediaSource,
};

/// What a successful decode produced.
#[derive(Debug, Clone)]
#[must_use]
pub struct DecodeSummary {
    /// The record written to `video_metadata.ini`.
    pub metadata: VideoMetadata,
    /// Whether `audio.wav` was written.
    pub has_audio: bool,
    /// Directory holding the output.
    pub output_directory: PathBuf,
}

/// Decode `input` into frame images, audio, and metadata under
/// `output_directory`, creating the directory if needed.
///
/// # Errors
///
/// - [`ReframeError::DirectoryCreate`] if the directory cannot be created.
/// - [`ReframeError::FileOpen`] / [`ReframeError::NoVideoStream`] if the
///   video cannot be opened.
/// - [`ReframeError::MetadataInvalid`] if the source reports no usable frame
///   rate or duration. Frames and audio already written are left in place.
/// - Decode, image, and audio errors from the external libraries.
pub fn decode_video<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_directory: Q,
    options: &DecodeOptions,
) -> Result<DecodeSummary, ReframeError> {
    let input = input.as_ref();
    let output_directory = output_directory.as_ref();

    log::info!(
        "Decoding {} into {}",
        input.display(),
        output_directory.display()
    );

    fs::create_dir_all(output_directory).map_err(|source| ReframeError::DirectoryCreate {
        path: output_directory.to_path_buf(),
        source,
    })?;

    let source = MediaSource::open(input)?;
    let info = source.info().clone();
    let has_audio_stream = source.has_audio();

    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::Decoding,
        info.estimated_frame_count(),
        options.batch_size,
    );

    let mut frame_count: u64 = 0;
    for frame in FrameReader::new(source)? {
        let frame = frame?;
        if frame_count == MAX_PADDED_FRAMES {
            log::warn!(
                "More than {MAX_PADDED_FRAMES} frames; names past this point are wider than {} digits",
                naming::FRAME_INDEX_WIDTH
            );
        }
        let path = output_directory.join(naming::frame_file_name(frame_count));
        write_png(&frame, &path, options)?;
        frame_count += 1;
        tracker.advance();
    }
    tracker.finish();

    let has_audio = if options.extract_audio && has_audio_stream {
        audio::extract_wav(input, &output_directory.join(AUDIO_FILE_NAME))?
    } else {
        false
    };

    let metadata = VideoMetadata {
        frames_per_second: info.frames_per_second,
        width: info.width,
        height: info.height,
        frame_count,
        duration: resolve_duration(info.duration, frame_count, info.frames_per_second),
    };
    metadata.write(output_directory.join(METADATA_FILE_NAME))?;

    log::info!(
        "Decoded {frame_count} frames ({}x{} @ {:.3} fps, {:.3}s, audio={has_audio})",
        metadata.width,
        metadata.height,
        metadata.frames_per_second,
        metadata.duration,
    );

    Ok(DecodeSummary {
        metadata,
        has_audio,
        output_directory: output_directory.to_path_buf(),
    })
}

/// Container duration when known, otherwise the duration implied by the
/// frames that were actually decoded.
fn resolve_duration(container_duration: f64, frame_count: u64, frames_per_second: f64) -> f64 {
    if container_duration > 0.0 {
        container_duration
    } else if frames_per_second > 0.0 {
        frame_count as f64 / frames_per_second
    } else {
        0.0
    }
}

fn write_png(frame: &RgbImage, path: &Path, options: &DecodeOptions) -> Result<(), ReframeError> {
    let writer = BufWriter::new(File::create(path)?);
    let encoder = PngEncoder::new_with_quality(
        writer,
        options.png_compression.to_compression_type(),
        FilterType::Adaptive,
    );
    frame.write_with_encoder(encoder)?;
    Ok(())
}
