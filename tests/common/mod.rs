//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::{fs, path::Path};

use image::{Rgb, RgbImage};
use reframe::{EncoderSettings, VideoMetadata, naming};

pub const WIDTH: u32 = 16;
pub const HEIGHT: u32 = 16;

/// Per-pixel texture for frame `ordinal`. Neighbouring pixels differ in
/// every channel, so chroma subsampling or quantization would show.
pub fn frame_image(ordinal: u64) -> RgbImage {
    let seed = ordinal as u32;
    RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let mix = (x * 37 + y * 91 + seed * 53).wrapping_mul(2_654_435_761);
        Rgb([(mix >> 24) as u8, (mix >> 16) as u8, (x * 16 + y + seed * 7) as u8])
    })
}

pub fn write_image(directory: &Path, file_name: &str, image: &RgbImage) {
    image.save(directory.join(file_name)).expect("write frame");
}

/// `count` frames named the way decode names them.
pub fn write_frames(directory: &Path, count: u64) {
    for ordinal in 0..count {
        write_image(directory, &naming::frame_file_name(ordinal), &frame_image(ordinal));
    }
}

pub fn write_metadata(directory: &Path, frames_per_second: f64, frame_count: u64, duration: f64) {
    VideoMetadata {
        frames_per_second,
        width: WIDTH,
        height: HEIGHT,
        frame_count,
        duration,
    }
    .write(directory.join(naming::METADATA_FILE_NAME))
    .expect("write metadata");
}

/// Mono 16-bit PCM WAV holding a quiet square wave.
pub fn write_wav(directory: &Path, sample_rate: u32, seconds: f64) {
    let samples = (f64::from(sample_rate) * seconds) as u32;
    let data_len = samples * 2;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for index in 0..samples {
        let sample: i16 = if (index / 20) % 2 == 0 { 1000 } else { -1000 };
        bytes.extend_from_slice(&sample.to_le_bytes());
    }

    fs::write(directory.join(naming::AUDIO_FILE_NAME), bytes).expect("write wav");
}

/// Whether this FFmpeg build has the lossless H.264 encoder. Tests that
/// encode return early without it.
pub fn lossless_encoder_available() -> bool {
    let available = ffmpeg_next::init().is_ok()
        && ffmpeg_next::encoder::find_by_name(EncoderSettings::default().codec_name.as_str())
            .is_some();
    if !available {
        eprintln!("Skipping: libx264 not available in this FFmpeg build");
    }
    available
}

/// Largest per-channel difference between two images of the same size.
pub fn max_channel_difference(left: &RgbImage, right: &RgbImage) -> u8 {
    assert_eq!(left.dimensions(), right.dimensions());
    left.as_raw()
        .iter()
        .zip(right.as_raw())
        .map(|(a, b)| a.abs_diff(*b))
        .max()
        .unwrap_or(0)
}

/// Worst-case per-channel error of an 8-bit RGB -> limited-range YUV ->
/// RGB round trip. Anything above this means the codec itself lost data.
pub const YUV_ROUNDING_TOLERANCE: u8 = 2;
