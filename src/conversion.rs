//! Internal helpers shared by the pipelines.
//!
//! Pixel copies between FFmpeg's strided planes and tightly packed `image`
//! buffers, plus time-base arithmetic.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy plane 0 of a packed video frame into a tightly packed buffer.
///
/// `bytes_per_pixel` is 3 for RGB24.
pub fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Copy a tightly packed buffer into plane 0 of a packed video frame,
/// honouring the frame's stride.
pub fn buffer_into_frame(
    buffer: &[u8],
    video_frame: &mut VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data_mut(0);

    for row in 0..(height as usize) {
        let source = row * row_length;
        let destination = row * stride;
        data[destination..destination + row_length]
            .copy_from_slice(&buffer[source..source + row_length]);
    }
}

/// Rescale a timestamp from a stream time base to seconds.
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Evaluate a rational as a float, treating `x/0` as zero.
pub fn rational_to_f64(rational: Rational) -> f64 {
    if rational.denominator() == 0 {
        0.0
    } else {
        rational.numerator() as f64 / rational.denominator() as f64
    }
}

/// Express a frame rate as an exact `(numerator, denominator)` pair.
///
/// Integer rates map to `n/1` and NTSC-style rates to `n/1001`. Anything
/// else is approximated to microsecond precision and reduced.
pub fn frame_rate_fraction(frames_per_second: f64) -> (i32, i32) {
    const TOLERANCE: f64 = 1e-6;

    for denominator in [1_i64, 1001] {
        let numerator = (frames_per_second * denominator as f64).round();
        if numerator >= 1.0
            && numerator <= i32::MAX as f64
            && (numerator / denominator as f64 - frames_per_second).abs() < TOLERANCE
        {
            return (numerator as i32, denominator as i32);
        }
    }

    let denominator = 1_000_000_i64;
    let numerator = ((frames_per_second * denominator as f64).round() as i64).max(1);
    let divisor = greatest_common_divisor(numerator, denominator);
    let (mut numerator, mut denominator) = (numerator / divisor, denominator / divisor);
    while numerator > i32::MAX as i64 {
        numerator /= 10;
        denominator = (denominator / 10).max(1);
    }
    (numerator as i32, denominator as i32)
}

/// [`frame_rate_fraction`] as an FFmpeg [`Rational`].
pub fn frame_rate_to_rational(frames_per_second: f64) -> Rational {
    let (numerator, denominator) = frame_rate_fraction(frames_per_second);
    Rational::new(numerator, denominator)
}

fn greatest_common_divisor(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_rates_are_exact() {
        assert_eq!(frame_rate_fraction(2.0), (2, 1));
        assert_eq!(frame_rate_fraction(60.0), (60, 1));
    }

    #[test]
    fn ntsc_rates_use_1001() {
        assert_eq!(frame_rate_fraction(30000.0 / 1001.0), (30000, 1001));
        assert_eq!(frame_rate_fraction(24000.0 / 1001.0), (24000, 1001));
        assert_eq!(frame_rate_fraction(29.97002997002997), (30000, 1001));
    }

    #[test]
    fn other_rates_are_reduced() {
        assert_eq!(frame_rate_fraction(12.5), (25, 2));
        assert_eq!(frame_rate_fraction(0.25), (1, 4));
    }

    #[test]
    fn pts_conversion_handles_zero_denominator() {
        assert_eq!(pts_to_seconds(90_000, Rational::new(1, 90_000)), 1.0);
        assert_eq!(pts_to_seconds(5, Rational::new(1, 0)), 0.0);
        assert_eq!(rational_to_f64(Rational::new(30000, 1001)), 30000.0 / 1001.0);
    }
}
