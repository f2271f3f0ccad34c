//! Frame file naming and discovery.
//!
//! Frames are stored as `frame_{ordinal:06}.png` in a flat directory. The
//! six-digit padding keeps lexicographic and numeric order identical for the
//! first [`MAX_PADDED_FRAMES`] frames; past that the name simply widens. The
//! parser does not depend on padding at all and always sorts numerically.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{config::GapPolicy, error::ReframeError};

/// Prefix shared by every frame file name.
pub const FRAME_PREFIX: &str = "frame_";
/// Extension of every frame file.
pub const FRAME_EXTENSION: &str = "png";
/// Digits used when zero-padding ordinals.
pub const FRAME_INDEX_WIDTH: usize = 6;
/// Number of ordinals representable in [`FRAME_INDEX_WIDTH`] digits.
pub const MAX_PADDED_FRAMES: u64 = 1_000_000;
/// Name of the PCM audio track written next to the frames.
pub const AUDIO_FILE_NAME: &str = "audio.wav";
/// Name of the metadata file written next to the frames.
pub const METADATA_FILE_NAME: &str = "video_metadata.ini";

/// A frame image found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFile {
    /// Zero-based presentation ordinal parsed from the file name.
    pub ordinal: u64,
    /// Full path to the image.
    pub path: PathBuf,
}

/// Build the file name for a frame ordinal.
///
/// ```
/// assert_eq!(reframe::naming::frame_file_name(42), "frame_000042.png");
/// ```
pub fn frame_file_name(ordinal: u64) -> String {
    format!("{FRAME_PREFIX}{ordinal:0width$}.{FRAME_EXTENSION}", width = FRAME_INDEX_WIDTH)
}

/// Parse the ordinal out of a frame file name.
///
/// Accepts exactly `frame_<digits>.png` with any number of digits. Returns
/// `None` for anything else, including ordinals that overflow `u64`.
///
/// ```
/// use reframe::naming::parse_frame_file_name;
///
/// assert_eq!(parse_frame_file_name("frame_000007.png"), Some(7));
/// assert_eq!(parse_frame_file_name("frame_7.png"), Some(7));
/// assert_eq!(parse_frame_file_name("frame_.png"), None);
/// assert_eq!(parse_frame_file_name("frame_7.PNG"), None);
/// ```
pub fn parse_frame_file_name(name: &str) -> Option<u64> {
    let digits = name
        .strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_EXTENSION)?
        .strip_suffix('.')?;

    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

/// Scan `directory` for frame images and return them sorted by ordinal.
///
/// Subdirectories and non-matching names are ignored. Two files resolving
/// to the same ordinal always fail with [`ReframeError::DuplicateFrame`].
/// Gaps in the ordinal range are handled according to `gap_policy`.
///
/// # Errors
///
/// - [`ReframeError::IoError`] if the directory cannot be listed.
/// - [`ReframeError::NoFrames`] if nothing matched.
/// - [`ReframeError::DuplicateFrame`] / [`ReframeError::FrameGap`] as above.
pub fn discover_frames(
    directory: &Path,
    gap_policy: GapPolicy,
) -> Result<Vec<FrameFile>, ReframeError> {
    let mut frames = Vec::new();

    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(ordinal) = file_name.to_str().and_then(parse_frame_file_name) else {
            continue;
        };
        frames.push(FrameFile {
            ordinal,
            path: entry.path(),
        });
    }

    if frames.is_empty() {
        return Err(ReframeError::NoFrames(directory.to_path_buf()));
    }

    frames.sort_by_key(|frame| frame.ordinal);
    check_sequence(&frames, gap_policy)?;

    log::debug!(
        "Discovered {} frames in {} (ordinals {}..={})",
        frames.len(),
        directory.display(),
        frames[0].ordinal,
        frames[frames.len() - 1].ordinal,
    );

    Ok(frames)
}

/// Validate a sorted frame list against the duplicate and gap rules.
fn check_sequence(frames: &[FrameFile], gap_policy: GapPolicy) -> Result<(), ReframeError> {
    let mut expected = 0u64;
    let mut skipped = 0u64;

    for (position, frame) in frames.iter().enumerate() {
        if position > 0 && frames[position - 1].ordinal == frame.ordinal {
            return Err(ReframeError::DuplicateFrame {
                ordinal: frame.ordinal,
                first: frames[position - 1].path.clone(),
                second: frame.path.clone(),
            });
        }

        if frame.ordinal != expected {
            match gap_policy {
                GapPolicy::Reject => {
                    return Err(ReframeError::FrameGap {
                        expected,
                        found: frame.ordinal,
                    });
                }
                GapPolicy::Skip => skipped += frame.ordinal - expected,
            }
        }
        expected = frame.ordinal + 1;
    }

    if skipped > 0 {
        log::warn!("Skipping {skipped} missing frame ordinal(s); remaining frames are concatenated");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(directory: &Path, name: &str) {
        fs::write(directory.join(name), b"").expect("write test file");
    }

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_000000.png");
        assert_eq!(frame_file_name(999_999), "frame_999999.png");
        assert_eq!(frame_file_name(1_000_000), "frame_1000000.png");
    }

    #[test]
    fn padded_names_sort_numerically() {
        let mut names: Vec<String> = [10, 2, 999_999, 0, 100_000].map(frame_file_name).to_vec();
        names.sort();
        let ordinals: Vec<u64> = names
            .iter()
            .filter_map(|name| parse_frame_file_name(name))
            .collect();
        assert_eq!(ordinals, vec![0, 2, 10, 100_000, 999_999]);
    }

    #[test]
    fn parser_rejects_lookalikes() {
        for name in [
            "frame_12.jpg",
            "Frame_000001.png",
            "frame_-1.png",
            "frame_1a.png",
            "xframe_000001.png",
            "frame_000001.png.bak",
            "frame_99999999999999999999999.png",
            "audio.wav",
        ] {
            assert_eq!(parse_frame_file_name(name), None, "{name}");
        }
    }

    #[test]
    fn discovery_sorts_by_ordinal_not_name() {
        let directory = tempfile::tempdir().expect("tempdir");
        touch(directory.path(), "frame_10.png");
        touch(directory.path(), "frame_000002.png");
        touch(directory.path(), "frame_0.png");
        touch(directory.path(), "frame_1.png");
        touch(directory.path(), "frame_3.png");
        for ordinal in 4..10 {
            touch(directory.path(), &frame_file_name(ordinal));
        }
        touch(directory.path(), "notes.txt");
        touch(directory.path(), METADATA_FILE_NAME);
        fs::create_dir(directory.path().join("frame_11.png")).expect("mkdir");

        let frames = discover_frames(directory.path(), GapPolicy::Reject).expect("discover");
        let ordinals: Vec<u64> = frames.iter().map(|frame| frame.ordinal).collect();
        assert_eq!(ordinals, (0..=10).collect::<Vec<_>>());
        assert!(frames[10].path.ends_with("frame_10.png"));
    }

    #[test]
    fn gap_is_rejected_by_default() {
        let directory = tempfile::tempdir().expect("tempdir");
        touch(directory.path(), "frame_000000.png");
        touch(directory.path(), "frame_000002.png");

        let error = discover_frames(directory.path(), GapPolicy::Reject).unwrap_err();
        assert!(matches!(
            error,
            ReframeError::FrameGap {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn gap_is_skipped_when_requested() {
        let directory = tempfile::tempdir().expect("tempdir");
        touch(directory.path(), "frame_000000.png");
        touch(directory.path(), "frame_000002.png");

        let frames = discover_frames(directory.path(), GapPolicy::Skip).expect("discover");
        let ordinals: Vec<u64> = frames.iter().map(|frame| frame.ordinal).collect();
        assert_eq!(ordinals, vec![0, 2]);
    }

    #[test]
    fn sequence_not_starting_at_zero_is_a_gap() {
        let directory = tempfile::tempdir().expect("tempdir");
        touch(directory.path(), "frame_000001.png");

        let error = discover_frames(directory.path(), GapPolicy::Reject).unwrap_err();
        assert!(matches!(
            error,
            ReframeError::FrameGap {
                expected: 0,
                found: 1
            }
        ));
    }

    #[test]
    fn duplicate_ordinals_are_always_rejected() {
        let directory = tempfile::tempdir().expect("tempdir");
        touch(directory.path(), "frame_0.png");
        touch(directory.path(), "frame_1.png");
        touch(directory.path(), "frame_000001.png");

        for policy in [GapPolicy::Reject, GapPolicy::Skip] {
            let error = discover_frames(directory.path(), policy).unwrap_err();
            assert!(
                matches!(error, ReframeError::DuplicateFrame { ordinal: 1, .. }),
                "{error}"
            );
        }
    }

    #[test]
    fn empty_directory_has_no_frames() {
        let directory = tempfile::tempdir().expect("tempdir");
        touch(directory.path(), AUDIO_FILE_NAME);

        let error = discover_frames(directory.path(), GapPolicy::Reject).unwrap_err();
        assert!(matches!(error, ReframeError::NoFrames(_)));
    }
}
