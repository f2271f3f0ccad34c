//! The `video_metadata.ini` record.
//!
//! [`VideoMetadata`] is written once by the decode pipeline and read back,
//! never modified, by the encode pipeline. On disk it is a single INI
//! section:
//!
//! ```ini
//! [VIDEO]
//! fps = 2.0
//! width = 4
//! height = 4
//! frames = 10
//! duration = 5.0
//! ```

use std::{fmt::Write as _, fs, io::ErrorKind, path::Path, str::FromStr};

use crate::error::ReframeError;

/// Section header holding every key.
pub const SECTION: &str = "VIDEO";

const KEY_FPS: &str = "fps";
const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";
const KEY_FRAMES: &str = "frames";
const KEY_DURATION: &str = "duration";

/// Frame rate, dimensions, frame count, and duration of a decoded video.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Frames per second. Always positive and finite.
    pub frames_per_second: f64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Number of frame files written by the decoder.
    pub frame_count: u64,
    /// Playback duration in seconds. Always positive and finite.
    pub duration: f64,
}

impl VideoMetadata {
    /// Number of frames the encoder should emit to fill `duration` at
    /// `frames_per_second`. Never less than one.
    pub fn target_frame_count(&self) -> u64 {
        ((self.duration * self.frames_per_second).round() as u64).max(1)
    }

    /// Check the invariants every record must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`ReframeError::MetadataInvalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ReframeError> {
        if !(self.frames_per_second.is_finite() && self.frames_per_second > 0.0) {
            return Err(ReframeError::invalid_metadata(
                KEY_FPS,
                format!("must be a positive number, got {}", self.frames_per_second),
            ));
        }
        if self.width == 0 {
            return Err(ReframeError::invalid_metadata(KEY_WIDTH, "must be positive"));
        }
        if self.height == 0 {
            return Err(ReframeError::invalid_metadata(KEY_HEIGHT, "must be positive"));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(ReframeError::invalid_metadata(
                KEY_DURATION,
                format!("must be a positive number of seconds, got {}", self.duration),
            ));
        }
        Ok(())
    }

    /// Render the record as INI text.
    pub fn to_ini_string(&self) -> String {
        let mut text = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(text, "[{SECTION}]");
        let _ = writeln!(text, "{KEY_FPS} = {:?}", self.frames_per_second);
        let _ = writeln!(text, "{KEY_WIDTH} = {}", self.width);
        let _ = writeln!(text, "{KEY_HEIGHT} = {}", self.height);
        let _ = writeln!(text, "{KEY_FRAMES} = {}", self.frame_count);
        let _ = writeln!(text, "{KEY_DURATION} = {:?}", self.duration);
        text
    }

    /// Parse INI text into a validated record.
    ///
    /// Accepts `=` or `:` as the delimiter, `#` and `;` comment lines, and
    /// keys in any letter case. Other sections and unknown keys are
    /// ignored. The `VIDEO` section name is matched exactly.
    ///
    /// # Errors
    ///
    /// Returns [`ReframeError::MetadataInvalid`] if the section is absent,
    /// any key is missing, or a value does not parse.
    pub fn from_ini_str(text: &str) -> Result<Self, ReframeError> {
        let mut fields = IniFields::default();
        let mut section_found = false;
        let mut in_section = false;

        for (line_number, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| {
                    ReframeError::invalid_metadata(
                        "section",
                        format!("unterminated section header on line {}", line_number + 1),
                    )
                })?;
                in_section = name.trim() == SECTION;
                section_found |= in_section;
                continue;
            }

            if !in_section {
                continue;
            }

            let Some(split_at) = line.find(['=', ':']) else {
                return Err(ReframeError::invalid_metadata(
                    "line",
                    format!("expected `key = value` on line {}", line_number + 1),
                ));
            };
            let key = line[..split_at].trim().to_ascii_lowercase();
            let value = line[split_at + 1..].trim().to_string();
            fields.insert(key, value);
        }

        if !section_found {
            return Err(ReframeError::invalid_metadata(
                SECTION,
                "section not found",
            ));
        }

        let metadata = Self {
            frames_per_second: fields.parse(KEY_FPS)?,
            width: fields.parse(KEY_WIDTH)?,
            height: fields.parse(KEY_HEIGHT)?,
            frame_count: fields.parse(KEY_FRAMES)?,
            duration: fields.parse(KEY_DURATION)?,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Validate the record and write it to `path`, replacing any existing
    /// file. Nothing is written when validation fails.
    ///
    /// # Errors
    ///
    /// - [`ReframeError::MetadataInvalid`] if the record breaks an invariant.
    /// - [`ReframeError::IoError`] if the file cannot be written.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ReframeError> {
        let path = path.as_ref();
        self.validate()?;
        log::debug!("Writing metadata to {}", path.display());
        fs::write(path, self.to_ini_string())?;
        Ok(())
    }

    /// Read and validate the record stored at `path`.
    ///
    /// # Errors
    ///
    /// - [`ReframeError::MetadataMissing`] if the file does not exist.
    /// - [`ReframeError::MetadataInvalid`] if it does not parse.
    /// - [`ReframeError::IoError`] for any other read failure.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ReframeError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(ReframeError::MetadataMissing(path.to_path_buf()));
            }
            Err(error) => return Err(error.into()),
        };
        Self::from_ini_str(&text)
    }
}

/// Raw key/value pairs collected from the `VIDEO` section. Later
/// duplicates win.
#[derive(Default)]
struct IniFields {
    entries: Vec<(String, String)>,
}

impl IniFields {
    fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<T, ReframeError>
    where
        T::Err: std::fmt::Display,
    {
        let (_, value) = self
            .entries
            .iter()
            .find(|(existing, _)| existing == key)
            .ok_or_else(|| ReframeError::invalid_metadata(key, "missing"))?;

        value.parse().map_err(|error: T::Err| {
            ReframeError::invalid_metadata(key, format!("cannot parse {value:?}: {error}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VideoMetadata {
        VideoMetadata {
            frames_per_second: 2.0,
            width: 4,
            height: 4,
            frame_count: 10,
            duration: 5.0,
        }
    }

    #[test]
    fn renders_single_video_section() {
        let text = sample().to_ini_string();
        assert_eq!(
            text,
            "[VIDEO]\nfps = 2.0\nwidth = 4\nheight = 4\nframes = 10\nduration = 5.0\n"
        );
    }

    #[test]
    fn write_refuses_records_it_could_not_read_back() {
        let directory = tempfile::tempdir().expect("tempdir");
        let path = directory.path().join("video_metadata.ini");
        let empty = VideoMetadata {
            frame_count: 0,
            duration: 0.0,
            ..sample()
        };

        match empty.write(&path) {
            Err(ReframeError::MetadataInvalid { key, .. }) => assert_eq!(key, KEY_DURATION),
            other => panic!("expected MetadataInvalid, got {other:?}"),
        }
        assert!(!path.exists());

        let no_rate = VideoMetadata {
            frames_per_second: 0.0,
            ..sample()
        };
        assert!(no_rate.write(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn parses_what_it_writes() {
        let metadata = VideoMetadata {
            frames_per_second: 30000.0 / 1001.0,
            duration: 12.345678,
            ..sample()
        };
        let parsed = VideoMetadata::from_ini_str(&metadata.to_ini_string()).expect("parse");
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn accepts_configparser_variations() {
        let text = "\
# written elsewhere
[OTHER]
fps = 99

[VIDEO]
FPS: 25
width=1920
  height =  1080
; comment
frames = 250
duration = 10
extra = ignored
";
        let parsed = VideoMetadata::from_ini_str(text).expect("parse");
        assert_eq!(parsed.frames_per_second, 25.0);
        assert_eq!(parsed.width, 1920);
        assert_eq!(parsed.height, 1080);
        assert_eq!(parsed.frame_count, 250);
        assert_eq!(parsed.duration, 10.0);
    }

    #[test]
    fn missing_duration_is_a_format_error() {
        let text = "[VIDEO]\nfps = 2.0\nwidth = 4\nheight = 4\nframes = 10\n";
        let error = VideoMetadata::from_ini_str(text).unwrap_err();
        match error {
            ReframeError::MetadataInvalid { key, reason } => {
                assert_eq!(key, "duration");
                assert_eq!(reason, "missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_values_are_rejected() {
        let text = "[VIDEO]\nfps = fast\nwidth = 4\nheight = 4\nframes = 10\nduration = 5\n";
        let error = VideoMetadata::from_ini_str(text).unwrap_err();
        assert!(matches!(error, ReframeError::MetadataInvalid { ref key, .. } if key == "fps"));

        let text = "[VIDEO]\nfps = 2\nwidth = -4\nheight = 4\nframes = 10\nduration = 5\n";
        let error = VideoMetadata::from_ini_str(text).unwrap_err();
        assert!(matches!(error, ReframeError::MetadataInvalid { ref key, .. } if key == "width"));
    }

    #[test]
    fn non_positive_values_are_rejected() {
        for (key, text) in [
            ("fps", "[VIDEO]\nfps = 0\nwidth = 4\nheight = 4\nframes = 1\nduration = 5\n"),
            ("fps", "[VIDEO]\nfps = inf\nwidth = 4\nheight = 4\nframes = 1\nduration = 5\n"),
            ("height", "[VIDEO]\nfps = 2\nwidth = 4\nheight = 0\nframes = 1\nduration = 5\n"),
            ("duration", "[VIDEO]\nfps = 2\nwidth = 4\nheight = 4\nframes = 1\nduration = 0\n"),
            ("duration", "[VIDEO]\nfps = 2\nwidth = 4\nheight = 4\nframes = 1\nduration = NaN\n"),
        ] {
            let error = VideoMetadata::from_ini_str(text).unwrap_err();
            assert!(
                matches!(error, ReframeError::MetadataInvalid { key: ref k, .. } if k == key),
                "{key}: {error}"
            );
        }
    }

    #[test]
    fn section_name_is_case_sensitive() {
        let text = "[video]\nfps = 2\nwidth = 4\nheight = 4\nframes = 1\nduration = 5\n";
        let error = VideoMetadata::from_ini_str(text).unwrap_err();
        assert!(matches!(error, ReframeError::MetadataInvalid { ref key, .. } if key == "VIDEO"));
    }

    #[test]
    fn read_reports_missing_file() {
        let directory = tempfile::tempdir().expect("tempdir");
        let path = directory.path().join("video_metadata.ini");
        let error = VideoMetadata::read(&path).unwrap_err();
        assert!(matches!(error, ReframeError::MetadataMissing(ref missing) if *missing == path));
    }

    #[test]
    fn write_then_read_from_disk() {
        let directory = tempfile::tempdir().expect("tempdir");
        let path = directory.path().join("video_metadata.ini");
        sample().write(&path).expect("write");
        assert_eq!(VideoMetadata::read(&path).expect("read"), sample());
    }

    #[test]
    fn target_frame_count_rounds_and_floors_at_one() {
        assert_eq!(sample().target_frame_count(), 10);
        let short = VideoMetadata {
            duration: 0.1,
            ..sample()
        };
        assert_eq!(short.target_frame_count(), 1);
        let ntsc = VideoMetadata {
            frames_per_second: 30000.0 / 1001.0,
            duration: 10.01,
            ..sample()
        };
        assert_eq!(ntsc.target_frame_count(), 300);
    }
}
