//! Interactive terminal shell.
//!
//! The shell owns a [`ShellState`] (mode plus input/output paths), lets the
//! user edit it through prompts or mode-filtered pickers, and on start hands
//! a [`Job`] to a worker thread. The interface thread keeps a spinner
//! moving until the worker's [`JobOutcome`] arrives over a channel, then
//! reports success or the error message. There is no retry, no progress
//! percentage, and no cancellation once a job has started.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::Duration,
};

use colored::Colorize;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::{DecodeOptions, EncodeOptions},
    decode::decode_video,
    encode::encode_video,
    error::ReframeError,
    naming::METADATA_FILE_NAME,
};

/// Extensions offered by the input picker in decode mode. Advisory only:
/// typed paths are passed to FFmpeg whatever their extension.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mkv", "mov", "avi"];

/// Extension appended to encode destinations typed without one.
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

const SUCCESS_MESSAGE: &str = "Operation completed successfully";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Which pipeline the shell runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Video → frames + audio.
    #[default]
    Decode,
    /// Frames → video.
    Encode,
}

impl Mode {
    /// Both modes, in menu order.
    pub const ALL: [Mode; 2] = [Mode::Decode, Mode::Encode];

    /// What the picker offers for the input path.
    pub fn input_picker(self) -> PickerKind {
        match self {
            Mode::Decode => PickerKind::VideoFile,
            Mode::Encode => PickerKind::FrameDirectory,
        }
    }

    /// What the picker offers for the output path.
    pub fn output_picker(self) -> PickerKind {
        match self {
            Mode::Decode => PickerKind::Directory,
            Mode::Encode => PickerKind::VideoDestination,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Mode::Decode => write!(f, "Decode Video → Frames + Audio"),
            Mode::Encode => write!(f, "Encode Frames → Video (LOSSLESS)"),
        }
    }
}

/// Kinds of path the pickers list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKind {
    /// Files with one of [`VIDEO_EXTENSIONS`].
    VideoFile,
    /// Any directory.
    Directory,
    /// Directories holding `video_metadata.ini`.
    FrameDirectory,
    /// A new video file; nothing to list, only a typed name.
    VideoDestination,
}

/// List the entries of `directory` a picker of `kind` should offer, sorted
/// by path. Unreadable entries are skipped.
pub fn candidates(directory: &Path, kind: PickerKind) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(directory) else {
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| match kind {
            PickerKind::VideoFile => path.is_file() && has_video_extension(path),
            PickerKind::Directory => path.is_dir(),
            PickerKind::FrameDirectory => path.join(METADATA_FILE_NAME).is_file(),
            PickerKind::VideoDestination => false,
        })
        .collect();
    found.sort();
    found
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            VIDEO_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        })
}

/// Append `.{extension}` to a typed destination that has none.
pub fn ensure_extension(path: &str, extension: &str) -> String {
    if path.is_empty() || Path::new(path).extension().is_some() {
        path.to_string()
    } else {
        format!("{path}.{extension}")
    }
}

/// The shell's editable state. Owned by the shell; pipelines only ever see
/// the [`Job`] built from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellState {
    /// Selected pipeline.
    pub mode: Mode,
    /// Input path as typed or picked.
    pub input: String,
    /// Output path as typed or picked.
    pub output: String,
}

impl ShellState {
    /// Build a job from the current fields.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message when either path is blank.
    pub fn job(
        &self,
        decode_options: &DecodeOptions,
        encode_options: &EncodeOptions,
    ) -> Result<Job, String> {
        let input = self.input.trim();
        let output = self.output.trim();
        if input.is_empty() {
            return Err("Choose an input path first".to_string());
        }
        if output.is_empty() {
            return Err("Choose an output path first".to_string());
        }

        Ok(match self.mode {
            Mode::Decode => Job::Decode {
                input: PathBuf::from(input),
                output: PathBuf::from(output),
                options: decode_options.clone(),
            },
            Mode::Encode => Job::Encode {
                input: PathBuf::from(input),
                output: PathBuf::from(output),
                options: encode_options.clone(),
            },
        })
    }
}

/// One pipeline run, independent of any shell state.
#[derive(Debug, Clone)]
pub enum Job {
    /// Decode a video into a frame directory.
    Decode {
        /// Video to read.
        input: PathBuf,
        /// Directory to fill.
        output: PathBuf,
        /// Decode settings.
        options: DecodeOptions,
    },
    /// Encode a frame directory into a video.
    Encode {
        /// Directory to read.
        input: PathBuf,
        /// Video to write.
        output: PathBuf,
        /// Encode settings.
        options: EncodeOptions,
    },
}

impl Job {
    /// Run the pipeline on the current thread and describe the result.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the pipeline.
    pub fn run(&self) -> Result<String, ReframeError> {
        match self {
            Job::Decode {
                input,
                output,
                options,
            } => {
                let summary = decode_video(input, output, options)?;
                Ok(format!(
                    "{} frames{} written to {}",
                    summary.metadata.frame_count,
                    if summary.has_audio { " and audio" } else { "" },
                    summary.output_directory.display()
                ))
            }
            Job::Encode {
                input,
                output,
                options,
            } => {
                let summary = encode_video(input, output, options)?;
                Ok(format!(
                    "{} frames{} encoded into {}",
                    summary.frames_encoded,
                    if summary.has_audio { " and audio" } else { "" },
                    summary.output_path.display()
                ))
            }
        }
    }
}

/// How a background job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The pipeline finished; carries a one-line summary.
    Completed(String),
    /// The pipeline failed; carries the error message.
    Failed(String),
}

/// Handle to a job running on a worker thread.
pub struct JobHandle {
    receiver: Receiver<JobOutcome>,
    worker: JoinHandle<()>,
}

impl JobHandle {
    /// Block until the job ends, calling `on_tick` roughly every 100 ms
    /// while it runs.
    pub fn wait_with(self, mut on_tick: impl FnMut()) -> JobOutcome {
        let outcome = loop {
            match self.receiver.recv_timeout(POLL_INTERVAL) {
                Ok(outcome) => break outcome,
                Err(RecvTimeoutError::Timeout) => on_tick(),
                Err(RecvTimeoutError::Disconnected) => {
                    break JobOutcome::Failed("The worker stopped unexpectedly".to_string());
                }
            }
        };
        if self.worker.join().is_err() {
            log::error!("Worker thread panicked after reporting");
        }
        outcome
    }

    /// Block until the job ends.
    pub fn wait(self) -> JobOutcome {
        self.wait_with(|| {})
    }
}

/// Run `job` on a new worker thread.
///
/// # Errors
///
/// Returns [`ReframeError::IoError`] if the thread cannot be spawned.
pub fn spawn_job(job: Job) -> Result<JobHandle, ReframeError> {
    let (sender, receiver) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("reframe-worker".to_string())
        .spawn(move || {
            let outcome = match job.run() {
                Ok(summary) => JobOutcome::Completed(summary),
                Err(error) => {
                    log::error!("{error}");
                    JobOutcome::Failed(error.to_string())
                }
            };
            // The receiver only goes away if the shell itself is exiting.
            let _ = sender.send(outcome);
        })?;
    Ok(JobHandle { receiver, worker })
}

/// The interactive menu loop.
pub struct Shell {
    state: ShellState,
    theme: ColorfulTheme,
    decode_options: DecodeOptions,
    encode_options: EncodeOptions,
    working_directory: PathBuf,
}

/// Top-level menu entries.
#[derive(Debug, Clone, Copy)]
enum MenuAction {
    Mode,
    Input,
    Output,
    Start,
    Quit,
}

impl Shell {
    /// Create a shell that runs jobs with the given pipeline settings.
    pub fn new(decode_options: DecodeOptions, encode_options: EncodeOptions) -> Self {
        Self {
            state: ShellState::default(),
            theme: ColorfulTheme::default(),
            decode_options,
            encode_options,
            working_directory: PathBuf::from("."),
        }
    }

    /// Current state.
    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Run until the user quits.
    ///
    /// # Errors
    ///
    /// Returns [`ReframeError::IoError`] if the terminal cannot be driven.
    /// Pipeline failures are reported on screen and do not end the loop.
    pub fn run(&mut self) -> Result<(), ReframeError> {
        println!("{}", "Video ⇄ Image Frames (LOSSLESS)".bold());

        loop {
            let actions = [
                (MenuAction::Mode, format!("Mode:   {}", self.state.mode)),
                (MenuAction::Input, format!("Input:  {}", display_field(&self.state.input))),
                (MenuAction::Output, format!("Output: {}", display_field(&self.state.output))),
                (MenuAction::Start, "START".to_string()),
                (MenuAction::Quit, "Quit".to_string()),
            ];
            let labels: Vec<&str> = actions.iter().map(|(_, label)| label.as_str()).collect();

            let selection = Select::with_theme(&self.theme)
                .with_prompt("Choose an action")
                .default(3)
                .items(&labels)
                .interact_opt()
                .map_err(prompt_error)?;

            let Some(index) = selection else {
                return Ok(());
            };

            match actions[index].0 {
                MenuAction::Mode => self.choose_mode()?,
                MenuAction::Input => {
                    let kind = self.state.mode.input_picker();
                    if let Some(path) = self.choose_path("Input file / folder", kind, &self.state.input)? {
                        self.state.input = path;
                    }
                }
                MenuAction::Output => {
                    let kind = self.state.mode.output_picker();
                    if let Some(path) = self.choose_path("Output folder / file", kind, &self.state.output)? {
                        self.state.output = path;
                    }
                }
                MenuAction::Start => self.start()?,
                MenuAction::Quit => return Ok(()),
            }
        }
    }

    fn choose_mode(&mut self) -> Result<(), ReframeError> {
        let labels: Vec<String> = Mode::ALL.iter().map(ToString::to_string).collect();
        let current = Mode::ALL
            .iter()
            .position(|mode| *mode == self.state.mode)
            .unwrap_or(0);

        if let Some(index) = Select::with_theme(&self.theme)
            .with_prompt("Mode")
            .default(current)
            .items(&labels)
            .interact_opt()
            .map_err(prompt_error)?
        {
            self.state.mode = Mode::ALL[index];
        }
        Ok(())
    }

    /// Offer typed entry plus the picker's candidates. `None` means the
    /// user backed out.
    fn choose_path(
        &self,
        prompt: &str,
        kind: PickerKind,
        current: &str,
    ) -> Result<Option<String>, ReframeError> {
        let found = candidates(&self.working_directory, kind);
        let mut labels = vec!["Type a path…".to_string()];
        labels.extend(found.iter().map(|path| path.display().to_string()));

        let choice = if found.is_empty() {
            Some(0)
        } else {
            Select::with_theme(&self.theme)
                .with_prompt(prompt)
                .default(0)
                .items(&labels)
                .interact_opt()
                .map_err(prompt_error)?
        };

        match choice {
            None => Ok(None),
            Some(0) => {
                let typed: String = Input::with_theme(&self.theme)
                    .with_prompt(prompt)
                    .with_initial_text(current)
                    .allow_empty(true)
                    .interact_text()
                    .map_err(prompt_error)?;
                let typed = typed.trim().to_string();
                Ok(Some(if kind == PickerKind::VideoDestination {
                    ensure_extension(&typed, DEFAULT_VIDEO_EXTENSION)
                } else {
                    typed
                }))
            }
            Some(index) => Ok(Some(labels[index].clone())),
        }
    }

    fn start(&mut self) -> Result<(), ReframeError> {
        let job = match self.state.job(&self.decode_options, &self.encode_options) {
            Ok(job) => job,
            Err(message) => {
                println!("{} {message}", "!".yellow().bold());
                return Ok(());
            }
        };

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(match self.state.mode {
            Mode::Decode => "Decoding…",
            Mode::Encode => "Encoding…",
        });

        let outcome = spawn_job(job)?.wait_with(|| spinner.tick());
        spinner.finish_and_clear();

        match outcome {
            JobOutcome::Completed(summary) => {
                println!("{} {SUCCESS_MESSAGE}", "Done:".green().bold());
                println!("  {summary}");
            }
            JobOutcome::Failed(message) => {
                println!("{} {message}", "Error:".red().bold());
            }
        }
        Ok(())
    }
}

fn display_field(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}

fn prompt_error(error: dialoguer::Error) -> ReframeError {
    ReframeError::IoError(error.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pickers_follow_mode() {
        assert_eq!(Mode::Decode.input_picker(), PickerKind::VideoFile);
        assert_eq!(Mode::Decode.output_picker(), PickerKind::Directory);
        assert_eq!(Mode::Encode.input_picker(), PickerKind::FrameDirectory);
        assert_eq!(Mode::Encode.output_picker(), PickerKind::VideoDestination);
    }

    #[test]
    fn candidates_are_filtered_by_kind() {
        let directory = tempfile::tempdir().expect("tempdir");
        let root = directory.path();
        fs::write(root.join("clip.MP4"), b"").expect("write");
        fs::write(root.join("movie.mkv"), b"").expect("write");
        fs::write(root.join("notes.txt"), b"").expect("write");
        fs::create_dir(root.join("frames")).expect("mkdir");
        fs::write(root.join("frames").join(METADATA_FILE_NAME), b"").expect("write");
        fs::create_dir(root.join("empty")).expect("mkdir");

        assert_eq!(
            candidates(root, PickerKind::VideoFile),
            vec![root.join("clip.MP4"), root.join("movie.mkv")]
        );
        assert_eq!(
            candidates(root, PickerKind::Directory),
            vec![root.join("empty"), root.join("frames")]
        );
        assert_eq!(candidates(root, PickerKind::FrameDirectory), vec![root.join("frames")]);
        assert!(candidates(root, PickerKind::VideoDestination).is_empty());
        assert!(candidates(&root.join("missing"), PickerKind::Directory).is_empty());
    }

    #[test]
    fn destinations_get_default_extension() {
        assert_eq!(ensure_extension("out", "mp4"), "out.mp4");
        assert_eq!(ensure_extension("out.mkv", "mp4"), "out.mkv");
        assert_eq!(ensure_extension("", "mp4"), "");
    }

    #[test]
    fn job_requires_both_paths() {
        let decode = DecodeOptions::default();
        let encode = EncodeOptions::default();
        let mut state = ShellState::default();
        assert!(state.job(&decode, &encode).is_err());

        state.input = "in.mp4".to_string();
        state.output = "   ".to_string();
        assert!(state.job(&decode, &encode).is_err());

        state.output = " frames ".to_string();
        match state.job(&decode, &encode).expect("job") {
            Job::Decode { input, output, .. } => {
                assert_eq!(input, PathBuf::from("in.mp4"));
                assert_eq!(output, PathBuf::from("frames"));
            }
            other => panic!("unexpected job: {other:?}"),
        }

        state.mode = Mode::Encode;
        assert!(matches!(state.job(&decode, &encode), Ok(Job::Encode { .. })));
    }

    #[test]
    fn failed_job_reports_error_message() {
        let directory = tempfile::tempdir().expect("tempdir");
        let job = Job::Encode {
            input: directory.path().to_path_buf(),
            output: directory.path().join("out.mp4"),
            options: EncodeOptions::default(),
        };

        match spawn_job(job).expect("spawn").wait() {
            JobOutcome::Failed(message) => {
                assert!(message.contains("Metadata file not found"), "{message}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn jobs_run_independently() {
        let directory = tempfile::tempdir().expect("tempdir");
        let handles: Vec<JobHandle> = (0..2)
            .map(|index| {
                spawn_job(Job::Decode {
                    input: directory.path().join(format!("missing_{index}.mp4")),
                    output: directory.path().join(format!("frames_{index}")),
                    options: DecodeOptions::default(),
                })
                .expect("spawn")
            })
            .collect();

        for handle in handles {
            assert!(matches!(handle.wait(), JobOutcome::Failed(_)));
        }
        assert!(directory.path().join("frames_0").is_dir());
        assert!(directory.path().join("frames_1").is_dir());
    }
}
