use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell as CompletionShell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reframe::{
    DecodeOptions, EncodeOptions, EncoderSettings, FfmpegLogLevel, GapPolicy, MediaSource,
    PngCompression, ProgressCallback, ProgressInfo, Shell, VideoMetadata,
    naming::METADATA_FILE_NAME,
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  reframe\n  reframe decode input.mp4 frames --progress\n  reframe encode frames output.mkv\n  reframe info frames --json\n  reframe completions zsh > _reframe";

#[derive(Debug, Parser)]
#[command(
    name = "reframe",
    version,
    about = "Convert a video to PNG frames and back, losslessly",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    /// Defaults to the interactive shell.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true, default_value = "error")]
    log_level: FfmpegLogLevel,

    /// Show a progress bar for decode and encode.
    #[arg(long, global = true)]
    progress: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressionArg {
    Fast,
    Default,
    Best,
}

impl From<CompressionArg> for PngCompression {
    fn from(value: CompressionArg) -> Self {
        match value {
            CompressionArg::Fast => PngCompression::Fast,
            CompressionArg::Default => PngCompression::Default,
            CompressionArg::Best => PngCompression::Best,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pick a mode, input, and output from a terminal menu.
    #[command(about = "Start the interactive shell")]
    Shell,

    /// Decode a video into PNG frames, audio.wav, and video_metadata.ini.
    #[command(
        about = "Decode a video into frames",
        after_help = "Examples:\n  reframe decode input.mp4 frames\n  reframe decode input.mov frames --png-compression fast --no-audio"
    )]
    Decode {
        /// Input video file.
        input: PathBuf,
        /// Output directory, created if missing.
        output: PathBuf,
        /// PNG compression effort. Every level is lossless.
        #[arg(long, value_enum, default_value = "default")]
        png_compression: CompressionArg,
        /// Do not write audio.wav.
        #[arg(long)]
        no_audio: bool,
    },

    /// Encode a frame directory back into a video.
    #[command(
        about = "Encode frames into a video",
        after_help = "Examples:\n  reframe encode frames output.mkv\n  reframe encode frames output.mp4 --skip-gaps"
    )]
    Encode {
        /// Directory written by `reframe decode`.
        input: PathBuf,
        /// Output video; the container follows the extension.
        output: PathBuf,
        /// Concatenate frames around missing numbers instead of failing.
        #[arg(long)]
        skip_gaps: bool,
        /// x264 constant rate factor (0 is lossless).
        #[arg(long, default_value_t = 0)]
        crf: u32,
        /// x264 preset.
        #[arg(long, default_value = "veryslow")]
        preset: String,
    },

    /// Print a frame directory's metadata or a video's stream summary.
    #[command(
        about = "Print video or frame directory metadata",
        visible_alias = "probe",
        after_help = "Examples:\n  reframe info input.mp4\n  reframe info frames --json"
    )]
    Info {
        /// A video file or a directory containing video_metadata.ini.
        path: PathBuf,
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Drives an indicatif bar from pipeline progress snapshots.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.cyan} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_message(format!("{:?}", info.operation));
        self.bar.set_position(info.current);
        if info.total.is_some_and(|total| info.current >= total) {
            self.bar.finish_and_clear();
        }
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .try_init();
}

fn print_directory_info(directory: &Path, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = VideoMetadata::read(directory.join(METADATA_FILE_NAME))?;
    if as_json {
        let payload = json!({
            "fps": metadata.frames_per_second,
            "width": metadata.width,
            "height": metadata.height,
            "frames": metadata.frame_count,
            "duration_seconds": metadata.duration,
            "target_frames": metadata.target_frame_count(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Frame rate: {} fps", metadata.frames_per_second);
        println!("Size: {}x{}", metadata.width, metadata.height);
        println!("Frames: {}", metadata.frame_count);
        println!("Duration: {:.3}s", metadata.duration);
    }
    Ok(())
}

fn print_video_info(path: &Path, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = MediaSource::open(path)?;
    let info = source.info();
    if as_json {
        let payload = json!({
            "format": info.format,
            "fps": info.frames_per_second,
            "width": info.width,
            "height": info.height,
            "duration_seconds": info.duration,
            "estimated_frames": info.estimated_frame_count(),
            "video_codec": info.video_codec,
            "pixel_format": format!("{:?}", info.pixel_format).to_ascii_lowercase(),
            "audio_codec": info.audio_codec,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Format: {}", info.format);
        println!(
            "Video: {} ({:?}) {}x{} @ {:.3} fps",
            info.video_codec, info.pixel_format, info.width, info.height, info.frames_per_second
        );
        println!("Duration: {:.3}s", info.duration);
        match &info.audio_codec {
            Some(codec) => println!("Audio: {codec}"),
            None => println!("Audio: none"),
        }
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    reframe::set_ffmpeg_log_level(cli.global.log_level);

    let progress = || -> Option<Arc<dyn ProgressCallback>> {
        cli.global
            .progress
            .then(|| Arc::new(TerminalProgress::new()) as Arc<dyn ProgressCallback>)
    };

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            Shell::new(DecodeOptions::new(), EncodeOptions::new()).run()?;
        }
        Commands::Decode {
            input,
            output,
            png_compression,
            no_audio,
        } => {
            let mut options = DecodeOptions::new()
                .with_png_compression(png_compression.into())
                .with_audio(!no_audio);
            if let Some(callback) = progress() {
                options = options.with_progress(callback);
            }
            let summary = reframe::decode_video(&input, &output, &options)?;
            println!(
                "{} {} frames ({}x{} @ {} fps) to {}{}",
                "decoded".green().bold(),
                summary.metadata.frame_count,
                summary.metadata.width,
                summary.metadata.height,
                summary.metadata.frames_per_second,
                summary.output_directory.display(),
                if summary.has_audio { " with audio" } else { "" }
            );
        }
        Commands::Encode {
            input,
            output,
            skip_gaps,
            crf,
            preset,
        } => {
            let gap_policy = if skip_gaps { GapPolicy::Skip } else { GapPolicy::Reject };
            let mut options = EncodeOptions::new()
                .with_gap_policy(gap_policy)
                .with_encoder(EncoderSettings::default().crf(crf).preset(preset));
            if let Some(callback) = progress() {
                options = options.with_progress(callback);
            }
            if crf > 0 {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("--crf {crf} is lossy").yellow()
                );
            }
            let summary = reframe::encode_video(&input, &output, &options)?;
            println!(
                "{} {} frames ({:.3}s) to {}{}",
                "encoded".green().bold(),
                summary.frames_encoded,
                summary.duration,
                summary.output_path.display(),
                if summary.has_audio { " with audio" } else { "" }
            );
        }
        Commands::Info { path, json } => {
            if path.is_dir() {
                print_directory_info(&path, json)?;
            } else {
                print_video_info(&path, json)?;
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "reframe", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
