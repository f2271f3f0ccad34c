//! PCM audio transcoding.
//!
//! Both pipelines move audio the same way: decode a source track, resample
//! it to packed signed 16-bit at its native rate and channel layout, encode
//! it with `pcm_s16le`, and mux it into an output context. The decode
//! pipeline targets a standalone `audio.wav`; the encode pipeline
//! interleaves the track with video via [`AudioTrack::write_until`].

use std::path::Path;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    decoder::Audio as AudioDecoder,
    encoder::Audio as AudioEncoder,
    format::{Sample, context::Input, context::Output, sample::Type as SampleType},
    frame::Audio as AudioFrame,
    media::Type,
    software::resampling::Context as ResamplingContext,
};

use crate::error::ReframeError;

/// Container name for the standalone audio file.
const WAV_CONTAINER: &str = "wav";

/// A decode → resample → `pcm_s16le` encode chain over one audio stream.
pub(crate) struct AudioTrack {
    input_context: Input,
    input_stream_index: usize,
    output_stream_index: Option<usize>,
    decoder: AudioDecoder,
    encoder: AudioEncoder,
    resampler: ResamplingContext,
    encoder_time_base: Rational,
    sample_rate: u32,
    samples_written: i64,
    sample_limit: Option<i64>,
    decoded_frame: AudioFrame,
    resampled_frame: AudioFrame,
    encoded_packet: Packet,
    finished: bool,
}

impl AudioTrack {
    /// Open the best audio stream of `path`.
    ///
    /// Returns `Ok(None)` when the file carries no audio.
    ///
    /// # Errors
    ///
    /// Returns [`ReframeError::FileOpen`] if the file cannot be opened, and
    /// audio decode/encode errors if the chain cannot be built.
    pub(crate) fn open(path: &Path) -> Result<Option<Self>, ReframeError> {
        ffmpeg_next::init()?;
        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| ReframeError::FileOpen {
                path: path.to_path_buf(),
                reason: error.to_string(),
            })?;

        let Some(stream) = input_context.streams().best(Type::Audio) else {
            return Ok(None);
        };
        let input_stream_index = stream.index();

        // Set up decoder.
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .audio()
            .map_err(|error| ReframeError::AudioDecodeError(error.to_string()))?;

        let sample_rate = decoder.rate();
        let channel_layout = decoder.channel_layout();
        let output_format = Sample::I16(SampleType::Packed);

        // Set up PCM encoder at the source rate and layout.
        let codec = ffmpeg_next::encoder::find(Id::PCM_S16LE).ok_or_else(|| {
            ReframeError::AudioEncodeError("pcm_s16le encoder not available".to_string())
        })?;

        let mut encoder_context = CodecContext::new()
            .encoder()
            .audio()
            .map_err(|error| ReframeError::AudioEncodeError(error.to_string()))?;
        encoder_context.set_rate(sample_rate as i32);
        encoder_context.set_channel_layout(channel_layout);
        encoder_context.set_format(output_format);
        let encoder_time_base = Rational(1, sample_rate as i32);
        encoder_context.set_time_base(encoder_time_base);

        let encoder = encoder_context
            .open_as(codec)
            .map_err(|error| ReframeError::AudioEncodeError(error.to_string()))?;

        // Only the sample format changes.
        let resampler = ResamplingContext::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            output_format,
            channel_layout,
            sample_rate,
        )
        .map_err(|error| ReframeError::AudioEncodeError(error.to_string()))?;

        log::debug!(
            "Audio track in {}: stream {input_stream_index}, {sample_rate} Hz, {} channel(s)",
            path.display(),
            decoder.channels(),
        );

        Ok(Some(Self {
            input_context,
            input_stream_index,
            output_stream_index: None,
            decoder,
            encoder,
            resampler,
            encoder_time_base,
            sample_rate,
            samples_written: 0,
            sample_limit: None,
            decoded_frame: AudioFrame::empty(),
            resampled_frame: AudioFrame::empty(),
            encoded_packet: Packet::empty(),
            finished: false,
        }))
    }

    /// Stop writing once `seconds` of audio have been produced.
    pub(crate) fn limit_to(&mut self, seconds: f64) {
        self.sample_limit = Some((seconds * f64::from(self.sample_rate)).round() as i64);
    }

    /// Register the PCM stream on `output`. Must happen before the header
    /// is written.
    pub(crate) fn add_stream(&mut self, output: &mut Output) -> Result<usize, ReframeError> {
        let codec = ffmpeg_next::encoder::find(Id::PCM_S16LE).ok_or_else(|| {
            ReframeError::AudioEncodeError("pcm_s16le encoder not available".to_string())
        })?;
        let mut stream = output.add_stream(codec)?;
        stream.set_parameters(&self.encoder);
        stream.set_time_base(self.encoder_time_base);
        let index = stream.index();
        self.output_stream_index = Some(index);
        Ok(index)
    }

    /// Seconds of audio written so far.
    pub(crate) fn written_seconds(&self) -> f64 {
        self.samples_written as f64 / f64::from(self.sample_rate)
    }

    /// Transcode until at least `seconds` of audio have been written or
    /// the source runs out.
    pub(crate) fn write_until(
        &mut self,
        output: &mut Output,
        seconds: f64,
    ) -> Result<(), ReframeError> {
        while !self.finished && self.written_seconds() < seconds {
            self.step(output)?;
        }
        Ok(())
    }

    /// Transcode everything that is left and flush the encoder.
    pub(crate) fn finish(&mut self, output: &mut Output) -> Result<(), ReframeError> {
        while !self.finished {
            self.step(output)?;
        }
        Ok(())
    }

    /// Feed one packet through the chain, or flush everything at EOF.
    fn step(&mut self, output: &mut Output) -> Result<(), ReframeError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input_context) {
            Ok(()) => {
                if packet.stream() != self.input_stream_index {
                    return Ok(());
                }
                self.decoder
                    .send_packet(&packet)
                    .map_err(|error| ReframeError::AudioDecodeError(error.to_string()))?;
                self.drain_decoder(output)?;
                if self.limit_reached() {
                    self.flush_encoder(output)?;
                }
            }
            Err(FfmpegError::Eof) => {
                let _ = self.decoder.send_eof();
                self.drain_decoder(output)?;
                self.flush_encoder(output)?;
            }
            Err(error) => return Err(ReframeError::AudioDecodeError(error.to_string())),
        }
        Ok(())
    }

    fn limit_reached(&self) -> bool {
        self.sample_limit
            .is_some_and(|limit| self.samples_written >= limit)
    }

    fn drain_decoder(&mut self, output: &mut Output) -> Result<(), ReframeError> {
        while self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
            if self.limit_reached() {
                continue;
            }
            self.resample_encode_write(output)?;
        }
        Ok(())
    }

    /// Resample the current decoded frame, trim it to the sample limit,
    /// encode it, and write the resulting packets.
    fn resample_encode_write(&mut self, output: &mut Output) -> Result<(), ReframeError> {
        self.resampler
            .run(&self.decoded_frame, &mut self.resampled_frame)
            .map_err(|error| ReframeError::AudioEncodeError(error.to_string()))?;

        let mut samples = self.resampled_frame.samples() as i64;
        if let Some(limit) = self.sample_limit {
            samples = samples.min(limit - self.samples_written);
            // Trim to the limit.
            self.resampled_frame.set_samples(samples as usize);
        }
        if samples <= 0 {
            return Ok(());
        }

        self.resampled_frame.set_pts(Some(self.samples_written));
        self.samples_written += samples;

        self.encoder
            .send_frame(&self.resampled_frame)
            .map_err(|error| ReframeError::AudioEncodeError(error.to_string()))?;
        self.write_packets(output)
    }

    fn flush_encoder(&mut self, output: &mut Output) -> Result<(), ReframeError> {
        let _ = self.encoder.send_eof();
        self.write_packets(output)?;
        self.finished = true;
        Ok(())
    }

    fn write_packets(&mut self, output: &mut Output) -> Result<(), ReframeError> {
        let stream_index = self.output_stream_index.ok_or_else(|| {
            ReframeError::AudioEncodeError("audio stream was never added to the output".to_string())
        })?;
        let output_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| ReframeError::AudioEncodeError("output stream missing".to_string()))?;

        while self.encoder.receive_packet(&mut self.encoded_packet).is_ok() {
            self.encoded_packet.set_stream(stream_index);
            self.encoded_packet
                .rescale_ts(self.encoder_time_base, output_time_base);
            self.encoded_packet
                .write_interleaved(output)
                .map_err(|error| ReframeError::AudioEncodeError(error.to_string()))?;
        }
        Ok(())
    }
}

/// Write the best audio stream of `input` to `output` as a PCM s16le WAV.
///
/// Returns `Ok(false)` without creating a file when the input has no audio.
///
/// # Errors
///
/// Returns [`ReframeError::AudioDecodeError`] / [`ReframeError::AudioEncodeError`]
/// if transcoding fails, or an FFmpeg error if the WAV cannot be created.
pub fn extract_wav(input: &Path, output: &Path) -> Result<bool, ReframeError> {
    let Some(mut track) = AudioTrack::open(input)? else {
        log::debug!("No audio stream in {}", input.display());
        return Ok(false);
    };

    log::debug!("Extracting audio to {}", output.display());
    // Create the WAV muxer.
    let mut output_context = ffmpeg_next::format::output_as(&output, WAV_CONTAINER)
        .map_err(|error| ReframeError::AudioEncodeError(error.to_string()))?;
    track.add_stream(&mut output_context)?;

    output_context
        .write_header()
        .map_err(|error| ReframeError::AudioEncodeError(error.to_string()))?;
    // Transcode everything, then finalize sizes in the RIFF header.
    track.finish(&mut output_context)?;
    output_context
        .write_trailer()
        .map_err(|error| ReframeError::AudioEncodeError(error.to_string()))?;

    log::debug!("Wrote {:.3}s of audio", track.written_seconds());
    Ok(true)
}
