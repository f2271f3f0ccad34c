//! Error handling integration tests.
//!
//! These exercise the failure paths that do not need an encoder, so they
//! run on any FFmpeg build.

mod common;

use std::fs;

use reframe::{
    DecodeOptions, EncodeOptions, GapPolicy, MediaSource, ReframeError, decode_video,
    encode_video, naming,
};

#[test]
fn missing_metadata_is_reported() {
    let directory = tempfile::tempdir().expect("tempdir");
    common::write_frames(directory.path(), 3);

    let result = encode_video(
        directory.path(),
        directory.path().join("out.mkv"),
        &EncodeOptions::default(),
    );
    match result {
        Err(ReframeError::MetadataMissing(path)) => {
            assert!(path.ends_with(naming::METADATA_FILE_NAME));
        }
        other => panic!("expected MetadataMissing, got {other:?}"),
    }
}

#[test]
fn missing_duration_is_invalid_metadata() {
    let directory = tempfile::tempdir().expect("tempdir");
    common::write_frames(directory.path(), 3);
    fs::write(
        directory.path().join(naming::METADATA_FILE_NAME),
        "[VIDEO]\nfps = 2.0\nwidth = 4\nheight = 4\nframes = 3\n",
    )
    .expect("write metadata");

    let result = encode_video(
        directory.path(),
        directory.path().join("out.mkv"),
        &EncodeOptions::default(),
    );
    match result {
        Err(ReframeError::MetadataInvalid { key, .. }) => assert_eq!(key, "duration"),
        other => panic!("expected MetadataInvalid, got {other:?}"),
    }
}

#[test]
fn metadata_without_frames_is_rejected() {
    let directory = tempfile::tempdir().expect("tempdir");
    common::write_metadata(directory.path(), 2.0, 10, 5.0);
    fs::write(directory.path().join("frame_a.png"), b"ignored").expect("write");

    let result = encode_video(
        directory.path(),
        directory.path().join("out.mkv"),
        &EncodeOptions::default(),
    );
    assert!(matches!(result, Err(ReframeError::NoFrames(_))));
}

#[test]
fn gap_is_rejected_by_default() {
    let directory = tempfile::tempdir().expect("tempdir");
    common::write_metadata(directory.path(), 2.0, 3, 1.5);
    for ordinal in [0, 1, 3] {
        common::write_image(
            directory.path(),
            &naming::frame_file_name(ordinal),
            &common::frame_image(ordinal),
        );
    }

    let result = encode_video(
        directory.path(),
        directory.path().join("out.mkv"),
        &EncodeOptions::default(),
    );
    match result {
        Err(ReframeError::FrameGap { expected, found }) => {
            assert_eq!((expected, found), (2, 3));
        }
        other => panic!("expected FrameGap, got {other:?}"),
    }
}

#[test]
fn duplicate_ordinal_is_rejected_even_when_skipping_gaps() {
    let directory = tempfile::tempdir().expect("tempdir");
    common::write_metadata(directory.path(), 2.0, 2, 1.0);
    common::write_image(directory.path(), "frame_0.png", &common::frame_image(0));
    common::write_image(directory.path(), "frame_1.png", &common::frame_image(1));
    common::write_image(directory.path(), "frame_000001.png", &common::frame_image(1));

    let options = EncodeOptions::new().with_gap_policy(GapPolicy::Skip);
    let result = encode_video(directory.path(), directory.path().join("out.mkv"), &options);
    assert!(matches!(
        result,
        Err(ReframeError::DuplicateFrame { ordinal: 1, .. })
    ));
}

#[test]
fn output_into_missing_directory_is_unwritable() {
    let directory = tempfile::tempdir().expect("tempdir");
    common::write_frames(directory.path(), 2);
    common::write_metadata(directory.path(), 2.0, 2, 1.0);

    let result = encode_video(
        directory.path(),
        directory.path().join("missing").join("out.mkv"),
        &EncodeOptions::default(),
    );
    assert!(matches!(result, Err(ReframeError::OutputUnwritable { .. })));
}

#[test]
fn open_nonexistent_video() {
    let result = MediaSource::open("this_file_does_not_exist.mp4");
    let message = result.err().expect("open should fail").to_string();
    assert!(
        message.contains("Failed to open media file"),
        "Error message should mention file open failure: {message}",
    );
}

#[test]
fn decode_garbage_file_fails_cleanly() {
    let directory = tempfile::tempdir().expect("tempdir");
    let input = directory.path().join("invalid.mp4");
    fs::write(&input, b"this is not a media file").expect("write");

    let output = directory.path().join("frames");
    let result = decode_video(&input, &output, &DecodeOptions::default());
    assert!(result.is_err(), "Expected error for invalid media file");
    assert!(!output.join(naming::METADATA_FILE_NAME).exists());
}
