//! Progress reporting integration tests.

mod common;

use std::sync::{Arc, Mutex};

use reframe::{
    DecodeOptions, EncodeOptions, OperationType, ProgressCallback, ProgressInfo, decode_video,
    encode_video,
};

#[derive(Default)]
struct Recorder {
    reports: Mutex<Vec<(OperationType, u64, Option<u64>)>>,
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((info.operation, info.current, info.total));
        }
    }
}

#[test]
fn encode_and_decode_report_every_frame() {
    if !common::lossless_encoder_available() {
        return;
    }
    let workspace = tempfile::tempdir().expect("tempdir");
    let frames = workspace.path().join("frames");
    std::fs::create_dir(&frames).expect("mkdir");
    common::write_frames(&frames, 6);
    common::write_metadata(&frames, 3.0, 6, 2.0);

    let recorder = Arc::new(Recorder::default());
    let video = workspace.path().join("progress.mkv");
    let options = EncodeOptions::new()
        .with_progress(recorder.clone())
        .with_batch_size(2);
    encode_video(&frames, &video, &options).expect("encode");

    let encode_reports = recorder.reports.lock().expect("lock").clone();
    assert!(encode_reports.iter().all(|(operation, _, total)| {
        *operation == OperationType::Encoding && *total == Some(6)
    }));
    let currents: Vec<u64> = encode_reports.iter().map(|(_, current, _)| *current).collect();
    assert_eq!(currents, vec![2, 4, 6, 6]);

    let recorder = Arc::new(Recorder::default());
    let options = DecodeOptions::new().with_progress(recorder.clone());
    decode_video(&video, workspace.path().join("decoded"), &options).expect("decode");

    let decode_reports = recorder.reports.lock().expect("lock").clone();
    let last = decode_reports.last().expect("at least one report");
    assert_eq!(last.0, OperationType::Decoding);
    assert_eq!(last.1, 6);
}
