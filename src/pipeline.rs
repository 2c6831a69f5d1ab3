//! Pipeline supervisor (spec.md §4.4): owns the shared buffers and
//! signals, starts the three stages as threads, joins them, and reports
//! success or failure.
//!
//! Grounded on `original_source/src/GCCRecorder/core.py`'s `App.main`,
//! which does the same three-`Thread`/three-`join` dance and distinguishes
//! success from abort by checking `abort_signal` once every worker has
//! returned. True OS threads are used rather than the teacher's `tokio`
//! runtime because every core I/O operation here (`read()` on a
//! character device, file writes) is naturally blocking; spec.md §5
//! explicitly allows "true parallel threads."

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Read};
use std::sync::{Arc, Mutex};
use std::thread;

use log::info;

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::framer::{self, FramedUrb};
use crate::reader;
use crate::recorder;
use crate::signals::Signals;

/// Outcome of a capture run, mirroring `original_source`'s final
/// success/failure message after joining all three threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Success { rows_written: usize },
    Aborted,
}

/// Opens the `usbmon` device and output file, then runs a full capture
/// to completion. This is the entry point the `gcc-capture` binary calls.
pub fn run_capture(config: &CaptureConfig, signals: Arc<Signals>) -> Result<CaptureOutcome, CaptureError> {
    let source = reader::open_usbmon_device(&config.usbmon_path())?;
    let sink = File::create(&config.output_path).map_err(CaptureError::OutputWriteFail)?;
    run_capture_with_io(config, signals, source, BufWriter::new(sink))
}

/// Same as [`run_capture`] but takes the byte source and output sink
/// directly, so tests can drive the pipeline against in-memory I/O
/// (spec.md §8's end-to-end scenarios).
pub fn run_capture_with_io(
    config: &CaptureConfig,
    signals: Arc<Signals>,
    source: impl Read + Send + 'static,
    sink: impl std::io::Write + Send + 'static,
) -> Result<CaptureOutcome, CaptureError> {
    let byte_buffer: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let payload_queue: Arc<Mutex<VecDeque<FramedUrb>>> = Arc::new(Mutex::new(VecDeque::new()));

    let reader_handle = {
        let byte_buffer = Arc::clone(&byte_buffer);
        let signals = Arc::clone(&signals);
        let duration = config.duration;
        thread::Builder::new()
            .name("reader".into())
            .spawn(move || reader::run(source, &byte_buffer, &signals, duration))
            .expect("spawning reader thread")
    };

    let framer_handle = {
        let byte_buffer = Arc::clone(&byte_buffer);
        let payload_queue = Arc::clone(&payload_queue);
        let signals = Arc::clone(&signals);
        let config = config.clone();
        thread::Builder::new()
            .name("framer".into())
            .spawn(move || framer::run(&byte_buffer, &payload_queue, &signals, &config))
            .expect("spawning framer thread")
    };

    let recorder_handle = {
        let payload_queue = Arc::clone(&payload_queue);
        let signals = Arc::clone(&signals);
        let config = config.clone();
        thread::Builder::new()
            .name("recorder".into())
            .spawn(move || recorder::run(&payload_queue, &signals, &config, sink))
            .expect("spawning recorder thread")
    };

    let reader_result = reader_handle.join().expect("reader thread panicked");
    let framer_result = framer_handle.join().expect("framer thread panicked");
    let recorder_result = recorder_handle.join().expect("recorder thread panicked");

    if signals.abort() {
        info!("pipeline: aborted");
        return Ok(CaptureOutcome::Aborted);
    }

    reader_result?;
    framer_result?;
    let rows_written = recorder_result?;

    info!("pipeline: capture complete, {rows_written} rows written");
    Ok(CaptureOutcome::Success { rows_written })
}
