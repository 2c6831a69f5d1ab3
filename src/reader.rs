//! Reader stage (spec.md §4.1): pulls raw bytes off a byte source and
//! appends them to the shared byte buffer, tracking a wall-clock deadline.
//!
//! Grounded on `original_source/src/GCCRecorder/usb_stream_reader.py`'s
//! `BasicUsbStreamReader.read`, which opens the `usbmon` file inside the
//! read thread itself and catches `PermissionError` there; translated to
//! Rust as a generic function over any `Read` so it can be driven by a
//! real character device in production and an in-memory `Cursor` in tests.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::error::CaptureError;
use crate::signals::Signals;

/// Size of each read, matching `io.DEFAULT_BUFFER_SIZE` in the original.
const READ_BLOCK_SIZE: usize = 8192;

/// Runs the reader loop, appending blocks read from `source` onto `shared`
/// until `abort`, `end_capture`, or EOF. Never sets `end_packet` (that is
/// the framer's signal to raise, per spec.md §5).
pub fn run(
    mut source: impl Read,
    shared: &Arc<Mutex<Vec<u8>>>,
    signals: &Signals,
    duration: Duration,
) -> Result<(), CaptureError> {
    info!("reader: starting capture (duration={duration:?})");
    let start = Instant::now();
    let mut block = vec![0u8; READ_BLOCK_SIZE];

    loop {
        if signals.abort() {
            info!("reader: abort observed, stopping");
            return Ok(());
        }
        if signals.end_capture() {
            info!("reader: end_capture already set, stopping");
            return Ok(());
        }

        let n = match source.read(&mut block) {
            Ok(0) => {
                info!("reader: source EOF, stopping");
                signals.set_end_capture();
                return Ok(());
            }
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("reader: I/O failure, aborting: {e}");
                signals.set_abort();
                return Err(CaptureError::from(e));
            }
        };

        debug!("reader: read {n} bytes");
        {
            let mut guard = shared.lock().unwrap();
            guard.extend_from_slice(&block[..n]);
        }

        if start.elapsed() > duration {
            info!("reader: duration exceeded, stopping capture");
            signals.set_end_capture();
            return Ok(());
        }
    }
}

/// Opens the configured `usbmon` device, mapping a permission failure to
/// [`CaptureError::PermissionDenied`] (spec.md §4.1's fatal-on-open rule).
pub fn open_usbmon_device(path: &std::path::Path) -> Result<std::fs::File, CaptureError> {
    std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            CaptureError::PermissionDenied(e)
        } else {
            CaptureError::Io(e)
        }
    })
}
