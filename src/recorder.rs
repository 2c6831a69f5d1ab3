//! Decoder/Recorder stage (spec.md §4.3): slices the configured port out
//! of each framed payload, decodes it, and writes one CSV row per payload.
//!
//! Grounded on `original_source/src/GCCRecorder/usb_stream_recorder.py`'s
//! `BasicUsbStreamRecorder.record` (same swap-and-drain loop, same
//! epoch-zeroing of the first payload's timestamp, same once-per-row
//! disconnected-port warning).

use std::collections::VecDeque;
use std::io::{BufWriter, Write};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use log::{info, trace, warn};

use crate::config::CaptureConfig;
use crate::controller::{port_slice, PortInputs, CSV_HEADER};
use crate::error::CaptureError;
use crate::framer::FramedUrb;
use crate::signals::Signals;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Platform line separator for the Linux `usbmon` target, matching
/// `os.linesep` in `usb_stream_recorder.py`.
const LINE_SEP: &str = "\n";

/// Runs the recorder loop against any `Write` sink, writing the header row
/// immediately and one data row per accepted payload.
pub fn run(
    queue: &Arc<Mutex<VecDeque<FramedUrb>>>,
    signals: &Signals,
    config: &CaptureConfig,
    sink: impl Write,
) -> Result<usize, CaptureError> {
    info!(
        "recorder: recording port {} to {:?}",
        config.player_port, config.output_path
    );
    let mut sink = BufWriter::new(sink);
    write_line(&mut sink, CSV_HEADER, signals)?;

    let mut epoch: Option<f64> = None;
    let mut rows_written = 0usize;

    loop {
        if signals.abort() {
            info!("recorder: abort observed, stopping");
            flush_sink(&mut sink, signals)?;
            return Ok(rows_written);
        }

        let items = {
            let mut guard = queue.lock().unwrap();
            std::mem::take(&mut *guard)
        };

        if items.is_empty() {
            if signals.end_packet() {
                info!("recorder: no more data, stopping");
                flush_sink(&mut sink, signals)?;
                return Ok(rows_written);
            }
            sleep(POLL_INTERVAL);
            continue;
        }

        for item in items {
            let e = *epoch.get_or_insert(item.timestamp);
            let relative = round6(item.timestamp - e);

            let Some(slice) = port_slice(&item.payload, config.player_port) else {
                warn!(
                    "recorder: malformed payload (len {}), aborting",
                    item.payload.len()
                );
                signals.set_abort();
                return Err(CaptureError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "payload too short for configured player port",
                )));
            };

            let inputs = PortInputs::decode(&slice);
            if !inputs.is_connected {
                warn!("recorder: port {} is not connected", config.player_port);
            }
            trace!("recorder: row timestamp={relative}");

            write_line(&mut sink, &inputs.to_csv_row(relative), signals)?;
            rows_written += 1;
        }
    }
}

/// Writes one line followed by the line separator. Per spec.md §7,
/// `OutputWriteFail` is fatal and sets `abort` — this is the pipeline's
/// sole cancellation channel, so a failed write here must latch it before
/// propagating, exactly like the malformed-payload branch above.
fn write_line(sink: &mut impl Write, line: &str, signals: &Signals) -> Result<(), CaptureError> {
    sink.write_all(line.as_bytes())
        .and_then(|_| sink.write_all(LINE_SEP.as_bytes()))
        .map_err(|e| {
            signals.set_abort();
            CaptureError::OutputWriteFail(e)
        })
}

fn flush_sink(sink: &mut impl Write, signals: &Signals) -> Result<(), CaptureError> {
    sink.flush().map_err(|e| {
        signals.set_abort();
        CaptureError::OutputWriteFail(e)
    })
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
