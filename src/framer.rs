//! Framer/Filter stage (spec.md §4.2): reframes the raw byte stream into
//! discrete URB records using length fields carried inside each header,
//! filters by bus/device/empty-data, and emits timestamped payloads.
//!
//! Grounded on the teacher's `drivers/gs_usb/frames.rs::parse_host_frame_at`
//! (parse header at cursor, derive consumed length from header fields,
//! return `None`/keep-scanning when the tail is incomplete) and on
//! `original_source/src/GCCRecorder/usb_stream_processer.py`'s
//! `BasicUsbStreamProcesser.process` (the workspace-persists-across-
//! iterations loop this stage's outer driver mirrors).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use log::{debug, error, info, trace, warn};

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::signals::Signals;
use crate::urb::{HEADER_LEN, UrbHeader};

/// A fully framed URB accepted by the filter: a timestamp and the
/// retained payload (`data_length - 1` bytes, report-ID byte dropped).
#[derive(Debug, Clone)]
pub struct FramedUrb {
    pub timestamp: f64,
    pub payload: Vec<u8>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs the framer loop: drains `shared` into a persistent workspace,
/// reframes as many complete URBs as the workspace holds, and publishes
/// accepted payloads onto `queue`.
pub fn run(
    shared: &Arc<Mutex<Vec<u8>>>,
    queue: &Arc<Mutex<VecDeque<FramedUrb>>>,
    signals: &Signals,
    config: &CaptureConfig,
) -> Result<(), CaptureError> {
    info!("framer: starting");
    let mut workspace: Vec<u8> = Vec::new();
    let mut time_start: Option<f64> = None;

    loop {
        if signals.abort() {
            info!("framer: abort observed, stopping");
            return Ok(());
        }

        let taken = {
            let mut guard = shared.lock().unwrap();
            std::mem::take(&mut *guard)
        };

        if taken.is_empty() {
            if signals.end_capture() {
                info!("framer: capture ended and buffer drained, stopping");
                signals.set_end_packet();
                return Ok(());
            }
            sleep(POLL_INTERVAL);
            continue;
        }

        workspace.extend_from_slice(&taken);

        let outcome = scan_workspace(&mut workspace, config, &mut time_start);

        if !outcome.emissions.is_empty() {
            let mut q = queue.lock().unwrap();
            q.extend(outcome.emissions);
        }

        if let Some((expected, found)) = outcome.misaligned {
            error!(
                "framer: bus_id mismatch at URB boundary (expected {expected}, found {found}), stream misaligned, aborting"
            );
            signals.set_abort();
            return Err(CaptureError::Misalignment {
                expected_bus: expected,
                found_bus: found,
            });
        }
    }
}

struct ScanOutcome {
    emissions: Vec<FramedUrb>,
    misaligned: Option<(u16, u16)>,
}

/// Advances a cursor through `workspace`, emitting complete, accepted URBs
/// and leaving any incomplete trailing record in place. Mutates
/// `time_start` on the first-ever emission (shared across calls so the
/// per-payload deadline cut persists across workspace refills).
fn scan_workspace(
    workspace: &mut Vec<u8>,
    config: &CaptureConfig,
    time_start: &mut Option<f64>,
) -> ScanOutcome {
    let mut emissions = Vec::new();
    let mut misaligned = None;
    let mut i = 0usize;

    while i < workspace.len() {
        if workspace.len() - i < HEADER_LEN {
            trace!("framer: incomplete header, waiting for more bytes");
            break;
        }

        let header = UrbHeader::parse(&workspace[i..]).expect("length checked above");

        if header.bus_id != config.bus {
            misaligned = Some((config.bus, header.bus_id));
            break;
        }

        let packet_length = header.packet_length();

        if header.data_length == 0 {
            debug!("framer: empty-data URB, skipping");
            i += packet_length;
            continue;
        }

        if workspace.len() - i < packet_length {
            trace!(
                "framer: incomplete record (have {}, need {packet_length}), waiting",
                workspace.len() - i
            );
            break;
        }

        if header.device_number != config.device {
            debug!(
                "framer: wrong device (got {}, want {}), discarding",
                header.device_number, config.device
            );
            i += packet_length;
            continue;
        }

        let timestamp = header.timestamp();

        if let Some(t0) = *time_start {
            if timestamp - t0 > config.duration_secs() {
                info!("framer: duration exceeded, discarding remaining workspace");
                break;
            }
        }

        let data_length = header.data_length as usize;
        let payload_start = i + packet_length - data_length + 1;
        let payload_end = i + packet_length;
        let payload = workspace[payload_start..payload_end].to_vec();

        if time_start.is_none() {
            *time_start = Some(timestamp);
        }

        emissions.push(FramedUrb { timestamp, payload });
        i += packet_length;
    }

    if misaligned.is_none() {
        workspace.drain(0..i);
    } else {
        warn!("framer: draining workspace up to the misaligned boundary before aborting");
        workspace.drain(0..i);
    }

    ScanOutcome {
        emissions,
        misaligned,
    }
}
