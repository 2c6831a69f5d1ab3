//! One-shot latching booleans coordinating the three pipeline stages
//! (spec.md §5). Each flag is set by exactly one stage and observed by
//! the others; `Ordering::Relaxed` is sufficient since these carry no
//! payload, matching the ordering the teacher uses for its own
//! cross-thread flags (`pad_pkts: Arc<AtomicBool>` in
//! `drivers/gs_usb/driver.rs`).

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct Signals {
    /// Set by the reader when its wall-clock deadline elapses or it hits EOF.
    end_capture: AtomicBool,
    /// Set by the framer once `end_capture` is observed and its input is drained.
    end_packet: AtomicBool,
    /// Set by any stage on unrecoverable failure; a one-way latch.
    abort: AtomicBool,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn end_capture(&self) -> bool {
        self.end_capture.load(Ordering::Relaxed)
    }

    pub fn set_end_capture(&self) {
        self.end_capture.store(true, Ordering::Relaxed);
    }

    pub fn end_packet(&self) -> bool {
        self.end_packet.load(Ordering::Relaxed)
    }

    pub fn set_end_packet(&self) {
        self.end_packet.store(true, Ordering::Relaxed);
    }

    pub fn abort(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    pub fn set_abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }
}
