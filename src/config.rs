//! Immutable capture parameters shared by every pipeline stage.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parameters for one capture run, built once by the CLI layer and handed
/// to [`crate::pipeline::run_capture`] by reference. No stage mutates it.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// USB bus number the adapter is attached to; selects `/dev/usbmon<bus>`.
    pub bus: u16,
    /// Device number on that bus the adapter enumerated as.
    pub device: u8,
    /// Adapter port to decode and record, 1-4.
    pub player_port: u8,
    /// CSV output path.
    pub output_path: PathBuf,
    /// Capture duration in seconds, measured independently by the reader
    /// (wall clock) and the framer (payload timestamps); see spec.md §9
    /// open question 2.
    pub duration: Duration,
}

impl CaptureConfig {
    pub fn new(
        bus: u16,
        device: u8,
        player_port: u8,
        output_path: impl Into<PathBuf>,
        duration_secs: f64,
    ) -> Self {
        Self {
            bus,
            device,
            player_port,
            output_path: output_path.into(),
            duration: Duration::from_secs_f64(duration_secs),
        }
    }

    /// Path of the `usbmon` character device for this config's bus.
    pub fn usbmon_path(&self) -> PathBuf {
        Path::new("/dev").join(format!("usbmon{}", self.bus))
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
