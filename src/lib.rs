//! Capture pipeline for the `usbmon` byte stream emitted while a GameCube
//! controller adapter is plugged into a monitored USB bus.
//!
//! Three stages, each its own thread, connected by two shared buffers and
//! three one-shot signals: [`reader`] pulls raw bytes off the `usbmon`
//! character device, [`framer`] reframes them into discrete URB payloads,
//! and [`recorder`] decodes each payload's configured port into a CSV row.
//! [`pipeline`] wires the three together.

pub mod config;
pub mod controller;
pub mod error;
pub mod framer;
pub mod pipeline;
pub mod reader;
pub mod recorder;
pub mod signals;
pub mod urb;

pub use config::CaptureConfig;
pub use error::CaptureError;
pub use pipeline::{run_capture, CaptureOutcome};
pub use signals::Signals;
