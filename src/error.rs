//! Error taxonomy for the capture pipeline (spec.md §7).
//!
//! `IncompleteRecord` and `FilteredPacket` are deliberately absent here:
//! both are locally handled control flow inside the framer and never
//! escape it. Everything that does escape is fatal and latches `abort`.

use std::fmt;

#[derive(Debug)]
pub enum CaptureError {
    /// Opening the `usbmon` character device failed with a permission error.
    PermissionDenied(std::io::Error),
    /// A URB header's `bus_id` did not match the configured bus: the byte
    /// stream has lost alignment and cannot be recovered.
    Misalignment { expected_bus: u16, found_bus: u16 },
    /// Writing a row to the output sink failed.
    OutputWriteFail(std::io::Error),
    /// Any other I/O failure reading the source or decoding a record.
    Io(std::io::Error),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied(e) => {
                write!(f, "insufficient permission to open usbmon device: {e}")
            }
            CaptureError::Misalignment {
                expected_bus,
                found_bus,
            } => write!(
                f,
                "stream misaligned: expected bus {expected_bus}, found {found_bus} at URB boundary"
            ),
            CaptureError::OutputWriteFail(e) => write!(f, "failed writing output row: {e}"),
            CaptureError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::PermissionDenied(e)
            | CaptureError::OutputWriteFail(e)
            | CaptureError::Io(e) => Some(e),
            CaptureError::Misalignment { .. } => None,
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            CaptureError::PermissionDenied(e)
        } else {
            CaptureError::Io(e)
        }
    }
}
