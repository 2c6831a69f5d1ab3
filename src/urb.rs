//! Fixed 48-byte `usbmon` "mon_bin" URB header layout (spec.md §3), and
//! the record-length arithmetic the framer needs to advance past one URB.
//!
//! Grounded on the teacher's `drivers/gs_usb/frames.rs::parse_host_frame_at`,
//! which has the same shape: read a handful of fixed-offset fields out of
//! a header at the front of a byte slice, then derive how many bytes the
//! whole record occupies from fields inside that header.

/// Size of the fixed URB header prefix.
pub const HEADER_LEN: usize = 48;
/// Extra descriptor bytes present between the header and the payload when
/// `transfer_type == 0` (isochronous).
pub const ISO_DESCRIPTOR_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrbHeader {
    pub transfer_type: u8,
    pub device_number: u8,
    pub bus_id: u16,
    pub ts_sec: i64,
    pub ts_usec: u32,
    pub data_length: u32,
}

impl UrbHeader {
    /// Parses the 48-byte header at the front of `bytes`.
    ///
    /// Returns `None` if fewer than [`HEADER_LEN`] bytes are available; the
    /// caller should treat that as "wait for more data," not an error.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let transfer_type = bytes[9];
        let device_number = bytes[11];
        let bus_id = u16::from_le_bytes(bytes[12..14].try_into().unwrap());
        let ts_sec = i64::from_le_bytes(bytes[16..24].try_into().unwrap());
        let ts_usec = u32::from_le_bytes(bytes[24..28].try_into().unwrap());
        let data_length = u32::from_le_bytes(bytes[36..40].try_into().unwrap());

        Some(UrbHeader {
            transfer_type,
            device_number,
            bus_id,
            ts_sec,
            ts_usec,
            data_length,
        })
    }

    /// `ts_sec + ts_usec * 1e-6`, as a real number of seconds.
    pub fn timestamp(&self) -> f64 {
        self.ts_sec as f64 + (self.ts_usec as f64) * 1e-6
    }

    /// Bytes of ISO descriptor following the header, if any.
    pub fn iso_descriptor_len(&self) -> usize {
        if self.transfer_type == 0 {
            ISO_DESCRIPTOR_LEN
        } else {
            0
        }
    }

    /// Total size of this record: header + optional ISO descriptor + payload.
    pub fn packet_length(&self) -> usize {
        HEADER_LEN + self.iso_descriptor_len() + self.data_length as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_header(
        transfer_type: u8,
        device_number: u8,
        bus_id: u16,
        ts_sec: i64,
        ts_usec: u32,
        data_length: u32,
    ) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_LEN];
        h[0..8].copy_from_slice(&0u64.to_le_bytes()); // id, unused
        h[8] = 3; // urb_type, unused by core
        h[9] = transfer_type;
        h[10] = 0; // endpoint, unused
        h[11] = device_number;
        h[12..14].copy_from_slice(&bus_id.to_le_bytes());
        h[14] = 0; // setup_flag
        h[15] = 0; // data_flag
        h[16..24].copy_from_slice(&ts_sec.to_le_bytes());
        h[24..28].copy_from_slice(&ts_usec.to_le_bytes());
        h[28..32].copy_from_slice(&0u32.to_le_bytes()); // status
        h[32..36].copy_from_slice(&0u32.to_le_bytes()); // length_urb
        h[36..40].copy_from_slice(&data_length.to_le_bytes());
        h[40..48].copy_from_slice(&0u64.to_le_bytes()); // trailer
        h
    }

    #[test]
    fn parses_header_fields() {
        let bytes = build_header(1, 7, 3, 100, 500_000, 37);
        let h = UrbHeader::parse(&bytes).unwrap();
        assert_eq!(h.transfer_type, 1);
        assert_eq!(h.device_number, 7);
        assert_eq!(h.bus_id, 3);
        assert_eq!(h.data_length, 37);
        assert!((h.timestamp() - 100.5).abs() < 1e-9);
        assert_eq!(h.packet_length(), HEADER_LEN + 37);
    }

    #[test]
    fn iso_transfer_adds_descriptor_bytes() {
        let bytes = build_header(0, 7, 3, 100, 500_000, 37);
        let h = UrbHeader::parse(&bytes).unwrap();
        assert_eq!(h.iso_descriptor_len(), ISO_DESCRIPTOR_LEN);
        assert_eq!(h.packet_length(), HEADER_LEN + ISO_DESCRIPTOR_LEN + 37);
    }

    #[test]
    fn too_short_returns_none() {
        assert!(UrbHeader::parse(&[0u8; HEADER_LEN - 1]).is_none());
    }
}
