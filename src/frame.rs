use bytes::Bytes;

/// A GPS sample attached to a captured frame.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct GpsFix {
    pub lat: f64,
    pub long: f64,
    pub alt: f64,
}

/// One normalized frame as produced by a source.
///
/// `data` holds the bare 802.11 bytes with every capture encapsulation
/// (radiotap, PPI, drone framing) already stripped.  A signal of 0 means the
/// source had no RSSI for this frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Bytes,
    /// Capture timestamp, seconds since the epoch.
    pub time: u32,
    /// RSSI in dBm; 0 when absent.
    pub signal: i8,
    pub gps: Option<GpsFix>,
}

impl Frame {
    pub fn new(data: Bytes, time: u32) -> Frame {
        Frame {
            data,
            time,
            signal: 0,
            gps: None,
        }
    }
}
