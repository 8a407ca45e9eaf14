use crate::error::{Error, Result};
use crate::frame::{Frame, GpsFix};
use crate::stats::Stats;
use bytes::Bytes;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::*;

/// The link-layer encapsulations we can unwrap.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LinkType {
    /// Bare 802.11 frames (DLT 105).
    Ieee80211,
    /// 802.11 behind a radiotap header (DLT 127).
    Radiotap,
    /// 802.11 behind a PPI header (DLT 192).
    Ppi,
}

impl LinkType {
    fn from_u32(code: u32) -> Option<LinkType> {
        match code {
            105 => Some(LinkType::Ieee80211),
            127 => Some(LinkType::Radiotap),
            192 => Some(LinkType::Ppi),
            _ => None,
        }
    }
}

/// Reads frames out of a classic libpcap capture.
///
/// Only little-endian captures are accepted.  Records whose encapsulation
/// cannot be fully parsed are dropped (the packet counter still ticks) and
/// reading continues with the next record.
#[derive(Debug)]
pub struct CaptureFile<R> {
    rdr: R,
    link: LinkType,
    stats: Arc<Stats>,
}

impl CaptureFile<BufReader<File>> {
    pub fn open(path: &Path, stats: Arc<Stats>) -> Result<CaptureFile<BufReader<File>>> {
        CaptureFile::new(BufReader::new(File::open(path)?), stats)
    }
}

impl<R: Read> CaptureFile<R> {
    pub fn new(mut rdr: R, stats: Arc<Stats>) -> Result<CaptureFile<R>> {
        let mut header = [0u8; 24];
        rdr.read_exact(&mut header)
            .map_err(|_| Error::TruncatedHeader)?;
        let magic = [header[0], header[1], header[2], header[3]];
        if u32::from_le_bytes(magic) != 0xa1b2_c3d4 {
            return Err(Error::BadMagic(magic));
        }
        let network = u32::from_le_bytes([header[20], header[21], header[22], header[23]]);
        let link = LinkType::from_u32(network).ok_or(Error::UnsupportedLinkType(network))?;
        debug!("capture opened, link type {:?}", link);
        Ok(CaptureFile { rdr, link, stats })
    }

    pub fn link_type(&self) -> LinkType {
        self.link
    }

    /// The next decodable frame, or `None` at end of file.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            let mut header = [0u8; 16];
            if !read_fully(&mut self.rdr, &mut header)? {
                return Ok(None);
            }
            let ts_sec = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let incl_len =
                u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
            self.stats.inc_packets();

            let mut data = vec![0u8; incl_len];
            if !read_fully(&mut self.rdr, &mut data)? {
                return Ok(None);
            }
            if incl_len < 4 {
                continue;
            }

            let data = Bytes::from(data);
            let mut frame = Frame::new(Bytes::new(), ts_sec);
            let decapped = match self.link {
                LinkType::Ieee80211 => {
                    frame.data = data;
                    true
                }
                LinkType::Radiotap => decap_radiotap(&data, &mut frame),
                LinkType::Ppi => decap_ppi(&data, &mut frame),
            };
            if decapped {
                return Ok(Some(frame));
            }
            trace!("dropping undecodable {:?} record", self.link);
        }
    }
}

/// Like `read_exact`, but a clean EOF before any byte was read (or a
/// truncated tail) reports `false` rather than an error.
fn read_fully<R: Read>(rdr: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match rdr.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

fn le_u16(data: &[u8], off: usize) -> Option<u16> {
    data.get(off..off + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn le_u32(data: &[u8], off: usize) -> Option<u32> {
    data.get(off..off + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Strip a radiotap header, picking out the antenna signal and the
/// FCS-at-end flag on the way past.
///
/// Only the first present word's fixed-order fields are walked: TSFT (8),
/// flags (1), rate (1), channel (4), FHSS (2), antenna signal (1).  That is
/// as deep as the RSSI sits, so nothing further matters here.
fn decap_radiotap(data: &Bytes, frame: &mut Frame) -> bool {
    if data.len() < 8 || data[0] != 0 {
        return false;
    }
    let hdr_len = match le_u16(data, 2) {
        Some(len) => len as usize,
        None => return false,
    };
    if data.len() < hdr_len {
        return false;
    }
    let present = match le_u32(data, 4) {
        Some(p) => p,
        None => return false,
    };

    let mut off = 8usize;
    let mut has_fcs = false;
    if present & 0x01 != 0 {
        off += 8; // TSFT
    }
    if present & 0x02 != 0 {
        match data.get(off) {
            Some(flags) => has_fcs = flags & 0x10 != 0,
            None => return false,
        }
        off += 1;
    }
    if present & 0x04 != 0 {
        off += 1; // rate
    }
    if present & 0x08 != 0 {
        off += 4; // channel frequency / type
    }
    if present & 0x10 != 0 {
        off += 2; // FHSS
    }
    if present & 0x20 != 0 {
        match data.get(off) {
            Some(&signal) => frame.signal = signal as i8,
            None => return false,
        }
    }

    let mut payload_len = data.len() - hdr_len;
    if has_fcs {
        payload_len = match payload_len.checked_sub(4) {
            Some(len) => len,
            None => return false,
        };
    }
    frame.data = data.slice(hdr_len..hdr_len + payload_len);
    true
}

const PPI_FIELD_GPS: u16 = 0x7532;
const PPI_FIELD_80211_COMMON: u16 = 0x0002;
const PPI_GPS_PRESENT_LAT_LON_ALT: u32 = 0x2000_000e;

fn fixed_3_7(raw: u32) -> f64 {
    (i64::from(raw) - 180 * 10_000_000) as f64 / 10_000_000.0
}

fn fixed_6_4(raw: u32) -> f64 {
    (i64::from(raw) - 180_000 * 10_000) as f64 / 10_000.0
}

/// Strip a PPI header.  Two field types matter: the geolocation tag
/// (lat/long in 3.7 fixed-point, altitude in 6.4) and the 802.11-common tag
/// (dBm antenna signal at offset 18 of the field data).
fn decap_ppi(data: &Bytes, frame: &mut Frame) -> bool {
    if data.len() < 8 || data[0] != 0 {
        return false;
    }
    let pph_len = match le_u16(data, 2) {
        Some(len) => len as usize,
        None => return false,
    };
    match le_u32(data, 4) {
        Some(105) => {}
        _ => return false,
    }
    if data.len() < pph_len {
        return false;
    }

    let mut fh_off = 8usize;
    if let Some(PPI_FIELD_GPS) = le_u16(data, fh_off) {
        let datalen = match le_u16(data, fh_off + 2) {
            Some(len) => len,
            None => return false,
        };
        let gps_off = fh_off + 4;
        if let (Some(gps_len), Some(present)) = (le_u16(data, gps_off + 2), le_u32(data, gps_off + 4))
        {
            if gps_len == datalen && present == PPI_GPS_PRESENT_LAT_LON_ALT {
                if let (Some(lat), Some(long), Some(alt)) = (
                    le_u32(data, gps_off + 8),
                    le_u32(data, gps_off + 12),
                    le_u32(data, gps_off + 16),
                ) {
                    frame.gps = Some(GpsFix {
                        lat: fixed_3_7(lat),
                        long: fixed_3_7(long),
                        alt: fixed_6_4(alt),
                    });
                    // the 802.11-common field follows the geolocation data
                    fh_off = gps_off + gps_len as usize;
                }
            }
        }
    }

    if let Some(PPI_FIELD_80211_COMMON) = le_u16(data, fh_off) {
        if let Some(&rssi) = data.get(fh_off + 4 + 18) {
            frame.signal = rssi as i8;
        }
    }

    frame.data = data.slice(pph_len..);
    true
}
