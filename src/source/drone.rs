use crate::error::{Error, Result};
use crate::frame::{Frame, GpsFix};
use crate::stats::Stats;
use bytes::Bytes;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::*;

/// Connect and per-read deadline.  A drone that goes quiet for longer than
/// this is treated as gone; the caller reconnects.
const DEADLINE: Duration = Duration::from_secs(5);

/// Command type of a frame-carrying drone message.
const CMD_PACKET: u32 = 3;

/// A kismet-drone client.
///
/// The drone wraps every message in a 12-byte envelope: sentinel bytes
/// `DE .. .. EF`, a network-order command type, and a network-order body
/// length.  Packet messages (type 3) carry a bitmap-gated radio header,
/// optionally a GPS sub-block, and finally the captured 802.11 bytes.
///
/// Any framing violation or I/O failure surfaces as an error; the ingest
/// loop responds by dropping the connection and dialing again after a pause.
pub struct DroneSource<S> {
    stream: S,
    stats: Arc<Stats>,
}

impl DroneSource<TcpStream> {
    pub fn connect(host: &str, port: u16, stats: Arc<Stats>) -> Result<DroneSource<TcpStream>> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no address")
            })?;
        info!("drone connecting to {}", addr);
        let stream = TcpStream::connect_timeout(&addr, DEADLINE)?;
        stream.set_read_timeout(Some(DEADLINE))?;
        Ok(DroneSource { stream, stats })
    }
}

impl<S: Read> DroneSource<S> {
    #[cfg(test)]
    fn from_stream(stream: S, stats: Arc<Stats>) -> DroneSource<S> {
        DroneSource { stream, stats }
    }

    fn read_block(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read envelopes until a usable packet message arrives, then decode it.
    pub fn next_frame(&mut self) -> Result<Frame> {
        let (body, bitmap, radio_offset) = loop {
            let envelope = self.read_block(12)?;
            if envelope[0] != 0xde || envelope[3] != 0xef {
                return Err(Error::LostSync);
            }
            let cmd = be_u32(&envelope, 4).unwrap();
            let body_len = be_u32(&envelope, 8).unwrap() as usize;
            let body = self.read_block(body_len)?;
            if cmd != CMD_PACKET || body.len() < 8 {
                continue;
            }
            let bitmap = be_u32(&body, 0).unwrap();
            if bitmap & 0x01 == 0 {
                // no radio header; nothing we can use
                continue;
            }
            let radio_offset = be_u32(&body, 4).unwrap() as usize + 8;
            if body.len() == 12 || radio_offset == 8 {
                // an empty packet message
                continue;
            }
            break (body, bitmap, radio_offset);
        };

        if radio_offset + 44 >= body.len() {
            return Err(Error::LostSync);
        }

        let mut frame = Frame::new(
            Bytes::copy_from_slice(&body[radio_offset + 44..]),
            be_u32(&body, radio_offset + 28).ok_or(Error::LostSync)?,
        );

        if bitmap & 0x02 != 0 {
            if let Some(68) = be_u16(&body, 38) {
                if let (Some(lat), Some(long), Some(alt)) = (
                    drone_double(&body, 46),
                    drone_double(&body, 58),
                    drone_double(&body, 70),
                ) {
                    frame.gps = Some(GpsFix { lat, long, alt });
                }
            }
        }

        if let Some(dbm) = be_u16(&body, 18) {
            frame.signal = (dbm as i16) as i8;
        }

        self.stats.inc_packets();
        trace!(
            "drone frame: {} bytes, {} dBm",
            frame.data.len(),
            frame.signal
        );
        Ok(frame)
    }
}

fn be_u16(data: &[u8], off: usize) -> Option<u16> {
    data.get(off..off + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
}

fn be_u32(data: &[u8], off: usize) -> Option<u32> {
    data.get(off..off + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Decode one of the drone's byte-swapped doubles: mantissa-low `u32`,
/// mantissa-high `u32`, exponent `u16`, and sign `u16`, each network-order,
/// reassembled into IEEE-754 bits.
fn drone_double(data: &[u8], off: usize) -> Option<f64> {
    let mantissa_low = be_u32(data, off)?;
    let mantissa_high = be_u32(data, off + 4)?;
    let exponent = be_u16(data, off + 8)?;
    let sign = be_u16(data, off + 10)?;
    let bits = (u64::from(sign & 0x1) << 63)
        | (u64::from(exponent & 0x7ff) << 52)
        | (u64::from(mantissa_high & 0xf_ffff) << 32)
        | u64::from(mantissa_low);
    Some(f64::from_bits(bits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_drone_double(value: f64) -> [u8; 12] {
        let bits = value.to_bits();
        let mut out = [0u8; 12];
        out[0..4].copy_from_slice(&((bits & 0xffff_ffff) as u32).to_be_bytes());
        out[4..8].copy_from_slice(&(((bits >> 32) & 0xf_ffff) as u32).to_be_bytes());
        out[8..10].copy_from_slice(&(((bits >> 52) & 0x7ff) as u16).to_be_bytes());
        out[10..12].copy_from_slice(&(((bits >> 63) & 0x1) as u16).to_be_bytes());
        out
    }

    fn envelope(cmd: u32, body: &[u8]) -> Vec<u8> {
        let mut out = vec![0xde, 0, 0, 0xef];
        out.extend_from_slice(&cmd.to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn packet_body(with_gps: bool, time: u32, dbm: i16, frame: &[u8]) -> Vec<u8> {
        let radio_offset = 90usize; // arbitrary, larger than the gps block
        let mut body = vec![0u8; radio_offset + 44 + frame.len()];
        let bitmap: u32 = if with_gps { 0x3 } else { 0x1 };
        body[0..4].copy_from_slice(&bitmap.to_be_bytes());
        body[4..8].copy_from_slice(&((radio_offset as u32 - 8).to_be_bytes()));
        body[18..20].copy_from_slice(&dbm.to_be_bytes());
        if with_gps {
            body[38..40].copy_from_slice(&68u16.to_be_bytes());
            body[46..58].copy_from_slice(&encode_drone_double(40.7128));
            body[58..70].copy_from_slice(&encode_drone_double(-74.006));
            body[70..82].copy_from_slice(&encode_drone_double(12.25));
        }
        body[radio_offset + 28..radio_offset + 32].copy_from_slice(&time.to_be_bytes());
        body[radio_offset + 44..].copy_from_slice(frame);
        body
    }

    #[test]
    fn double_round_trip() {
        for value in [0.0, 40.7128, -74.006, 12.25, -0.5] {
            let encoded = encode_drone_double(value);
            assert_eq!(drone_double(&encoded, 0), Some(value));
        }
    }

    #[test]
    fn decodes_a_packet_message() {
        let body = packet_body(true, 1234, -48, &[0x80, 0, 5, 5]);
        let stats = Arc::new(Stats::new());
        let mut src =
            DroneSource::from_stream(Cursor::new(envelope(3, &body)), Arc::clone(&stats));
        let frame = src.next_frame().unwrap();
        assert_eq!(frame.time, 1234);
        assert_eq!(frame.signal, -48);
        assert_eq!(&frame.data[..], &[0x80, 0, 5, 5]);
        let gps = frame.gps.unwrap();
        assert!((gps.lat - 40.7128).abs() < 1e-9);
        assert!((gps.long + 74.006).abs() < 1e-9);
        assert_eq!(stats.packets(), 1);
    }

    #[test]
    fn skips_non_packet_messages() {
        let mut wire = envelope(1, &[0u8; 16]);
        wire.extend_from_slice(&envelope(3, &packet_body(false, 99, -30, &[0x08, 2, 3, 4])));
        let mut src = DroneSource::from_stream(Cursor::new(wire), Arc::new(Stats::new()));
        let frame = src.next_frame().unwrap();
        assert_eq!(frame.time, 99);
        assert!(frame.gps.is_none());
    }

    #[test]
    fn bad_sentinel_is_a_desync() {
        let mut wire = envelope(3, &[]);
        wire[0] = 0x00;
        let mut src = DroneSource::from_stream(Cursor::new(wire), Arc::new(Stats::new()));
        assert!(matches!(src.next_frame(), Err(Error::LostSync)));
    }

    #[test]
    fn short_read_is_an_error() {
        let mut src =
            DroneSource::from_stream(Cursor::new(vec![0xde, 0, 0]), Arc::new(Stats::new()));
        assert!(matches!(src.next_frame(), Err(Error::Io(_))));
    }
}
