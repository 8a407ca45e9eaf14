/*! Frame sources.

Both sources hand the pipeline the same thing: a [`Frame`](crate::frame::Frame)
holding bare 802.11 bytes plus capture metadata (timestamp, RSSI, optional GPS
fix).  The file source replays classic libpcap captures; the drone source is a
TCP client speaking the kismet-drone protocol.
*/

mod drone;
mod file;

pub use self::drone::DroneSource;
pub use self::file::{CaptureFile, LinkType};
