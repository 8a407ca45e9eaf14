use crate::ap::AccessPoint;
use crate::crypto::{DecryptOutcome, Gateway};
use crate::export::PcapWriter;
use crate::frame::Frame;
use crate::mac::Mac;
use crate::proto::snap;
use crate::stats::Stats;
use crate::Monitor;
use std::sync::Arc;
use tracing::*;

/// The 802.11 link layer: dispatches on frame control, keeps the observation
/// store fed, and pushes payloads down to SNAP (decrypting on the way when a
/// key is at hand).
///
/// Lives on the ingest thread.  All store writes in the process happen under
/// one of its handlers.
pub struct LinkLayer {
    gateway: Gateway,
    pcap: Option<PcapWriter>,
}

/// What the security IEs of one beacon added up to.
#[derive(Debug, Default, PartialEq, Eq)]
struct SecuritySuites {
    wpa: bool,
    wpa2: bool,
    psk: bool,
    eap: bool,
}

impl SecuritySuites {
    fn any_wpa(&self) -> bool {
        self.wpa || self.wpa2
    }

    /// `WPA`, `WPA2`, or `WPA/WPA2`, suffixed `-PSK` / `-EAP` when an AKM
    /// suite was seen (PSK wins when both appear).
    fn label(&self) -> String {
        let mut label = String::new();
        if self.wpa {
            label.push_str("WPA");
        }
        if self.wpa2 {
            if !label.is_empty() {
                label.push('/');
            }
            label.push_str("WPA2");
        }
        if !label.is_empty() {
            if self.psk {
                label.push_str("-PSK");
            } else if self.eap {
                label.push_str("-EAP");
            }
        }
        label
    }
}

fn mac_at(data: &[u8], off: usize) -> Option<Mac> {
    Mac::from_bytes(data.get(off..off + 6)?)
}

impl LinkLayer {
    pub fn new(gateway: Gateway, pcap: Option<PcapWriter>) -> LinkLayer {
        LinkLayer { gateway, pcap }
    }

    /// Feed one captured frame through the stack.
    pub fn handle_frame(&mut self, mon: &Monitor, frame: &Frame) {
        mon.store.observe_time(frame.time);
        if frame.data.len() < 8 {
            return;
        }
        match frame.data[0] {
            0x00 => self.association(mon, frame),
            0x40 => self.probe_request(mon, frame),
            // a probe response carries the same body as a beacon
            0x50 | 0x80 => self.beacon(mon, frame),
            0x08 => self.data(mon, frame, 24),
            0x88 => self.data(mon, frame, 26),
            _ => {}
        }
    }

    /// Beacons and probe responses.  The body is parsed once per AP; after
    /// that only the counter moves.
    fn beacon(&mut self, mon: &Monitor, frame: &Frame) {
        self.export_frame(frame);
        let data = &frame.data[..];
        let Some(bssid) = mac_at(data, 16) else {
            return;
        };
        let ap = mon.store.find_ap(bssid, frame);
        mon.stats.inc_beacons();
        if ap.beacon_parsed() {
            return;
        }
        if data.len() < 36 {
            return;
        }

        let capabilities = u16::from_le_bytes([data[34], data[35]]);
        if capabilities & 0x0010 != 0 {
            ap.set_encryption("WEP");
        } else {
            ap.set_encryption("None");
            mon.stats.inc_unencrypted();
        }

        let mut suites = SecuritySuites::default();
        walk_ies(&ap, &data[36..], Some(&mut suites), &mon.stats);

        // the wpa decrypter learns the ssid<->bssid pairing from beacons
        self.gateway.feed_wpa(&ap.ssid(), data);

        ap.set_beacon_parsed();

        if suites.any_wpa() {
            mon.stats.inc_wpa();
        } else if ap.encryption() == "WEP" {
            mon.stats.inc_wep();
        }
        let label = suites.label();
        if !label.is_empty() {
            ap.set_encryption(&label);
        }
        debug!("beacon parsed: {} {:?}", bssid, ap.ssid());
    }

    /// Association requests confirm the AP's SSID and channel.  No station
    /// is created here; only data traffic does that.
    fn association(&mut self, mon: &Monitor, frame: &Frame) {
        self.export_frame(frame);
        let data = &frame.data[..];
        let Some(bssid) = mac_at(data, 16) else {
            return;
        };
        let ap = mon.store.find_ap(bssid, frame);
        if data.len() < 36 {
            return;
        }
        // fixed fields are capabilities + listen interval, then the IEs
        walk_ies(&ap, &data[28..data.len() - 8], None, &mon.stats);
    }

    /// Track which SSIDs get probed for, and by whom.  Probe requests never
    /// allocate a station.
    fn probe_request(&mut self, mon: &Monitor, frame: &Frame) {
        self.export_frame(frame);
        let data = &frame.data[..];
        if data.len() <= 26 {
            return;
        }
        let Some(mac) = mac_at(data, 10) else {
            return;
        };
        if data[24] != 0 {
            return;
        }
        let len = data[25] as usize;
        if data.len() < 26 + len {
            return;
        }
        if let Ok(ssid) = std::str::from_utf8(&data[26..26 + len]) {
            mon.store.add_probe(ssid, mac);
        }
    }

    /// Data and QoS data, which differ only in header length.  The
    /// ToDS/FromDS bits decide which addresses name the AP and the station.
    fn data(&mut self, mon: &Monitor, frame: &Frame, hdr_len: usize) {
        let data = &frame.data[..];
        let (ap, llc_off) = match data[1] & 0x03 {
            0x03 => {
                // WDS: transmitter AP in address 2, station in address 4
                let Some(bssid) = mac_at(data, 10) else {
                    return;
                };
                let ap = mon.store.find_ap(bssid, frame);
                let Some(mac) = mac_at(data, 24) else {
                    return;
                };
                if mon.store.find_client(mac, true, Some(&ap), frame).is_none() {
                    return;
                }
                (ap, hdr_len + 6)
            }
            0x02 => {
                // from the AP: BSSID in address 2, original source in address 3
                let Some(bssid) = mac_at(data, 10) else {
                    return;
                };
                let ap = mon.store.find_ap(bssid, frame);
                // source == BSSID means the AP itself sent it
                if data.get(10..16) != data.get(16..22) {
                    let Some(mac) = mac_at(data, 16) else {
                        return;
                    };
                    if mon.store.find_client(mac, true, Some(&ap), frame).is_none() {
                        return;
                    }
                }
                (ap, hdr_len)
            }
            0x01 => {
                // to the AP: BSSID in address 1, transmitter in address 2
                let Some(bssid) = mac_at(data, 4) else {
                    return;
                };
                let ap = mon.store.find_ap(bssid, frame);
                let Some(mac) = mac_at(data, 10) else {
                    return;
                };
                if mon.store.find_client(mac, true, Some(&ap), frame).is_none() {
                    return;
                }
                (ap, hdr_len)
            }
            _ => {
                // ad-hoc: BSSID in address 3, transmitter in address 2
                let Some(bssid) = mac_at(data, 16) else {
                    return;
                };
                let ap = mon.store.find_ap(bssid, frame);
                let Some(mac) = mac_at(data, 10) else {
                    return;
                };
                if mon.store.find_client(mac, true, Some(&ap), frame).is_none() {
                    return;
                }
                (ap, hdr_len)
            }
        };

        ap.increment_data_frames();
        mon.stats.inc_data();

        if data.len() > llc_off {
            self.payload(mon, frame, &ap, llc_off);
        }
    }

    /// Past the 802.11 header: SNAP goes down the stack, anything else is
    /// ciphertext and gets a shot at the decrypters.
    fn payload(&mut self, mon: &Monitor, frame: &Frame, ap: &Arc<AccessPoint>, off: usize) {
        let payload = &frame.data[off..];
        if payload.starts_with(&snap::LLC_SNAP) {
            self.export_frame(frame);
            // handshake traffic is also food for the wpa decrypter
            self.gateway.feed_wpa(&ap.ssid(), &frame.data);
            snap::handle(payload, &mon.stats);
            return;
        }

        let encryption = ap.encryption();
        if encryption == "WEP" {
            mon.stats.inc_encrypted();
            let outcome = self.gateway.try_wep(ap.bssid(), &frame.data);
            self.resolve_decrypt(mon, frame, outcome);
        } else if !encryption.is_empty() {
            mon.stats.inc_encrypted();
            let outcome = self.gateway.try_wpa(&ap.ssid(), &frame.data);
            self.resolve_decrypt(mon, frame, outcome);
        } else {
            // no beacon parsed yet, so we can't even tell what this is
            self.export_frame(frame);
        }
    }

    fn resolve_decrypt(&mut self, mon: &Monitor, frame: &Frame, outcome: DecryptOutcome) {
        match outcome {
            DecryptOutcome::Plaintext(plain) => {
                mon.stats.inc_decrypted();
                self.export_bytes(frame.time, &plain);
                if plain.starts_with(&[0xaa, 0xaa, 0x03, 0x00, 0x00]) {
                    snap::handle(&plain, &mon.stats);
                }
            }
            DecryptOutcome::Failed => {
                mon.stats.inc_failed_decrypt();
                self.export_frame(frame);
            }
            DecryptOutcome::NotAttempted => self.export_frame(frame),
        }
    }

    fn export_frame(&mut self, frame: &Frame) {
        if let Some(pcap) = &mut self.pcap {
            pcap.write_frame(frame.time, &frame.data);
        }
    }

    fn export_bytes(&mut self, time: u32, data: &[u8]) {
        if let Some(pcap) = &mut self.pcap {
            pcap.write_frame(time, data);
        }
    }
}

/// Walk the tagged parameters of a management frame.
///
/// Stops as soon as the remaining bytes can't hold the advertised element.
/// `suites` is `None` for frames whose security IEs we don't care about
/// (association requests parse only SSID and channel).
fn walk_ies(
    ap: &AccessPoint,
    mut tagged: &[u8],
    mut suites: Option<&mut SecuritySuites>,
    stats: &Stats,
) {
    let mut found_ssid = false;
    while tagged.len() > 2 {
        let len = tagged[1] as usize;
        if tagged.len() < len + 2 {
            break;
        }
        let tag = tagged[0];
        let value = &tagged[2..2 + len];
        tagged = &tagged[len + 2..];

        match tag {
            0 => {
                if found_ssid {
                    continue;
                }
                found_ssid = true;
                if value.is_empty() || value[0] == 0 {
                    ap.set_ssid("<Unknown>");
                } else if let Ok(ssid) = std::str::from_utf8(value) {
                    ap.set_ssid(ssid);
                }
            }
            3 => {
                if let Some(&channel) = value.first() {
                    ap.set_channel(channel);
                }
            }
            0x30 => {
                if let Some(suites) = suites.as_deref_mut() {
                    parse_rsn(value, suites);
                }
            }
            0xdd => {
                if len > 4 && value[..3] == [0x00, 0x50, 0xf2] {
                    match value[3] {
                        1 => {
                            if let Some(suites) = suites.as_deref_mut() {
                                parse_vendor_wpa(value, suites);
                            }
                        }
                        4 => {
                            if suites.is_some() {
                                parse_wps(ap, &value[4..], stats);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

/// The RSN element: group suite, pairwise suites, AKM suites.  Any CCMP
/// pairwise suite means WPA2; an RSN without CCMP is the TKIP-era WPA.
fn parse_rsn(value: &[u8], suites: &mut SecuritySuites) {
    let len = value.len();
    if len <= 8 {
        return;
    }
    // past the version and the group cipher suite
    let pairwise = u16::from_le_bytes([value[6], value[7]]) as usize;
    if len <= 8 + pairwise * 4 {
        return;
    }
    let mut off = 8;
    let mut ccmp = false;
    for _ in 0..pairwise {
        if value[off + 3] == 0x04 {
            ccmp = true;
        }
        off += 4;
    }
    if ccmp {
        suites.wpa2 = true;
    } else {
        suites.wpa = true;
    }

    if len < off + 2 {
        return;
    }
    let akm = u16::from_le_bytes([value[off], value[off + 1]]) as usize;
    if len <= 10 + pairwise * 4 + akm * 4 {
        return;
    }
    off += 2;
    for _ in 0..akm {
        match value[off + 3] {
            0x02 => suites.psk = true,
            0x01 => suites.eap = true,
            _ => {}
        }
        off += 4;
    }
}

/// The Microsoft vendor WPA element, the same shape as RSN shifted four
/// bytes by the OUI and sub-type.
fn parse_vendor_wpa(value: &[u8], suites: &mut SecuritySuites) {
    let len = value.len();
    if len <= 12 {
        return;
    }
    suites.wpa = true;
    // past the oui, sub-type, version, and group cipher suite
    let pairwise = u16::from_le_bytes([value[10], value[11]]) as usize;
    if len <= 12 + pairwise * 4 {
        return;
    }
    let mut off = 12 + pairwise * 4;
    if len < off + 2 {
        return;
    }
    let akm = u16::from_le_bytes([value[off], value[off + 1]]) as usize;
    if len <= 14 + pairwise * 4 + akm * 4 {
        return;
    }
    off += 2;
    for _ in 0..akm {
        match value[off + 3] {
            0x02 => suites.psk = true,
            0x01 => suites.eap = true,
            _ => {}
        }
        off += 4;
    }
}

/// The WPS element: nested TLVs with 16-bit big-endian type and length.
/// Type 0x1011 is a device-name SSID fallback, 0x1044 the configured state.
fn parse_wps(ap: &AccessPoint, mut tlv: &[u8], stats: &Stats) {
    while tlv.len() > 4 {
        let ty = u16::from_be_bytes([tlv[0], tlv[1]]);
        let len = u16::from_be_bytes([tlv[2], tlv[3]]) as usize;
        tlv = &tlv[4..];
        if len > tlv.len() {
            break;
        }
        match ty {
            0x1011 => {
                if ap.ssid().is_empty() {
                    if let Ok(name) = std::str::from_utf8(&tlv[..len]) {
                        ap.set_ssid(name);
                    }
                }
            }
            0x1044 => {
                if len >= 1 && tlv[0] == 0x02 {
                    ap.set_wps();
                    stats.inc_wps();
                }
            }
            _ => {}
        }
        tlv = &tlv[len..];
    }
}
