//! End-to-end tests: synthetic captures pushed through the file source, the
//! 802.11 stack, and the observation store.

use airsift::config::Config;
use airsift::crypto::Gateway;
use airsift::export::PcapWriter;
use airsift::mac::Mac;
use airsift::proto::LinkLayer;
use airsift::source::CaptureFile;
use airsift::Monitor;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

fn pcap_bytes(link: u32, records: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0xffffu32.to_le_bytes());
    out.extend_from_slice(&link.to_le_bytes());
    for (ts, data) in records {
        out.extend_from_slice(&ts.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

/// A minimal radiotap header carrying only the antenna signal.
fn radiotap(signal: i8, frame: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8, 0];
    out.extend_from_slice(&9u16.to_le_bytes()); // header length
    out.extend_from_slice(&0x20u32.to_le_bytes()); // present: signal
    out.push(signal as u8);
    out.extend_from_slice(frame);
    out
}

fn beacon(bssid: Mac, capabilities: u16, ssid: &str, channel: u8) -> Vec<u8> {
    let mut out = vec![0x80, 0x00, 0x00, 0x00];
    out.extend_from_slice(&[0xff; 6]);
    out.extend_from_slice(&bssid.octets());
    out.extend_from_slice(&bssid.octets());
    out.extend_from_slice(&[0x00, 0x00]);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&100u16.to_le_bytes());
    out.extend_from_slice(&capabilities.to_le_bytes());
    out.push(0x00);
    out.push(ssid.len() as u8);
    out.extend_from_slice(ssid.as_bytes());
    out.extend_from_slice(&[0x03, 0x01, channel]);
    out
}

fn probe_request(sta: Mac, ssid: &str) -> Vec<u8> {
    let mut out = vec![0x40, 0x00, 0x00, 0x00];
    out.extend_from_slice(&[0xff; 6]);
    out.extend_from_slice(&sta.octets());
    out.extend_from_slice(&[0xff; 6]);
    out.extend_from_slice(&[0x00, 0x00]);
    out.push(0x00);
    out.push(ssid.len() as u8);
    out.extend_from_slice(ssid.as_bytes());
    out
}

/// A to-AP data frame wrapping an LLC/SNAP EAPOL payload.
fn data_eapol(bssid: Mac, sta: Mac) -> Vec<u8> {
    let mut out = vec![0x08, 0x01, 0x00, 0x00];
    out.extend_from_slice(&bssid.octets());
    out.extend_from_slice(&sta.octets());
    out.extend_from_slice(&[0x11; 6]);
    out.extend_from_slice(&[0x00, 0x00]);
    out.extend_from_slice(&[0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00]);
    out.extend_from_slice(&0x888eu16.to_be_bytes());
    out.extend_from_slice(&[0x01, 0x03, 0x00, 0x5f]);
    out
}

fn run_capture(mon: &Monitor, link: &mut LinkLayer, capture: Vec<u8>) {
    let mut cap = CaptureFile::new(Cursor::new(capture), Arc::clone(&mon.stats)).unwrap();
    while let Some(frame) = cap.next_frame().unwrap() {
        link.handle_frame(mon, &frame);
    }
}

fn mac(s: &str) -> Mac {
    s.parse().unwrap()
}

#[test]
fn radiotap_beacon_lands_in_the_store() {
    let mon = Monitor::new(Config::empty());
    let mut link = LinkLayer::new(Gateway::new(&mon.config), None);
    let bssid = mac("cc:cc:cc:cc:cc:02");
    let capture = pcap_bytes(
        127,
        &[(1000, radiotap(-42, &beacon(bssid, 0x0401, "Test", 6)))],
    );
    run_capture(&mon, &mut link, capture);

    let ap = mon.store.lookup_ap(bssid).expect("the AP should exist");
    assert_eq!(ap.ssid(), "Test");
    assert_eq!(ap.channel(), 6);
    assert_eq!(ap.encryption(), "None");
    assert_eq!(ap.last_signal(), -42);
    assert_eq!(ap.best_signal(), -42);
    assert_eq!(mon.stats.unencrypted(), 1);
    assert_eq!(mon.stats.beacons(), 1);
    assert_eq!(mon.stats.packets(), 1);
}

#[test]
fn replaying_the_same_beacon_is_idempotent() {
    let mon = Monitor::new(Config::empty());
    let mut link = LinkLayer::new(Gateway::new(&mon.config), None);
    let bssid = mac("cc:cc:cc:cc:cc:02");
    let frame = radiotap(-42, &beacon(bssid, 0x0401, "Test", 6));
    let capture = pcap_bytes(127, &[(1000, frame.clone()), (1001, frame)]);
    run_capture(&mon, &mut link, capture);

    let ap = mon.store.lookup_ap(bssid).unwrap();
    assert_eq!(ap.ssid(), "Test");
    assert_eq!(ap.channel(), 6);
    assert_eq!(mon.stats.beacons(), 2);
    assert_eq!(mon.stats.unencrypted(), 1);
    assert_eq!(mon.store.ap_count(), 1);
}

#[test]
fn data_frame_binds_the_station_and_counts_the_handshake() {
    let mon = Monitor::new(Config::empty());
    let mut link = LinkLayer::new(Gateway::new(&mon.config), None);
    let bssid = mac("cc:cc:cc:cc:cc:02");
    let sta = mac("aa:bb:cc:dd:ee:01");
    let capture = pcap_bytes(105, &[(2000, data_eapol(bssid, sta))]);
    run_capture(&mon, &mut link, capture);

    let ap = mon.store.lookup_ap(bssid).unwrap();
    let client = mon.store.lookup_client(sta).unwrap();
    assert_eq!(client.associated(), bssid);
    assert_eq!(ap.client_count(), 1);
    assert_eq!(mon.stats.eapol(), 1);
    assert_eq!(mon.stats.data_packets(), 1);
}

#[test]
fn probe_requests_track_networks_not_clients() {
    let mon = Monitor::new(Config::empty());
    let mut link = LinkLayer::new(Gateway::new(&mon.config), None);
    let sta = mac("dd:dd:dd:dd:dd:03");
    let capture = pcap_bytes(105, &[(1, probe_request(sta, "Home"))]);
    run_capture(&mon, &mut link, capture);

    assert_eq!(mon.store.client_count(), 0);
    assert_eq!(mon.store.probes(), vec![("Home".to_string(), 1)]);
}

#[test]
fn ap_count_matches_distinct_bssids() {
    let mon = Monitor::new(Config::empty());
    let mut link = LinkLayer::new(Gateway::new(&mon.config), None);
    let records: Vec<(u32, Vec<u8>)> = (1..=5u8)
        .map(|i| {
            let bssid = Mac::from_bytes(&[0xcc, 0, 0, 0, 0, i]).unwrap();
            (u32::from(i), beacon(bssid, 0x0401, "Net", i))
        })
        .collect();
    let capture = pcap_bytes(105, &records);
    run_capture(&mon, &mut link, capture);
    assert_eq!(mon.store.ap_count(), 5);
    assert_eq!(mon.stats.beacons(), 5);
}

#[test]
fn exported_pcap_replays_to_the_same_state() {
    let out_dir = std::env::temp_dir().join(format!("airsift-roundtrip-{}", std::process::id()));
    std::fs::create_dir_all(&out_dir).unwrap();
    let pcap_path: PathBuf = out_dir.join("interesting.pcap");

    let bssid = mac("cc:cc:cc:cc:cc:02");
    let sta = mac("aa:bb:cc:dd:ee:01");

    // first pass: raw capture through a link layer that exports a pcap
    let mon = Monitor::new(Config::empty());
    let mut link = LinkLayer::new(
        Gateway::new(&mon.config),
        Some(PcapWriter::new(pcap_path.clone())),
    );
    let capture = pcap_bytes(
        105,
        &[
            (10, beacon(bssid, 0x0401, "Test", 6)),
            (11, data_eapol(bssid, sta)),
        ],
    );
    run_capture(&mon, &mut link, capture);
    drop(link);

    // second pass: replay the export
    let replayed = Monitor::new(Config::empty());
    let mut link = LinkLayer::new(Gateway::new(&replayed.config), None);
    let mut cap = CaptureFile::open(&pcap_path, Arc::clone(&replayed.stats)).unwrap();
    while let Some(frame) = cap.next_frame().unwrap() {
        link.handle_frame(&replayed, &frame);
    }

    let original_ap = mon.store.lookup_ap(bssid).unwrap();
    let replayed_ap = replayed.store.lookup_ap(bssid).unwrap();
    assert_eq!(replayed_ap.ssid(), original_ap.ssid());
    assert_eq!(replayed_ap.channel(), original_ap.channel());
    assert_eq!(replayed_ap.encryption(), original_ap.encryption());
    assert_eq!(replayed_ap.client_count(), original_ap.client_count());
    let replayed_client = replayed.store.lookup_client(sta).unwrap();
    assert_eq!(replayed_client.associated(), bssid);
    assert_eq!(replayed.stats.eapol(), mon.stats.eapol());

    std::fs::remove_dir_all(&out_dir).unwrap();
}
