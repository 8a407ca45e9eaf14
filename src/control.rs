use crate::export;
use crate::mac::Mac;
use crate::Monitor;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::*;

/// The UI polls us here.
pub const CONTROL_PORT: u16 = 1270;

/// "Recent" for the live listings, in seconds of packet time.
const RECENT_WINDOW: u32 = 30;

/// Serve control requests until shutdown.
///
/// The protocol is a line of ASCII per datagram: single-letter commands, two
/// of which carry a printable MAC.  Responses are newline-terminated text;
/// the listing and detail responses end with an extra blank line.  Receive
/// timeouts are just the shutdown poll coming around.
pub fn run(mon: &Monitor) -> io::Result<()> {
    let sock = UdpSocket::bind(("0.0.0.0", CONTROL_PORT))?;
    serve(mon, sock)
}

pub fn serve(mon: &Monitor, sock: UdpSocket) -> io::Result<()> {
    sock.set_read_timeout(Some(Duration::from_secs(1)))?;
    let mut buf = [0u8; 128];
    while !mon.shutdown_requested() {
        let (len, peer) = match sock.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => {
                // a dead control socket leaves no way to stop us later
                mon.request_shutdown();
                return Err(e);
            }
        };
        dispatch(mon, &sock, peer, &buf[..len]);
    }
    Ok(())
}

fn dispatch(mon: &Monitor, sock: &UdpSocket, peer: SocketAddr, request: &[u8]) {
    match (request.first(), request.len()) {
        (Some(b's'), 2) => {
            info!("shutdown requested over the control socket");
            mon.request_shutdown();
        }
        (Some(b'o'), 2) => reply(sock, peer, &overview(mon)),
        (Some(b'l'), 2) => reply(sock, peer, &ap_listing(mon)),
        (Some(b'c'), 2) => reply(sock, peer, &client_listing(mon)),
        (Some(b'r'), 19) => {
            if let Some(response) = ap_detail(mon, &request[1..18]) {
                reply(sock, peer, &response);
            }
        }
        (Some(b'c'), 19) => {
            if let Some(response) = client_detail(mon, &request[1..18]) {
                reply(sock, peer, &response);
            }
        }
        (Some(b'f'), 2) => export::flush_all(mon),
        _ => {}
    }
}

fn reply(sock: &UdpSocket, peer: SocketAddr, response: &str) {
    // nothing useful to do about a failed response
    let _ = sock.send_to(response.as_bytes(), peer);
}

/// `uptime,total,unenc,wep,wpa,packets,beacons,data,enc,eapol`
fn overview(mon: &Monitor) -> String {
    let stats = &mon.stats;
    let total = stats.unencrypted() + stats.wep() + stats.wpa();
    format!(
        "{},{},{},{},{},{},{},{},{},{}\n",
        mon.uptime_secs(),
        total,
        stats.unencrypted(),
        stats.wep(),
        stats.wpa(),
        stats.packets(),
        stats.beacons(),
        stats.data_packets(),
        stats.encrypted(),
        stats.eapol(),
    )
}

fn ap_listing(mon: &Monitor) -> String {
    let mut out = String::new();
    for ap in mon.store.recent_aps(RECENT_WINDOW) {
        out.push_str(&format!("{},{}\n", ap.ssid(), ap.bssid()));
    }
    out.push('\n');
    if out.len() == 1 {
        out.push('\n');
    }
    out
}

fn client_listing(mon: &Monitor) -> String {
    let mut out = String::new();
    for client in mon.store.recent_clients(RECENT_WINDOW) {
        out.push_str(&format!("{}\n", client.mac()));
    }
    out.push('\n');
    if out.len() == 1 {
        out.push('\n');
    }
    out
}

fn parse_mac(raw: &[u8]) -> Option<Mac> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

fn ap_detail(mon: &Monitor, raw_mac: &[u8]) -> Option<String> {
    let ap = mon.store.lookup_ap(parse_mac(raw_mac)?)?;
    Some(format!(
        "{},{},{},{}\n\n",
        ap.channel(),
        ap.encryption(),
        ap.last_signal(),
        ap.client_count(),
    ))
}

fn client_detail(mon: &Monitor, raw_mac: &[u8]) -> Option<String> {
    let client = mon.store.lookup_client(parse_mac(raw_mac)?)?;
    Some(format!(
        "{},{},\n\n",
        client.last_signal(),
        client.associated(),
    ))
}
