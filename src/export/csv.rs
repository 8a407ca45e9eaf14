use crate::mac::Mac;
use crate::Monitor;
use ::csv::WriterBuilder;
use std::io;

/// One row per observed station: who it is, who it talks to, and where its
/// signal peaked.
pub fn write_clients(mon: &Monitor, stamp: &str) -> io::Result<()> {
    let path = mon
        .config
        .output_path
        .join(format!("airsift_clients_{}.csv", stamp));
    let mut out = WriterBuilder::new().from_path(&path)?;

    out.write_record(["MAC", "BSSID", "RSSI", "Lat", "Long", "FirstSeen", "LastSeen"])?;
    let mut clients = mon.store.clients();
    clients.sort_by_key(|client| client.mac());
    for client in clients {
        let fix = client.best_fix();
        out.write_record([
            client.mac().to_string(),
            client.associated().to_string(),
            client.best_signal().to_string(),
            fix.lat.to_string(),
            fix.long.to_string(),
            client.first_seen().to_string(),
            client.last_seen().to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Every SSID somebody probed for, with the number of distinct probers.
pub fn write_probes(mon: &Monitor, stamp: &str) -> io::Result<()> {
    let path = mon
        .config
        .output_path
        .join(format!("airsift_probes_{}.csv", stamp));
    let mut out = WriterBuilder::new().from_path(&path)?;

    out.write_record(["Probe", "Count"])?;
    for (ssid, count) in mon.store.probes() {
        out.write_record([ssid, count.to_string()])?;
    }
    out.flush()?;
    Ok(())
}

/// Client counts per AP.  The all-zero MAC is an artefact of ad-hoc frames
/// and gets skipped.
pub fn write_ap_clients(mon: &Monitor, stamp: &str) -> io::Result<()> {
    let path = mon
        .config
        .output_path
        .join(format!("airsift_ap_clients_{}.csv", stamp));
    let mut out = WriterBuilder::new().flexible(true).from_path(&path)?;

    out.write_record(["Clients", "SSID", "MAC", ""])?;
    let mut aps = mon.store.aps();
    aps.sort_by_key(|ap| ap.bssid());
    for ap in aps {
        if ap.bssid() == Mac::ZERO {
            continue;
        }
        let ssid = ap.ssid();
        let ssid = if ssid == "<Unknown>" { String::new() } else { ssid };
        out.write_record([ap.client_count().to_string(), ssid, ap.bssid().to_string()])?;
    }
    out.flush()?;
    Ok(())
}
