use crate::Monitor;
use chrono::{Local, TimeZone};
use std::io;

/// Wigle's WigleWifi-1.4 CSV: one row per AP with its auth mode and the
/// coordinates of the strongest observation.
pub fn write(mon: &Monitor, stamp: &str) -> io::Result<()> {
    let path = mon
        .config
        .output_path
        .join(format!("airsift_wigle_{}.csv", stamp));
    let mut out = csv::WriterBuilder::new().flexible(true).from_path(&path)?;

    out.write_record(["WigleWifi-1.4"])?;
    out.write_record([
        "MAC",
        "SSID",
        "AuthMode",
        "FirstSeen",
        "Channel",
        "RSSI",
        "CurrentLatitude",
        "CurrentLongitude",
        "AltitudeMeters",
        "AccuracyMeters",
        "Type",
    ])?;

    let mut aps = mon.store.aps();
    aps.sort_by_key(|ap| ap.bssid());
    for ap in aps {
        let ssid = ap.ssid();
        let ssid = if ssid == "<Unknown>" { String::new() } else { ssid };
        let fix = ap.best_fix();
        out.write_record([
            ap.bssid().to_string(),
            ssid,
            auth_mode(&ap.encryption(), ap.has_wps()),
            first_seen(ap.first_seen()),
            ap.channel().to_string(),
            ap.best_signal().to_string(),
            fix.lat.to_string(),
            fix.long.to_string(),
            fix.alt.to_string(),
            String::new(), // no accuracy information
            "WIFI".to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

fn auth_mode(encryption: &str, wps: bool) -> String {
    let mut mode = if encryption.contains('/') {
        "[WPA-PSK][WPA2-PSK]".to_string()
    } else if encryption == "None" {
        String::new()
    } else {
        format!("[{}]", encryption)
    };
    if wps {
        mode.push_str("[WPS]");
    }
    mode
}

fn first_seen(epoch: u32) -> String {
    Local
        .timestamp_opt(i64::from(epoch), 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_modes() {
        assert_eq!(auth_mode("None", false), "");
        assert_eq!(auth_mode("WEP", false), "[WEP]");
        assert_eq!(auth_mode("WPA2-PSK", false), "[WPA2-PSK]");
        assert_eq!(auth_mode("WPA/WPA2-PSK", false), "[WPA-PSK][WPA2-PSK]");
        assert_eq!(auth_mode("WPA2-PSK", true), "[WPA2-PSK][WPS]");
        assert_eq!(auth_mode("None", true), "[WPS]");
    }
}
