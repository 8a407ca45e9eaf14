use crate::ap::AccessPoint;
use crate::Monitor;
use chrono::{Local, TimeZone};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n\t<Document>\n";
const FOOTER: &str = "\t\t</Folder>\n\t</Document>\n</kml>";

/// Three KML files bucketed by security posture (open, WEP, and WPA), each
/// placing the AP at the coordinates of its strongest observation.  APs with
/// no plausible fix (|longitude| <= 1.0) are left out, and empty buckets
/// produce no file at all.
pub fn write(mon: &Monitor, stamp: &str) -> io::Result<()> {
    let base = mon.config.output_path.join(format!("airsift_map_{}", stamp));

    let mut open = Vec::new();
    let mut wep = Vec::new();
    let mut wpa = Vec::new();
    let mut aps = mon.store.aps();
    aps.sort_by_key(|ap| ap.bssid());
    for ap in aps {
        if ap.best_fix().long.abs() <= 1.0 {
            continue;
        }
        let encryption = ap.encryption();
        if encryption == "WEP" {
            wep.push(ap);
        } else if encryption.contains("WPA") {
            wpa.push(ap);
        } else {
            open.push(ap);
        }
    }

    write_bucket(&with_suffix(&base, "_open.kml"), "blue", &open)?;
    write_bucket(&with_suffix(&base, "_wep.kml"), "pink", &wep)?;
    write_bucket(&with_suffix(&base, "_wpa.kml"), "green", &wpa)?;
    Ok(())
}

fn with_suffix(base: &Path, suffix: &str) -> std::path::PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(suffix);
    std::path::PathBuf::from(name)
}

fn write_bucket(path: &Path, color: &str, aps: &[Arc<AccessPoint>]) -> io::Result<()> {
    if aps.is_empty() {
        return Ok(());
    }
    let mut out = File::create(path)?;
    out.write_all(HEADER.as_bytes())?;
    out.write_all(style(color).as_bytes())?;
    writeln!(out, "\t\t<name>{}</name>", path.display())?;
    for ap in aps {
        out.write_all(placemark(ap).as_bytes())?;
    }
    out.write_all(FOOTER.as_bytes())?;
    Ok(())
}

fn style(color: &str) -> String {
    format!(
        "\t\t<Style id=\"{color}\">\n\
         \t\t\t<IconStyle>\n\
         \t\t\t\t<Icon><href>http://maps.google.com/mapfiles/ms/icons/{color}-dot.png</href></Icon>\n\
         \t\t\t</IconStyle>\n\t\t</Style>\n\
         \t\t<Folder>\n"
    )
}

fn placemark(ap: &AccessPoint) -> String {
    let encryption = ap.encryption();
    let style = if encryption == "WEP" {
        "pink"
    } else if encryption.contains("WPA") {
        "green"
    } else {
        "blue"
    };
    let first_seen = Local
        .timestamp_opt(i64::from(ap.first_seen()), 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %I:%M:%S %p").to_string())
        .unwrap_or_default();
    let fix = ap.best_fix();
    format!(
        "\t\t\t<Placemark>\n\
         \t\t\t\t<name><![CDATA[{ssid}]]></name>\n\
         \t\t\t\t<description>\n\
         \t\t\t\t\t<![CDATA[BSSID: <b>{mac}</b><br/>RSSI: <b>{rssi}</b><br/>Channel: <b>{channel}</b><br/>Encryption: <b>{encryption}</b><br/>First Seen: <b>{first_seen}</b>]]>\n\
         \t\t\t\t</description>\n\
         \t\t\t\t<styleUrl>#{style}</styleUrl>\n\
         \t\t\t\t<Point>\n\
         \t\t\t\t\t<coordinates>{long},{lat}</coordinates>\n\
         \t\t\t\t</Point>\n\
         \t\t\t</Placemark>\n",
        ssid = ap.ssid(),
        mac = ap.bssid(),
        rssi = ap.best_signal(),
        channel = ap.channel(),
        encryption = encryption,
        first_seen = first_seen,
        style = style,
        long = fix.long,
        lat = fix.lat,
    )
}
