/*! On-demand exporters.

Every exporter reads the store through shared locks only, writes a fresh file
named after the process start time, and treats I/O failure as a one-line
complaint rather than an error; losing one output must not take down the
rest, let alone ingest.
*/

mod csv;
mod kml;
mod pcap;
mod wigle;

pub use self::pcap::PcapWriter;

use crate::Monitor;
use tracing::*;

/// Run every exporter the configuration enables.  Called for the `f` control
/// command and once more at shutdown.
pub fn flush_all(mon: &Monitor) {
    let stamp = mon.started().to_string();
    let outputs = &mon.config.outputs;
    if outputs.wigle {
        if let Err(e) = wigle::write(mon, &stamp) {
            warn!("wigle export failed: {}", e);
        }
    }
    if outputs.kml {
        if let Err(e) = kml::write(mon, &stamp) {
            warn!("kml export failed: {}", e);
        }
    }
    if outputs.client_csv {
        if let Err(e) = csv::write_clients(mon, &stamp) {
            warn!("client csv export failed: {}", e);
        }
    }
    if outputs.probe_csv {
        if let Err(e) = csv::write_probes(mon, &stamp) {
            warn!("probe csv export failed: {}", e);
        }
    }
    if outputs.ap_clients_csv {
        if let Err(e) = csv::write_ap_clients(mon, &stamp) {
            warn!("ap clients csv export failed: {}", e);
        }
    }
}
