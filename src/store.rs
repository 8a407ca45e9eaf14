use crate::ap::{printable_ascii, AccessPoint};
use crate::client::Client;
use crate::frame::Frame;
use crate::mac::Mac;
use crate::probe::ProbedNetwork;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

/// The observation store: everything the monitor has learned so far.
///
/// Three reader–writer-locked maps, each holding `Arc`ed entities with their
/// own interior locks.  The ingest thread is the only writer; the control
/// thread and the exporters read through the shared locks and the per-entity
/// locks only, so a flush never stalls ingest for more than a moment.
///
/// The finders create on miss with the take-shared, drop, take-exclusive,
/// re-check dance: two callers racing on the same MAC converge on a single
/// stored entity.
#[derive(Debug, Default)]
pub struct Store {
    aps: RwLock<HashMap<Mac, Arc<AccessPoint>>>,
    clients: RwLock<HashMap<Mac, Arc<Client>>>,
    probes: RwLock<BTreeMap<String, Arc<ProbedNetwork>>>,
    /// The largest packet timestamp seen.  Recency is judged against this
    /// rather than wallclock so that replaying an old capture still yields
    /// sensible "recent" listings.
    clock: AtomicU32,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    pub fn observe_time(&self, time: u32) {
        self.clock.fetch_max(time, Ordering::Relaxed);
    }

    pub fn clock(&self) -> u32 {
        self.clock.load(Ordering::Relaxed)
    }

    /// Find or create the AP with the given BSSID, folding in this frame's
    /// timestamp and signal sample.
    pub fn find_ap(&self, bssid: Mac, frame: &Frame) -> Arc<AccessPoint> {
        let ap = match self.aps.read().unwrap().get(&bssid) {
            Some(ap) => Arc::clone(ap),
            None => {
                let mut aps = self.aps.write().unwrap();
                Arc::clone(
                    aps.entry(bssid)
                        .or_insert_with(|| Arc::new(AccessPoint::new(bssid))),
                )
            }
        };
        ap.touch(frame.time);
        ap.observe_signal(frame.signal, frame.gps);
        ap
    }

    /// Find or create the station with the given MAC.  Returns `None` for
    /// broadcast, which never names a real station.
    ///
    /// When `associated` is true and `current_ap` is present, an unbound
    /// station is bound to that AP and the AP's client count goes up exactly
    /// once for the pair.
    pub fn find_client(
        &self,
        mac: Mac,
        associated: bool,
        current_ap: Option<&Arc<AccessPoint>>,
        frame: &Frame,
    ) -> Option<Arc<Client>> {
        if mac.is_broadcast() {
            return None;
        }
        let client = match self.clients.read().unwrap().get(&mac) {
            Some(client) => Arc::clone(client),
            None => {
                let mut clients = self.clients.write().unwrap();
                Arc::clone(
                    clients
                        .entry(mac)
                        .or_insert_with(|| Arc::new(Client::new(mac))),
                )
            }
        };
        client.touch(frame.time);
        client.observe_signal(frame.signal, frame.gps);
        if associated {
            if let Some(ap) = current_ap {
                if client.bind(ap.bssid()) {
                    ap.increment_clients();
                }
            }
        }
        Some(client)
    }

    /// Read-only lookup, used by the control thread.  Never inserts.
    pub fn lookup_ap(&self, bssid: Mac) -> Option<Arc<AccessPoint>> {
        self.aps.read().unwrap().get(&bssid).cloned()
    }

    pub fn lookup_client(&self, mac: Mac) -> Option<Arc<Client>> {
        self.clients.read().unwrap().get(&mac).cloned()
    }

    /// Record a probe request.  The SSID must be at least three printable
    /// ASCII characters; anything else is quietly discarded.
    pub fn add_probe(&self, ssid: &str, mac: Mac) {
        if ssid.len() < 3 || !printable_ascii(ssid) {
            return;
        }
        if let Some(probe) = self.probes.read().unwrap().get(ssid) {
            probe.add_client(mac);
            return;
        }
        let mut probes = self.probes.write().unwrap();
        probes
            .entry(ssid.to_string())
            .or_insert_with(|| Arc::new(ProbedNetwork::default()))
            .add_client(mac);
    }

    /// APs seen within the last `seconds` of packet time, most recent first.
    pub fn recent_aps(&self, seconds: u32) -> Vec<Arc<AccessPoint>> {
        let cutoff = self.clock().saturating_sub(seconds);
        let mut recent: Vec<Arc<AccessPoint>> = self
            .aps
            .read()
            .unwrap()
            .values()
            .filter(|ap| ap.last_seen() >= cutoff)
            .cloned()
            .collect();
        recent.sort_by_key(|ap| std::cmp::Reverse(ap.last_seen()));
        recent
    }

    pub fn recent_clients(&self, seconds: u32) -> Vec<Arc<Client>> {
        let cutoff = self.clock().saturating_sub(seconds);
        let mut recent: Vec<Arc<Client>> = self
            .clients
            .read()
            .unwrap()
            .values()
            .filter(|client| client.last_seen() >= cutoff)
            .cloned()
            .collect();
        recent.sort_by_key(|client| std::cmp::Reverse(client.last_seen()));
        recent
    }

    /// Snapshot of every AP, for the exporters.
    pub fn aps(&self) -> Vec<Arc<AccessPoint>> {
        self.aps.read().unwrap().values().cloned().collect()
    }

    pub fn clients(&self) -> Vec<Arc<Client>> {
        self.clients.read().unwrap().values().cloned().collect()
    }

    /// Probed SSIDs with their prober counts, SSID order.
    pub fn probes(&self) -> Vec<(String, usize)> {
        self.probes
            .read()
            .unwrap()
            .iter()
            .map(|(ssid, probe)| (ssid.clone(), probe.client_count()))
            .collect()
    }

    pub fn ap_count(&self) -> usize {
        self.aps.read().unwrap().len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().unwrap().len()
    }
}
