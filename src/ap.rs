use crate::frame::GpsFix;
use crate::mac::Mac;
use std::sync::atomic::{AtomicBool, AtomicI8, AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;

/// An observed access point: usually a router, occasionally a car, doorbell,
/// or tablet.  One exists per unique BSSID and it lives until process exit.
///
/// Scalar state is atomic so the control thread can read it without
/// contending with ingest; the string and coordinate fields sit behind a
/// short-lived per-entity mutex.
#[derive(Debug)]
pub struct AccessPoint {
    bssid: Mac,
    first_seen: AtomicU32,
    last_seen: AtomicU32,
    last_signal: AtomicI8,
    best_signal: AtomicI8,
    channel: AtomicU8,
    wps: AtomicBool,
    beacon_parsed: AtomicBool,
    clients: AtomicU32,
    data_frames: AtomicU32,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    ssid: String,
    encryption: String,
    last_fix: GpsFix,
    best_fix: GpsFix,
}

/// SSIDs are accepted only when every byte is printable ASCII.
pub(crate) fn printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

impl AccessPoint {
    pub fn new(bssid: Mac) -> AccessPoint {
        AccessPoint {
            bssid,
            first_seen: AtomicU32::new(0),
            last_seen: AtomicU32::new(0),
            last_signal: AtomicI8::new(0),
            best_signal: AtomicI8::new(-100),
            channel: AtomicU8::new(0),
            wps: AtomicBool::new(false),
            beacon_parsed: AtomicBool::new(false),
            clients: AtomicU32::new(0),
            data_frames: AtomicU32::new(0),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn bssid(&self) -> Mac {
        self.bssid
    }

    /// Record that the AP was seen at `time`.  The first observation also
    /// fixes `first_seen`.
    pub fn touch(&self, time: u32) {
        if self.first_seen.load(Ordering::Relaxed) == 0 {
            self.first_seen.store(time, Ordering::Relaxed);
        }
        self.last_seen.store(time, Ordering::Release);
    }

    pub fn first_seen(&self) -> u32 {
        self.first_seen.load(Ordering::Relaxed)
    }

    pub fn last_seen(&self) -> u32 {
        self.last_seen.load(Ordering::Acquire)
    }

    /// Fold one signal sample into the last/best tracking.
    ///
    /// Samples without RSSI are ignored outright.  The "best" coordinates are
    /// wherever the signal was strongest; no triangulation, just the fix
    /// that accompanied the peak sample.  A strong sample without a fix still
    /// advances `best_signal` so a later, weaker fix doesn't masquerade as
    /// the peak.
    pub fn observe_signal(&self, signal: i8, gps: Option<GpsFix>) {
        if signal == 0 {
            return;
        }
        self.last_signal.store(signal, Ordering::Relaxed);
        match gps {
            Some(fix) => {
                let mut inner = self.inner.lock().unwrap();
                inner.last_fix = fix;
                if signal > self.best_signal.load(Ordering::Relaxed) {
                    self.best_signal.store(signal, Ordering::Relaxed);
                    inner.best_fix = fix;
                }
            }
            None => {
                if signal > self.best_signal.load(Ordering::Relaxed) {
                    self.best_signal.store(signal, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn last_signal(&self) -> i8 {
        self.last_signal.load(Ordering::Relaxed)
    }

    pub fn best_signal(&self) -> i8 {
        self.best_signal.load(Ordering::Relaxed)
    }

    pub fn last_fix(&self) -> GpsFix {
        self.inner.lock().unwrap().last_fix
    }

    pub fn best_fix(&self) -> GpsFix {
        self.inner.lock().unwrap().best_fix
    }

    /// Store the broadcast name.  Non-ASCII names are dropped on the floor.
    pub fn set_ssid(&self, ssid: &str) {
        if !printable_ascii(ssid) {
            return;
        }
        self.inner.lock().unwrap().ssid = ssid.to_string();
    }

    pub fn ssid(&self) -> String {
        self.inner.lock().unwrap().ssid.clone()
    }

    pub fn set_channel(&self, channel: u8) {
        self.channel.store(channel, Ordering::Relaxed);
    }

    pub fn channel(&self) -> u8 {
        self.channel.load(Ordering::Relaxed)
    }

    /// The composed label: empty (nothing parsed yet), `None`, `WEP`, or a
    /// WPA variant such as `WPA/WPA2-PSK`.
    pub fn set_encryption(&self, encryption: &str) {
        self.inner.lock().unwrap().encryption = encryption.to_string();
    }

    pub fn encryption(&self) -> String {
        self.inner.lock().unwrap().encryption.clone()
    }

    pub fn set_wps(&self) {
        self.wps.store(true, Ordering::Relaxed);
    }

    pub fn has_wps(&self) -> bool {
        self.wps.load(Ordering::Relaxed)
    }

    /// Count one associated client.  Deduplication happens in the store: this
    /// is only called on a station's first `0 -> bssid` binding.
    pub fn increment_clients(&self) {
        self.clients.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_count(&self) -> u32 {
        self.clients.load(Ordering::Relaxed)
    }

    pub fn increment_data_frames(&self) {
        self.data_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn data_frame_count(&self) -> u32 {
        self.data_frames.load(Ordering::Relaxed)
    }

    /// The beacon body is parsed once per AP; afterwards beacons are only
    /// counted.  Set after IE processing so a partially-parsed beacon gets
    /// another chance, and published with release ordering so anyone who
    /// observes the latch also observes the state it guards.
    pub fn set_beacon_parsed(&self) {
        self.beacon_parsed.store(true, Ordering::Release);
    }

    pub fn beacon_parsed(&self) -> bool {
        self.beacon_parsed.load(Ordering::Acquire)
    }
}
