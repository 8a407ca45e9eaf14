use crate::frame::GpsFix;
use crate::mac::Mac;
use std::sync::atomic::{AtomicI8, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

/// An observed station.  Stations are only created when a data or
/// association exchange ties them to traffic; probe requests alone never
/// allocate one.
#[derive(Debug)]
pub struct Client {
    mac: Mac,
    first_seen: AtomicU32,
    last_seen: AtomicU32,
    last_signal: AtomicI8,
    best_signal: AtomicI8,
    /// BSSID of the AP this station associated with; 0 until known, and
    /// write-once after that.
    associated: AtomicU64,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_fix: GpsFix,
    best_fix: GpsFix,
}

impl Client {
    pub fn new(mac: Mac) -> Client {
        Client {
            mac,
            first_seen: AtomicU32::new(0),
            last_seen: AtomicU32::new(0),
            last_signal: AtomicI8::new(0),
            best_signal: AtomicI8::new(-100),
            associated: AtomicU64::new(0),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn mac(&self) -> Mac {
        self.mac
    }

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

    /// Same tracking rule as the AP: ignore RSSI-less samples, keep the fix
    /// seen at the strongest sample.
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

    /// Bind this station to an AP.  Only the first non-zero binding sticks;
    /// returns whether this call was the one that bound it, so the caller can
    /// count the association exactly once.
    pub fn bind(&self, bssid: Mac) -> bool {
        self.associated
            .compare_exchange(0, bssid.as_u64(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn associated(&self) -> Mac {
        Mac::from_u64(self.associated.load(Ordering::Acquire))
    }
}
