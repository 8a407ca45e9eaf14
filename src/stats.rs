use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide monotonic counters.
///
/// The ingest thread increments these as frames flow through the pipeline;
/// the control thread reads them for the overview response.  Everything is
/// increment-only, so relaxed atomics are all the synchronisation needed.
#[derive(Debug, Default)]
pub struct Stats {
    unencrypted: AtomicU32,
    wep: AtomicU32,
    wpa: AtomicU32,
    wps: AtomicU32,
    data: AtomicU32,
    encrypted: AtomicU32,
    decrypted: AtomicU32,
    failed_decrypt: AtomicU32,
    packets: AtomicU32,
    beacons: AtomicU32,
    eapol: AtomicU32,
}

macro_rules! counter {
    ($inc:ident, $get:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        pub fn $get(&self) -> u32 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl Stats {
    pub fn new() -> Stats {
        Stats::default()
    }

    counter!(inc_unencrypted, unencrypted, unencrypted);
    counter!(inc_wep, wep, wep);
    counter!(inc_wpa, wpa, wpa);
    counter!(inc_wps, wps, wps);
    counter!(inc_data, data_packets, data);
    counter!(inc_encrypted, encrypted, encrypted);
    counter!(inc_decrypted, decrypted, decrypted);
    counter!(inc_failed_decrypt, failed_decrypt, failed_decrypt);
    counter!(inc_packets, packets, packets);
    counter!(inc_beacons, beacons, beacons);
    counter!(inc_eapol, eapol, eapol);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let stats = Stats::new();
        assert_eq!(stats.packets(), 0);
        stats.inc_packets();
        stats.inc_packets();
        stats.inc_beacons();
        assert_eq!(stats.packets(), 2);
        assert_eq!(stats.beacons(), 1);
        assert_eq!(stats.eapol(), 0);
    }
}
