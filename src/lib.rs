/*!
A passive 802.11 monitor.

Frames come in from a capture file or a kismet-drone TCP stream, get
normalized into bare 802.11 bytes plus capture metadata, and flow through the
link-layer dispatcher.  Along the way the monitor learns which access points
exist, what security they advertise, which stations talk to them, and where
the signal was strongest.  A small UDP control surface exposes the live state
and triggers the wardriving exports (Wigle CSV, KML, client/probe CSVs, and a
pcap of the interesting frames).

The pieces, bottom-up:

* [`source`]: the two frame sources, normalizing radiotap/PPI/drone
  encapsulations into [`frame::Frame`]s.
* [`store`]: the concurrently-read observation store of
  [`ap::AccessPoint`]s, [`client::Client`]s, and [`probe::ProbedNetwork`]s.
* [`proto`]: the 802.11 dispatcher, the LLC/SNAP demultiplexer, and EAPOL
  key-frame recognition.
* [`crypto`]: the decrypter gateway; the WEP/WPA2 primitives themselves are
  external collaborators plugged in behind [`crypto::Decrypter`].
* [`export`] and [`control`]: the read-only consumers.

Everything shared hangs off a [`Monitor`], which the ingest thread writes and
everyone else reads.
*/

pub mod ap;
pub mod client;
pub mod config;
pub mod control;
pub mod crypto;
mod error;
pub mod export;
pub mod frame;
pub mod mac;
pub mod probe;
pub mod proto;
pub mod source;
pub mod stats;
pub mod store;

pub use error::{Error, Result};

use config::Config;
use stats::Stats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use store::Store;

/// The shared state of a running monitor.
///
/// The ingest thread performs every store write; the control thread and the
/// exporters only read.  The shutdown flag is the one cross-thread signal,
/// polled between frames on one side and between requests on the other.
pub struct Monitor {
    pub store: Store,
    pub stats: Arc<Stats>,
    pub config: Config,
    shutdown: AtomicBool,
    started: u32,
}

impl Monitor {
    pub fn new(config: Config) -> Monitor {
        Monitor {
            store: Store::new(),
            stats: Arc::new(Stats::new()),
            config,
            shutdown: AtomicBool::new(false),
            started: epoch_now(),
        }
    }

    /// Wallclock seconds at process start; stamps export filenames.
    pub fn started(&self) -> u32 {
        self.started
    }

    pub fn uptime_secs(&self) -> u32 {
        epoch_now().saturating_sub(self.started)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

fn epoch_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
