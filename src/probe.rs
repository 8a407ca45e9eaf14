use crate::mac::Mac;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// An SSID somebody probed for, along with everyone who asked.
#[derive(Debug, Default)]
pub struct ProbedNetwork {
    clients: Mutex<BTreeSet<Mac>>,
}

impl ProbedNetwork {
    pub fn add_client(&self, mac: Mac) {
        self.clients.lock().unwrap().insert(mac);
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    pub fn clients(&self) -> Vec<Mac> {
        self.clients.lock().unwrap().iter().copied().collect()
    }
}
