use crate::config::Config;
use crate::mac::Mac;
use std::collections::HashSet;

/// A frame decrypter.  The actual WEP/WPA2 primitives are third-party
/// collaborators; the monitor only needs the one operation.
///
/// `decrypt` takes the full 802.11 frame and returns the serialized
/// plaintext frame on success.  Implementations are expected to be cheap to
/// call with frames they cannot handle, and must never block for long; a
/// slow decrypter stalls the whole ingest pipeline.
pub trait Decrypter: Send {
    fn decrypt(&self, frame: &[u8]) -> Option<Vec<u8>>;
}

/// What came of offering a frame to a decrypter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// No key registered for this AP (or no decrypter installed): the frame
    /// was never offered.
    NotAttempted,
    Failed,
    Plaintext(Vec<u8>),
}

/// Routes frames to the WEP and WPA decrypters, but only when a key was
/// configured for the AP in question.  Failures are counted by the caller,
/// never propagated.
pub struct Gateway {
    wep: Option<Box<dyn Decrypter>>,
    wpa: Option<Box<dyn Decrypter>>,
    wep_keys: HashSet<Mac>,
    wpa_ssids: HashSet<String>,
}

impl Gateway {
    pub fn new(config: &Config) -> Gateway {
        Gateway {
            wep: None,
            wpa: None,
            wep_keys: config.wep_keys.iter().map(|k| k.bssid).collect(),
            wpa_ssids: config.wpa_keys.iter().map(|k| k.ssid.clone()).collect(),
        }
    }

    pub fn set_wep_decrypter(&mut self, decrypter: Box<dyn Decrypter>) {
        self.wep = Some(decrypter);
    }

    pub fn set_wpa_decrypter(&mut self, decrypter: Box<dyn Decrypter>) {
        self.wpa = Some(decrypter);
    }

    pub fn has_wep_key(&self, bssid: Mac) -> bool {
        self.wep_keys.contains(&bssid)
    }

    pub fn has_wpa_key(&self, ssid: &str) -> bool {
        self.wpa_ssids.contains(ssid)
    }

    pub fn try_wep(&self, bssid: Mac, frame: &[u8]) -> DecryptOutcome {
        if !self.has_wep_key(bssid) {
            return DecryptOutcome::NotAttempted;
        }
        self.offer(self.wep.as_deref(), frame)
    }

    pub fn try_wpa(&self, ssid: &str, frame: &[u8]) -> DecryptOutcome {
        if !self.has_wpa_key(ssid) {
            return DecryptOutcome::NotAttempted;
        }
        self.offer(self.wpa.as_deref(), frame)
    }

    /// Show the WPA decrypter a frame for its own bookkeeping: beacons (so
    /// it can tie BSSIDs to SSIDs) and handshake traffic.  The result is
    /// discarded.
    pub fn feed_wpa(&self, ssid: &str, frame: &[u8]) {
        if !self.has_wpa_key(ssid) {
            return;
        }
        if let Some(wpa) = &self.wpa {
            let _ = wpa.decrypt(frame);
        }
    }

    fn offer(&self, decrypter: Option<&dyn Decrypter>, frame: &[u8]) -> DecryptOutcome {
        match decrypter {
            None => DecryptOutcome::NotAttempted,
            Some(d) => match d.decrypt(frame) {
                Some(plaintext) if !plaintext.is_empty() => DecryptOutcome::Plaintext(plaintext),
                _ => DecryptOutcome::Failed,
            },
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    /// A decrypter that "decrypts" by stripping a one-byte marker, for
    /// exercising the gateway paths without real crypto.
    pub struct MarkerDecrypter {
        pub marker: u8,
    }

    impl Decrypter for MarkerDecrypter {
        fn decrypt(&self, frame: &[u8]) -> Option<Vec<u8>> {
            if frame.first() == Some(&self.marker) {
                Some(frame[1..].to_vec())
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MarkerDecrypter;
    use super::*;
    use crate::config::Config;

    fn gateway_with_wpa_key() -> Gateway {
        let config = Config::parse(
            r#"
            [[keys]]
            type = "wpa"
            ssid = "HomeNet"
            passphrase = "hunter22"
            "#,
        )
        .unwrap();
        Gateway::new(&config)
    }

    #[test]
    fn no_key_means_not_attempted() {
        let mut gw = gateway_with_wpa_key();
        gw.set_wpa_decrypter(Box::new(MarkerDecrypter { marker: 0x99 }));
        assert_eq!(
            gw.try_wpa("Elsewhere", &[0x99, 1, 2]),
            DecryptOutcome::NotAttempted
        );
        assert_eq!(
            gw.try_wep("aa:bb:cc:dd:ee:ff".parse().unwrap(), &[1]),
            DecryptOutcome::NotAttempted
        );
    }

    #[test]
    fn key_without_decrypter_is_not_attempted() {
        let gw = gateway_with_wpa_key();
        assert_eq!(gw.try_wpa("HomeNet", &[1]), DecryptOutcome::NotAttempted);
    }

    #[test]
    fn success_and_failure() {
        let mut gw = gateway_with_wpa_key();
        gw.set_wpa_decrypter(Box::new(MarkerDecrypter { marker: 0x99 }));
        assert_eq!(
            gw.try_wpa("HomeNet", &[0x99, 1, 2]),
            DecryptOutcome::Plaintext(vec![1, 2])
        );
        assert_eq!(gw.try_wpa("HomeNet", &[0x00, 1, 2]), DecryptOutcome::Failed);
    }
}
