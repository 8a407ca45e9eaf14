use tracing::*;

/// Minimum size of an EAPOL-Key frame body: descriptor type through key data
/// length.
const KEY_FRAME_LEN: usize = 95;

/// Examine an EAPOL payload (the bytes after the LLC/SNAP header) and report
/// whether it is a four-way-handshake key frame we recognise.
///
/// This is recognition only: nothing is validated cryptographically and no
/// handshake state is kept.  Converting captures into crackable material is a
/// job for dedicated tools downstream of the pcap export.
pub fn inspect(data: &[u8]) -> bool {
    if data.len() < 4 {
        return false;
    }
    let body_len = u16::from_be_bytes([data[2], data[3]]) as usize;
    if body_len + 4 > data.len() {
        return false;
    }
    // packet type 0 is an EAP packet, not a key exchange
    if data[1] == 0 {
        return false;
    }
    let key = &data[4..];
    if key.len() < KEY_FRAME_LEN {
        return false;
    }
    let descriptor = key[0];
    if descriptor != 1 && descriptor != 2 {
        return false;
    }
    trace!("EAPOL key frame, descriptor type {}", descriptor);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_frame(packet_type: u8, descriptor: u8) -> Vec<u8> {
        let mut out = vec![0x01, packet_type];
        out.extend_from_slice(&(KEY_FRAME_LEN as u16).to_be_bytes());
        let mut key = vec![0u8; KEY_FRAME_LEN];
        key[0] = descriptor;
        out.extend_from_slice(&key);
        out
    }

    #[test]
    fn recognises_rsn_key_frames() {
        assert!(inspect(&key_frame(3, 2)));
        assert!(inspect(&key_frame(3, 1)));
    }

    #[test]
    fn rejects_eap_packets() {
        assert!(!inspect(&key_frame(0, 2)));
    }

    #[test]
    fn rejects_unknown_descriptors() {
        assert!(!inspect(&key_frame(3, 0xfe)));
    }

    #[test]
    fn rejects_truncated_frames() {
        assert!(!inspect(&[1, 3]));
        let mut short = key_frame(3, 2);
        short.truncate(40);
        assert!(!inspect(&short));
    }
}
