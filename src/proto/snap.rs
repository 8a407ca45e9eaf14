use crate::proto::eapol;
use crate::stats::Stats;

/// The 802.2 LLC header opening every SNAP-encapsulated payload.
pub const LLC_SNAP: [u8; 3] = [0xaa, 0xaa, 0x03];

const ETHERTYPE_EAPOL: u16 = 0x888e;

/// Demultiplex an LLC/SNAP payload.
///
/// `payload` starts at the LLC header (the caller has already matched
/// [`LLC_SNAP`]).  The ethertype sits past the three LLC bytes and the
/// three-byte OUI; the 8-byte LLC+SNAP header is stripped before the inner
/// payload is examined.  Only 802.1X (EAPOL) gets further treatment.
pub fn handle(payload: &[u8], stats: &Stats) {
    if payload.len() < 8 {
        return;
    }
    let ethertype = u16::from_be_bytes([payload[6], payload[7]]);
    let inner = &payload[8..];
    if ethertype == ETHERTYPE_EAPOL {
        stats.inc_eapol();
        eapol::inspect(inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_eapol() {
        let stats = Stats::new();
        let mut payload = vec![0xaa, 0xaa, 0x03, 0, 0, 0];
        payload.extend_from_slice(&0x888eu16.to_be_bytes());
        payload.extend_from_slice(&[1, 3, 0, 0]);
        handle(&payload, &stats);
        assert_eq!(stats.eapol(), 1);
    }

    #[test]
    fn ignores_other_ethertypes() {
        let stats = Stats::new();
        let mut payload = vec![0xaa, 0xaa, 0x03, 0, 0, 0];
        payload.extend_from_slice(&0x0800u16.to_be_bytes());
        handle(&payload, &stats);
        assert_eq!(stats.eapol(), 0);
    }

    #[test]
    fn short_payload_is_ignored() {
        let stats = Stats::new();
        handle(&[0xaa, 0xaa, 0x03], &stats);
        assert_eq!(stats.eapol(), 0);
    }
}
