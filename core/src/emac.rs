//! EMAC DMA descriptor words and MAC address packing
//!
//! The AT32F407 EMAC uses the 16-byte "normal" descriptor layout in chained
//! mode: word 0 status/ownership, word 1 control and buffer size, word 2 the
//! buffer address, word 3 the next descriptor.

/// Size of each frame buffer, a multiple of four above the 1518-byte maximum
pub const BUFFER_SIZE: usize = 1536;

/// Ethernet frame check sequence appended by the MAC
pub const CRC_LEN: usize = 4;

/// TDES0 bits
pub mod tdes0 {
    pub const OWN: u32 = 1 << 31;
    pub const INTERRUPT_ON_COMPLETION: u32 = 1 << 30;
    pub const LAST_SEGMENT: u32 = 1 << 29;
    pub const FIRST_SEGMENT: u32 = 1 << 28;
    /// Insert IP header, payload and pseudo-header checksums
    pub const CHECKSUM_FULL: u32 = 0b11 << 22;
    pub const CHAINED: u32 = 1 << 20;
    pub const ERROR_SUMMARY: u32 = 1 << 15;
}

/// RDES0 bits
pub mod rdes0 {
    pub const OWN: u32 = 1 << 31;
    pub const ERROR_SUMMARY: u32 = 1 << 15;
    pub const FIRST_DESCRIPTOR: u32 = 1 << 9;
    pub const LAST_DESCRIPTOR: u32 = 1 << 8;
    pub(crate) const FRAME_LENGTH_SHIFT: u32 = 16;
    pub(crate) const FRAME_LENGTH_MASK: u32 = 0x3FFF;
}

/// RDES1 bits
pub mod rdes1 {
    pub const CHAINED: u32 = 1 << 14;
    pub const BUFFER1_SIZE_MASK: u32 = 0x1FFF;
}

/// TDES0 for a single-buffer frame, handing the descriptor to the DMA
pub const fn tx_frame_status() -> u32 {
    tdes0::OWN
        | tdes0::INTERRUPT_ON_COMPLETION
        | tdes0::FIRST_SEGMENT
        | tdes0::LAST_SEGMENT
        | tdes0::CHECKSUM_FULL
        | tdes0::CHAINED
}

/// RDES1 for a chained descriptor with one buffer of `len` bytes
pub const fn rx_control(len: usize) -> u32 {
    rdes1::CHAINED | (len as u32 & rdes1::BUFFER1_SIZE_MASK)
}

/// Decoded receive descriptor status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStatus {
    pub owned_by_dma: bool,
    pub first: bool,
    pub last: bool,
    pub error: bool,
    /// Frame length including the FCS
    pub frame_len: usize,
}

impl RxStatus {
    pub const fn from_rdes0(word: u32) -> Self {
        Self {
            owned_by_dma: word & rdes0::OWN != 0,
            first: word & rdes0::FIRST_DESCRIPTOR != 0,
            last: word & rdes0::LAST_DESCRIPTOR != 0,
            error: word & rdes0::ERROR_SUMMARY != 0,
            frame_len: ((word >> rdes0::FRAME_LENGTH_SHIFT) & rdes0::FRAME_LENGTH_MASK) as usize,
        }
    }

    /// Whole, error-free frame that fits one buffer
    pub const fn is_complete(&self) -> bool {
        !self.owned_by_dma && self.first && self.last && !self.error
    }

    /// Bytes handed to the network stack
    pub const fn payload_len(&self) -> usize {
        self.frame_len.saturating_sub(CRC_LEN)
    }
}

/// MAC address split into the address high/low register pair
pub const fn mac_address_registers(mac: [u8; 6]) -> (u32, u32) {
    let high = (mac[5] as u32) << 8 | mac[4] as u32;
    let low = (mac[3] as u32) << 24 | (mac[2] as u32) << 16 | (mac[1] as u32) << 8 | mac[0] as u32;
    (high, low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_frame_strips_crc() {
        let word = (64 << 16) | rdes0::FIRST_DESCRIPTOR | rdes0::LAST_DESCRIPTOR;
        let status = RxStatus::from_rdes0(word);
        assert!(status.is_complete());
        assert_eq!(status.frame_len, 64);
        assert_eq!(status.payload_len(), 60);
    }

    #[test]
    fn owned_or_errored_frames_are_not_complete() {
        let base = (64 << 16) | rdes0::FIRST_DESCRIPTOR | rdes0::LAST_DESCRIPTOR;
        assert!(!RxStatus::from_rdes0(base | rdes0::OWN).is_complete());
        assert!(!RxStatus::from_rdes0(base | rdes0::ERROR_SUMMARY).is_complete());
        assert!(!RxStatus::from_rdes0(base & !rdes0::LAST_DESCRIPTOR).is_complete());
    }

    #[test]
    fn runt_length_does_not_underflow() {
        assert_eq!(RxStatus::from_rdes0(2 << 16).payload_len(), 0);
    }

    #[test]
    fn descriptor_words() {
        assert_eq!(rx_control(BUFFER_SIZE), (1 << 14) | 1536);
        assert_eq!(tx_frame_status() & tdes0::OWN, tdes0::OWN);
        assert_eq!(tx_frame_status() & tdes0::CHAINED, tdes0::CHAINED);
    }

    #[test]
    fn mac_address_packing() {
        let (high, low) = mac_address_registers([0x00, 0x00, 0x44, 0x45, 0x56, 0x01]);
        assert_eq!(high, 0x0156);
        assert_eq!(low, 0x4544_0000);
    }
}
