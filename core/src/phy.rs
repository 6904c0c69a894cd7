//! IEEE 802.3 clause 22 PHY registers and MDC clock selection

/// Standard register addresses
pub mod reg {
    pub const BCR: u8 = 0x00;
    pub const BSR: u8 = 0x01;
    pub const ID1: u8 = 0x02;
    pub const ID2: u8 = 0x03;
    pub const ANAR: u8 = 0x04;
    pub const ANLPAR: u8 = 0x05;
}

/// Basic control register bits
pub mod bcr {
    pub const RESET: u16 = 1 << 15;
    pub const LOOPBACK: u16 = 1 << 14;
    pub const SPEED_100: u16 = 1 << 13;
    pub const AUTONEG_ENABLE: u16 = 1 << 12;
    pub const POWER_DOWN: u16 = 1 << 11;
    pub const ISOLATE: u16 = 1 << 10;
    pub const RESTART_AUTONEG: u16 = 1 << 9;
    pub const FULL_DUPLEX: u16 = 1 << 8;
}

/// Basic status register bits
pub mod bsr {
    pub const AUTONEG_COMPLETE: u16 = 1 << 5;
    pub const LINK_UP: u16 = 1 << 2;
}

/// Ability bits shared by ANAR and ANLPAR
mod ability {
    pub const FD_100: u16 = 1 << 8;
    pub const HD_100: u16 = 1 << 7;
    pub const FD_10: u16 = 1 << 6;
    pub const HD_10: u16 = 1 << 5;
}

pub const fn bsr_link_up(bsr: u16) -> bool {
    bsr & bsr::LINK_UP != 0
}

pub const fn bsr_autoneg_complete(bsr: u16) -> bool {
    bsr & bsr::AUTONEG_COMPLETE != 0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhyError {
    #[error("no PHY answered (ID {0:#06x})")]
    NotFound(u16),
    #[error("HCLK {0} Hz outside the MDC divider table")]
    ClockRange(u32),
}

/// PHY identifier from ID1/ID2
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhyId {
    pub oui: u32,
    pub model: u8,
    pub revision: u8,
}

impl PhyId {
    /// A floating MDIO bus reads back all ones, a shorted one all zeros
    pub fn new(id1: u16, id2: u16) -> Result<Self, PhyError> {
        if id1 == 0xFFFF || id1 == 0x0000 {
            return Err(PhyError::NotFound(id1));
        }
        Ok(Self {
            oui: (id1 as u32) << 6 | (id2 as u32) >> 10,
            model: ((id2 >> 4) & 0x3F) as u8,
            revision: (id2 & 0xF) as u8,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    Mbps10,
    Mbps100,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Duplex {
    Half,
    Full,
}

/// Negotiated or forced link mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkMode {
    pub speed: Speed,
    pub duplex: Duplex,
}

impl LinkMode {
    pub const FULL_100: LinkMode = LinkMode {
        speed: Speed::Mbps100,
        duplex: Duplex::Full,
    };

    /// Highest common ability of our advertisement and the link partner's
    pub fn resolve(anar: u16, anlpar: u16) -> Option<Self> {
        let common = anar & anlpar;
        let (speed, duplex) = if common & ability::FD_100 != 0 {
            (Speed::Mbps100, Duplex::Full)
        } else if common & ability::HD_100 != 0 {
            (Speed::Mbps100, Duplex::Half)
        } else if common & ability::FD_10 != 0 {
            (Speed::Mbps10, Duplex::Full)
        } else if common & ability::HD_10 != 0 {
            (Speed::Mbps10, Duplex::Half)
        } else {
            return None;
        };
        Some(Self { speed, duplex })
    }

    /// Mode programmed directly in BCR when auto-negotiation is off
    pub fn from_bcr(bcr: u16) -> Self {
        Self {
            speed: if bcr & bcr::SPEED_100 != 0 { Speed::Mbps100 } else { Speed::Mbps10 },
            duplex: if bcr & bcr::FULL_DUPLEX != 0 { Duplex::Full } else { Duplex::Half },
        }
    }
}

/// MDC divider for the MAC MII address register
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MdcRange {
    Div16,
    Div26,
    Div42,
    Div62,
    Div102,
    Div124,
}

impl MdcRange {
    /// Keep MDC at or below 2.5 MHz for the given HCLK
    pub fn for_hclk(hclk: u32) -> Result<Self, PhyError> {
        Ok(match hclk {
            20_000_000..35_000_000 => Self::Div16,
            35_000_000..60_000_000 => Self::Div26,
            60_000_000..100_000_000 => Self::Div42,
            100_000_000..150_000_000 => Self::Div62,
            150_000_000..250_000_000 => Self::Div102,
            250_000_000..=288_000_000 => Self::Div124,
            _ => return Err(PhyError::ClockRange(hclk)),
        })
    }

    /// CR field value
    pub const fn bits(self) -> u32 {
        match self {
            Self::Div42 => 0b000,
            Self::Div62 => 0b001,
            Self::Div16 => 0b010,
            Self::Div26 => 0b011,
            Self::Div102 => 0b100,
            Self::Div124 => 0b101,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phy_id_rejects_floating_bus() {
        assert_eq!(PhyId::new(0xFFFF, 0xFFFF), Err(PhyError::NotFound(0xFFFF)));
        assert_eq!(PhyId::new(0x0000, 0x1234), Err(PhyError::NotFound(0)));
        // DM9162
        let id = PhyId::new(0x0181, 0xB8A0).unwrap();
        assert_eq!(id.oui, 0x0181 << 6 | 0xB8A0 >> 10);
        assert_eq!(id.model, 0x0A);
        assert_eq!(id.revision, 0);
    }

    #[test]
    fn link_resolution_prefers_fast_full_duplex() {
        let all = 0x01E1;
        assert_eq!(LinkMode::resolve(all, all), Some(LinkMode::FULL_100));
        assert_eq!(
            LinkMode::resolve(all, 0x00A1),
            Some(LinkMode { speed: Speed::Mbps100, duplex: Duplex::Half })
        );
        assert_eq!(
            LinkMode::resolve(0x0061, all),
            Some(LinkMode { speed: Speed::Mbps10, duplex: Duplex::Full })
        );
        assert_eq!(LinkMode::resolve(0x0101, 0x0041), None);
    }

    #[test]
    fn forced_mode_from_control_register() {
        assert_eq!(
            LinkMode::from_bcr(bcr::SPEED_100 | bcr::FULL_DUPLEX),
            LinkMode::FULL_100
        );
        assert_eq!(
            LinkMode::from_bcr(0),
            LinkMode { speed: Speed::Mbps10, duplex: Duplex::Half }
        );
    }

    #[test]
    fn mdc_divider_for_240mhz() {
        assert_eq!(MdcRange::for_hclk(240_000_000), Ok(MdcRange::Div102));
        assert_eq!(MdcRange::for_hclk(250_000_000), Ok(MdcRange::Div124));
        assert_eq!(MdcRange::for_hclk(72_000_000).map(MdcRange::bits), Ok(0));
        assert_eq!(MdcRange::for_hclk(8_000_000), Err(PhyError::ClockRange(8_000_000)));
    }

    #[test]
    fn mdc_divider_band_edges() {
        assert_eq!(MdcRange::for_hclk(20_000_000), Ok(MdcRange::Div16));
        assert_eq!(MdcRange::for_hclk(19_999_999), Err(PhyError::ClockRange(19_999_999)));
        assert_eq!(MdcRange::for_hclk(35_000_000), Ok(MdcRange::Div26));
        assert_eq!(MdcRange::for_hclk(288_000_000), Ok(MdcRange::Div124));
        assert_eq!(MdcRange::for_hclk(289_000_000), Err(PhyError::ClockRange(289_000_000)));
    }

    #[test]
    fn status_bits() {
        assert!(bsr_link_up(0x782D));
        assert!(bsr_autoneg_complete(0x782D));
        assert!(!bsr_link_up(0x7809));
    }
}
