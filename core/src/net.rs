//! Static network settings of the Ethernet demos

/// Address plan, shared with the host client defaults
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetConfig {
    pub mac: [u8; 6],
    pub ip: [u8; 4],
    pub prefix_len: u8,
    pub gateway: [u8; 4],
    /// Interval between PHY link polls
    pub link_poll_ms: u64,
}

impl NetConfig {
    pub const DEFAULT: NetConfig = NetConfig {
        mac: [0x00, 0x00, 0x44, 0x45, 0x56, 0x01],
        ip: [192, 168, 81, 37],
        prefix_len: 24,
        gateway: [192, 168, 81, 187],
        link_poll_ms: 500,
    };

    pub fn netmask(&self) -> [u8; 4] {
        let bits = match self.prefix_len {
            0 => 0,
            n => u32::MAX << (32 - n.min(32) as u32),
        };
        bits.to_be_bytes()
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_a_class_c_subnet() {
        let config = NetConfig::default();
        assert_eq!(config.netmask(), [255, 255, 255, 0]);
        assert_eq!(config.ip[..3], config.gateway[..3]);
    }

    #[test]
    fn netmask_edges() {
        let mut config = NetConfig::default();
        config.prefix_len = 0;
        assert_eq!(config.netmask(), [0, 0, 0, 0]);
        config.prefix_len = 32;
        assert_eq!(config.netmask(), [255; 4]);
        config.prefix_len = 20;
        assert_eq!(config.netmask(), [255, 255, 240, 0]);
    }
}
