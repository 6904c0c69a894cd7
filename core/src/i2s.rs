//! I2S full-duplex loopback: test pattern, result check and clock prescaler

/// Halfwords moved by each of the four DMA channels
pub const BUFFER_LEN: usize = 32;

/// Fill both transmit buffers with their ramps.
///
/// I2S2 sends `0, 1, .. 31` and I2S3 sends `32, 31, .. 1`, so a crossed or
/// shifted transfer cannot compare equal.
pub fn fill_tx(i2s2_tx: &mut [u16; BUFFER_LEN], i2s3_tx: &mut [u16; BUFFER_LEN]) {
    for (index, (a, b)) in i2s2_tx.iter_mut().zip(i2s3_tx.iter_mut()).enumerate() {
        *a = index as u16;
        *b = (BUFFER_LEN - index) as u16;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompareError {
    #[error("received {actual} halfwords, expected {expected}")]
    Length { expected: usize, actual: usize },
    #[error("halfword {index} is {actual:#06x}, expected {expected:#06x}")]
    Value { index: usize, expected: u16, actual: u16 },
}

/// Compare a received buffer against what the peer sent
pub fn buffer_compare(received: &[u16], sent: &[u16]) -> Result<(), CompareError> {
    if received.len() != sent.len() {
        return Err(CompareError::Length {
            expected: sent.len(),
            actual: received.len(),
        });
    }
    match received.iter().zip(sent).position(|(r, s)| r != s) {
        None => Ok(()),
        Some(index) => Err(CompareError::Value {
            index,
            expected: sent[index],
            actual: received[index],
        }),
    }
}

/// Outcome of one loopback run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoopbackReport {
    /// I2S3EXT -> I2S2EXT direction
    pub into_i2s2: Result<(), CompareError>,
    /// SPI2 -> SPI3 direction
    pub into_i2s3: Result<(), CompareError>,
}

impl LoopbackReport {
    pub fn check(
        i2s2_rx: &[u16],
        i2s3_tx: &[u16],
        i2s3_rx: &[u16],
        i2s2_tx: &[u16],
    ) -> Self {
        Self {
            into_i2s2: buffer_compare(i2s2_rx, i2s3_tx),
            into_i2s3: buffer_compare(i2s3_rx, i2s2_tx),
        }
    }

    pub fn passed(&self) -> bool {
        self.into_i2s2.is_ok() && self.into_i2s3.is_ok()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioProtocol {
    Philips,
    MsbJustified,
    LsbJustified,
    PcmShort,
    PcmLong,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataFormat {
    Data16Channel16,
    Data16Channel32,
    Data24Channel32,
    Data32Channel32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPolarity {
    Low,
    High,
}

/// Bus role of one I2S instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    SlaveTx,
    SlaveRx,
    MasterTx,
    MasterRx,
}

impl Mode {
    pub const fn is_master(self) -> bool {
        matches!(self, Mode::MasterTx | Mode::MasterRx)
    }

    const fn bits(self) -> u32 {
        match self {
            Mode::SlaveTx => 0b00,
            Mode::SlaveRx => 0b01,
            Mode::MasterTx => 0b10,
            Mode::MasterRx => 0b11,
        }
    }
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2sConfig {
    pub protocol: AudioProtocol,
    pub format: DataFormat,
    pub mclk_output: bool,
    pub sample_rate_hz: u32,
    pub clock_polarity: ClockPolarity,
}

impl Default for I2sConfig {
    fn default() -> Self {
        Self {
            protocol: AudioProtocol::Philips,
            format: DataFormat::Data16Channel32,
            mclk_output: false,
            sample_rate_hz: 48_000,
            clock_polarity: ClockPolarity::Low,
        }
    }
}

impl I2sConfig {
    /// SPI_I2SCTRL value for `mode`, with the peripheral still disabled
    pub fn i2sctrl_bits(&self, mode: Mode) -> u32 {
        const I2SMSEL: u32 = 1 << 11;
        let (chlen, datlen) = match self.format {
            DataFormat::Data16Channel16 => (0, 0b00),
            DataFormat::Data16Channel32 => (1, 0b00),
            DataFormat::Data24Channel32 => (1, 0b01),
            DataFormat::Data32Channel32 => (1, 0b10),
        };
        let (stdsel, pcm_long) = match self.protocol {
            AudioProtocol::Philips => (0b00, 0),
            AudioProtocol::MsbJustified => (0b01, 0),
            AudioProtocol::LsbJustified => (0b10, 0),
            AudioProtocol::PcmShort => (0b11, 0),
            AudioProtocol::PcmLong => (0b11, 1),
        };
        let clkpol = match self.clock_polarity {
            ClockPolarity::Low => 0,
            ClockPolarity::High => 1,
        };
        I2SMSEL
            | chlen
            | datlen << 1
            | clkpol << 3
            | stdsel << 4
            | pcm_long << 7
            | mode.bits() << 8
    }

    /// Bit clocks per frame seen by the prescaler
    const fn frame_divider(&self) -> u64 {
        if self.mclk_output {
            256
        } else if matches!(self.format, DataFormat::Data16Channel16) {
            32
        } else {
            64
        }
    }
}

/// Linear prescaler of an I2S master
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Prescaler {
    /// 10-bit divider
    pub div: u16,
    pub odd: bool,
}

impl Prescaler {
    /// Smallest divider the hardware accepts, also used when the request
    /// cannot be met
    pub const FALLBACK: Prescaler = Prescaler { div: 2, odd: false };

    /// Divider closest to `config.sample_rate_hz` for the given kernel clock
    pub fn for_rate(i2s_clk: u32, config: &I2sConfig) -> Self {
        let k = config.frame_divider();
        let fs = config.sample_rate_hz.max(1) as u64;
        let scaled = ((i2s_clk as u64 / k) * 10 / fs + 5) / 10;
        let odd = scaled & 1;
        let div = (scaled - odd) / 2;
        if !(2..=0x3FF).contains(&div) {
            return Self::FALLBACK;
        }
        Self {
            div: div as u16,
            odd: odd == 1,
        }
    }

    /// Sample rate produced by this divider
    pub fn actual_rate(&self, i2s_clk: u32, config: &I2sConfig) -> u32 {
        let total = 2 * self.div as u64 + self.odd as u64;
        (i2s_clk as u64 / (config.frame_divider() * total)) as u32
    }

    /// SPI_I2SCLKP value
    pub fn i2sclkp_bits(&self, mclk_output: bool) -> u32 {
        let div = self.div as u32;
        (div & 0xFF) | (self.odd as u32) << 8 | (mclk_output as u32) << 9 | (div >> 8) << 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramps_run_in_opposite_directions() {
        let mut a = [0u16; BUFFER_LEN];
        let mut b = [0u16; BUFFER_LEN];
        fill_tx(&mut a, &mut b);
        assert_eq!(a[0], 0);
        assert_eq!(a[31], 31);
        assert_eq!(b[0], 32);
        assert_eq!(b[31], 1);
    }

    #[test]
    fn compare_reports_first_difference() {
        let sent = [1u16, 2, 3, 4];
        assert_eq!(buffer_compare(&[1, 2, 3, 4], &sent), Ok(()));
        assert_eq!(
            buffer_compare(&[1, 2, 9, 8], &sent),
            Err(CompareError::Value { index: 2, expected: 3, actual: 9 })
        );
        assert_eq!(
            buffer_compare(&[1, 2], &sent),
            Err(CompareError::Length { expected: 4, actual: 2 })
        );
    }

    #[test]
    fn loopback_needs_both_directions() {
        let mut i2s2_tx = [0u16; BUFFER_LEN];
        let mut i2s3_tx = [0u16; BUFFER_LEN];
        fill_tx(&mut i2s2_tx, &mut i2s3_tx);

        let report = LoopbackReport::check(&i2s3_tx, &i2s3_tx, &i2s2_tx, &i2s2_tx);
        assert!(report.passed());

        // an untouched receive buffer fails
        let report = LoopbackReport::check(&i2s3_tx, &i2s3_tx, &[0; BUFFER_LEN], &i2s2_tx);
        assert!(report.into_i2s2.is_ok());
        assert!(!report.passed());
    }

    #[test]
    fn prescaler_for_48k_at_240mhz() {
        let config = I2sConfig::default();
        let p = Prescaler::for_rate(240_000_000, &config);
        assert_eq!(p, Prescaler { div: 39, odd: false });
        assert_eq!(p.actual_rate(240_000_000, &config), 48_076);
        assert_eq!(p.i2sclkp_bits(false), 39);
    }

    #[test]
    fn prescaler_falls_back_when_clock_too_slow() {
        let p = Prescaler::for_rate(8_000_000, &I2sConfig::default());
        assert_eq!(p, Prescaler::FALLBACK);
    }

    #[test]
    fn prescaler_high_bits_land_above_mclk_enable() {
        let p = Prescaler { div: 0x155, odd: true };
        assert_eq!(p.i2sclkp_bits(true), 0x55 | 1 << 8 | 1 << 9 | 1 << 10);
    }

    #[test]
    fn philips_16_in_32_master_tx_control() {
        let bits = I2sConfig::default().i2sctrl_bits(Mode::MasterTx);
        assert_eq!(bits, 1 << 11 | 1 | 0b10 << 8);
        let bits = I2sConfig::default().i2sctrl_bits(Mode::SlaveRx);
        assert_eq!(bits, 1 << 11 | 1 | 0b01 << 8);
    }
}
