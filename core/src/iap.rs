//! Flash layout shared with the IAP bootloader and the upgrade flag word
//!
//! The bootloader owns the first 64 KiB of flash and keeps a one-word flag
//! in its last sector. The application clears that flag on boot so the
//! bootloader starts it directly next time, and sets it again when asked over
//! TCP to hand control back to the bootloader.

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

pub const FLASH_BASE: u32 = 0x0800_0000;
pub const BOOTLOADER_SIZE: u32 = 0x1_0000;
/// Application image and vector table
pub const APP_ORIGIN: u32 = FLASH_BASE + BOOTLOADER_SIZE;
/// Erase granularity of bank 1
pub const SECTOR_SIZE: u32 = 2048;
pub const FLAG_ADDRESS: u32 = APP_ORIGIN - SECTOR_SIZE;

/// Flag value left by a pending upgrade request ("ATK8")
pub const UPGRADE_REQUEST: u32 = 0x4154_4B38;
pub const ERASED: u32 = 0xFFFF_FFFF;

/// What `check_and_clear` found
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlagState {
    /// Sector already erased
    Clear,
    /// Sector held this word and has been erased
    Cleared(u32),
}

/// The flag word, addressed as an offset from the start of flash
#[derive(Clone, Copy, Debug)]
pub struct UpgradeFlag {
    offset: u32,
}

impl UpgradeFlag {
    pub const fn new() -> Self {
        Self {
            offset: FLAG_ADDRESS - FLASH_BASE,
        }
    }

    pub const fn offset(&self) -> u32 {
        self.offset
    }

    pub fn read<F: ReadNorFlash>(&self, flash: &mut F) -> Result<u32, F::Error> {
        let mut word = [0u8; 4];
        flash.read(self.offset, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    /// Inspect the flag and erase its sector unless it is already blank
    pub fn check_and_clear<F: NorFlash>(&self, flash: &mut F) -> Result<FlagState, F::Error> {
        match self.read(flash)? {
            ERASED => Ok(FlagState::Clear),
            value => {
                self.erase(flash)?;
                Ok(FlagState::Cleared(value))
            }
        }
    }

    /// Leave an upgrade request for the bootloader
    pub fn request<F: NorFlash>(&self, flash: &mut F) -> Result<(), F::Error> {
        if self.read(flash)? != ERASED {
            self.erase(flash)?;
        }
        flash.write(self.offset, &UPGRADE_REQUEST.to_le_bytes())
    }

    fn erase<F: NorFlash>(&self, flash: &mut F) -> Result<(), F::Error> {
        let sector = self.offset - self.offset % F::ERASE_SIZE as u32;
        flash.erase(sector, sector + F::ERASE_SIZE as u32)
    }
}

impl Default for UpgradeFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// TCP port the application listens on for upgrade requests
pub const UPGRADE_PORT: u16 = 5002;
pub const UPGRADE_COMMAND: &[u8] = b"upgrade";

const LINE_MAX: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Set the flag and reset into the bootloader
    Upgrade,
    Unknown,
}

/// Collects one newline-terminated command, ignoring a trailing `\r`
#[derive(Debug)]
pub struct CommandLine {
    buf: [u8; LINE_MAX],
    len: usize,
    overflow: bool,
}

impl CommandLine {
    pub const fn new() -> Self {
        Self {
            buf: [0; LINE_MAX],
            len: 0,
            overflow: false,
        }
    }

    /// Feed received bytes; yields the command once the line is complete.
    /// Bytes after the newline are dropped.
    pub fn feed(&mut self, data: &[u8]) -> Option<Command> {
        for &byte in data {
            if byte == b'\n' {
                let line = &self.buf[..self.len];
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                let command = if !self.overflow && line == UPGRADE_COMMAND {
                    Command::Upgrade
                } else {
                    Command::Unknown
                };
                *self = Self::new();
                return Some(command);
            }
            match self.buf.get_mut(self.len) {
                Some(slot) => {
                    *slot = byte;
                    self.len += 1;
                }
                None => self.overflow = true,
            }
        }
        None
    }
}

impl Default for CommandLine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_sits_in_last_bootloader_sector() {
        assert_eq!(APP_ORIGIN, 0x0801_0000);
        assert_eq!(FLAG_ADDRESS, 0x0800_F800);
        assert_eq!(UpgradeFlag::new().offset(), 0xF800);
    }

    #[test]
    fn upgrade_command_split_across_segments() {
        let mut line = CommandLine::new();
        assert_eq!(line.feed(b"upg"), None);
        assert_eq!(line.feed(b"rade\r"), None);
        assert_eq!(line.feed(b"\nextra"), Some(Command::Upgrade));
    }

    #[test]
    fn other_lines_are_unknown() {
        let mut line = CommandLine::new();
        assert_eq!(line.feed(b"upgrade now\n"), Some(Command::Unknown));
        assert_eq!(line.feed(b"\n"), Some(Command::Unknown));
        // too long, even though it starts with the command
        assert_eq!(line.feed(b"upgradeupgradeupgrade\n"), Some(Command::Unknown));
        assert_eq!(line.feed(b"upgrade\n"), Some(Command::Upgrade));
    }
}
