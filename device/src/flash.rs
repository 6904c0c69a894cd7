//! Bank 1 flash programming behind `embedded-storage`

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash, check_erase, check_read,
    check_write,
};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use crate::at32::flash::{CTRL, FLASH_BASE, STS, UNLOCK_KEY1, UNLOCK_KEY2};

/// Start of flash in the memory map; offsets are relative to it
const MEMORY_BASE: u32 = 0x0800_0000;
/// Bank 1 of the 1 MiB parts
const BANK1_SIZE: usize = 512 * 1024;
const SECTOR_SIZE: usize = 2048;

/// Busy-wait polls before an operation is declared hung
const OPERATION_TIMEOUT: u32 = 0x00F0_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum FlashError {
    OutOfBounds,
    NotAligned,
    /// Target word was not erased
    Program,
    WriteProtected,
    Timeout,
}

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            FlashError::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            FlashError::NotAligned => NorFlashErrorKind::NotAligned,
            _ => NorFlashErrorKind::Other,
        }
    }
}

impl From<NorFlashErrorKind> for FlashError {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => FlashError::NotAligned,
            _ => FlashError::OutOfBounds,
        }
    }
}

/// Flash bank 1. The controller is unlocked only while an operation runs.
pub struct Flash {
    _private: (),
}

impl Flash {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn unlock(&mut self) {
        let regs = FLASH_BASE;
        if regs.ctrl.is_set(CTRL::OPLK) {
            regs.unlock.set(UNLOCK_KEY1);
            regs.unlock.set(UNLOCK_KEY2);
        }
    }

    fn lock(&mut self) {
        FLASH_BASE.ctrl.modify(CTRL::OPLK::SET);
    }

    /// Wait for the operation to finish, then collect and clear its status
    fn wait_done(&mut self) -> Result<(), FlashError> {
        let regs = FLASH_BASE;
        let mut polls = 0;
        while regs.sts.is_set(STS::OBF) {
            polls += 1;
            if polls == OPERATION_TIMEOUT {
                return Err(FlashError::Timeout);
            }
        }
        let sts = regs.sts.extract();
        regs.sts
            .write(STS::ODF::SET + STS::PRGMERR::SET + STS::EPPERR::SET);
        if sts.is_set(STS::PRGMERR) {
            Err(FlashError::Program)
        } else if sts.is_set(STS::EPPERR) {
            Err(FlashError::WriteProtected)
        } else {
            Ok(())
        }
    }

    fn erase_sector(&mut self, address: u32) -> Result<(), FlashError> {
        let regs = FLASH_BASE;
        regs.ctrl.modify(CTRL::SECERS::SET);
        regs.addr.set(address);
        regs.ctrl.modify(CTRL::ERSTR::SET);
        let result = self.wait_done();
        regs.ctrl.modify(CTRL::SECERS::CLEAR);
        result
    }

    fn program_word(&mut self, address: u32, word: u32) -> Result<(), FlashError> {
        let regs = FLASH_BASE;
        regs.ctrl.modify(CTRL::FPRGM::SET);
        unsafe { core::ptr::write_volatile(address as *mut u32, word) };
        let result = self.wait_done();
        regs.ctrl.modify(CTRL::FPRGM::CLEAR);
        result
    }
}

impl Default for Flash {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), FlashError> {
        check_read(&*self, offset, bytes.len())?;
        let src = (MEMORY_BASE + offset) as *const u8;
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = unsafe { core::ptr::read_volatile(src.add(i)) };
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        BANK1_SIZE
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), FlashError> {
        check_erase(&*self, from, to)?;
        self.unlock();
        let mut result = Ok(());
        for sector in (from..to).step_by(SECTOR_SIZE) {
            result = self.erase_sector(MEMORY_BASE + sector);
            if result.is_err() {
                break;
            }
        }
        self.lock();
        result
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), FlashError> {
        check_write(&*self, offset, bytes.len())?;
        self.unlock();
        let mut result = Ok(());
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            result = self.program_word(MEMORY_BASE + offset + 4 * i as u32, word);
            if result.is_err() {
                break;
            }
        }
        self.lock();
        result
    }
}
