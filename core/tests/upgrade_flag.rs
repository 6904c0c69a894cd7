use atstart_core::iap::{FlagState, UPGRADE_REQUEST, UpgradeFlag};
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

/// 64 KiB of RAM behaving like NOR flash: writes can only clear bits
struct MockFlash {
    mem: Vec<u8>,
    erases: Vec<(u32, u32)>,
}

impl MockFlash {
    fn new() -> Self {
        Self {
            mem: vec![0xFF; 0x1_0000],
            erases: Vec::new(),
        }
    }

    fn word(&self, offset: u32) -> u32 {
        let o = offset as usize;
        u32::from_le_bytes(self.mem[o..o + 4].try_into().unwrap())
    }
}

#[derive(Debug, PartialEq)]
enum MockError {
    OutOfBounds,
    NotErased,
}

impl NorFlashError for MockError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            MockError::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            MockError::NotErased => NorFlashErrorKind::Other,
        }
    }
}

impl ErrorType for MockFlash {
    type Error = MockError;
}

impl ReadNorFlash for MockFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), MockError> {
        let start = offset as usize;
        let src = self
            .mem
            .get(start..start + bytes.len())
            .ok_or(MockError::OutOfBounds)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.mem.len()
    }
}

impl NorFlash for MockFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 2048;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), MockError> {
        let range = self
            .mem
            .get_mut(from as usize..to as usize)
            .ok_or(MockError::OutOfBounds)?;
        range.fill(0xFF);
        self.erases.push((from, to));
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), MockError> {
        let start = offset as usize;
        let dst = self
            .mem
            .get_mut(start..start + bytes.len())
            .ok_or(MockError::OutOfBounds)?;
        if dst.iter().zip(bytes).any(|(old, new)| old & new != *new) {
            return Err(MockError::NotErased);
        }
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

#[test]
fn blank_flag_is_left_alone() {
    let mut flash = MockFlash::new();
    let flag = UpgradeFlag::new();
    assert_eq!(flag.check_and_clear(&mut flash), Ok(FlagState::Clear));
    assert!(flash.erases.is_empty());
}

#[test]
fn pending_request_is_cleared_once() {
    let mut flash = MockFlash::new();
    let flag = UpgradeFlag::new();
    flag.request(&mut flash).unwrap();
    assert_eq!(flash.word(flag.offset()), UPGRADE_REQUEST);

    assert_eq!(
        flag.check_and_clear(&mut flash),
        Ok(FlagState::Cleared(UPGRADE_REQUEST))
    );
    assert_eq!(flash.erases, vec![(0xF800, 0x1_0000)]);
    assert_eq!(flag.check_and_clear(&mut flash), Ok(FlagState::Clear));
}

#[test]
fn foreign_values_are_also_cleared() {
    let mut flash = MockFlash::new();
    let flag = UpgradeFlag::new();
    flash.write(flag.offset(), &0x1234_5678u32.to_le_bytes()).unwrap();
    assert_eq!(
        flag.check_and_clear(&mut flash),
        Ok(FlagState::Cleared(0x1234_5678))
    );
    assert_eq!(flag.read(&mut flash), Ok(0xFFFF_FFFF));
}

#[test]
fn request_over_stale_word_erases_first() {
    let mut flash = MockFlash::new();
    let flag = UpgradeFlag::new();
    flash.write(flag.offset(), &0x0000_0001u32.to_le_bytes()).unwrap();
    flag.request(&mut flash).unwrap();
    assert_eq!(flash.word(flag.offset()), UPGRADE_REQUEST);
    assert_eq!(flash.erases.len(), 1);
}
