use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// AT32F407VGT7: 1 MiB flash, 96 KiB SRAM
const FLASH_ORIGIN: u32 = 0x0800_0000;
const FLASH_LEN: u32 = 1024 * 1024;
const RAM_LEN: u32 = 96 * 1024;
/// Bootloader area reserved by the IAP demo
const IAP_OFFSET: u32 = 0x1_0000;

fn main() {
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());

    let offset = if env::var_os("CARGO_FEATURE_IAP").is_some() {
        IAP_OFFSET
    } else {
        0
    };
    let memory_x = format!(
        "MEMORY\n{{\n  FLASH : ORIGIN = {:#010X}, LENGTH = {}K\n  RAM : ORIGIN = 0x20000000, LENGTH = {}K\n}}\n",
        FLASH_ORIGIN + offset,
        (FLASH_LEN - offset) / 1024,
        RAM_LEN / 1024,
    );
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(memory_x.as_bytes())
        .unwrap();

    // Interrupt handler names for cortex-m-rt's `device` feature
    File::create(out.join("device.x"))
        .unwrap()
        .write_all(include_bytes!("device.x"))
        .unwrap();

    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=device.x");
    println!("cargo:rerun-if-changed=build.rs");
}
