//! Hardware-independent logic shared by the AT-START-F407 demo firmware and
//! the host throughput client.
//!
//! Nothing in here touches a register. The device crate feeds these types
//! from its drivers, and every module is testable on the host.

#![no_std]

pub mod board;
pub mod chase;
pub mod clock;
pub mod emac;
pub mod i2s;
pub mod iap;
pub mod iperf;
pub mod net;
pub mod phy;
pub mod six_step;
