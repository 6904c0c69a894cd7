//! Upgrade request listener of the IAP application
//!
//! A client sends `upgrade\n` to [`UPGRADE_PORT`]; the application sets the
//! upgrade flag and resets, so the bootloader takes over.

use atstart_core::iap::{Command, CommandLine, UPGRADE_PORT, UpgradeFlag};
use cortex_m::peripheral::SCB;
use smoltcp::iface::{SocketHandle, SocketSet};
use smoltcp::socket::tcp;
use static_cell::ConstStaticCell;

use super::NetStack;
use crate::flash::Flash;

static RX_BUFFER: ConstStaticCell<[u8; 64]> = ConstStaticCell::new([0; 64]);
static TX_BUFFER: ConstStaticCell<[u8; 16]> = ConstStaticCell::new([0; 16]);

pub struct UpgradeListener {
    handle: SocketHandle,
    flash: Flash,
    line: CommandLine,
}

impl UpgradeListener {
    /// Only one listener can exist.
    pub fn new(stack: &mut NetStack, flash: Flash) -> Self {
        let socket = tcp::Socket::new(
            tcp::SocketBuffer::new(&mut RX_BUFFER.take()[..]),
            tcp::SocketBuffer::new(&mut TX_BUFFER.take()[..]),
        );
        let handle = stack.sockets().add(socket);
        defmt::info!("iap: upgrade requests on port {}", UPGRADE_PORT);
        Self {
            handle,
            flash,
            line: CommandLine::new(),
        }
    }

    pub(super) fn poll(&mut self, sockets: &mut SocketSet<'static>) {
        let socket = sockets.get_mut::<tcp::Socket>(self.handle);

        if !socket.is_open() {
            self.line = CommandLine::new();
            if let Err(e) = socket.listen(UPGRADE_PORT) {
                defmt::error!("iap: listen failed: {}", e);
            }
            return;
        }

        if socket.can_recv() {
            let line = &mut self.line;
            match socket.recv(|data| (data.len(), line.feed(data))) {
                Ok(Some(Command::Upgrade)) => self.enter_bootloader(),
                Ok(Some(Command::Unknown)) => {
                    defmt::warn!("iap: unknown command");
                    socket.close();
                }
                Ok(None) => {}
                Err(e) => defmt::warn!("iap: recv: {}", e),
            }
        }

        if socket.state() == tcp::State::CloseWait {
            socket.close();
        }
    }

    fn enter_bootloader(&mut self) {
        match UpgradeFlag::new().request(&mut self.flash) {
            Ok(()) => {
                defmt::info!("iap: upgrade requested, resetting");
                SCB::sys_reset();
            }
            Err(e) => defmt::error!("iap: could not set upgrade flag: {}", e),
        }
    }
}
